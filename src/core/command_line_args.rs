use std::{path::PathBuf, sync::OnceLock};

use clap::{Arg, ArgAction, ArgMatches, Command};

pub fn build_command() -> Command {
    Command::new("staticache")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Serves a directory over HTTP from an in-memory file cache")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON configuration file, command line options override its values")
                .value_parser(validate_existing_file),
        )
        .arg(Arg::new("dir").short('d').long("dir").help("Directory to serve files from"))
        .arg(Arg::new("prefix").long("prefix").help("URL prefix the files are served under"))
        .arg(
            Arg::new("gzip")
                .short('z')
                .long("gzip")
                .help("Enable gzip compression negotiation")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-age")
                .long("max-age")
                .help("Cache-Control max-age in seconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("no-buffer")
                .long("no-buffer")
                .help("Stream files from disk instead of holding them in memory")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-preload")
                .long("no-preload")
                .help("Do not load all files at startup, load them on first request")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-dynamic")
                .long("no-dynamic")
                .help("Only serve files found at startup")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("header")
                .short('H')
                .long("header")
                .help("Extra response header as 'Name: Value', may be repeated")
                .action(ArgAction::Append),
        )
        .arg(Arg::new("ip").long("ip").help("IP address to listen on"))
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("opmode")
                .short('o')
                .long("opmode")
                .help("Mode of operation")
                .value_parser(["DEV", "DEBUG", "PRODUCTION", "ULTIMATE"]),
        )
        .arg(Arg::new("log-file").long("log-file").help("Also write the system log to this file"))
}

pub fn load_command_line_args() -> ArgMatches {
    build_command().get_matches()
}

fn validate_existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if !path.exists() {
        return Err(format!("Path does not exist: {}", s));
    }
    if !path.is_file() {
        return Err(format!("Path is not a file: {}", s));
    }
    Ok(path)
}

static COMMAND_LINE_ARGS_SINGLETON: OnceLock<ArgMatches> = OnceLock::new();

pub fn get_command_line_args() -> &'static ArgMatches {
    COMMAND_LINE_ARGS_SINGLETON.get_or_init(load_command_line_args)
}
