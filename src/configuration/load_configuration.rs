use crate::configuration::{binding::Binding, configuration::Configuration};
use crate::error::static_cache_error::StaticCacheError;
use crate::error::static_cache_error_enums::ConfigurationError;
use crate::logging::syslog::{info, trace};
use clap::ArgMatches;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// Load a configuration file, missing fields take their default values
pub fn load_configuration_file(path: &Path) -> Result<Configuration, StaticCacheError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| StaticCacheError::configuration(ConfigurationError::Read(e), format!("Failed to read configuration file: {}", path.display())))?;

    let configuration: Configuration = serde_json::from_str(&content)
        .map_err(|e| StaticCacheError::configuration(ConfigurationError::Parse(e), format!("Failed to parse configuration file: {}", path.display())))?;

    trace(format!("Configuration loaded from {}", path.display()));
    Ok(configuration)
}

// Command line options win over the configuration file
pub fn apply_command_line_args(configuration: &mut Configuration, matches: &ArgMatches) -> Result<(), StaticCacheError> {
    if let Some(dir) = matches.get_one::<String>("dir") {
        configuration.dir = dir.clone();
    }
    if let Some(prefix) = matches.get_one::<String>("prefix") {
        configuration.prefix = prefix.clone();
    }
    if matches.get_flag("gzip") {
        configuration.gzip = true;
    }
    if let Some(max_age) = matches.get_one::<u64>("max-age") {
        configuration.max_age = *max_age;
    }
    if matches.get_flag("no-buffer") {
        configuration.buffer = false;
    }
    if matches.get_flag("no-preload") {
        configuration.preload = false;
    }
    if matches.get_flag("no-dynamic") {
        configuration.dynamic = false;
    }

    if let Some(headers) = matches.get_many::<String>("header") {
        for header in headers {
            let (name, value) = parse_header_argument(header)?;
            let mut header_map = BTreeMap::new();
            header_map.insert(name, value);
            configuration.extra_headers.push(header_map);
        }
    }

    let ip = matches.get_one::<String>("ip");
    let port = matches.get_one::<u16>("port");
    if ip.is_some() || port.is_some() {
        let mut binding = configuration.bindings.first().cloned().unwrap_or_else(Binding::new);
        if let Some(ip) = ip {
            binding.ip = ip.clone();
        }
        if let Some(port) = port {
            binding.port = *port;
        }
        configuration.bindings = vec![binding];
    }

    if let Some(opmode) = matches.get_one::<String>("opmode") {
        configuration.operation_mode = opmode.clone();
    }
    if let Some(log_file) = matches.get_one::<String>("log-file") {
        configuration.log_file = Some(log_file.clone());
    }

    Ok(())
}

fn parse_header_argument(header: &str) -> Result<(String, String), StaticCacheError> {
    match header.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.trim().to_string())),
        _ => Err(StaticCacheError::configuration(
            ConfigurationError::InvalidArgument,
            format!("Header must be given as 'Name: Value', got '{}'", header),
        )),
    }
}

// Build the effective configuration from file and command line, then sanitize and validate it
pub fn init(matches: &ArgMatches) -> Result<Configuration, StaticCacheError> {
    let mut configuration = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            info(format!("Loading configuration from {}", path.display()));
            load_configuration_file(path)?
        }
        None => Configuration::new(),
    };

    apply_command_line_args(&mut configuration, matches)?;
    configuration.sanitize();
    configuration
        .validate()
        .map_err(|errors| StaticCacheError::configuration(ConfigurationError::Invalid(errors), String::new()))?;

    Ok(configuration)
}
