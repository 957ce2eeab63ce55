use chrono::Utc;
use parking_lot::RwLock;
use std::fmt;
use std::sync::LazyLock;
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::core::operation_mode::OperationMode;
use crate::error::static_cache_error::StaticCacheError;
use crate::error::static_cache_error_enums::StaticCacheErrorKind;
use crate::logging::buffered_log::BufferedLog;

pub struct SysLog {
    pub buffered_log: Option<BufferedLog>,
    // Level written to the log file
    log_level: LogType,
    // Level echoed to stdout
    stdout_log_level: LogType,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogType {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogType::Error => write!(f, "ERROR"),
            LogType::Info => write!(f, "INFO"),
            LogType::Warn => write!(f, "WARN"),
            LogType::Debug => write!(f, "DEBUG"),
            LogType::Trace => write!(f, "TRACE"),
            LogType::Off => write!(f, "OFF"),
        }
    }
}

impl SysLog {
    pub fn new(log_level: LogType, stdout_log_level: LogType) -> Self {
        SysLog {
            buffered_log: None,
            log_level,
            stdout_log_level,
        }
    }

    pub fn is_enabled(&self, log_type: LogType) -> bool {
        log_type != LogType::Off && (self.is_file_enabled(log_type) || self.is_stdout_enabled(log_type))
    }

    fn is_file_enabled(&self, log_type: LogType) -> bool {
        self.buffered_log.is_some() && log_type as u8 <= self.log_level as u8
    }

    fn is_stdout_enabled(&self, log_type: LogType) -> bool {
        log_type as u8 <= self.stdout_log_level as u8
    }

    pub fn add_log(&self, log_type: LogType, log: String) {
        if !self.is_enabled(log_type) {
            return;
        }

        let ts = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
        let log_entry = format!("{} - [{}] {}", &ts, &log_type, &log);

        if self.is_stdout_enabled(log_type) {
            println!("{}", &log_entry);
        }

        if self.is_file_enabled(log_type) {
            if let Some(buffered_log) = &self.buffered_log {
                buffered_log.add_log(log_entry);
            }
        }
    }

    pub fn flush(&self, force: bool) {
        if let Some(buffered_log) = &self.buffered_log {
            buffered_log.consider_flush(force);
        }
    }
}

pub static SYS_LOG: LazyLock<RwLock<SysLog>> = LazyLock::new(|| RwLock::new(SysLog::new(LogType::Info, LogType::Warn)));

// Reconfigure the system log for the given operation mode, optionally also writing to a file
pub fn init_logging(operation_mode: OperationMode, log_file: Option<&str>) -> Result<(), StaticCacheError> {
    let log_level = operation_mode.get_log_level();
    let buffered_log = match log_file {
        Some(path) => Some(
            BufferedLog::new("syslog".to_string(), path.to_string())
                .map_err(|e| StaticCacheError::new(StaticCacheErrorKind::Logging(e), format!("Failed to open log file: {}", path)))?,
        ),
        None => None,
    };

    let mut sys_log = SYS_LOG.write();
    sys_log.flush(true);
    sys_log.log_level = log_level;
    // With a log file configured, debug and trace only go to the file
    sys_log.stdout_log_level = if log_level as u8 > LogType::Info as u8 && buffered_log.is_some() {
        LogType::Info
    } else {
        log_level
    };
    sys_log.buffered_log = buffered_log;
    Ok(())
}

// Periodically writes buffered log lines, with a final forced flush on shutdown
pub fn start_flushing_task(shutdown_token: CancellationToken) {
    tokio::spawn(async move {
        loop {
            select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(500)) => {
                    SYS_LOG.read().flush(false);
                },
                _ = shutdown_token.cancelled() => {
                    SYS_LOG.read().flush(true);
                    break;
                },
            }
        }
    });
}

pub fn error<S: Into<String>>(log: S) {
    SYS_LOG.read().add_log(LogType::Error, log.into());
}

pub fn warn<S: Into<String>>(log: S) {
    SYS_LOG.read().add_log(LogType::Warn, log.into());
}

pub fn info<S: Into<String>>(log: S) {
    SYS_LOG.read().add_log(LogType::Info, log.into());
}

pub fn debug<S: Into<String>>(log: S) {
    SYS_LOG.read().add_log(LogType::Debug, log.into());
}

pub fn trace<S: Into<String>>(log: S) {
    SYS_LOG.read().add_log(LogType::Trace, log.into());
}
