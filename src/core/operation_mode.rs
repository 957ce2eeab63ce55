use crate::logging::syslog::LogType;

// Operation mode, which decides how chatty the system log is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationMode {
    DEV,
    DEBUG,
    PRODUCTION,
    ULTIMATE,
}

impl OperationMode {
    pub fn get_log_level(&self) -> LogType {
        match self {
            OperationMode::DEV => LogType::Trace,
            OperationMode::DEBUG => LogType::Debug,
            OperationMode::PRODUCTION => LogType::Info,
            OperationMode::ULTIMATE => LogType::Warn,
        }
    }
}

pub fn match_string_to_operation_mode(mode_str: &str) -> Option<OperationMode> {
    match mode_str.trim().to_uppercase().as_str() {
        "DEV" => Some(OperationMode::DEV),
        "DEBUG" => Some(OperationMode::DEBUG),
        "PRODUCTION" => Some(OperationMode::PRODUCTION),
        "ULTIMATE" => Some(OperationMode::ULTIMATE),
        _ => None,
    }
}
