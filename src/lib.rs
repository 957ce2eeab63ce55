pub mod compression {
    pub mod compression;
}

pub mod configuration {
    pub mod binding;
    pub mod configuration;
    pub mod load_configuration;
}

pub mod core {
    pub mod command_line_args;
    pub mod operation_mode;
    pub mod os_signal;
    pub mod shutdown_manager;
}

pub mod error {
    pub mod static_cache_error;
    pub mod static_cache_error_enums;
}

pub mod file {
    pub mod body_streams;
    pub mod file_cache;
    pub mod file_enumerator;
    pub mod file_record;
    pub mod mime_types;
    pub mod normalized_path;
    pub mod path_resolver;
}

pub mod http {
    pub mod conditional;
    pub mod handle_request;
    pub mod http_server;
    pub mod static_file_handler;

    pub mod request_response {
        pub mod body_error;
        pub mod serve_body;
        pub mod serve_request;
        pub mod serve_response;
    }
}

pub mod logging {
    pub mod buffered_log;
    pub mod syslog;
}
