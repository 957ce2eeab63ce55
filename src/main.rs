use staticache::configuration::load_configuration;
use staticache::core::command_line_args::get_command_line_args;
use staticache::core::operation_mode::{OperationMode, match_string_to_operation_mode};
use staticache::core::os_signal::start_os_signal_handling;
use staticache::core::shutdown_manager::get_shutdown_manager;
use staticache::http::http_server::initialize_server;
use staticache::http::static_file_handler::StaticFileHandler;
use staticache::logging::syslog::{SYS_LOG, error, info, init_logging, start_flushing_task};
use std::sync::Arc;

fn main() {
    // Load configuration, command line arguments override the configuration file
    let configuration = match load_configuration::init(get_command_line_args()) {
        Ok(configuration) => configuration,
        Err(e) => {
            error(format!("Failed to load configuration: {}", e));
            std::process::exit(1);
        }
    };

    let operation_mode = match_string_to_operation_mode(&configuration.operation_mode).unwrap_or(OperationMode::PRODUCTION);
    if let Err(e) = init_logging(operation_mode, configuration.log_file.as_deref()) {
        error(format!("Failed to initialize logging: {}", e));
        std::process::exit(1);
    }

    let version = env!("CARGO_PKG_VERSION");
    info(format!("Starting staticache {}...", version));
    info(format!("Operation mode: {:?}", operation_mode));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error(format!("Failed to create async runtime: {}", e));
            std::process::exit(1);
        }
    };

    let exit_code = runtime.block_on(async { start_main_server_thread(configuration).await });

    SYS_LOG.read().flush(true);
    std::process::exit(exit_code);
}

async fn start_main_server_thread(configuration: staticache::configuration::configuration::Configuration) -> i32 {
    start_flushing_task(get_shutdown_manager().get_cancellation_token());
    start_os_signal_handling();

    info(format!("Serving directory: {} with prefix {}", configuration.dir, configuration.prefix));
    let handler = match StaticFileHandler::new(&configuration).await {
        Ok(handler) => Arc::new(handler),
        Err(e) => {
            error(format!("Failed to initialize the file cache: {}", e));
            return 1;
        }
    };
    info(format!("File cache initialized with {} files", handler.get_cache().get_current_item_count()));

    let server_tasks = match initialize_server(&configuration.bindings, handler).await {
        Ok(tasks) => tasks,
        Err(e) => {
            error(format!("Error initializing server: {}", e));
            return 1;
        }
    };

    // Accept loops only end once shutdown has been initiated
    for task in server_tasks {
        if let Err(e) = task.await {
            error(format!("Server task failed: {}", e));
        }
    }
    info("Server stopped");
    0
}
