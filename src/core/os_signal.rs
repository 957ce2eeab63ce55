use crate::core::shutdown_manager::get_shutdown_manager;
use crate::logging::syslog::error;
#[cfg(windows)]
use tokio::signal;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

#[cfg(unix)]
async fn handle_unix_signals() -> Result<(), std::io::Error> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let reason = tokio::select! {
        _ = sigterm.recv() => "SIGTERM received",
        _ = sigint.recv() => "SIGINT received",
    };
    get_shutdown_manager().initiate_shutdown(reason);

    Ok(())
}

#[cfg(windows)]
async fn handle_windows_signals() -> Result<(), std::io::Error> {
    signal::ctrl_c().await?;
    get_shutdown_manager().initiate_shutdown("Ctrl-C received");
    Ok(())
}

pub fn start_os_signal_handling() {
    #[cfg(unix)]
    tokio::spawn(async {
        if let Err(e) = handle_unix_signals().await {
            error(format!("Error handling Unix signals: {}", e));
        }
    });

    #[cfg(windows)]
    tokio::spawn(async {
        if let Err(e) = handle_windows_signals().await {
            error(format!("Error handling Windows signals: {}", e));
        }
    });
}
