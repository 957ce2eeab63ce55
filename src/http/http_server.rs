use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::select;
use tokio::task::JoinHandle;

use crate::configuration::binding::Binding;
use crate::core::shutdown_manager::get_shutdown_manager;
use crate::error::static_cache_error::StaticCacheError;
use crate::error::static_cache_error_enums::{ServerError, StaticCacheErrorKind};
use crate::http::handle_request::handle_request_entry;
use crate::http::static_file_handler::StaticFileHandler;
use crate::logging::syslog::{error, info, trace};

/// Binds every configured address and starts one accept loop per binding.
/// Fails if any binding cannot be bound, so a misconfigured port is reported
/// at start-up rather than silently skipped.
pub async fn initialize_server(bindings: &[Binding], handler: Arc<StaticFileHandler>) -> Result<Vec<JoinHandle<()>>, StaticCacheError> {
    let mut listeners = Vec::new();
    for binding in bindings {
        let addr = binding.get_socket_addr().ok_or_else(|| {
            StaticCacheError::new(StaticCacheErrorKind::Server(ServerError::InvalidBinding), format!("{}:{}", binding.ip, binding.port))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| StaticCacheError::new(StaticCacheErrorKind::Server(ServerError::Bind(e)), addr.to_string()))?;
        info(format!("Serving static files on http://{}", listener.local_addr().unwrap_or(addr)));
        listeners.push(listener);
    }

    Ok(listeners.into_iter().map(|listener| tokio::spawn(start_server_binding(listener, handler.clone()))).collect())
}

pub async fn start_server_binding(listener: TcpListener, handler: Arc<StaticFileHandler>) {
    let cancellation_token = get_shutdown_manager().get_cancellation_token();
    let local_addr = listener.local_addr().map(|addr| addr.to_string()).unwrap_or_else(|_| "<unknown>".to_string());

    loop {
        select! {
            _ = cancellation_token.cancelled() => {
                trace(format!("Termination signal received, stopping server on {}", local_addr));
                return;
            },
            result = listener.accept() => {
                match result {
                    Ok((tcp_stream, remote_addr)) => {
                        let remote_addr_ip = remote_addr.ip().to_string();
                        let io = TokioIo::new(tcp_stream);

                        tokio::task::spawn({
                            let handler = handler.clone();
                            let shutdown_token = cancellation_token.clone();
                            async move {
                                let svc = service_fn(move |req| handle_request_entry(req, handler.clone(), remote_addr_ip.clone(), shutdown_token.clone()));
                                if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                                    trace(format!("Error serving connection: {:?}", err));
                                }
                            }
                        });
                    }
                    Err(err) => {
                        error(format!("Failed to accept connection: {:?}", err));
                    }
                }
            }
        };
    }
}
