use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::header::{CONNECTION, HeaderValue};
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::http::request_response::body_error::BodyError;
use crate::http::request_response::serve_request::ServeRequest;
use crate::http::request_response::serve_response::ServeResponse;
use crate::http::static_file_handler::{HandleOutcome, StaticFileHandler};
use crate::logging::syslog::trace;

// Entry point for every request, the static file handler is the only and therefore terminal handler
pub async fn handle_request_entry<B>(
    req: Request<B>,
    handler: Arc<StaticFileHandler>,
    remote_ip: String,
    shutdown_token: CancellationToken,
) -> Result<Response<BoxBody<Bytes, BodyError>>, hyper::Error> {
    let request = ServeRequest::new(req).with_remote_ip(&remote_ip);

    let mut response = match handler.handle_request(&request).await {
        HandleOutcome::Handled(response) => response,
        HandleOutcome::Declined(reason) => {
            trace(format!("No handler claimed {} {} from {} ({:?}), responding 404", request.get_http_method(), request.get_path(), request.get_remote_ip(), reason));
            ServeResponse::new_empty_with_status(StatusCode::NOT_FOUND)
        }
    };

    // If this is kept alive and we have shut down, we need to inform the client we are shutting down
    if shutdown_token.is_cancelled() {
        response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
    }

    trace(format!(
        "{} {} {} -> {}",
        request.get_remote_ip(),
        request.get_http_method(),
        request.get_path_and_query(),
        response.get_status().as_u16()
    ));
    Ok(response.into_hyper())
}
