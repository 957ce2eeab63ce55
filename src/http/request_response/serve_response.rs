use http::response::Parts;
use http_body_util::BodyExt;
use http_body_util::Full;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::{HeaderMap, Response, StatusCode};

use crate::http::request_response::body_error::BodyError;
use crate::http::request_response::serve_body::ServeBody;

// Wrapper around hyper responses produced by the static file handler
#[derive(Debug)]
pub struct ServeResponse {
    parts: Parts,
    body: ServeBody,
}

impl ServeResponse {
    pub fn new_empty_with_status(status: StatusCode) -> Self {
        let (mut parts, _body) = Response::new(()).into_parts();
        parts.status = status;
        Self { parts, body: ServeBody::Empty }
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn get_status(&self) -> StatusCode {
        self.parts.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.parts.status = status;
    }

    pub fn set_body(&mut self, body: ServeBody) {
        self.body = body;
    }

    // Convert back into a hyper Response
    pub fn into_hyper(self) -> Response<BoxBody<Bytes, BodyError>> {
        let body: BoxBody<Bytes, BodyError> = match self.body {
            ServeBody::Empty => BoxBody::new(Full::new(Bytes::new()).map_err(|never| -> BodyError { match never {} })),
            ServeBody::Buffered(bytes) => BoxBody::new(Full::new(bytes).map_err(|never| -> BodyError { match never {} })),
            ServeBody::Streaming(boxed_body) => boxed_body,
        };
        Response::from_parts(self.parts, body)
    }
}
