use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use std::fmt::Debug;

use crate::http::request_response::body_error::BodyError;

pub enum ServeBody {
    Empty,
    Buffered(Bytes),
    Streaming(BoxBody<Bytes, BodyError>),
}

impl Debug for ServeBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeBody::Empty => write!(f, "ServeBody::Empty"),
            ServeBody::Buffered(bytes) => write!(f, "ServeBody::Buffered(len={})", bytes.len()),
            ServeBody::Streaming(_) => write!(f, "ServeBody::Streaming(...)"),
        }
    }
}
