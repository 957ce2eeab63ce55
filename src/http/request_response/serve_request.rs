use http::request::Parts;
use hyper::{HeaderMap, Method, Request};

// Read-only view of an inbound request. The body is never needed for GET/HEAD.
#[derive(Debug)]
pub struct ServeRequest {
    parts: Parts,
    remote_ip: String,
}

impl ServeRequest {
    pub fn new<B>(hyper_request: Request<B>) -> Self {
        let (parts, _body) = hyper_request.into_parts();
        Self {
            parts,
            remote_ip: String::new(),
        }
    }

    pub fn with_remote_ip(mut self, remote_ip: &str) -> Self {
        self.remote_ip = remote_ip.to_string();
        self
    }

    pub fn get_http_method(&self) -> &Method {
        &self.parts.method
    }

    pub fn get_path(&self) -> &str {
        self.parts.uri.path()
    }

    // Path as received, query string included
    pub fn get_path_and_query(&self) -> &str {
        self.parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or_else(|| self.parts.uri.path())
    }

    pub fn get_headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn get_remote_ip(&self) -> &str {
        &self.remote_ip
    }
}
