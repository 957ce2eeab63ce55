use futures::TryStreamExt;
use http_body_util::{BodyExt, StreamBody, combinators::BoxBody};
use hyper::body::Frame;
use hyper::header::{CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue, VARY};
use hyper::{Method, StatusCode};
use std::path::Path;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::{
    compression::compression::{BodyPlan, Compression},
    configuration::configuration::Configuration,
    error::{
        static_cache_error::{DeclineReason, StaticCacheError},
        static_cache_error_enums::FileCacheError,
    },
    file::{
        body_streams::{FileByteStream, GzipStream, HashingStream},
        file_cache::FileCache,
        file_record::{FileRecord, LoadedFile},
        mime_types::{CompressibleTypes, get_content_type_header},
        path_resolver::{PathResolver, ResolvedPath},
    },
    http::{
        conditional::{is_fresh, set_validators},
        request_response::{body_error::{BodyError, box_err}, serve_body::ServeBody, serve_request::ServeRequest, serve_response::ServeResponse},
    },
    logging::syslog::{debug, trace},
};

const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

#[derive(Debug)]
pub enum HandleOutcome {
    Handled(ServeResponse),
    // Not ours to serve, the caller decides what comes next
    Declined(DeclineReason),
}

/// Serves GET and HEAD requests for files below the configured directory.
pub struct StaticFileHandler {
    resolver: PathResolver,
    cache: Arc<FileCache>,
    compression: Compression,
    extra_headers: Vec<(HeaderName, HeaderValue)>,
}

impl StaticFileHandler {
    /// Builds the handler and its cache, preloading the directory when
    /// configured to.
    pub async fn new(configuration: &Configuration) -> Result<Self, StaticCacheError> {
        let resolver = PathResolver::new(Path::new(&configuration.dir), &configuration.prefix)?;
        let cache = Arc::new(FileCache::from_configuration(configuration));
        if configuration.preload {
            cache.preload(&resolver).await?;
        }

        let compression = Compression::new(configuration.gzip, CompressibleTypes::new(configuration.compressible_content_types.clone()));
        Ok(Self::from_parts(resolver, cache, compression, configuration.get_extra_header_values()))
    }

    pub fn from_parts(resolver: PathResolver, cache: Arc<FileCache>, compression: Compression, extra_headers: Vec<(HeaderName, HeaderValue)>) -> Self {
        StaticFileHandler {
            resolver,
            cache,
            compression,
            extra_headers,
        }
    }

    pub fn get_cache(&self) -> &Arc<FileCache> {
        &self.cache
    }

    pub async fn handle_request(&self, request: &ServeRequest) -> HandleOutcome {
        let method = request.get_http_method();
        if *method != Method::GET && *method != Method::HEAD {
            trace(format!("Declining {} request for {}", method, request.get_path()));
            return HandleOutcome::Declined(DeclineReason::NotOwned);
        }

        // Checked on the raw path to avoid decoding requests we will not serve anyway
        if !self.resolver.matches_prefix(request.get_path_and_query()) {
            return HandleOutcome::Declined(DeclineReason::NotOwned);
        }

        match self.serve(request).await {
            Ok(response) => HandleOutcome::Handled(response),
            Err(e) => {
                let reason = e.decline_reason();
                debug(format!("Declining request for {}: {:?} ({})", request.get_path(), reason, e));
                HandleOutcome::Declined(reason)
            }
        }
    }

    async fn serve(&self, request: &ServeRequest) -> Result<ServeResponse, StaticCacheError> {
        let record = match self.resolver.resolve(request.get_path_and_query(), &self.cache).await? {
            ResolvedPath::Cached(record) => record,
            ResolvedPath::OnDisk { key, full_path } => self.cache.get_or_load(&key, &full_path).await?,
        };
        let loaded = self.cache.refresh(&record).await?;

        let mut response = ServeResponse::new_empty_with_status(StatusCode::OK);
        for (name, value) in &self.extra_headers {
            response.headers_mut().append(name.clone(), value.clone());
        }
        if self.compression.is_enabled() {
            add_vary_accept_encoding(&mut response);
        }

        set_validators(response.headers_mut(), &loaded);
        if is_fresh(request.get_headers(), response.headers()) {
            trace(format!("Client copy of {} is fresh, responding 304", record.get_key()));
            response.set_status(StatusCode::NOT_MODIFIED);
            return Ok(response);
        }

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&get_content_type_header(record.get_mime_type())) {
            headers.insert(CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", record.get_max_age())) {
            headers.insert(CACHE_CONTROL, value);
        }
        if let Some(content_hash) = &loaded.content_hash {
            if let Ok(value) = HeaderValue::from_str(content_hash) {
                headers.insert(CONTENT_MD5, value);
            }
        }

        // HEAD plans exactly like GET so both carry the same headers
        let accepts_gzip = Compression::accepts_gzip(request.get_headers());
        let plan = self.compression.plan_body(&record, &loaded, accepts_gzip).await;

        match &plan {
            BodyPlan::Buffered { content, .. } => {
                set_content_length(&mut response, content.len() as u64);
            }
            BodyPlan::Streamed { gzip: false } => {
                set_content_length(&mut response, loaded.length);
            }
            // Compressed length is unknown until the stream ends
            BodyPlan::Streamed { gzip: true } => {}
        }
        if plan.is_gzip() {
            response.headers_mut().insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }

        if *request.get_http_method() == Method::HEAD {
            return Ok(response);
        }

        let body = match plan {
            BodyPlan::Buffered { content, .. } => ServeBody::Buffered(content),
            BodyPlan::Streamed { gzip } => ServeBody::Streaming(Self::open_file_stream(&record, &loaded, gzip).await?),
        };
        response.set_body(body);
        Ok(response)
    }

    async fn open_file_stream(record: &Arc<FileRecord>, loaded: &LoadedFile, gzip: bool) -> Result<BoxBody<hyper::body::Bytes, BodyError>, StaticCacheError> {
        let file = tokio::fs::File::open(record.get_path())
            .await
            .map_err(|e| StaticCacheError::file_cache(FileCacheError::Io(e), record.get_path().display().to_string()))?;

        let mut stream: FileByteStream = Box::pin(ReaderStream::new(file));
        if loaded.content_hash.is_none() {
            stream = Box::pin(HashingStream::new(stream, record.clone(), loaded.generation));
        }
        if gzip {
            stream = Box::pin(GzipStream::new(stream));
        }

        let stream_body = StreamBody::new(stream.map_ok(Frame::data));
        Ok(BoxBody::new(BodyExt::map_err(stream_body, box_err)))
    }
}

fn set_content_length(response: &mut ServeResponse, length: u64) {
    response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(length));
}

// Merge into an existing Vary header instead of adding a duplicate
fn add_vary_accept_encoding(response: &mut ServeResponse) {
    let already_varies = response
        .headers()
        .get_all(VARY)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|field| field.trim().eq_ignore_ascii_case("accept-encoding") || field.trim() == "*");
    if !already_varies {
        response.headers_mut().append(VARY, HeaderValue::from_static("Accept-Encoding"));
    }
}
