use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::write::GzEncoder;
use futures::{Stream, ready};
use hyper::body::Bytes;
use md5::{Digest, Md5};
use std::{
    io::Write,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use crate::{file::file_record::FileRecord, logging::syslog::trace};

// Response bodies must be Sync to fit in a hyper BoxBody
pub type FileByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// Forwards file chunks unchanged while feeding them to an MD5 digest.
///
/// The digest is stored on the record only when the inner stream ends
/// cleanly. An error or an early drop (client went away) discards it.
pub struct HashingStream<S> {
    inner: S,
    hasher: Option<Md5>,
    record: Arc<FileRecord>,
    generation: u64,
    bytes_seen: u64,
}

impl<S> HashingStream<S> {
    pub fn new(inner: S, record: Arc<FileRecord>, generation: u64) -> Self {
        HashingStream {
            inner,
            hasher: Some(Md5::new()),
            record,
            generation,
            bytes_seen: 0,
        }
    }
}

impl<S> Stream for HashingStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
            Some(Ok(chunk)) => {
                if let Some(hasher) = this.hasher.as_mut() {
                    hasher.update(&chunk);
                    this.bytes_seen += chunk.len() as u64;
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                this.hasher = None;
                Poll::Ready(Some(Err(e)))
            }
            None => {
                if let Some(hasher) = this.hasher.take() {
                    let content_hash = STANDARD.encode(hasher.finalize());
                    if this.record.store_streamed_hash(this.generation, this.bytes_seen, content_hash) {
                        trace(format!("Stored streamed hash for {}", this.record.get_key()));
                    }
                }
                Poll::Ready(None)
            }
        }
    }
}

/// Gzip-compresses a byte stream chunk by chunk. Output is never cached.
pub struct GzipStream<S> {
    inner: S,
    encoder: Option<GzEncoder<Vec<u8>>>,
}

impl<S> GzipStream<S> {
    pub fn new(inner: S) -> Self {
        GzipStream {
            inner,
            encoder: Some(GzEncoder::new(Vec::new(), flate2::Compression::default())),
        }
    }
}

impl<S> Stream for GzipStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.encoder.is_none() {
                return Poll::Ready(None);
            }

            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(chunk)) => {
                    let Some(encoder) = this.encoder.as_mut() else {
                        return Poll::Ready(None);
                    };
                    if let Err(e) = encoder.write_all(&chunk) {
                        this.encoder = None;
                        return Poll::Ready(Some(Err(e)));
                    }
                    let compressed = std::mem::take(encoder.get_mut());
                    // The encoder buffers small inputs, keep reading until it emits something
                    if compressed.is_empty() {
                        continue;
                    }
                    return Poll::Ready(Some(Ok(Bytes::from(compressed))));
                }
                Some(Err(e)) => {
                    this.encoder = None;
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    let Some(encoder) = this.encoder.take() else {
                        return Poll::Ready(None);
                    };
                    return match encoder.finish() {
                        Ok(remaining) if remaining.is_empty() => Poll::Ready(None),
                        Ok(remaining) => Poll::Ready(Some(Ok(Bytes::from(remaining)))),
                        Err(e) => Poll::Ready(Some(Err(e))),
                    };
                }
            }
        }
    }
}
