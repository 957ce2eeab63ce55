use flate2::write::GzEncoder;
use hyper::HeaderMap;
use hyper::body::Bytes;
use std::io::Write;

use crate::{
    file::{
        file_record::{FileRecord, LoadedFile},
        mime_types::CompressibleTypes,
    },
    logging::syslog::{trace, warn},
};

// Files at or below this size are always sent uncompressed
pub const MIN_COMPRESS_LENGTH: u64 = 1024;

/// The representation chosen for a response body.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyPlan {
    // Bytes held in memory, already compressed when `gzip` is set
    Buffered { content: Bytes, gzip: bool },
    // Read from disk per request, piped through gzip when `gzip` is set
    Streamed { gzip: bool },
}

impl BodyPlan {
    pub fn is_gzip(&self) -> bool {
        match self {
            BodyPlan::Buffered { gzip, .. } | BodyPlan::Streamed { gzip } => *gzip,
        }
    }
}

pub struct Compression {
    gzip_enabled: bool,
    compressible_types: CompressibleTypes,
}

impl Compression {
    pub fn new(gzip_enabled: bool, compressible_types: CompressibleTypes) -> Self {
        Compression {
            gzip_enabled,
            compressible_types,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gzip_enabled
    }

    /// Whether the client negotiated gzip through `Accept-Encoding`.
    ///
    /// An explicit `gzip` entry wins over `*`, and `q=0` refuses. A missing
    /// or empty header accepts nothing.
    pub fn accepts_gzip(headers: &HeaderMap) -> bool {
        let mut gzip_quality: Option<f32> = None;
        let mut wildcard_quality: Option<f32> = None;

        for value in headers.get_all(hyper::header::ACCEPT_ENCODING) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for entry in value.split(',') {
                let mut parts = entry.split(';');
                let coding = parts.next().unwrap_or("").trim().to_lowercase();
                if coding.is_empty() {
                    continue;
                }
                let quality = parts
                    .filter_map(|param| {
                        let (name, value) = param.split_once('=')?;
                        if name.trim().eq_ignore_ascii_case("q") { value.trim().parse::<f32>().ok() } else { None }
                    })
                    .next()
                    .unwrap_or(1.0);

                match coding.as_str() {
                    "gzip" | "x-gzip" => gzip_quality = Some(gzip_quality.map_or(quality, |q| q.max(quality))),
                    "*" => wildcard_quality = Some(quality),
                    _ => {}
                }
            }
        }

        match (gzip_quality, wildcard_quality) {
            (Some(q), _) => q > 0.0,
            (None, Some(q)) => q > 0.0,
            (None, None) => false,
        }
    }

    pub fn should_compress(&self, mime_type: &str, content_length: u64, accepts_gzip: bool) -> bool {
        let should = self.gzip_enabled && content_length > MIN_COMPRESS_LENGTH && accepts_gzip && self.compressible_types.is_compressible(mime_type);
        trace(format!(
            "Should compress check for MIME type {} and content_length: {} - Result: {}",
            mime_type, content_length, should
        ));
        should
    }

    /// Compress content using gzip
    pub fn compress_content(content: &[u8], gzip_content: &mut Vec<u8>) -> Result<(), std::io::Error> {
        let mut encoder = GzEncoder::new(gzip_content, flate2::Compression::default());
        encoder.write_all(content)?;
        encoder.finish()?;
        Ok(())
    }

    /// Picks the body representation for a GET or HEAD, compressing and
    /// caching a buffered record's gzip copy on first use.
    pub async fn plan_body(&self, record: &FileRecord, loaded: &LoadedFile, accepts_gzip: bool) -> BodyPlan {
        if let Some(plan) = Self::cached_plan(loaded, accepts_gzip) {
            return plan;
        }

        let should_compress = self.should_compress(record.get_mime_type(), loaded.length, accepts_gzip);
        let Some(content) = loaded.content.clone() else {
            return BodyPlan::Streamed { gzip: should_compress };
        };
        if !should_compress {
            return BodyPlan::Buffered { content, gzip: false };
        }

        let compressed = record
            .compressed_content_with(|content| {
                let mut gzip_content = Vec::new();
                Self::compress_content(content, &mut gzip_content)?;
                Ok(gzip_content)
            })
            .await;

        match compressed {
            Ok(Some(compressed)) => BodyPlan::Buffered { content: compressed, gzip: true },
            Ok(None) => BodyPlan::Buffered { content, gzip: false },
            Err(e) => {
                warn(format!("Failed to compress file {}: {}", record.get_key(), e));
                BodyPlan::Buffered { content, gzip: false }
            }
        }
    }

    // A cached gzip copy is only sent to clients that negotiated it
    fn cached_plan(loaded: &LoadedFile, accepts_gzip: bool) -> Option<BodyPlan> {
        let compressed = loaded.compressed_content.as_ref()?;
        if accepts_gzip {
            Some(BodyPlan::Buffered {
                content: compressed.clone(),
                gzip: true,
            })
        } else {
            loaded.content.clone().map(|content| BodyPlan::Buffered { content, gzip: false })
        }
    }
}
