use crate::configuration::binding::Binding;
use crate::core::operation_mode::match_string_to_operation_mode;
use hyper::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub dir: String,            // Directory the files are served from
    pub prefix: String,         // URL prefix, "/" serves the directory at the root
    pub gzip: bool,             // Negotiate gzip with clients
    pub max_age: u64,           // Cache-Control max-age in seconds
    pub buffer: bool,           // Hold file contents in memory instead of streaming from disk
    pub preload: bool,          // Load every file under dir at startup
    pub dynamic: bool,          // Load files not seen at startup on first request
    pub extra_headers: Vec<BTreeMap<String, String>>,
    pub compressible_content_types: Vec<String>,
    pub bindings: Vec<Binding>,
    pub operation_mode: String,
    pub log_file: Option<String>,
}

impl Configuration {
    pub fn new() -> Self {
        Configuration {
            dir: ".".to_string(),
            prefix: "/".to_string(),
            gzip: false,
            max_age: 0,
            buffer: true,
            preload: true,
            dynamic: true,
            extra_headers: vec![],
            compressible_content_types: vec![
                "text/".to_string(),
                "application/javascript".to_string(),
                "application/json".to_string(),
                "application/xml".to_string(),
                "application/xhtml+xml".to_string(),
                "application/x-javascript".to_string(),
                "application/x-yaml".to_string(),
                "image/svg+xml".to_string(),
                "application/font-woff".to_string(),
            ],
            bindings: vec![Binding::new()],
            operation_mode: "PRODUCTION".to_string(),
            log_file: None,
        }
    }

    // Sanitize the configuration before use
    pub fn sanitize(&mut self) {
        self.dir = self.dir.trim().to_string();

        // Prefix always starts with a slash and only the root prefix ends with one
        let mut prefix = self.prefix.trim().replace('\\', "/");
        while prefix.contains("//") {
            prefix = prefix.replace("//", "/");
        }
        if !prefix.starts_with('/') {
            prefix = format!("/{}", prefix);
        }
        while prefix.len() > 1 && prefix.ends_with('/') {
            prefix.pop();
        }
        self.prefix = prefix;

        for headers in &mut self.extra_headers {
            *headers = headers.iter().map(|(name, value)| (name.trim().to_string(), value.trim().to_string())).collect();
        }

        self.compressible_content_types = self
            .compressible_content_types
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        for binding in &mut self.bindings {
            binding.sanitize();
        }

        self.operation_mode = self.operation_mode.trim().to_uppercase();
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.dir.is_empty() {
            errors.push("Directory cannot be empty".to_string());
        } else if !std::path::Path::new(&self.dir).is_dir() {
            errors.push(format!("Directory does not exist: {}", self.dir));
        }

        if self.prefix.split('/').any(|segment| segment == "." || segment == "..") {
            errors.push(format!("Prefix cannot contain dot segments: {}", self.prefix));
        }

        if !self.preload && !self.dynamic {
            errors.push("Either preload or dynamic loading must be enabled, otherwise nothing is served".to_string());
        }

        for (idx, headers) in self.extra_headers.iter().enumerate() {
            for (name, value) in headers {
                if HeaderName::from_bytes(name.as_bytes()).is_err() {
                    errors.push(format!("Extra header set {} has an invalid header name: '{}'", idx + 1, name));
                }
                if HeaderValue::from_str(value).is_err() {
                    errors.push(format!("Extra header set {} has an invalid value for header '{}'", idx + 1, name));
                }
            }
        }

        if self.bindings.is_empty() {
            errors.push("At least one binding is required".to_string());
        }
        for binding in &self.bindings {
            if let Err(binding_errors) = binding.validate() {
                for error in binding_errors {
                    errors.push(format!("Binding {}:{}: {}", binding.ip, binding.port, error));
                }
            }
        }

        if match_string_to_operation_mode(&self.operation_mode).is_none() {
            errors.push(format!("Unknown operation mode: {}", self.operation_mode));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    // Extra headers flattened in configuration order, ready to append to a response
    pub fn get_extra_header_values(&self) -> Vec<(HeaderName, HeaderValue)> {
        self.extra_headers
            .iter()
            .flat_map(|headers| headers.iter())
            .filter_map(|(name, value)| {
                let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
                let value = HeaderValue::from_str(value).ok()?;
                Some((name, value))
            })
            .collect()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
