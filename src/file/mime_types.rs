use std::path::Path;

pub fn lookup_mime_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

// Textual types are announced with a charset, the way browsers expect them
pub fn get_content_type_header(mime_type: &str) -> String {
    let essence = get_mime_essence(mime_type);
    let is_textual = essence.starts_with("text/") || essence == "application/javascript" || essence == "application/json";
    if is_textual && !mime_type.contains("charset") {
        format!("{}; charset=utf-8", mime_type)
    } else {
        mime_type.to_string()
    }
}

fn get_mime_essence(mime_type: &str) -> String {
    mime_type.split(';').next().unwrap_or("").trim().to_lowercase()
}

/// Decides which MIME types are worth compressing, by prefix match against
/// a configured list such as `text/` or `application/json`.
#[derive(Clone, Debug)]
pub struct CompressibleTypes {
    prefixes: Vec<String>,
}

impl CompressibleTypes {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(|p| p.trim().to_lowercase()).filter(|p| !p.is_empty()).collect(),
        }
    }

    pub fn is_compressible(&self, mime_type: &str) -> bool {
        let essence = get_mime_essence(mime_type);
        self.prefixes.iter().any(|prefix| essence.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_mime_type() {
        assert_eq!(lookup_mime_type(Path::new("/srv/www/index.html")), "text/html");
        assert_eq!(lookup_mime_type(Path::new("/srv/www/app.css")), "text/css");
        assert_eq!(lookup_mime_type(Path::new("/srv/www/no_extension")), "application/octet-stream");
    }

    #[test]
    fn test_content_type_header_charset() {
        assert_eq!(get_content_type_header("text/plain"), "text/plain; charset=utf-8");
        assert_eq!(get_content_type_header("application/json"), "application/json; charset=utf-8");
        assert_eq!(get_content_type_header("image/png"), "image/png");
        assert_eq!(get_content_type_header("text/html; charset=iso-8859-1"), "text/html; charset=iso-8859-1");
    }

    #[test]
    fn test_compressible_types() {
        let types = CompressibleTypes::new(vec!["text/".to_string(), " Application/JSON ".to_string(), "".to_string()]);
        assert!(types.is_compressible("text/plain"));
        assert!(types.is_compressible("application/json; charset=utf-8"));
        assert!(!types.is_compressible("image/png"));
        assert!(!types.is_compressible("application/octet-stream"));
    }
}
