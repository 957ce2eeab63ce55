#[derive(Debug)]
pub enum StaticCacheErrorKind {
    PathResolution(PathResolutionError),
    FileCache(FileCacheError),
    Compression(std::io::Error),
    Configuration(ConfigurationError),
    Server(ServerError),
    Logging(std::io::Error),
}

#[derive(Debug)]
pub enum PathResolutionError {
    PrefixMismatch,
    DecodeFailure,
    InvalidCharacters,
    Traversal,
    HiddenFile,
    OutsideWebRoot,
    NotFound,
    NotAFile,
    WebRoot(std::io::Error),
}

#[derive(Debug)]
pub enum FileCacheError {
    Io(std::io::Error),
    NotAFile,
    NotDiscoverable,
}

#[derive(Debug)]
pub enum ConfigurationError {
    Read(std::io::Error),
    Parse(serde_json::Error),
    InvalidArgument,
    Invalid(Vec<String>),
}

#[derive(Debug)]
pub enum ServerError {
    InvalidBinding,
    Bind(std::io::Error),
}
