use thiserror::Error;

#[derive(Debug, Error)]
pub enum QbankError {
    #[error("no page template available")]
    MissingPageTemplate,

    #[error("flowable cannot fit on any page: {0}")]
    UnplaceableFlowable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to turn an embedded image reference into pixels. Always recoverable
/// during layout: the caller substitutes a built-in graphic.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("empty image reference")]
    Empty,

    #[error("malformed data uri: {0}")]
    InvalidDataUri(String),

    #[error("base64 payload rejected: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("unsupported image: {0}")]
    Unsupported(String),

    #[error("invalid font data for {0}")]
    Font(String),

    #[error("image stream compression failed: {0}")]
    Compress(#[from] std::io::Error),
}
