/// Errors produced by hash and identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hex character at position {position}: '{character}'")]
    InvalidHex { position: usize, character: char },

    #[error("invalid hex length: expected {expected}, got {actual}")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    #[error("fan-out table not monotonic at bucket {bucket}")]
    FanoutNotMonotonic { bucket: usize },

    #[error("SHA-1 collision detected")]
    Sha1Collision,
}
