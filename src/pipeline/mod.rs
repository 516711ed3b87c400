pub mod acquire;
pub mod format;
pub mod normalize;

pub use acquire::*;
pub use format::*;
pub use normalize::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("URL returned status {status}")]
    BadStatus { status: u16 },

    #[error("URL did not return an image (content type: {content_type})")]
    NotAnImage { content_type: String },
}

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),
}
