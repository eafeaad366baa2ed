use thiserror::Error;

/// Errors at the I/O edges of the renderer.
///
/// Rendering itself cannot fail; these come from loading configuration and
/// environment maps or writing images.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid environment map: {0}")]
    InvalidEnvironmentMap(String),

    #[error("Invalid render config: {0}")]
    InvalidConfig(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
