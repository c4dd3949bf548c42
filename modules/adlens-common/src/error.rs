use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdlensError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Scrape provider error: {0}")]
    Provider(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
