use thiserror::Error;

pub type Result<T> = std::result::Result<T, ObjectStoreError>;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for ObjectStoreError {
    fn from(err: reqwest::Error) -> Self {
        ObjectStoreError::Network(err.to_string())
    }
}
