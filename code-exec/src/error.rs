use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Runtime API error: {status_code} - {message}")]
    Api { status_code: u16, message: String },

    #[error("Invalid runtime response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Timeout after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}
