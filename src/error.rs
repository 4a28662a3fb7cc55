#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The identity provider rejected a call or answered with something unusable.
    #[error("{operation} failed: {detail}")]
    Exchange {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Gradebook data error: {0}")]
    Data(String),
    #[error("Render error: {0}")]
    Render(String),
}

impl Error {
    pub(crate) fn exchange(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Exchange {
            operation,
            status: None,
            detail: detail.into(),
        }
    }
}
