use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceClientError {
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    #[error("service rejected request ({status} {code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("accepted response carried no Operation-Location header")]
    MissingOperationLocation,

    #[error("malformed response: {context}")]
    Malformed { context: String },
}

impl FaceClientError {
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::Malformed {
            context: context.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
