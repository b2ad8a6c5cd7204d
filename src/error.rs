use std::path::PathBuf;

use thiserror::Error;

/// Failure of a registration that reached the provider and was rejected
/// (or answered with something that is not a success).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFailure {
    /// Human readable summary, e.g. the provider's `textoMensagemErro`.
    pub message: String,
    /// Items found under `detail.erro` in a SOAP fault, in document order.
    pub details: Vec<String>,
}

impl std::fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.details.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.message, self.details.join("; "))
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} is not configured")]
    MissingCredentials(&'static str),

    #[error("could not create cache directory '{}': {source}", path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not connect to the webservice: {0}")]
    Connection(String),

    #[error("authorization rejected: {0}")]
    Authorization(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("registration rejected: {0}")]
    Registration(RegistrationFailure),

    #[error("could not obtain token: {0}")]
    TokenAcquisition(Box<ClientError>),

    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl ClientError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ClientError::MissingCredentials(_) => "missing_credentials",
            ClientError::CacheDir { .. } => "cache_dir",
            ClientError::Connection(_) => "connection",
            ClientError::Authorization(_) => "authorization",
            ClientError::MalformedResponse(_) => "malformed_response",
            ClientError::Registration(_) => "registration",
            ClientError::TokenAcquisition(_) => "token_acquisition",
            ClientError::InvalidFieldName(_) => "invalid_field_name",
            ClientError::InvalidSettings(_) => "invalid_settings",
            ClientError::Http(_) => "http",
            ClientError::Metrics(_) => "metrics",
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
