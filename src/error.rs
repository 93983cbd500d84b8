use thiserror::Error;

#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("malformed lattice token `{token}`: {message}")]
    MalformedToken { token: String, message: String },
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl LatticeError {
    pub(crate) fn malformed_token(token: &str, message: impl Into<String>) -> Self {
        Self::MalformedToken {
            token: token.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }
}
