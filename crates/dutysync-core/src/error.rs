use thiserror::Error;

#[derive(Debug, Error)]
pub enum DutySyncError {
    #[error("missing credential: set the {0} environment variable")]
    MissingCredential(&'static str),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("unknown timezone '{0}': expected an IANA name like Asia/Tokyo")]
    InvalidTimezone(String),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: String, detail: String },

    #[error("message to {recipient} rejected: {error}")]
    SendRejected { recipient: String, error: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, DutySyncError>;
