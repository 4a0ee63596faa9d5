use thiserror::Error;

/// HexLink unified error type
#[derive(Error, Debug)]
pub enum HexLinkError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Failed to connect to {endpoint}: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection timeout to {endpoint} after {timeout_ms}ms")]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },

    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Output error: {0}")]
    Output(String),
}

impl HexLinkError {
    /// True for errors caused by caller input rather than the socket.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HexLinkError::InvalidHex(_)
                | HexLinkError::InvalidEndpoint(_)
                | HexLinkError::InvalidInput(_)
        )
    }
}

pub type HexLinkResult<T> = Result<T, HexLinkError>;
