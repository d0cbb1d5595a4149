use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashgenError {
    #[error("Invalid selector fragment '{fragment}' in '{input}'")]
    Selector { fragment: String, input: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Grafana returned status {status}: {body}")]
    Grafana { status: u16, body: String },

    #[error("Unknown dashboard: {0}")]
    UnknownDashboard(String),
}

pub type Result<T> = std::result::Result<T, DashgenError>;
