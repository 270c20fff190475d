//! Error handling module

use thiserror::Error;

use crate::router::FrequencyBand;

#[derive(Error, Debug)]
pub enum RouterError {
    /// Wrong password (message taken from the login page alert) or no CSRF cookie
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Page structure did not match what this firmware is known to serve
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Issue with {band} band, failed to turn it {}", switched_to(.enable))]
    PartialOperation { band: FrequencyBand, enable: bool },

    #[error("Failed to turn {} WiFi", switched_to(.enable))]
    ToggleFailed { enable: bool },

    #[error("Unknown error")]
    Unknown,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RouterError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, RouterError::Authentication(_))
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;

pub(crate) fn on_off(enable: bool) -> &'static str {
    if enable {
        "on"
    } else {
        "off"
    }
}

fn switched_to(enable: &bool) -> &'static str {
    on_off(*enable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_operation_names_band() {
        let err = RouterError::PartialOperation {
            band: FrequencyBand::FiveGhz,
            enable: true,
        };
        assert_eq!(err.to_string(), "Issue with 5 GHz band, failed to turn it on");
    }

    #[test]
    fn test_toggle_failed_message() {
        assert_eq!(
            RouterError::ToggleFailed { enable: false }.to_string(),
            "Failed to turn off WiFi"
        );
        assert_eq!(
            RouterError::ToggleFailed { enable: true }.to_string(),
            "Failed to turn on WiFi"
        );
    }

    #[test]
    fn test_is_authentication() {
        assert!(RouterError::Authentication("x".into()).is_authentication());
        assert!(!RouterError::Unknown.is_authentication());
        assert!(!RouterError::Protocol("x".into()).is_authentication());
    }
}
