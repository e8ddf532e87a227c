//! Runtime configuration for a girder run.
//!
//! Credentials come from the environment; per-run parameters (date
//! window, worker count, page size) come from the caller and are
//! validated by [`crate::fetch::FetchOptions::validate`].

use crate::error::{Error, Result};
use girder_client::page::DateWindow;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials and addressing for the remote tracking API.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    /// Base URL of the API, e.g. `https://example.atlassian.net`.
    pub base_url: String,
    /// Account email for basic authentication.
    pub email: String,
    /// API token paired with the email.
    pub token: String,
    /// Project whose issues are fetched.
    pub project_key: String,
}

impl ApiCredentials {
    /// Load credentials from `API_BASE_URL`, `API_EMAIL`, `API_TOKEN`,
    /// and `PROJECT_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing or empty
    /// variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: required_env("API_BASE_URL")?,
            email: required_env("API_EMAIL")?,
            token: required_env("API_TOKEN")?,
            project_key: required_env("PROJECT_KEY")?,
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "environment variable {name} must be set"
        ))),
    }
}

/// Parse `start`/`end` ISO calendar dates into a validated window.
///
/// # Errors
///
/// Returns [`Error::Config`] for an unparsable date or when `end` is
/// before `start`.
pub fn parse_window(start: &str, end: &str) -> Result<DateWindow> {
    let start = start
        .parse()
        .map_err(|err| Error::Config(format!("invalid start date {start:?}: {err}")))?;
    let end = end
        .parse()
        .map_err(|err| Error::Config(format!("invalid end date {end:?}: {err}")))?;
    if end < start {
        return Err(Error::Config(format!(
            "end date {end} is before start date {start}"
        )));
    }
    Ok(DateWindow::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_valid_window() {
        let window = parse_window("2024-01-01", "2024-03-31").unwrap();
        assert_eq!(window.days(), 91);
    }

    #[test]
    fn single_day_window_is_valid() {
        assert!(parse_window("2024-01-01", "2024-01-01").is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = parse_window("2024-03-31", "2024-01-01").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert!(matches!(
            parse_window("yesterday", "2024-01-01"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_window("2024-01-01", "01/31/2024"),
            Err(Error::Config(_))
        ));
    }
}
