use std::fmt;

use thiserror::Error;

pub type HarnessResult<T> = Result<T, HarnessError>;

/// One candidate URL tried during navigation, with what came back.
#[derive(Clone, Debug)]
pub struct NavigationAttempt {
    pub url: String,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl fmt::Display for NavigationAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.error) {
            (Some(status), _) => write!(f, "{} -> {}", self.url, status),
            (None, Some(error)) => write!(f, "{} -> {}", self.url, error),
            (None, None) => write!(f, "{} -> no response", self.url),
        }
    }
}

fn format_attempts(attempts: &[NavigationAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_observed(last_observed: &Option<String>) -> String {
    last_observed
        .as_deref()
        .map(|seen| format!("; last observed: {seen}"))
        .unwrap_or_default()
}

/// Failures are fatal for the scenario that raised them; none are retried or
/// silently downgraded.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    #[error("no candidate URL was reachable: {tried}", tried = format_attempts(.attempts))]
    Navigation { attempts: Vec<NavigationAttempt> },

    #[error(
        "page did not become ready within {timeout_ms}ms ({condition}){observed}",
        observed = format_observed(.last_observed)
    )]
    ReadinessTimeout {
        condition: String,
        timeout_ms: u64,
        last_observed: Option<String>,
    },

    #[error(
        "expectation not satisfied within {timeout_ms}ms ({expectation}){observed}",
        observed = format_observed(.last_observed)
    )]
    ExpectationTimeout {
        expectation: String,
        timeout_ms: u64,
        last_observed: Option<String>,
    },

    #[error("locator {locator} is not actionable: {reason}")]
    Locator { locator: String, reason: String },

    #[error("static server failed to start: {0}")]
    Server(String),

    #[error(transparent)]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Whether this error means the browser or server infrastructure never
    /// came up, as opposed to the page misbehaving.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, HarnessError::Launch(_) | HarnessError::Server(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_error_lists_every_attempt() {
        let err = HarnessError::Navigation {
            attempts: vec![
                NavigationAttempt {
                    url: "http://127.0.0.1:1/a.html".into(),
                    status: Some(404),
                    error: None,
                },
                NavigationAttempt {
                    url: "http://127.0.0.1:1/b.html".into(),
                    status: None,
                    error: Some("connection refused".into()),
                },
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("a.html -> 404"));
        assert!(rendered.contains("b.html -> connection refused"));
    }

    #[test]
    fn expectation_timeout_carries_last_observed_state() {
        let err = HarnessError::ExpectationTimeout {
            expectation: "body contains \"cosineSimilarity\"".into(),
            timeout_ms: 5000,
            last_observed: Some("Loading...".into()),
        };
        assert!(err.to_string().contains("last observed: Loading..."));
    }
}
