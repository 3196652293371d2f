//! "End session" action on the site that owns linked training sessions

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

/// How long to wait for the end-session call before falling back
pub const END_SESSION_TIMEOUT: Duration = Duration::from_secs(8);

/// What the client should do after asking to end a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "url", rename_all = "lowercase")]
pub enum EndSessionOutcome {
    /// The site accepted the request
    Ended,
    /// The call did not succeed; send the user to this page instead
    Navigate(String),
}

/// Client for the session endpoints of the host site
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
}

impl SessionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(END_SESSION_TIMEOUT)
            // A redirect (typically to a login page) means the call did not land
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn end_url(&self, session_id: &str) -> String {
        format!("{}/training/session/{}/end/", self.base_url, session_id)
    }

    pub fn session_url(&self, session_id: &str) -> String {
        format!("{}/training/session/{}/", self.base_url, session_id)
    }

    /// Best-effort end; any failure degrades to navigation
    pub async fn end_session(&self, session_id: &str) -> EndSessionOutcome {
        let url = self.end_url(session_id);
        match self
            .http
            .post(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!("Ended session {}", session_id);
                EndSessionOutcome::Ended
            }
            Ok(response) => {
                warn!(
                    "End session {} returned {}, navigating instead",
                    session_id,
                    response.status()
                );
                EndSessionOutcome::Navigate(self.session_url(session_id))
            }
            Err(e) => {
                warn!("End session {} failed: {}, navigating instead", session_id, e);
                EndSessionOutcome::Navigate(self.session_url(session_id))
            }
        }
    }
}
