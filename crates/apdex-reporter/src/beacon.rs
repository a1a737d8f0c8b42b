//! Decoded beacon payloads.
//!
//! The POST body is a JSON document carrying one or more visits, each with
//! the user actions recorded during that visit. It may be wrapped in an
//! object (`{"visits": [...]}`) or be a bare array of visits.

use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAction {
    #[serde(default)]
    pub application: String,
    pub start_time: u64,
    pub end_time: u64,
}

impl UserAction {
    /// Saturates at zero for actions that end before they start.
    pub fn response_time(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    #[serde(default)]
    pub user_actions: Vec<UserAction>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Beacon {
    Wrapped { visits: Vec<Visit> },
    Bare(Vec<Visit>),
}

/// Decodes a beacon body. Malformed payloads yield no visits.
pub fn parse(body: &[u8]) -> Vec<Visit> {
    match serde_json::from_slice::<Beacon>(body) {
        Ok(Beacon::Wrapped { visits }) | Ok(Beacon::Bare(visits)) => visits,
        Err(err) => {
            debug!(?err, len = body.len(), "discarding undecodable beacon");
            Vec::new()
        }
    }
}
