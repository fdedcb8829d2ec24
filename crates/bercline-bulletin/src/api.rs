//! Publication endpoints: existence lookup and download-link resolution.

use bercline_core::backoff::BackoffPolicy;
use bercline_core::http::{post_json, ApiError, Session};
use bercline_core::journal::{ErrorJournal, JournalEntry};
use bercline_core::retry;

pub const API_BASE: &str = "https://api.berc.onrc.ro/backoffice/api/publication";

/// Metadata for one published bulletin.
#[derive(Debug, Clone)]
pub struct PublicationInfo {
    /// Document id the download-link resolution wants
    pub version_id: String,
}

/// Client for the bulletin publication endpoints.
pub struct BulletinApi<'a> {
    session: &'a Session,
    journal: &'a ErrorJournal,
    backoff: BackoffPolicy,
}

impl<'a> BulletinApi<'a> {
    pub fn new(session: &'a Session, journal: &'a ErrorJournal, backoff: BackoffPolicy) -> Self {
        Self {
            session,
            journal,
            backoff,
        }
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub(crate) fn journal(&self) -> &ErrorJournal {
        self.journal
    }

    /// Does bulletin `number` exist for `year`? Empty array means no.
    pub fn publication_info(
        &self,
        year: u16,
        number: u32,
    ) -> Result<Option<PublicationInfo>, ApiError> {
        let url = format!("{API_BASE}/getPublicationByYearAndNumber");
        let payload = serde_json::json!({ "number": number, "year": year });
        let value = self.request(&url, &payload)?;

        let Some(first) = value.as_array().and_then(|a| a.first()) else {
            return Ok(None);
        };
        Ok(first
            .get("versionId")
            .and_then(|v| v.as_str())
            .map(|version_id| PublicationInfo {
                version_id: version_id.to_string(),
            }))
    }

    /// Resolve the token-bound download link for a document id.
    pub fn download_link(&self, version_id: &str) -> Result<Option<String>, ApiError> {
        let url = format!("{API_BASE}/viewPublication");
        let payload = serde_json::json!({ "documentId": version_id, "type": "BULETIN" });
        let value = self.request(&url, &payload)?;
        Ok(value
            .get("downloadLink")
            .and_then(|v| v.as_str())
            .map(String::from))
    }

    fn request(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let mut attempt = 0u32;
        let result = retry(&self.backoff, url, std::thread::sleep, || {
            attempt += 1;
            post_json(url, self.session, payload)
        });
        if let Err(e) = &result {
            self.journal.record(&JournalEntry {
                url: url.to_string(),
                kind: match e {
                    ApiError::Http { .. } => "Http".to_string(),
                    ApiError::Malformed { .. } => "Malformed".to_string(),
                },
                message: e.to_string(),
                attempt,
                payload: Some(payload.clone()),
                response: match e {
                    ApiError::Malformed { body, .. } => Some(body.clone()),
                    ApiError::Http { .. } => None,
                },
            });
        }
        result
    }
}
