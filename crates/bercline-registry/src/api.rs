//! Registry portal API client: the two chained lookups of the paginator.

use bercline_core::backoff::BackoffPolicy;
use bercline_core::http::{post_json, ApiError, Session};
use bercline_core::journal::{ErrorJournal, JournalEntry};
use bercline_core::retry;
use serde::{Deserialize, Serialize};

pub const API_BASE: &str = "https://api.berc.onrc.ro";
pub const PORTAL_ORIGIN: &str = "https://portal.berc.onrc.ro";

/// One hit from the publicity-situations lookup; only the id matters for
/// the follow-up article fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicitySituation {
    pub id: String,
}

/// One published article, kept as raw JSON.
///
/// Every field the portal returns is optional except the publication
/// number, which is the identifying reference resume relies on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Article(pub serde_json::Value);

impl Article {
    /// Publication number (`publication.nr`) — string or integer upstream.
    pub fn publication_number(&self) -> Option<u32> {
        let nr = self.0.get("publication")?.get("nr")?;
        match nr {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            _ => None,
        }
    }
}

/// Client for the paginator endpoints, with retry and error journaling.
pub struct RegistryApi<'a> {
    session: &'a Session,
    journal: &'a ErrorJournal,
    backoff: BackoffPolicy,
    year: u16,
}

impl<'a> RegistryApi<'a> {
    pub fn new(
        session: &'a Session,
        journal: &'a ErrorJournal,
        backoff: BackoffPolicy,
        year: u16,
    ) -> Self {
        Self {
            session,
            journal,
            backoff,
            year,
        }
    }

    /// First request: does this application number have any publicity
    /// situations in `county`? Empty array means the number is unused.
    pub fn situations(
        &self,
        county: &crate::county::County,
        number: u32,
    ) -> Result<Vec<PublicitySituation>, ApiError> {
        let url = format!("{API_BASE}/client/api/publicitySituations");
        let payload = serde_json::json!({
            "county": county.api_value(),
            "fiscalCode": "",
            "applicationNumber": number.to_string(),
            "applicationYear": self.year.to_string(),
            "name": "",
            "listType": "notAll",
        });
        // The portal answers unused numbers with either [] or null
        let hits: Option<Vec<PublicitySituation>> = self.request(&url, &payload)?;
        Ok(hits.unwrap_or_default())
    }

    /// Second request: one filter-article page for a publicity id.
    ///
    /// Returned raw; the extractor decides what counts as an article.
    pub fn articles(
        &self,
        county: &crate::county::County,
        publicity_id: &str,
        number: u32,
    ) -> Result<serde_json::Value, ApiError> {
        let url =
            format!("{API_BASE}/backoffice/api/article/filter-article?all=notAll&page=0&pageSize=10");
        let payload = serde_json::json!({
            "county": county.api_value(),
            "publicityId": publicity_id,
            "applicationNumber": number.to_string(),
            "applicationYear": self.year.to_string(),
            "name": "",
            "listType": "notAll",
        });
        self.request(&url, &payload)
    }

    /// POST with retry; journal the exchange when it ends in an error.
    fn request<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let mut attempt = 0u32;
        let result = retry(&self.backoff, url, std::thread::sleep, || {
            attempt += 1;
            let value = post_json(url, self.session, payload)?;
            serde_json::from_value(value.clone()).map_err(|e| {
                ApiError::malformed(format!("unexpected shape: {e}"), &value.to_string())
            })
        });
        if let Err(e) = &result {
            let response = match e {
                ApiError::Malformed { body, .. } => Some(body.clone()),
                ApiError::Http { .. } => None,
            };
            self.journal.record(&JournalEntry {
                url: url.to_string(),
                kind: match e {
                    ApiError::Http { .. } => "Http".to_string(),
                    ApiError::Malformed { .. } => "Malformed".to_string(),
                },
                message: e.to_string(),
                attempt,
                payload: Some(payload.clone()),
                response,
            });
        }
        result
    }
}
