//! Probe one bulletin number through the full chained fetch.

use bercline_core::http::ApiError;
use bercline_core::journal::JournalEntry;
use bercline_core::{retry, ProbeOutcome, Prober};

use crate::api::BulletinApi;
use crate::dms;

/// Prober for one year's bulletin-number stream.
///
/// Payload is the raw PDF bytes; the runner persists them and feeds the
/// text layer to the extractor.
pub struct BulletinProber<'a> {
    api: &'a BulletinApi<'a>,
    year: u16,
}

impl<'a> BulletinProber<'a> {
    pub fn new(api: &'a BulletinApi<'a>, year: u16) -> Self {
        Self { api, year }
    }
}

impl Prober for BulletinProber<'_> {
    type Payload = Vec<u8>;

    fn probe(&self, key: u32) -> ProbeOutcome<Vec<u8>> {
        // 1. Does the bulletin exist?
        let info = match self.api.publication_info(self.year, key) {
            Ok(Some(info)) => info,
            Ok(None) => return ProbeOutcome::Absent,
            Err(e) => {
                log::debug!("{}/{key}: publication lookup failed: {e}", self.year);
                return ProbeOutcome::Failed;
            }
        };

        // 2. Resolve the token-bound download link
        let link = match self.api.download_link(&info.version_id) {
            Ok(Some(link)) => link,
            Ok(None) => {
                log::debug!("{}/{key}: publication has no download link", self.year);
                return ProbeOutcome::Absent;
            }
            Err(e) => {
                log::debug!("{}/{key}: link resolution failed: {e}", self.year);
                return ProbeOutcome::Failed;
            }
        };

        // 3. The DMS handshake, retried as a whole: a fresh attempt
        //    re-reads the landing page so the CSRF token stays paired
        //    with its session.
        let mut attempt = 0u32;
        let result = retry(self.api.backoff(), &link, std::thread::sleep, || {
            attempt += 1;
            dms::download(&link)
        });
        match result {
            Ok(bytes) => ProbeOutcome::Found(bytes),
            Err(e) => {
                self.api.journal().record(&JournalEntry {
                    url: link.clone(),
                    kind: match &e {
                        ApiError::Http { .. } => "Http".to_string(),
                        ApiError::Malformed { .. } => "Malformed".to_string(),
                    },
                    message: e.to_string(),
                    attempt,
                    payload: None,
                    response: match &e {
                        ApiError::Malformed { body, .. } => Some(body.clone()),
                        ApiError::Http { .. } => None,
                    },
                });
                log::debug!("{}/{key}: download failed: {e}", self.year);
                ProbeOutcome::Failed
            }
        }
    }
}
