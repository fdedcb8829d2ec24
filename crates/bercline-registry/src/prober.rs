//! Probe one application number through the two-request chain.

use bercline_core::{Extractor, ProbeOutcome, Prober};

use crate::api::{Article, RegistryApi};
use crate::county::County;
use crate::extract::ArticleExtractor;

/// Prober for one county's application-number stream.
pub struct ArticleProber<'a> {
    api: &'a RegistryApi<'a>,
    county: &'a County,
    extractor: ArticleExtractor,
}

impl<'a> ArticleProber<'a> {
    pub fn new(api: &'a RegistryApi<'a>, county: &'a County) -> Self {
        Self {
            api,
            county,
            extractor: ArticleExtractor::new(),
        }
    }
}

impl Prober for ArticleProber<'_> {
    type Payload = Vec<Article>;

    /// Situations lookup first; an empty list is a confirmed-absent
    /// number. Each hit then gets its article fetch. If every follow-up
    /// fails the probe degrades to `Failed`; partial success keeps the
    /// articles that did arrive.
    fn probe(&self, key: u32) -> ProbeOutcome<Vec<Article>> {
        let hits = match self.api.situations(self.county, key) {
            Ok(hits) => hits,
            Err(e) => {
                log::debug!("{} #{key}: situations lookup failed: {e}", self.county.name);
                return ProbeOutcome::Failed;
            }
        };
        if hits.is_empty() {
            return ProbeOutcome::Absent;
        }

        let mut articles = Vec::new();
        let mut failures = 0usize;
        for hit in &hits {
            match self.api.articles(self.county, &hit.id, key) {
                Ok(page) => articles.extend(self.extractor.extract(&page)),
                Err(e) => {
                    failures += 1;
                    log::warn!(
                        "{} #{key}: article fetch failed for publicity {}: {e}",
                        self.county.name,
                        hit.id
                    );
                }
            }
        }
        if articles.is_empty() && failures > 0 {
            ProbeOutcome::Failed
        } else {
            ProbeOutcome::Found(articles)
        }
    }
}
