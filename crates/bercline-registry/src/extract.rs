//! Article extraction from filter-article response pages.

use bercline_core::Extractor;

use crate::api::Article;

/// Pulls articles out of one filter-article response page.
///
/// The page should be a JSON array of objects; fragments of any other
/// shape are skipped individually with a debug log.
#[derive(Debug, Default)]
pub struct ArticleExtractor;

impl ArticleExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for ArticleExtractor {
    type Payload = serde_json::Value;
    type Record = Article;

    fn extract(&self, payload: &serde_json::Value) -> Vec<Article> {
        let Some(items) = payload.as_array() else {
            log::debug!("article page is not an array, nothing extracted");
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                if item.is_object() {
                    Some(Article(item.clone()))
                } else {
                    log::debug!("article fragment {i} skipped: not an object");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_objects_only() {
        let page = serde_json::json!([
            {"publication": {"nr": "5"}},
            "stray string",
            {"publication": {"nr": "6"}},
            42
        ]);
        let articles = ArticleExtractor::new().extract(&page);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].publication_number(), Some(5));
        assert_eq!(articles[1].publication_number(), Some(6));
    }

    #[test]
    fn non_array_page_extracts_nothing() {
        let extractor = ArticleExtractor::new();
        assert!(extractor.extract(&serde_json::json!({"error": "x"})).is_empty());
        assert!(extractor.extract(&serde_json::json!(null)).is_empty());
    }
}
