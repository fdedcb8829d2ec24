//! DMS download handshake: CSRF scrape, temp token, form POST.
//!
//! The download link resolved by the API points at an HTML page whose
//! inline script carries a CSRF token; the actual file comes from a
//! second, form-encoded POST that echoes that token plus the `tempToken`
//! query parameter from the link. A 2xx alone is not success; the body
//! must declare itself a PDF.

use std::sync::LazyLock;

use regex::Regex;

use bercline_core::http::{get_text, post_form, ApiError};

pub const DMS_BASE: &str = "https://dms.berc.onrc.ro";

static CSRF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"util\.getCSRF\s*=\s*function\s*\(\)\s*\{\s*return\s*'([^']+)';")
        .expect("invalid regex")
});

/// Pull the CSRF token out of the landing page's inline script.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    CSRF_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The `token` query parameter the form POST must echo back.
pub fn temp_token(download_link: &str) -> Option<&str> {
    download_link
        .split_once("token=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
        .filter(|t| !t.is_empty())
}

/// One pass of the two-request download; the prober wraps this in retry.
pub fn download(download_link: &str) -> Result<Vec<u8>, ApiError> {
    let html = get_text(download_link)?;
    let csrf = extract_csrf_token(&html)
        .ok_or_else(|| ApiError::malformed("no CSRF token in landing page", &html))?;
    let temp = temp_token(download_link)
        .ok_or_else(|| ApiError::malformed("download link has no token parameter", download_link))?;

    let url = format!("{DMS_BASE}/download_file");
    let fields = [
        ("X-CSRF-Token", csrf.as_str()),
        ("tempToken", temp),
        ("location", "FILE"),
        ("nullContentType", "false"),
    ];
    let response = post_form(&url, download_link, &fields)?;

    let content_type = response.content_type.unwrap_or_default();
    if !content_type.contains("application/pdf") {
        return Err(ApiError::malformed(
            format!("expected application/pdf, got {content_type:?}"),
            &String::from_utf8_lossy(&response.bytes),
        ));
    }
    Ok(response.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csrf_token_from_inline_script() {
        let html = r"<script>
            util.getCSRF = function() { return 'abc123-def456'; };
        </script>";
        assert_eq!(extract_csrf_token(html).as_deref(), Some("abc123-def456"));
    }

    #[test]
    fn csrf_token_missing() {
        assert_eq!(extract_csrf_token("<html>no script here</html>"), None);
    }

    #[test]
    fn temp_token_from_link() {
        assert_eq!(
            temp_token("https://dms.berc.onrc.ro/view?token=T0K3N&lang=ro"),
            Some("T0K3N")
        );
        assert_eq!(
            temp_token("https://dms.berc.onrc.ro/view?token=T0K3N"),
            Some("T0K3N")
        );
    }

    #[test]
    fn temp_token_missing_or_empty() {
        assert_eq!(temp_token("https://dms.berc.onrc.ro/view"), None);
        assert_eq!(temp_token("https://dms.berc.onrc.ro/view?token="), None);
    }
}
