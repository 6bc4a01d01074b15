use crate::UrlError;
use url::Url;

/// Normalizes a URL into its canonical document-store key form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or non-HTTP(S)
/// 2. Lowercase the host
/// 3. Remove the trailing slash from the path (except for the root `/`)
/// 4. Remove the fragment (everything after `#`)
/// 5. Keep the query string as-is (listing pages are distinguished by it)
///
/// # Examples
///
/// ```
/// use magpie::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/news/page/#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/news/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Url::parse already lowercases registered domain names, but hosts that
    // arrive through string templates are normalized again to be safe.
    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    let path = url.path();
    if path != "/" && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    url.set_fragment(None);

    Ok(url)
}
