use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT,
};

use crate::models::SecurityToken;
use crate::utils::error::ClientError;

/// Header carrying the rotating security token, in both directions
pub const TOKEN_HEADER: &str = "x-csrf-token";

/// Browser user agent presented to the booking service
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36";

/// Build headers for JSON API calls
///
/// The token header is only sent once a token is known; the very first page
/// request of a session goes out without one.
///
/// # Examples
///
/// ```
/// use chronodose::client::headers::{build_json_headers, TOKEN_HEADER};
/// use chronodose::models::SecurityToken;
///
/// let token = SecurityToken::new("abc");
/// let headers = build_json_headers("Mozilla/5.0", Some(&token)).unwrap();
/// assert_eq!(headers.get(TOKEN_HEADER).unwrap(), "abc");
/// ```
pub fn build_json_headers(
    user_agent: &str,
    token: Option<&SecurityToken>,
) -> Result<HeaderMap, ClientError> {
    let mut headers = base_headers(user_agent)?;

    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(token.as_str())
            .map_err(|e| ClientError::InvalidHeader(format!("{TOKEN_HEADER}: {e}")))?;
        headers.insert(HeaderName::from_static(TOKEN_HEADER), value);
    }

    Ok(headers)
}

/// Build headers for the HTML page that opens a session
pub fn build_page_headers(user_agent: &str) -> Result<HeaderMap, ClientError> {
    let mut headers = base_headers(user_agent)?;

    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );

    Ok(headers)
}

/// Read the fresh security token from a response
///
/// A missing or empty header is a protocol violation for every operation.
pub fn extract_token(
    headers: &HeaderMap,
    operation: &'static str,
) -> Result<SecurityToken, ClientError> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(SecurityToken::new)
        .ok_or(ClientError::MissingToken { operation })
}

fn base_headers(user_agent: &str) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();

    let user_agent = HeaderValue::from_str(user_agent)
        .map_err(|e| ClientError::InvalidHeader(format!("user-agent: {e}")))?;
    headers.insert(USER_AGENT, user_agent);
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7"),
    );

    Ok(headers)
}
