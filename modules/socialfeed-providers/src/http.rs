// Shared HTTP plumbing: client construction and the JSON response contract
// every provider follows (non-success status, empty body and parse failures
// all surface as FetchError).

use std::time::Duration;

use serde::de::DeserializeOwned;
use socialfeed_common::Platform;

use crate::error::{FetchError, Result};

const USER_AGENT: &str = concat!("socialfeed/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a FetchError.
const MAX_ERROR_BODY: usize = 512;

/// Build the client injected into each provider.
pub fn build_client(timeout: Duration, tls_verify: bool) -> reqwest::Result<reqwest::Client> {
    if !tls_verify {
        tracing::warn!("TLS certificate verification is disabled for platform requests");
    }
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(!tls_verify)
        .user_agent(USER_AGENT)
        .build()
}

/// Send a prepared request and decode its JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    platform: Platform,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let resp = request
        .send()
        .await
        .map_err(|e| FetchError::network(platform, e))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| FetchError::network(platform, e))?;

    decode_body(platform, status.as_u16(), status.is_success(), &body)
}

pub(crate) fn decode_body<T: DeserializeOwned>(
    platform: Platform,
    status: u16,
    success: bool,
    body: &str,
) -> Result<T> {
    if !success {
        return Err(FetchError::Api {
            platform,
            status,
            body: truncate(body, MAX_ERROR_BODY),
        });
    }

    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody { platform });
    }

    serde_json::from_str(body).map_err(|e| FetchError::Malformed {
        platform,
        message: e.to_string(),
    })
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        data: Vec<u32>,
    }

    #[test]
    fn non_success_status_is_api_error() {
        let err = decode_body::<Payload>(Platform::Twitter, 401, false, "unauthorized").unwrap_err();
        assert!(matches!(err, FetchError::Api { status: 401, .. }));
    }

    #[test]
    fn empty_body_is_rejected() {
        let err = decode_body::<Payload>(Platform::Facebook, 200, true, "  ").unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody { .. }));
    }

    #[test]
    fn malformed_body_is_rejected() {
        let err = decode_body::<Payload>(Platform::Instagram, 200, true, "{\"nope\":1}").unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
        assert_eq!(err.platform(), Platform::Instagram);
    }

    #[test]
    fn decodes_success_body() {
        let p: Payload = decode_body(Platform::Linkedin, 200, true, "{\"data\":[1,2]}").unwrap();
        assert_eq!(p.data, vec![1, 2]);
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = decode_body::<Payload>(Platform::Twitter, 500, false, &body).unwrap_err();
        match err {
            FetchError::Api { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY + 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
