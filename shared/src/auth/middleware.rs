//! # Request-Scoped Credential Extraction
//!
//! Pulls the raw material a handler needs to authenticate a request —
//! session cookie, API key header, peer address, user agent — out of the
//! `HttpRequest` without doing any database lookup itself. Every request
//! re-validates against the database (see `weather-api`'s `credentials`
//! module); this extractor never caches a verdict.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};

pub const SESSION_COOKIE_NAME: &str = "sessiontoken";
pub const API_KEY_HEADER_NAME: &str = "X-API-KEY";

/// Everything a handler needs to resolve who (if anyone) is making this
/// request.
#[derive(Debug, Clone, Default)]
pub struct AuthMaterial {
    pub session_token: Option<String>,
    pub api_key: Option<String>,
    pub peer_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl AuthMaterial {
    pub fn from_request(req: &HttpRequest) -> Self {
        let session_token = req
            .cookie(SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string());

        let api_key = req
            .headers()
            .get(API_KEY_HEADER_NAME)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // Unwrap IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) to plain IPv4
        // so the same client is never recorded under two different forms.
        let peer_ip = req.peer_addr().map(|addr| addr.ip().to_canonical().to_string());

        let user_agent = req
            .headers()
            .get(actix_web::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Self {
            session_token,
            api_key,
            peer_ip,
            user_agent,
        }
    }
}

impl FromRequest for AuthMaterial {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(AuthMaterial::from_request(req)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn extracts_cookie_and_header() {
        let req = TestRequest::default()
            .cookie(actix_web::cookie::Cookie::new(SESSION_COOKIE_NAME, "abc123"))
            .insert_header((API_KEY_HEADER_NAME, "key-value"))
            .to_http_request();

        let material = AuthMaterial::from_request(&req);
        assert_eq!(material.session_token.as_deref(), Some("abc123"));
        assert_eq!(material.api_key.as_deref(), Some("key-value"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let req = TestRequest::default().to_http_request();
        let material = AuthMaterial::from_request(&req);
        assert!(material.session_token.is_none());
        assert!(material.api_key.is_none());
    }
}
