//! Middleware module.
//!
//! Provides the session check for the project roster routes.

use axum::{body::Body, extract::Request, http::header, middleware::Next, response::Response};
use axum_extra::extract::CookieJar;

use crate::error::AppError;
use crate::utils::{parse_token, Claims};

/// Name of the cookie the desk web client stores its session token in.
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated session claims, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

/// JWT Authentication Middleware.
///
/// Reads `Authorization: Bearer <token>`, falling back to the `token`
/// cookie, and stores the verified claims as [`AuthUser`].
///
/// # Error Responses
///
/// - 401 Unauthorized: When no token is provided or token is invalid
pub async fn jwt_auth(
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_token(&request, &jar) else {
        return Err(AppError::Unauthorized("No token provided".to_string()));
    };

    let claims = parse_token(&token).map_err(|e| {
        tracing::debug!(error = %e, path = %request.uri().path(), "Rejected session token");
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    request.extensions_mut().insert(AuthUser(claims));
    Ok(next.run(request).await)
}

/// Extracts the session token, header first then cookie.
///
/// Blank tokens count as missing.
fn extract_token(request: &Request<Body>, jar: &CookieJar) -> Option<String> {
    let from_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    jar.get(TOKEN_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use axum_extra::extract::cookie::Cookie;

    fn request_with_auth(value: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/projectRoster/search/");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    // ============ extract_token 함수 테스트 ============

    #[test]
    fn test_extract_token_from_bearer_header() {
        let request = request_with_auth(Some("Bearer abc.def.ghi"));
        let token = extract_token(&request, &CookieJar::new());
        assert_eq!(token, Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_blank_bearer_is_missing() {
        let request = request_with_auth(Some("Bearer   "));
        assert!(extract_token(&request, &CookieJar::new()).is_none());
    }

    #[test]
    fn test_extract_token_other_scheme_ignored() {
        let request = request_with_auth(Some("Basic abc123"));
        assert!(extract_token(&request, &CookieJar::new()).is_none());
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let request = request_with_auth(None);
        let jar = CookieJar::new().add(Cookie::new(TOKEN_COOKIE, "cookie_token"));
        assert_eq!(
            extract_token(&request, &jar),
            Some("cookie_token".to_string())
        );
    }

    #[test]
    fn test_extract_token_header_takes_precedence() {
        let request = request_with_auth(Some("Bearer header_token"));
        let jar = CookieJar::new().add(Cookie::new(TOKEN_COOKIE, "cookie_token"));

        // Authorization 헤더가 쿠키보다 우선
        assert_eq!(
            extract_token(&request, &jar),
            Some("header_token".to_string())
        );
    }

    #[test]
    fn test_extract_token_no_token() {
        let request = request_with_auth(None);
        let jar = CookieJar::new().add(Cookie::new("session", "other"));
        assert!(extract_token(&request, &jar).is_none());
    }
}
