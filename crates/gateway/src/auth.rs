//! Request authentication.
//!
//! The gateway never trusts a user identifier from the request body; the
//! user is resolved from the `Authorization: Bearer` header by an
//! [`AuthResolver`]. The default resolver treats the token as an opaque user
//! identifier, which is where a real token validator (JWT, session store)
//! plugs in for a deployment.

use axum::http::HeaderMap;

/// Resolves a bearer token to a user id, or rejects it.
pub trait AuthResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Accepts any well-formed token and uses it as the user id.
pub struct OpaqueTokenAuth;

impl AuthResolver for OpaqueTokenAuth {
    fn resolve(&self, token: &str) -> Option<String> {
        let token = token.trim();
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return None;
        }
        Some(token.to_string())
    }
}

/// Extract the bearer token from request headers and resolve it.
pub fn authenticate(resolver: &dyn AuthResolver, headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    resolver.resolve(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn resolves_bearer_token() {
        let user = authenticate(&OpaqueTokenAuth, &headers_with("Bearer user-123"));
        assert_eq!(user.as_deref(), Some("user-123"));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(authenticate(&OpaqueTokenAuth, &HeaderMap::new()).is_none());
        assert!(authenticate(&OpaqueTokenAuth, &headers_with("Basic abc")).is_none());
        assert!(authenticate(&OpaqueTokenAuth, &headers_with("Bearer ")).is_none());
    }
}
