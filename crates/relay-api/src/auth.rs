use async_trait::async_trait;
use axum::http::HeaderMap;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
}

/// Resolves the caller of a request, `None` when unauthenticated
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<UserIdentity>;
}

/// Trusts an identity header injected by an upstream gateway
pub struct HeaderAuthProvider {
    header: String,
}

impl HeaderAuthProvider {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
        }
    }
}

impl Default for HeaderAuthProvider {
    fn default() -> Self {
        Self::new("x-user-id")
    }
}

#[async_trait]
impl AuthProvider for HeaderAuthProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<UserIdentity> {
        let id = headers.get(self.header.as_str())?.to_str().ok()?.trim();
        if id.is_empty() {
            return None;
        }
        Some(UserIdentity { id: id.to_string() })
    }
}
