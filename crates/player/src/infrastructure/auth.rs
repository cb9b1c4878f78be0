//! Auth adapters.

use async_trait::async_trait;

use crate::ports::outbound::AuthPort;

/// Serves one pre-issued token for the lifetime of the process.
///
/// Used by the binary, where the token comes from the environment and there is
/// no refresh endpoint to call.
#[derive(Clone)]
pub struct StaticTokenAuth {
    token: String,
}

impl StaticTokenAuth {
    /// Accepts either the raw token or a full `Bearer <token>` header value.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token
            .trim()
            .strip_prefix("Bearer ")
            .unwrap_or(token.trim())
            .to_string();
        Self { token }
    }
}

impl std::fmt::Debug for StaticTokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenAuth")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl AuthPort for StaticTokenAuth {
    async fn fresh_token(&self) -> anyhow::Result<String> {
        if self.token.is_empty() {
            anyhow::bail!("no auth token configured");
        }
        Ok(self.token.clone())
    }
}
