//! Auth Port - bearer token storage and refresh

/// Source of the bearer token carried on the game socket URL.
///
/// `fresh_token` is awaited before every connect attempt, reconnects included,
/// so an adapter backed by refreshable credentials can swap an expired token
/// before it reaches the server.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    async fn fresh_token(&self) -> anyhow::Result<String>;
}
