//! Shared helpers for the game socket: policy constants and URL construction.
//!
//! Runtime-agnostic (no tokio) so the sans-IO connection core can use it.

use gambit_domain::GameId;
use url::{form_urlencoded, ParseError, Url};

// Connection policy defaults (overridable through `ClientConfig`)
pub const DEFAULT_KEEPALIVE_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

// WebSocket close codes (RFC 6455)
pub const NORMAL_CLOSE_CODE: u16 = 1000;
pub const NO_STATUS_CLOSE_CODE: u16 = 1005;
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// `{base}/ws/game/{game_id}?token=Bearer%20{token}`
///
/// The token is percent-encoded with `%20` for the space, matching what the
/// server's auth middleware expects.
pub fn game_socket_url(base: &str, game_id: GameId, token: &str) -> Result<Url, ParseError> {
    let mut url = Url::parse(base)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ParseError::RelativeUrlWithCannotBeABaseBase)?;
        segments
            .pop_if_empty()
            .extend(["ws", "game", &game_id.to_string()]);
    }

    // form_urlencoded writes spaces as '+' and escapes a literal '+' as %2B,
    // so every remaining '+' stands for a space.
    let encoded: String = form_urlencoded::byte_serialize(format!("Bearer {}", token).as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    url.set_query(Some(&format!("token={}", encoded)));
    Ok(url)
}
