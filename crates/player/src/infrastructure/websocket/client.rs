//! tokio-tungstenite transport for the game socket.
//!
//! Only the I/O lives here: dialing (token refresh + handshake), writing text
//! frames, and classifying what the read half yields. Lifecycle decisions are
//! made by the connection core.

use std::sync::Arc;

use futures_util::SinkExt;
use gambit_domain::GameId;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::shared::{game_socket_url, ABNORMAL_CLOSE_CODE, NO_STATUS_CLOSE_CODE};
use crate::ports::outbound::AuthPort;

pub type GameSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What one read from the socket amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Text(String),
    Closed { code: u16 },
    Failed(String),
    /// Binary, ping/pong and raw frames; nothing for the session.
    Ignored,
}

impl SocketEvent {
    pub fn from_frame(frame: Option<Result<Message, WsError>>) -> Self {
        match frame {
            Some(Ok(Message::Text(text))) => SocketEvent::Text(text),
            Some(Ok(Message::Close(frame))) => SocketEvent::Closed {
                code: frame
                    .map(|f| u16::from(f.code))
                    .unwrap_or(NO_STATUS_CLOSE_CODE),
            },
            Some(Ok(Message::Binary(data))) => {
                tracing::warn!(len = data.len(), "Ignoring binary frame");
                SocketEvent::Ignored
            }
            Some(Ok(_)) => SocketEvent::Ignored,
            Some(Err(WsError::ConnectionClosed)) | None => SocketEvent::Closed {
                code: ABNORMAL_CLOSE_CODE,
            },
            Some(Err(e)) => SocketEvent::Failed(e.to_string()),
        }
    }
}

/// Refresh the token and perform the WebSocket handshake.
pub async fn dial(
    auth: Arc<dyn AuthPort>,
    base_url: String,
    game_id: GameId,
) -> Result<GameSocket, String> {
    let token = auth
        .fresh_token()
        .await
        .map_err(|e| format!("token refresh failed: {}", e))?;
    let url = game_socket_url(&base_url, game_id, &token)
        .map_err(|e| format!("invalid socket url {}: {}", base_url, e))?;

    tracing::debug!(game_id = %game_id, "Dialing game socket");
    let (socket, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| e.to_string())?;
    Ok(socket)
}

pub async fn send_text(socket: &mut GameSocket, text: String) -> Result<(), WsError> {
    socket.send(Message::Text(text)).await
}

pub async fn send_close(socket: &mut GameSocket, code: u16, reason: String) -> Result<(), WsError> {
    socket
        .close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.into(),
        }))
        .await
}
