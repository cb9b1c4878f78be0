//! End-to-end session tests against an in-process WebSocket game server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gambit_domain::{BoardCell, GameId, GameOutcome, GameStatus, PlayerColor, Side};
use gambit_player::{
    ChessRulesEngine, ClientConfig, ConnectionState, SessionContext, SessionHandle,
    SessionService, SessionView, StaticTokenAuth,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

type ServerSocket = WebSocketStream<TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
}

impl TestServer {
    /// Accept connections forever, handing the n-th one to `handler(socket, n)`.
    async fn start<F, Fut>(handler: F) -> Self
    where
        F: Fn(ServerSocket, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&requests);
        let count = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = Arc::clone(&seen);
                let record = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    seen.lock().unwrap().push(request.uri().to_string());
                    Ok(response)
                };
                if let Ok(socket) = accept_hdr_async(stream, record).await {
                    let index = count.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(handler(socket, index));
                }
            }
        });

        Self {
            addr,
            requests,
            connections,
        }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/v1", self.addr)
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn request(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index].clone()
    }
}

fn config(ws_url: String) -> ClientConfig {
    ClientConfig {
        ws_url,
        keepalive_interval: Duration::from_secs(30),
        connect_timeout: Duration::from_secs(2),
        reconnect_delay: Duration::from_millis(50),
        max_reconnect_attempts: 3,
        check_display: Duration::from_millis(50),
        notice_display: Duration::from_millis(50),
    }
}

fn start_session(config: ClientConfig, game_id: GameId, color: PlayerColor) -> SessionHandle {
    SessionService::start(
        SessionContext::new(game_id, color),
        config,
        Arc::new(ChessRulesEngine::new()),
        Arc::new(StaticTokenAuth::new("Bearer abc def")),
    )
}

async fn wait_for(handle: &SessionHandle, condition: impl FnMut(&SessionView) -> bool) -> SessionView {
    let mut views = handle.subscribe();
    let view = tokio::time::timeout(WAIT, views.wait_for(condition))
        .await
        .expect("timed out waiting for session view")
        .expect("session task ended");
    view.clone()
}

async fn send_json(socket: &mut ServerSocket, json: &str) {
    socket.send(Message::Text(json.to_string())).await.unwrap();
}

/// Next non-keepalive text frame from the client.
async fn next_move(socket: &mut ServerSocket) -> Option<String> {
    while let Some(Ok(message)) = socket.next().await {
        if let Message::Text(text) = message {
            if text != "0000" {
                return Some(text);
            }
        }
    }
    None
}

async fn drain(socket: &mut ServerSocket) {
    while let Some(Ok(_)) = socket.next().await {}
}

fn cell(row: u8, col: u8) -> BoardCell {
    BoardCell::new(row, col).unwrap()
}

#[tokio::test]
async fn joins_with_token_and_gets_move_acknowledged() {
    let (moved_tx, moved_rx) = oneshot::channel();
    let moved_tx = Arc::new(Mutex::new(Some(moved_tx)));

    let server = TestServer::start(move |mut socket, _| {
        let moved_tx = Arc::clone(&moved_tx);
        async move {
            send_json(&mut socket, r#"{"historyMove":["e2e4","e7e5"]}"#).await;
            let received = next_move(&mut socket).await;
            if let Some(tx) = moved_tx.lock().unwrap().take() {
                let _ = tx.send(received);
            }
            send_json(&mut socket, r#"{"ok":true}"#).await;
            drain(&mut socket).await;
        }
    })
    .await;

    let game_id = GameId::new();
    let handle = start_session(config(server.ws_url()), game_id, PlayerColor::White);

    let view = wait_for(&handle, |v| v.moves.len() == 2 && v.can_submit).await;
    assert_eq!(view.current_turn, Side::White);
    assert_eq!(view.connection, ConnectionState::Open);
    assert_eq!(
        server.request(0),
        format!("/v1/ws/game/{}?token=Bearer%20abc%20def", game_id)
    );

    // Knight g1-f3, drawn on the white-oriented board.
    let notation = handle.submit_move(cell(7, 6), cell(5, 5), None).await.unwrap();
    assert_eq!(notation.to_string(), "g1f3");

    let received = tokio::time::timeout(WAIT, moved_rx).await.unwrap().unwrap();
    assert_eq!(received.as_deref(), Some("g1f3"));

    let view = wait_for(&handle, |v| v.moves.len() == 3 && v.pending_move.is_none()).await;
    assert_eq!(view.current_turn, Side::Black);
    assert!(!view.can_submit);

    let connection = handle.connection();
    handle.close("test over").await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn black_delivers_mate_and_the_game_finishes() {
    let server = TestServer::start(|mut socket, _| async move {
        send_json(&mut socket, r#"{"historyMove":["f2f3"]}"#).await;
        if next_move(&mut socket).await.as_deref() != Some("e7e5") {
            return;
        }
        send_json(&mut socket, r#"{"ok":true}"#).await;
        send_json(&mut socket, r#"{"move":"g2g4"}"#).await;
        if next_move(&mut socket).await.as_deref() != Some("d8h4") {
            return;
        }
        send_json(&mut socket, r#"{"ok":true,"event":"mate"}"#).await;
        send_json(&mut socket, r#"{"result":"0-1"}"#).await;
        drain(&mut socket).await;
    })
    .await;

    let handle = start_session(config(server.ws_url()), GameId::new(), PlayerColor::Black);

    wait_for(&handle, |v| v.moves.len() == 1 && v.can_submit).await;
    handle.submit_notation("e7e5".parse().unwrap()).await.unwrap();

    wait_for(&handle, |v| v.moves.len() == 3 && v.can_submit).await;
    // Queen d8-h4 in black orientation: d8 is row 7 col 4, h4 is row 3 col 0.
    let notation = handle.submit_move(cell(7, 4), cell(3, 0), None).await.unwrap();
    assert_eq!(notation.to_string(), "d8h4");

    let view = wait_for(&handle, |v| v.status == GameStatus::Finished && v.result.is_some()).await;
    assert_eq!(view.result, Some(GameOutcome::BlackWins));
    assert_eq!(view.moves.len(), 4);
    assert!(view.pending_move.is_none());
    assert!(view.viewed_in_check);

    // Browsing history never touches the live position.
    handle.jump_to(0).await.unwrap();
    let browsed = wait_for(&handle, |v| v.viewed_index == 0).await;
    assert!(!browsed.viewing_live);
    assert_eq!(browsed.live_position, view.live_position);
    handle.jump_to_live().await.unwrap();
    wait_for(&handle, |v| v.viewing_live).await;

    handle.close("test over").await.unwrap();
}

#[tokio::test]
async fn check_highlight_and_notice_expire_on_their_own() {
    let server = TestServer::start(|mut socket, _| async move {
        send_json(&mut socket, r#"{"historyMove":["e2e4"]}"#).await;
        send_json(&mut socket, r#"{"event":"check"}"#).await;
        send_json(&mut socket, r#"{"error":"server busy"}"#).await;
        drain(&mut socket).await;
    })
    .await;

    let config = ClientConfig {
        check_display: Duration::from_millis(400),
        notice_display: Duration::from_millis(400),
        ..config(server.ws_url())
    };
    let handle = start_session(config, GameId::new(), PlayerColor::Black);

    let shown = wait_for(&handle, |v| v.in_check && v.notice.is_some()).await;
    assert_eq!(shown.notice.as_deref(), Some("server busy"));

    let cleared = wait_for(&handle, |v| !v.in_check && v.notice.is_none()).await;
    assert_eq!(cleared.moves.len(), 1);
    assert_eq!(cleared.connection, ConnectionState::Open);
    assert!(cleared.can_submit);

    handle.close("test over").await.unwrap();
}

#[tokio::test]
async fn keepalive_is_sent_while_open() {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let server = TestServer::start(move |mut socket, _| {
        let tx = Arc::clone(&tx);
        async move {
            while let Some(Ok(message)) = socket.next().await {
                if message == Message::Text("0000".to_string()) {
                    if let Some(tx) = tx.lock().unwrap().take() {
                        let _ = tx.send(());
                    }
                }
            }
        }
    })
    .await;

    let config = ClientConfig {
        keepalive_interval: Duration::from_millis(100),
        ..config(server.ws_url())
    };
    let handle = start_session(config, GameId::new(), PlayerColor::White);

    tokio::time::timeout(WAIT, rx)
        .await
        .expect("no keepalive within the wait window")
        .unwrap();
    handle.close("test over").await.unwrap();
}

#[tokio::test]
async fn reconnects_after_an_abnormal_drop() {
    let server = TestServer::start(|mut socket, index| async move {
        if index == 0 {
            send_json(&mut socket, r#"{"historyMove":["e2e4"]}"#).await;
            // Dropped without a close frame.
            return;
        }
        send_json(&mut socket, r#"{"historyMove":["e2e4","e7e5"]}"#).await;
        drain(&mut socket).await;
    })
    .await;

    let handle = start_session(config(server.ws_url()), GameId::new(), PlayerColor::White);

    let view = wait_for(&handle, |v| {
        v.moves.len() == 2 && v.connection == ConnectionState::Open
    })
    .await;
    assert!(view.fatal_error.is_none());
    assert!(server.connections() >= 2);
    assert!(handle.connection().is_open());

    handle.close("test over").await.unwrap();
}

#[tokio::test]
async fn normal_close_from_the_server_is_terminal() {
    let server = TestServer::start(|mut socket, _| async move {
        let _ = socket
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "game over".into(),
            }))
            .await;
        drain(&mut socket).await;
    })
    .await;

    let handle = start_session(config(server.ws_url()), GameId::new(), PlayerColor::White);

    wait_for(&handle, |v| v.connection == ConnectionState::Closed).await;
    // Several reconnect delays later there is still only the one connection.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connections(), 1);
    let view = handle.view();
    assert_eq!(view.connection, ConnectionState::Closed);
    assert!(view.fatal_error.is_none());

    handle.close("test over").await.unwrap();
}

#[tokio::test]
async fn gives_up_after_the_reconnect_budget() {
    // Grab a free port and release it so every dial is refused.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let config = ClientConfig {
        max_reconnect_attempts: 2,
        reconnect_delay: Duration::from_millis(20),
        ..config(format!("ws://{}/v1", addr))
    };
    let handle = start_session(config, GameId::new(), PlayerColor::White);

    let view = wait_for(&handle, |v| {
        v.fatal_error.is_some() && v.connection == ConnectionState::Closed
    })
    .await;
    assert_eq!(
        view.fatal_error.as_deref(),
        Some("Connection to the game server lost after 2 reconnect attempts")
    );
    assert_eq!(handle.connection().state(), ConnectionState::Closed);
    assert!(!view.can_submit);

    let err = handle.submit_move(cell(6, 4), cell(4, 4), None).await.unwrap_err();
    assert_eq!(err.to_string(), "Not connected to the game server");

    handle.close("test over").await.unwrap();
}
