//! Session service: one event loop per active game.
//!
//! A single task owns the connection machine, the socket, every timer and the
//! [`GameSession`]. Socket frames, timer fires and caller commands are handled
//! one at a time in arrival order, so the session is never mutated
//! concurrently. Callers talk to the task through a [`SessionHandle`].

use std::collections::HashMap;
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use gambit_domain::{BoardCell, GameId, MoveNotation, Promotion};
use gambit_shared::{decode_frame, is_keepalive, ClientMessage, ServerMessage};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::Instrument;

use super::reducer::{self, ReducerEffect};
use super::state::{GameSession, SessionView};
use crate::application::error::SessionError;
use crate::application::history;
use crate::config::ClientConfig;
use crate::infrastructure::messaging::{
    set_connection_state, ConnectionState, ConnectionStateObserver,
};
use crate::infrastructure::websocket::client::{self, GameSocket, SocketEvent};
use crate::infrastructure::websocket::{ConnectionEffect, ConnectionMachine, TimerKind};
use crate::ports::outbound::{AuthPort, RulesEnginePort};
use crate::session_context::SessionContext;

type ConnectFuture = Pin<Box<dyn Future<Output = Result<GameSocket, String>> + Send>>;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SessionTimer {
    Connection(TimerKind),
    CheckClear,
    NoticeClear,
}

/// Deadlines for every armed timer, polled by the event loop.
#[derive(Debug, Default)]
struct Timers {
    deadlines: HashMap<SessionTimer, Instant>,
}

impl Timers {
    fn arm(&mut self, timer: SessionTimer, after: Duration) {
        self.deadlines.insert(timer, Instant::now() + after);
    }

    fn cancel(&mut self, timer: SessionTimer) {
        self.deadlines.remove(&timer);
    }

    fn clear(&mut self) {
        self.deadlines.clear();
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every timer due at `now`, earliest first.
    fn take_due(&mut self, now: Instant) -> Vec<SessionTimer> {
        let mut due: Vec<(Instant, SessionTimer)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(timer, deadline)| (*deadline, *timer))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);
        for (_, timer) in &due {
            self.deadlines.remove(timer);
        }
        due.into_iter().map(|(_, timer)| timer).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Navigation {
    Back,
    Forward,
    Jump(isize),
    Live,
}

enum SessionCommand {
    Submit {
        from: BoardCell,
        to: BoardCell,
        promotion: Option<Promotion>,
        reply: oneshot::Sender<Result<MoveNotation, SessionError>>,
    },
    Navigate(Navigation),
    Close {
        reason: String,
        done: oneshot::Sender<()>,
    },
}

/// The session task. Constructed and spawned by [`SessionService::start`].
pub struct SessionService {
    ctx: SessionContext,
    config: ClientConfig,
    rules: Arc<dyn RulesEnginePort>,
    auth: Arc<dyn AuthPort>,
    machine: ConnectionMachine,
    session: GameSession,
    socket: Option<GameSocket>,
    connecting: Option<ConnectFuture>,
    timers: Timers,
    commands: mpsc::Receiver<SessionCommand>,
    view_tx: watch::Sender<SessionView>,
    state: Arc<AtomicU8>,
}

impl SessionService {
    /// Spawn the session task for `ctx` and return its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        ctx: SessionContext,
        config: ClientConfig,
        rules: Arc<dyn RulesEnginePort>,
        auth: Arc<dyn AuthPort>,
    ) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let service = Self::new(ctx, config, rules, auth, cmd_rx);
        let game_id = service.ctx.game_id;
        let view_rx = service.view_tx.subscribe();
        let state = Arc::clone(&service.state);

        let span = tracing::info_span!("session", game_id = %game_id);
        let task = tokio::spawn(service.run().instrument(span));

        SessionHandle {
            game_id,
            commands: cmd_tx,
            view: view_rx,
            connection: ConnectionStateObserver::new(state),
            task,
        }
    }

    fn new(
        ctx: SessionContext,
        config: ClientConfig,
        rules: Arc<dyn RulesEnginePort>,
        auth: Arc<dyn AuthPort>,
        commands: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        let session = GameSession::new(&ctx, rules.as_ref());
        let (view_tx, _) = watch::channel(SessionView::from(&session));

        Self {
            machine: ConnectionMachine::new(config.connection_policy()),
            ctx,
            config,
            rules,
            auth,
            session,
            socket: None,
            connecting: None,
            timers: Timers::default(),
            commands,
            view_tx,
            state: Arc::new(AtomicU8::new(ConnectionState::Idle.to_u8())),
        }
    }

    async fn run(mut self) {
        tracing::info!(color = %self.ctx.self_color, status = %self.ctx.initial_status, "Session started");

        if self.ctx.should_connect() {
            let effects = self.machine.open();
            self.execute(effects).await;
        } else {
            tracing::info!(status = %self.ctx.initial_status, "Game already over, not connecting");
        }

        loop {
            let deadline = self.timers.next_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Close { reason, done }) => {
                        self.teardown(&reason).await;
                        let _ = done.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.teardown("session dropped").await;
                        break;
                    }
                },
                result = poll_connect(&mut self.connecting) => {
                    self.connecting = None;
                    self.on_connect_result(result).await;
                }
                frame = next_frame(&mut self.socket) => {
                    self.on_socket_event(SocketEvent::from_frame(frame)).await;
                }
                _ = sleep_until(deadline) => {
                    self.fire_due_timers().await;
                }
            }
        }

        tracing::info!("Session ended");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Submit {
                from,
                to,
                promotion,
                reply,
            } => {
                let result = self.submit(from, to, promotion).await;
                let _ = reply.send(result);
            }
            SessionCommand::Navigate(navigation) => {
                let rules = self.rules.as_ref();
                let history = &self.session.history;
                let view = match navigation {
                    Navigation::Back => history::step_back(rules, history, &self.session.view),
                    Navigation::Forward => {
                        history::step_forward(rules, history, &self.session.view)
                    }
                    Navigation::Jump(index) => history::jump_to(rules, history, index),
                    Navigation::Live => self.session.live_view(rules),
                };
                self.session.view = view;
                self.publish();
            }
            SessionCommand::Close { .. } => {}
        }
    }

    async fn submit(
        &mut self,
        from: BoardCell,
        to: BoardCell,
        promotion: Option<Promotion>,
    ) -> Result<MoveNotation, SessionError> {
        let submission = reducer::submit(&self.session, from, to, promotion, self.rules.as_ref())
            .inspect_err(|e| tracing::debug!(error = %e, "Move refused locally"))?;
        let effect = self.machine.send(submission.message)?;
        if let ConnectionEffect::Transmit(message) = &effect {
            self.transmit(message)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Move not sent"))?;
        }

        self.session = submission.session;
        self.publish();
        tracing::info!(notation = %submission.notation, "Move submitted");
        Ok(submission.notation)
    }

    async fn transmit(&mut self, message: &ClientMessage) -> Result<(), SessionError> {
        let socket = self.socket.as_mut().ok_or(SessionError::NotConnected)?;
        client::send_text(socket, message.to_wire())
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn on_connect_result(&mut self, result: Result<GameSocket, String>) {
        let effects = match result {
            Ok(socket) => {
                tracing::info!(attempt = self.machine.attempts(), "Game socket open");
                self.socket = Some(socket);
                self.machine.socket_opened()
            }
            Err(e) => {
                tracing::warn!(attempt = self.machine.attempts(), error = %e, "Connect attempt failed");
                self.machine.socket_failed(e)
            }
        };
        self.execute(effects).await;
    }

    async fn on_socket_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Text(text) => self.on_text(&text).await,
            SocketEvent::Closed { code } => {
                tracing::info!(code, "Game socket closed");
                let effects = self.machine.socket_closed(code);
                self.execute(effects).await;
                self.socket = None;
            }
            SocketEvent::Failed(e) => {
                tracing::warn!(error = %e, "Game socket failed");
                let effects = self.machine.socket_failed(e);
                self.execute(effects).await;
                self.socket = None;
            }
            SocketEvent::Ignored => {}
        }
    }

    async fn on_text(&mut self, text: &str) {
        if is_keepalive(text) {
            tracing::trace!("Keepalive from server");
            return;
        }

        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                let error = SessionError::from(e);
                tracing::warn!(error = %error, "Dropping undecodable frame");
                return;
            }
        };

        self.apply_server(&frame.message).await;
        if let Some(kind) = frame.event {
            self.apply_server(&ServerMessage::GameEvent { kind }).await;
        }
    }

    async fn apply_server(&mut self, message: &ServerMessage) {
        tracing::debug!(kind = message.kind(), "Server message");
        let transition = reducer::apply(&self.session, message, self.rules.as_ref());
        self.session = transition.session;

        for effect in transition.effects {
            match effect {
                ReducerEffect::StopKeepalive => {
                    tracing::info!(result = ?self.session.result, "Game finished, stopping keepalive");
                    let effects = self.machine.stop_keepalive();
                    self.execute(effects).await;
                }
                ReducerEffect::ArmCheckClear => {
                    self.timers
                        .arm(SessionTimer::CheckClear, self.config.check_display);
                }
                ReducerEffect::ArmNoticeClear => {
                    self.timers
                        .arm(SessionTimer::NoticeClear, self.config.notice_display);
                }
                ReducerEffect::Recovered(SessionError::MoveRejected(reason)) => {
                    tracing::info!(reason = %reason, "Move rejected by server");
                }
                ReducerEffect::Recovered(error) => {
                    tracing::warn!(error = %error, "Discarded server message, likely desync");
                }
            }
        }
        self.publish();
    }

    async fn fire_due_timers(&mut self) {
        for timer in self.timers.take_due(Instant::now()) {
            match timer {
                SessionTimer::Connection(kind) => {
                    if kind == TimerKind::Keepalive {
                        tracing::trace!("Keepalive tick");
                    }
                    let effects = self.machine.timer_fired(kind);
                    self.execute(effects).await;
                }
                SessionTimer::CheckClear => {
                    self.session = reducer::clear_check(&self.session);
                    self.publish();
                }
                SessionTimer::NoticeClear => {
                    self.session = reducer::clear_notice(&self.session);
                    self.publish();
                }
            }
        }
    }

    async fn execute(&mut self, effects: Vec<ConnectionEffect>) {
        for effect in effects {
            match effect {
                ConnectionEffect::Dial => {
                    let auth = Arc::clone(&self.auth);
                    let base_url = self.config.ws_url.clone();
                    self.connecting = Some(Box::pin(client::dial(auth, base_url, self.ctx.game_id)));
                }
                ConnectionEffect::ArmTimer { kind, after } => {
                    self.timers.arm(SessionTimer::Connection(kind), after);
                }
                ConnectionEffect::CancelTimer(kind) => {
                    self.timers.cancel(SessionTimer::Connection(kind));
                }
                ConnectionEffect::Transmit(message) => {
                    if let Err(e) = self.transmit(&message).await {
                        tracing::warn!(error = %e, "Failed to send frame");
                    }
                }
                ConnectionEffect::CloseSocket { code, reason } => {
                    if let Some(socket) = self.socket.as_mut() {
                        if let Err(e) = client::send_close(socket, code, reason).await {
                            tracing::debug!(error = %e, "Close frame not delivered");
                        }
                    }
                }
                ConnectionEffect::DropSocket => {
                    self.connecting = None;
                    self.socket = None;
                }
                ConnectionEffect::StateChanged(state) => {
                    set_connection_state(&self.state, state);
                    self.session = reducer::connection_changed(&self.session, state);
                    self.publish();
                }
                ConnectionEffect::Fatal(error) => {
                    let error = SessionError::from(error);
                    tracing::error!(error = %error, "Connection failed permanently");
                    self.session = reducer::connection_failed(&self.session, error);
                    self.publish();
                }
            }
        }
    }

    /// Cancel every timer, normal-close the socket, then release it.
    async fn teardown(&mut self, reason: &str) {
        tracing::info!(reason, "Tearing down session");
        self.timers.cancel(SessionTimer::CheckClear);
        self.timers.cancel(SessionTimer::NoticeClear);
        let effects = self.machine.close(reason);
        self.execute(effects).await;
        self.timers.clear();
        self.connecting = None;
        self.socket = None;
    }

    fn publish(&self) {
        let view = SessionView::from(&self.session);
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

async fn poll_connect(connecting: &mut Option<ConnectFuture>) -> Result<GameSocket, String> {
    match connecting {
        Some(future) => future.await,
        None => pending().await,
    }
}

async fn next_frame(socket: &mut Option<GameSocket>) -> Option<Result<Message, WsError>> {
    match socket {
        Some(socket) => socket.next().await,
        None => pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => pending().await,
    }
}

/// Caller side of a running session.
///
/// Dropping the handle without calling [`SessionHandle::close`] still tears the
/// session down once the task notices the command channel has closed.
pub struct SessionHandle {
    game_id: GameId,
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
    connection: ConnectionStateObserver,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Submit a move drawn between two board cells in the player's orientation.
    pub async fn submit_move(
        &self,
        from: BoardCell,
        to: BoardCell,
        promotion: Option<Promotion>,
    ) -> Result<MoveNotation, SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Submit {
            from,
            to,
            promotion,
            reply,
        })
        .await?;
        response.await.map_err(|_| SessionError::SessionClosed)?
    }

    /// Submit a move given in absolute notation.
    pub async fn submit_notation(&self, notation: MoveNotation) -> Result<MoveNotation, SessionError> {
        let (from, to) = notation.to_cells(self.view.borrow().self_color);
        self.submit_move(from, to, notation.promotion).await
    }

    pub async fn step_back(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Navigate(Navigation::Back)).await
    }

    pub async fn step_forward(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Navigate(Navigation::Forward)).await
    }

    /// Browse to the position after move `index` (`-1` = initial position).
    pub async fn jump_to(&self, index: isize) -> Result<(), SessionError> {
        self.send(SessionCommand::Navigate(Navigation::Jump(index))).await
    }

    pub async fn jump_to_live(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Navigate(Navigation::Live)).await
    }

    /// Latest published snapshot.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn connection(&self) -> ConnectionStateObserver {
        self.connection.clone()
    }

    /// Tear the session down (cancel timers, normal-close the socket) and wait
    /// for the task to finish.
    pub async fn close(self, reason: impl Into<String>) -> Result<(), SessionError> {
        let (done, finished) = oneshot::channel();
        let close = SessionCommand::Close {
            reason: reason.into(),
            done,
        };
        if self.commands.send(close).await.is_ok() {
            let _ = finished.await;
        }
        if let Err(e) = self.task.await {
            tracing::error!(game_id = %self.game_id, error = %e, "Session task failed");
            return Err(SessionError::SessionClosed);
        }
        Ok(())
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::SessionClosed)
    }
}

/// At most one running session; entering a new game fully closes the old one first.
#[derive(Default)]
pub struct ActiveGame {
    current: Option<SessionHandle>,
}

impl ActiveGame {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(
        &mut self,
        ctx: SessionContext,
        config: ClientConfig,
        rules: Arc<dyn RulesEnginePort>,
        auth: Arc<dyn AuthPort>,
    ) -> &SessionHandle {
        self.leave("switching games").await;
        self.current
            .insert(SessionService::start(ctx, config, rules, auth))
    }

    pub async fn leave(&mut self, reason: &str) {
        if let Some(handle) = self.current.take() {
            let game_id = handle.game_id();
            if let Err(e) = handle.close(reason).await {
                tracing::warn!(game_id = %game_id, error = %e, "Previous session did not close cleanly");
            }
        }
    }

    pub fn current(&self) -> Option<&SessionHandle> {
        self.current.as_ref()
    }
}
