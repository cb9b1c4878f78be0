//! Platform-agnostic core of the game socket lifecycle.
//!
//! No tokio, sockets or clocks in here. The session task owns the actual
//! socket and timers, feeds every socket event and timer fire into
//! [`ConnectionMachine`], and executes the [`ConnectionEffect`]s it returns in
//! order. The reconnect attempt counter is plain machine state.

use std::collections::HashSet;
use std::time::Duration;

use gambit_shared::ClientMessage;
use thiserror::Error;

use super::shared::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_KEEPALIVE_SECS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_DELAY_MS, NORMAL_CLOSE_CODE,
};
use crate::infrastructure::messaging::ConnectionState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Connection attempt timed out")]
    ConnectTimeout,
    #[error("Connection lost after {attempts} reconnect attempts")]
    ConnectionLost { attempts: u32 },
    #[error("Not connected")]
    NotConnected,
    #[error("Socket closed abnormally (code {code})")]
    AbnormalClose { code: u16 },
    #[error("Socket error: {0}")]
    Socket(String),
}

/// Timers owned by the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    ConnectTimeout,
    Keepalive,
    ReconnectDelay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEffect {
    /// Start a connect attempt (token refresh + WebSocket handshake).
    Dial,
    ArmTimer { kind: TimerKind, after: Duration },
    CancelTimer(TimerKind),
    /// Write a frame to the open socket.
    Transmit(ClientMessage),
    /// Send a close frame on the open socket.
    CloseSocket { code: u16, reason: String },
    /// Release the socket and any in-flight connect attempt.
    DropSocket,
    StateChanged(ConnectionState),
    /// Unrecoverable; no further automatic retry will happen.
    Fatal(ConnectionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPolicy {
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            keepalive_interval: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

#[derive(Debug)]
pub struct ConnectionMachine {
    policy: ConnectionPolicy,
    state: ConnectionState,
    attempts: u32,
    last_error: Option<ConnectionError>,
    keepalive_enabled: bool,
    armed: HashSet<TimerKind>,
}

impl ConnectionMachine {
    pub fn new(policy: ConnectionPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Idle,
            attempts: 0,
            last_error: None,
            keepalive_enabled: true,
            armed: HashSet::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts made since the socket was last open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains(&kind)
    }

    pub fn has_armed_timers(&self) -> bool {
        !self.armed.is_empty()
    }

    /// Begin the first connect attempt. Only valid from `Idle`.
    pub fn open(&mut self) -> Vec<ConnectionEffect> {
        if self.state != ConnectionState::Idle {
            tracing::debug!(state = %self.state, "Ignoring open on a used connection");
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.begin_connect(&mut effects);
        effects
    }

    /// The handshake completed.
    pub fn socket_opened(&mut self) -> Vec<ConnectionEffect> {
        if self.state != ConnectionState::Connecting {
            // Handshake finished after the attempt was abandoned.
            return vec![
                ConnectionEffect::CloseSocket {
                    code: NORMAL_CLOSE_CODE,
                    reason: "stale connection".to_string(),
                },
                ConnectionEffect::DropSocket,
            ];
        }

        let mut effects = Vec::new();
        self.cancel(TimerKind::ConnectTimeout, &mut effects);
        self.attempts = 0;
        self.last_error = None;
        self.transition(ConnectionState::Open, &mut effects);
        if self.keepalive_enabled {
            self.arm(TimerKind::Keepalive, self.policy.keepalive_interval, &mut effects);
        }
        effects
    }

    /// Dial or transport failure. Treated as an abnormal close.
    pub fn socket_failed(&mut self, error: impl Into<String>) -> Vec<ConnectionEffect> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                self.abnormal_close(ConnectionError::Socket(error.into()))
            }
            _ => Vec::new(),
        }
    }

    /// The socket closed with `code`. 1000 is a normal close and is terminal;
    /// anything else goes through the reconnect policy.
    pub fn socket_closed(&mut self, code: u16) -> Vec<ConnectionEffect> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open if code == NORMAL_CLOSE_CODE => {
                let mut effects = Vec::new();
                self.settle_closed(&mut effects);
                effects
            }
            ConnectionState::Connecting | ConnectionState::Open => {
                self.abnormal_close(ConnectionError::AbnormalClose { code })
            }
            ConnectionState::Closing => {
                let mut effects = Vec::new();
                self.settle_closed(&mut effects);
                effects
            }
            _ => Vec::new(),
        }
    }

    /// A timer fired. Fires for timers that are not armed are stale and ignored.
    pub fn timer_fired(&mut self, kind: TimerKind) -> Vec<ConnectionEffect> {
        if !self.armed.remove(&kind) {
            tracing::trace!(timer = ?kind, "Ignoring stale timer");
            return Vec::new();
        }

        match (kind, self.state) {
            (TimerKind::ConnectTimeout, ConnectionState::Connecting) => {
                tracing::warn!(attempt = self.attempts, "Connect attempt timed out");
                self.abnormal_close(ConnectionError::ConnectTimeout)
            }
            (TimerKind::Keepalive, ConnectionState::Open) if self.keepalive_enabled => {
                let mut effects = vec![ConnectionEffect::Transmit(ClientMessage::Keepalive)];
                self.arm(TimerKind::Keepalive, self.policy.keepalive_interval, &mut effects);
                effects
            }
            (TimerKind::ReconnectDelay, ConnectionState::Reconnecting) => {
                let mut effects = Vec::new();
                self.begin_connect(&mut effects);
                effects
            }
            _ => Vec::new(),
        }
    }

    /// Caller-initiated close. Terminal; no retry follows.
    pub fn close(&mut self, reason: impl Into<String>) -> Vec<ConnectionEffect> {
        let mut effects = Vec::new();
        match self.state {
            ConnectionState::Open => {
                self.cancel_all(&mut effects);
                self.transition(ConnectionState::Closing, &mut effects);
                effects.push(ConnectionEffect::CloseSocket {
                    code: NORMAL_CLOSE_CODE,
                    reason: reason.into(),
                });
                self.settle_closed(&mut effects);
            }
            ConnectionState::Idle
            | ConnectionState::Connecting
            | ConnectionState::Reconnecting => {
                self.settle_closed(&mut effects);
            }
            ConnectionState::Closing | ConnectionState::Closed => {}
        }
        effects
    }

    /// Frame a payload for sending. Fails unless the socket is open.
    pub fn send(&self, message: ClientMessage) -> Result<ConnectionEffect, ConnectionError> {
        if self.state != ConnectionState::Open {
            return Err(ConnectionError::NotConnected);
        }
        Ok(ConnectionEffect::Transmit(message))
    }

    /// Stop the keepalive for good (the game is over). Survives reconnects.
    pub fn stop_keepalive(&mut self) -> Vec<ConnectionEffect> {
        self.keepalive_enabled = false;
        let mut effects = Vec::new();
        self.cancel(TimerKind::Keepalive, &mut effects);
        effects
    }

    fn begin_connect(&mut self, effects: &mut Vec<ConnectionEffect>) {
        self.transition(ConnectionState::Connecting, effects);
        effects.push(ConnectionEffect::Dial);
        self.arm(TimerKind::ConnectTimeout, self.policy.connect_timeout, effects);
    }

    fn abnormal_close(&mut self, error: ConnectionError) -> Vec<ConnectionEffect> {
        let mut effects = Vec::new();
        self.cancel_all(&mut effects);
        effects.push(ConnectionEffect::DropSocket);
        self.last_error = Some(error);

        if self.attempts < self.policy.max_reconnect_attempts {
            self.attempts += 1;
            tracing::info!(
                attempt = self.attempts,
                max_attempts = self.policy.max_reconnect_attempts,
                delay_ms = self.policy.reconnect_delay.as_millis() as u64,
                "Scheduling reconnect"
            );
            self.transition(ConnectionState::Reconnecting, &mut effects);
            self.arm(TimerKind::ReconnectDelay, self.policy.reconnect_delay, &mut effects);
        } else {
            let fatal = match self.last_error {
                Some(ConnectionError::ConnectTimeout) => ConnectionError::ConnectTimeout,
                _ => ConnectionError::ConnectionLost {
                    attempts: self.attempts,
                },
            };
            tracing::error!(attempts = self.attempts, error = %fatal, "Reconnect budget exhausted");
            self.transition(ConnectionState::Closed, &mut effects);
            effects.push(ConnectionEffect::Fatal(fatal));
        }
        effects
    }

    fn settle_closed(&mut self, effects: &mut Vec<ConnectionEffect>) {
        self.cancel_all(effects);
        effects.push(ConnectionEffect::DropSocket);
        self.transition(ConnectionState::Closed, effects);
    }

    fn transition(&mut self, next: ConnectionState, effects: &mut Vec<ConnectionEffect>) {
        if self.state == next {
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "Connection state changed");
        self.state = next;
        effects.push(ConnectionEffect::StateChanged(next));
    }

    fn arm(&mut self, kind: TimerKind, after: Duration, effects: &mut Vec<ConnectionEffect>) {
        self.armed.insert(kind);
        effects.push(ConnectionEffect::ArmTimer { kind, after });
    }

    fn cancel(&mut self, kind: TimerKind, effects: &mut Vec<ConnectionEffect>) {
        if self.armed.remove(&kind) {
            effects.push(ConnectionEffect::CancelTimer(kind));
        }
    }

    fn cancel_all(&mut self, effects: &mut Vec<ConnectionEffect>) {
        for kind in [
            TimerKind::ConnectTimeout,
            TimerKind::Keepalive,
            TimerKind::ReconnectDelay,
        ] {
            self.cancel(kind, effects);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max: u32) -> ConnectionPolicy {
        ConnectionPolicy {
            connect_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_millis(3_000),
            max_reconnect_attempts: max,
        }
    }

    fn opened(max: u32) -> ConnectionMachine {
        let mut machine = ConnectionMachine::new(policy(max));
        machine.open();
        machine.socket_opened();
        machine
    }

    #[test]
    fn open_dials_and_arms_connect_timeout() {
        let mut machine = ConnectionMachine::new(policy(5));
        let effects = machine.open();

        assert_eq!(
            effects,
            vec![
                ConnectionEffect::StateChanged(ConnectionState::Connecting),
                ConnectionEffect::Dial,
                ConnectionEffect::ArmTimer {
                    kind: TimerKind::ConnectTimeout,
                    after: Duration::from_secs(10),
                },
            ]
        );
        assert!(machine.open().is_empty());
    }

    #[test]
    fn successful_open_starts_keepalive() {
        let mut machine = ConnectionMachine::new(policy(5));
        machine.open();
        let effects = machine.socket_opened();

        assert_eq!(
            effects,
            vec![
                ConnectionEffect::CancelTimer(TimerKind::ConnectTimeout),
                ConnectionEffect::StateChanged(ConnectionState::Open),
                ConnectionEffect::ArmTimer {
                    kind: TimerKind::Keepalive,
                    after: Duration::from_secs(30),
                },
            ]
        );
        assert_eq!(machine.state(), ConnectionState::Open);
    }

    #[test]
    fn keepalive_tick_transmits_sentinel_and_rearms() {
        let mut machine = opened(5);
        let effects = machine.timer_fired(TimerKind::Keepalive);

        assert_eq!(effects[0], ConnectionEffect::Transmit(ClientMessage::Keepalive));
        assert!(machine.is_armed(TimerKind::Keepalive));
    }

    #[test]
    fn send_requires_open() {
        let mut machine = ConnectionMachine::new(policy(5));
        let m = ClientMessage::Move("e2e4".parse().unwrap());
        assert_eq!(machine.send(m.clone()), Err(ConnectionError::NotConnected));

        machine.open();
        assert_eq!(machine.send(m.clone()), Err(ConnectionError::NotConnected));

        machine.socket_opened();
        assert_eq!(machine.send(m.clone()), Ok(ConnectionEffect::Transmit(m)));
    }

    #[test]
    fn abnormal_close_schedules_reconnect() {
        let mut machine = opened(5);
        let effects = machine.socket_closed(1006);

        assert_eq!(
            effects,
            vec![
                ConnectionEffect::CancelTimer(TimerKind::Keepalive),
                ConnectionEffect::DropSocket,
                ConnectionEffect::StateChanged(ConnectionState::Reconnecting),
                ConnectionEffect::ArmTimer {
                    kind: TimerKind::ReconnectDelay,
                    after: Duration::from_millis(3_000),
                },
            ]
        );
        assert_eq!(machine.attempts(), 1);

        let effects = machine.timer_fired(TimerKind::ReconnectDelay);
        assert!(effects.contains(&ConnectionEffect::Dial));
        assert_eq!(machine.state(), ConnectionState::Connecting);

        machine.socket_opened();
        assert_eq!(machine.attempts(), 0);
        assert_eq!(machine.last_error(), None);
    }

    #[test]
    fn normal_close_from_server_is_terminal() {
        let mut machine = opened(5);
        let effects = machine.socket_closed(1000);

        assert!(effects.contains(&ConnectionEffect::StateChanged(ConnectionState::Closed)));
        assert!(!effects.iter().any(|e| matches!(e, ConnectionEffect::ArmTimer { .. })));
        assert!(!machine.has_armed_timers());
        assert!(machine.timer_fired(TimerKind::ReconnectDelay).is_empty());
    }

    #[test]
    fn budget_exhaustion_settles_closed_with_no_timers() {
        let mut machine = opened(2);

        for _ in 0..2 {
            machine.socket_closed(1006);
            machine.timer_fired(TimerKind::ReconnectDelay);
            assert_eq!(machine.state(), ConnectionState::Connecting);
        }

        let effects = machine.socket_failed("connection refused");
        assert_eq!(machine.state(), ConnectionState::Closed);
        assert!(!machine.has_armed_timers());
        assert_eq!(
            effects.last(),
            Some(&ConnectionEffect::Fatal(ConnectionError::ConnectionLost { attempts: 2 }))
        );
        assert!(machine.timer_fired(TimerKind::ReconnectDelay).is_empty());
        assert!(machine.timer_fired(TimerKind::ConnectTimeout).is_empty());
    }

    #[test]
    fn connect_timeout_force_closes_and_retries() {
        let mut machine = ConnectionMachine::new(policy(1));
        machine.open();

        let effects = machine.timer_fired(TimerKind::ConnectTimeout);
        assert!(effects.contains(&ConnectionEffect::DropSocket));
        assert_eq!(machine.state(), ConnectionState::Reconnecting);
        assert_eq!(machine.last_error(), Some(&ConnectionError::ConnectTimeout));

        machine.timer_fired(TimerKind::ReconnectDelay);
        let effects = machine.timer_fired(TimerKind::ConnectTimeout);
        assert_eq!(
            effects.last(),
            Some(&ConnectionEffect::Fatal(ConnectionError::ConnectTimeout))
        );
        assert_eq!(machine.state(), ConnectionState::Closed);
    }

    #[test]
    fn caller_close_cancels_timers_before_releasing_socket() {
        let mut machine = opened(5);
        let effects = machine.close("leaving game");

        assert_eq!(
            effects,
            vec![
                ConnectionEffect::CancelTimer(TimerKind::Keepalive),
                ConnectionEffect::StateChanged(ConnectionState::Closing),
                ConnectionEffect::CloseSocket {
                    code: 1000,
                    reason: "leaving game".to_string(),
                },
                ConnectionEffect::DropSocket,
                ConnectionEffect::StateChanged(ConnectionState::Closed),
            ]
        );
        // A late close frame or timer fire must not revive the session.
        assert!(machine.socket_closed(1006).is_empty());
        assert!(machine.timer_fired(TimerKind::Keepalive).is_empty());
        assert!(machine.open().is_empty());
    }

    #[test]
    fn close_while_reconnecting_cancels_pending_retry() {
        let mut machine = opened(5);
        machine.socket_closed(1006);

        let effects = machine.close("user left");
        assert_eq!(effects[0], ConnectionEffect::CancelTimer(TimerKind::ReconnectDelay));
        assert_eq!(machine.state(), ConnectionState::Closed);
        assert!(!machine.has_armed_timers());
    }

    #[test]
    fn stopped_keepalive_stays_stopped_across_reconnects() {
        let mut machine = opened(5);
        let effects = machine.stop_keepalive();
        assert_eq!(effects, vec![ConnectionEffect::CancelTimer(TimerKind::Keepalive)]);

        machine.socket_closed(1006);
        machine.timer_fired(TimerKind::ReconnectDelay);
        let effects = machine.socket_opened();
        assert!(!effects.iter().any(|e| matches!(
            e,
            ConnectionEffect::ArmTimer {
                kind: TimerKind::Keepalive,
                ..
            }
        )));
    }

    #[test]
    fn stale_handshake_is_closed_immediately() {
        let mut machine = ConnectionMachine::new(policy(5));
        machine.open();
        machine.close("navigated away");

        let effects = machine.socket_opened();
        assert!(effects.contains(&ConnectionEffect::DropSocket));
        assert_eq!(machine.state(), ConnectionState::Closed);
    }
}
