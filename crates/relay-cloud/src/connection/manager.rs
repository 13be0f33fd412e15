use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use relay_core::config::{BrokerConfig, ConnectionConfig};
use relay_core::errors::{ErrorClass, NetworkError, RelayError, RelayResult};
use relay_core::models::ConnectionState;
use relay_core::schedule::CancellationToken;
use relay_core::traits::{BrokerTransport, ConnectionControl, OutboundMessage};
use relay_observability::events;

use super::backoff::Backoff;

/// How often a healthy connection is re-examined when nothing wakes the loop.
const IDLE_RECHECK: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub state: ConnectionState,
    /// Successful connects after the first one.
    pub reconnections: u64,
    pub connect_failures: u64,
    pub backoff_attempt: u32,
    pub last_error: Option<String>,
}

struct Inner {
    backoff: Backoff,
    connected_since: Option<Instant>,
    /// Backoff already reset for the current session.
    stable: bool,
    last_error: Option<String>,
    permanent_auth: bool,
}

/// Owns the single broker session.
///
/// State changes are published on a `watch` channel so the DeliveryEngine
/// can wake on reconnect. Exactly one connect attempt runs at a time;
/// concurrent `connect()` calls return immediately.
pub struct ConnectionManager {
    transport: Arc<dyn BrokerTransport>,
    config: ConnectionConfig,
    connect_timeout: Duration,
    operation_timeout: Duration,
    disconnect_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    attempt_lock: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
    wake: Notify,
    reset_session: AtomicBool,
    ever_connected: AtomicBool,
    reconnections: AtomicU64,
    connect_failures: AtomicU64,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn BrokerTransport>,
        broker: &BrokerConfig,
        config: ConnectionConfig,
    ) -> Self {
        let backoff = Backoff::new(
            Duration::from_secs(config.backoff_base_secs),
            Duration::from_secs(config.backoff_cap_secs),
        );
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            config,
            connect_timeout: Duration::from_secs(broker.connect_timeout_secs),
            operation_timeout: Duration::from_secs(broker.operation_timeout_secs),
            disconnect_timeout: Duration::from_secs(broker.disconnect_timeout_secs),
            state,
            attempt_lock: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner {
                backoff,
                connected_since: None,
                stable: false,
                last_error: None,
                permanent_auth: false,
            }),
            wake: Notify::new(),
            reset_session: AtomicBool::new(false),
            ever_connected: AtomicBool::new(false),
            reconnections: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn transition(&self, to: ConnectionState) {
        let from = self.state.send_replace(to);
        if from != to {
            events::connection_state_changed(from, to);
        }
    }

    /// Open the session. A no-op while `Connected`. A call that arrives
    /// while another attempt is in flight waits for that attempt and shares
    /// its outcome.
    pub async fn connect(&self) -> RelayResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let _attempt = match self.attempt_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let _done = self.attempt_lock.lock().await;
                return self.attempt_outcome();
            }
        };
        if self.is_connected() {
            return Ok(());
        }

        self.transition(ConnectionState::Connecting);
        if self.reset_session.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.transport.disconnect().await {
                tracing::debug!(error = %e, "connection: closing stale session failed");
            }
        }

        let result = match tokio::time::timeout(self.connect_timeout, self.transport.connect()).await
        {
            Ok(result) => result,
            Err(_) => Err(NetworkError::ConnectTimeout {
                timeout_secs: self.connect_timeout.as_secs(),
            }
            .into()),
        };

        match result {
            Ok(()) => {
                {
                    let mut inner = self.inner();
                    inner.connected_since = Some(Instant::now());
                    inner.stable = false;
                    inner.last_error = None;
                    inner.permanent_auth = false;
                }
                if self.ever_connected.swap(true, Ordering::SeqCst) {
                    self.reconnections.fetch_add(1, Ordering::Relaxed);
                }
                self.transition(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.connect_failures.fetch_add(1, Ordering::Relaxed);
                self.record_failure(&e);
                self.transition(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Outcome of an attempt this caller waited on rather than made.
    fn attempt_outcome(&self) -> RelayResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        Err(NetworkError::NotConnected {
            state: self.state().to_string(),
        }
        .into())
    }

    fn record_failure(&self, e: &RelayError) {
        let permanent = e.class() == ErrorClass::PermanentAuth;
        {
            let mut inner = self.inner();
            inner.last_error = Some(e.to_string());
            inner.permanent_auth = permanent;
            inner.connected_since = None;
        }
        if permanent {
            tracing::error!(error = %e, "connection: broker rejected device credentials");
        } else {
            tracing::warn!(error = %e, "connection: connect failed");
        }
    }

    /// Publish one message. Fails with `NotConnected` unless `Connected`;
    /// queuing is the caller's job. A transient failure marks the session lost.
    pub async fn publish(&self, message: &OutboundMessage) -> RelayResult<()> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected {
                state: state.to_string(),
            }
            .into());
        }

        let result =
            match tokio::time::timeout(self.operation_timeout, self.transport.publish(message))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(NetworkError::Transient {
                    reason: format!(
                        "publish timed out after {}s",
                        self.operation_timeout.as_secs()
                    ),
                }
                .into()),
            };

        if let Err(e) = &result {
            match e.class() {
                ErrorClass::Transient | ErrorClass::PermanentAuth => self.connection_lost(e),
                _ => {}
            }
        }
        result
    }

    fn connection_lost(&self, e: &RelayError) {
        if !self.is_connected() {
            return;
        }
        self.record_failure(e);
        self.transition(ConnectionState::Disconnected);
        self.wake.notify_one();
    }

    /// Close the session, bounded by the disconnect timeout.
    pub async fn disconnect(&self) {
        self.transition(ConnectionState::Disconnected);
        match tokio::time::timeout(self.disconnect_timeout, self.transport.disconnect()).await {
            Ok(Ok(())) => tracing::info!("connection: disconnected"),
            Ok(Err(e)) => tracing::warn!(error = %e, "connection: disconnect failed"),
            Err(_) => tracing::warn!(
                timeout_secs = self.disconnect_timeout.as_secs(),
                "connection: disconnect timed out, forcing close"
            ),
        }
    }

    /// The network just came back: skip whatever backoff is left.
    pub fn notify_reachable(&self) {
        if !self.is_connected() {
            tracing::info!(state = %self.state(), "connection: network reachable, reconnecting now");
            self.wake.notify_one();
        }
    }

    /// Reset the backoff counter once the session has been up for
    /// `stable_reset_secs`. Returns the time left otherwise.
    fn settle(&self) -> Option<Duration> {
        let window = Duration::from_secs(self.config.stable_reset_secs);
        let mut inner = self.inner();
        if inner.stable {
            return None;
        }
        let since = inner.connected_since?;
        let up = since.elapsed();
        if up >= window {
            if inner.backoff.attempt() > 0 {
                tracing::debug!(attempts = inner.backoff.attempt(), "connection: stable, backoff reset");
            }
            inner.backoff.reset();
            inner.stable = true;
            None
        } else {
            Some(window - up)
        }
    }

    fn next_delay(&self) -> Duration {
        let mut inner = self.inner();
        if inner.permanent_auth {
            // Retrying cannot help until credentials change; don't spin.
            inner.backoff.cap()
        } else {
            inner.backoff.next_delay()
        }
    }

    /// Keep the session up until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::debug!("connection manager started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            if self.is_connected() {
                let wait = self.settle().unwrap_or(IDLE_RECHECK);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = self.wake.notified() => {}
                    _ = tokio::time::sleep(wait) => {}
                }
                continue;
            }

            if self.connect().await.is_ok() {
                continue;
            }

            let delay = self.next_delay();
            self.transition(ConnectionState::Backoff);
            tracing::info!(
                delay_ms = delay.as_millis() as u64,
                attempt = self.inner().backoff.attempt(),
                "connection: backing off"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.wake.notified() => {
                    tracing::debug!("connection: backoff interrupted");
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        tracing::debug!("connection manager stopped");
    }

    pub fn stats(&self) -> ConnectionStats {
        let inner = self.inner();
        ConnectionStats {
            state: self.state(),
            reconnections: self.reconnections.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            backoff_attempt: inner.backoff.attempt(),
            last_error: inner.last_error.clone(),
        }
    }
}

impl ConnectionControl for ConnectionManager {
    fn state(&self) -> ConnectionState {
        ConnectionManager::state(self)
    }

    /// Drop the session and reconnect right away.
    fn force_reconnect(&self) {
        tracing::info!(state = %self.state(), "connection: forced reconnect");
        self.reset_session.store(true, Ordering::SeqCst);
        {
            let mut inner = self.inner();
            inner.connected_since = None;
        }
        // Only a settled state may be replaced; an attempt in flight owns it.
        if self.state() != ConnectionState::Connecting {
            self.transition(ConnectionState::Disconnected);
        }
        self.wake.notify_one();
    }
}
