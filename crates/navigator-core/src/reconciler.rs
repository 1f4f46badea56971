use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::agent::AgentStatus;
use crate::config::NavigatorConfig;
use crate::dashboard::{ConnectionStatus, Snapshot};
use crate::error::ReconcileError;
use crate::events::{StatusMessage, decode_status_bytes, decode_status_message};

/// Default number of snapshots a slow subscriber may fall behind before it
/// starts skipping to newer ones.
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 256;

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Malformed,
    UnknownAgent,
    /// Arrived on a connection that has since been torn down.
    Stale,
}

struct Inner {
    agents: Vec<AgentStatus>,
    connection: ConnectionStatus,
    generation: u64,
    revision: u64,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            agents: self.agents.clone(),
            connection: self.connection.clone(),
        }
    }

    fn apply(&mut self, msg: &StatusMessage) -> ApplyOutcome {
        let Some(agent) = self.agents.iter_mut().find(|a| a.name == msg.agent) else {
            tracing::debug!(agent = %msg.agent, status = %msg.status, "Dropping status for unknown agent");
            return ApplyOutcome::UnknownAgent;
        };
        if !msg.status.is_known() {
            tracing::trace!(agent = %msg.agent, status = %msg.status, "Unrecognized status, state unchanged");
        }
        agent.apply(&msg.status, msg.payload.as_ref());
        ApplyOutcome::Applied
    }

    /// Invalidate the live connection and return every agent to idle.
    /// Returns whether anything visible changed.
    fn teardown(&mut self) -> bool {
        self.generation += 1;
        let mut changed = self.connection != ConnectionStatus::Disconnected;
        self.connection = ConnectionStatus::Disconnected;
        for agent in &mut self.agents {
            let previous = agent.clone();
            agent.reset();
            changed |= *agent != previous;
        }
        changed
    }
}

struct Shared {
    inner: Mutex<Inner>,
    updates: broadcast::Sender<Snapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the lock held so subscribers see snapshots in
    /// application order.
    fn publish(&self, inner: &mut Inner) {
        inner.revision += 1;
        let _ = self.updates.send(inner.snapshot());
    }
}

/// Folds an at-least-once stream of agent status events into a fixed table
/// of agents and fans every change out to subscribers.
///
/// Cloning is cheap and yields another handle onto the same table.
#[derive(Clone)]
pub struct StreamReconciler {
    shared: Arc<Shared>,
}

impl StreamReconciler {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_capacity(names, DEFAULT_SNAPSHOT_CAPACITY)
    }

    /// Seed one idle agent per distinct name. Duplicate names are dropped.
    pub fn with_capacity<I, S>(names: I, snapshot_capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut agents: Vec<AgentStatus> = Vec::new();
        for name in names {
            let name = name.into();
            if agents.iter().any(|a| a.name == name) {
                tracing::warn!(agent = %name, "Ignoring duplicate agent name");
                continue;
            }
            agents.push(AgentStatus::idle(name));
        }
        let (updates, _) = broadcast::channel(snapshot_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    agents,
                    connection: ConnectionStatus::Disconnected,
                    generation: 0,
                    revision: 0,
                }),
                updates,
            }),
        }
    }

    pub fn from_config(config: &NavigatorConfig) -> Self {
        Self::with_capacity(
            config.agents.names.iter().cloned(),
            config.transport.snapshot_capacity,
        )
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.lock().snapshot()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.shared.lock().connection.clone()
    }

    /// Current snapshot plus a receiver for every later one. Both are taken
    /// under the lock, so no update falls between them.
    pub fn subscribe(&self) -> Subscription {
        let inner = self.shared.lock();
        Subscription {
            current: inner.snapshot(),
            updates: self.shared.updates.subscribe(),
        }
    }

    /// Decode and apply one message regardless of connection state.
    pub fn apply_raw(&self, text: &str) -> ApplyOutcome {
        match decode_status_message(text) {
            Ok(msg) => self.apply_message(&msg),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed status message");
                ApplyOutcome::Malformed
            },
        }
    }

    pub fn apply_message(&self, msg: &StatusMessage) -> ApplyOutcome {
        let mut inner = self.shared.lock();
        let outcome = inner.apply(msg);
        if outcome == ApplyOutcome::Applied {
            self.shared.publish(&mut inner);
        }
        outcome
    }

    /// Apply a burst of messages under one lock and publish a single
    /// snapshot. The result matches applying them one by one. Returns the
    /// number of messages that were applied.
    pub fn apply_batch<'a, I>(&self, texts: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let decoded: Vec<StatusMessage> = texts
            .into_iter()
            .filter_map(|text| match decode_status_message(text) {
                Ok(msg) => Some(msg),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding malformed status message");
                    None
                },
            })
            .collect();

        let mut inner = self.shared.lock();
        let applied = decoded
            .iter()
            .filter(|msg| inner.apply(msg) == ApplyOutcome::Applied)
            .count();
        if applied > 0 {
            self.shared.publish(&mut inner);
        }
        applied
    }

    /// Claim the reconciler's single connection slot for `endpoint`.
    ///
    /// Fails while another connection is connecting or connected. The
    /// returned handle is how a transport feeds messages in; it goes stale
    /// as soon as the connection is torn down or fails.
    pub fn begin_connection(&self, endpoint: &str) -> Result<ConnectionHandle, ReconcileError> {
        if endpoint.trim().is_empty() {
            return Err(ReconcileError::EmptyEndpoint);
        }
        let mut inner = self.shared.lock();
        if let ConnectionStatus::Connecting { endpoint: live } | ConnectionStatus::Connected { endpoint: live } =
            &inner.connection
        {
            return Err(ReconcileError::AlreadyConnected {
                endpoint: live.clone(),
            });
        }
        inner.generation += 1;
        inner.connection = ConnectionStatus::Connecting {
            endpoint: endpoint.to_string(),
        };
        let generation = inner.generation;
        self.shared.publish(&mut inner);
        tracing::info!(endpoint, generation, "Connecting to status stream");
        Ok(ConnectionHandle {
            shared: Arc::clone(&self.shared),
            generation,
            endpoint: endpoint.to_string(),
        })
    }

    /// Tear down the connection and return every agent to idle. Messages
    /// still in flight on the old connection are discarded once this
    /// returns.
    pub fn disconnect(&self) {
        let mut inner = self.shared.lock();
        if inner.teardown() {
            self.shared.publish(&mut inner);
        }
        tracing::info!("Disconnected from status stream");
    }

    /// Restore the seeded idle table. Also closes the connection; calling it
    /// again is a no-op.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        if inner.teardown() {
            self.shared.publish(&mut inner);
            tracing::info!("Agent table reset");
        }
    }
}

/// A transport's capability to feed one connection's messages into a
/// [`StreamReconciler`]. Clones share the same connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<Shared>,
    generation: u64,
    endpoint: String,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.endpoint)
            .field("generation", &self.generation)
            .finish()
    }
}

impl ConnectionHandle {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// False once the connection was torn down, failed, or replaced.
    pub fn is_current(&self) -> bool {
        self.shared.lock().generation == self.generation
    }

    /// Record that the transport finished its handshake.
    pub fn mark_connected(&self) -> bool {
        let mut inner = self.shared.lock();
        if inner.generation != self.generation {
            return false;
        }
        inner.connection = ConnectionStatus::Connected {
            endpoint: self.endpoint.clone(),
        };
        self.shared.publish(&mut inner);
        tracing::info!(endpoint = %self.endpoint, "Status stream connected");
        true
    }

    /// Apply a text frame received on this connection.
    pub fn deliver(&self, text: &str) -> ApplyOutcome {
        if !self.is_current() {
            return ApplyOutcome::Stale;
        }
        match decode_status_message(text) {
            Ok(msg) => self.deliver_message(&msg),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Discarding malformed status message");
                ApplyOutcome::Malformed
            },
        }
    }

    /// Apply a binary frame carrying UTF-8 JSON.
    pub fn deliver_bytes(&self, data: &[u8]) -> ApplyOutcome {
        if !self.is_current() {
            return ApplyOutcome::Stale;
        }
        match decode_status_bytes(data) {
            Ok(msg) => self.deliver_message(&msg),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Discarding malformed status message");
                ApplyOutcome::Malformed
            },
        }
    }

    fn deliver_message(&self, msg: &StatusMessage) -> ApplyOutcome {
        let mut inner = self.shared.lock();
        if inner.generation != self.generation {
            tracing::debug!(endpoint = %self.endpoint, agent = %msg.agent, "Discarding message from closed connection");
            return ApplyOutcome::Stale;
        }
        let outcome = inner.apply(msg);
        if outcome == ApplyOutcome::Applied {
            self.shared.publish(&mut inner);
        }
        outcome
    }

    /// Report a transport failure. Only the first report for a live
    /// connection is surfaced; agent states are left untouched. Returns
    /// whether this call changed the connection status.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        let mut inner = self.shared.lock();
        if inner.generation != self.generation {
            return false;
        }
        let reason = reason.into();
        tracing::warn!(endpoint = %self.endpoint, %reason, "Status stream failed");
        inner.generation += 1;
        inner.connection = ConnectionStatus::Failed {
            endpoint: self.endpoint.clone(),
            reason,
        };
        self.shared.publish(&mut inner);
        true
    }
}

/// A subscriber's view: the snapshot at subscription time plus every
/// snapshot published afterwards.
pub struct Subscription {
    pub current: Snapshot,
    updates: broadcast::Receiver<Snapshot>,
}

impl Subscription {
    /// Next pending snapshot without waiting. A subscriber that fell behind
    /// skips ahead to the oldest snapshot still buffered.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        loop {
            match self.updates.try_recv() {
                Ok(snapshot) => {
                    self.current = snapshot.clone();
                    return Some(snapshot);
                },
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Snapshot subscriber lagged");
                },
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next snapshot. `None` once the reconciler is dropped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        loop {
            match self.updates.recv().await {
                Ok(snapshot) => {
                    self.current = snapshot.clone();
                    return Some(snapshot);
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Snapshot subscriber lagged");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Snapshot> + Send + 'static {
        BroadcastStream::new(self.updates).filter_map(|result| match result {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!("Snapshot stream skipped: {e}");
                None
            },
        })
    }
}
