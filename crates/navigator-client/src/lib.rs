pub mod error;
pub mod transport;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use navigator_core::{ConnectionHandle, NavigatorConfig, Snapshot, StreamReconciler, Subscription};

pub use error::TransportError;

/// Dashboard-facing handle: one reconciler plus the reader task of its
/// current connection.
pub struct NavigatorClient {
    reconciler: StreamReconciler,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl NavigatorClient {
    pub fn new(reconciler: StreamReconciler) -> Self {
        Self {
            reconciler,
            reader: Mutex::new(None),
        }
    }

    pub fn from_config(config: &NavigatorConfig) -> Self {
        Self::new(StreamReconciler::from_config(config))
    }

    pub fn snapshot(&self) -> Snapshot {
        self.reconciler.snapshot()
    }

    pub fn subscribe(&self) -> Subscription {
        self.reconciler.subscribe()
    }

    /// Connect to a status stream. Rejected while another connection is
    /// pending or live; a failed dial shows up as
    /// [`ConnectionStatus::Failed`](navigator_core::ConnectionStatus::Failed)
    /// in snapshots as well.
    pub async fn connect(&self, endpoint: &str) -> Result<(), TransportError> {
        let connection = transport::open(&self.reconciler, endpoint).await?;
        self.install_reader(&connection.handle, connection.reader)
    }

    /// Keep `reader` as the live reader task, unless its connection was torn
    /// down since the handshake. Checked under the reader lock, which
    /// teardown also holds, so a reader is never left running unowned.
    fn install_reader(
        &self,
        connection: &ConnectionHandle,
        reader: JoinHandle<()>,
    ) -> Result<(), TransportError> {
        let mut slot = self.lock_reader();
        if !connection.is_current() {
            reader.abort();
            return Err(TransportError::Cancelled {
                endpoint: connection.endpoint().to_string(),
            });
        }
        if let Some(previous) = slot.replace(reader) {
            previous.abort();
        }
        Ok(())
    }

    /// Close the connection and return every agent to idle.
    pub fn disconnect(&self) {
        let mut slot = self.lock_reader();
        self.reconciler.disconnect();
        if let Some(reader) = slot.take() {
            reader.abort();
        }
    }

    /// Restore the seeded idle table, closing any connection.
    pub fn reset(&self) {
        let mut slot = self.lock_reader();
        self.reconciler.reset();
        if let Some(reader) = slot.take() {
            reader.abort();
        }
    }

    fn lock_reader(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NavigatorClient {
    fn drop(&mut self) {
        if let Some(reader) = self.lock_reader().take() {
            reader.abort();
        }
    }
}
