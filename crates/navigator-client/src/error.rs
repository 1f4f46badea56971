use navigator_core::ReconcileError;
use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The reconciler refused to open a connection.
    #[error(transparent)]
    Rejected(#[from] ReconcileError),
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: Box<tungstenite::Error>,
    },
    /// The connection was torn down while the handshake was in flight.
    #[error("connection to {endpoint} was closed during the handshake")]
    Cancelled { endpoint: String },
}
