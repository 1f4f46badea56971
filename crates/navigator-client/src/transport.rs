use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use navigator_core::{ApplyOutcome, ConnectionHandle, StreamReconciler};

use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live connection: the reconciler handle plus the task reading frames
/// into it.
pub struct Connection {
    pub handle: ConnectionHandle,
    pub reader: JoinHandle<()>,
}

/// Open a WebSocket to `endpoint` and spawn a reader that feeds every frame
/// into `reconciler`.
///
/// The connection slot is claimed before dialing, so a second call while
/// this one is pending or live is rejected. A failed dial is recorded on the
/// reconciler as well as returned.
pub async fn open(
    reconciler: &StreamReconciler,
    endpoint: &str,
) -> Result<Connection, TransportError> {
    let handle = reconciler.begin_connection(endpoint)?;

    let stream = match tokio_tungstenite::connect_async(endpoint).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            handle.fail(e.to_string());
            return Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            });
        },
    };

    if !handle.mark_connected() {
        return Err(TransportError::Cancelled {
            endpoint: endpoint.to_string(),
        });
    }
    let reader = tokio::spawn(read_loop(stream, handle.clone()));
    Ok(Connection { handle, reader })
}

/// Deliver frames in arrival order until the stream ends, errors, or the
/// handle goes stale.
async fn read_loop(mut stream: WsStream, handle: ConnectionHandle) {
    while let Some(frame) = stream.next().await {
        let outcome = match frame {
            Ok(Message::Text(text)) => handle.deliver(text.as_str()),
            Ok(Message::Binary(data)) => handle.deliver_bytes(&data),
            Ok(Message::Close(frame)) => {
                let reason = match frame {
                    Some(frame) if !frame.reason.is_empty() => {
                        format!("closed by server: {}", frame.reason)
                    },
                    _ => "closed by server".to_string(),
                };
                handle.fail(reason);
                return;
            },
            Ok(_) => continue,
            Err(e) => {
                handle.fail(e.to_string());
                return;
            },
        };
        if outcome == ApplyOutcome::Stale {
            tracing::debug!(endpoint = %handle.endpoint(), "Connection superseded, stopping reader");
            return;
        }
    }
    handle.fail("stream ended");
}
