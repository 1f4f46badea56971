#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::StreamExt;
use tokio::sync::Notify;

use navigator_core::{Snapshot, Subscription};

/// One step of the server's script, played to every connecting client.
#[derive(Clone)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Hold until the test notifies the gate.
    Wait(Arc<Notify>),
    /// Send a close frame with the given reason and stop.
    Close(&'static str),
}

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a server that plays `script` to each client, then keeps the
    /// socket open until the client goes away.
    pub async fn scripted(script: Vec<Frame>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new()
            .route("/ws", axum::routing::get(ws_handler))
            .with_state(Arc::new(script));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    /// A server that accepts and then stays silent.
    pub async fn idle() -> Self {
        Self::scripted(Vec::new()).await
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(script): State<Arc<Vec<Frame>>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| play(socket, script))
}

async fn play(mut socket: WebSocket, script: Arc<Vec<Frame>>) {
    for frame in script.iter() {
        let message = match frame {
            Frame::Text(text) => Message::Text(text.clone().into()),
            Frame::Binary(data) => Message::Binary(data.clone().into()),
            Frame::Wait(gate) => {
                gate.notified().await;
                continue;
            },
            Frame::Close(reason) => {
                let close = CloseFrame {
                    code: 1000,
                    reason: Utf8Bytes::from_static(reason),
                };
                let _ = socket.send(Message::Close(Some(close))).await;
                return;
            },
        };
        if socket.send(message).await.is_err() {
            return;
        }
    }
    while let Some(Ok(_)) = socket.next().await {}
}

/// Wait until a snapshot satisfies `pred` (5s timeout). Checks the
/// subscription's current snapshot first.
pub async fn wait_for(
    subscription: &mut Subscription,
    pred: impl Fn(&Snapshot) -> bool,
) -> Snapshot {
    if pred(&subscription.current) {
        return subscription.current.clone();
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = subscription.next().await.expect("reconciler dropped");
            if pred(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

/// An address nothing is listening on.
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/ws")
}
