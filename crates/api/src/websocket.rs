//! Push-channel handshake.
//!
//! Each upgraded socket becomes one [`Subscriber`]: frames queued by the
//! fanout are written to the socket, and the subscriber is removed as soon
//! as the client goes away or the hub closes it.

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use livefeed_services::Subscriber;

use crate::routes::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<AppState>,
) -> Response {
    let remote = connect_info.map(|ConnectInfo(addr)| addr);
    ws.on_upgrade(move |socket| handle_socket(socket, remote, state))
}

async fn handle_socket(mut socket: WebSocket, remote: Option<SocketAddr>, state: AppState) {
    let (subscriber, mut frames) = Subscriber::channel(remote, state.subscriber_buffer);
    let id = subscriber.id();
    let closed = subscriber.closed_signal();
    state.fanout.register(subscriber);

    loop {
        tokio::select! {
            () = closed.cancelled() => {
                if let Err(e) = socket.send(Message::Close(None)).await {
                    tracing::debug!(%id, "Close frame not sent: {}", e);
                }
                break;
            }
            frame = frames.recv() => match frame {
                Some(text) => {
                    if let Err(e) = socket.send(Message::Text(text.to_string())).await {
                        tracing::warn!(%id, ?remote, "❌ WebSocket write failed: {}", e);
                        break;
                    }
                }
                None => break,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(%id, ?remote, "❌ Client disconnected");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(%id, ?remote, "❌ Client read error: {}", e);
                    break;
                }
                // Inbound traffic carries no meaning for a one-way feed.
                Some(Ok(_)) => {}
            },
        }
    }

    state.fanout.unregister(id);
}
