//! Streaming query endpoint (WebSocket).
//!
//! The first text frame carries the query. One JSON event is pushed per
//! agent-loop transition; the stream ends with a `final` event or a single
//! terminal `error` event, and the socket is closed cleanly on every path.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::agent::AgentEvent;

use super::routes::AppState;
use super::types::QueryRequest;

pub async fn query_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_query_stream(socket, state))
}

async fn handle_query_stream(socket: WebSocket, state: Arc<AppState>) {
    info!("query stream client connected");

    let (mut sender, mut receiver) = socket.split();

    // First text frame is the query, raw or as {"query": ...} JSON.
    let query = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => break parse_query_frame(&text),
            Some(Ok(Message::Close(_))) | None => {
                debug!("client closed before sending a query");
                return;
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => {
                debug!(error = %err, "websocket error before query");
                return;
            }
        }
    };

    let agent = match state.agent_for_run() {
        Ok(agent) => agent,
        Err(err) => {
            send_event(
                &mut sender,
                &AgentEvent::Error {
                    message: format!("{:#}", anyhow::Error::from(err)),
                },
            )
            .await;
            let _ = sender.close().await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let run_task = tokio::spawn(async move {
        if let Err(err) = agent.run(&query, Some(&tx)).await {
            // Terminal events for successful runs come from the loop itself.
            let _ = tx.send(AgentEvent::Error {
                message: format!("{:#}", err),
            });
        }
    });

    // Forward events until a terminal one, watching for client disconnect.
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    let terminal =
                        matches!(event, AgentEvent::Final { .. } | AgentEvent::Error { .. });
                    if !send_event(&mut sender, &event).await {
                        run_task.abort();
                        break;
                    }
                    if terminal {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => {
                    debug!("client disconnected mid-run");
                    run_task.abort();
                    break;
                }
                Some(Err(_)) => {
                    run_task.abort();
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sender.close().await;
    info!("query stream client disconnected");
}

/// Push one event frame; returns false when the client is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &AgentEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(_) => true,
    }
}

fn parse_query_frame(text: &str) -> String {
    match serde_json::from_str::<QueryRequest>(text) {
        Ok(request) => request.query,
        Err(_) => text.to_string(),
    }
}
