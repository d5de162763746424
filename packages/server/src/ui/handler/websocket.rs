//! WebSocket connection handlers.

use std::{future::Future, ops::ControlFlow, sync::Arc};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{Stream, StreamExt},
};
use serde::Deserialize;
use tokio::{
    sync::{mpsc, watch},
    time::{MissedTickBehavior, interval},
};

use crate::{
    domain::{ConnectionId, ServerEvent},
    infrastructure::dto::websocket::InboundEvent,
    ui::{
        dispatch::{HandlerContext, dispatch, rejection},
        state::AppState,
    },
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Picks the bearer token from the query string or the `Authorization` header.
fn bearer_token(query: ConnectQuery, headers: &HeaderMap) -> Option<String> {
    query.token.filter(|t| !t.is_empty()).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = bearer_token(query, &headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, token))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// Every outbound event for this connection (direct replies and room broadcasts)
/// goes through this channel, so replies keep the order in which they were pushed.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

/// Reads frames and hands them to `handle` one at a time.
///
/// 停止の合図は次のフレームを待つ間だけ受け付けるため、処理中のハンドラは最後まで実行されます。
async fn receive_loop<S, F, Fut>(mut receiver: S, mut stop: watch::Receiver<bool>, mut handle: F)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    F: FnMut(Message) -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    loop {
        let msg = tokio::select! {
            biased;
            _ = stop.changed() => break,
            msg = receiver.next() => msg,
        };
        let msg = match msg {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            None => break,
        };
        if handle(msg).await.is_break() {
            break;
        }
    }
}

async fn handle_message(state: &AppState, ctx: &HandlerContext, msg: Message) -> ControlFlow<()> {
    match msg {
        Message::Text(text) => {
            tracing::debug!("Received from '{}': {}", ctx.connection_id, text);
            let reply = match InboundEvent::parse(&text) {
                Ok(event) => dispatch(state, ctx, event).await,
                Err(e) => {
                    tracing::warn!("Rejected message from '{}': {}", ctx.connection_id, e);
                    Some(rejection(&e))
                }
            };
            if let Some(reply) = reply {
                reply_to(state, &ctx.connection_id, &reply).await;
            }
        }
        Message::Ping(_) => {
            tracing::debug!("Received ping");
            // Ping/pong is handled automatically by the WebSocket protocol
        }
        Message::Close(_) => {
            tracing::info!("Client '{}' requested close", ctx.connection_id);
            return ControlFlow::Break(());
        }
        _ => {}
    }
    ControlFlow::Continue(())
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, token: Option<String>) {
    let (sender, receiver) = socket.split();
    let connection_id = ConnectionId::generate();

    // Create a channel for this client to receive messages
    let (tx, rx) = mpsc::unbounded_channel();

    let connected = state
        .connect_client_usecase
        .execute(connection_id.clone(), token.as_deref(), tx)
        .await;
    let ctx = HandlerContext {
        connection_id: connection_id.clone(),
        user: connected.connection.authenticated_user(),
    };
    tracing::info!(
        "Client '{}' connected (authenticated: {}, registered: {})",
        connection_id,
        ctx.authenticated(),
        connected.registered
    );

    let state_clone = state.clone();
    let ctx_clone = ctx.clone();
    let (stop_tx, stop_rx) = watch::channel(false);

    // Handlers for one connection run one at a time, in receipt order
    let mut recv_task = tokio::spawn(receive_loop(receiver, stop_rx, move |msg| {
        let state = state_clone.clone();
        let ctx = ctx_clone.clone();
        async move { handle_message(&state, &ctx, msg).await }
    }));

    let mut send_task = pusher_loop(rx, sender);

    // 共有ストアのキーが期限切れにならないよう、接続中は定期的に延長する
    let refresh = state.refresh_presence_usecase.clone();
    let mut heartbeat = interval(refresh.interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 最初の tick はすぐに完了する
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = &mut recv_task => {
                send_task.abort();
                break;
            }
            _ = &mut send_task => {
                // 送信側が閉じたら受信ループを止め、処理中のハンドラの完了を待つ
                stop_tx.send_replace(true);
                if let Err(e) = (&mut recv_task).await {
                    tracing::error!("Receive loop of '{}' failed: {}", ctx.connection_id, e);
                }
                break;
            }
            _ = heartbeat.tick() => {
                refresh.execute(&connected.connection).await;
            }
        }
    }

    state
        .disconnect_client_usecase
        .execute(&ctx.connection_id)
        .await;
}

async fn reply_to(state: &AppState, connection_id: &ConnectionId, event: &ServerEvent) {
    if let Err(e) = state.message_pusher.push_to(connection_id, event).await {
        tracing::warn!("Failed to reply to '{}': {}", connection_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use futures_util::stream;

    fn text(body: &str) -> Result<Message, axum::Error> {
        Ok(Message::Text(body.to_string().into()))
    }

    #[test]
    fn test_token_from_query_or_header() {
        // テスト項目: トークンはクエリ、なければ Authorization ヘッダーから取得する
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));

        // when (操作):
        let from_query = bearer_token(
            ConnectQuery {
                token: Some("query-token".into()),
            },
            &headers,
        );
        let from_header = bearer_token(ConnectQuery { token: None }, &headers);
        let missing = bearer_token(ConnectQuery { token: None }, &HeaderMap::new());

        // then (期待する結果):
        assert_eq!(from_query.as_deref(), Some("query-token"));
        assert_eq!(from_header.as_deref(), Some("header-token"));
        assert_eq!(missing, None);
    }

    #[test]
    fn test_non_bearer_header_is_ignored() {
        // テスト項目: Bearer 以外の Authorization ヘッダーは無視する
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));

        // when (操作):
        let token = bearer_token(ConnectQuery { token: Some(String::new()) }, &headers);

        // then (期待する結果):
        assert_eq!(token, None);
    }

    #[tokio::test]
    async fn test_stop_lets_running_handler_finish() {
        // テスト項目: 処理中に停止を合図されてもハンドラは最後まで実行され、次のフレームは処理しない
        // given (前提条件):
        let frames = stream::iter(vec![text("first"), text("second")]);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handled = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = handled.clone();

        // when (操作):
        receive_loop(frames, stop_rx, move |msg| {
            let log = log.clone();
            // 1 件目の処理中に送信側が閉じた想定
            stop_tx.send_replace(true);
            async move {
                tokio::task::yield_now().await;
                if let Message::Text(body) = msg {
                    log.lock().unwrap().push(body.as_str().to_string());
                }
                ControlFlow::Continue(())
            }
        })
        .await;

        // then (期待する結果):
        assert_eq!(*handled.lock().unwrap(), vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn test_receive_loop_runs_until_close() {
        // テスト項目: 停止の合図が無ければ Close を受け取るまで順にフレームを処理する
        // given (前提条件):
        let frames = stream::iter(vec![
            text("first"),
            text("second"),
            Ok(Message::Close(None)),
            text("after-close"),
        ]);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let mut handled = Vec::new();

        // when (操作):
        receive_loop(frames, stop_rx, |msg| {
            let flow = match &msg {
                Message::Close(_) => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            };
            if let Message::Text(body) = msg {
                handled.push(body.as_str().to_string());
            }
            async move { flow }
        })
        .await;

        // then (期待する結果):
        assert_eq!(handled, vec!["first".to_string(), "second".to_string()]);
    }
}
