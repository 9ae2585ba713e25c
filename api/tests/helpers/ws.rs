use axum::Router;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns the Axum app on a random local port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

/// Connects to the chat gateway with a bearer token and consumes the
/// `ready` frame, so callers start from an admitted, subscribed socket.
pub async fn connect_ws(
    addr: &SocketAddr,
    token: &str,
) -> Result<WsClient, tokio_tungstenite::tungstenite::Error> {
    let url = format!("ws://{addr}/ws/chat?token={token}");
    let req = url.into_client_request()?;
    let (mut ws, _) = connect_async(req).await?;

    let frame = recv_text(&mut ws).await;
    assert_eq!(frame["type"], "ready", "expected ready frame, got {frame}");
    Ok(ws)
}

/// Next text frame as JSON, skipping WS-level pings. Panics after 2s.
pub async fn recv_text(ws: &mut WsClient) -> Value {
    use futures_util::StreamExt;

    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Next enveloped event (`type == "event"`), skipping everything else.
pub async fn recv_event(ws: &mut WsClient) -> Value {
    loop {
        let frame = recv_text(ws).await;
        if frame["type"] == "event" {
            return frame;
        }
    }
}

/// Asserts that no event arrives on this socket within `millis`.
pub async fn assert_silent(ws: &mut WsClient, millis: u64) {
    use futures_util::StreamExt;

    let res = tokio::time::timeout(Duration::from_millis(millis), ws.next()).await;
    match res {
        Err(_) => {}
        Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
        Ok(frame) => panic!("expected silence, got {frame:?}"),
    }
}
