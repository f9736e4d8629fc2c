// Shared primitives for one-time server bootstrapping across integration
// tests, plus websocket helpers. Every test in a binary talks to the same
// server process, so client names must be unique per test.
#![allow(dead_code)]

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                parapet_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

/// Opens a websocket against the server's `/ws` endpoint.
pub async fn ws_connect(base_url: &str) -> WsClient {
    let ws_url = format!("{}/ws", base_url.replace("http://", "ws://"));
    let (socket, _response) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .expect("websocket connect");
    socket
}

pub async fn send_json(socket: &mut WsClient, value: Value) {
    socket
        .send(Message::Text(value.to_string()))
        .await
        .expect("send websocket message");
}

/// Next text frame parsed as JSON. Ping and pong frames are skipped; a
/// close or a dropped socket fails the test.
pub async fn recv_json(socket: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("websocket frame within timeout")
            .expect("websocket still open")
            .expect("websocket read");
        match frame {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("frame should be valid json");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected websocket frame: {other:?}"),
        }
    }
}

/// Reads frames until `accept` matches one. Registered sockets receive
/// every broadcast in the shared server, so assertions must filter rather
/// than assume ordering; `limit` bounds the search.
pub async fn recv_until(
    socket: &mut WsClient,
    limit: usize,
    mut accept: impl FnMut(&Value) -> bool,
) -> Value {
    for _ in 0..limit {
        let frame = recv_json(socket).await;
        if accept(&frame) {
            return frame;
        }
    }
    panic!("no frame matched within {limit} messages");
}

/// Waits for the server to finish closing the socket, tolerating the close
/// frame and any interleaved frames already in flight.
pub async fn expect_closed(socket: &mut WsClient) {
    for _ in 0..200 {
        match tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("close within timeout")
        {
            None => return,
            Some(Ok(Message::Close(_))) => continue,
            Some(Ok(_)) => continue,
            Some(Err(_)) => return,
        }
    }
    panic!("socket did not close");
}

/// Like [`expect_closed`], and also asserts the close frame carries the
/// given reason.
pub async fn expect_close_reason(socket: &mut WsClient, reason: &str) {
    for _ in 0..200 {
        match tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("close within timeout")
        {
            Some(Ok(Message::Close(frame))) => {
                let frame = frame.expect("close frame should carry a reason");
                assert_eq!(frame.reason, reason);
                return;
            }
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => panic!("socket closed without the expected close frame"),
        }
    }
    panic!("socket did not close");
}

/// A name unique across the shared server process that fits the sixteen
/// character limit. Prefixes must stay short enough for the suffix.
pub fn unique_name(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let name = format!("{prefix}-{}", &suffix[..7]);
    assert!(name.chars().count() <= 16, "test name too long: {name}");
    name
}

/// Connects and registers a fresh client, returning the socket and the
/// assigned client id. The `connRes` is always the first frame on a new
/// socket because broadcast forwarding starts only after admission.
pub async fn connect_and_register(base_url: &str, name: &str) -> (WsClient, String) {
    let mut socket = ws_connect(base_url).await;
    send_json(
        &mut socket,
        serde_json::json!({ "type": "conn", "data": { "clientName": name } }),
    )
    .await;
    let res = recv_json(&mut socket).await;
    assert_eq!(res["type"], "connRes", "expected connRes, got {res}");
    assert_eq!(res["data"]["status"], "allowed", "admission refused: {res}");
    assert_eq!(res["data"]["nameTag"], name);
    let client_id = res["data"]["clientID"]
        .as_str()
        .expect("allowed connRes should carry a client id")
        .to_string();
    (socket, client_id)
}

/// Scans a `scene` frame for a player load owned by `client_id`, returning
/// the prop id key when present.
pub fn find_avatar_load(frame: &Value, client_id: &str) -> Option<String> {
    if frame["type"] != "scene" {
        return None;
    }
    let load = frame["data"].get("load")?.as_object()?;
    for (prop_id, snapshot) in load {
        if snapshot["kind"] == "player"
            && snapshot["behaviours"]["controlled"]["clientID"] == client_id
        {
            return Some(prop_id.clone());
        }
    }
    None
}
