#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use presence_api::config::Config;
use presence_api::directory::Fixtures;
use presence_api::AppState;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const ADMIN_TOKEN: &str = "pat_admin";
pub const STUDENT_TOKEN: &str = "pat_student";

/// Directory used by every test: a student, a teacher with a string id, and
/// an admin.
pub const FIXTURES: &str = r#"{
    "users": [
        {"id": 1, "name": "Ravi", "email": "ravi@x.com", "role": "student"},
        {"id": "t-2", "name": "Meera", "email": "meera@x.com", "role": "teacher"},
        {"id": 3, "name": "Asha", "email": "asha@x.com", "role": "admin"}
    ],
    "access_tokens": [
        {"token": "pat_admin", "user_id": 3},
        {"token": "pat_student", "user_id": 1}
    ]
}"#;

/// Build a test AppState from the shared fixtures.
pub async fn test_state() -> AppState {
    let fixtures = Fixtures::from_json(FIXTURES).expect("parse fixtures");
    AppState::from_fixtures(Config::default(), fixtures)
        .await
        .expect("build state")
}

/// Build the full application router wired to the test state.
pub async fn test_app() -> (Router, AppState) {
    let state = test_state().await;
    let app = presence_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background.
pub async fn start_ws_server() -> (SocketAddr, AppState) {
    let (app, state) = test_app().await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// Open a gateway connection without reading anything.
pub async fn connect(addr: SocketAddr) -> WsStream {
    let url = format!("ws://{addr}/gateway");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws
}

/// Open a gateway connection and consume its bootstrap envelope.
pub async fn connect_and_bootstrap(addr: SocketAddr) -> (WsStream, Value) {
    let mut ws = connect(addr).await;
    let bootstrap = next_json(&mut ws).await;
    assert_eq!(bootstrap["kind"], "activeUsers");
    (ws, bootstrap)
}

/// Read the next text frame as JSON, failing after 5 seconds.
pub async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("stream ended")
            .expect("ws read error");

        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("parse frame");
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("Expected text frame, got: {other:?}"),
        }
    }
}

pub async fn send_text(ws: &mut WsStream, text: &str) {
    ws.send(tungstenite::Message::Text(text.to_string().into()))
        .await
        .expect("send text");
}

pub async fn send_json(ws: &mut WsStream, value: &Value) {
    send_text(ws, &value.to_string()).await;
}

/// Poll until the registry holds `expected` connections.
pub async fn wait_for_connections(state: &AppState, expected: usize) {
    for _ in 0..100 {
        if state.connections.len() == expected {
            return;
        }
        time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {expected} connections, found {}",
        state.connections.len()
    );
}
