//! Tests for the WebSocket handler.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::notifier::{TeamUpdate, UpdateMessage};
use super::test_helpers::{TestApp, test_app};
use super::websocket::frame_for;

/// Serve the test app on an ephemeral port.
async fn serve(app: &TestApp) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Send a raw handshake and return the response status line.
async fn handshake(addr: &str, query: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /ws?{} HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\r\n",
        query, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await.unwrap();
    let head = String::from_utf8_lossy(&buf[..n]).to_string();
    head.lines().next().unwrap_or_default().to_string()
}

#[test]
fn only_frames_for_the_subscribed_team() {
    let update = TeamUpdate {
        team_id: "team0001".to_string(),
        message: UpdateMessage::DocumentUpdated {
            document_id: "doc00001".to_string(),
            version: 4,
        },
    };

    let frame = frame_for("team0001", &update).unwrap();
    let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(json["type"], "DocumentUpdated");
    assert_eq!(json["data"]["document_id"], "doc00001");
    assert_eq!(json["data"]["version"], 4);

    assert!(frame_for("team0002", &update).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn handshake_requires_valid_session_and_membership() {
    let app = test_app().await;
    let (token, _, team) = app.owner_with_team().await;
    let (stranger, _) = app.register("eve@example.com", "Eve").await;
    let addr = serve(&app).await;

    let status = handshake(&addr, &format!("token={}&team_id={}", token, team)).await;
    assert!(status.contains("101"), "got {}", status);

    let status = handshake(&addr, &format!("token=bogus&team_id={}", team)).await;
    assert!(status.contains("401"), "got {}", status);

    let status = handshake(&addr, &format!("token={}&team_id={}", stranger, team)).await;
    assert!(status.contains("403"), "got {}", status);

    let status = handshake(&addr, "team_id=whatever").await;
    assert!(status.contains("400"), "got {}", status);
}
