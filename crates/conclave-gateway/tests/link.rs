//! Integration tests for the gateway link against an in-process WebSocket
//! server standing in for the review gateway.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use conclave_core::{ConclaveError, GatewayConfig};
use conclave_gateway::protocol::{ReviewRequestFrame, AGENT_ROSTER};
use conclave_gateway::GatewayLink;

type ServerWs = WebSocketStream<TcpStream>;

/// Bind a one-connection mock gateway and run `script` against it.
async fn spawn_gateway<F, Fut>(script: F) -> (GatewayConfig, JoinHandle<()>)
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        script(ws).await;
    });

    let config = GatewayConfig {
        url: format!("ws://{addr}/ws"),
        ..GatewayConfig::default()
    };
    (config, server)
}

/// Read frames until the review request arrives, returning its id.
async fn recv_request_id(ws: &mut ServerWs) -> String {
    loop {
        let message = ws
            .next()
            .await
            .expect("client closed before sending a request")
            .unwrap();
        if let Message::Text(text) = message {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["type"], "agent_judgement");
            assert_eq!(value["agents"].as_array().unwrap().len(), 3);
            return value["request_id"].as_str().unwrap().to_string();
        }
    }
}

fn agent_response(request_id: &str, agent_idx: usize, content: &str, completed: bool) -> Message {
    let mut value = serde_json::json!({
        "type": "agent_response",
        "request_id": request_id,
        "agent_id": AGENT_ROSTER[agent_idx].1,
        "content": content,
    });
    if completed {
        value["status"] = "completed".into();
    }
    Message::Text(value.to_string())
}

async fn wait_until_disconnected(link: &GatewayLink) {
    for _ in 0..100 {
        if !link.is_connected() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("link never noticed the disconnect");
}

#[tokio::test]
async fn collects_three_verdicts_and_resolves() {
    let (config, server) = spawn_gateway(|mut ws| async move {
        let id = recv_request_id(&mut ws).await;
        for (idx, content) in [(0usize, "POSITIVE"), (1, "POSITIVE"), (2, "NEGATIVE")] {
            ws.send(agent_response(&id, idx, content, true)).await.unwrap();
        }
        // Hold the connection open until the client is done.
        let _ = ws.next().await;
    })
    .await;

    let link = GatewayLink::connect(&config).await.unwrap();
    let request_id = "0b51b04c-26a4-43ea-926c-7c44cd1c36a9";
    let mut waiter = link.register(request_id).unwrap();
    let frame = ReviewRequestFrame::new(request_id, "fn main() {}".into());
    link.send_request(&frame).await.unwrap();

    let verdicts = waiter.recv().await.unwrap();
    assert_eq!(verdicts.len(), 3);
    assert_eq!(verdicts[0].agent, "melchior");
    assert_eq!(verdicts[2].agent, "casper");
    assert_eq!(link.pending(), 0);

    link.shutdown().await;
    server.abort();
}

#[tokio::test]
async fn streamed_chunks_concatenate_into_one_narrative() {
    let (config, server) = spawn_gateway(|mut ws| async move {
        let id = recv_request_id(&mut ws).await;
        ws.send(agent_response(&id, 0, "Reads cleanly, ", false))
            .await
            .unwrap();
        ws.send(agent_response(&id, 0, "ship it. POSITIVE", true))
            .await
            .unwrap();
        ws.send(agent_response(&id, 1, "POSITIVE", true)).await.unwrap();
        ws.send(agent_response(&id, 2, "POSITIVE", true)).await.unwrap();
        let _ = ws.next().await;
    })
    .await;

    let link = GatewayLink::connect(&config).await.unwrap();
    let request_id = "e9d1c0de-0000-4000-8000-000000000001";
    let mut waiter = link.register(request_id).unwrap();
    link.send_request(&ReviewRequestFrame::new(request_id, "code".into()))
        .await
        .unwrap();

    let verdicts = waiter.recv().await.unwrap();
    let melchior = verdicts.iter().find(|v| v.agent == "melchior").unwrap();
    assert_eq!(melchior.narrative, "Reads cleanly, ship it. POSITIVE");

    link.shutdown().await;
    server.abort();
}

#[tokio::test]
async fn mistagged_frames_do_not_disturb_a_pending_request() {
    let (config, server) = spawn_gateway(|mut ws| async move {
        let id = recv_request_id(&mut ws).await;
        // A response for a request nobody issued.
        ws.send(agent_response(
            "ffffffff-ffff-4fff-8fff-ffffffffffff",
            0,
            "NEGATIVE",
            true,
        ))
        .await
        .unwrap();
        // The real verdicts still flow.
        for idx in 0..3 {
            ws.send(agent_response(&id, idx, "POSITIVE", true)).await.unwrap();
        }
        let _ = ws.next().await;
    })
    .await;

    let link = GatewayLink::connect(&config).await.unwrap();
    let request_id = "e9d1c0de-0000-4000-8000-000000000002";
    let mut waiter = link.register(request_id).unwrap();
    link.send_request(&ReviewRequestFrame::new(request_id, "code".into()))
        .await
        .unwrap();

    let verdicts = waiter.recv().await.unwrap();
    assert_eq!(verdicts.len(), 3);
    assert!(verdicts.iter().all(|v| v.agent != "ghost"));

    link.shutdown().await;
    server.abort();
}

#[tokio::test]
async fn connection_drop_fails_all_pending_requests() {
    let (config, server) = spawn_gateway(|mut ws| async move {
        let id = recv_request_id(&mut ws).await;
        ws.send(agent_response(&id, 0, "POSITIVE", true)).await.unwrap();
        // Drop the connection with two verdicts outstanding.
    })
    .await;

    let link = GatewayLink::connect(&config).await.unwrap();
    let request_id = "e9d1c0de-0000-4000-8000-000000000003";
    let mut waiter = link.register(request_id).unwrap();
    link.send_request(&ReviewRequestFrame::new(request_id, "code".into()))
        .await
        .unwrap();

    let err = waiter.recv().await.unwrap_err();
    assert!(matches!(err, ConclaveError::ConnectionLost));
    assert_eq!(link.pending(), 0);

    server.await.unwrap();
}

#[tokio::test]
async fn send_fails_once_the_link_is_down() {
    let (config, server) = spawn_gateway(|mut ws| async move {
        // Close immediately after the handshake.
        let _ = ws.close(None).await;
    })
    .await;

    let link = GatewayLink::connect(&config).await.unwrap();
    wait_until_disconnected(&link).await;

    let err = link
        .send_request(&ReviewRequestFrame::new(
            "e9d1c0de-0000-4000-8000-000000000004",
            "code".into(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ConclaveError::Send(_)));

    server.await.unwrap();
}

#[tokio::test]
async fn concurrent_registration_of_one_id_is_rejected() {
    let (config, server) = spawn_gateway(|mut ws| async move {
        let _ = ws.next().await;
    })
    .await;

    let link = GatewayLink::connect(&config).await.unwrap();
    let request_id = "e9d1c0de-0000-4000-8000-000000000005";
    let _waiter = link.register(request_id).unwrap();
    let err = link.register(request_id).unwrap_err();
    assert!(matches!(err, ConclaveError::DuplicateId(_)));

    link.shutdown().await;
    server.abort();
}

#[tokio::test]
async fn connect_to_a_dead_endpoint_is_a_connection_error() {
    // Bind-then-drop to get a port with no listener behind it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = GatewayConfig {
        url: format!("ws://{addr}/ws"),
        ..GatewayConfig::default()
    };
    let err = GatewayLink::connect(&config).await.unwrap_err();
    assert!(matches!(err, ConclaveError::Connection(_)));
}
