//! WebSocket upgrade, hand-off and shutdown, end to end.

use std::time::Duration;

use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest, http::HeaderValue, Error as WsError, Message,
};

use elos_stack::hub::Frame;
use elos_stack::lifecycle::LoopState;

mod common;

use common::TestStack;

fn upgrade_request(
    url: &str,
    protocol: &str,
) -> tokio_tungstenite::tungstenite::handshake::client::Request {
    let mut request = url.into_client_request().unwrap();
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_str(protocol).unwrap(),
    );
    request
}

#[tokio::test]
async fn authenticated_upgrade_reaches_the_hub() {
    let mut stack = TestStack::start().await;
    let caller = stack.user("Sandy Sandbox");

    let request = upgrade_request(&stack.ws_url("/v1/authenticate"), &caller.header_value());
    let (mut socket, response) = tokio_tungstenite::connect_async(request).await.unwrap();
    assert_eq!(
        response.headers()["sec-websocket-protocol"],
        caller.header_value().as_str()
    );

    let mut session = stack.next_session().await;
    assert_eq!(session.identity().id, caller.id);

    socket.send(Message::Text("hello".into())).await.unwrap();
    let frame = tokio::time::timeout(Duration::from_secs(5), session.connection().next_frame())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(frame, Frame::Text("hello".to_string()));

    stack.stop().await.unwrap();
}

#[tokio::test]
async fn sessions_arrive_in_submission_order() {
    let mut stack = TestStack::start().await;
    let first = stack.user("First");
    let second = stack.user("Second");

    let url = stack.ws_url("/v1/authenticate");
    let (_a, _) = tokio_tungstenite::connect_async(upgrade_request(&url, &first.header_value()))
        .await
        .unwrap();
    let s1 = stack.next_session().await;
    let (_b, _) = tokio_tungstenite::connect_async(upgrade_request(&url, &second.header_value()))
        .await
        .unwrap();
    let s2 = stack.next_session().await;

    assert_eq!(s1.identity().id, first.id);
    assert_eq!(s2.identity().id, second.id);

    stack.stop().await.unwrap();
}

#[tokio::test]
async fn bad_credentials_fail_the_handshake() {
    let mut stack = TestStack::start().await;
    let caller = stack.user("Sandy Sandbox");

    let request = upgrade_request(
        &stack.ws_url("/v1/authenticate"),
        &format!("{}-wrongkey", caller.id),
    );
    match tokio_tungstenite::connect_async(request).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(e) => panic!("expected an HTTP 401 handshake failure, got {e}"),
        Ok(_) => panic!("handshake should not succeed"),
    }
    assert!(stack.sessions.try_recv().is_err());

    stack.stop().await.unwrap();
}

#[tokio::test]
async fn shutdown_stops_the_loop_and_the_listener() {
    let stack = TestStack::start().await;
    let addr = stack.addr;
    let state = stack.state.clone();
    assert_eq!(state.get(), LoopState::Running);

    stack.shutdown.trigger();
    stack.stop().await.unwrap();

    assert_eq!(state.get(), LoopState::Stopped);
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
