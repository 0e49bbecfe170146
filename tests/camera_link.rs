//! Integration tests for the camera link over a loopback TCP server.
//!
//! A fake camera pushes length-prefixed frames and the tests verify delivery,
//! the freshness-over-completeness slot policy, invalid-length skipping, and
//! fault/shutdown behavior.

use std::time::Duration;

use mycoscope::{CameraConfig, CameraLink, ConnectionState};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

fn config_for(port: u16) -> CameraConfig {
    CameraConfig {
        host: "127.0.0.1".to_string(),
        port,
        recv_timeout: Duration::from_millis(500),
        ..CameraConfig::default()
    }
}

async fn fake_camera() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

async fn send_frame(socket: &mut TcpStream, payload: &[u8]) {
    let len = (payload.len() as u32).to_be_bytes();
    socket.write_all(&len).await.expect("length written");
    socket.write_all(payload).await.expect("payload written");
    socket.flush().await.expect("flushed");
}

/// Poll the slot until a frame appears or the deadline passes.
async fn take_frame_within(link: &CameraLink, deadline: Duration) -> Option<mycoscope::Frame> {
    tokio::time::timeout(deadline, async {
        loop {
            if let Some(frame) = link.take_latest_frame() {
                return frame;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .ok()
}

#[tokio::test]
async fn frame_round_trips_and_is_delivered_once() {
    let _ = tracing_subscriber::fmt::try_init();
    let (listener, port) = fake_camera().await;

    let payload = vec![0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9];
    let sent = payload.clone();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        send_frame(&mut socket, &sent).await;
        // Keep the connection open so the link does not fault mid-test.
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let link = CameraLink::connect(config_for(port)).await.expect("connect");
    assert_eq!(link.state(), ConnectionState::Connected);

    let frame = take_frame_within(&link, Duration::from_secs(1)).await.expect("frame delivered");
    assert_eq!(frame.bytes(), payload.as_slice());

    // Delivered exactly once.
    assert!(link.take_latest_frame().is_none());

    link.close();
    server.abort();
}

#[tokio::test]
async fn second_frame_replaces_an_unconsumed_first() {
    let (listener, port) = fake_camera().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        send_frame(&mut socket, &[1, 1, 1]).await;
        send_frame(&mut socket, &[2, 2, 2]).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let link = CameraLink::connect(config_for(port)).await.expect("connect");

    // Give the receiver time to push both frames through the slot.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let frame = link.take_latest_frame().expect("a frame is buffered");
    assert_eq!(frame.bytes(), &[2, 2, 2], "freshest frame wins");
    assert!(link.take_latest_frame().is_none());

    link.close();
    server.abort();
}

#[tokio::test]
async fn invalid_lengths_are_skipped_without_terminating_the_loop() {
    let (listener, port) = fake_camera().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        // Zero length: skipped.
        socket.write_all(&0u32.to_be_bytes()).await.expect("zero length written");
        // Oversized length: skipped; the loop reads the next 4 bytes as a length.
        socket.write_all(&2_000_001u32.to_be_bytes()).await.expect("oversize length written");
        // A well-formed frame must still get through.
        send_frame(&mut socket, &[7, 7]).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let link = CameraLink::connect(config_for(port)).await.expect("connect");

    let frame = take_frame_within(&link, Duration::from_secs(1)).await.expect("frame delivered");
    assert_eq!(frame.bytes(), &[7, 7]);
    assert_eq!(link.state(), ConnectionState::Connected);

    link.close();
    server.abort();
}

#[tokio::test]
async fn peer_close_faults_the_link_without_auto_reconnect() {
    let (listener, port) = fake_camera().await;

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        drop(socket);
    });

    let link = CameraLink::connect(config_for(port)).await.expect("connect");

    let mut states = link.state_updates();
    let faulted = tokio::time::timeout(Duration::from_secs(2), async {
        use futures::StreamExt;
        while let Some(state) = states.next().await {
            if state == ConnectionState::Faulted {
                return true;
            }
        }
        false
    })
    .await
    .expect("fault observed in time");
    assert!(faulted);

    server.await.expect("server done");
}

#[tokio::test]
async fn silent_camera_faults_after_the_receive_timeout() {
    let (listener, port) = fake_camera().await;

    let server = tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.expect("accept");
        // Hold the connection open but never write.
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let link = CameraLink::connect(config_for(port)).await.expect("connect");

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(link.state(), ConnectionState::Faulted);

    server.abort();
}

#[tokio::test]
async fn close_is_idempotent_and_stops_the_loop_promptly() {
    let (listener, port) = fake_camera().await;

    let server = tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.expect("accept");
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let link = CameraLink::connect(config_for(port)).await.expect("connect");
    link.close();
    link.close();

    let mut states = link.state_updates();
    let disconnected = tokio::time::timeout(Duration::from_secs(1), async {
        use futures::StreamExt;
        while let Some(state) = states.next().await {
            if state == ConnectionState::Disconnected {
                return true;
            }
        }
        false
    })
    .await
    .expect("shutdown observed well before the receive timeout");
    assert!(disconnected);

    server.abort();
}

#[tokio::test]
async fn failed_connect_surfaces_an_error() {
    // Bind then drop to get a port with nothing listening.
    let (listener, port) = fake_camera().await;
    drop(listener);

    let result = CameraLink::connect(config_for(port)).await;
    assert!(result.is_err());
}
