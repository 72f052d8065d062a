//! Deadline behavior of the ureq transport over real sockets.
//!
//! A listener that accepts connections and never answers stands in for a hung
//! server, so every attempt runs into the per-call timeout.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dispatch_core::{DispatchError, HttpMethod, PayloadType, RestClient, UreqTransport};

/// Accept connections forever and hold them open without replying.
fn start_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let mut held: Vec<TcpStream> = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    addr
}

#[test]
fn elapsed_timeout_fails_each_attempt_and_uses_retry_budget() {
    let addr = start_silent_server();
    let client = RestClient::new(Arc::new(UreqTransport::new()))
        .with_retry_delay(Duration::from_millis(10));

    let started = Instant::now();
    let err = client
        .execute_request(
            HttpMethod::Get,
            &format!("http://{addr}/v1/payments/1"),
            PayloadType::Json,
            None,
            &[],
            Duration::from_millis(200),
            1,
        )
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_retryable());
    match err {
        DispatchError::Transport { attempts, message } => {
            assert_eq!(attempts, 2);
            assert!(message.contains("timeout"), "unexpected message: {message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(elapsed >= Duration::from_millis(400), "took {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");
}

#[test]
fn zero_timeout_does_not_cut_a_normal_call_short() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        use std::io::{Read, Write};

        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                  content-length: 10\r\nconnection: close\r\n\r\n{\"id\":\"1\"}",
            )
            .unwrap();
    });

    let client = RestClient::new(Arc::new(UreqTransport::new()));
    let response = client
        .execute_request(
            HttpMethod::Get,
            &format!("http://{addr}/v1/payments/1"),
            PayloadType::Json,
            None,
            &[],
            Duration::ZERO,
            0,
        )
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.json_body.unwrap()["id"], "1");
}
