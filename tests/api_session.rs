use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use calltree::api::server;

fn send(stream: &mut TcpStream, reader: &mut BufReader<TcpStream>, cmd: &str) -> String {
    stream.write_all(cmd.as_bytes()).unwrap();
    stream.write_all(b"\n").unwrap();
    let mut response = String::new();
    reader.read_line(&mut response).unwrap();
    response
}

#[test]
fn test_session_protocol() {
    let port = 4641;
    thread::spawn(move || {
        if let Err(e) = server::start_server(port) {
            eprintln!("Server failed: {}", e);
        }
    });
    thread::sleep(Duration::from_millis(500));

    let mut stream =
        TcpStream::connect(format!("127.0.0.1:{}", port)).expect("Failed to connect to server");
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    // Protocol sanity
    let response = send(&mut stream, &mut reader, r#"{"command": "PING"}"#);
    assert!(response.contains("PONG"));
    assert!(response.contains("success"));

    // Commands that need a snapshot fail cleanly before LOAD
    let response = send(
        &mut stream,
        &mut reader,
        r#"{"command": "FOCUS", "params": {"function": "main"}}"#,
    );
    assert!(response.contains("error"));
    assert!(response.contains("No snapshot loaded"));

    // LOAD with a bogus path reports the path, not a panic
    let response = send(
        &mut stream,
        &mut reader,
        r#"{"command": "LOAD", "params": {"path": "/invalid/path/snap.json"}}"#,
    );
    assert!(response.contains("error"));
    assert!(response.contains("Snapshot path not found"));

    // Real session: load a snapshot from disk, focus, click
    let dir = tempfile::tempdir().unwrap();
    let snap_path = dir.path().join("snap.json");
    std::fs::write(
        &snap_path,
        r#"{
            "functions": [
                {"name": "main", "start": 4096, "call_sites": [
                    {"address": 4100, "expr": {"op": "direct", "target": 8192}}
                ]},
                {"name": "init", "start": 8192}
            ]
        }"#,
    )
    .unwrap();

    let response = send(
        &mut stream,
        &mut reader,
        &format!(
            r#"{{"command": "LOAD", "params": {{"path": "{}"}}}}"#,
            snap_path.display()
        ),
    );
    assert!(response.contains("success"));
    assert!(response.contains("\"functions\":2"));

    let response = send(
        &mut stream,
        &mut reader,
        r#"{"command": "FOCUS", "params": {"function": "main"}}"#,
    );
    assert!(response.contains("success"));
    assert!(response.contains("\"outgoing\""));
    assert!(response.contains("init"));

    // Clicking init in the outgoing view resolves the call site at 4100
    let response = send(
        &mut stream,
        &mut reader,
        r#"{"command": "CLICK", "params": {"direction": "out", "path": [0]}}"#,
    );
    assert!(response.contains("success"));
    assert!(response.contains("4100"));

    // The click raised the outgoing view's skip-refresh flag: the next
    // FOCUS rebuilds only the incoming view and leaves the outgoing tree
    // as walked from main.
    let response = send(
        &mut stream,
        &mut reader,
        r#"{"command": "FOCUS", "params": {"function": "init"}}"#,
    );
    assert!(response.contains("success"));
    assert!(response.contains("\"label\":\"main\""), "incoming rebuilt for init");
    assert!(
        response.contains("\"label\":\"init\""),
        "outgoing kept the pre-navigation tree"
    );

    // The flag is consumed by that skip; repeating the focus rebuilds the
    // outgoing view too, and init calls nothing.
    let response = send(
        &mut stream,
        &mut reader,
        r#"{"command": "FOCUS", "params": {"function": "init"}}"#,
    );
    assert!(response.contains("\"outgoing\":[]"));
    assert!(response.contains("\"label\":\"main\""));
    assert!(!response.contains("\"label\":\"init\""));

    // Unknown commands are rejected, connection stays alive
    let response = send(&mut stream, &mut reader, r#"{"command": "FROBNICATE"}"#);
    assert!(response.contains("error"));
    let response = send(&mut stream, &mut reader, r#"{"command": "PING"}"#);
    assert!(response.contains("PONG"));

    // Not sending SHUTDOWN here: it exits the whole test process. Dropping
    // the connection ends the session instead.
}
