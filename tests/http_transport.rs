use mapineq_rs::transport::{HttpTransport, Transport};
use mapineq_rs::{ClientConfig, Error};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

/// Serve one canned HTTP response on localhost; returns the URL and the raw request.
fn serve_once(status_line: &str, body: &str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        tx.send(String::from_utf8_lossy(&buf).into_owned()).ok();
    });
    (format!("http://{addr}/fn.get_levels/items.json"), rx)
}

fn transport() -> HttpTransport {
    HttpTransport::new(&ClientConfig::default()).unwrap()
}

#[test]
fn success_returns_json_and_sends_headers() {
    let (url, rx) = serve_once("200 OK", r#"[{"f_level":"2"}]"#);
    let v = transport().get_json(&url).unwrap();
    assert_eq!(v[0]["f_level"], "2");

    let request = rx.recv().unwrap().to_ascii_lowercase();
    assert!(request.starts_with("get /fn.get_levels/items.json"));
    assert!(request.contains("content-type: application/json"));
    assert!(request.contains("user-agent: mapineq_rs/"));
}

#[test]
fn server_error_is_a_transport_error() {
    let (url, _rx) = serve_once("500 Internal Server Error", "");
    match transport().get_json(&url) {
        Err(Error::Transport { status, .. }) => assert_eq!(status, Some(500)),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn non_json_body_is_a_format_error() {
    let (url, _rx) = serve_once("200 OK", "<html>maintenance</html>");
    assert!(matches!(
        transport().get_json(&url),
        Err(Error::Format { .. })
    ));
}

#[test]
fn unreachable_host_is_a_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("http://127.0.0.1:{port}/fn.get_levels/items.json");
    assert!(matches!(
        transport().get_json(&url),
        Err(Error::Transport { .. })
    ));
}
