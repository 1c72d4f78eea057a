use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use stata_ai_core::*;

// ========================================================================
// One-shot local HTTP server
// ========================================================================

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&data) {
            let headers = String::from_utf8_lossy(&data[..end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

/// Serve exactly one response, returning the base URL and a handle yielding the raw request.
fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();
    let body = body.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        request
    });

    (format!("http://{}/v1", addr), handle)
}

fn config_for(base_url: &str) -> AiConfig {
    let mut config = AiConfig::at("unused/config.json");
    config.api_key = "sk-test".to_string();
    config.base_url = base_url.to_string();
    config.timeout = 5;
    config
}

fn sample_messages() -> Vec<Message> {
    vec![Message::system("You help with Stata."), Message::user("1+1等于几?")]
}

// ========================================================================
// Tests
// ========================================================================

#[test]
fn test_chat_success_returns_decoded_body() {
    let reply = r#"{"id":"cmpl-1","choices":[{"message":{"role":"assistant","content":"2"}}]}"#;
    let (base_url, server) = serve_once("200 OK", reply);

    let completion = HttpChatClient::new()
        .chat(&config_for(&base_url), &sample_messages())
        .unwrap();

    assert_eq!(completion.body()["id"], "cmpl-1");
    assert_eq!(completion.first_reply().unwrap().as_deref(), Some("2"));
    server.join().unwrap();
}

#[test]
fn test_chat_sends_expected_request() {
    let (base_url, server) = serve_once("200 OK", r#"{"choices":[]}"#);
    let mut config = config_for(&base_url);
    config.model = "deepseek-chat".to_string();
    config.max_tokens = 512;
    config.temperature = 0.3;

    HttpChatClient::new()
        .chat(&config, &sample_messages())
        .unwrap();

    let request = server.join().unwrap();
    let head_end = request.find("\r\n\r\n").unwrap();
    let (head, body) = (&request[..head_end], &request[head_end + 4..]);

    assert!(head.starts_with("POST /v1/chat/completions HTTP/1.1"));
    assert!(head.to_lowercase().contains("authorization: bearer sk-test"));
    assert!(head.to_lowercase().contains("content-type: application/json"));

    let body: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["temperature"], 0.3);
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "1+1等于几?");
}

#[test]
fn test_chat_api_error_uses_json_message() {
    let (base_url, server) = serve_once(
        "401 Unauthorized",
        r#"{"error":{"message":"invalid api key","type":"invalid_request_error"}}"#,
    );

    let err = HttpChatClient::new()
        .chat(&config_for(&base_url), &sample_messages())
        .unwrap_err();

    match err {
        AiError::Api { status, ref message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid api key");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(err.to_string(), "API error (401): invalid api key");
    server.join().unwrap();
}

#[test]
fn test_chat_api_error_falls_back_to_raw_body() {
    let (base_url, server) = serve_once("502 Bad Gateway", "upstream unavailable");

    let err = HttpChatClient::new()
        .chat(&config_for(&base_url), &sample_messages())
        .unwrap_err();

    assert!(matches!(
        err,
        AiError::Api { status: 502, ref message } if message == "upstream unavailable"
    ));
    server.join().unwrap();
}

#[test]
fn test_chat_undecodable_success_body_is_request_error() {
    let (base_url, server) = serve_once("200 OK", "<html>captive portal</html>");

    let err = HttpChatClient::new()
        .chat(&config_for(&base_url), &sample_messages())
        .unwrap_err();

    assert!(matches!(err, AiError::Request(_)));
    server.join().unwrap();
}

#[test]
fn test_chat_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpChatClient::new()
        .chat(&config_for(&format!("http://{}/v1", addr)), &sample_messages())
        .unwrap_err();

    assert!(matches!(err, AiError::Network(_)), "got {err:?}");
    assert!(err.to_string().starts_with("Network error: "));
}

#[test]
fn test_chat_timeout_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        thread::sleep(Duration::from_secs(3));
    });

    let mut config = config_for(&format!("http://{}/v1", addr));
    config.timeout = 1;
    let err = HttpChatClient::new()
        .chat(&config, &sample_messages())
        .unwrap_err();

    assert!(matches!(err, AiError::Network(_)), "got {err:?}");
    server.join().unwrap();
}

#[test]
fn test_one_client_applies_each_calls_timeout() {
    let client = HttpChatClient::new();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let slow = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        thread::sleep(Duration::from_secs(3));
    });
    let mut impatient = config_for(&format!("http://{}/v1", addr));
    impatient.timeout = 1;
    let err = client.chat(&impatient, &sample_messages()).unwrap_err();
    assert!(matches!(err, AiError::Network(_)), "got {err:?}");
    slow.join().unwrap();

    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"2"}}]}"#,
    );
    let completion = client
        .chat(&config_for(&base_url), &sample_messages())
        .unwrap();
    assert_eq!(completion.first_reply().unwrap().as_deref(), Some("2"));
    server.join().unwrap();
}
