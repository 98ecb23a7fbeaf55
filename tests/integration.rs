//! End-to-end behavior of the HTTP client and assertion engine against a
//! local mock server.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use serde_json::json;

use gatecheck::{ApiClient, Config, Error, HttpMethod, RequestBody, RequestSpec, verify};

fn client_for(base_url: &str, extra: serde_json::Value) -> ApiClient {
    let mut tree = json!({ "api": { "base_url": base_url, "timeout": 10 } });
    if let Some(api) = extra.as_object() {
        for (key, value) in api {
            tree["api"][key] = value.clone();
        }
    }
    ApiClient::from_config(&Config::from_value("qa", tree)).unwrap()
}

#[test]
fn happy_path_get_with_assertion_chain() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/devices")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"devices":[{"id":"d1"}]}"#)
        .create();

    let client = client_for(&server.url(), json!({}));
    let response = client.get("v1/devices").unwrap();

    verify(&response)
        .status_is(200)
        .unwrap()
        .content_type_is("json")
        .unwrap()
        .json_has_key("devices")
        .unwrap()
        .json_list_len("devices", 1)
        .unwrap()
        .json_list_non_empty("devices")
        .unwrap()
        .json_path_equals("devices.0.id", &json!("d1"))
        .unwrap();
}

#[test]
fn url_templating_resolves_path_params() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v1/reminder/abc")
        .with_status(200)
        .with_body("{}")
        .create();

    let client = client_for(&server.url(), json!({}));
    let spec = RequestSpec::new(HttpMethod::Get, "v1/reminder/{reminderId}")
        .path_param("reminderId", "abc");
    let response = client.request(&spec).unwrap();

    assert_eq!(response.status(), 200);
    mock.assert();
}

#[test]
fn missing_placeholder_fails_before_sending() {
    let client = client_for("https://h", json!({}));
    let spec = RequestSpec::new(HttpMethod::Get, "v1/reminder/{reminderId}");
    match client.request(&spec).unwrap_err() {
        Error::UrlTemplate { placeholder, .. } => assert_eq!(placeholder, "reminderId"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_2xx_is_data_not_an_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/orders/o-1")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"not found"}"#)
        .create();

    let client = client_for(&server.url(), json!({}));
    let response = client.get("v1/orders/o-1").unwrap();
    assert_eq!(response.status(), 404);
    assert!(!response.ok());
    assert!(verify(&response).ok().is_err());
}

#[test]
fn query_params_are_sent_in_order() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v1/orders?status=created&page=2")
        .with_status(200)
        .with_body("{}")
        .create();

    let client = client_for(&server.url(), json!({}));
    let spec = RequestSpec::new(HttpMethod::Get, "v1/orders")
        .query("status", "created")
        .query("page", "2");
    client.request(&spec).unwrap();
    mock.assert();
}

#[test]
fn empty_post_body_sends_no_body() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1/ping")
        .match_body(mockito::Matcher::Exact(String::new()))
        .with_status(204)
        .create();

    let client = client_for(&server.url(), json!({}));
    let response = client.post("v1/ping", RequestBody::Empty).unwrap();
    assert_eq!(response.status(), 204);
    mock.assert();
}

#[test]
fn wire_carries_secrets_while_logs_mask_them() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1/auth/login")
        .match_header("authorization", "Bearer secret")
        .match_body(mockito::Matcher::Json(json!({"password": "pw"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessToken":"abc"}"#)
        .create();

    let captured: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || LogSink(sink.clone()))
        .finish();

    let client = client_for(&server.url(), json!({}));
    let spec = RequestSpec::new(HttpMethod::Post, "v1/auth/login")
        .header("Authorization", "Bearer secret")
        .json(json!({"password": "pw"}));

    let response =
        tracing::subscriber::with_default(subscriber, || client.request(&spec).unwrap());
    assert_eq!(response.status(), 200);
    mock.assert();

    let logs = String::from_utf8(captured.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("***MASKED***"));
    assert!(!logs.contains("secret"));
    assert!(!logs.contains("\"pw\""));
}

struct LogSink(Arc<Mutex<Vec<u8>>>);

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Minimal one-shot responder for status sequences mockito cannot express:
/// each connection consumes the next canned status, then the socket closes.
fn sequential_server(statuses: Vec<(u16, &'static str, &'static str)>) -> (String, thread::JoinHandle<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut served = 0;
        for (status, reason, body) in statuses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let mut request = Vec::new();
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let payload = format!(
                "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(payload.as_bytes()).unwrap();
            served += 1;
        }
        served
    });
    (format!("http://{addr}"), handle)
}

#[test]
fn transient_statuses_retry_until_success() {
    let (url, handle) = sequential_server(vec![
        (503, "Service Unavailable", "{}"),
        (503, "Service Unavailable", "{}"),
        (200, "OK", r#"{"accessToken":"abc"}"#),
    ]);

    let client = client_for(&url, json!({ "retry_count": 3, "retry_delay": 1 }));
    let started = Instant::now();
    let response = client
        .post("v1/auth/token", RequestBody::Empty)
        .unwrap();

    // three attempts served, backoff 1s + 2s observed
    assert_eq!(handle.join().unwrap(), 3);
    assert!(started.elapsed().as_secs_f64() >= 3.0);
    assert!(response.elapsed().as_secs_f64() >= 3.0);

    verify(&response)
        .status_is(200)
        .unwrap()
        .json_equals("accessToken", &json!("abc"))
        .unwrap();
}

#[test]
fn retry_budget_of_one_means_single_attempt() {
    let (url, handle) = sequential_server(vec![(503, "Service Unavailable", "{}")]);

    let client = client_for(&url, json!({ "retry_count": 1, "retry_delay": 1 }));
    let response = client.get("v1/devices").unwrap();

    assert_eq!(response.status(), 503);
    assert_eq!(handle.join().unwrap(), 1);
}

#[test]
fn exhausted_retryable_statuses_return_the_last_response() {
    let (url, handle) = sequential_server(vec![
        (503, "Service Unavailable", "{}"),
        (502, "Bad Gateway", r#"{"error":"upstream"}"#),
    ]);

    let client = client_for(&url, json!({ "retry_count": 2, "retry_delay": 0.05 }));
    let response = client.get("v1/devices").unwrap();

    assert_eq!(response.status(), 502);
    assert_eq!(handle.join().unwrap(), 2);
    verify(&response)
        .json_equals("error", &json!("upstream"))
        .unwrap();
}

#[test]
fn connection_failure_reports_final_attempt_count() {
    // nothing listens on this port
    let client = client_for(
        "http://127.0.0.1:1",
        json!({ "retry_count": 2, "retry_delay": 0.05 }),
    );
    match client.get("v1/devices").unwrap_err() {
        Error::TransportConnection { attempts, method, .. } => {
            assert_eq!(attempts, 2);
            assert_eq!(method, HttpMethod::Get);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn closed_client_is_a_programming_error() {
    let mut client = client_for("https://h", json!({}));
    client.close();
    assert!(matches!(client.get("v1/devices"), Err(Error::ClientClosed)));
}

#[test]
fn schema_validation_end_to_end() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v1/orders/o-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"orderId":"x","status":"created"}"#)
        .create();

    let client = client_for(&server.url(), json!({}));
    let response = client.get("v1/orders/o-1").unwrap();

    let schema = json!({
        "type": "object",
        "required": ["orderId", "status", "requestPayId"]
    });
    let failure = verify(&response).matches_schema(&schema).unwrap_err();
    assert!(failure.to_string().contains("requestPayId"));
}
