use std::time::Duration;

use static_httpd::http::keep_alive::{KeepAliveParams, negotiate};
use static_httpd::http::request::{Method, Request, RequestBuilder};

fn request(version: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = RequestBuilder::new()
        .method(Method::GET)
        .target("/helloworld.html")
        .version(version);
    for (k, v) in headers {
        builder = builder.header(k, *v);
    }
    builder.build().unwrap()
}

#[test]
fn test_http10_never_keeps_alive() {
    for connection in [None, Some("keep-alive"), Some("Keep-Alive"), Some("close")] {
        let headers: Vec<(&str, &str)> = connection.map(|c| ("Connection", c)).into_iter().collect();
        let decision = negotiate(&request("HTTP/1.0", &headers), 1, None);

        assert!(!decision.enabled);
        assert!(!decision.supported);
        assert_eq!(decision.socket_timeout, None);
        assert_eq!(decision.connection_header(), "close");
    }
}

#[test]
fn test_http11_keep_alive_requested() {
    let decision = negotiate(&request("HTTP/1.1", &[("Connection", "keep-alive")]), 1, None);

    assert!(decision.enabled);
    assert!(decision.supported);
    assert!(!decision.max_requests_exceeded);
    assert_eq!(decision.socket_timeout, None);
    assert_eq!(decision.connection_header(), "keep-alive");
}

#[test]
fn test_http11_connection_value_case_insensitive() {
    let decision = negotiate(&request("HTTP/1.1", &[("connection", "KEEP-ALIVE")]), 1, None);

    assert!(decision.enabled);
}

#[test]
fn test_http11_without_connection_header_closes() {
    let decision = negotiate(&request("HTTP/1.1", &[]), 1, None);

    assert!(decision.supported);
    assert!(!decision.enabled);
    assert_eq!(decision.connection_header(), "close");
}

#[test]
fn test_http11_connection_close() {
    let decision = negotiate(&request("HTTP/1.1", &[("Connection", "close")]), 1, None);

    assert!(decision.supported);
    assert!(!decision.enabled);
}

#[test]
fn test_max_exceeded_on_second_request() {
    let req = request("HTTP/1.1", &[("Connection", "keep-alive"), ("Keep-Alive", "max=1")]);

    let first = negotiate(&req, 1, None);
    assert!(first.enabled);
    assert!(!first.max_requests_exceeded);

    let second = negotiate(&req, 2, None);
    assert!(!second.enabled);
    assert!(second.max_requests_exceeded);
    assert_eq!(second.connection_header(), "close");
}

#[test]
fn test_timeout_applied_in_milliseconds() {
    let req = request("HTTP/1.1", &[("Connection", "keep-alive"), ("Keep-Alive", "timeout=5")]);
    let decision = negotiate(&req, 1, Some(Duration::from_secs(30)));

    assert!(decision.enabled);
    assert_eq!(decision.socket_timeout, Some(Duration::from_millis(5000)));
}

#[test]
fn test_timeout_unchanged_is_not_reapplied() {
    let req = request("HTTP/1.1", &[("Connection", "keep-alive"), ("Keep-Alive", "timeout=5")]);
    let decision = negotiate(&req, 2, Some(Duration::from_secs(5)));

    assert!(decision.enabled);
    assert_eq!(decision.socket_timeout, None);
}

#[test]
fn test_timeout_out_of_range_rejected() {
    for value in ["timeout=10", "timeout=15", "timeout=0"] {
        let req = request("HTTP/1.1", &[("Connection", "keep-alive"), ("Keep-Alive", value)]);
        let decision = negotiate(&req, 1, Some(Duration::from_secs(3)));

        assert!(decision.enabled, "{value}");
        assert_eq!(decision.socket_timeout, None, "{value}");
    }
}

#[test]
fn test_timeout_range_bounds() {
    for secs in 1..=9u64 {
        let value = format!("timeout={secs}");
        let req = request("HTTP/1.1", &[("Connection", "keep-alive"), ("Keep-Alive", value.as_str())]);
        let decision = negotiate(&req, 1, None);

        assert_eq!(decision.socket_timeout, Some(Duration::from_secs(secs)));
    }
}

#[test]
fn test_keep_alive_header_ignored_without_keep_alive() {
    let req = request("HTTP/1.1", &[("Keep-Alive", "timeout=5")]);
    let decision = negotiate(&req, 1, None);

    assert!(!decision.enabled);
    assert_eq!(decision.socket_timeout, None);
}

#[test]
fn test_max_takes_precedence_over_timeout() {
    let req = request(
        "HTTP/1.1",
        &[("Connection", "keep-alive"), ("Keep-Alive", "timeout=5, max=2")],
    );

    let within = negotiate(&req, 2, None);
    assert!(within.enabled);
    assert_eq!(within.socket_timeout, Some(Duration::from_secs(5)));

    let beyond = negotiate(&req, 3, None);
    assert!(!beyond.enabled);
    assert!(beyond.max_requests_exceeded);
    assert_eq!(beyond.socket_timeout, None);
}

#[test]
fn test_unparseable_values_ignored() {
    let req = request(
        "HTTP/1.1",
        &[("Connection", "keep-alive"), ("Keep-Alive", "max=lots")],
    );
    let decision = negotiate(&req, 100, None);

    assert!(decision.enabled);
}

#[test]
fn test_params_parse() {
    assert_eq!(
        KeepAliveParams::parse("timeout=5"),
        KeepAliveParams { max: None, timeout: Some(5) }
    );
    assert_eq!(
        KeepAliveParams::parse(" MAX = 3 , Timeout=2, other=1"),
        KeepAliveParams { max: Some(3), timeout: Some(2) }
    );
    assert_eq!(KeepAliveParams::parse("garbage"), KeepAliveParams::default());
    assert_eq!(KeepAliveParams::parse("timeout=-1"), KeepAliveParams::default());
}
