//! Persistent connection negotiation.
//!
//! The decision is recomputed for every request from the request head, the
//! number of requests already seen on the socket and the read timeout that is
//! currently in effect.
//!
//! HTTP/1.0 clients never get a persistent connection, even when they send
//! `Connection: keep-alive`. HTTP/1.1 clients have to ask for it explicitly.

use std::time::Duration;

use crate::http::request::Request;

const KEEP_ALIVE_VALUE: &str = "keep-alive";
const PARAM_MAX: &str = "max";
const PARAM_TIMEOUT: &str = "timeout";

/// Largest idle timeout, in seconds, a client may request.
pub const MAX_IDLE_TIMEOUT_SECS: u64 = 9;

/// Outcome of keep-alive negotiation for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveDecision {
    /// Keep the connection open after this response.
    pub enabled: bool,
    /// Persistent connections are possible for this protocol version.
    pub supported: bool,
    /// New idle read timeout for the socket; `None` leaves it unchanged.
    pub socket_timeout: Option<Duration>,
    /// The client's `max` request count has been reached.
    pub max_requests_exceeded: bool,
}

impl KeepAliveDecision {
    /// Value for the `Connection` response header.
    pub fn connection_header(&self) -> &'static str {
        if self.supported && self.enabled {
            "keep-alive"
        } else {
            "close"
        }
    }
}

/// Parameters recognised in a `Keep-Alive` request header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepAliveParams {
    pub max: Option<u64>,
    pub timeout: Option<u64>,
}

impl KeepAliveParams {
    /// Parses `name=value` pairs separated by commas.
    ///
    /// Unknown names are skipped. Values that are not non-negative integers
    /// are logged and skipped.
    pub fn parse(value: &str) -> Self {
        let mut params = Self::default();

        for pair in value.split(',') {
            let Some((name, raw)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let raw = raw.trim();

            let slot = if name.eq_ignore_ascii_case(PARAM_MAX) {
                &mut params.max
            } else if name.eq_ignore_ascii_case(PARAM_TIMEOUT) {
                &mut params.timeout
            } else {
                continue;
            };

            match raw.parse::<u64>() {
                Ok(n) => *slot = Some(n),
                Err(_) => {
                    tracing::warn!(param = name, value = raw, "Ignoring unparseable Keep-Alive parameter");
                }
            }
        }

        params
    }
}

/// Decides whether the connection stays open after responding to `request`.
///
/// `request_count` is the 1-based number of this request on the socket and
/// `current_timeout` is the idle read timeout currently applied to it.
pub fn negotiate(
    request: &Request,
    request_count: u64,
    current_timeout: Option<Duration>,
) -> KeepAliveDecision {
    let mut decision = KeepAliveDecision {
        enabled: false,
        supported: false,
        socket_timeout: None,
        max_requests_exceeded: false,
    };

    if request.is_legacy_version() {
        return decision;
    }

    decision.supported = true;
    decision.enabled = request
        .header("Connection")
        .map(|v| v.trim().eq_ignore_ascii_case(KEEP_ALIVE_VALUE))
        .unwrap_or(false);

    if !decision.enabled {
        return decision;
    }

    let params = request
        .header("Keep-Alive")
        .map(KeepAliveParams::parse)
        .unwrap_or_default();

    if let Some(max) = params.max {
        if request_count > max {
            tracing::debug!(max, request_count, "Keep-Alive max requests reached");
            decision.enabled = false;
            decision.max_requests_exceeded = true;
            return decision;
        }
    }

    match params.timeout {
        Some(secs @ 1..=MAX_IDLE_TIMEOUT_SECS) => {
            let requested = Duration::from_secs(secs);
            if current_timeout != Some(requested) {
                decision.socket_timeout = Some(requested);
            }
        }
        Some(0) | None => {}
        Some(secs) => {
            tracing::warn!(timeout = secs, "Bad Keep-Alive timeout, skipping");
        }
    }

    decision
}
