//! Live-reload protocol — JSON newline-delimited over TCP.
//!
//! The watch runtime serves `127.0.0.1:<port>` (the resolved `PORT`).
//! Clients either issue one request/reply round-trip (`status`, `reload`,
//! `stop`) or send `subscribe` and then receive a [`ReloadEvent`] line after
//! every completed rebuild.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WatchError;

/// JSON newline-delimited request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadRequest {
    pub cmd: String,
}

/// JSON newline-delimited reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReloadReply {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Pushed to every subscribed client after a rebuild completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReloadEvent {
    pub cmd: String,
    pub stage: String,
}

impl ReloadEvent {
    pub fn for_stage(stage: impl Into<String>) -> Self {
        ReloadEvent {
            cmd: "reload".to_string(),
            stage: stage.into(),
        }
    }
}

fn connect(port: u16) -> Result<TcpStream, WatchError> {
    TcpStream::connect(("127.0.0.1", port)).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset
        ) {
            WatchError::ServerNotRunning { port }
        } else {
            crate::error::io_err(format!("127.0.0.1:{port}"), err)
        }
    })
}

/// Send one JSON request to the reload server and return one reply.
pub fn send_request(port: u16, request: &ReloadRequest) -> Result<ReloadReply, WatchError> {
    let mut stream = connect(port)?;

    let payload = serde_json::to_string(request)?;
    stream
        .write_all(payload.as_bytes())
        .and_then(|()| stream.write_all(b"\n"))
        .and_then(|()| stream.flush())
        .map_err(|e| crate::error::io_err("reload socket write", e))?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| crate::error::io_err("reload socket read", e))?;
    if read == 0 {
        return Err(WatchError::Protocol(
            "reload server closed connection before responding".to_string(),
        ));
    }

    Ok(serde_json::from_str(line.trim_end())?)
}

pub fn request_status(port: u16) -> Result<Value, WatchError> {
    let reply = send_request(
        port,
        &ReloadRequest {
            cmd: "status".to_string(),
        },
    )?;
    reply_into_data(reply)
}

/// Ask the server to notify every subscriber, as a manual trigger.
pub fn request_reload(port: u16) -> Result<(), WatchError> {
    let reply = send_request(
        port,
        &ReloadRequest {
            cmd: "reload".to_string(),
        },
    )?;
    reply_into_data(reply).map(|_| ())
}

pub fn request_stop(port: u16) -> Result<(), WatchError> {
    let reply = send_request(
        port,
        &ReloadRequest {
            cmd: "stop".to_string(),
        },
    )?;
    reply_into_data(reply).map(|_| ())
}

fn reply_into_data(reply: ReloadReply) -> Result<Value, WatchError> {
    if reply.ok {
        Ok(reply.data.unwrap_or(Value::Null))
    } else {
        Err(WatchError::Protocol(
            reply
                .error
                .unwrap_or_else(|| "unknown reload server error".to_string()),
        ))
    }
}

/// A subscribed client connection; blocks on [`Subscription::next_event`].
pub struct Subscription {
    reader: BufReader<TcpStream>,
}

/// Subscribe to reload events.
pub fn subscribe(port: u16) -> Result<Subscription, WatchError> {
    let mut stream = connect(port)?;
    let payload = serde_json::to_string(&ReloadRequest {
        cmd: "subscribe".to_string(),
    })?;
    stream
        .write_all(payload.as_bytes())
        .and_then(|()| stream.write_all(b"\n"))
        .and_then(|()| stream.flush())
        .map_err(|e| crate::error::io_err("reload socket write", e))?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| crate::error::io_err("reload socket read", e))?;
    let reply: ReloadReply = serde_json::from_str(line.trim_end())?;
    if !reply.ok {
        return Err(WatchError::Protocol(
            reply.error.unwrap_or_else(|| "subscribe refused".to_string()),
        ));
    }

    Ok(Subscription { reader })
}

impl Subscription {
    /// Block until the next reload event (or the server goes away).
    pub fn next_event(&mut self) -> Result<ReloadEvent, WatchError> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| crate::error::io_err("reload socket read", e))?;
        if read == 0 {
            return Err(WatchError::Protocol(
                "reload server closed the subscription".to_string(),
            ));
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_constructors() {
        let ok = ReloadReply::ok(serde_json::json!({"running": true}));
        assert!(ok.ok);
        assert!(ok.error.is_none());

        let err = ReloadReply::error("nope");
        assert!(!err.ok);
        assert_eq!(err.error.as_deref(), Some("nope"));
    }

    #[test]
    fn reload_event_roundtrip() {
        let event = ReloadEvent::for_stage("styles");
        let line = serde_json::to_string(&event).unwrap();
        let parsed: ReloadEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.cmd, "reload");
    }

    #[test]
    fn connecting_to_dead_port_is_server_not_running() {
        // Port 1 is never bound in test environments.
        let err = request_status(1).unwrap_err();
        assert!(
            matches!(err, WatchError::ServerNotRunning { port: 1 } | WatchError::Io { .. }),
            "got: {err}"
        );
    }
}
