//! Per-decision audit stream.
//!
//! One line-delimited JSON record per decision, written under a mutex to
//! stdout, stderr, or an append-only file with owner-only permissions.
//! Write failures are the caller's to log; they never change the HTTP
//! outcome.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AuditConfig;

/// One audit record. Field names are the stable wire contract.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AuditEvent {
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_ip: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub direct_ip: String,

    pub trusted_proxy: bool,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_method: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub auth_name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub policy: String,

    /// `success`, `denied`, or `rate_limited`.
    pub result: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,

    pub status: u16,

    pub latency_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit output cannot be empty when enabled")]
    EmptyOutput,

    #[error("failed to open audit log file: {0}")]
    Open(#[from] std::io::Error),
}

enum Sink {
    Stdout,
    Stderr,
    File(File),
}

/// Serialized audit writer. Disabled loggers accept events and drop them.
pub struct AuditLogger {
    sink: Option<Mutex<Sink>>,
}

impl AuditLogger {
    pub fn new(config: &AuditConfig) -> Result<Self, AuditError> {
        if !config.enabled {
            return Ok(Self { sink: None });
        }

        let output = config.output.trim();
        let sink = match output {
            "" => return Err(AuditError::EmptyOutput),
            "stdout" => Sink::Stdout,
            "stderr" => Sink::Stderr,
            path => Sink::File(open_audit_file(path)?),
        };

        Ok(Self {
            sink: Some(Mutex::new(sink)),
        })
    }

    pub fn enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Write one record. The timestamp is stamped here if the caller
    /// left it unset.
    pub fn log(&self, event: &AuditEvent) -> Result<(), std::io::Error> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };

        let mut event = event.clone();
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let mut sink = sink.lock().expect("audit logger poisoned");
        match &mut *sink {
            Sink::Stdout => std::io::stdout().write_all(&line),
            Sink::Stderr => std::io::stderr().write_all(&line),
            Sink::File(file) => file.write_all(&line),
        }
    }

    /// Flush buffered output. The descriptor itself is released when the
    /// last holder drops, so in-flight requests can still finish their
    /// best-effort writes during a reload.
    pub fn close(&self) {
        if let Some(sink) = &self.sink {
            let mut sink = sink.lock().expect("audit logger poisoned");
            let _ = match &mut *sink {
                Sink::Stdout => std::io::stdout().flush(),
                Sink::Stderr => std::io::stderr().flush(),
                Sink::File(file) => file.flush(),
            };
        }
    }
}

#[cfg(unix)]
fn open_audit_file(path: &str) -> Result<File, std::io::Error> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_audit_file(path: &str) -> Result<File, std::io::Error> {
    OpenOptions::new().append(true).create(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(result: &str) -> AuditEvent {
        AuditEvent {
            request_id: "req-1".into(),
            client_ip: "203.0.113.9".into(),
            result: result.into(),
            status: 200,
            latency_ms: 3,
            ..Default::default()
        }
    }

    #[test]
    fn disabled_logger_accepts_and_drops() {
        let logger = AuditLogger::new(&AuditConfig::default()).unwrap();
        assert!(!logger.enabled());
        logger.log(&event("success")).unwrap();
        logger.close();
    }

    #[test]
    fn enabled_with_empty_output_fails() {
        let config = AuditConfig {
            enabled: true,
            output: "".into(),
        };
        assert!(matches!(
            AuditLogger::new(&config),
            Err(AuditError::EmptyOutput)
        ));
    }

    #[test]
    fn file_sink_writes_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let config = AuditConfig {
            enabled: true,
            output: path.to_str().unwrap().into(),
        };

        let logger = AuditLogger::new(&config).unwrap();
        logger.log(&event("success")).unwrap();
        logger.log(&event("denied")).unwrap();
        logger.close();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["result"], "success");
        assert_eq!(first["client_ip"], "203.0.113.9");
        assert_eq!(first["status"], 200);
        assert!(first["timestamp"].is_string());
        // Empty optional fields are omitted entirely.
        assert!(first.get("user").is_none());
        assert!(first.get("policy").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn audit_file_mode_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let config = AuditConfig {
            enabled: true,
            output: path.to_str().unwrap().into(),
        };
        let logger = AuditLogger::new(&config).unwrap();
        logger.log(&event("success")).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn appends_across_logger_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let config = AuditConfig {
            enabled: true,
            output: path.to_str().unwrap().into(),
        };

        let first = AuditLogger::new(&config).unwrap();
        first.log(&event("success")).unwrap();
        first.close();
        drop(first);

        let second = AuditLogger::new(&config).unwrap();
        second.log(&event("denied")).unwrap();
        second.close();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
