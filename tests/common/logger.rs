//! Phase-tagged logging for integration tests.
#![allow(dead_code)]
//!
//! Lines go to stderr, so they only show for failing tests or with
//! `--nocapture`. `TEST_LOG_JSON=1` switches to one JSON object per line.
//!
//! ```rust,ignore
//! let log = TestLogger::new("retries_on_sign_out_redirect");
//! log.phase("setup");
//! // ...
//! log.finish_ok();
//! ```

use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    test: &'a str,
    phase: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u128>,
}

/// Per-test logger with duration tracking.
pub struct TestLogger {
    test_name: String,
    start_time: Instant,
    current_phase: Mutex<String>,
}

impl TestLogger {
    #[must_use]
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            test_name: test_name.to_string(),
            start_time: Instant::now(),
            current_phase: Mutex::new("init".to_string()),
        };
        logger.log("Test starting", None);
        logger
    }

    /// Set the current phase, e.g. "setup", "execute", "verify".
    pub fn phase(&self, phase: &str) {
        if let Ok(mut current) = self.current_phase.lock() {
            *current = phase.to_string();
        }
        self.log(&format!("Phase: {phase}"), None);
    }

    pub fn info(&self, message: &str) {
        self.log(message, None);
    }

    pub fn http_request(&self, method: &str, url: &str) {
        self.log(&format!("HTTP {method} {url}"), None);
    }

    pub fn finish_ok(&self) {
        let elapsed = self.start_time.elapsed().as_millis();
        self.log(&format!("Test passed (duration: {elapsed}ms)"), Some(elapsed));
    }

    fn log(&self, message: &str, duration_ms: Option<u128>) {
        let phase = self
            .current_phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

        if std::env::var("TEST_LOG_JSON").is_ok_and(|v| v == "1" || v == "true") {
            let entry = LogEntry {
                timestamp,
                test: &self.test_name,
                phase: &phase,
                message,
                duration_ms,
            };
            if let Ok(json) = serde_json::to_string(&entry) {
                eprintln!("{json}");
            }
        } else {
            eprintln!("[{timestamp}] [{}] [{phase}] {message}", self.test_name);
        }
    }
}
