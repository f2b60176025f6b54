use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_PATH: &str = "/tmp/corechat-debug.log";
const DEFAULT_LOG_FILTER: &str = "warn";
const LOG_FILTER_ENV: &str = "CORECHAT_LOG";
const LOG_PATH_ENV: &str = "CORECHAT_LOG_PATH";
const DEBUG_PAYLOAD_ENV: &str = "CORECHAT_DEBUG_PAYLOAD";

/// Installs the global tracing subscriber.
///
/// Output goes to `CORECHAT_LOG_PATH` when set. Without it, logs land in
/// [`DEFAULT_LOG_PATH`] while stderr is an interactive terminal (so they do not
/// interleave with the transcript) and on stderr otherwise.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match resolve_log_path() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("cannot open log file '{path}'"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|error| anyhow!("failed to install tracing subscriber: {error}"))
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| anyhow!("failed to install tracing subscriber: {error}")),
    }
}

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::debug!(url = %request_url, payload = %formatted_payload, "Agent request payload");
}

pub fn emit_undecoded_line(line: &str, parse_error: &serde_json::Error) {
    tracing::debug!(error = %parse_error, line = %line, "Stream line is not JSON, keeping it as raw text");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}
