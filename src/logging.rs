//! Structured JSON-line logging.
//!
//! Every record goes to stderr so stdout stays clean for results and SOP
//! output. When `LOG_DIR` is set, records are also appended to
//! `<LOG_DIR>/<run_id>/events.jsonl`. Filtering is by `LOG_LEVEL` and by a
//! comma-separated `LOG_DOMAINS` list.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::data::FeedManifest;
use crate::error::{DataError, Feed};
use crate::scenario::ScenarioKey;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Level::parse(&v))
            .unwrap_or(Level::Info)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "fatal" => Some(Level::Fatal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Data,    // Feed fetch and parse
    Lookup,  // Scenario matching
    Sop,     // Document assembly
    Gate,    // Access checks
    System,  // Startup, command dispatch
    Profile, // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Data => "data",
            Domain::Lookup => "lookup",
            Domain::Sop => "sop",
            Domain::Gate => "gate",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        domain_enabled(std::env::var("LOG_DOMAINS").ok().as_deref(), *self)
    }
}

fn domain_enabled(filter: Option<&str>, domain: Domain) -> bool {
    match filter {
        None | Some("all") | Some("") => true,
        Some(list) => list.split(',').any(|d| d.trim() == domain.as_str()),
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR")
            .ok()
            .and_then(|base| open_events(PathBuf::from(base).join(&run_id)));
        RunContext { run_id, events }
    })
}

fn open_events(run_dir: PathBuf) -> Option<Mutex<BufWriter<File>>> {
    if let Err(err) = create_dir_all(&run_dir) {
        eprintln!("[log] failed to create run dir: {}", err);
        return None;
    }
    match File::create(run_dir.join("events.jsonl")) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create events log: {}", err);
            None
        }
    }
}

/// Flush the events file. Call before `process::exit`.
pub fn flush() {
    if let Some(events) = RUN_CONTEXT.get().and_then(|ctx| ctx.events.as_ref()) {
        if let Ok(mut w) = events.lock() {
            let _ = w.flush();
        }
    }
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["password", "TTC_PASSWORD", "secret"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let ctx = ensure_run_context();
    let line = render_record(&ctx.run_id, next_seq(), level, domain, event, fields);
    if let Some(events) = &ctx.events {
        if let Ok(mut w) = events.lock() {
            let _ = writeln!(w, "{}", line);
        }
    }
    eprintln!("{}", line);
}

fn render_record(
    run_id: &str,
    seq: u64,
    level: Level,
    domain: Domain,
    event: &str,
    fields: Map<String, Value>,
) -> String {
    let mut data = sanitize_fields(fields);
    let msg = data.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(seq));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_data_loaded(manifest: &FeedManifest) {
    log(
        Level::Info,
        Domain::Data,
        "feed_loaded",
        obj(&[
            ("source", v_str(&manifest.source)),
            ("hash_sha256", v_str(&manifest.hash_sha256)),
            ("bytes", json!(manifest.bytes)),
            ("entries", json!(manifest.entries)),
            ("steps", json!(manifest.steps)),
        ]),
    );
}

pub fn log_load_failure(feed: Feed, err: &DataError) {
    log(
        Level::Error,
        Domain::Data,
        "feed_failed",
        obj(&[
            ("feed", v_str(feed.as_str())),
            ("msg", v_str(&err.to_string())),
        ]),
    );
}

pub fn log_lookup(key: &ScenarioKey, matched: bool) {
    let level = if matched { Level::Info } else { Level::Warn };
    log(
        level,
        Domain::Lookup,
        if matched { "match" } else { "no_match" },
        obj(&[
            ("speed", json!(key.speed)),
            ("road_type", v_str(key.road_type.as_str())),
            ("state", v_str(key.state.as_str())),
            ("duration", v_str(key.duration.as_str())),
            ("control", v_str(key.control.as_str())),
        ]),
    );
}

pub fn log_sop_warning(warning: &str) {
    log(Level::Warn, Domain::Sop, "placeholder_unresolved", obj(&[("msg", v_str(warning))]));
}

pub fn log_sop_generated(key: &ScenarioKey, sections: usize, warnings: usize) {
    log(
        Level::Info,
        Domain::Sop,
        "generated",
        obj(&[
            ("scenario", v_str(&key.to_string())),
            ("sections", json!(sections)),
            ("warnings", json!(warnings)),
        ]),
    );
}

pub fn log_gate(granted: bool) {
    if granted {
        log(Level::Info, Domain::Gate, "granted", Map::new());
    } else {
        log(Level::Warn, Domain::Gate, "denied", Map::new());
    }
}

pub fn log_command(command: &str) {
    log(Level::Debug, Domain::System, "command", obj(&[("command", v_str(command))]));
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits a trace record with elapsed time when dropped.
pub struct ProfileScope {
    module: &'static str,
    label: &'static str,
    started: Instant,
}

impl ProfileScope {
    pub fn new(module: &'static str, label: &'static str) -> Self {
        Self {
            module,
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        log(
            Level::Trace,
            Domain::Profile,
            "profile",
            obj(&[
                ("module", v_str(self.module)),
                ("label", v_str(self.label)),
                ("elapsed_ms", v_num(elapsed_ms)),
            ]),
        );
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Error < Level::Fatal);
        assert_eq!(Level::parse(" WARN "), Some(Level::Warn));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_domain_filter() {
        assert!(domain_enabled(None, Domain::Gate));
        assert!(domain_enabled(Some("all"), Domain::Sop));
        assert!(domain_enabled(Some("data, gate"), Domain::Gate));
        assert!(!domain_enabled(Some("data,lookup"), Domain::Gate));
    }

    #[test]
    fn test_password_redacted() {
        let line = render_record(
            "r-test",
            3,
            Level::Info,
            Domain::Gate,
            "attempt",
            obj(&[("password", v_str("AWP2025")), ("msg", v_str("hi"))]),
        );
        assert!(!line.contains("AWP2025"));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["data"]["password"], "[REDACTED]");
        assert_eq!(parsed["msg"], "hi");
        assert_eq!(parsed["lvl"], "INFO");
        assert_eq!(parsed["component"], "gate");
        assert_eq!(parsed["seq"], 3);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
