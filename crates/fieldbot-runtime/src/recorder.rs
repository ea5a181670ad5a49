//! Telemetry sinks for per-cycle visualisation values.
//!
//! | Sink | Use |
//! |---|---|
//! | [`NullSink`] | discard everything |
//! | [`MemorySink`] | keep the latest value per key; tests and inspection |
//! | [`JsonLinesSink`] | one JSON object per record, for log viewers |

use std::collections::HashMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use fieldbot_types::TelemetryValue;
use serde::Serialize;
use tracing::warn;

/// Key/value recording interface.
pub trait TelemetrySink {
    fn record(&mut self, key: &str, value: TelemetryValue);
}

pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _key: &str, _value: TelemetryValue) {}
}

#[derive(Debug, Default)]
pub struct MemorySink {
    latest: HashMap<String, TelemetryValue>,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, key: &str) -> Option<&TelemetryValue> {
        self.latest.get(key)
    }

    /// Total records received, across all keys.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl TelemetrySink for MemorySink {
    fn record(&mut self, key: &str, value: TelemetryValue) {
        self.writes += 1;
        self.latest.insert(key.to_string(), value);
    }
}

#[derive(Serialize)]
struct Record<'a> {
    timestamp: DateTime<Utc>,
    key: &'a str,
    #[serde(flatten)]
    value: &'a TelemetryValue,
}

/// Writes `{"timestamp":…,"key":…,"type":…,"value":…}` lines.
///
/// Write failures are logged once and the sink goes quiet; telemetry never
/// stops the control cycle.
pub struct JsonLinesSink<W: Write> {
    out: W,
    failed: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TelemetrySink for JsonLinesSink<W> {
    fn record(&mut self, key: &str, value: TelemetryValue) {
        if self.failed {
            return;
        }
        let record = Record {
            timestamp: Utc::now(),
            key,
            value: &value,
        };
        let result = serde_json::to_writer(&mut self.out, &record)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(e) = result {
            warn!(key, error = %e, "telemetry write failed; further records dropped");
            self.failed = true;
        }
    }
}
