//! Metric instruments.
//!
//! Instruments come from the globally registered `MeterProvider`, which is a
//! no-op until [`init_telemetry`](super::init_telemetry) installs one.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("tabdeck")
}

/// Counter: storage engine calls.
/// Labels: `backend`, `operation` ("get" | "set" | "remove" | "clear"), `result`.
pub fn storage_operations() -> Counter<u64> {
    meter()
        .u64_counter("tabdeck.storage.operations")
        .with_description("Number of storage engine calls")
        .build()
}

/// Counter: workspace commits.
/// Labels: `result` ("ok" | "error").
pub fn workspace_commits() -> Counter<u64> {
    meter()
        .u64_counter("tabdeck.workspace.commits")
        .with_description("Number of workspace commits")
        .build()
}

/// Counter: background and widget constructions.
/// Labels: `component` ("background" | "widget"), `kind`, `result`.
pub fn constructions() -> Counter<u64> {
    meter()
        .u64_counter("tabdeck.catalog.constructions")
        .with_description("Number of background and widget constructions")
        .build()
}

/// Counter: read failures recovered by falling back to an empty value.
/// Labels: `record` ("index" | "workspace").
pub fn recovered_reads() -> Counter<u64> {
    meter()
        .u64_counter("tabdeck.storage.recovered_reads")
        .with_description("Storage reads that failed and fell back to defaults")
        .build()
}

fn result_label(ok: bool) -> KeyValue {
    KeyValue::new("result", if ok { "ok" } else { "error" })
}

pub fn record_storage_operation(backend: &'static str, operation: &'static str, ok: bool) {
    storage_operations().add(
        1,
        &[
            KeyValue::new("backend", backend),
            KeyValue::new("operation", operation),
            result_label(ok),
        ],
    );
}

pub fn record_commit(ok: bool) {
    workspace_commits().add(1, &[result_label(ok)]);
}

pub fn record_construction(component: &'static str, kind: &'static str, ok: bool) {
    constructions().add(
        1,
        &[
            KeyValue::new("component", component),
            KeyValue::new("kind", kind),
            result_label(ok),
        ],
    );
}

pub fn record_recovered_read(record: &'static str) {
    recovered_reads().add(1, &[KeyValue::new("record", record)]);
}
