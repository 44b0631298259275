//! Span helpers for workspace persistence.

use tracing::Span;

/// Span around a workspace commit.
pub fn start_commit_span(name: &str, widgets: usize) -> Span {
    tracing::info_span!(
        "workspace.commit",
        "workspace.name" = name,
        "workspace.widgets" = widgets,
    )
}

/// Span around an index operation. `workspace.id` is empty for operations
/// that touch the whole index.
pub fn start_index_span(operation: &'static str, id: Option<&str>) -> Span {
    let span = tracing::info_span!(
        "workspace_index",
        "index.operation" = operation,
        "workspace.id" = tracing::field::Empty,
    );
    if let Some(id) = id {
        span.record("workspace.id", id);
    }
    span
}
