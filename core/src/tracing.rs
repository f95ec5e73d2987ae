//! Tracing utilities for query execution and degraded results.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site. The feature must be declared by the crate that expands
//! them.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// datatable_trace_query!(&sql, params.len());
/// ```
#[macro_export]
macro_rules! datatable_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "datatable.query");
    };
}

/// Emit a warn-level tracing event when a stage degrades instead of failing.
///
/// ```ignore
/// datatable_trace_fault!("count", &err);
/// datatable_trace_fault!("stream", &err);
/// ```
#[macro_export]
macro_rules! datatable_trace_fault {
    ($stage:literal, $error:expr) => {
        #[cfg(feature = "tracing")]
        tracing::warn!(stage = $stage, error = %$error, "datatable.fault");
    };
}

/// Emit a debug-level event describing an assembly pass.
#[macro_export]
macro_rules! datatable_trace_assembly {
    ($table:expr, $joins:expr, $summary:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            table = %$table,
            joins = $joins,
            summary = $summary,
            "datatable.assemble"
        );
    };
}
