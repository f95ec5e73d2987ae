//! Request results: counts, column aggregates and the lazily produced rows,
//! rendered into the JSON envelope the grid widget consumes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::pipeline::{Row, RowStream};

/// Sum and average of one column over the filtered rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub sum: Option<f64>,
    pub avg: Option<f64>,
}

/// Column name -> aggregate.
pub type Summary = BTreeMap<String, Aggregate>;

/// Counts, summary and the lazy rows of one request. Consumed once.
pub struct ResultSet<'s> {
    rows: RowStream<'s>,
    total_rows: u64,
    filtered_rows: u64,
    summary: Option<Summary>,
    error: Option<String>,
}

impl<'s> ResultSet<'s> {
    pub fn new(rows: RowStream<'s>, total_rows: u64, filtered_rows: u64) -> Self {
        Self {
            rows,
            total_rows,
            filtered_rows,
            summary: None,
            error: None,
        }
    }

    pub fn with_summary(mut self, summary: Option<Summary>) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn filtered_rows(&self) -> u64 {
        self.filtered_rows
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Error recorded while preparing the result, before any row was read.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The lazy row stream.
    pub fn into_rows(self) -> RowStream<'s> {
        self.rows
    }

    /// Drains the rows into a response envelope. A fault while streaming
    /// discards the rows read so far and sets `error`; counts are kept.
    pub fn into_envelope(self, draw: u64) -> Envelope {
        let mut error = self.error;
        let data = match self.rows.collect::<crate::error::Result<Vec<Row>>>() {
            Ok(rows) => rows,
            Err(err) => {
                error = Some(err.to_string());
                Vec::new()
            }
        };

        Envelope {
            draw,
            total_records: self.total_rows,
            total_display_records: self.filtered_rows,
            records_summary: self.summary,
            data,
            error,
        }
    }
}

impl std::fmt::Debug for ResultSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("total_rows", &self.total_rows)
            .field("filtered_rows", &self.filtered_rows)
            .field("summary", &self.summary)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// JSON response body for the grid widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub draw: u64,
    pub total_records: u64,
    pub total_display_records: u64,
    pub records_summary: Option<Summary>,
    pub data: Vec<Row>,
    /// Always serialized; `null` when the request succeeded.
    pub error: Option<String>,
}
