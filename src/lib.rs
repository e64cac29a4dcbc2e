//! Aggregation and charting of mask-compaction benchmark results.
//!
//! Records are read from a `;`-delimited table, repeated trials are averaged,
//! and a fixed family of comparison charts is drawn from the result.

pub mod aggregate;
pub mod chart;
pub mod classify;
pub mod dispatch;
pub mod input;
pub mod jitter;
pub mod record;
pub mod series;
pub mod status;
pub mod summary;
