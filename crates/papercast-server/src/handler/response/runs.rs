//! Run response types.

use papercast_runtime::engine::RunReport;
use serde::Serialize;

use super::ErrorResponse;
use crate::BatchResult;
use crate::handler::Error;

/// Outcome of one batch item: a run report or the error that prevented it.
#[must_use]
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    /// Report of the run, when the item was accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
    /// Why the item did not run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse<'static>>,
}

impl From<BatchResult> for BatchItem {
    fn from(result: BatchResult) -> Self {
        match result {
            Ok(report) => Self {
                report: Some(report),
                error: None,
            },
            Err(error) => Self {
                report: None,
                error: Some(Error::from(error).into_error_response().into_static()),
            },
        }
    }
}

/// Batch response with one entry per submitted seed, in submission order.
#[must_use]
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    /// Item outcomes.
    pub items: Vec<BatchItem>,
}

impl FromIterator<BatchResult> for Batch {
    fn from_iter<I: IntoIterator<Item = BatchResult>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(BatchItem::from).collect(),
        }
    }
}
