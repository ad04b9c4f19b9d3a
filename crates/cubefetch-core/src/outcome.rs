//! Aggregated result of a batched load.

use cubefetch_client::{FetchError, Row};
use serde::Serialize;

/// A batch that produced no rows because its fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Position of the batch, starting at 0
    pub index: usize,
    /// Number of identifiers in the batch
    pub size: usize,
    /// Why the fetch failed
    #[serde(serialize_with = "serialize_error")]
    pub error: FetchError,
}

fn serialize_error<S: serde::Serializer>(
    error: &FetchError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Rows of every successful batch in batch order, plus the failures.
///
/// A failed batch contributes nothing to [`rows`](Self::rows); whether partial
/// data is acceptable is up to the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    rows: Vec<Row>,
    failures: Vec<BatchFailure>,
    batch_count: usize,
    cache_hits: usize,
}

impl BatchOutcome {
    pub(crate) fn new(
        rows: Vec<Row>,
        failures: Vec<BatchFailure>,
        batch_count: usize,
        cache_hits: usize,
    ) -> Self {
        Self {
            rows,
            failures,
            batch_count,
            cache_hits,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Failed batches in ascending index order
    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    /// Batches answered from the cache without a remote call
    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    /// True if no batch failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// All rows, or [`FetchError::PartialFailure`] if any batch failed.
    pub fn into_result(self) -> Result<Vec<Row>, FetchError> {
        if self.is_complete() {
            Ok(self.rows)
        } else {
            Err(FetchError::PartialFailure {
                failed: self.failures.len(),
                total: self.batch_count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubefetch_client::Term;

    fn row(value: &str) -> Row {
        let mut row = Row::new();
        row.insert("s".into(), Term::Iri(value.into()));
        row
    }

    #[test]
    fn test_complete_outcome() {
        let outcome = BatchOutcome::new(vec![row("a"), row("b")], Vec::new(), 2, 1);
        assert!(outcome.is_complete());
        assert_eq!(outcome.cache_hits(), 1);
        assert_eq!(outcome.into_result().unwrap().len(), 2);
    }

    #[test]
    fn test_partial_outcome() {
        let failure = BatchFailure {
            index: 1,
            size: 500,
            error: FetchError::http(503, "unavailable"),
        };
        let outcome = BatchOutcome::new(vec![row("a")], vec![failure], 3, 0);

        assert!(!outcome.is_complete());
        assert_eq!(outcome.failures()[0].index, 1);
        assert_eq!(outcome.rows().len(), 1);
        assert_eq!(
            outcome.into_result().unwrap_err(),
            FetchError::PartialFailure { failed: 1, total: 3 }
        );
    }

    #[test]
    fn test_empty_outcome() {
        let outcome = BatchOutcome::default();
        assert!(outcome.is_complete());
        assert_eq!(outcome.batch_count(), 0);
        assert!(outcome.into_rows().is_empty());
    }

    #[test]
    fn test_failure_serializes_error_message() {
        let failure = BatchFailure {
            index: 0,
            size: 2,
            error: FetchError::Timeout,
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["index"], 0);
        assert!(json["error"].as_str().unwrap().contains("timed out"));
    }
}
