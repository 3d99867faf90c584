use anyhow::{Context, Result};

use crate::audit::KeyAudit;
use crate::config::CoordinatePolicy;
use crate::element::RawElement;
use crate::shape::{ShapeError, shape_element};
use crate::sinks::RecordSink;
use crate::utils::ProgressCounter;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Top-level elements read from the document.
    pub elements: u64,
    /// Records handed to the sink.
    pub records: u64,
    /// Elements dropped by [`CoordinatePolicy::Skip`].
    pub skipped: u64,
}

/// Shape every element and persist each record before reading the next.
pub fn process_map<I>(
    elements: I,
    sink: &mut dyn RecordSink,
    policy: CoordinatePolicy,
) -> Result<RunStats>
where
    I: IntoIterator<Item = Result<RawElement>>,
{
    let mut stats = RunStats::default();
    let mut progress = ProgressCounter::new("Shaping elements", 10_000);

    for element in elements {
        let element = element?;
        stats.elements += 1;
        progress.inc(1);

        let record = match shape_element(&element) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(err) => match policy {
                CoordinatePolicy::Abort => {
                    return Err(err).context("Pipeline: Failed to shape element");
                }
                CoordinatePolicy::Skip => {
                    log_skipped(&err);
                    stats.skipped += 1;
                    continue;
                }
            },
        };

        sink.add_record(record)?;
        stats.records += 1;
    }

    progress.finish();
    Ok(stats)
}

/// Classify the tag keys of every element without shaping anything.
pub fn audit_map<I>(elements: I) -> Result<KeyAudit>
where
    I: IntoIterator<Item = Result<RawElement>>,
{
    let mut audit = KeyAudit::default();
    let mut progress = ProgressCounter::new("Auditing elements", 10_000);

    for element in elements {
        audit.record_element(&element?);
        progress.inc(1);
    }

    progress.finish();
    Ok(audit)
}

fn log_skipped(err: &ShapeError) {
    tracing::warn!("Skipping element: {}", err);
}
