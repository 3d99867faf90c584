use anyhow::Result;

use crate::shape::ShapedRecord;

pub mod jsonl;
pub mod store;

pub use self::jsonl::JsonLinesSink;
pub use self::store::DocumentStoreSink;

/// Destination for shaped records. Records are handed over one at a time in
/// document order; `finish` flushes and releases whatever the sink holds.
pub trait RecordSink {
    fn add_record(&mut self, record: ShapedRecord) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}
