//! Embedded document store backed by SQLite.
//!
//! Each collection is a table holding one JSON document per row. Documents
//! are inserted individually in autocommit mode, with no deduplication.

use super::RecordSink;
use crate::shape::ShapedRecord;
use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};
use std::path::Path;

pub struct DocumentStoreSink {
    connection: Option<Connection>,
    insert_sql: String,
    collection: String,
    inserted: u64,
}

impl DocumentStoreSink {
    /// Open (or create) the database and make sure the collection exists.
    pub fn open<P: AsRef<Path>>(database: P, collection: &str) -> Result<Self> {
        validate_collection_name(collection)?;
        let database = database.as_ref();
        let connection = Connection::open(database)
            .with_context(|| format!("Store: Failed to open database {:?}", database))?;
        Self::with_connection(connection, collection)
    }

    #[cfg(test)]
    pub fn in_memory(collection: &str) -> Result<Self> {
        validate_collection_name(collection)?;
        let connection =
            Connection::open_in_memory().context("Store: Failed to open in-memory database")?;
        Self::with_connection(connection, collection)
    }

    fn with_connection(connection: Connection, collection: &str) -> Result<Self> {
        connection
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{collection}\" (
                    _id INTEGER PRIMARY KEY AUTOINCREMENT,
                    document TEXT NOT NULL
                )"
            ))
            .with_context(|| format!("Store: Failed to create collection {:?}", collection))?;

        Ok(Self {
            connection: Some(connection),
            insert_sql: format!("INSERT INTO \"{collection}\" (document) VALUES (?1)"),
            collection: collection.to_string(),
            inserted: 0,
        })
    }

    /// Count documents in the collection.
    #[cfg(test)]
    pub fn count(&self) -> Result<u64> {
        let connection = self.connection()?;
        let count: i64 = connection
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", self.collection), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("Store: Failed to count {:?}", self.collection))?;
        Ok(u64::try_from(count)?)
    }

    fn connection(&self) -> Result<&Connection> {
        match &self.connection {
            Some(connection) => Ok(connection),
            None => bail!("Store: Collection {:?} is already closed", self.collection),
        }
    }
}

impl RecordSink for DocumentStoreSink {
    fn add_record(&mut self, record: ShapedRecord) -> Result<()> {
        let document = serde_json::to_string(&record)?;
        {
            let connection = self.connection()?;
            let mut statement = connection
                .prepare_cached(&self.insert_sql)
                .context("Store: Failed to prepare insert")?;
            statement
                .execute(params![document])
                .with_context(|| format!("Store: Failed to insert into {:?}", self.collection))?;
        }
        self.inserted += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection
                .close()
                .map_err(|(_, err)| err)
                .context("Store: Failed to close database")?;
            tracing::info!(
                "Store: {} documents inserted into {:?}",
                self.inserted,
                self.collection
            );
        }
        Ok(())
    }
}

/// Collection names become table names, so only plain identifiers are
/// accepted.
fn validate_collection_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("Store: Invalid collection name {:?}", name);
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        bail!("Store: Collection name {:?} is reserved", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::FieldValue;
    use tempfile::tempdir;

    fn record(kind: &str, id: &str) -> ShapedRecord {
        let mut record = ShapedRecord::new();
        record.insert("type", FieldValue::Text(kind.into()));
        record.insert("id", FieldValue::Text(id.into()));
        record
    }

    #[test]
    fn inserts_one_document_per_record() {
        let mut sink = DocumentStoreSink::in_memory("elements").unwrap();
        sink.add_record(record("node", "1")).unwrap();
        sink.add_record(record("way", "2")).unwrap();

        assert_eq!(sink.count().unwrap(), 2);
    }

    #[test]
    fn duplicate_records_are_not_deduplicated() {
        let mut sink = DocumentStoreSink::in_memory("elements").unwrap();
        sink.add_record(record("node", "1")).unwrap();
        sink.add_record(record("node", "1")).unwrap();
        assert_eq!(sink.count().unwrap(), 2);
    }

    #[test]
    fn documents_are_queryable_after_finish() {
        let dir = tempdir().unwrap();
        let database = dir.path().join("osm.sqlite3");

        let mut sink = DocumentStoreSink::open(&database, "perth").unwrap();
        sink.add_record(record("node", "1")).unwrap();
        sink.add_record(record("way", "2")).unwrap();
        sink.finish().unwrap();

        let connection = Connection::open(&database).unwrap();
        let way_id: String = connection
            .query_row(
                "SELECT json_extract(document, '$.id') FROM perth \
                 WHERE json_extract(document, '$.type') = 'way'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(way_id, "2");
    }

    #[test]
    fn reopening_appends_to_collection() {
        let dir = tempdir().unwrap();
        let database = dir.path().join("osm.sqlite3");

        for id in ["1", "2"] {
            let mut sink = DocumentStoreSink::open(&database, "elements").unwrap();
            sink.add_record(record("node", id)).unwrap();
            sink.finish().unwrap();
        }

        let sink = DocumentStoreSink::open(&database, "elements").unwrap();
        assert_eq!(sink.count().unwrap(), 2);
    }

    #[test]
    fn insert_after_finish_fails() {
        let mut sink = DocumentStoreSink::in_memory("elements").unwrap();
        sink.finish().unwrap();
        assert!(sink.add_record(record("node", "1")).is_err());
    }

    #[test]
    fn rejects_unsafe_collection_names() {
        for name in ["", "1st", "drop table", "a\"b", "sqlite_master"] {
            assert!(DocumentStoreSink::in_memory(name).is_err(), "{name:?}");
        }
        assert!(DocumentStoreSink::in_memory("_osm_2024").is_ok());
    }
}
