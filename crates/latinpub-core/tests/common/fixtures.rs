//! Record builders shared by integration tests

use latinpub_core::{RawRecord, Record, RecordId};

/// Build an unnormalized record from optional title, creator and date
pub fn record(
    id: RecordId,
    title: Option<&str>,
    creator: Option<&str>,
    date: Option<&str>,
) -> Record {
    let raw = RawRecord {
        title: title.map(str::to_string),
        creator: creator.map(str::to_string),
        date_string: date.map(str::to_string),
        ..RawRecord::default()
    };
    Record::new(id, raw)
}

/// Build a record with a title and an integer year
pub fn titled(id: RecordId, title: &str, year: Option<i32>) -> Record {
    let date = year.map(|y| y.to_string());
    record(id, Some(title), None, date.as_deref())
}

/// Find a record by id in a slice
#[allow(dead_code)]
pub fn by_id(records: &[Record], id: RecordId) -> &Record {
    records
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("No record with id {}", id))
}
