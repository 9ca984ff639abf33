//! Route code partitioning
//!
//! The code column holds a fixed-width route code. Characters `[4, 7)` are the
//! book ("Libro") the record is grouped under, characters `[7, 13)` the route
//! ("Ruta") carried along with it. Codes shorter than ten characters, and records
//! without a usable code, belong to no partition.

use libros_common::types::Record;
use serde_json::Value;
use std::collections::BTreeMap;

/// Field added to every partitioned record holding its book
pub const LIBRO_FIELD: &str = "Libro";

/// Field added to every partitioned record holding its route
pub const RUTA_FIELD: &str = "Ruta";

const MIN_CODE_CHARS: usize = 10;
const LIBRO_CHARS: std::ops::Range<usize> = 4..7;
const RUTA_CHARS: std::ops::Range<usize> = 7..13;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionKey {
    pub libro: String,
    pub ruta: String,
}

impl PartitionKey {
    /// Slice a route code. Positions count characters, not bytes.
    pub fn parse(code: &str) -> Option<Self> {
        let chars: Vec<char> = code.chars().collect();
        if chars.len() < MIN_CODE_CHARS {
            return None;
        }

        let ruta_end = RUTA_CHARS.end.min(chars.len());
        Some(Self {
            libro: chars[LIBRO_CHARS].iter().collect(),
            ruta: chars[RUTA_CHARS.start..ruta_end].iter().collect(),
        })
    }
}

/// Text of a code cell. Spreadsheets may store purely numeric codes as numbers.
fn code_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Records grouped by book, in first-seen row order within each group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitions {
    pub groups: BTreeMap<String, Vec<Record>>,
    /// Records excluded for a missing or short code
    pub dropped: usize,
}

impl Partitions {
    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PartitionAssigner {
    code_column: String,
}

impl PartitionAssigner {
    pub fn new(code_column: impl Into<String>) -> Self {
        Self {
            code_column: code_column.into(),
        }
    }

    pub fn key_of(&self, record: &Record) -> Option<PartitionKey> {
        record
            .get(&self.code_column)
            .and_then(code_text)
            .and_then(|code| PartitionKey::parse(&code))
    }

    /// Decorate each record with its book and route and group it by book.
    pub fn assign(&self, records: Vec<Record>) -> Partitions {
        let mut partitions = Partitions::default();

        for mut record in records {
            let Some(key) = self.key_of(&record) else {
                partitions.dropped += 1;
                continue;
            };

            record.insert(LIBRO_FIELD.to_string(), Value::String(key.libro.clone()));
            record.insert(RUTA_FIELD.to_string(), Value::String(key.ruta));
            partitions.groups.entry(key.libro).or_default().push(record);
        }

        partitions
    }
}
