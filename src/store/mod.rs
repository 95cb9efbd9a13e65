//! Tabular storage for upload records.
//!
//! A store is addressed by a fixed identifier and holds named tabs. Each tab
//! has a header row and is only ever appended to.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;

pub use memory::MemoryTableStore;
pub use postgres::PgTableStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Column { name, kind: ColumnKind::Text }
    }

    pub const fn integer(name: &'static str) -> Self {
        Column { name, kind: ColumnKind::Integer }
    }
}

/// Header written when a tab is created.
pub const HEADER: [Column; 6] = [
    Column::text("Name"),
    Column::text("Bucket"),
    Column::integer("Size"),
    Column::text("ContentType"),
    Column::text("CreatedAt"),
    Column::text("Source"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
}

#[derive(Debug)]
pub enum StoreError {
    TabNotFound(String),
    HeaderMismatch { tab: String, found: Vec<String> },
    RowShape { expected: usize, got: usize },
    Unavailable(String),
    Database(sqlx::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::TabNotFound(tab) => write!(f, "tab '{}' does not exist", tab),
            StoreError::HeaderMismatch { tab, found } => {
                write!(f, "tab '{}' has unexpected header [{}]", tab, found.join(", "))
            }
            StoreError::RowShape { expected, got } => {
                write!(f, "row has {} cells, header has {}", got, expected)
            }
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
            StoreError::Database(err) => write!(f, "database error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Opens `tab`, creating it with `header` if it does not exist.
    /// Returns `true` when the tab was created by this call.
    async fn ensure_tab(&self, tab: &str, header: &[Column]) -> Result<bool, StoreError>;

    async fn read_header(&self, tab: &str) -> Result<Vec<String>, StoreError>;

    async fn append_row(&self, tab: &str, row: &[Cell]) -> Result<(), StoreError>;
}

pub(crate) fn header_matches(found: &[String], expected: &[Column]) -> bool {
    found.len() == expected.len() && found.iter().zip(expected).all(|(a, b)| a == b.name)
}
