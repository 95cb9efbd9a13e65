use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{header_matches, Cell, Column, StoreError, TableStore};

#[derive(Debug, Default)]
struct Tab {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Default)]
struct Inner {
    tabs: HashMap<String, Tab>,
    outage: Option<String>,
}

/// In-process table store, used for local runs (`TABLE_STORE=memory`) and tests.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    inner: Mutex<Inner>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_outage(&self, reason: Option<&str>) {
        self.lock().outage = reason.map(str::to_string);
    }

    pub fn rows(&self, tab: &str) -> Vec<Vec<Cell>> {
        self.lock().tabs.get(tab).map(|t| t.rows.clone()).unwrap_or_default()
    }

    pub fn has_tab(&self, tab: &str) -> bool {
        self.lock().tabs.contains_key(tab)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn available(inner: &Inner) -> Result<(), StoreError> {
        match &inner.outage {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn ensure_tab(&self, tab: &str, header: &[Column]) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        Self::available(&inner)?;

        if let Some(existing) = inner.tabs.get(tab) {
            if !header_matches(&existing.header, header) {
                return Err(StoreError::HeaderMismatch {
                    tab: tab.to_string(),
                    found: existing.header.clone(),
                });
            }
            return Ok(false);
        }

        inner.tabs.insert(
            tab.to_string(),
            Tab {
                header: header.iter().map(|c| c.name.to_string()).collect(),
                rows: Vec::new(),
            },
        );
        Ok(true)
    }

    async fn read_header(&self, tab: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.lock();
        Self::available(&inner)?;
        inner
            .tabs
            .get(tab)
            .map(|t| t.header.clone())
            .ok_or_else(|| StoreError::TabNotFound(tab.to_string()))
    }

    async fn append_row(&self, tab: &str, row: &[Cell]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::available(&inner)?;
        let tab = inner
            .tabs
            .get_mut(tab)
            .ok_or_else(|| StoreError::TabNotFound(tab.to_string()))?;

        if row.len() != tab.header.len() {
            return Err(StoreError::RowShape { expected: tab.header.len(), got: row.len() });
        }
        tab.rows.push(row.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HEADER;

    #[tokio::test]
    async fn creates_tab_once_with_header() {
        let store = MemoryTableStore::new();

        assert!(store.ensure_tab("uploads", &HEADER).await.unwrap());
        assert!(!store.ensure_tab("uploads", &HEADER).await.unwrap());
        assert_eq!(
            store.read_header("uploads").await.unwrap(),
            vec!["Name", "Bucket", "Size", "ContentType", "CreatedAt", "Source"]
        );
    }

    #[tokio::test]
    async fn append_requires_existing_tab_and_matching_width() {
        let store = MemoryTableStore::new();
        let row = vec![Cell::Text("a".into())];

        assert!(matches!(store.append_row("uploads", &row).await, Err(StoreError::TabNotFound(_))));

        store.ensure_tab("uploads", &HEADER).await.unwrap();
        assert!(matches!(
            store.append_row("uploads", &row).await,
            Err(StoreError::RowShape { expected: 6, got: 1 })
        ));
    }

    #[tokio::test]
    async fn rejects_tab_with_foreign_header() {
        let store = MemoryTableStore::new();
        store.ensure_tab("uploads", &[Column::text("Other")]).await.unwrap();

        assert!(matches!(
            store.ensure_tab("uploads", &HEADER).await,
            Err(StoreError::HeaderMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn outage_fails_every_call() {
        let store = MemoryTableStore::new();
        store.set_outage(Some("permission denied"));

        assert!(matches!(
            store.ensure_tab("uploads", &HEADER).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(!store.has_tab("uploads"));
    }
}
