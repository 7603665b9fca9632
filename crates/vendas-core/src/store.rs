use tokio::sync::RwLock;

use crate::drive::{DriveClient, DriveError};
use crate::sheet::SheetSet;

/// Process-wide cache of the loaded spreadsheet set.
///
/// Initialization is lazy and memoized: the first `get` triggers a load and
/// later calls reuse the cached set until an explicit `reload`. Readers may
/// observe a set that a concurrent reload is about to replace; last writer
/// wins and staleness is acceptable here.
pub struct SheetStore {
    drive: DriveClient,
    sheets: RwLock<Option<SheetSet>>,
}

impl SheetStore {
    pub fn new(drive: DriveClient) -> Self {
        Self { drive, sheets: RwLock::new(None) }
    }

    /// A store whose cache is already populated. Used by tests and by
    /// callers that load out-of-band.
    pub fn with_sheets(drive: DriveClient, sheets: SheetSet) -> Self {
        Self { drive, sheets: RwLock::new(Some(sheets)) }
    }

    pub fn drive(&self) -> &DriveClient {
        &self.drive
    }

    /// The current sheet set, loading it on first use.
    ///
    /// Missing credentials memoize an empty set so the drive is not probed
    /// on every request. A transient load failure also yields an empty set
    /// but is NOT memoized, so the next request retries.
    pub async fn get(&self) -> SheetSet {
        if let Some(sheets) = self.sheets.read().await.as_ref() {
            return sheets.clone();
        }

        match self.drive.load_sheets().await {
            Ok(sheets) => {
                *self.sheets.write().await = Some(sheets.clone());
                sheets
            }
            Err(DriveError::NotConfigured) => {
                log::warn!("drive credentials not configured, continuing with no spreadsheet data");
                *self.sheets.write().await = Some(Vec::new());
                Vec::new()
            }
            Err(err) => {
                log::error!("spreadsheet load failed: {err}");
                Vec::new()
            }
        }
    }

    /// Replace the cached set wholesale and return the new sheet count.
    pub async fn reload(&self) -> Result<usize, DriveError> {
        let sheets = self.drive.load_sheets().await?;
        let count = sheets.len();
        *self.sheets.write().await = Some(sheets);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;
    use chrono::{TimeZone, Utc};

    fn sheet(name: &str) -> Sheet {
        Sheet {
            name: name.to_string(),
            last_modified: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            headers: vec!["a".to_string()],
            rows: vec![vec!["1".to_string()]],
            parse_warnings: 0,
        }
    }

    #[tokio::test]
    async fn preloaded_store_serves_its_sheets() {
        let store = SheetStore::with_sheets(
            DriveClient::new(None, None),
            vec![sheet("q1.csv"), sheet("q2.csv")],
        );

        let sheets = store.get().await;
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "q1.csv");
    }

    #[tokio::test]
    async fn unconfigured_store_degrades_to_empty() {
        let store = SheetStore::new(DriveClient::new(None, None));

        assert!(store.get().await.is_empty());
        // memoized: the second call takes the cached path
        assert!(store.get().await.is_empty());
    }

    #[tokio::test]
    async fn reload_on_unconfigured_store_is_an_error() {
        let store = SheetStore::new(DriveClient::new(None, None));
        let err = store.reload().await.unwrap_err();
        assert!(matches!(err, DriveError::NotConfigured));
    }
}
