use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::sheet::{Sheet, SheetSet};
use crate::state::FileInfo;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

const SPREADSHEET_MIME_QUERY: &str = "mimeType='text/csv' \
     or mimeType='application/vnd.ms-excel' \
     or mimeType='application/vnd.openxmlformats-officedocument.spreadsheetml.sheet'";

const LIST_FIELDS: &str = "files(id, name, mimeType, modifiedTime, size)";

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("drive credentials are not configured")]
    NotConfigured,
    #[error("drive request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("drive api returned {status}: {details}")]
    Api { status: u16, details: String },
}

/// Metadata of one spreadsheet file, as returned by the drive listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    pub modified_time: DateTime<Utc>,
    /// The drive reports sizes as decimal strings, and omits them for
    /// google-native documents
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Client for the drive's REST surface: listing spreadsheet files and
/// downloading their content with a bearer token.
#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    folder_id: Option<String>,
}

impl DriveClient {
    pub fn new(token: Option<String>, folder_id: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: DRIVE_API_BASE.to_string(),
            token,
            folder_id,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// List spreadsheet files, optionally scoped to the configured folder.
    pub async fn list_files(&self) -> Result<Vec<DriveFile>, DriveError> {
        let token = self.token.as_ref().ok_or(DriveError::NotConfigured)?;

        let mut query = format!("({SPREADSHEET_MIME_QUERY})");
        if let Some(folder_id) = &self.folder_id {
            query.push_str(&format!(" and '{folder_id}' in parents"));
        }

        let response = self
            .http
            .get(format!("{}/files", self.base_url))
            .query(&[("q", query.as_str()), ("fields", LIST_FIELDS)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(DriveError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(DriveError::Api { status: status.as_u16(), details });
        }

        let list: FileListResponse = response.json().await.map_err(DriveError::Network)?;
        Ok(list.files)
    }

    /// Download one file's raw content.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let token = self.token.as_ref().ok_or(DriveError::NotConfigured)?;

        let response = self
            .http
            .get(format!("{}/files/{file_id}", self.base_url))
            .query(&[("alt", "media")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(DriveError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(DriveError::Api { status: status.as_u16(), details });
        }

        let bytes = response.bytes().await.map_err(DriveError::Network)?;
        Ok(bytes.to_vec())
    }

    /// List, download, and parse every CSV file into a fresh sheet set.
    ///
    /// A file that fails to download or parse is skipped with a warning and
    /// the rest of the set still loads; only the listing itself is fatal.
    pub async fn load_sheets(&self) -> Result<SheetSet, DriveError> {
        let files = self.list_files().await?;
        log::info!("found {} spreadsheet files in the drive", files.len());

        let mut sheets = Vec::new();
        for file in files.iter().filter(|f| is_csv(f)) {
            let content = match self.download(&file.id).await {
                Ok(content) => content,
                Err(err) => {
                    log::warn!("skipping {}: download failed: {err}", file.name);
                    continue;
                }
            };

            match Sheet::parse_csv(&file.name, file.modified_time, &content) {
                Ok(sheet) => {
                    log::info!("loaded {}: {} rows", sheet.name, sheet.row_count());
                    sheets.push(sheet);
                }
                Err(err) => {
                    log::warn!("skipping {}: {err}", file.name);
                }
            }
        }

        Ok(sheets)
    }
}

fn is_csv(file: &DriveFile) -> bool {
    file.mime_type == "text/csv" || file.name.to_lowercase().ends_with(".csv")
}

/// Shape the drive listing for the files endpoint: size rounded to whole
/// kilobytes, date formatted for display.
pub fn file_listing(files: &[DriveFile]) -> Vec<FileInfo> {
    files
        .iter()
        .map(|file| FileInfo {
            id: file.id.clone(),
            name: file.name.clone(),
            size: file
                .size
                .as_ref()
                .and_then(|s| s.parse::<u64>().ok())
                .map(|bytes| format!("{} KB", (bytes as f64 / 1024.0).round() as u64))
                .unwrap_or_else(|| "N/A".to_string()),
            last_modified: file.modified_time.format("%d/%m/%Y").to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn file(name: &str, mime_type: &str, size: Option<&str>) -> DriveFile {
        DriveFile {
            id: "abc123".to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            modified_time: Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
            size: size.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn unconfigured_client_does_not_list() {
        let client = DriveClient::new(None, None);
        let err = client.list_files().await.unwrap_err();
        assert!(matches!(err, DriveError::NotConfigured));
    }

    #[tokio::test]
    async fn unconfigured_client_does_not_download() {
        let client = DriveClient::new(None, None);
        let err = client.download("abc123").await.unwrap_err();
        assert!(matches!(err, DriveError::NotConfigured));
    }

    #[test]
    fn listing_formats_size_and_date() {
        let files = vec![file("q1.csv", "text/csv", Some("2048"))];
        let listing = file_listing(&files);

        assert_eq!(listing[0].size, "2 KB");
        assert_eq!(listing[0].last_modified, "15/03/2024");
    }

    #[test]
    fn listing_without_size_is_not_available() {
        let files = vec![file("report", "application/vnd.ms-excel", None)];
        let listing = file_listing(&files);

        assert_eq!(listing[0].size, "N/A");
    }

    #[test]
    fn csv_detection_by_mime_or_extension() {
        assert!(is_csv(&file("data", "text/csv", None)));
        assert!(is_csv(&file("DATA.CSV", "application/octet-stream", None)));
        assert!(!is_csv(&file("report.xlsx", "application/vnd.ms-excel", None)));
    }

    #[test]
    fn listing_parses_drive_payload() {
        let payload = r#"{
            "files": [
                {"id": "1", "name": "sales.csv", "mimeType": "text/csv",
                 "modifiedTime": "2024-03-15T10:00:00Z", "size": "512"}
            ]
        }"#;
        let list: FileListResponse = serde_json::from_str(payload).unwrap();

        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].name, "sales.csv");
        assert_eq!(list.files[0].size.as_deref(), Some("512"));
    }
}
