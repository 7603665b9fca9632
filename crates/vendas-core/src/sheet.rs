use chrono::{DateTime, Utc};

/// One parsed spreadsheet file.
///
/// Replaced wholesale on reload, never mutated in place. The header row is
/// modeled separately from the data rows, so `row_count` counts data only.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Data rows dropped during parsing (bad encoding, unreadable records)
    pub parse_warnings: usize,
}

/// The cached collection of sheets, in drive-listing order.
pub type SheetSet = Vec<Sheet>;

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("could not read csv header row: {0}")]
    Header(#[source] csv::Error),
}

impl Sheet {
    /// Parse CSV bytes into a sheet.
    ///
    /// One strategy only: the csv reader with flexible record lengths.
    /// A record that cannot be read (typically invalid UTF-8) is skipped and
    /// counted in `parse_warnings` rather than aborting the whole file; only
    /// an unreadable header row fails the parse.
    pub fn parse_csv(
        name: &str,
        last_modified: DateTime<Utc>,
        content: &[u8],
    ) -> Result<Sheet, SheetError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(content);

        let headers: Vec<String> = reader
            .headers()
            .map_err(SheetError::Header)?
            .iter()
            .map(|field| field.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        let mut parse_warnings = 0;
        for record in reader.records() {
            match record {
                Ok(record) => {
                    let row: Vec<String> =
                        record.iter().map(|field| field.trim().to_string()).collect();
                    if row.iter().any(|field| !field.is_empty()) {
                        rows.push(row);
                    }
                }
                Err(err) => {
                    log::warn!("skipping unreadable row in {name}: {err}");
                    parse_warnings += 1;
                }
            }
        }

        Ok(Sheet {
            name: name.to_string(),
            last_modified,
            headers,
            rows,
            parse_warnings,
        })
    }

    /// Number of data rows, excluding the header.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
