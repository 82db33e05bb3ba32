//! Dataset loading.
//!
//! Turns an uploaded tabular file into the ordered review sequence the
//! batch consumes. Format is recognized by extension: `.csv` and `.xlsx`
//! are supported, anything else is rejected here, before a single
//! inference call is spent.

use std::path::Path;
use thiserror::Error;

use calamine::{open_workbook, Data, Reader, Xlsx};
use sentimeter_core::Review;

/// The column the dataset must carry, by this exact name.
pub const REVIEW_COLUMN: &str = "Review";

/// Errors producing the review sequence from a file.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported file format '{extension}': expected .xlsx or .csv")]
    UnsupportedFormat { extension: String },

    #[error("no 'Review' column found in the file")]
    MissingReviewColumn,

    #[error("failed to decode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to decode spreadsheet: {0}")]
    Spreadsheet(String),
}

/// Load the ordered review sequence from a `.csv` or `.xlsx` file.
///
/// The file must contain a column literally named `Review`; its values,
/// in row order, become the batch input. Cells outside that column are
/// ignored.
pub fn load_reviews(path: impl AsRef<Path>) -> Result<Vec<Review>, DatasetError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "csv" => load_csv(path),
        "xlsx" => load_xlsx(path),
        _ => Err(DatasetError::UnsupportedFormat { extension }),
    }
}

fn load_csv(path: &Path) -> Result<Vec<Review>, DatasetError> {
    let mut reader = csv::Reader::from_path(path)?;

    let column = reader
        .headers()?
        .iter()
        .position(|h| h == REVIEW_COLUMN)
        .ok_or(DatasetError::MissingReviewColumn)?;

    let mut reviews = Vec::new();
    for record in reader.records() {
        let record = record?;
        reviews.push(Review::new(record.get(column).unwrap_or_default()));
    }

    tracing::debug!(count = reviews.len(), "loaded reviews from csv");
    Ok(reviews)
}

fn load_xlsx(path: &Path) -> Result<Vec<Review>, DatasetError> {
    let mut workbook: Xlsx<std::io::BufReader<std::fs::File>> =
        open_workbook(path).map_err(|e: calamine::XlsxError| DatasetError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DatasetError::Spreadsheet("workbook has no sheets".to_string()))?
        .map_err(|e| DatasetError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(DatasetError::MissingReviewColumn)?;
    let column = header
        .iter()
        .position(|cell| matches!(cell, Data::String(s) if s == REVIEW_COLUMN))
        .ok_or(DatasetError::MissingReviewColumn)?;

    let reviews = rows
        .map(|row| Review::new(row.get(column).map(cell_text).unwrap_or_default()))
        .collect::<Vec<_>>();

    tracing::debug!(count = reviews.len(), "loaded reviews from xlsx");
    Ok(reviews)
}

/// Render one spreadsheet cell as review text.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_csv_happy_path() {
        let dir = tempdir().unwrap();
        let path = write_file(
            &dir,
            "reviews.csv",
            b"Id,Review,Rating\n1,\"Great product, would buy again\",5\n2,Terrible service,1\n",
        );

        let reviews = load_reviews(&path).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].text(), "Great product, would buy again");
        assert_eq!(reviews[1].text(), "Terrible service");
    }

    #[test]
    fn test_csv_missing_review_column() {
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "reviews.csv", b"Id,Comment\n1,hello\n");

        let err = load_reviews(&path).unwrap_err();
        assert!(matches!(err, DatasetError::MissingReviewColumn));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "reviews.json", b"[]");

        let err = load_reviews(&path).unwrap_err();
        match err {
            DatasetError::UnsupportedFormat { extension } => assert_eq!(extension, "json"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "reviews.CSV", b"Review\nfine\n");

        let reviews = load_reviews(&path).unwrap();
        assert_eq!(reviews.len(), 1);
    }

    #[test]
    fn test_garbage_xlsx_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "reviews.xlsx", b"definitely not a zip archive");

        let err = load_reviews(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Spreadsheet(_)));
    }

    #[test]
    fn test_empty_csv_has_no_header() {
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "reviews.csv", b"");

        // An empty file has no Review column to find
        assert!(load_reviews(&path).is_err());
    }
}
