use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpasError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Unsupported file type: {0} (expected .xlsx, .xls or .csv)")]
    UnsupportedExtension(String),

    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Too many rows: {count} (limit {limit})")]
    TooManyRows { count: usize, limit: usize },

    #[error("Spreadsheet is empty: {0}")]
    EmptyFile(String),

    #[error("Missing mandatory columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Unknown campaign: {0}")]
    UnknownCampaign(String),

    #[error("Unknown assistance type: {0}")]
    UnknownAssistanceType(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification used when an error aborts a whole import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalKind {
    File,
    Header,
    Storage,
}

impl UpasError {
    pub fn fatal_kind(&self) -> FatalKind {
        match self {
            Self::Io(_)
            | Self::Csv(_)
            | Self::Spreadsheet(_)
            | Self::UnsupportedExtension(_)
            | Self::FileTooLarge { .. }
            | Self::TooManyRows { .. }
            | Self::EmptyFile(_) => FatalKind::File,
            Self::MissingColumns(_) => FatalKind::Header,
            _ => FatalKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, UpasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_names() {
        let err = UpasError::MissingColumns(vec!["sexe".into(), "laterality".into()]);
        assert_eq!(err.to_string(), "Missing mandatory columns: sexe, laterality");
    }

    #[test]
    fn test_fatal_kind_classification() {
        assert_eq!(UpasError::EmptyFile("a.csv".into()).fatal_kind(), FatalKind::File);
        assert_eq!(
            UpasError::FileTooLarge { size: 11, limit: 10 }.fatal_kind(),
            FatalKind::File
        );
        assert_eq!(UpasError::MissingColumns(vec![]).fatal_kind(), FatalKind::Header);
        assert_eq!(
            UpasError::Db(rusqlite::Error::InvalidQuery).fatal_kind(),
            FatalKind::Storage
        );
    }
}
