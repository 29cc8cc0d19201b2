use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoyagrError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "excel")]
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Unknown agency: {0}")]
    UnknownAgency(String),

    #[error("No agency given. Pass --agency or set default_agency in settings.")]
    NoAgency,

    #[error("Too many imports for this agency; try again in {retry_after}s")]
    RateLimited { retry_after: i64 },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VoyagrError>;
