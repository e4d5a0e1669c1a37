use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Schema introspection failed: {0}")]
    Introspection(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, ScoutError>;

// Helper conversions
impl From<rusqlite::Error> for ScoutError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
