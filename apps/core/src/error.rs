use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset must be a JSON array of restaurant records, found {0}")]
    Shape(&'static str),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("stored value under `{key}` is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage write failed for `{key}`: {reason}")]
    Write { key: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown filter category `{0}`")]
    UnknownCategory(String),

    /// Categories that appear in option lists but have no predicate behind them.
    #[error("filter category `{0}` is not wired to a predicate")]
    UnsupportedCategory(String),

    #[error("unknown legend key `{0}`")]
    UnknownLegendKey(String),

    #[error("`{category}` takes yes or no, got `{value}`")]
    InvalidToggleValue { category: String, value: String },
}
