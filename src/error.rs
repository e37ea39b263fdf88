use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no CSV download link found on the listing page")]
    CsvLinkNotFound,

    #[error("no CSV download link found on the listing page ({0})")]
    ListingMarkup(String),

    #[error("token stream ended early: {0}")]
    Stream(String),

    #[error("malformed listing CSV: {0}")]
    Listing(#[from] csv::Error),
}
