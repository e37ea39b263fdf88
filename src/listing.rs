use anyhow::{Context, Result};
use tracing::info;

use crate::client::PageSource;
use crate::error::ExportError;
use crate::parser::tokens::{MarkupTokens, Token, TokenStream};
use crate::records::ListingRow;

const LISTING_PATH: &str = "/search/search_event_advanced";

/// Fetch the listing page for a track, follow its CSV download link and
/// return the talk rows in listing order.
pub async fn fetch_rows<S: PageSource>(source: &S, devroom_id: &str) -> Result<Vec<ListingRow>> {
    info!("Fetching talk listing for track {}", devroom_id);
    let page = source
        .get(
            LISTING_PATH,
            &[
                ("search_event[0][key]", "conference_track_id"),
                ("search_event[0][type]", "list"),
                ("search_event[0][value]", devroom_id),
            ],
        )
        .await
        .context("Failed to fetch talk listing")?;

    let csv_url = find_csv_link(&mut MarkupTokens::new(&page))?;
    let csv = source
        .get(&csv_url, &[])
        .await
        .context("Failed to download listing CSV")?;

    let rows = parse_rows(&csv)?;
    info!("Listing has {} talks", rows.len());
    Ok(rows)
}

/// The `href` of the first anchor pointing at a CSV download.
pub fn find_csv_link<T: TokenStream + ?Sized>(tokens: &mut T) -> Result<String, ExportError> {
    loop {
        match tokens.next_token() {
            Token::StartTag(tag) if tag.name == "a" => {
                if let Some(href) = tag.attr("href").filter(|href| href.contains("csv")) {
                    return Ok(href.to_string());
                }
            }
            Token::Eof => return Err(ExportError::CsvLinkNotFound),
            Token::Error(e) => return Err(ExportError::ListingMarkup(e)),
            _ => {}
        }
    }
}

/// Parse the listing CSV, dropping the header row and rows with fewer
/// than two columns.
pub fn parse_rows(data: &str) -> Result<Vec<ListingRow>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        if let Some(row) = ListingRow::from_record(&record?) {
            rows.push(row);
        }
    }
    Ok(rows)
}
