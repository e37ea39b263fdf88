use std::io::Write;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::client::PageSource;
use crate::config::Config;
use crate::listing;
use crate::parser::{self, tokens::MarkupTokens};
use crate::records::{ListingRow, PersonRecord, TalkRecord};

pub const HEADER: &str =
    "ID,Title,Subtitle,Abstract,Description,Notes,Duration,State,Progress,FirstName,Email,LastName,StartTime";

/// Counts reported after an export.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub talks: usize,
    /// Talk pages that could not be fetched.
    pub missing_talks: usize,
    pub missing_people: usize,
}

/// Escape a value for a double-quoted column: `"` becomes `"",` and
/// newlines become a literal `\n`. Downstream consumers read this exact form.
pub fn sanitize(value: &str) -> String {
    value.replace('"', "\"\",").replace('\n', "\\n")
}

pub fn csv_line(talk: &TalkRecord, person: &PersonRecord) -> String {
    [
        &talk.id,
        &talk.title,
        &talk.subtitle,
        &talk.abstract_text,
        &talk.description,
        &talk.notes,
        &talk.duration,
        &talk.state,
        &talk.progress,
        &person.first_name,
        &person.email,
        &person.last_name,
        &talk.start_time,
    ]
    .iter()
    .map(|field| format!("\"{}\"", sanitize(field)))
    .collect::<Vec<_>>()
    .join(",")
}

/// Export every talk of the configured track to `out`, one line per listing
/// row, in listing order. Only the listing itself is fatal; unreachable talk
/// or person pages yield rows with empty fields.
pub async fn run<S: PageSource, W: Write>(source: &S, config: &Config, out: &mut W) -> Result<ExportStats> {
    let rows = listing::fetch_rows(source, &config.devroom_id).await?;
    writeln!(out, "{}", HEADER)?;

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} talks ({eta})")?
            .progress_chars("=> "),
    );

    let mut stats = ExportStats::default();
    for row in &rows {
        let (talk, fetched) = fetch_talk(source, row).await;
        if !fetched {
            stats.missing_talks += 1;
        }

        let person = if talk.speaker_id.is_empty() {
            PersonRecord::default()
        } else {
            match fetch_person(source, &talk.speaker_id).await {
                Some(person) => person,
                None => {
                    stats.missing_people += 1;
                    PersonRecord::default()
                }
            }
        };

        writeln!(out, "{}", csv_line(&talk, &person))?;
        stats.talks += 1;
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(stats)
}

async fn fetch_talk<S: PageSource>(source: &S, row: &ListingRow) -> (TalkRecord, bool) {
    let id = &row.talk_id;
    let (talk, fetched) = match source.get(&format!("/event/edit/{}", id), &[]).await {
        Ok(page) => (parser::parse_talk(id, &mut MarkupTokens::new(&page)), true),
        Err(e) => {
            debug!(talk = %id, error = %e, "talk page unavailable");
            (
                TalkRecord {
                    id: id.clone(),
                    ..Default::default()
                },
                false,
            )
        }
    };
    (talk.with_schedule(row), fetched)
}

async fn fetch_person<S: PageSource>(source: &S, id: &str) -> Option<PersonRecord> {
    match source.get(&format!("/person/edit/{}", id), &[]).await {
        Ok(page) => Some(parser::parse_person(id, &mut MarkupTokens::new(&page))),
        Err(e) => {
            debug!(person = id, error = %e, "person page unavailable");
            None
        }
    }
}
