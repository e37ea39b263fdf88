use crate::parser::form::FormRecord;

/// Column holding the talk id.
const COL_ID: usize = 0;
/// Column holding the scheduled start, e.g. `10:30:00`.
const COL_START_TIME: usize = 5;
const COL_DURATION: usize = 7;

/// Literal first column of the listing's header row.
const HEADER_ID: &str = "ID";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TalkRecord {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub abstract_text: String,
    pub description: String,
    pub notes: String,
    pub duration: String,
    pub state: String,
    pub progress: String,
    pub start_time: String,
    /// Person id of the speaker, empty when none was found.
    pub speaker_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkField {
    Title,
    Subtitle,
    Abstract,
    Description,
    Notes,
    State,
    Progress,
}

impl FormRecord for TalkRecord {
    type Field = TalkField;

    const TEXT_FIELDS: &'static [(&'static str, TalkField)] = &[
        ("event[title]", TalkField::Title),
        ("event[subtitle]", TalkField::Subtitle),
        ("event[abstract]", TalkField::Abstract),
        ("event[description]", TalkField::Description),
        ("event[submission_notes]", TalkField::Notes),
    ];

    const SELECT_FIELDS: &'static [(&'static str, TalkField)] = &[
        ("event[event_state]", TalkField::State),
        ("event[event_state_progress]", TalkField::Progress),
    ];

    fn slot(&mut self, field: TalkField) -> &mut String {
        match field {
            TalkField::Title => &mut self.title,
            TalkField::Subtitle => &mut self.subtitle,
            TalkField::Abstract => &mut self.abstract_text,
            TalkField::Description => &mut self.description,
            TalkField::Notes => &mut self.notes,
            TalkField::State => &mut self.state,
            TalkField::Progress => &mut self.progress,
        }
    }
}

impl TalkRecord {
    /// Copy the schedule columns of the listing onto the talk. Start times
    /// lose a trailing `:00` seconds part.
    pub fn with_schedule(mut self, row: &ListingRow) -> Self {
        self.duration = row.duration.clone();
        self.start_time = row
            .start_time
            .strip_suffix(":00")
            .unwrap_or(&row.start_time)
            .to_string();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonField {
    FirstName,
    LastName,
    Email,
}

impl FormRecord for PersonRecord {
    type Field = PersonField;

    const TEXT_FIELDS: &'static [(&'static str, PersonField)] = &[
        ("person[first_name]", PersonField::FirstName),
        ("person[last_name]", PersonField::LastName),
        ("person[email]", PersonField::Email),
    ];

    const SELECT_FIELDS: &'static [(&'static str, PersonField)] = &[];

    fn slot(&mut self, field: PersonField) -> &mut String {
        match field {
            PersonField::FirstName => &mut self.first_name,
            PersonField::LastName => &mut self.last_name,
            PersonField::Email => &mut self.email,
        }
    }
}

/// One talk line of the listing CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub talk_id: String,
    pub start_time: String,
    pub duration: String,
}

impl ListingRow {
    /// `None` for the header row and for rows with fewer than two columns.
    pub fn from_record(record: &csv::StringRecord) -> Option<Self> {
        if record.len() < 2 {
            return None;
        }
        let column = |i: usize| record.get(i).unwrap_or("").to_string();
        let talk_id = column(COL_ID);
        if talk_id == HEADER_ID {
            return None;
        }
        Some(Self {
            talk_id,
            start_time: column(COL_START_TIME),
            duration: column(COL_DURATION),
        })
    }
}
