pub mod form;
pub mod relation;
pub mod tokens;

use tracing::debug;

use crate::records::{PersonRecord, TalkRecord};
use form::scan_form;
use tokens::{Token, TokenStream};

/// Build a talk from its edit page: form fields plus the speaker found in
/// inline relation statements. A broken stream leaves the rest at defaults.
pub fn parse_talk<T: TokenStream + ?Sized>(id: &str, tokens: &mut T) -> TalkRecord {
    let mut talk = TalkRecord {
        id: id.to_string(),
        ..Default::default()
    };
    let scanned = scan_form(tokens, &mut talk, |token, talk| {
        if let Token::Text(text) = token {
            if let Some(speaker) = relation::speaker_id(text) {
                talk.speaker_id = speaker;
            }
        }
    });
    if let Err(e) = scanned {
        debug!(talk = id, error = %e, "talk page cut short");
    }
    talk
}

pub fn parse_person<T: TokenStream + ?Sized>(id: &str, tokens: &mut T) -> PersonRecord {
    let mut person = PersonRecord::default();
    if let Err(e) = scan_form(tokens, &mut person, |_, _| {}) {
        debug!(person = id, error = %e, "person page cut short");
    }
    person
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokens::MarkupTokens;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    #[test]
    fn talk_fixture() {
        let html = fixture("talk_edit.html");
        let talk = parse_talk("4211", &mut MarkupTokens::new(&html));
        assert_eq!(talk.id, "4211");
        assert_eq!(talk.title, "Rust & the \"Borrow\" Checker");
        assert_eq!(talk.subtitle, "");
        assert_eq!(talk.abstract_text, "Ownership, explained.\nNo <b>magic</b>.");
        assert_eq!(talk.description, "");
        assert_eq!(talk.notes, "Needs a projector");
        assert_eq!(talk.state, "accepted");
        assert_eq!(talk.progress, "confirmed");
        assert_eq!(talk.speaker_id, "1234");
        // filled in from the listing, not the page
        assert_eq!(talk.duration, "");
        assert_eq!(talk.start_time, "");
    }

    #[test]
    fn person_fixture() {
        let html = fixture("person_edit.html");
        let person = parse_person("1234", &mut MarkupTokens::new(&html));
        assert_eq!(person.first_name, "Ada");
        assert_eq!(person.last_name, "Lovelace");
        assert_eq!(person.email, "ada@example.org");
    }

    #[test]
    fn truncated_talk_page_keeps_leading_fields() {
        let html = fixture("talk_edit.html");
        let cut = html.find("event[abstract]").unwrap();
        let talk = parse_talk("4211", &mut MarkupTokens::new(&html[..cut]));
        assert_eq!(talk.title, "Rust & the \"Borrow\" Checker");
        assert_eq!(talk.abstract_text, "");
        assert_eq!(talk.speaker_id, "");
    }

    #[test]
    fn inline_script_with_comparisons() {
        let html = "<script>for (i=0;i<n;i++){ if (a < b && c) { x(); } }\n\
                    add_event_person('1','2','5','speaker','');</script>\
                    <input id=\"event[title]\" value=\"T\">";
        let talk = parse_talk("2", &mut MarkupTokens::new(html));
        assert_eq!(talk.speaker_id, "5");
        assert_eq!(talk.title, "T");
    }

    #[test]
    fn speaker_in_any_text_token() {
        let tokens = vec![
            Token::text("add_event_person('1','9','42','speaker','');"),
            Token::text("add_event_person('2','9','77','coordinator','');"),
        ];
        let talk = parse_talk("9", &mut tokens.into_iter());
        assert_eq!(talk.speaker_id, "42");
    }

    #[test]
    fn empty_page() {
        assert_eq!(parse_person("1", &mut MarkupTokens::new("")), PersonRecord::default());
    }
}
