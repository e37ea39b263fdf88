use tracing::trace;

use super::tokens::{unescape, Tag, Token, TokenStream};
use crate::error::ExportError;

/// Closing markers that show up in place of an empty field's body.
const EMPTY_BODY_MARKERS: &[&str] = &["</textarea>", "</td>"];

/// A record filled from an edit form. Element ids are resolved to field
/// tags through static tables, then written via `slot`.
pub trait FormRecord {
    type Field: Copy + 'static;

    /// `input`/`textarea` ids.
    const TEXT_FIELDS: &'static [(&'static str, Self::Field)];
    /// `select` ids.
    const SELECT_FIELDS: &'static [(&'static str, Self::Field)];

    fn slot(&mut self, field: Self::Field) -> &mut String;
}

fn lookup<F: Copy>(table: &[(&str, F)], tag: &Tag) -> Option<F> {
    let id = tag.attr("id")?;
    table.iter().find(|(key, _)| *key == id).map(|(_, f)| *f)
}

/// Scan a form page, filling `record`. Every token the scan does not consume
/// itself is handed to `inspect`.
///
/// A field matched twice keeps the later value. Returns an error if the
/// stream broke off; fields assigned before that point are kept.
pub fn scan_form<R, T, F>(tokens: &mut T, record: &mut R, mut inspect: F) -> Result<(), ExportError>
where
    R: FormRecord,
    T: TokenStream + ?Sized,
    F: FnMut(&Token, &mut R),
{
    loop {
        let token = tokens.next_token();
        let ended = match &token {
            Token::Eof => return Ok(()),
            Token::Error(e) => return Err(ExportError::Stream(e.clone())),
            Token::StartTag(tag) if tag.name == "input" || tag.name == "textarea" => {
                read_text_field(tag, tokens, record)
            }
            Token::StartTag(tag) if tag.name == "select" => read_select_field(tag, tokens, record),
            _ => None,
        };
        inspect(&token, record);

        match ended {
            Some(Token::Error(e)) => return Err(ExportError::Stream(e)),
            Some(_) => return Ok(()),
            None => {}
        }
    }
}

/// Returns the terminal token if the stream ended while reading the body.
fn read_text_field<R, T>(tag: &Tag, tokens: &mut T, record: &mut R) -> Option<Token>
where
    R: FormRecord,
    T: TokenStream + ?Sized,
{
    let field = lookup(R::TEXT_FIELDS, tag)?;
    let value = tag.attr("value").unwrap_or("");
    if !value.is_empty() {
        *record.slot(field) = value.to_string();
        return None;
    }

    // No value attribute: the content is whatever comes next.
    let body = tokens.next_token();
    let text = unescape(&body.to_string()).into_owned();
    *record.slot(field) = if EMPTY_BODY_MARKERS.contains(&text.as_str()) {
        String::new()
    } else {
        text
    };
    body.is_terminal().then_some(body)
}

fn read_select_field<R, T>(tag: &Tag, tokens: &mut T, record: &mut R) -> Option<Token>
where
    R: FormRecord,
    T: TokenStream + ?Sized,
{
    let field = lookup(R::SELECT_FIELDS, tag)?;
    let mut chosen = None;
    let mut ended = None;

    loop {
        let token = tokens.next_token();
        match token {
            Token::EndTag(ref name) if name == "select" => break,
            Token::StartTag(ref option) if option.name == "option" && is_selected(option) => {
                if let Some(value) = option.attr("value").filter(|v| !v.is_empty()) {
                    chosen = Some(value.to_string());
                }
            }
            Token::Eof | Token::Error(_) => {
                ended = Some(token);
                break;
            }
            _ => {}
        }
    }

    match chosen {
        Some(value) => *record.slot(field) = value,
        None => trace!(id = tag.attr("id").unwrap_or(""), "no option selected"),
    }
    ended
}

fn is_selected(option: &Tag) -> bool {
    matches!(option.attr("selected"), Some("" | "selected"))
}
