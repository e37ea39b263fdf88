use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;

use quick_xml::escape::{escape, resolve_html5_entity};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Elements whose body is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// A start tag with lower-cased name and its (unescaped) attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Tag {
    #[cfg(test)]
    pub fn new(name: &str, attrs: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag(Tag),
    EndTag(String),
    /// Raw text, character references still encoded (see [`TokenStream`]).
    Text(String),
    Eof,
    Error(String),
}

#[cfg(test)]
impl Token {
    pub fn text(text: &str) -> Self {
        Token::Text(text.to_string())
    }

    pub fn end(name: &str) -> Self {
        Token::EndTag(name.to_string())
    }
}

impl Token {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Token::Eof | Token::Error(_))
    }
}

/// Renders the token back as markup, e.g. `</textarea>` for an end tag.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::StartTag(tag) => {
                write!(f, "<{}", tag.name)?;
                for (key, value) in &tag.attrs {
                    write!(f, " {}=\"{}\"", key, escape(value.as_str()))?;
                }
                f.write_str(">")
            }
            Token::EndTag(name) => write!(f, "</{}>", name),
            Token::Text(text) => f.write_str(text),
            Token::Eof | Token::Error(_) => Ok(()),
        }
    }
}

/// Pull-based source of tokens. Once `Eof` or `Error` is returned, every
/// later call returns `Eof`.
///
/// `Text` tokens and the bodies of raw-text elements are emitted still
/// encoded, as they appear in the markup; consumers decode them with
/// [`unescape`]. Attribute values on `StartTag` are already decoded.
pub trait TokenStream {
    fn next_token(&mut self) -> Token;
}

/// Canned token sequences: anything yielding tokens is a stream.
impl<I: Iterator<Item = Token>> TokenStream for I {
    fn next_token(&mut self) -> Token {
        self.next().unwrap_or(Token::Eof)
    }
}

/// Longest entity name worth looking up, `;` excluded.
const MAX_REFERENCE_LEN: usize = 32;

/// Decode HTML character references one by one. References that cannot be
/// resolved are left as written.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_REFERENCE_LEN)
            .and_then(|end| resolve_reference(&rest[1..=end]).map(|text| (text, end + 2)));
        match decoded {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// `name` is the part between `&` and `;`.
fn resolve_reference(name: &str) -> Option<String> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_html5_entity(name).map(String::from)
}

/// Lenient HTML tokenizer over a markup string.
pub struct MarkupTokens<'a> {
    markup: &'a str,
    /// Where `reader` starts within `markup`.
    offset: usize,
    reader: Reader<&'a [u8]>,
    pending: VecDeque<Token>,
    done: bool,
}

fn lenient_reader(markup: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    reader
}

impl<'a> MarkupTokens<'a> {
    pub fn new(markup: &'a str) -> Self {
        Self {
            markup,
            offset: 0,
            reader: lenient_reader(markup),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn position(&self) -> usize {
        self.offset + self.reader.buffer_position() as usize
    }

    fn fail(&mut self, err: quick_xml::Error) -> Token {
        self.done = true;
        self.pending.clear();
        Token::Error(format!("markup error near byte {}: {}", self.position(), err))
    }

    /// Queue the body and end tag of a raw-text element, then resume
    /// tokenizing after its end tag. The body is taken verbatim, so `<` and
    /// `&` inside scripts never reach the markup reader. Without an end tag
    /// the rest of the input is the body.
    fn read_raw_body(&mut self, name: &str) {
        let markup = self.markup;
        let start = self.position();
        let rest = &markup[start..];
        let Some((body_len, resume)) = find_end_tag(rest, name) else {
            if !rest.is_empty() {
                self.pending.push_back(Token::Text(rest.to_string()));
            }
            self.done = true;
            return;
        };

        if body_len > 0 {
            self.pending.push_back(Token::Text(rest[..body_len].to_string()));
        }
        self.pending.push_back(Token::EndTag(name.to_string()));
        self.offset = start + resume;
        self.reader = lenient_reader(&markup[self.offset..]);
    }
}

/// Locate `</name ...>` (ASCII case-insensitive) in `text`. Returns the
/// length of the body before it and the offset just past its `>`.
fn find_end_tag(text: &str, name: &str) -> Option<(usize, usize)> {
    let lower = text.to_ascii_lowercase();
    let needle = format!("</{}", name);
    let mut from = 0;
    while let Some(found) = lower[from..].find(&needle) {
        let at = from + found;
        let after = at + needle.len();
        match lower.as_bytes().get(after) {
            Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c') => {
                let close = lower[after..].find('>').map_or(text.len(), |i| after + i + 1);
                return Some((at, close));
            }
            None => return Some((at, text.len())),
            // e.g. `</scripts`
            Some(_) => from = after,
        }
    }
    None
}

impl TokenStream for MarkupTokens<'_> {
    fn next_token(&mut self) -> Token {
        if let Some(token) = self.pending.pop_front() {
            return token;
        }
        if self.done {
            return Token::Eof;
        }

        loop {
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => return self.fail(e),
            };
            match event {
                Event::Start(e) => {
                    let tag = read_tag(&e);
                    if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                        self.read_raw_body(&tag.name);
                    }
                    return Token::StartTag(tag);
                }
                Event::Empty(e) => return Token::StartTag(read_tag(&e)),
                Event::End(e) => return Token::EndTag(lowercase(e.name().as_ref())),
                Event::Text(e) => return Token::Text(String::from_utf8_lossy(&e).into_owned()),
                Event::CData(e) => return Token::Text(String::from_utf8_lossy(&e).into_owned()),
                Event::Eof => {
                    self.done = true;
                    return Token::Eof;
                }
                // comments, doctype, declarations
                _ => continue,
            }
        }
    }
}

fn read_tag(start: &BytesStart) -> Tag {
    let attrs = start
        .html_attributes()
        .filter_map(Result::ok)
        .map(|attr| {
            let value = String::from_utf8_lossy(&attr.value);
            (lowercase(attr.key.as_ref()), unescape(&value).into_owned())
        })
        .collect();
    Tag {
        name: lowercase(start.name().as_ref()),
        attrs,
    }
}

fn lowercase(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(markup: &str) -> Vec<Token> {
        let mut stream = MarkupTokens::new(markup);
        let mut tokens = Vec::new();
        loop {
            let token = stream.next_token();
            if token.is_terminal() {
                tokens.push(token);
                return tokens;
            }
            tokens.push(token);
        }
    }

    #[test]
    fn start_text_end() {
        let tokens = collect("<p class=\"x\">hello</p>");
        assert_eq!(tokens[0], Token::StartTag(Tag::new("p", &[("class", "x")])));
        assert_eq!(tokens[1], Token::text("hello"));
        assert_eq!(tokens[2], Token::end("p"));
        assert_eq!(tokens[3], Token::Eof);
    }

    #[test]
    fn names_are_lowercased() {
        let tokens = collect("<INPUT ID=\"a\"></TD>");
        assert_eq!(tokens[0], Token::StartTag(Tag::new("input", &[("id", "a")])));
        assert_eq!(tokens[1], Token::end("td"));
    }

    #[test]
    fn html_attributes_unescaped_and_valueless() {
        let tokens = collect("<option value=\"a &amp; b\" selected>x</option>");
        let Token::StartTag(tag) = &tokens[0] else {
            panic!("expected start tag, got {:?}", tokens[0]);
        };
        assert_eq!(tag.attr("value"), Some("a & b"));
        assert_eq!(tag.attr("selected"), Some(""));
    }

    #[test]
    fn unclosed_void_elements_do_not_fail() {
        let tokens = collect("<td><input id=\"x\" value=\"1\"></td><br>");
        assert!(tokens.iter().all(|t| !matches!(t, Token::Error(_))));
        assert_eq!(tokens.last(), Some(&Token::Eof));
    }

    #[test]
    fn self_closing_is_a_start_tag() {
        let tokens = collect("<input id=\"x\"/>");
        assert_eq!(tokens[0], Token::StartTag(Tag::new("input", &[("id", "x")])));
        assert_eq!(tokens[1], Token::Eof);
    }

    #[test]
    fn comments_and_doctype_skipped() {
        let tokens = collect("<!DOCTYPE html><!-- note --><b>x</b>");
        assert_eq!(tokens[0], Token::StartTag(Tag::new("b", &[])));
    }

    #[test]
    fn textarea_body_is_raw_text() {
        let tokens = collect("<textarea id=\"n\">a <b> &lt; c</textarea><textarea id=\"e\"></textarea>");
        assert_eq!(tokens[1], Token::text("a <b> &lt; c"));
        assert_eq!(tokens[2], Token::end("textarea"));
        // empty body: straight to the end tag
        assert_eq!(tokens[4], Token::end("textarea"));
    }

    #[test]
    fn truncated_markup_ends_with_error_then_eof() {
        let mut stream = MarkupTokens::new("<p>ok</p><div class=\"x");
        let mut saw_error = false;
        for _ in 0..10 {
            match stream.next_token() {
                Token::Error(_) => saw_error = true,
                Token::Eof => break,
                _ => {}
            }
        }
        assert!(saw_error);
        assert_eq!(stream.next_token(), Token::Eof);
        assert_eq!(stream.next_token(), Token::Eof);
    }

    #[test]
    fn display_renders_markup() {
        assert_eq!(Token::end("textarea").to_string(), "</textarea>");
        assert_eq!(Token::text("a &amp; b").to_string(), "a &amp; b");
        assert_eq!(Token::Eof.to_string(), "");
    }

    #[test]
    fn unescape_html_entities() {
        assert_eq!(unescape("caf&eacute; &amp; &#39;x&#39; &#x41;"), "café & 'x' A");
        assert_eq!(unescape("AT&T"), "AT&T");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn unescape_keeps_unknown_references_only() {
        assert_eq!(unescape("a & b; c &amp; d"), "a & b; c & d");
        assert_eq!(unescape("Q&amp;A &bogus; here"), "Q&A &bogus; here");
        assert_eq!(unescape("&; &#; &#xZZ; &lt;"), "&; &#; &#xZZ; <");
        assert_eq!(unescape("trailing &"), "trailing &");
    }

    #[test]
    fn script_body_may_contain_markup_characters() {
        let tokens = collect("<script>if (a < b && c) { x(\"<p>\"); }</script><p>after</p>");
        assert_eq!(tokens[0], Token::StartTag(Tag::new("script", &[])));
        assert_eq!(tokens[1], Token::text("if (a < b && c) { x(\"<p>\"); }"));
        assert_eq!(tokens[2], Token::end("script"));
        assert_eq!(tokens[3], Token::StartTag(Tag::new("p", &[])));
        assert_eq!(tokens[4], Token::text("after"));
        assert_eq!(tokens[5], Token::end("p"));
        assert_eq!(tokens[6], Token::Eof);
    }

    #[test]
    fn raw_text_end_tag_is_case_insensitive() {
        let tokens = collect("<SCRIPT>x</Script ><b>y</b>");
        assert_eq!(tokens[1], Token::text("x"));
        assert_eq!(tokens[2], Token::end("script"));
        assert_eq!(tokens[3], Token::StartTag(Tag::new("b", &[])));
    }

    #[test]
    fn raw_text_needs_exact_end_tag_name() {
        let tokens = collect("<script>a</scripts>b</script>");
        assert_eq!(tokens[1], Token::text("a</scripts>b"));
        assert_eq!(tokens[2], Token::end("script"));
        assert_eq!(tokens[3], Token::Eof);
    }

    #[test]
    fn unterminated_script_runs_to_end_of_input() {
        let tokens = collect("<script>var a = 1 < 2;");
        assert_eq!(tokens[1], Token::text("var a = 1 < 2;"));
        assert_eq!(tokens[2], Token::Eof);
    }

    #[test]
    fn canned_iterator_is_a_stream() {
        let mut stream = vec![Token::text("a")].into_iter();
        assert_eq!(stream.next_token(), Token::text("a"));
        assert_eq!(stream.next_token(), Token::Eof);
    }
}
