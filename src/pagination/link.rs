//! `Link` header grammar
//!
//! ```text
//! link-header = link-value *( OWS "," OWS link-value )
//! link-value  = "<" URI-Reference ">" *( OWS ";" OWS link-param )
//! link-param  = token [ OWS "=" OWS ( token / quoted-string ) ]
//! ```
//!
//! Any deviation from the grammar rejects the whole header.

use crate::types::{HeaderMapping, PageCursor};

/// Header carrying pagination links (stored lower-cased)
pub const LINK_HEADER: &str = "link";

/// One `<target>; rel="..."` element of a `Link` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkValue {
    /// Link target, verbatim from between the angle brackets
    pub target: String,
    /// Lower-cased relation types; `rel="next last"` yields two entries
    pub rels: Vec<String>,
}

impl LinkValue {
    /// Whether this link carries the given relation type
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.iter().any(|r| r.eq_ignore_ascii_case(rel))
    }
}

/// Parse a complete `Link` header value
///
/// Returns `None` when the value is empty or does not follow the grammar.
pub fn parse_link_header(header: &str) -> Option<Vec<LinkValue>> {
    let mut parser = Parser::new(header);
    let mut links = Vec::new();

    loop {
        parser.skip_ws();
        if parser.at_end() {
            break;
        }

        let target = parser.target()?;
        let mut rels = Vec::new();
        loop {
            parser.skip_ws();
            if !parser.eat(b';') {
                break;
            }
            parser.skip_ws();
            let name = parser.token()?;
            parser.skip_ws();
            let value = if parser.eat(b'=') {
                parser.skip_ws();
                Some(parser.value()?)
            } else {
                None
            };
            if name.eq_ignore_ascii_case("rel") {
                if let Some(value) = value {
                    rels.extend(value.split_ascii_whitespace().map(str::to_ascii_lowercase));
                }
            }
        }
        links.push(LinkValue {
            target: target.to_string(),
            rels,
        });

        parser.skip_ws();
        if parser.at_end() {
            break;
        }
        if !parser.eat(b',') {
            return None;
        }
    }

    if links.is_empty() {
        None
    } else {
        Some(links)
    }
}

/// Extract the `rel="next"` target from a `Link` header value
pub fn next_cursor(header: Option<&str>) -> PageCursor {
    parse_link_header(header?)?
        .into_iter()
        .find(|link| link.has_rel("next"))
        .map(|link| link.target)
}

/// Extract the next cursor from a stored response's headers
pub fn next_cursor_from_headers(headers: &HeaderMapping) -> PageCursor {
    next_cursor(headers.get(LINK_HEADER).map(String::as_str))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    /// `"<" URI-Reference ">"`; the target may not be empty
    fn target(&mut self) -> Option<&'a str> {
        if !self.eat(b'<') {
            return None;
        }
        let input = self.input;
        let start = self.pos;
        let len = input[start..].find('>')?;
        let target = &input[start..start + len];
        if target.is_empty() || target.contains(['<', ' ']) {
            return None;
        }
        self.pos = start + len + 1;
        Some(target)
    }

    fn token(&mut self) -> Option<&'a str> {
        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(is_tchar) {
            self.pos += 1;
        }
        (self.pos > start).then(|| &input[start..self.pos])
    }

    fn value(&mut self) -> Option<String> {
        if self.peek() == Some(b'"') {
            self.quoted_string()
        } else {
            self.token().map(str::to_string)
        }
    }

    fn quoted_string(&mut self) -> Option<String> {
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.input[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += offset + 1;
                    return Some(out);
                }
                '\\' => out.push(chars.next()?.1),
                _ => out.push(c),
            }
        }
        None
    }
}

/// RFC 9110 `tchar`
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
