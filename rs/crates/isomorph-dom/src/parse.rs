//! Markup → ViewNode parser.
//!
//! Every element must be closed explicitly (void elements and `/>` aside).
//! Markup that a browser would quietly repair is a [`ParseError`] here.

use crate::{html::RAW_TEXT_ELEMENTS, html::VOID_ELEMENTS, Attributes, ViewNode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of markup at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("<{tag}> opened at byte {offset} is never closed")]
    Unclosed { tag: String, offset: usize },
    #[error("closing tag </{found}> at byte {offset} does not match open <{expected}>")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },
    #[error("closing tag </{tag}> at byte {offset} has no open element")]
    StrayClose { tag: String, offset: usize },
    #[error("void element <{tag}> cannot be closed (byte {offset})")]
    VoidClose { tag: String, offset: usize },
    #[error("malformed tag at byte {offset}")]
    MalformedTag { offset: usize },
    #[error("malformed attribute at byte {offset}")]
    MalformedAttribute { offset: usize },
}

/// Inter-element formatting: text made only of ASCII whitespace. Such text is
/// never part of a parsed tree.
pub fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_whitespace())
}

/// Parse a markup fragment into its top-level nodes.
pub fn parse_fragment(markup: &str) -> Result<Vec<ViewNode>, ParseError> {
    Parser::new(markup).run()
}

/// Parse a complete HTML document. The doctype and comments are skipped; the
/// `<html>` element is returned among the top-level nodes.
pub fn parse_document(markup: &str) -> Result<Vec<ViewNode>, ParseError> {
    Parser::new(markup.trim_start_matches('\u{feff}')).run()
}

struct Open {
    tag: String,
    attributes: Attributes,
    children: Vec<ViewNode>,
    offset: usize,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    stack: Vec<Open>,
    roots: Vec<ViewNode>,
    text_start: Option<usize>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            stack: Vec::new(),
            roots: Vec::new(),
            text_start: None,
        }
    }

    fn run(mut self) -> Result<Vec<ViewNode>, ParseError> {
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            if rest.starts_with("<!--") {
                self.flush_text();
                let end = rest.find("-->").ok_or(ParseError::UnexpectedEof {
                    offset: self.src.len(),
                })?;
                self.pos += end + 3;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                // <!DOCTYPE html> and friends
                self.flush_text();
                let end = rest.find('>').ok_or(ParseError::UnexpectedEof {
                    offset: self.src.len(),
                })?;
                self.pos += end + 1;
            } else if rest.starts_with("</") {
                self.flush_text();
                self.close_tag()?;
            } else if rest.starts_with('<') && rest.as_bytes().get(1).is_some_and(u8::is_ascii_alphabetic) {
                self.flush_text();
                self.open_tag()?;
            } else {
                // Text up to the next '<'; a '<' that starts no tag is literal.
                self.text_start.get_or_insert(self.pos);
                let skip = if rest.starts_with('<') { 1 } else { 0 };
                self.pos += rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
            }
        }
        self.flush_text();

        if let Some(open) = self.stack.pop() {
            return Err(ParseError::Unclosed {
                tag: open.tag,
                offset: open.offset,
            });
        }
        Ok(self.roots)
    }

    fn push(&mut self, node: ViewNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    /// Whitespace-only runs between tags are formatting, not content.
    fn flush_text(&mut self) {
        if let Some(start) = self.text_start.take() {
            let text = decode_entities(&self.src[start..self.pos]);
            if !is_blank(&text) {
                self.push(ViewNode::text(text));
            }
        }
    }

    fn open_tag(&mut self) -> Result<(), ParseError> {
        let offset = self.pos;
        self.pos += 1;
        let tag = self.name().ok_or(ParseError::MalformedTag { offset })?;
        let mut attributes = Attributes::new();

        let self_closing = loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof { offset: self.pos }),
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.peek() != Some(b'>') {
                        return Err(ParseError::MalformedTag { offset: self.pos - 1 });
                    }
                    self.pos += 1;
                    break true;
                }
                Some(_) => {
                    let (name, value) = self.attribute()?;
                    // First occurrence wins, as in browsers.
                    attributes.entry(name).or_insert(value);
                }
            }
        };

        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            self.push(ViewNode::element(tag, attributes, Vec::new()));
            return Ok(());
        }

        let mut children = Vec::new();
        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let end = self.find_raw_end(&tag).ok_or_else(|| ParseError::Unclosed {
                tag: tag.clone(),
                offset,
            })?;
            let raw = &self.src[self.pos..end];
            if !is_blank(raw) {
                children.push(ViewNode::text(raw));
            }
            self.pos = end;
        }
        self.stack.push(Open {
            tag,
            attributes,
            children,
            offset,
        });
        Ok(())
    }

    fn close_tag(&mut self) -> Result<(), ParseError> {
        let offset = self.pos;
        self.pos += 2;
        if !self.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
            return Err(ParseError::MalformedTag { offset });
        }
        let tag = self.name().ok_or(ParseError::MalformedTag { offset })?;
        self.skip_ws();
        match self.peek() {
            Some(b'>') => self.pos += 1,
            None => return Err(ParseError::UnexpectedEof { offset: self.pos }),
            Some(_) => return Err(ParseError::MalformedTag { offset }),
        }

        if VOID_ELEMENTS.contains(&tag.as_str()) {
            return Err(ParseError::VoidClose { tag, offset });
        }
        let open = match self.stack.pop() {
            Some(open) if open.tag == tag => open,
            Some(open) => {
                return Err(ParseError::MismatchedClose {
                    expected: open.tag,
                    found: tag,
                    offset,
                })
            }
            None => return Err(ParseError::StrayClose { tag, offset }),
        };
        self.push(ViewNode::element(open.tag, open.attributes, open.children));
        Ok(())
    }

    fn attribute(&mut self) -> Result<(String, String), ParseError> {
        let offset = self.pos;
        let bytes = self.src.as_bytes();
        let start = self.pos;
        while let Some(&b) = bytes.get(self.pos) {
            if b.is_ascii_whitespace() || matches!(b, b'"' | b'\'' | b'>' | b'/' | b'=' | b'<') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ParseError::MalformedAttribute { offset });
        }
        let name = self.src[start..self.pos].to_ascii_lowercase();

        self.skip_ws();
        if self.peek() != Some(b'=') {
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_ws();

        let value = match self.peek() {
            None => return Err(ParseError::UnexpectedEof { offset: self.pos }),
            Some(quote @ (b'"' | b'\'')) => {
                let open = self.pos + 1;
                let len = self.src[open..]
                    .find(quote as char)
                    .ok_or(ParseError::UnexpectedEof { offset: self.src.len() })?;
                self.pos = open + len + 1;
                &self.src[open..open + len]
            }
            Some(_) => {
                let open = self.pos;
                while let Some(&b) = bytes.get(self.pos) {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    if matches!(b, b'"' | b'\'' | b'<' | b'=' | b'`') {
                        return Err(ParseError::MalformedAttribute { offset });
                    }
                    self.pos += 1;
                }
                if self.pos == open {
                    return Err(ParseError::MalformedAttribute { offset });
                }
                &self.src[open..self.pos]
            }
        };
        Ok((name, decode_entities(value)))
    }

    /// Tag name at the cursor, lower-cased.
    fn name(&mut self) -> Option<String> {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        if !bytes.get(start)?.is_ascii_alphabetic() {
            return None;
        }
        while bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
        {
            self.pos += 1;
        }
        Some(self.src[start..self.pos].to_ascii_lowercase())
    }

    /// Byte offset of the `</tag` that ends a raw text element.
    fn find_raw_end(&self, tag: &str) -> Option<usize> {
        let bytes = self.src.as_bytes();
        let mut from = self.pos;
        while let Some(i) = self.src[from..].find("</") {
            let at = from + i;
            let name = bytes.get(at + 2..at + 2 + tag.len())?;
            if name.eq_ignore_ascii_case(tag.as_bytes()) {
                return Some(at);
            }
            from = at + 2;
        }
        None
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        match decode_entity(rest) {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                // Unknown or bare '&' is kept literally.
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the entity at the start of `s` (which begins with '&').
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let (end, _) = s.char_indices().take(12).find(|&(_, c)| c == ';')?;
    let body = &s[1..end];
    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let num = body.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((ch, end + 1))
}
