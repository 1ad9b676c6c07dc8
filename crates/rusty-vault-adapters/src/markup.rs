//! Minimal markup fragment parser and serializer for the in-memory document.
//!
//! Supports elements with quoted, unquoted and bare attributes, text, comments
//! (skipped), self-closing tags and the common void elements.

use thiserror::Error;

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unexpected end of markup at byte {0}")]
    UnexpectedEnd(usize),
    #[error("unexpected closing tag </{found}> at byte {at}")]
    UnexpectedClose { found: String, at: usize },
    #[error("unclosed element <{0}>")]
    Unclosed(String),
    #[error("invalid tag name at byte {0}")]
    InvalidName(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn parse_fragment(input: &str) -> Result<Vec<MarkupNode>, MarkupError> {
    let mut parser = Parser { input, pos: 0 };
    let mut stack: Vec<(String, Vec<(String, String)>, Vec<MarkupNode>)> = Vec::new();
    let mut top: Vec<MarkupNode> = Vec::new();

    while parser.pos < input.len() {
        let node = if parser.rest().starts_with("<!--") {
            parser.skip_comment()?;
            continue;
        } else if parser.rest().starts_with("</") {
            let at = parser.pos;
            let name = parser.closing_tag()?;
            match stack.pop() {
                Some((tag, attributes, children)) if tag == name => MarkupNode::Element {
                    tag,
                    attributes,
                    children,
                },
                _ => return Err(MarkupError::UnexpectedClose { found: name, at }),
            }
        } else if parser.rest().starts_with('<') {
            let (tag, attributes, self_closing) = parser.opening_tag()?;
            if self_closing || is_void(&tag) {
                MarkupNode::Element {
                    tag,
                    attributes,
                    children: Vec::new(),
                }
            } else {
                stack.push((tag, attributes, Vec::new()));
                continue;
            }
        } else {
            MarkupNode::Text(decode_entities(parser.text()))
        };

        match stack.last_mut() {
            Some((_, _, children)) => children.push(node),
            None => top.push(node),
        }
    }

    if let Some((tag, _, _)) = stack.pop() {
        return Err(MarkupError::Unclosed(tag));
    }
    Ok(top)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn text(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest.find('<').unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_comment(&mut self) -> Result<(), MarkupError> {
        let rest = self.rest();
        let end = rest
            .find("-->")
            .ok_or(MarkupError::UnexpectedEnd(self.input.len()))?;
        self.pos += end + 3;
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn name(&mut self) -> Result<String, MarkupError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(MarkupError::InvalidName(self.pos));
        }
        self.pos += len;
        Ok(rest[..len].to_ascii_lowercase())
    }

    fn expect(&mut self, ch: char) -> Result<(), MarkupError> {
        if self.rest().starts_with(ch) {
            self.pos += ch.len_utf8();
            Ok(())
        } else {
            Err(MarkupError::UnexpectedEnd(self.pos))
        }
    }

    fn closing_tag(&mut self) -> Result<String, MarkupError> {
        self.pos += 2;
        let name = self.name()?;
        self.skip_whitespace();
        self.expect('>')?;
        Ok(name)
    }

    fn opening_tag(&mut self) -> Result<(String, Vec<(String, String)>, bool), MarkupError> {
        self.pos += 1;
        let tag = self.name()?;
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(MarkupError::UnexpectedEnd(self.pos));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok((tag, attributes, true));
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok((tag, attributes, false));
            }
            let name = self.name()?;
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.attribute_value()?
            } else {
                String::new()
            };
            attributes.push((name, value));
        }
    }

    fn attribute_value(&mut self) -> Result<String, MarkupError> {
        let rest = self.rest();
        let quote = rest.chars().next().ok_or(MarkupError::UnexpectedEnd(self.pos))?;
        if quote == '"' || quote == '\'' {
            let end = rest[1..]
                .find(quote)
                .ok_or(MarkupError::UnexpectedEnd(self.input.len()))?;
            self.pos += end + 2;
            Ok(decode_entities(&rest[1..end + 1]))
        } else {
            let len = rest
                .find(|c: char| c.is_whitespace() || c == '>')
                .unwrap_or(rest.len());
            self.pos += len;
            Ok(decode_entities(&rest[..len]))
        }
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

pub fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attribute(raw: &str) -> String {
    escape_text(raw).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::{parse_fragment, MarkupError, MarkupNode};

    fn element(tag: &str, attributes: &[(&str, &str)], children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode::Element {
            tag: tag.to_owned(),
            attributes: attributes
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            children,
        }
    }

    #[test]
    fn parses_nested_elements_with_attributes() {
        let nodes = parse_fragment(
            r#"<x-modal class="card raised" data-content><p id=title>Send &amp; sign</p></x-modal>"#,
        )
        .expect("parse");
        assert_eq!(
            nodes,
            vec![element(
                "x-modal",
                &[("class", "card raised"), ("data-content", "")],
                vec![element(
                    "p",
                    &[("id", "title")],
                    vec![MarkupNode::Text("Send & sign".to_owned())]
                )]
            )]
        );
    }

    #[test]
    fn void_and_self_closing_elements_have_no_children() {
        let nodes = parse_fragment("<input name='to'><row/><!-- gap -->tail").expect("parse");
        assert_eq!(
            nodes,
            vec![
                element("input", &[("name", "to")], vec![]),
                element("row", &[], vec![]),
                MarkupNode::Text("tail".to_owned()),
            ]
        );
    }

    #[test]
    fn unbalanced_markup_is_rejected() {
        assert_eq!(
            parse_fragment("<div><span></div>").expect_err("mismatch"),
            MarkupError::UnexpectedClose {
                found: "div".to_owned(),
                at: 11
            }
        );
        assert_eq!(
            parse_fragment("<div>").expect_err("unclosed"),
            MarkupError::Unclosed("div".to_owned())
        );
    }
}
