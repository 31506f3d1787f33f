//! Tag tokenizer for the metadata stream's pseudo-XML.
//!
//! The stream is not real XML (no declaration, no escaping, no guarantee of
//! well-formedness), so this only splits text into open tags, close tags and
//! the text between them. It never fails: anything it cannot make sense of is
//! surfaced as [`Token::Text`].

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Open {
        name: &'a str,
        attrs: Vec<(&'a str, &'a str)>,
    },
    Close {
        name: &'a str,
    },
    Text(&'a str),
}

impl<'a> Token<'a> {
    /// Look up an attribute value on an open tag
    pub fn attr(&self, key: &str) -> Option<&'a str> {
        match self {
            Token::Open { attrs, .. } => attrs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v),
            _ => None,
        }
    }
}

pub struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        if let Some(after_lt) = self.rest.strip_prefix('<') {
            // Unterminated tag: hand back the remainder as text and stop
            let Some(end) = after_lt.find('>') else {
                let text = self.rest;
                self.rest = "";
                return Some(Token::Text(text));
            };

            let inner = &after_lt[..end];
            self.rest = &after_lt[end + 1..];

            return Some(match inner.strip_prefix('/') {
                Some(name) => Token::Close { name: name.trim() },
                None => {
                    let inner = inner.strip_suffix('/').unwrap_or(inner).trim();
                    let (name, attrs) = match inner.find(char::is_whitespace) {
                        Some(split) => (&inner[..split], parse_attrs(&inner[split..])),
                        None => (inner, Vec::new()),
                    };
                    Token::Open { name, attrs }
                }
            });
        }

        let end = self.rest.find('<').unwrap_or(self.rest.len());
        let text = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(Token::Text(text))
    }
}

/// Parse `key="value"` / `key='value'` pairs. Bare keys get an empty value.
fn parse_attrs(mut s: &str) -> Vec<(&str, &str)> {
    let mut attrs = Vec::new();

    loop {
        s = s.trim_start();
        if s.is_empty() {
            break;
        }

        let key_end = s
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(s.len());
        let key = &s[..key_end];
        s = s[key_end..].trim_start();

        let Some(after_eq) = s.strip_prefix('=') else {
            if !key.is_empty() {
                attrs.push((key, ""));
            }
            continue;
        };
        let after_eq = after_eq.trim_start();

        let quote = after_eq.chars().next();
        let (value, remainder) = match quote {
            Some(q @ ('"' | '\'')) => {
                let body = &after_eq[1..];
                match body.find(q) {
                    Some(close) => (&body[..close], &body[close + 1..]),
                    None => (body, ""),
                }
            }
            _ => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };

        if !key.is_empty() {
            attrs.push((key, value));
        }
        s = remainder;
    }

    attrs
}
