use super::ParseError;

/// The literal values a derivation file is made of.
///
/// Only plain data is recognised. Identifiers, calls and anything else that
/// would need evaluating are rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Tuple(Vec<Value>),
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
        }
    }
}

pub(super) const DERIVE_TAG: &str = "Derive";

/// Deepest list or tuple nesting accepted. Derivations nest three deep.
pub(super) const MAX_DEPTH: usize = 256;

pub(super) struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Parser<'a> {
        Parser {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn unexpected(&self, found: Option<char>, expected: &'static str) -> ParseError {
        match found {
            Some(found) => ParseError::UnexpectedChar {
                position: self.pos - found.len_utf8(),
                found,
                expected,
            },
            None => ParseError::UnexpectedEnd(self.pos),
        }
    }

    fn expect(&mut self, want: char, expected: &'static str) -> Result<(), ParseError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            found => Err(self.unexpected(found, expected)),
        }
    }

    fn tag(&mut self) -> Option<&'a str> {
        let rest = &self.input[self.pos..];
        if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        Some(&rest[..len])
    }

    pub fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some('"') => {
                self.pos += 1;
                self.parse_string().map(Value::Str)
            }
            Some('[') => {
                let (items, _) = self.parse_nested(']', "',' or ']'")?;
                Ok(Value::List(items))
            }
            Some('(') => {
                let (mut items, trailing_comma) = self.parse_nested(')', "',' or ')'")?;
                // `(x)` is just a parenthesized `x`, `(x,)` is a tuple
                if items.len() == 1 && !trailing_comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Value::Tuple(items))
                }
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(found) => Err(ParseError::UnexpectedChar {
                position: self.pos,
                found,
                expected: "a string, number, tuple or list",
            }),
            None => Err(ParseError::UnexpectedEnd(self.pos)),
        }
    }

    /// Opening bracket at the current position, then its items.
    fn parse_nested(
        &mut self,
        close: char,
        expected: &'static str,
    ) -> Result<(Vec<Value>, bool), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep { position: self.pos });
        }
        self.pos += 1;
        self.depth += 1;
        let items = self.parse_items(close, expected);
        self.depth -= 1;
        items
    }

    /// Comma separated values up to and including `close`.
    fn parse_items(
        &mut self,
        close: char,
        expected: &'static str,
    ) -> Result<(Vec<Value>, bool), ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += close.len_utf8();
                let trailing_comma = !items.is_empty();
                return Ok((items, trailing_comma));
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok((items, false)),
                found => return Err(self.unexpected(found, expected)),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let mut out = String::new();
        loop {
            let rest = &self.input[self.pos..];
            let plain = rest.find(['"', '\\']).unwrap_or(rest.len());
            out.push_str(&rest[..plain]);
            self.pos += plain;
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(ParseError::UnexpectedEnd(self.pos)),
                },
                _ => return Err(ParseError::UnexpectedEnd(self.pos)),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        let rest = &self.input[start..];
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
            .unwrap_or(rest.len());
        let text = &rest[..len];
        self.pos += len;
        let value = if text.contains(['.', 'e', 'E']) {
            text.parse::<f64>().ok().map(Value::Float)
        } else {
            text.parse::<i64>().ok().map(Value::Int)
        };
        value.ok_or_else(|| ParseError::BadNumber {
            position: start,
            text: text.to_owned(),
        })
    }

    /// Parse a whole derivation payload into its top level fields.
    ///
    /// Accepts `Derive(a, b, ...)`, a parenthesized tuple `(a, b, ...)` and
    /// the bare sequence `a, b, ...` left over once the tag is stripped.
    pub fn parse_fields(mut self) -> Result<Vec<Value>, ParseError> {
        self.skip_ws();
        let fields = if let Some(tag) = self.tag() {
            if tag != DERIVE_TAG {
                return Err(ParseError::UnknownTag(tag.to_owned()));
            }
            self.expect('(', "'('")?;
            self.parse_items(')', "',' or ')'")?.0
        } else {
            let mut items = vec![self.parse_value()?];
            loop {
                self.skip_ws();
                if self.peek() != Some(',') {
                    break;
                }
                self.pos += 1;
                self.skip_ws();
                if self.at_end() {
                    break;
                }
                items.push(self.parse_value()?);
            }
            if items.len() == 1 {
                match items.remove(0) {
                    Value::Tuple(fields) => fields,
                    other => {
                        return Err(ParseError::Shape {
                            context: "derivation".into(),
                            expected: "tuple",
                            found: other.kind(),
                        });
                    }
                }
            } else {
                items
            }
        };
        self.skip_ws();
        if !self.at_end() {
            return Err(ParseError::TrailingInput(self.pos));
        }
        Ok(fields)
    }
}
