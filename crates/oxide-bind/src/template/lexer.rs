//! Single-pass lexer separating placeholders from literal SQL text.

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// A piece of template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'t> {
    /// Text copied to the output unchanged.
    Text(&'t str),
    /// `:name`
    Placeholder(&'t str),
    /// `:name{col1,col2}`
    RowBlock {
        /// Rows name.
        name: &'t str,
        /// Requested columns, trimmed.
        columns: Vec<&'t str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<'t> {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Backtick,
    Bracket,
    LineComment,
    BlockComment,
    /// Holds the full opening tag, e.g. `$fn$`.
    DollarQuoted(&'t str),
}

/// Splits a template into [`Segment`]s.
///
/// Placeholders are recognized only outside quoted literals, quoted
/// identifiers and comments. Adjacent text is yielded as one segment.
pub struct Lexer<'t> {
    src: &'t str,
    pos: usize,
    mark: usize,
    state: State<'t>,
    dialect: Dialect,
    max_name_len: Option<usize>,
}

impl<'t> Lexer<'t> {
    /// Creates a lexer.
    #[must_use]
    pub const fn new(src: &'t str, dialect: Dialect, max_name_len: Option<usize>) -> Self {
        Self {
            src,
            pos: 0,
            mark: 0,
            state: State::Plain,
            dialect,
            max_name_len,
        }
    }

    fn bytes(&self) -> &'t [u8] {
        self.src.as_bytes()
    }

    fn peek(&self, at: usize) -> Option<u8> {
        self.bytes().get(at).copied()
    }

    /// Detects a quote or comment opener at `at`, returning the new state and
    /// the opener length.
    fn opener(&self, at: usize) -> Option<(State<'t>, usize)> {
        let c = self.peek(at)?;
        let next = self.peek(at + 1);
        match c {
            b'-' if next == Some(b'-') => Some((State::LineComment, 2)),
            b'#' if self.dialect.hash_comments() => Some((State::LineComment, 1)),
            b'/' if next == Some(b'*') => Some((State::BlockComment, 2)),
            b'\'' => Some((State::SingleQuoted, 1)),
            b'"' => Some((State::DoubleQuoted, 1)),
            b'`' if self.dialect.backtick_identifiers() => Some((State::Backtick, 1)),
            b'[' if self.dialect.bracket_identifiers() => Some((State::Bracket, 1)),
            b'$' => dollar_tag(&self.src[at..]).map(|tag| (State::DollarQuoted(tag), tag.len())),
            _ => None,
        }
    }

    fn is_param_start(&self, at: usize) -> bool {
        self.peek(at) == Some(b':')
            && self.peek(at + 1).is_some_and(|c| c != b':')
            && !(at > 0 && self.peek(at - 1) == Some(b':'))
    }

    /// Quoted literal: backslash escapes the next byte, a doubled quote stays
    /// inside.
    fn step_literal(&mut self, quote: u8) {
        let c = self.bytes()[self.pos];
        if c == b'\\' {
            self.pos = (self.pos + 2).min(self.src.len());
            return;
        }
        self.step_identifier(quote);
    }

    /// Quoted identifier: only a doubled close character escapes.
    fn step_identifier(&mut self, close: u8) {
        let c = self.bytes()[self.pos];
        self.pos += 1;
        if c == close {
            if self.peek(self.pos) == Some(close) {
                self.pos += 1;
            } else {
                self.state = State::Plain;
            }
        }
    }

    /// Reads a placeholder whose name starts at `start`. Returns `None` when
    /// the `:` is not followed by an identifier.
    fn placeholder(&mut self, start: usize) -> Option<Result<Segment<'t>>> {
        let end = read_name(self.bytes(), start)?;
        let name = &self.src[start..end];

        if let Some(limit) = self.max_name_len {
            if name.len() > limit {
                return Some(Err(Error::ParamNameTooLong {
                    name: name.to_owned(),
                    len: name.len(),
                    limit,
                }));
            }
        }

        if self.peek(end) != Some(b'{') {
            self.pos = end;
            self.mark = end;
            return Some(Ok(Segment::Placeholder(name)));
        }

        Some(match read_columns(self.src, end) {
            Ok((after, columns)) => {
                self.pos = after;
                self.mark = after;
                Ok(Segment::RowBlock { name, columns })
            }
            Err(reason) => Err(Error::RowsMalformed {
                name: name.to_owned(),
                reason,
            }),
        })
    }

    fn flush(&mut self, upto: usize) -> Option<Segment<'t>> {
        if self.mark < upto {
            let text = &self.src[self.mark..upto];
            self.mark = upto;
            Some(Segment::Text(text))
        } else {
            None
        }
    }

    fn fuse(&mut self) {
        self.pos = self.src.len();
        self.mark = self.src.len();
    }
}

impl<'t> Iterator for Lexer<'t> {
    type Item = Result<Segment<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.src.len() {
            let at = self.pos;
            match self.state {
                State::Plain => {
                    if let Some((state, len)) = self.opener(at) {
                        self.state = state;
                        self.pos += len;
                        continue;
                    }
                    if self.is_param_start(at) && read_name(self.bytes(), at + 1).is_some() {
                        // Text before the placeholder goes out first.
                        if let Some(text) = self.flush(at) {
                            return Some(Ok(text));
                        }
                        if let Some(item) = self.placeholder(at + 1) {
                            if item.is_err() {
                                self.fuse();
                            }
                            return Some(item);
                        }
                    }
                    self.pos += 1;
                }
                State::SingleQuoted => self.step_literal(b'\''),
                State::DoubleQuoted => self.step_literal(b'"'),
                State::Backtick => self.step_identifier(b'`'),
                State::Bracket => self.step_identifier(b']'),
                State::LineComment => {
                    self.pos += 1;
                    if matches!(self.bytes()[at], b'\n' | b'\r') {
                        self.state = State::Plain;
                    }
                }
                State::BlockComment => {
                    if self.bytes()[at] == b'*' && self.peek(at + 1) == Some(b'/') {
                        self.pos += 2;
                        self.state = State::Plain;
                    } else {
                        self.pos += 1;
                    }
                }
                State::DollarQuoted(tag) => match self.src[at..].find(tag) {
                    Some(offset) => {
                        self.pos = at + offset + tag.len();
                        self.state = State::Plain;
                    }
                    // Unterminated: the rest is literal.
                    None => self.pos = self.src.len(),
                },
            }
        }
        self.flush(self.src.len()).map(Ok)
    }
}

const fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

const fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// End offset of the identifier starting at `start`.
fn read_name(bytes: &[u8], start: usize) -> Option<usize> {
    if !is_name_start(*bytes.get(start)?) {
        return None;
    }
    let len = bytes[start + 1..]
        .iter()
        .take_while(|c| is_name_char(**c))
        .count();
    Some(start + 1 + len)
}

/// Parses `{a, b}` starting at the `{`. Returns the offset past `}` and the
/// trimmed column names.
fn read_columns(src: &str, open: usize) -> std::result::Result<(usize, Vec<&str>), &'static str> {
    let body_start = open + 1;
    let close = src[body_start..]
        .find('}')
        .map(|offset| body_start + offset)
        .ok_or("missing closing brace")?;
    let body = &src[body_start..close];
    if body.trim().is_empty() {
        return Err("no columns");
    }
    let columns: Vec<&str> = body.split(',').map(str::trim).collect();
    if columns.iter().any(|column| column.is_empty()) {
        return Err("empty column name");
    }
    Ok((close + 1, columns))
}

/// Reads a `$tag$` opener at the start of `s`.
fn dollar_tag(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'$') {
        return None;
    }
    let len = bytes[1..].iter().take_while(|c| is_name_char(**c)).count();
    (bytes.get(1 + len) == Some(&b'$')).then(|| &s[..len + 2])
}
