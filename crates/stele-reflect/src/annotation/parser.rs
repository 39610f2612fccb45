//! Annotation scanner for documentation comments
//!
//! Extracts `@Name`, `@Name(value)` and `@Name(key=value, ...)` occurrences
//! from free-form comment text. The scanner is a five-state machine — text,
//! tag name, argument list, quoted value, bare value — realized as one method
//! per state. It performs no I/O and keeps no global state.
//!
//! Error recovery is per tag: a malformed tag (unterminated argument list or
//! string literal, unexpected character) is recorded in
//! [`ParsedComment::errors`] and scanning resumes, so later well-formed tags
//! in the same comment are still found. A comment without any tag is a normal
//! empty result, not an error.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::AnnotationValue;

/// A recovered parse failure, localized to a single tag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed annotation @{tag} at byte {offset}: {kind}")]
pub struct ParseError {
    /// What went wrong
    pub kind: ParseErrorKind,
    /// Name of the offending tag
    pub tag: String,
    /// Byte offset of the tag's `@` in the comment
    pub offset: usize,
}

/// The kind of per-tag parse failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Argument list still open at end of input
    #[error("argument list is not closed")]
    UnterminatedArgList,

    /// String literal missing its closing quote
    #[error("string literal opened with {quote} is not closed")]
    UnterminatedString {
        /// The opening quote character
        quote: char,
    },

    /// Unexpected character inside the argument list
    #[error("unexpected character '{found}' in argument list")]
    UnexpectedChar {
        /// The offending character
        found: char,
    },

    /// More than one unnamed value in a single argument list
    #[error("argument list carries more than one unnamed value")]
    DuplicateValue,

    /// Argument item with no content, e.g. a dangling `=` or comma
    #[error("empty argument")]
    EmptyArgument,
}

/// A raw annotation occurrence as found in comment text.
///
/// Carries the tag name, the optional unnamed positional value, and the named
/// parameters. Produced by [`parse`]; turned into
/// [`Annotation`](super::Annotation)s by the factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnnotation {
    /// Tag name, e.g. `Retry` for `@Retry(...)`
    pub name: String,
    /// Unnamed positional value, if any
    pub value: Option<AnnotationValue>,
    /// Named parameters
    pub params: FxHashMap<String, AnnotationValue>,
}

impl RawAnnotation {
    fn new(name: String) -> Self {
        Self {
            name,
            value: None,
            params: FxHashMap::default(),
        }
    }
}

/// Result of scanning one documentation comment.
///
/// Occurrences are kept in encounter order with duplicates preserved; the
/// last-occurrence-by-name view needed for single lookups is derived on
/// demand via [`ParsedComment::last`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedComment {
    annotations: Vec<RawAnnotation>,
    errors: Vec<ParseError>,
}

impl ParsedComment {
    /// All occurrences in encounter order, duplicates included.
    pub fn all(&self) -> &[RawAnnotation] {
        &self.annotations
    }

    /// The last occurrence of the given name, if any.
    pub fn last(&self, name: &str) -> Option<&RawAnnotation> {
        self.annotations.iter().rev().find(|a| a.name == name)
    }

    /// Whether any occurrence of the given name was found.
    pub fn contains(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }

    /// Per-tag failures recovered during the scan.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Whether no annotation was found at all.
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Scan a documentation comment for annotation tags.
pub fn parse(comment: &str) -> ParsedComment {
    Scanner::new(comment).run()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Scanner state over pre-collected characters.
///
/// Each `read_*` method is one machine state; `run` is the scanning-text
/// state and the terminal condition is end of input from any state.
struct Scanner {
    chars: Vec<(usize, char)>,
    pos: usize,
    out: ParsedComment,
}

impl Scanner {
    fn new(comment: &str) -> Self {
        Self {
            chars: comment.char_indices().collect(),
            pos: 0,
            out: ParsedComment::default(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Scanning-text state: advance to the next `@` that opens a tag.
    fn run(mut self) -> ParsedComment {
        while self.pos < self.chars.len() {
            let (offset, c) = self.chars[self.pos];
            self.pos += 1;
            if c == '@' && self.peek().is_some_and(is_ident_start) {
                self.read_tag_name(offset);
            }
        }
        self.out
    }

    /// Reading-tag-name state. On `(` directly after the name the argument
    /// list follows; any other character ends the tag as a bare annotation.
    fn read_tag_name(&mut self, tag_start: usize) {
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            name.push(c);
            self.pos += 1;
        }

        if self.peek() == Some('(') {
            self.pos += 1;
            self.read_arg_list(tag_start, name);
        } else {
            self.out.annotations.push(RawAnnotation::new(name));
        }
    }

    /// Reading-arg-list state: comma-separated `key=value` pairs or one
    /// unnamed value, closed by `)`. On failure the tag is discarded, the
    /// error recorded, and scanning resumes at the offending character so a
    /// following tag is still found.
    fn read_arg_list(&mut self, tag_start: usize, name: String) {
        let mut tag = RawAnnotation::new(name);

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return self.fail(tag_start, tag.name, ParseErrorKind::UnterminatedArgList),
                Some(')') => {
                    self.pos += 1;
                    self.out.annotations.push(tag);
                    return;
                }
                Some(',') => {
                    self.pos += 1;
                    return self.fail(tag_start, tag.name, ParseErrorKind::EmptyArgument);
                }
                Some(q @ ('\'' | '"')) => {
                    self.pos += 1;
                    let Some(text) = self.read_quoted(q) else {
                        return self.fail(
                            tag_start,
                            tag.name,
                            ParseErrorKind::UnterminatedString { quote: q },
                        );
                    };
                    if tag.value.is_some() {
                        return self.fail(tag_start, tag.name, ParseErrorKind::DuplicateValue);
                    }
                    tag.value = Some(AnnotationValue::Str(text));
                }
                Some(c) if is_bare_char(c) => {
                    let token = self.read_bare();
                    self.skip_whitespace();
                    if self.peek() == Some('=') {
                        self.pos += 1;
                        match self.read_arg_value(&mut tag, token) {
                            Ok(()) => {}
                            Err(kind) => return self.fail(tag_start, tag.name, kind),
                        }
                    } else {
                        if tag.value.is_some() {
                            return self.fail(tag_start, tag.name, ParseErrorKind::DuplicateValue);
                        }
                        tag.value = Some(AnnotationValue::from_bare(&token));
                    }
                }
                Some(c) => {
                    return self.fail(tag_start, tag.name, ParseErrorKind::UnexpectedChar { found: c })
                }
            }

            // After an item only a separator or the closing paren may follow.
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(')') | None => {}
                Some(c) => {
                    return self.fail(tag_start, tag.name, ParseErrorKind::UnexpectedChar { found: c })
                }
            }
        }
    }

    /// Value position of a `key=value` pair: quoted or bare.
    fn read_arg_value(&mut self, tag: &mut RawAnnotation, key: String) -> Result<(), ParseErrorKind> {
        self.skip_whitespace();
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                let text = self
                    .read_quoted(q)
                    .ok_or(ParseErrorKind::UnterminatedString { quote: q })?;
                tag.params.insert(key, AnnotationValue::Str(text));
                Ok(())
            }
            Some(c) if is_bare_char(c) => {
                let token = self.read_bare();
                tag.params.insert(key, AnnotationValue::from_bare(&token));
                Ok(())
            }
            // a dangling `=` with nothing behind it
            Some(')' | ',') | None => Err(ParseErrorKind::EmptyArgument),
            Some(c) => Err(ParseErrorKind::UnexpectedChar { found: c }),
        }
    }

    /// Reading-quoted-value state: everything up to the matching quote.
    /// `None` when the quote is still open at end of input.
    fn read_quoted(&mut self, quote: char) -> Option<String> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Some(text),
                Some(c) => text.push(c),
                None => return None,
            }
        }
    }

    /// Reading-bare-value state: a run of word characters.
    fn read_bare(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.peek().filter(|&c| is_bare_char(c)) {
            token.push(c);
            self.pos += 1;
        }
        token
    }

    /// Discard the current tag, record the failure, and resume scanning at
    /// the current position.
    fn fail(&mut self, tag_start: usize, tag: String, kind: ParseErrorKind) {
        self.out.errors.push(ParseError {
            kind,
            tag,
            offset: tag_start,
        });
    }
}
