//! Value path addressing and `{{ }}` reference extraction.
//!
//! A path addresses a node inside the variable tree: `a.b[k].c` reads
//! property `b` of variable `a`, then the element of that list whose `key`
//! property is `k`, then its property `c`. Bracket lookup is by logical key,
//! never by position, so references survive reordering of list elements.

use std::fmt;
use std::str::FromStr;

use crate::error::CommandError;

/// Opening marker of an embedded reference.
pub const OPEN: &str = "{{";
/// Closing marker of an embedded reference.
pub const CLOSE: &str = "}}";

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `name` or `.name`: an object property.
    Name(String),
    /// `[key]`: the keyed-list element whose `key` property equals the text.
    Key(String),
}

/// Coarse shape of a path, which decides how reads merge and writes apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathShape {
    /// A bare variable name: `name`.
    TopLevel,
    /// One element of a keyed-list variable: `name[key]`.
    TopLevelListElement,
    /// Anything deeper, such as `a.b` or `a[k].c`.
    Nested,
}

// ---------------------------------------------------------------------------
// ValuePath
// ---------------------------------------------------------------------------

/// A parsed, validated path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePath {
    raw: String,
    segments: Vec<Segment>,
}

impl ValuePath {
    /// Parse a path. Surrounding whitespace is ignored.
    ///
    /// Fails on an empty path, a leading `[key]`, an empty name or key,
    /// an unclosed bracket, or stray characters after `]`.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CommandError::resolution("empty variable path"));
        }

        let invalid = |reason: &str| CommandError::resolution(format!("invalid path '{raw}': {reason}"));

        let mut segments = Vec::new();
        let mut chars = raw.char_indices().peekable();
        let mut name = String::new();
        let mut expect_name = true;

        while let Some((_, c)) = chars.next() {
            match c {
                '.' => {
                    match take_name(&mut name) {
                        Some(taken) => segments.push(Segment::Name(taken)),
                        None if expect_name => return Err(invalid("empty property name")),
                        None => {}
                    }
                    expect_name = true;
                }
                '[' => {
                    match take_name(&mut name) {
                        Some(taken) => segments.push(Segment::Name(taken)),
                        None if segments.is_empty() => {
                            return Err(invalid("a path must start with a name, not an index"));
                        }
                        None if expect_name => return Err(invalid("empty property name")),
                        None => {}
                    }
                    let mut key = String::new();
                    let mut closed = false;
                    for (_, k) in chars.by_ref() {
                        if k == ']' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    if !closed {
                        return Err(invalid("unclosed '['"));
                    }
                    let key = key.trim();
                    if key.is_empty() {
                        return Err(invalid("empty list key"));
                    }
                    segments.push(Segment::Key(key.to_string()));
                    expect_name = false;
                    if let Some((_, next)) = chars.peek() {
                        if *next != '.' && *next != '[' {
                            return Err(invalid("expected '.' or '[' after ']'"));
                        }
                    }
                }
                ']' => return Err(invalid("unbalanced ']'")),
                other => {
                    if !expect_name {
                        return Err(invalid("expected '.' or '[' after ']'"));
                    }
                    name.push(other);
                }
            }
        }

        match take_name(&mut name) {
            Some(taken) => segments.push(Segment::Name(taken)),
            None if expect_name => return Err(invalid("trailing '.'")),
            None => {}
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The variable name the path starts from.
    pub fn root(&self) -> &str {
        match self.segments.first() {
            Some(Segment::Name(name)) => name,
            // parse() guarantees a leading name segment
            _ => "",
        }
    }

    /// Everything after the root name.
    pub fn rest(&self) -> &[Segment] {
        &self.segments[1..]
    }

    pub fn shape(&self) -> PathShape {
        match self.segments.as_slice() {
            [Segment::Name(_)] => PathShape::TopLevel,
            [Segment::Name(_), Segment::Key(_)] => PathShape::TopLevelListElement,
            _ => PathShape::Nested,
        }
    }

    /// The bracket key of a `name[key]` path.
    pub fn list_key(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [Segment::Name(_), Segment::Key(key)] => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ValuePath {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValuePath::parse(s)
    }
}

/// A path with neither `.` nor `[`.
pub fn is_top_level(path: &str) -> bool {
    !path.contains('.') && !path.contains('[')
}

/// A path containing `[` with no `.` before it.
pub fn is_top_level_list(path: &str) -> bool {
    match path.find('[') {
        Some(bracket) => !path[..bracket].contains('.'),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Embedded references
// ---------------------------------------------------------------------------

/// A `{{ path }}` occurrence inside a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Byte offset of the opening `{{`.
    pub start: usize,
    /// Byte offset just past the closing `}}`.
    pub end: usize,
    /// The trimmed text between the markers.
    pub path: &'a str,
}

impl Reference<'_> {
    /// Whether the reference spans the entire text.
    pub fn is_whole(&self, text: &str) -> bool {
        self.start == 0 && self.end == text.len()
    }
}

/// Drain a pending property name, trimmed. `None` when only blanks were read.
fn take_name(name: &mut String) -> Option<String> {
    let taken = std::mem::take(name);
    let trimmed = taken.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Find the innermost-first reference: the first `}}`, paired with the
/// nearest `{{` before it. So `{{ a[{{ k }}] }}` yields `k` first.
pub fn extract_reference(text: &str) -> Option<Reference<'_>> {
    let close = text.find(CLOSE)?;
    let open = text[..close].rfind(OPEN)?;
    Some(Reference {
        start: open,
        end: close + CLOSE.len(),
        path: text[open + OPEN.len()..close].trim(),
    })
}

/// Wrap a path as an embedded reference: `name` becomes `{{ name }}`.
pub fn wrap_reference(path: &str) -> String {
    format!("{OPEN} {} {CLOSE}", path.trim())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
