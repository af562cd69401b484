//! Immutable line-oriented text documents.
//!
//! A [`TextDocument`] is what every stage of the reconciliation engine
//! consumes and produces: snapshots fetched from git or the working tree,
//! formatter output, and merged results. Content is stored as lines without
//! terminators; the newline style, trailing-newline flag and source encoding
//! are carried alongside so a document can be written back byte-for-byte.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Newline
// ---------------------------------------------------------------------------

/// The line terminator used consistently throughout a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Newline {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// `\r`
    Cr,
}

impl Newline {
    /// The terminator as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Detect the single newline style used by `text`.
    ///
    /// Text without any terminator is reported as [`Newline::Lf`].
    ///
    /// # Errors
    /// Returns [`DecodeError::MixedNewlines`] when more than one style occurs.
    pub fn detect(text: &str) -> Result<Self, DecodeError> {
        let bytes = text.as_bytes();
        let (mut lf, mut crlf, mut cr) = (0usize, 0usize, 0usize);
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    crlf += 1;
                    i += 1;
                }
                b'\r' => cr += 1,
                b'\n' => lf += 1,
                _ => {}
            }
            i += 1;
        }

        match (lf > 0, crlf > 0, cr > 0) {
            (false, false, false) | (true, false, false) => Ok(Self::Lf),
            (false, true, false) => Ok(Self::CrLf),
            (false, false, true) => Ok(Self::Cr),
            _ => Err(DecodeError::MixedNewlines { lf, crlf, cr }),
        }
    }
}

impl fmt::Display for Newline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lf => write!(f, "lf"),
            Self::CrLf => write!(f, "crlf"),
            Self::Cr => write!(f, "cr"),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Source encoding of a document, as declared by a BOM or a PEP 263 coding
/// cookie.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8 without a byte-order mark.
    #[default]
    Utf8,
    /// UTF-8 preceded by the `EF BB BF` byte-order mark.
    Utf8Sig,
    /// ISO-8859-1: every byte is one code point.
    Latin1,
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

impl Encoding {
    /// Map a coding-cookie name to a supported encoding.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_ascii_lowercase().replace('_', "-");
        match label.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-8-sig" => Some(Self::Utf8Sig),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "iso-latin-1" | "l1" => {
                Some(Self::Latin1)
            }
            other if other.starts_with("utf-8-") => Some(Self::Utf8),
            _ => None,
        }
    }

    /// Detect the encoding of raw source bytes.
    ///
    /// A UTF-8 BOM wins; otherwise a coding cookie on the first or second
    /// line is honoured (the second line only when the first is blank or a
    /// comment); otherwise UTF-8.
    ///
    /// # Errors
    /// Returns [`DecodeError::UnsupportedEncoding`] for cookies naming an
    /// encoding other than UTF-8 or Latin-1.
    pub fn detect(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.starts_with(UTF8_BOM) {
            return Ok(Self::Utf8Sig);
        }
        let mut lines = bytes.split(|&b| b == b'\n').take(2);
        let Some(first) = lines.next() else {
            return Ok(Self::Utf8);
        };
        let mut cookie = coding_cookie(first);
        if cookie.is_none() && is_blank_or_comment(first) {
            cookie = lines.next().and_then(coding_cookie);
        }
        match cookie {
            None => Ok(Self::Utf8),
            Some(label) => {
                Self::from_label(&label).ok_or(DecodeError::UnsupportedEncoding { label })
            }
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            Self::Utf8 | Self::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body)
                    .map(str::to_owned)
                    .map_err(|e| DecodeError::InvalidUtf8 {
                        line: line_of_offset(body, e.valid_up_to()),
                        offset: e.valid_up_to(),
                    })
            }
            Self::Latin1 => Ok(bytes.iter().copied().map(char::from).collect()),
        }
    }

    fn encode(self, text: &str) -> Result<Vec<u8>, DecodeError> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Utf8Sig => {
                let mut out = UTF8_BOM.to_vec();
                out.extend_from_slice(text.as_bytes());
                Ok(out)
            }
            Self::Latin1 => text
                .chars()
                .map(|ch| {
                    u8::try_from(u32::from(ch)).map_err(|_| DecodeError::Unencodable {
                        ch,
                        encoding: self,
                    })
                })
                .collect(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => write!(f, "utf-8"),
            Self::Utf8Sig => write!(f, "utf-8-sig"),
            Self::Latin1 => write!(f, "latin-1"),
        }
    }
}

/// Extract the encoding name from a `# -*- coding: <name> -*-` style line.
fn coding_cookie(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let comment = line.trim_start_matches([' ', '\t', '\x0c']).strip_prefix('#')?;
    let at = comment.find("coding")?;
    let rest = comment[at + "coding".len()..].strip_prefix([':', '='])?;
    let name: String = rest
        .trim_start_matches([' ', '\t'])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    (!name.is_empty()).then_some(name)
}

fn is_blank_or_comment(line: &[u8]) -> bool {
    let trimmed = line
        .iter()
        .copied()
        .find(|b| !matches!(b, b' ' | b'\t' | b'\x0c' | b'\r'));
    matches!(trimmed, None | Some(b'#'))
}

fn line_of_offset(bytes: &[u8], offset: usize) -> usize {
    bytes[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// A document could not be represented as consistent text lines.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The bytes are not valid UTF-8.
    #[error("invalid UTF-8 on line {line} (byte offset {offset})")]
    InvalidUtf8 {
        /// 1-indexed line containing the first invalid byte.
        line: usize,
        /// Byte offset of the first invalid byte.
        offset: usize,
    },

    /// More than one newline style occurs in the document.
    #[error("mixed newlines ({lf} LF, {crlf} CRLF, {cr} CR)")]
    MixedNewlines {
        /// Number of `\n` terminators.
        lf: usize,
        /// Number of `\r\n` terminators.
        crlf: usize,
        /// Number of lone `\r` terminators.
        cr: usize,
    },

    /// The coding cookie names an encoding selfmt cannot decode.
    #[error("unsupported source encoding `{label}`")]
    UnsupportedEncoding {
        /// The label from the coding cookie.
        label: String,
    },

    /// A character cannot be written back in the document's encoding.
    #[error("character {ch:?} cannot be encoded as {encoding}")]
    Unencodable {
        /// The offending character.
        ch: char,
        /// The document's encoding.
        encoding: Encoding,
    },
}

// ---------------------------------------------------------------------------
// TextDocument
// ---------------------------------------------------------------------------

/// An immutable snapshot of a text file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextDocument {
    lines: Vec<String>,
    newline: Newline,
    trailing_newline: bool,
    encoding: Encoding,
}

impl TextDocument {
    /// A document with no lines.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            lines: Vec::new(),
            newline: Newline::Lf,
            trailing_newline: false,
            encoding: Encoding::Utf8,
        }
    }

    /// Build a document from already-split lines.
    ///
    /// Lines must not contain line terminators.
    #[must_use]
    pub fn from_lines<I, S>(
        lines: I,
        newline: Newline,
        trailing_newline: bool,
        encoding: Encoding,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        debug_assert!(
            lines.iter().all(|l| !l.contains(['\n', '\r'])),
            "document lines must not contain terminators"
        );
        Self {
            lines,
            newline,
            trailing_newline,
            encoding,
        }
    }

    /// Decode UTF-8 text.
    ///
    /// # Errors
    /// Returns [`DecodeError::MixedNewlines`] when the text mixes newline styles.
    pub fn from_text(text: &str) -> Result<Self, DecodeError> {
        Self::split(text, Encoding::Utf8)
    }

    /// Decode raw file bytes, honouring a BOM or coding cookie.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if the declared encoding is unsupported, the
    /// bytes are invalid for it, or newline styles are mixed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let encoding = Encoding::detect(bytes)?;
        let text = encoding.decode(bytes)?;
        Self::split(&text, encoding)
    }

    fn split(text: &str, encoding: Encoding) -> Result<Self, DecodeError> {
        let newline = Newline::detect(text)?;
        if text.is_empty() {
            return Ok(Self {
                encoding,
                ..Self::empty()
            });
        }
        let trailing_newline = text.ends_with(newline.as_str());
        let body = if trailing_newline {
            &text[..text.len() - newline.as_str().len()]
        } else {
            text
        };
        Ok(Self {
            lines: body.split(newline.as_str()).map(str::to_owned).collect(),
            newline,
            trailing_newline,
            encoding,
        })
    }

    /// All lines, without terminators.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The 1-indexed line `number`, if it exists.
    #[must_use]
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Whether the document has no lines at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The document's newline style.
    #[must_use]
    pub const fn newline(&self) -> Newline {
        self.newline
    }

    /// Whether the last line is terminated.
    #[must_use]
    pub const fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// The document's source encoding.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// A document with these lines and `layout`'s newline style, trailing
    /// newline and encoding.
    #[must_use]
    pub fn with_layout_of(self, layout: &Self) -> Self {
        Self {
            lines: self.lines,
            newline: layout.newline,
            trailing_newline: layout.trailing_newline,
            encoding: layout.encoding,
        }
    }

    /// Whether both documents hold the same lines, ignoring layout.
    #[must_use]
    pub fn same_lines(&self, other: &Self) -> bool {
        self.lines == other.lines
    }

    /// Render the document as a string with its own newline style.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = self.lines.join(self.newline.as_str());
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.newline.as_str());
        }
        out
    }

    /// Encode the document back to bytes in its source encoding.
    ///
    /// # Errors
    /// Returns [`DecodeError::Unencodable`] if a character does not fit the
    /// encoding (only possible for Latin-1).
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        self.encoding.encode(&self.text())
    }
}

impl FromStr for TextDocument {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

impl fmt::Display for TextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
