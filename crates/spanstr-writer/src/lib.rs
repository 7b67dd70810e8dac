//! Stream-style adapter over [`spanstr::SpanBuilder`]: character, string and
//! line writes with an open/closed lifecycle, leaving the accumulator
//! extractable after close.

use std::borrow::Cow;
use std::fmt;

use spanstr::SpanBuilder;
use thiserror::Error;

/// Printable ASCII, sliced per character so single-char writes append a
/// static span instead of allocating
const PRINTABLE_ASCII: &str = " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

/// Default terminator for line writes
const DEFAULT_LINE_TERMINATOR: &str = "\n";

/// Errors surfaced by writer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The writer was closed; the underlying builder can still be read out
    #[error("writer is closed")]
    Closed,

    /// The underlying builder rejected the write
    #[error(transparent)]
    Builder(#[from] spanstr::Error),
}

/// A writer that records text into a [`SpanBuilder`] without copying it.
///
/// Borrowed writes share the builder's lifetime rules: the text must outlive
/// the writer's builder. Closing the writer rejects further writes but keeps
/// the accumulated text readable.
#[derive(Debug)]
pub struct SpanWriter<'a> {
    builder: SpanBuilder<'a>,
    line_terminator: Cow<'static, str>,
    open: bool,
}

impl Default for SpanWriter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SpanWriter<'a> {
    /// Create a writer over a fresh, empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::from_builder(SpanBuilder::new())
    }

    /// Create a writer whose builder starts with the given chunk capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_builder(SpanBuilder::with_capacity(capacity))
    }

    /// Wrap an existing builder; its content is kept and appended after
    #[must_use]
    pub fn from_builder(builder: SpanBuilder<'a>) -> Self {
        SpanWriter {
            builder,
            line_terminator: Cow::Borrowed(DEFAULT_LINE_TERMINATOR),
            open: true,
        }
    }

    /// The underlying accumulator
    #[inline]
    #[must_use]
    pub fn builder(&self) -> &SpanBuilder<'a> {
        &self.builder
    }

    /// Mutable access to the underlying accumulator
    #[inline]
    pub fn builder_mut(&mut self) -> &mut SpanBuilder<'a> {
        &mut self.builder
    }

    /// Unwrap into the accumulator, open or closed
    #[must_use]
    pub fn into_builder(self) -> SpanBuilder<'a> {
        self.builder
    }

    /// The fixed encoding identity of everything this writer produces
    #[inline]
    #[must_use]
    pub const fn encoding(&self) -> &'static str {
        "UTF-8"
    }

    /// Terminator used by the line writes
    #[inline]
    #[must_use]
    pub fn line_terminator(&self) -> &str {
        &self.line_terminator
    }

    /// Replace the line terminator
    pub fn set_line_terminator(&mut self, terminator: impl Into<Cow<'static, str>>) {
        self.line_terminator = terminator.into();
    }

    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Stop accepting writes. The builder stays readable and extractable
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Write a borrowed string, zero-copy
    pub fn write(&mut self, text: &'a str) -> Result<&mut Self, Error> {
        self.ensure_open()?;
        self.builder.append(text)?;
        Ok(self)
    }

    /// Write the `text[start..start + len]` window, zero-copy
    pub fn write_range(
        &mut self,
        text: &'a str,
        start: usize,
        len: usize,
    ) -> Result<&mut Self, Error> {
        self.ensure_open()?;
        self.builder.append_range(text, start, len)?;
        Ok(self)
    }

    /// Write text the caller cannot keep alive, taking ownership
    pub fn write_owned(&mut self, text: String) -> Result<&mut Self, Error> {
        self.ensure_open()?;
        self.builder.append_owned(text)?;
        Ok(self)
    }

    /// Write a single character. Printable ASCII and the common control
    /// characters append a static slice; anything else allocates.
    pub fn write_char(&mut self, c: char) -> Result<&mut Self, Error> {
        self.ensure_open()?;
        match interned(c) {
            Some(s) => self.builder.append(s)?,
            None => self.builder.append_owned(c.to_string())?,
        };
        Ok(self)
    }

    /// Write the line terminator
    pub fn write_line(&mut self) -> Result<&mut Self, Error> {
        self.ensure_open()?;
        self.append_terminator()?;
        Ok(self)
    }

    /// Write a borrowed string followed by the line terminator
    pub fn write_line_str(&mut self, text: &'a str) -> Result<&mut Self, Error> {
        self.ensure_open()?;
        self.builder.append(text)?;
        self.append_terminator()?;
        Ok(self)
    }

    /// Nothing is buffered outside the builder, so flushing is a no-op;
    /// it still reports a closed writer
    pub fn flush(&mut self) -> Result<(), Error> {
        self.ensure_open()
    }

    fn append_terminator(&mut self) -> Result<(), Error> {
        if let Cow::Borrowed(s) = self.line_terminator {
            self.builder.append(s)?;
        } else {
            let owned = self.line_terminator.to_string();
            self.builder.append_owned(owned)?;
        }
        Ok(())
    }

    #[inline]
    fn ensure_open(&self) -> Result<(), Error> {
        if self.open {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }
}

/// Copying writes for `write!` interop. Formatted text never outlives the
/// call, so it lands in owned spans; a closed writer reports `fmt::Error`.
impl fmt::Write for SpanWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if !self.open {
            return Err(fmt::Error);
        }
        if s.is_empty() {
            return Ok(());
        }
        self.builder
            .append_owned(s.to_owned())
            .map(|_| ())
            .map_err(|_| fmt::Error)
    }
}

/// Static single-char slice for characters the writer sees constantly
fn interned(c: char) -> Option<&'static str> {
    match c {
        '\n' => Some("\n"),
        '\r' => Some("\r"),
        '\t' => Some("\t"),
        ' '..='~' => {
            let i = c as usize - 0x20;
            PRINTABLE_ASCII.get(i..i + 1)
        }
        _ => None,
    }
}
