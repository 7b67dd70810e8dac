//! Zero-copy string builder: records spans over caller-owned text and defers
//! all character copying to the moment a contiguous string is requested.

use std::borrow::Cow;
use std::fmt;
use std::mem;

use thiserror::Error;

mod format;
pub use format::Value;

/// Suggested slot count for a fresh chunk
const DEFAULT_CAPACITY: usize = 8;

/// Upper bound on slots per chunk; growth doubles up to this
const MAX_CHUNK_SLOTS: usize = 4000;

/// Maximum total byte length a builder may reach (the allocation ceiling)
const MAX_LENGTH: usize = isize::MAX as usize;

/// Terminator appended by [`SpanBuilder::append_line`]
const LINE_TERMINATOR: &str = "\n";

// === Core Types ===

/// Errors surfaced by builder operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An index, length, or window exceeded the addressable range
    #[error("{what} out of range")]
    OutOfRange { what: &'static str },

    /// A cut point would split a UTF-8 sequence
    #[error("byte {pos} is not a char boundary")]
    NotCharBoundary { pos: usize },

    /// Malformed or unterminated placeholder in a composite format string
    #[error("invalid format string at byte {pos}")]
    InvalidFormat { pos: usize },

    /// Placeholder index with no matching argument
    #[error("format index {index} out of range for {count} arguments")]
    IndexOutOfRange { index: usize, count: usize },

    /// The total length would exceed the maximum builder size.
    /// The builder's contents are discarded when this is raised.
    #[error("builder length overflow")]
    LengthOverflow,

    /// Span bookkeeping no longer matches its sources; materialization
    /// refuses to read rather than overrun a buffer
    #[error("builder state is inconsistent")]
    InvalidState,
}

/// A reference into previously allocated text: source, byte offset, byte length.
///
/// Borrowed sources are never copied; owned sources hold text the builder
/// generated itself (formatted arguments). A cleared span has `len == 0` and
/// an empty source so it keeps nothing alive.
#[derive(Debug)]
struct Span<'a> {
    source: Cow<'a, str>,
    start: usize,
    len: usize,
}

impl<'a> Span<'a> {
    #[inline]
    fn new(source: Cow<'a, str>, start: usize, len: usize) -> Self {
        Span { source, start, len }
    }

    #[inline]
    fn empty() -> Self {
        Span {
            source: Cow::Borrowed(""),
            start: 0,
            len: 0,
        }
    }

    /// Drop the source reference and mark the slot ignorable
    #[inline]
    fn clear(&mut self) {
        self.len = 0;
        self.source = Cow::Borrowed("");
    }

    /// View the referenced text. Only valid for spans built through the
    /// validated insertion paths.
    #[inline]
    fn slice(&self) -> &str {
        &self.source[self.start..self.start + self.len]
    }
}

/// A fixed-capacity run of spans plus its occupancy count and the owning
/// link to the chunk created before it.
#[derive(Debug)]
struct Chunk<'a> {
    slots: Box<[Span<'a>]>,
    used: usize,
    prev: Option<Box<Chunk<'a>>>,
}

impl<'a> Chunk<'a> {
    fn new(capacity: usize) -> Self {
        Chunk {
            slots: (0..capacity).map(|_| Span::empty()).collect(),
            used: 0,
            prev: None,
        }
    }
}

/// A mutable string accumulator that appends and prepends in O(1) without
/// copying text, backed by a backward-linked chain of span chunks.
///
/// The handle is always the newest chunk; older chunks hang off `prev`.
/// Logical text order is oldest chunk to newest, slot 0 upward within each.
/// Borrowed sources must outlive the builder.
#[derive(Debug)]
pub struct SpanBuilder<'a> {
    chunk: Chunk<'a>,
    total: usize,
}

impl Default for SpanBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SpanBuilder<'a> {
    /// Create an empty builder with the default initial capacity
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty builder whose first chunk has `capacity` slots.
    /// The hint only sizes the first chunk; it is never a hard limit.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        SpanBuilder {
            chunk: Chunk::new(capacity),
            total: 0,
        }
    }

    /// Create a builder holding `text` as its only span
    #[must_use]
    pub fn from_str(text: &'a str) -> Self {
        Self::from_str_with_capacity(text, DEFAULT_CAPACITY)
    }

    /// Create a builder holding `text`, with a first-chunk capacity hint
    #[must_use]
    pub fn from_str_with_capacity(text: &'a str, capacity: usize) -> Self {
        let mut builder = Self::with_capacity(capacity);
        if !text.is_empty() {
            if builder.chunk.slots.is_empty() {
                builder.grow();
            }
            builder.chunk.slots[0] = Span::new(Cow::Borrowed(text), 0, text.len());
            builder.chunk.used = 1;
            builder.total = text.len();
        }
        builder
    }

    /// Total byte length of the logical text
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.total
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    // === Append / Prepend ===

    /// Record `text` after all current content. Zero-copy; `text` must
    /// outlive the builder.
    pub fn append(&mut self, text: &'a str) -> Result<&mut Self, Error> {
        if text.is_empty() {
            return Ok(self);
        }
        let len = text.len();
        self.push_back(Span::new(Cow::Borrowed(text), 0, len))
    }

    /// Record the `text[start..start + len]` window after all current content
    pub fn append_range(
        &mut self,
        text: &'a str,
        start: usize,
        len: usize,
    ) -> Result<&mut Self, Error> {
        if len == 0 {
            return Ok(self);
        }
        check_range(text, start, len)?;
        self.push_back(Span::new(Cow::Borrowed(text), start, len))
    }

    /// Record builder-generated text after all current content, taking
    /// ownership of it
    pub fn append_owned(&mut self, text: String) -> Result<&mut Self, Error> {
        if text.is_empty() {
            return Ok(self);
        }
        let len = text.len();
        self.push_back(Span::new(Cow::Owned(text), 0, len))
    }

    /// Append the line terminator
    pub fn append_line(&mut self) -> Result<&mut Self, Error> {
        self.append(LINE_TERMINATOR)
    }

    /// Append `text` followed by the line terminator
    pub fn append_line_str(&mut self, text: &'a str) -> Result<&mut Self, Error> {
        self.append(text)?.append(LINE_TERMINATOR)
    }

    /// Record `text` before all current content
    pub fn prepend(&mut self, text: &'a str) -> Result<&mut Self, Error> {
        if text.is_empty() {
            return Ok(self);
        }
        let len = text.len();
        self.push_front(Span::new(Cow::Borrowed(text), 0, len))
    }

    /// Record the `text[start..start + len]` window before all current content
    pub fn prepend_range(
        &mut self,
        text: &'a str,
        start: usize,
        len: usize,
    ) -> Result<&mut Self, Error> {
        if len == 0 {
            return Ok(self);
        }
        check_range(text, start, len)?;
        self.push_front(Span::new(Cow::Borrowed(text), start, len))
    }

    /// Record owned text before all current content
    pub fn prepend_owned(&mut self, text: String) -> Result<&mut Self, Error> {
        if text.is_empty() {
            return Ok(self);
        }
        let len = text.len();
        self.push_front(Span::new(Cow::Owned(text), 0, len))
    }

    fn push_back(&mut self, span: Span<'a>) -> Result<&mut Self, Error> {
        let new_total = self.grow_total(span.len)?;
        if self.chunk.used == self.chunk.slots.len() {
            self.grow();
        }
        self.chunk.slots[self.chunk.used] = span;
        self.chunk.used += 1;
        self.total = new_total;
        Ok(self)
    }

    fn push_front(&mut self, span: Span<'a>) -> Result<&mut Self, Error> {
        let new_total = self.grow_total(span.len)?;
        let oldest = oldest_mut(&mut self.chunk);
        if !oldest.slots.is_empty() && (oldest.used == 0 || oldest.slots[0].len == 0) {
            // Slot 0 is free or was cleared by a trim; reuse it in place.
            // Only slot 0 is ever inspected, interior cleared slots stay idle.
            oldest.slots[0] = span;
            if oldest.used == 0 {
                oldest.used = 1;
            }
        } else if oldest.used < oldest.slots.len() {
            oldest.slots[..=oldest.used].rotate_right(1);
            oldest.slots[0] = span;
            oldest.used += 1;
        } else {
            // Oldest chunk is full: splice a fresh chunk in before it
            let mut fresh = Chunk::new(DEFAULT_CAPACITY);
            fresh.slots[0] = span;
            fresh.used = 1;
            oldest.prev = Some(Box::new(fresh));
        }
        self.total = new_total;
        Ok(self)
    }

    /// Checked total-length bump; overflow drops the contents and leaves
    /// an empty zero-capacity builder
    fn grow_total(&mut self, added: usize) -> Result<usize, Error> {
        match self.total.checked_add(added) {
            Some(t) if t <= MAX_LENGTH => Ok(t),
            _ => {
                self.chunk = Chunk::new(0);
                self.total = 0;
                Err(Error::LengthOverflow)
            }
        }
    }

    /// Relink the full tail chunk as `prev` of a fresh, larger tail
    fn grow(&mut self) {
        let new_cap = (self.chunk.slots.len() * 2).clamp(DEFAULT_CAPACITY, MAX_CHUNK_SLOTS);
        let full = mem::replace(&mut self.chunk, Chunk::new(new_cap));
        self.chunk.prev = Some(Box::new(full));
    }

    // === Length & Truncation ===

    /// Reduce the logical length to `new_len` bytes. Growing is rejected
    /// (there are no padding semantics), as is a cut inside a UTF-8 sequence.
    pub fn set_len(&mut self, new_len: usize) -> Result<(), Error> {
        if new_len > self.total {
            return Err(Error::OutOfRange { what: "length" });
        }
        if new_len == self.total {
            return Ok(());
        }
        if new_len == 0 && self.chunk.prev.is_none() {
            for i in 0..self.chunk.used {
                self.chunk.slots[i].clear();
            }
            self.chunk.used = 0;
            self.total = 0;
            return Ok(());
        }

        let (hops, slot, keep) = self.find_cut(new_len)?;

        // Rewind the tail to the chunk holding the cut; newer chunks drop
        for _ in 0..hops {
            if let Some(prev) = self.chunk.prev.take() {
                self.chunk = *prev;
            }
        }
        self.chunk.slots[slot].len = keep;
        for i in slot + 1..self.chunk.used {
            self.chunk.slots[i].clear();
        }
        self.chunk.used = slot + 1;
        self.total = new_len;
        Ok(())
    }

    /// Truncate to empty. The tail rewinds to the oldest chunk of the chain
    pub fn clear(&mut self) -> &mut Self {
        // Zero is always in range and on a boundary
        let _ = self.set_len(0);
        self
    }

    /// Locate the span and cut point where the text would be truncated to
    /// `target` bytes: (chunks behind the tail, slot index, bytes kept).
    fn find_cut(&self, target: usize) -> Result<(usize, usize, usize), Error> {
        let mut remaining = self.total - target;
        let mut hops = 0;
        let mut chunk = &self.chunk;
        loop {
            let mut i = chunk.used;
            while i > 0 {
                i -= 1;
                let span = &chunk.slots[i];
                if span.len >= remaining {
                    let keep = span.len - remaining;
                    if !span.slice().is_char_boundary(keep) {
                        return Err(Error::NotCharBoundary { pos: target });
                    }
                    return Ok((hops, i, keep));
                }
                remaining -= span.len;
            }
            match chunk.prev.as_deref() {
                Some(prev) => {
                    chunk = prev;
                    hops += 1;
                }
                None => return Err(Error::InvalidState),
            }
        }
    }

    // === Trim ===

    /// Remove leading whitespace. Fully-whitespace leading chunks are
    /// detached from the chain.
    pub fn trim_start(&mut self) -> &mut Self {
        loop {
            let had_prev = self.chunk.prev.is_some();
            let oldest = oldest_mut(&mut self.chunk);
            let (removed, stopped) = trim_chunk_start(oldest);
            self.total -= removed;
            if stopped {
                return self;
            }
            if had_prev {
                // The oldest chunk was pure whitespace: cut it off and
                // rescan, since "oldest" now names a different chunk
                detach_oldest(&mut self.chunk);
            } else {
                self.chunk.used = 0;
                return self;
            }
        }
    }

    /// Remove trailing whitespace
    pub fn trim_end(&mut self) -> &mut Self {
        trim_chain_end(&mut self.chunk, &mut self.total);
        self
    }

    /// Remove leading and trailing whitespace
    pub fn trim(&mut self) -> &mut Self {
        self.trim_start();
        self.trim_end()
    }

    // === Flatten ===

    /// Copy every referenced byte, in logical order, into one `String`.
    ///
    /// The chain is walked newest to oldest, filling the buffer back to
    /// front. Every copy is bounds-checked first; a span that no longer fits
    /// its source or the destination surfaces [`Error::InvalidState`] rather
    /// than reading or writing out of bounds.
    pub fn flatten(&self) -> Result<String, Error> {
        if self.total == 0 {
            return Ok(String::new());
        }
        let mut buf = vec![0u8; self.total];
        let mut write_off = self.total;
        let mut chunk = Some(&self.chunk);
        while let Some(c) = chunk {
            let mut i = c.used;
            while i > 0 {
                i -= 1;
                let span = &c.slots[i];
                if span.len == 1 {
                    // Delimiters land here constantly; skip the block copy
                    let off = write_off.checked_sub(1).ok_or(Error::InvalidState)?;
                    let byte = *span
                        .source
                        .as_bytes()
                        .get(span.start)
                        .ok_or(Error::InvalidState)?;
                    buf[off] = byte;
                    write_off = off;
                } else if span.len > 0 {
                    let off = write_off.checked_sub(span.len).ok_or(Error::InvalidState)?;
                    let end = span.start.checked_add(span.len).ok_or(Error::InvalidState)?;
                    let src = span
                        .source
                        .as_bytes()
                        .get(span.start..end)
                        .ok_or(Error::InvalidState)?;
                    buf[off..off + span.len].copy_from_slice(src);
                    write_off = off;
                }
            }
            chunk = c.prev.as_deref();
        }
        String::from_utf8(buf).map_err(|_| Error::InvalidState)
    }

    /// Copy `count` bytes starting at logical offset `src_index` into
    /// `dest[dest_index..]`. Byte windows may split a UTF-8 sequence; the
    /// output is plain bytes.
    pub fn copy_to(
        &self,
        src_index: usize,
        dest: &mut [u8],
        dest_index: usize,
        count: usize,
    ) -> Result<(), Error> {
        if src_index > self.total {
            return Err(Error::OutOfRange { what: "src_index" });
        }
        if count > self.total - src_index {
            return Err(Error::OutOfRange { what: "count" });
        }
        if dest_index > dest.len() || count > dest.len() - dest_index {
            return Err(Error::OutOfRange { what: "destination" });
        }
        if count == 0 {
            return Ok(());
        }

        let win_start = src_index;
        let win_end = src_index + count;
        let mut end = self.total;
        let mut chunk = Some(&self.chunk);
        while let Some(c) = chunk {
            let mut i = c.used;
            while i > 0 {
                i -= 1;
                let span = &c.slots[i];
                if span.len == 0 {
                    continue;
                }
                let start = end.checked_sub(span.len).ok_or(Error::InvalidState)?;
                if start < win_end && end > win_start {
                    // Clip the span to the requested window
                    let lo = start.max(win_start);
                    let hi = end.min(win_end);
                    let src_start = span
                        .start
                        .checked_add(lo - start)
                        .ok_or(Error::InvalidState)?;
                    let src = span
                        .source
                        .as_bytes()
                        .get(src_start..src_start + (hi - lo))
                        .ok_or(Error::InvalidState)?;
                    let dst_start = dest_index + (lo - win_start);
                    dest[dst_start..dst_start + (hi - lo)].copy_from_slice(src);
                }
                end = start;
                if end <= win_start {
                    return Ok(());
                }
            }
            chunk = c.prev.as_deref();
        }
        Ok(())
    }

    // === Edge Queries ===

    /// Whether the flattened text would start with `c`
    #[must_use]
    pub fn starts_with(&self, c: char) -> bool {
        match first_occupied(&self.chunk) {
            Some(span) => span.slice().starts_with(c),
            None => false,
        }
    }

    /// Whether the flattened text would end with `c`
    #[must_use]
    pub fn ends_with(&self, c: char) -> bool {
        // Same backward walk the truncation locator uses
        let mut chunk = Some(&self.chunk);
        while let Some(c_ref) = chunk {
            let mut i = c_ref.used;
            while i > 0 {
                i -= 1;
                let span = &c_ref.slots[i];
                if span.len > 0 {
                    return span.slice().ends_with(c);
                }
            }
            chunk = c_ref.prev.as_deref();
        }
        false
    }
}

impl fmt::Display for SpanBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.flatten() {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

// === Helper Functions ===

fn check_range(text: &str, start: usize, len: usize) -> Result<(), Error> {
    let end = start
        .checked_add(len)
        .ok_or(Error::OutOfRange { what: "start + len" })?;
    if end > text.len() {
        return Err(Error::OutOfRange { what: "start + len" });
    }
    if !text.is_char_boundary(start) {
        return Err(Error::NotCharBoundary { pos: start });
    }
    if !text.is_char_boundary(end) {
        return Err(Error::NotCharBoundary { pos: end });
    }
    Ok(())
}

/// Walk the owning links down to the oldest chunk
fn oldest_mut<'s, 'a>(mut chunk: &'s mut Chunk<'a>) -> &'s mut Chunk<'a> {
    while chunk.prev.is_some() {
        chunk = chunk.prev.as_deref_mut().unwrap();
    }
    chunk
}

/// Drop the oldest chunk from a chain of at least two
fn detach_oldest(chunk: &mut Chunk<'_>) {
    let mut cur = chunk;
    while cur.prev.as_ref().map_or(false, |p| p.prev.is_some()) {
        cur = cur.prev.as_deref_mut().unwrap();
    }
    cur.prev = None;
}

/// Oldest non-cleared span of the chain, if any
fn first_occupied<'s, 'a>(chunk: &'s Chunk<'a>) -> Option<&'s Span<'a>> {
    if let Some(prev) = chunk.prev.as_deref() {
        if let Some(span) = first_occupied(prev) {
            return Some(span);
        }
    }
    chunk.slots[..chunk.used].iter().find(|s| s.len > 0)
}

/// Eat leading whitespace within one chunk. Returns the bytes removed and
/// whether a non-whitespace char stopped the scan.
fn trim_chunk_start(chunk: &mut Chunk<'_>) -> (usize, bool) {
    let mut removed = 0;
    for i in 0..chunk.used {
        let span_len = chunk.slots[i].len;
        if span_len > 0 {
            let slice = chunk.slots[i].slice();
            let advance = slice.len() - slice.trim_start().len();
            if advance < span_len {
                let span = &mut chunk.slots[i];
                span.start += advance;
                span.len -= advance;
                return (removed + advance, true);
            }
            removed += span_len;
        }
        chunk.slots[i].clear();
    }
    (removed, false)
}

/// Eat trailing whitespace across the whole chain, newest span first
fn trim_chain_end(mut cur: &mut Chunk<'_>, total: &mut usize) {
    loop {
        while cur.used > 0 {
            let i = cur.used - 1;
            let span_len = cur.slots[i].len;
            if span_len > 0 {
                let slice = cur.slots[i].slice();
                let cut = slice.len() - slice.trim_end().len();
                if cut < span_len {
                    cur.slots[i].len -= cut;
                    *total -= cut;
                    return;
                }
                *total -= span_len;
                cur.slots[i].clear();
            }
            cur.used -= 1;
        }
        if cur.prev.is_none() {
            return;
        }
        cur = cur.prev.as_deref_mut().unwrap();
    }
}
