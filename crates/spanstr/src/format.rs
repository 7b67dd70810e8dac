//! Composite format expansion: scans a template once and appends literal
//! runs and formatted arguments straight into the builder.

use std::borrow::Cow;

use memchr::memchr2;

use crate::{Error, SpanBuilder};

/// Parse cap for placeholder indices and widths
const MAX_FIELD: usize = 1_000_000;

/// Static spaces for width padding; longer pads append repeated slices
const PAD: &str = "                                ";

/// An argument for a composite format template.
///
/// `None` is the absent-argument marker and formats as the empty string.
/// Numeric variants understand a subformat (`D`/`X`/`F` families); the other
/// variants render their default text and ignore it.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Str(&'a str),
    Char(char),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    None,
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Str(v)
    }
}

impl From<char> for Value<'_> {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u64> for Value<'_> {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<u32> for Value<'_> {
    fn from(v: u32) -> Self {
        Value::Uint(u64::from(v))
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// Converted argument text; borrowed when no rewriting was needed
enum Formatted<'a> {
    Borrowed(&'a str),
    Owned(String),
}

impl Formatted<'_> {
    fn char_count(&self) -> usize {
        match self {
            Formatted::Borrowed(s) => s.chars().count(),
            Formatted::Owned(s) => s.chars().count(),
        }
    }
}

impl<'a> SpanBuilder<'a> {
    /// Expand `{index[,width][:subformat]}` placeholders from `format`,
    /// appending literal runs and argument text.
    ///
    /// Literal runs become zero-copy spans into `format`. `{{` and `}}`
    /// escape literal braces. A malformed template aborts the call with
    /// [`Error::InvalidFormat`]; text appended before the failure point
    /// stays in the builder.
    pub fn append_format(
        &mut self,
        format: &'a str,
        args: &[Value<'a>],
    ) -> Result<&mut Self, Error> {
        self.format_helper(format, args, None)
    }

    /// Like [`append_format`](Self::append_format), but offers every
    /// argument to `custom` first. A `Some` result is used verbatim
    /// (width padding still applies); `None` falls back to the default
    /// conversion.
    pub fn append_format_with<F>(
        &mut self,
        format: &'a str,
        args: &[Value<'a>],
        custom: F,
    ) -> Result<&mut Self, Error>
    where
        F: Fn(Option<&str>, &Value<'a>) -> Option<String>,
    {
        self.format_helper(format, args, Some(&custom))
    }

    fn format_helper(
        &mut self,
        format: &'a str,
        args: &[Value<'a>],
        custom: Option<&dyn Fn(Option<&str>, &Value<'a>) -> Option<String>>,
    ) -> Result<&mut Self, Error> {
        let bytes = format.as_bytes();
        let len = bytes.len();
        let mut pos = 0;

        'template: loop {
            // Literal run: bulk-scan to the next brace
            let mut run_start = pos;
            loop {
                if pos == len {
                    if run_start != pos {
                        self.append_range(format, run_start, pos - run_start)?;
                    }
                    break 'template;
                }
                let Some(off) = memchr2(b'{', b'}', &bytes[pos..]) else {
                    self.append_range(format, run_start, len - run_start)?;
                    break 'template;
                };
                let at = pos + off;
                if bytes[at] == b'}' {
                    if bytes.get(at + 1) == Some(&b'}') {
                        // Escape: emit the run through the first brace
                        self.append_range(format, run_start, at + 1 - run_start)?;
                        pos = at + 2;
                        run_start = pos;
                    } else {
                        return Err(Error::InvalidFormat { pos: at });
                    }
                } else if bytes.get(at + 1) == Some(&b'{') {
                    self.append_range(format, run_start, at + 1 - run_start)?;
                    pos = at + 2;
                    run_start = pos;
                } else {
                    if run_start != at {
                        self.append_range(format, run_start, at - run_start)?;
                    }
                    pos = at + 1;
                    break;
                }
            }

            // Index: a digit run, capped to keep parsing bounded
            let mut ch = *bytes.get(pos).ok_or(Error::InvalidFormat { pos: len })?;
            if !ch.is_ascii_digit() {
                return Err(Error::InvalidFormat { pos });
            }
            let mut index = 0usize;
            loop {
                index = index * 10 + usize::from(ch - b'0');
                pos += 1;
                ch = *bytes.get(pos).ok_or(Error::InvalidFormat { pos: len })?;
                if !ch.is_ascii_digit() || index >= MAX_FIELD {
                    break;
                }
            }
            if index >= args.len() {
                return Err(Error::IndexOutOfRange {
                    index,
                    count: args.len(),
                });
            }
            while pos < len && bytes[pos] == b' ' {
                pos += 1;
            }

            // Optional `,[-]width`
            let mut left_justify = false;
            let mut width = 0usize;
            if bytes.get(pos) == Some(&b',') {
                pos += 1;
                while pos < len && bytes[pos] == b' ' {
                    pos += 1;
                }
                let mut ch = *bytes.get(pos).ok_or(Error::InvalidFormat { pos: len })?;
                if ch == b'-' {
                    left_justify = true;
                    pos += 1;
                    ch = *bytes.get(pos).ok_or(Error::InvalidFormat { pos: len })?;
                }
                if !ch.is_ascii_digit() {
                    return Err(Error::InvalidFormat { pos });
                }
                loop {
                    width = width * 10 + usize::from(ch - b'0');
                    pos += 1;
                    ch = *bytes.get(pos).ok_or(Error::InvalidFormat { pos: len })?;
                    if !ch.is_ascii_digit() || width >= MAX_FIELD {
                        break;
                    }
                }
            }
            while pos < len && bytes[pos] == b' ' {
                pos += 1;
            }

            // Optional `:subformat`, raw up to the matching unescaped `}`
            let mut item_format: Option<Cow<'_, str>> = None;
            let mut spec_pos = pos;
            if bytes.get(pos) == Some(&b':') {
                pos += 1;
                spec_pos = pos;
                let spec_start = pos;
                let mut escaped = false;
                loop {
                    let ch = *bytes.get(pos).ok_or(Error::InvalidFormat { pos: len })?;
                    pos += 1;
                    if ch == b'{' {
                        if bytes.get(pos) == Some(&b'{') {
                            escaped = true;
                            pos += 1;
                        } else {
                            return Err(Error::InvalidFormat { pos: pos - 1 });
                        }
                    } else if ch == b'}' {
                        if bytes.get(pos) == Some(&b'}') {
                            escaped = true;
                            pos += 1;
                        } else {
                            pos -= 1;
                            break;
                        }
                    }
                }
                if spec_start != pos {
                    let raw = &format[spec_start..pos];
                    item_format = Some(if escaped {
                        Cow::Owned(raw.replace("{{", "{").replace("}}", "}"))
                    } else {
                        Cow::Borrowed(raw)
                    });
                }
            }

            if bytes.get(pos) != Some(&b'}') {
                return Err(Error::InvalidFormat { pos: pos.min(len) });
            }
            pos += 1;

            // Convert: custom hook first, then the value's own conversion
            let arg = &args[index];
            let spec = item_format.as_deref();
            let text = match custom.and_then(|hook| hook(spec, arg)) {
                Some(s) => Formatted::Owned(s),
                None => convert(arg, spec, spec_pos)?,
            };

            let pad = width.saturating_sub(text.char_count());
            if !left_justify && pad > 0 {
                self.append_pad(pad)?;
            }
            match text {
                Formatted::Borrowed(s) => self.append(s)?,
                Formatted::Owned(s) => self.append_owned(s)?,
            };
            if left_justify && pad > 0 {
                self.append_pad(pad)?;
            }
        }
        Ok(self)
    }

    fn append_pad(&mut self, mut pad: usize) -> Result<(), Error> {
        while pad > 0 {
            let take = pad.min(PAD.len());
            self.append(&PAD[..take])?;
            pad -= take;
        }
        Ok(())
    }
}

// === Argument Conversion ===

fn convert<'a>(arg: &Value<'a>, spec: Option<&str>, pos: usize) -> Result<Formatted<'a>, Error> {
    Ok(match *arg {
        Value::Str(s) => Formatted::Borrowed(s),
        Value::Char(c) => Formatted::Owned(c.to_string()),
        Value::Int(v) => Formatted::Owned(match spec {
            Some(spec) => fmt_int(v, spec, pos)?,
            None => v.to_string(),
        }),
        Value::Uint(v) => Formatted::Owned(match spec {
            Some(spec) => fmt_uint(v, spec, pos)?,
            None => v.to_string(),
        }),
        Value::Float(v) => Formatted::Owned(match spec {
            Some(spec) => fmt_float(v, spec, pos)?,
            None => v.to_string(),
        }),
        Value::Bool(v) => Formatted::Owned(v.to_string()),
        Value::None => Formatted::Borrowed(""),
    })
}

/// Split a numeric subformat into its letter and optional precision
/// (at most two digits, like the standard numeric format strings)
fn numeric_spec(spec: &str, pos: usize) -> Result<(u8, Option<usize>), Error> {
    let bytes = spec.as_bytes();
    let (&letter, digits) = bytes.split_first().ok_or(Error::InvalidFormat { pos })?;
    if digits.len() > 2 || !digits.iter().all(u8::is_ascii_digit) {
        return Err(Error::InvalidFormat { pos });
    }
    let precision = if digits.is_empty() {
        None
    } else {
        Some(
            digits
                .iter()
                .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0')),
        )
    };
    Ok((letter, precision))
}

fn fmt_int(v: i64, spec: &str, pos: usize) -> Result<String, Error> {
    let (letter, precision) = numeric_spec(spec, pos)?;
    match letter {
        b'D' | b'd' => {
            // Sign is not part of the digit count
            let width = precision.unwrap_or(1) + usize::from(v < 0);
            Ok(format!("{v:0width$}"))
        }
        b'X' => {
            let width = precision.unwrap_or(1);
            Ok(format!("{v:0width$X}"))
        }
        b'x' => {
            let width = precision.unwrap_or(1);
            Ok(format!("{v:0width$x}"))
        }
        _ => Err(Error::InvalidFormat { pos }),
    }
}

fn fmt_uint(v: u64, spec: &str, pos: usize) -> Result<String, Error> {
    let (letter, precision) = numeric_spec(spec, pos)?;
    let width = precision.unwrap_or(1);
    match letter {
        b'D' | b'd' => Ok(format!("{v:0width$}")),
        b'X' => Ok(format!("{v:0width$X}")),
        b'x' => Ok(format!("{v:0width$x}")),
        _ => Err(Error::InvalidFormat { pos }),
    }
}

fn fmt_float(v: f64, spec: &str, pos: usize) -> Result<String, Error> {
    let (letter, precision) = numeric_spec(spec, pos)?;
    match letter {
        b'F' | b'f' => Ok(format!("{v:.prec$}", prec = precision.unwrap_or(2))),
        _ => Err(Error::InvalidFormat { pos }),
    }
}
