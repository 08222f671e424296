//! Pre-compiled format templates for format-string bindings.
//!
//! A template is a sequence of literal text and positional placeholders.
//! Binding text like `"{FirstName} {LastName:F2}"` compiles to the same
//! template as the positional form `"{0} {1:F2}"`.
//!
//! Supported specs: `F<n>` / `N<n>` (fixed decimals, `N` adds thousands
//! separators), `D<n>` (zero-padded integer), `P<n>` (percent), `X` / `x`
//! (hexadecimal). Anything else renders the plain value.

use crate::error::ExprError;
use crate::value::Value;

/// A numeric format applied to one placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatSpec {
    Fixed(usize),
    Number(usize),
    Decimal(usize),
    Percent(usize),
    Hex { upper: bool },
    /// Unrecognised spec, kept for diagnostics; renders the plain value.
    Other(String),
}

impl FormatSpec {
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        let mut chars = spec.chars();
        let Some(kind) = chars.next() else {
            return Self::Other(String::new());
        };
        let rest = chars.as_str();
        let digits = if rest.is_empty() {
            None
        } else {
            rest.parse::<usize>().ok()
        };
        if !rest.is_empty() && digits.is_none() {
            return Self::Other(spec.to_owned());
        }
        match kind {
            'F' | 'f' => Self::Fixed(digits.unwrap_or(2)),
            'N' | 'n' => Self::Number(digits.unwrap_or(2)),
            'D' | 'd' => Self::Decimal(digits.unwrap_or(0)),
            'P' | 'p' => Self::Percent(digits.unwrap_or(2)),
            'X' if rest.is_empty() => Self::Hex { upper: true },
            'x' if rest.is_empty() => Self::Hex { upper: false },
            _ => Self::Other(spec.to_owned()),
        }
    }

    fn render(&self, value: &Value) -> String {
        match (self, value) {
            (Self::Fixed(p), v) if v.as_float().is_some() => {
                format!("{:.*}", *p, v.as_float().unwrap_or_default())
            }
            (Self::Number(p), v) if v.as_float().is_some() => {
                group_thousands(&format!("{:.*}", *p, v.as_float().unwrap_or_default()))
            }
            (Self::Percent(p), v) if v.as_float().is_some() => {
                format!("{:.*}%", *p, v.as_float().unwrap_or_default() * 100.0)
            }
            (Self::Decimal(w), Value::Int(i)) => {
                let sign = if *i < 0 { "-" } else { "" };
                format!("{sign}{:0>width$}", i.unsigned_abs(), width = *w)
            }
            (Self::Hex { upper: true }, Value::Int(i)) => format!("{i:X}"),
            (Self::Hex { upper: false }, Value::Int(i)) => format!("{i:x}"),
            (_, v) => v.to_string(),
        }
    }
}

fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (n, ch) in int_part.chars().enumerate() {
        if n > 0 && (int_part.len() - n) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Arg { index: usize, spec: Option<FormatSpec> },
}

/// A compiled format string.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FormatTemplate {
    pieces: Vec<Piece>,
}

impl FormatTemplate {
    /// Parse a positional template (`"{0} {1:F2}"`, `{{`/`}}` escape braces).
    pub fn parse(text: &str) -> Result<Self, ExprError> {
        let mut template = Self::default();
        for segment in scan(text)? {
            match segment {
                Segment::Literal(literal) => template.push_literal(literal),
                Segment::Token(token) => {
                    let (index, spec) = split_spec(token);
                    let index = index
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| ExprError::EmptyPath(text.to_owned()))?;
                    template.push_arg(index, spec.map(FormatSpec::parse));
                }
            }
        }
        Ok(template)
    }

    pub(crate) fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Piece::Literal(prev)) = self.pieces.last_mut() {
            prev.push_str(text);
        } else {
            self.pieces.push(Piece::Literal(text.to_owned()));
        }
    }

    pub(crate) fn push_arg(&mut self, index: usize, spec: Option<FormatSpec>) {
        self.pieces.push(Piece::Arg { index, spec });
    }

    /// Number of placeholders.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Arg { .. }))
            .count()
    }

    /// Whether the template is a single bare placeholder.
    #[must_use]
    pub fn is_single_arg(&self) -> bool {
        matches!(self.pieces.as_slice(), [Piece::Arg { spec: None, .. }])
    }

    /// Substitute `args` positionally. Missing arguments render empty.
    #[must_use]
    pub fn render(&self, args: &[Value]) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Arg { index, spec } => {
                    let Some(value) = args.get(*index) else {
                        continue;
                    };
                    match spec {
                        Some(spec) => out.push_str(&spec.render(value)),
                        None => out.push_str(&value.to_string()),
                    }
                }
            }
        }
        out
    }
}

/// Split `path:spec` on the first colon.
pub(crate) fn split_spec(token: &str) -> (&str, Option<&str>) {
    match token.split_once(':') {
        Some((path, spec)) => (path, Some(spec)),
        None => (token, None),
    }
}

/// A run of literal text or the inside of one `{...}` token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Token(&'a str),
}

/// Split `text` into literal runs and brace tokens.
pub(crate) fn scan(text: &str) -> Result<Vec<Segment<'_>>, ExprError> {
    let unbalanced = |position| ExprError::UnbalancedBrace {
        text: text.to_owned(),
        position,
    };
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                push_literal(&mut segments, &text[literal_start..i]);
                segments.push(Segment::Literal("{"));
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                push_literal(&mut segments, &text[literal_start..i]);
                segments.push(Segment::Literal("}"));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let close = text[i + 1..].find('}').ok_or_else(|| unbalanced(i))?;
                let token = &text[i + 1..i + 1 + close];
                if token.contains('{') {
                    return Err(unbalanced(i));
                }
                push_literal(&mut segments, &text[literal_start..i]);
                segments.push(Segment::Token(token));
                i += close + 2;
                literal_start = i;
            }
            b'}' => return Err(unbalanced(i)),
            _ => i += 1,
        }
    }
    push_literal(&mut segments, &text[literal_start..]);
    Ok(segments)
}

fn push_literal<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}
