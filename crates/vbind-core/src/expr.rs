#![forbid(unsafe_code)]

//! Binding expression grammar.
//!
//! Markup hands binding strings to owners; this module turns them into a
//! [`BindingExpr`] the runtime can wire up.
//!
//! ```text
//! {Path}                      single binding
//! Hello {First} {Last:F2}     format-string binding (one arg per token)
//! $Type.Method({A}, {B})      static transform binding
//! $Method({A})                transform resolved on the logical parent
//! ```
//!
//! Token prefixes, in any order before the path:
//!
//! | Prefix | Meaning |
//! |--------|---------|
//! | `#` | resolve against the local owner |
//! | `!` | negate (boolean values only) |
//! | `=` | one-way, no reverse binding |
//! | `@` | resource reference `@dict.key` or `@key` |

use crate::error::ExprError;
use crate::format::{FormatSpec, FormatTemplate, Segment, scan, split_spec};

/// Reference into a resource dictionary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRef {
    /// `None` means the configured default dictionary.
    pub dictionary: Option<String>,
    pub key: String,
}

/// One `{...}` token of a binding expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRef {
    /// Field path; for resources the raw `dict.key` text.
    pub path: String,
    pub local: bool,
    pub negate: bool,
    pub one_way: bool,
    pub resource: Option<ResourceRef>,
    pub spec: Option<FormatSpec>,
}

/// Shape of a binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Single,
    MultiTransform,
    MultiFormatString,
}

/// Transform function named by a `$Name(...)` expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransformRef {
    /// `Type.Method`, looked up in the static transform table.
    Static { qualified: String },
    /// Bare method name, resolved on the logical parent owner.
    Method { name: String },
}

/// A parsed binding expression.
#[derive(Clone, Debug, PartialEq)]
pub struct BindingExpr {
    pub kind: BindingKind,
    pub sources: Vec<SourceRef>,
    pub template: Option<FormatTemplate>,
    pub transform: Option<TransformRef>,
}

impl BindingExpr {
    /// Whether a single binding also propagates target back to source.
    #[must_use]
    pub fn is_two_way(&self) -> bool {
        self.kind == BindingKind::Single
            && self
                .sources
                .first()
                .is_some_and(|s| !s.one_way && s.resource.is_none())
    }
}

/// Whether `text` looks like a binding rather than a literal value.
#[must_use]
pub fn is_binding(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('$')
        || scan(text).is_ok_and(|segments| {
            segments
                .iter()
                .any(|seg| matches!(seg, Segment::Token(_)))
        })
}

/// Parse a binding string.
pub fn parse(text: &str) -> Result<BindingExpr, ExprError> {
    let trimmed = text.trim();
    if let Some(call) = trimmed.strip_prefix('$') {
        return parse_transform(text, call);
    }

    let mut sources = Vec::new();
    let mut template = FormatTemplate::default();
    for segment in scan(text)? {
        match segment {
            Segment::Literal(literal) => template.push_literal(literal),
            Segment::Token(token) => {
                let source = parse_token(text, token)?;
                template.push_arg(sources.len(), source.spec.clone());
                sources.push(source);
            }
        }
    }
    if sources.is_empty() {
        return Err(ExprError::NoBindingTokens(text.to_owned()));
    }

    if template.is_single_arg() {
        Ok(BindingExpr {
            kind: BindingKind::Single,
            sources,
            template: None,
            transform: None,
        })
    } else {
        Ok(BindingExpr {
            kind: BindingKind::MultiFormatString,
            sources,
            template: Some(template),
            transform: None,
        })
    }
}

fn parse_transform(text: &str, call: &str) -> Result<BindingExpr, ExprError> {
    let malformed = || ExprError::MalformedTransform(text.to_owned());
    let open = call.find('(').ok_or_else(malformed)?;
    let args = call[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
    let name = call[..open].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(malformed());
    }

    let mut sources = Vec::new();
    for arg in split_args(args) {
        let arg = arg.trim();
        if arg.is_empty() {
            continue;
        }
        let inner = arg
            .strip_prefix('{')
            .and_then(|a| a.strip_suffix('}'))
            .filter(|a| !a.contains(['{', '}']))
            .ok_or_else(|| ExprError::TransformArgument(arg.to_owned()))?;
        sources.push(parse_token(text, inner)?);
    }

    let transform = if name.contains('.') {
        TransformRef::Static {
            qualified: name.to_owned(),
        }
    } else {
        TransformRef::Method {
            name: name.to_owned(),
        }
    };
    Ok(BindingExpr {
        kind: BindingKind::MultiTransform,
        sources,
        template: None,
        transform: Some(transform),
    })
}

/// Split on commas that are outside braces.
fn split_args(args: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in args.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&args[start..]);
    out
}

fn parse_token(text: &str, token: &str) -> Result<SourceRef, ExprError> {
    let (body, spec) = split_spec(token.trim());
    let mut source = SourceRef {
        path: String::new(),
        local: false,
        negate: false,
        one_way: false,
        resource: None,
        spec: spec.map(FormatSpec::parse),
    };

    let mut rest = body.trim();
    loop {
        let Some(first) = rest.chars().next() else {
            break;
        };
        match first {
            '#' => source.local = true,
            '!' => source.negate = true,
            '=' => source.one_way = true,
            '@' => {
                let key_text = rest[1..].trim();
                if key_text.is_empty() {
                    return Err(ExprError::EmptyPath(text.to_owned()));
                }
                source.resource = Some(match key_text.split_once('.') {
                    Some((dict, key)) if !dict.is_empty() && !key.is_empty() => ResourceRef {
                        dictionary: Some(dict.to_owned()),
                        key: key.to_owned(),
                    },
                    _ => ResourceRef {
                        dictionary: None,
                        key: key_text.to_owned(),
                    },
                });
                source.path = key_text.to_owned();
                return Ok(source);
            }
            _ => break,
        }
        rest = &rest[1..];
    }

    let path = rest.trim();
    if path.is_empty() || path.contains(char::is_whitespace) {
        return Err(ExprError::EmptyPath(text.to_owned()));
    }
    source.path = path.to_owned();
    Ok(source)
}
