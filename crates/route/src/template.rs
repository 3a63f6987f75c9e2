//! Path templates and the token registry.
//!
//! A template is split on `/` into segments. Each segment is either a literal
//! or a placeholder spanning the whole segment:
//!
//! - `{id}` captures any single segment
//! - `{id:number}` captures a segment matching the registered token `number`
//! - `{year:[0-9]{4}}` captures a segment matching an inline regular expression
//!
//! Empty segments are ignored, so `/items/` and `/items` are the same path.

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// Tokens available without any configuration.
pub const BUILTIN_TOKENS: [(&str, &str); 5] = [
    ("number", "[0-9]+"),
    ("word", "[a-zA-Z]+"),
    ("alphanum_dash", "[a-zA-Z0-9_-]+"),
    ("slug", "[a-z0-9-]+"),
    ("uuid", "[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}"),
];

static BUILTIN_PATTERNS: Lazy<HashMap<String, TokenPattern>> = Lazy::new(|| {
    BUILTIN_TOKENS
        .iter()
        .map(|(alias, source)| {
            let pattern = TokenPattern::compile(alias, source).expect("builtin token pattern is valid");
            ((*alias).to_owned(), pattern)
        })
        .collect()
});

pub(crate) fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// A compiled, anchored segment pattern.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    source: String,
    regex: Regex,
}

impl TokenPattern {
    fn compile(name: &str, source: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| ConfigError::invalid_token(name, e))?;
        Ok(Self { source: source.to_owned(), regex })
    }

    /// The pattern as written, without anchors.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn is_match(&self, segment: &str) -> bool {
        self.regex.is_match(segment)
    }
}

/// Named regular expressions usable as `{name:alias}` in templates.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: HashMap<String, TokenPattern>,
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRegistry {
    /// Creates a registry holding the [`BUILTIN_TOKENS`].
    pub fn new() -> Self {
        Self { tokens: (*BUILTIN_PATTERNS).clone() }
    }

    /// Registers a token, replacing any token with the same alias.
    pub fn register(&mut self, alias: impl Into<String>, pattern: &str) -> Result<(), ConfigError> {
        let alias = alias.into();
        let compiled = TokenPattern::compile(&alias, pattern)?;
        self.tokens.insert(alias, compiled);
        Ok(())
    }

    pub fn get(&self, alias: &str) -> Option<&TokenPattern> {
        self.tokens.get(alias)
    }
}

#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Param { name: String, pattern: Option<TokenPattern> },
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == segment,
            Segment::Param { pattern: Some(pattern), .. } => pattern.is_match(segment),
            Segment::Param { pattern: None, .. } => true,
        }
    }
}

/// A parsed route path such as `/users/{id:number}`.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str, tokens: &TokenRegistry) -> Result<Self, ConfigError> {
        let mut segments = Vec::new();
        for segment in split_segments(template) {
            let parsed = parse_segment(template, segment, tokens)?;
            if let Segment::Param { name, .. } = &parsed {
                let duplicated = segments.iter().any(|s| matches!(s, Segment::Param { name: other, .. } if other == name));
                if duplicated {
                    return Err(ConfigError::invalid_template(template, format!("parameter '{name}' is declared twice")));
                }
            }
            segments.push(parsed);
        }

        let raw = if template.is_empty() { "/".to_owned() } else { template.to_owned() };
        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Matches a request path, returning the captured parameters in template order.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts = split_segments(path);
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            if !segment.matches(part) {
                return None;
            }
            if let Segment::Param { name, .. } = segment {
                params.push((name.clone(), part.to_owned()));
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(template: &str, segment: &str, tokens: &TokenRegistry) -> Result<Segment, ConfigError> {
    if !segment.contains(['{', '}']) {
        return Ok(Segment::Literal(segment.to_owned()));
    }

    let inner = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|inner| braces_balanced(inner))
        .ok_or_else(|| ConfigError::invalid_template(template, format!("malformed placeholder segment '{segment}'")))?;

    let (name, constraint) = match inner.split_once(':') {
        Some((name, constraint)) => (name.trim(), Some(constraint.trim())),
        None => (inner.trim(), None),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::invalid_template(template, format!("invalid parameter name '{name}'")));
    }

    let pattern = match constraint {
        None => None,
        Some("") => return Err(ConfigError::invalid_template(template, format!("empty pattern for '{name}'"))),
        Some(alias_or_regex) => match tokens.get(alias_or_regex) {
            Some(token) => Some(token.clone()),
            None => Some(TokenPattern::compile(name, alias_or_regex)?),
        },
    };

    Ok(Segment::Param { name: name.to_owned(), pattern })
}

fn braces_balanced(s: &str) -> bool {
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}
