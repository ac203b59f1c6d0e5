//! `$(NAME)` / `${NAME}` reference resolution
//!
//! Input is tokenized into literal runs and references first; a reference
//! is only replaced when its name is known and every modifier is
//! supported. Anything else is copied through untouched.

use crate::project::model::normalize_path;
use crate::settings::container::SettingsContainer;
use std::path::Path;

/// Piece of an input string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'s> {
    Literal(&'s str),
    Reference {
        /// Full reference text, including `$(`..`)`
        raw: &'s str,
        name: &'s str,
        modifiers: Vec<&'s str>,
    },
}

/// Split `input` into literals and well-formed references
pub fn tokenize(input: &str) -> Vec<Segment<'_>> {
    let bytes = input.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut index = 0;

    while index < bytes.len() {
        if let Some((end, name, modifiers)) = parse_reference(input, index) {
            if literal_start < index {
                segments.push(Segment::Literal(&input[literal_start..index]));
            }
            segments.push(Segment::Reference {
                raw: &input[index..end],
                name,
                modifiers,
            });
            index = end;
            literal_start = end;
        } else {
            index += 1;
        }
    }

    if literal_start < input.len() {
        segments.push(Segment::Literal(&input[literal_start..]));
    }
    segments
}

/// Try to read a reference starting at `start`; returns its end offset
fn parse_reference(input: &str, start: usize) -> Option<(usize, &str, Vec<&str>)> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'$') {
        return None;
    }
    let close = match bytes.get(start + 1) {
        Some(b'(') => ')',
        Some(b'{') => '}',
        _ => return None,
    };

    let body_start = start + 2;
    let body_len = input[body_start..].find(close)?;
    let body = &input[body_start..body_start + body_len];

    let mut parts = body.split(':');
    let name = parts.next()?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let modifiers: Vec<&str> = parts.collect();
    if modifiers.iter().any(|m| m.is_empty()) {
        return None;
    }

    Some((body_start + body_len + 1, name, modifiers))
}

/// Resolves references against one target's settings
#[derive(Debug, Clone, Copy)]
pub struct Interpolator<'a> {
    settings: &'a SettingsContainer,
}

impl<'a> Interpolator<'a> {
    pub fn new(settings: &'a SettingsContainer) -> Self {
        Self { settings }
    }

    pub fn interpolate(&self, input: &str) -> String {
        tokenize(input)
            .into_iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.to_string(),
                Segment::Reference {
                    raw,
                    name,
                    modifiers,
                } => self
                    .resolve(name, &modifiers)
                    .unwrap_or_else(|| raw.to_string()),
            })
            .collect()
    }

    fn resolve(&self, name: &str, modifiers: &[&str]) -> Option<String> {
        let value = self.settings.get(name)?;
        modifiers
            .iter()
            .try_fold(value.to_string(), |value, modifier| {
                apply_modifier(modifier, &value)
            })
    }
}

fn apply_modifier(modifier: &str, value: &str) -> Option<String> {
    let path = Path::new(value);
    let result = match modifier {
        "c99extidentifier" | "identifier" => c_identifier(value),
        "rfc1034identifier" => value
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
            .collect(),
        "lower" => value.to_lowercase(),
        "upper" => value.to_uppercase(),
        "base" => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        "dir" => path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default(),
        "file" => path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        "suffix" => path
            .extension()
            .map(|s| format!(".{}", s.to_string_lossy()))
            .unwrap_or_default(),
        "standardizepath" => normalize_path(path).to_string_lossy().into_owned(),
        "quote" => value
            .chars()
            .flat_map(|c| {
                let escape = matches!(c, ' ' | '\\' | '"' | '\'');
                escape.then_some('\\').into_iter().chain(std::iter::once(c))
            })
            .collect(),
        _ => return None,
    };
    Some(result)
}

fn c_identifier(value: &str) -> String {
    let mut result: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}
