//! Parser for backend input declarations such as `Int(default=20, min=1, optional=true)`.
//!
//! Declarations are matched by substring, not by grammar. Fields that cannot be read stay unset;
//! nothing here returns an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::params::parameter::ParameterType;

const INT_TYPE: &str = "Int(";
const FLOAT_TYPE: &str = "Float(";
const BOOL_TYPE: &str = "Bool(";
const TEXT_TYPE: &str = "Text";
const IMAGE_TYPE: &str = "Image";
const IMAGE_LIST_TYPE: &str = "List";

pub const DEFAULT_KEY: &str = "default=";
pub const MIN_KEY: &str = "min=";
pub const MAX_KEY: &str = "max=";
const OPTIONAL_KEY: &str = "optional=";
const NONE_LITERAL: &str = "None";

static HELP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"help='(.*?)'").expect("help pattern is valid"));
static BOOL_DEFAULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"default=([^,\s)]+)").expect("bool pattern is valid"));
static INT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([-+]?\d+)").expect("int pattern is valid"));
static FLOAT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)").expect("float pattern is valid")
});

/// Value of a `default=`/`min=`/`max=` field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeclValue {
    Int(i32),
    Float(f32),
    Bool(bool),
}

/// Classifies a declaration. Priority is fixed: `Int(`, `Float(`, `Text`, `List`, `Image`,
/// `Bool(`. A declaration matching several tokens takes the first.
pub fn classify(decl: &str) -> ParameterType {
    if decl.contains(INT_TYPE) {
        ParameterType::IntSlider
    } else if decl.contains(FLOAT_TYPE) {
        ParameterType::FloatSlider
    } else if decl.contains(TEXT_TYPE) {
        ParameterType::Text
    } else if decl.contains(IMAGE_LIST_TYPE) {
        ParameterType::ImageList
    } else if decl.contains(IMAGE_TYPE) {
        ParameterType::Image
    } else if decl.contains(BOOL_TYPE) {
        ParameterType::Boolean
    } else {
        ParameterType::Unknown
    }
}

fn field_tail<'a>(decl: &'a str, key: &str) -> Option<&'a str> {
    let pos = decl.find(key)?;
    let tail = &decl[pos + key.len()..];
    if tail.trim_start().starts_with(NONE_LITERAL) {
        return None;
    }
    Some(tail)
}

pub fn int_field(decl: &str, key: &str) -> Option<i32> {
    let tail = field_tail(decl, key)?;
    let caps = INT_PREFIX_RE.captures(tail)?;
    caps.get(1)?.as_str().parse().ok()
}

pub fn float_field(decl: &str, key: &str) -> Option<f32> {
    let tail = field_tail(decl, key)?;
    let caps = FLOAT_PREFIX_RE.captures(tail)?;
    caps.get(1)?.as_str().parse().ok()
}

pub fn bool_default(decl: &str) -> Option<bool> {
    let caps = BOOL_DEFAULT_RE.captures(decl)?;
    match caps.get(1)?.as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn help_string(decl: &str) -> String {
    HELP_RE
        .captures(decl)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// `optional=` immediately followed by `true`.
pub fn optional_flag(decl: &str) -> bool {
    decl.find(OPTIONAL_KEY)
        .map(|pos| decl[pos + OPTIONAL_KEY.len()..].starts_with("true"))
        .unwrap_or(false)
}

/// Non-overlapping occurrences of `token`. Used to size image-list inputs.
pub fn count_occurrences(decl: &str, token: &str) -> usize {
    if token.is_empty() {
        return 0;
    }
    decl.matches(token).count()
}

#[cfg(test)]
#[path = "../../tests/unit/schema/decl.rs"]
mod tests;
