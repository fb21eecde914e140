//! Field annotation mini-language.
//!
//! An annotation looks like `omniarg:"db_host required=true aliases=h,host"`.
//! The first bare token overrides the argument name (`-` skips the field);
//! every other token is a `key=value` option. Quoted strings and
//! parenthesized groups are single tokens even when they contain spaces or
//! commas, so `type=enum(a, b)` stays whole.
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::TagError;

/// Annotation namespace the binder reads.
pub const TAG_NAMESPACE: &str = "omniarg";

/// Name override that skips the field.
pub const SKIP_MARKER: &str = "-";

// ------------------------------ Option keys ------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKey {
    Aliases,
    Positional,
    Required,
    Last,
    Leftovers,
    AllowHyphenValues,
    AllowNegativeNumbers,
    GroupOccurrences,
    Requires,
    ConflictsWith,
    RequiredWithout,
    RequiredWithoutAll,
    RequiredIfEq,
    RequiredIfEqAll,
    Type,
    Values,
    Placeholders,
    Desc,
    Default,
    DefaultMissingValue,
    NumValues,
    Delimiter,
}

/// How the raw value of a key is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueClass {
    Flag,
    List,
    Condition,
    Type,
    Placeholders,
    Text,
}

impl TagKey {
    pub fn parse(key: &str) -> Option<Self> {
        let key = match key {
            "aliases" => TagKey::Aliases,
            "positional" => TagKey::Positional,
            "required" => TagKey::Required,
            "last" => TagKey::Last,
            "leftovers" => TagKey::Leftovers,
            "allow_hyphen_values" => TagKey::AllowHyphenValues,
            "allow_negative_numbers" => TagKey::AllowNegativeNumbers,
            "group_occurrences" => TagKey::GroupOccurrences,
            "requires" => TagKey::Requires,
            "conflicts_with" => TagKey::ConflictsWith,
            "required_without" => TagKey::RequiredWithout,
            "required_without_all" => TagKey::RequiredWithoutAll,
            "required_if_eq" => TagKey::RequiredIfEq,
            "required_if_eq_all" => TagKey::RequiredIfEqAll,
            "type" => TagKey::Type,
            "values" => TagKey::Values,
            "placeholders" | "placeholder" => TagKey::Placeholders,
            "desc" => TagKey::Desc,
            "default" => TagKey::Default,
            "default_missing_value" => TagKey::DefaultMissingValue,
            "num_values" => TagKey::NumValues,
            "delimiter" => TagKey::Delimiter,
            _ => return None,
        };
        Some(key)
    }

    fn class(self) -> ValueClass {
        match self {
            TagKey::Positional
            | TagKey::Required
            | TagKey::Last
            | TagKey::Leftovers
            | TagKey::AllowHyphenValues
            | TagKey::AllowNegativeNumbers
            | TagKey::GroupOccurrences => ValueClass::Flag,
            TagKey::Aliases
            | TagKey::Requires
            | TagKey::ConflictsWith
            | TagKey::RequiredWithout
            | TagKey::RequiredWithoutAll
            | TagKey::Values => ValueClass::List,
            TagKey::RequiredIfEq | TagKey::RequiredIfEqAll => ValueClass::Condition,
            TagKey::Type => ValueClass::Type,
            TagKey::Placeholders => ValueClass::Placeholders,
            TagKey::Desc
            | TagKey::Default
            | TagKey::DefaultMissingValue
            | TagKey::NumValues
            | TagKey::Delimiter => ValueClass::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Flag(bool),
    List(Vec<String>),
    Text(String),
    /// `field:value` pairs, in written order.
    Condition(IndexMap<String, String>),
}

// ------------------------------ Tag options ------------------------------ //

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagOptions {
    pub name: Option<String>,
    pub skip: bool,
    pub options: IndexMap<TagKey, TagValue>,
}

impl TagOptions {
    pub fn skipped() -> Self {
        Self { name: Some(SKIP_MARKER.to_string()), skip: true, options: IndexMap::new() }
    }

    /// Non-empty name override.
    pub fn name_override(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn get(&self, key: TagKey) -> Option<&TagValue> {
        self.options.get(&key)
    }

    pub fn flag(&self, key: TagKey) -> bool {
        matches!(self.get(key), Some(TagValue::Flag(true)))
    }

    pub fn list(&self, key: TagKey) -> Option<&[String]> {
        match self.get(key) {
            Some(TagValue::List(xs)) => Some(xs),
            _ => None,
        }
    }

    pub fn text(&self, key: TagKey) -> Option<&str> {
        match self.get(key) {
            Some(TagValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn condition(&self, key: TagKey) -> Option<&IndexMap<String, String>> {
        match self.get(key) {
            Some(TagValue::Condition(m)) => Some(m),
            _ => None,
        }
    }
}

// -------------------------------- Parsing -------------------------------- //

/// Parses the contents of one annotation namespace.
pub fn parse_tag(contents: &str) -> Result<TagOptions, TagError> {
    let mut out = TagOptions::default();

    for part in split_respecting(contents, ' ', true, true) {
        let Some((key, value)) = part.split_once('=') else {
            let bare = part.trim();
            if bare.is_empty() || out.name.is_some() {
                continue;
            }
            if bare == SKIP_MARKER {
                return Ok(TagOptions::skipped());
            }
            out.name = Some(bare.to_string());
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(TagError::EmptyKey { key: part.clone() });
        }
        let tag_key = TagKey::parse(key).ok_or_else(|| TagError::UnknownOption { key: key.to_string() })?;
        let value = value.trim().trim_matches('"');

        match tag_key.class() {
            ValueClass::Flag => {
                out.options.insert(tag_key, TagValue::Flag(value == "true"));
            }
            ValueClass::List => {
                out.options.insert(tag_key, TagValue::List(split_list(value)));
            }
            ValueClass::Condition => {
                out.options.insert(tag_key, TagValue::Condition(parse_conditions(value)));
            }
            ValueClass::Type => {
                let (ty, values) = parse_type_option(value);
                out.options.insert(TagKey::Type, TagValue::Text(ty));
                if let Some(values) = values {
                    out.options.insert(TagKey::Values, TagValue::List(values));
                }
            }
            ValueClass::Placeholders => {
                let placeholders = value.split(' ').map(|p| p.trim().to_string()).collect();
                out.options.insert(TagKey::Placeholders, TagValue::List(placeholders));
            }
            ValueClass::Text => {
                out.options.insert(tag_key, TagValue::Text(value.to_string()));
            }
        }
    }

    Ok(out)
}

/// Finds `namespace` in a full annotation (`a:"x" omniarg:"y"`) and returns
/// its value. Surrounding quotes are removed, along with `\"` escapes, only
/// when they wrap the value on both sides.
pub fn extract_tag(annotation: &str, namespace: &str) -> Option<String> {
    let annotation = annotation.trim_matches('`');
    for token in split_respecting(annotation, ' ', true, false) {
        let (key, value) = match token.split_once(':') {
            Some((key, value)) => (key, Some(value)),
            None => (token.as_str(), None),
        };
        if key != namespace {
            continue;
        }
        let Some(value) = value else {
            return Some(String::new());
        };
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            return Some(value[1..value.len() - 1].replace("\\\"", "\""));
        }
        return Some(value.to_string());
    }
    None
}

/// Extracts `namespace` from an annotation and parses it. `Ok(None)` when the
/// namespace is absent; an empty value yields empty options.
pub fn extract_and_parse_tag(annotation: &str, namespace: &str) -> Result<Option<TagOptions>, TagError> {
    let Some(contents) = extract_tag(annotation, namespace) else {
        return Ok(None);
    };
    match contents.as_str() {
        "" => Ok(Some(TagOptions::default())),
        SKIP_MARKER => Ok(Some(TagOptions::skipped())),
        _ => parse_tag(&contents).map(Some),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

fn parse_conditions(value: &str) -> IndexMap<String, String> {
    let mut conditions = IndexMap::new();
    for pair in value.split(',') {
        let kv: Vec<&str> = pair.split(':').collect();
        if let [field, expected] = kv.as_slice() {
            conditions.insert(field.trim().to_string(), expected.trim().to_string());
        }
    }
    conditions
}

/// `type=` accepts `array/<t>` or `[<t>]` for arrays and `enum(a,b)` or
/// `(a,b)` for enumerations. Returns the normalized type and the enum values.
fn parse_type_option(value: &str) -> (String, Option<Vec<String>>) {
    let mut ty = value;
    let mut is_array = false;

    if let Some(inner) = ty.strip_prefix("array/") {
        ty = inner;
        is_array = true;
    } else if let Some(inner) = ty.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        ty = inner;
        is_array = true;
    }

    let enum_body = ty
        .strip_prefix("enum(")
        .or_else(|| ty.strip_prefix('('))
        .and_then(|t| t.strip_suffix(')'));

    let (base, values) = match enum_body {
        Some(body) => ("enum", Some(body.split(',').map(|v| v.trim().to_string()).collect())),
        None => (ty, None),
    };

    let ty = if is_array { format!("array/{base}") } else { base.to_string() };
    (ty, values)
}

/// Splits on `sep` except inside double quotes (when `respect_quotes`, with
/// `\"` escapes) and inside parentheses (when `respect_parens`). Quotes and
/// parentheses are kept in the tokens.
pub fn split_respecting(s: &str, sep: char, respect_quotes: bool, respect_parens: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut depth: i32 = 0;
    let mut escaped = false;

    for c in s.chars() {
        if c == sep {
            if in_quote || depth > 0 {
                current.push(c);
            } else {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            match c {
                '\\' => escaped = !escaped,
                '"' if respect_quotes && !escaped => in_quote = !in_quote,
                '(' if respect_parens => depth += 1,
                ')' if respect_parens => depth -= 1,
                _ => {}
            }
            current.push(c);
        }

        if escaped && c != '\\' {
            escaped = false;
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

// ------------------------------- Tests ------------------------------------ //
