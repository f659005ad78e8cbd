//! Pattern-based field extraction from JSON-like text.
//!
//! This is deliberately not a JSON parser. Each field is an independent regex
//! search for `"<key>" : "<value>"`, so the input only has to look roughly
//! like JSON. Values stop at the first closing quote; escaped quotes inside a
//! value are not supported.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::ExtractError;

/// A named field and the regex that captures its value in group 1.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    name: String,
    regex: Regex,
}

impl FieldPattern {
    /// Pattern for a JSON-style `"key": "value"` pair.
    ///
    /// Whitespace is allowed around the colon. The key is regex-escaped, so
    /// keys like `a.b` match literally.
    pub fn for_key(name: impl Into<String>, key: &str) -> Result<Self, ExtractError> {
        let pattern = format!(r#""{}"\s*:\s*"(.*?)""#, regex::escape(key));
        Self::custom(name, &pattern)
    }

    /// Pattern from a raw regex string. Group 1 is the extracted value.
    pub fn custom(name: impl Into<String>, pattern: &str) -> Result<Self, ExtractError> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|source| ExtractError::InvalidPattern {
            field: name.clone(),
            source,
        })?;
        // captures_len counts the implicit whole-match group.
        if regex.captures_len() < 2 {
            return Err(ExtractError::MissingCaptureGroup(name));
        }
        Ok(Self { name, regex })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First match's group 1, or an empty string.
    pub fn find(&self, text: &str) -> String {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}

/// Field name to extracted value. Absent fields map to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    fields: BTreeMap<String, String>,
}

impl ExtractionResult {
    /// The extracted value, or `""` when the field was absent or unknown.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// The extracted value, or `default` when it is empty.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.get(name) {
            "" => default,
            value => value,
        }
    }
}

/// A fixed set of field patterns run against each input.
#[derive(Debug, Clone)]
pub struct Extractor {
    patterns: Vec<FieldPattern>,
}

impl Extractor {
    pub fn new(patterns: Vec<FieldPattern>) -> Self {
        Self { patterns }
    }

    /// Builds one `for_key` pattern per `(name, key)` pair.
    pub fn for_keys<'a, I>(pairs: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let patterns = pairs
            .into_iter()
            .map(|(name, key)| FieldPattern::for_key(name, key))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(patterns))
    }

    /// Runs every pattern independently. Never fails.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let fields = self
            .patterns
            .iter()
            .map(|p| (p.name.clone(), p.find(text)))
            .collect();
        ExtractionResult { fields }
    }
}

/// One-shot lookup of `"key": "value"` in `text`.
pub fn extract_field(text: &str, key: &str) -> String {
    match FieldPattern::for_key(key, key) {
        Ok(pattern) => pattern.find(text),
        // An escaped key always compiles; treat the impossible case as absent.
        Err(_) => String::new(),
    }
}
