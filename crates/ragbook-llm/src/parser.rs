//! Structured output parsers. Each parser contributes format instructions to
//! the prompt and parses the model reply; a reply that does not follow the
//! instructions is a `MalformedOutput` error.

use std::marker::PhantomData;
use std::sync::OnceLock;

use ragbook_core::error::{Error, Result};
use regex::Regex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub trait OutputParser {
    type Output;

    fn format_instructions(&self) -> String;
    fn parse(&self, text: &str) -> Result<Self::Output>;
}

fn list_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(\S.*?)\s*$").expect("list pattern is valid"))
}

/// Removes a surrounding Markdown code fence (with or without a language tag).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else { return trimmed };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        // Single line: a language tag may be glued to the payload.
        None => rest.find(|c: char| !c.is_ascii_alphanumeric()).map_or(rest, |i| &rest[i..]),
    };
    body.trim()
}

/// Numbered or bulleted list, one item per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOutputParser;

impl OutputParser for ListOutputParser {
    type Output = Vec<String>;

    fn format_instructions(&self) -> String {
        "Respond with only a numbered list, one item per line, formatted as \"1. item\". \
         Do not include any text before or after the list."
            .to_string()
    }

    fn parse(&self, text: &str) -> Result<Vec<String>> {
        let mut items = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let caps = list_item_regex()
                .captures(line)
                .ok_or_else(|| Error::malformed("list", format!("not a list item: {:?}", line.trim())))?;
            items.push(caps[1].to_string());
        }
        if items.is_empty() {
            return Err(Error::malformed("list", "no list items found"));
        }
        Ok(items)
    }
}

/// A single JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapOutputParser;

impl OutputParser for MapOutputParser {
    type Output = Map<String, Value>;

    fn format_instructions(&self) -> String {
        "Your response should be in JSON format.\n\
         The data structure for the JSON should be a single JSON object with string keys.\n\
         Do not include any explanations, only provide a RFC8259 compliant JSON response following this format without deviation.\n\
         Do not wrap the JSON in Markdown code fences."
            .to_string()
    }

    fn parse(&self, text: &str) -> Result<Map<String, Value>> {
        match serde_json::from_str::<Value>(strip_code_fence(text)) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(Error::malformed("map", format!("expected a JSON object, got {}", json_kind(&other)))),
            Err(e) => Err(Error::malformed("map", e.to_string())),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A record of type `T`, described to the model by its JSON Schema.
pub struct BeanOutputParser<T> {
    schema: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: JsonSchema> BeanOutputParser<T> {
    pub fn new() -> Self {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(T)).expect("JSON Schema always serializes");
        Self { schema, _marker: PhantomData }
    }
}

impl<T: JsonSchema> Default for BeanOutputParser<T> {
    fn default() -> Self { Self::new() }
}

impl<T: DeserializeOwned + JsonSchema> OutputParser for BeanOutputParser<T> {
    type Output = T;

    fn format_instructions(&self) -> String {
        format!(
            "Your response should be in JSON format.\n\
             Do not include any explanations, only provide a RFC8259 compliant JSON response following this format without deviation.\n\
             Do not wrap the JSON in Markdown code fences.\n\
             Here is the JSON Schema instance your output must adhere to:\n{}",
            self.schema
        )
    }

    fn parse(&self, text: &str) -> Result<T> {
        serde_json::from_str(strip_code_fence(text)).map_err(|e| Error::malformed("record", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```true```"), "true");
    }
}
