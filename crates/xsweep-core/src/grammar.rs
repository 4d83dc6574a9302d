//! The `key=value` override grammar shared by sweepers and their hosts.
//!
//! Values are rendered so that [`parse_override`] reconstructs them exactly:
//! scalars are written bare when unambiguous, strings are double-quoted when
//! they contain reserved characters or would otherwise re-parse as another
//! type, lists render as `[a,b]` and mappings as `{k:v}`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::errors::{ErrorInfo, SweepError};

/// Characters that force a string value to be quoted at the top level.
const RESERVED: &[char] = &[',', '[', ']', '{', '}', '(', ')', '\'', '"', '\\'];

/// Optional prefix controlling how an override is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverridePrefix {
    /// `key=value`: set an existing key.
    Set,
    /// `+key=value`: add a key that is not present yet.
    Add,
    /// `++key=value`: add or replace.
    ForceAdd,
    /// `~key` or `~key=value`: remove a key.
    Delete,
}

/// A single parsed override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    /// How the override is applied.
    pub prefix: OverridePrefix,
    /// Dotted configuration path, verbatim.
    pub key: String,
    /// Parsed value; `None` only for bare deletions.
    pub value: Option<Value>,
}

/// Renders a value using the override grammar.
pub fn render_value(value: &Value) -> String {
    render(value, false)
}

/// Renders a single `key=value` override. Keys are emitted verbatim.
pub fn render_override(key: &str, value: &Value) -> String {
    format!("{key}={}", render_value(value))
}

fn render(value: &Value, nested: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => render_str(text, nested),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(|item| render(item, true)).collect();
            format!("[{}]", rendered.join(","))
        }
        Value::Object(map) => {
            let rendered: Vec<String> = map
                .iter()
                .map(|(key, item)| format!("{}:{}", render_str(key, true), render(item, true)))
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
    }
}

fn render_str(text: &str, nested: bool) -> String {
    if needs_quotes(text, nested) {
        let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        text.to_string()
    }
}

fn needs_quotes(text: &str, nested: bool) -> bool {
    text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || RESERVED.contains(&c) || (nested && c == ':'))
        || !matches!(classify(text), Value::String(_))
}

/// Interprets an unquoted token as null, boolean, number or string.
fn classify(token: &str) -> Value {
    if token.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if token.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int) = token.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(uint) = token.parse::<u64>() {
        return Value::Number(uint.into());
    }
    if let Some(number) = token.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(token.to_string())
}

fn override_error(code: &str, message: impl Into<String>, text: &str) -> SweepError {
    SweepError::Override(ErrorInfo::new(code, message).with_context("override", text))
}

/// Parses a single override string.
pub fn parse_override(text: &str) -> Result<Override, SweepError> {
    let (prefix, rest) = if let Some(rest) = text.strip_prefix("++") {
        (OverridePrefix::ForceAdd, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (OverridePrefix::Add, rest)
    } else if let Some(rest) = text.strip_prefix('~') {
        (OverridePrefix::Delete, rest)
    } else {
        (OverridePrefix::Set, text)
    };
    let (key, raw_value) = match rest.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value)),
        None => (rest.trim(), None),
    };
    if key.is_empty() {
        return Err(override_error(
            "xsweep.override.empty_key",
            "override has an empty key",
            text,
        ));
    }
    let value = match (prefix, raw_value) {
        (OverridePrefix::Delete, None) => None,
        (_, None) => {
            return Err(SweepError::Override(
                ErrorInfo::new("xsweep.override.missing_value", "override is missing '='")
                    .with_context("override", text)
                    .with_hint("write overrides as key=value"),
            ));
        }
        (_, Some(raw)) => Some(parse_value(raw).map_err(|message| {
            override_error("xsweep.override.malformed_value", message, text)
        })?),
    };
    Ok(Override {
        prefix,
        key: key.to_string(),
        value,
    })
}

/// Parses every override in order.
pub fn parse_overrides<S: AsRef<str>>(overrides: &[S]) -> Result<Vec<Override>, SweepError> {
    overrides
        .iter()
        .map(|text| parse_override(text.as_ref()))
        .collect()
}

/// Applies a sequence of overrides to an ordered mapping; later overrides win.
pub fn merge_overrides<S: AsRef<str>>(
    overrides: &[S],
) -> Result<IndexMap<String, Value>, SweepError> {
    let mut merged = IndexMap::new();
    for parsed in parse_overrides(overrides)? {
        match parsed.prefix {
            OverridePrefix::Delete => {
                merged.shift_remove(&parsed.key);
            }
            _ => {
                merged.insert(parsed.key, parsed.value.unwrap_or(Value::Null));
            }
        }
    }
    Ok(merged)
}

/// Parses a value in the override grammar.
pub fn parse_value(raw: &str) -> Result<Value, String> {
    let mut parser = ValueParser::new(raw);
    parser.skip_ws();
    if parser.at_end() {
        return Ok(Value::String(String::new()));
    }
    let value = parser.element(Context::Top)?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(format!("unexpected trailing input at offset {}", parser.pos));
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Top,
    Element,
    Key,
}

impl Context {
    fn terminates(self, c: char) -> bool {
        match self {
            Context::Top => false,
            Context::Element => matches!(c, ',' | ']' | '}'),
            Context::Key => matches!(c, ':' | ',' | ']' | '}'),
        }
    }
}

struct ValueParser {
    chars: Vec<char>,
    pos: usize,
}

impl ValueParser {
    fn new(raw: &str) -> Self {
        Self {
            chars: raw.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.peek();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn element(&mut self, ctx: Context) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some('"') | Some('\'') => self.quoted().map(Value::String),
            Some('[') => self.list(),
            Some('{') => self.dict(),
            _ => {
                let token = self.token(ctx);
                if token.is_empty() {
                    return Err(format!("expected a value at offset {}", self.pos));
                }
                Ok(classify(&token))
            }
        }
    }

    fn token(&mut self, ctx: Context) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| !ctx.terminates(c)) {
            self.pos += 1;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .trim()
            .to_string()
    }

    fn quoted(&mut self) -> Result<String, String> {
        let start = self.pos;
        let quote = self.bump().ok_or("expected a quote")?;
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(format!("unterminated string starting at offset {start}")),
                Some('\\') => match self.bump() {
                    Some(c) if c == quote || c == '\\' => text.push(c),
                    Some(c) => {
                        text.push('\\');
                        text.push(c);
                    }
                    None => {
                        return Err(format!("unterminated string starting at offset {start}"))
                    }
                },
                Some(c) if c == quote => return Ok(text),
                Some(c) => text.push(c),
            }
        }
    }

    fn list(&mut self) -> Result<Value, String> {
        self.bump();
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Value::Array(items));
        }
        loop {
            items.push(self.element(Context::Element)?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(c) => return Err(format!("expected ',' or ']' but found '{c}'")),
                None => return Err("unterminated list".to_string()),
            }
        }
    }

    fn dict(&mut self) -> Result<Value, String> {
        self.bump();
        let mut map = Map::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::Object(map));
        }
        loop {
            self.skip_ws();
            let key = match self.peek() {
                Some('"') | Some('\'') => self.quoted()?,
                _ => self.token(Context::Key),
            };
            if key.is_empty() {
                return Err(format!("expected a key at offset {}", self.pos));
            }
            self.skip_ws();
            if self.bump() != Some(':') {
                return Err(format!("expected ':' after key '{key}'"));
            }
            let value = self.element(Context::Element)?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => return Err(format!("expected ',' or '}}' but found '{c}'")),
                None => return Err("unterminated mapping".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_scalars() {
        let cases = [
            (json!(1), "a=1"),
            (json!(1.5), "a=1.5"),
            (json!(true), "a=true"),
            (json!(false), "a=false"),
            (Value::Null, "a=null"),
            (json!("foo"), "a=foo"),
            (json!("foo bar"), "a=\"foo bar\""),
            (json!("[1,2]"), "a=\"[1,2]\""),
        ];
        for (value, expected) in cases {
            assert_eq!(render_override("a", &value), expected);
        }
        assert_eq!(render_override("nested.key", &json!("value")), "nested.key=value");
    }

    #[test]
    fn quotes_strings_that_look_like_other_types() {
        assert_eq!(render_value(&json!("true")), "\"true\"");
        assert_eq!(render_value(&json!("42")), "\"42\"");
        assert_eq!(render_value(&json!("1e-3")), "\"1e-3\"");
        assert_eq!(render_value(&json!("")), "\"\"");
        assert_eq!(render_value(&json!("say \"hi\"")), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn renders_containers() {
        assert_eq!(render_value(&json!([1, "a b", null])), "[1,\"a b\",null]");
        assert_eq!(render_value(&json!({"lr": 0.1, "name": "x:y"})), "{lr:0.1,name:\"x:y\"}");
    }

    #[test]
    fn parses_prefixes_and_deletions() {
        let add = parse_override("+trainer.epochs=3").expect("add");
        assert_eq!(add.prefix, OverridePrefix::Add);
        assert_eq!(add.key, "trainer.epochs");
        assert_eq!(add.value, Some(json!(3)));

        let force = parse_override("++db=mysql").expect("force add");
        assert_eq!(force.prefix, OverridePrefix::ForceAdd);

        let delete = parse_override("~seed").expect("delete");
        assert_eq!(delete.prefix, OverridePrefix::Delete);
        assert_eq!(delete.value, None);
    }

    #[test]
    fn rejects_malformed_overrides() {
        let err = parse_override("novalue").expect_err("missing '='");
        assert_eq!(err.info().code, "xsweep.override.missing_value");
        let err = parse_override("=3").expect_err("empty key");
        assert_eq!(err.info().code, "xsweep.override.empty_key");
        let err = parse_override("a=\"open").expect_err("unterminated");
        assert_eq!(err.info().code, "xsweep.override.malformed_value");
        let err = parse_override("a=[1,2").expect_err("unterminated list");
        assert_eq!(err.info().code, "xsweep.override.malformed_value");
    }

    #[test]
    fn parses_nested_values() {
        let parsed = parse_override("opt={name:adam, betas:[0.9,0.99], tag:'a b'}").expect("dict");
        assert_eq!(
            parsed.value,
            Some(json!({"name": "adam", "betas": [0.9, 0.99], "tag": "a b"}))
        );
    }

    #[test]
    fn merge_is_last_write_wins() {
        let merged = merge_overrides(&["a=1", "b=x", "a=2", "~b"]).expect("merge");
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["a"], json!(2));
    }
}
