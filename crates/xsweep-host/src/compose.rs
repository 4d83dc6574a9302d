use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;
use xsweep_core::{ErrorInfo, SweepError};
use xsweep_exp::{from_yaml_str, SWEEPER_SECTION};

use crate::search_path::ConfigSearchPath;

/// Key of the defaults list in a primary config.
pub const DEFAULTS_KEY: &str = "defaults";
/// Sweeper option used when the defaults list does not choose one.
pub const DEFAULT_SWEEPER: &str = "explicit";

const SELF_ENTRY: &str = "_self_";

fn compose_error(code: &str, message: impl Into<String>) -> SweepError {
    SweepError::Config(ErrorInfo::new(code, message))
}

/// Reads a primary YAML config from disk.
pub fn load_primary(path: &Path) -> Result<Value, SweepError> {
    let text = fs::read_to_string(path).map_err(|err| {
        SweepError::Serde(
            ErrorInfo::new("xsweep.compose.read_primary", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    from_yaml_str(&text)
}

/// Deep-merges `overlay` into `base`. Mappings merge key by key, with new
/// keys appended; any other overlay value replaces the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing.take(), value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Merges layers in order; later layers win.
pub fn merge_layers<I: IntoIterator<Item = Value>>(layers: I) -> Value {
    layers
        .into_iter()
        .fold(Value::Object(Map::new()), deep_merge)
}

/// Group choices (`group -> option`) declared by a defaults list.
pub fn parse_defaults(defaults: &Value) -> Result<IndexMap<String, String>, SweepError> {
    let mut choices = IndexMap::new();
    match defaults {
        Value::Null => {}
        Value::Object(map) => {
            for (group, option) in map {
                choices.insert(group.clone(), option_name(group, option)?);
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(name) if name == SELF_ENTRY => {}
                    Value::Object(map) if map.len() == 1 => {
                        for (group, option) in map {
                            choices.insert(group.clone(), option_name(group, option)?);
                        }
                    }
                    other => {
                        return Err(compose_error(
                            "xsweep.compose.unsupported_default",
                            format!("unsupported defaults entry: {other}"),
                        ))
                    }
                }
            }
        }
        other => {
            return Err(compose_error(
                "xsweep.compose.defaults_type",
                format!("defaults must be a list, found {other}"),
            ))
        }
    }
    Ok(choices)
}

fn option_name(group: &str, option: &Value) -> Result<String, SweepError> {
    option.as_str().map(str::to_string).ok_or_else(|| {
        SweepError::Config(
            ErrorInfo::new(
                "xsweep.compose.option_type",
                format!("option for group '{group}' must be a string"),
            )
            .with_context("group", group),
        )
    })
}

fn nest(group: &str, node: Value) -> Value {
    group.rsplit('/').fold(node, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

/// Composes the global configuration.
///
/// Group options chosen by the primary's defaults list (plus `choices`, which
/// win) are loaded from the search path, nested under their group path and
/// merged first; the primary document is merged last. The sweeper group
/// defaults to [`DEFAULT_SWEEPER`].
pub fn compose(
    primary: Value,
    search_path: &ConfigSearchPath,
    choices: &IndexMap<String, String>,
) -> Result<Value, SweepError> {
    let root = match primary {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(compose_error(
                "xsweep.compose.not_a_mapping",
                format!("primary config must be a mapping, found {other}"),
            ))
        }
    };
    let mut selected = parse_defaults(root.get(DEFAULTS_KEY).unwrap_or(&Value::Null))?;
    if !selected.contains_key(SWEEPER_SECTION) {
        selected.insert(SWEEPER_SECTION.to_string(), DEFAULT_SWEEPER.to_string());
    }
    for (group, option) in choices {
        selected.insert(group.clone(), option.clone());
    }

    let mut layers = Vec::with_capacity(selected.len() + 1);
    for (group, option) in &selected {
        debug!("composing {}={}", group, option);
        layers.push(nest(group, search_path.load(group, option)?));
    }
    let body: Map<String, Value> = root
        .into_iter()
        .filter(|(key, _)| key != DEFAULTS_KEY)
        .collect();
    layers.push(Value::Object(body));
    Ok(merge_layers(layers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_layers_win_and_lists_are_replaced() {
        let merged = merge_layers([
            json!({"sweeper": {"seed_key": "seed", "combinations": [], "seeds": null}}),
            json!({"sweeper": {"combinations": [{"a": 1}], "seeds": [1, 2]}, "lr": 0.1}),
            json!({"lr": 0.2}),
        ]);
        assert_eq!(
            merged,
            json!({
                "sweeper": {"seed_key": "seed", "combinations": [{"a": 1}], "seeds": [1, 2]},
                "lr": 0.2
            })
        );
    }

    #[test]
    fn nests_group_paths() {
        assert_eq!(nest("hydra/sweeper", json!({"x": 1})), json!({"hydra": {"sweeper": {"x": 1}}}));
    }

    #[test]
    fn parses_defaults_list_and_mapping() {
        let list = parse_defaults(&json!(["_self_", {"sweeper": "explicit"}])).expect("list");
        assert_eq!(list.get("sweeper").map(String::as_str), Some("explicit"));
        let map = parse_defaults(&json!({"sweeper": "explicit"})).expect("map");
        assert_eq!(list, map);
        let err = parse_defaults(&json!(["db"])).expect_err("bare entry");
        assert_eq!(err.info().code, "xsweep.compose.unsupported_default");
    }
}
