//! Configuration loading and environment parsing.

use super::validation::validate_config;
use super::Config;
use serde_json::Value;
use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

const ENV_JSON: &str = "VOICELINK_CONFIG_JSON";
const ENV_STDIN: &str = "VOICELINK_CONFIG_STDIN";
const ENV_PATH: &str = "VOICELINK_CONFIG_PATH";
const ENV_OVERRIDE_PREFIX: &str = "VOICELINK__";

/// Load configuration with the following precedence (highest first):
/// 1) `VOICELINK_CONFIG_JSON` env var containing raw JSON
/// 2) If `VOICELINK_CONFIG_STDIN=true/1/yes`, JSON read from stdin
/// 3) File pointed to by `VOICELINK_CONFIG_PATH`
/// 4) config.json in the current working directory
/// 5) config.json next to the executable
/// 6) Defaults compiled into the binary
///
/// Individual fields can then be overridden with `VOICELINK__` variables using
/// `__` as the nesting separator, e.g. `VOICELINK__PORT=8080` or
/// `VOICELINK__SERVER__SESSION_DURATION_SECS=600`.
///
/// Read and parse errors are printed to stderr and the source is skipped.
/// Validation problems are reported but not propagated; callers that need a
/// hard failure run [`validate_config`] on the result themselves.
#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    // Lowest precedence first so later sources win.
    if let Ok(exe_path) = env::current_exe() {
        if let Some(mut exe_dir) = exe_path.parent().map(Path::to_path_buf) {
            exe_dir.push("config.json");
            merge_file_source(&mut merged, &exe_dir);
        }
    }

    merge_file_source(&mut merged, &PathBuf::from("config.json"));

    if let Ok(path) = env::var(ENV_PATH) {
        merge_file_source(&mut merged, &PathBuf::from(path));
    }

    if env::var(ENV_STDIN).is_ok_and(|val| env_var_truthy(&val)) {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("Failed to read config from stdin: {e}");
        } else if let Some(value) = parse_json_document(&buf, "stdin") {
            merge_values(&mut merged, value);
        }
    }

    if let Ok(json) = env::var(ENV_JSON) {
        if let Some(value) = parse_json_document(&json, ENV_JSON) {
            merge_values(&mut merged, value);
        }
    }

    apply_env_overrides(&mut merged);

    let config = match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    };

    if let Err(e) = validate_config(&config) {
        eprintln!("Configuration validation error: {e}");
    }

    config
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Failed to parse config from {label}: {err}");
            None
        }
    }
}

fn merge_file_source(target: &mut Value, path: &Path) {
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(contents) => {
            if let Some(value) = parse_json_document(&contents, &format!("file {}", path.display()))
            {
                merge_values(target, value);
            }
        }
        Err(err) => {
            eprintln!("Failed to read config from {}: {}", path.display(), err);
        }
    }
}

fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => {
            *target_slot = source_value;
        }
    }
}

fn apply_env_overrides(root: &mut Value) {
    for (key, raw_value) in env::vars() {
        let Some(stripped) = key.strip_prefix(ENV_OVERRIDE_PREFIX) else {
            continue;
        };

        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if segments.is_empty() {
            continue;
        }

        set_nested_value(root, &segments, parse_env_value(&raw_value));
    }
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    // Comma lists stay strings here: cors_origins is the only list-like field
    // and it is itself a comma-separated string.
    if trimmed.is_empty() {
        return Value::String(String::new());
    }

    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };

    if rest.is_empty() {
        map.insert(head.clone(), value);
        return;
    }

    let entry = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    set_nested_value(entry, rest, value);
}
