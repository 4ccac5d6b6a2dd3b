//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only fill fields that no
//! config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// Supported env vars. Earlier entries win when two map to the same field.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "BTL_LISTEN_ADDR",
        field_path: "server.listen_addr",
    },
    EnvMapping {
        var_name: "BTL_MODEL_PROVIDER",
        field_path: "model.provider",
    },
    EnvMapping {
        var_name: "BTL_MODEL",
        field_path: "model.model",
    },
    EnvMapping {
        var_name: "BTL_MODEL_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "BTL_MODEL_API_URL",
        field_path: "model.api_url",
    },
    // Standard provider SDK env vars.
    EnvMapping {
        var_name: "ANTHROPIC_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "OPENAI_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "BTL_LINK_SECRET",
        field_path: "links.secret",
    },
    EnvMapping {
        var_name: "BTL_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "BTL_STORE_PATH",
        field_path: "store.path",
    },
];

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        // Only apply if no file (or earlier env var) set this field.
        if matches!(
            sources.get(mapping.field_path),
            Some(ConfigLayer::File(_) | ConfigLayer::Environment)
        ) {
            continue;
        }

        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if val.is_empty() {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_string_field(merged, mapping.field_path, val);
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}

/// Set a dotted-path string field, creating intermediate tables.
fn set_string_field(root: &mut toml::Value, path: &str, val: &str) {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), toml::Value::String(val.to_owned()));
        }
        return;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml::Value::String(val.to_owned()));
    }
}
