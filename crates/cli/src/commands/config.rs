use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use budgetbook_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key: &'static str,
    value: String,
    env_keys: &'a [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        Field {
            key: "storage.data_dir",
            value: config.storage.data_dir.display().to_string(),
            env_keys: &["BUDGETBOOK_STORAGE_DATA_DIR"],
        },
        Field {
            key: "storage.registry_path",
            value: config.storage.registry_path.clone(),
            env_keys: &["BUDGETBOOK_STORAGE_REGISTRY_PATH"],
        },
        Field {
            key: "storage.documents_dir",
            value: config.storage.documents_dir.clone(),
            env_keys: &["BUDGETBOOK_STORAGE_DOCUMENTS_DIR"],
        },
        Field {
            key: "storage.sequence_path",
            value: config.storage.sequence_path.clone(),
            env_keys: &["BUDGETBOOK_STORAGE_SEQUENCE_PATH"],
        },
        Field {
            key: "company.name",
            value: config.company.name.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["BUDGETBOOK_COMPANY_NAME"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["BUDGETBOOK_LOGGING_LEVEL", "BUDGETBOOK_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["BUDGETBOOK_LOGGING_FORMAT", "BUDGETBOOK_LOG_FORMAT"],
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("budgetbook.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/budgetbook.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::contains_path;

    #[test]
    fn dotted_paths_resolve_through_tables() {
        let doc: Value = "[storage]\ndata_dir = \"/srv/budgetbook\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "storage.data_dir"));
        assert!(!contains_path(&doc, "storage.registry_path"));
        assert!(!contains_path(&doc, "logging.level"));
    }
}
