use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use perch_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |field: &str, env_vars: &[&str]| {
        field_source(field, env_vars, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "datastore.project_id",
        &display_or_unset(&config.datastore.project_id),
        source("datastore.project_id", &["DATASTORE_PROJECT_ID", "GOOGLE_CLOUD_PROJECT"]),
    ));
    lines.push(render_line(
        "datastore.location",
        &config.datastore.location,
        source("datastore.location", &["DATASTORE_LOCATION", "GOOGLE_CLOUD_LOCATION"]),
    ));
    lines.push(render_line(
        "datastore.engine_id",
        &display_or_unset(&config.datastore.engine_id),
        source("datastore.engine_id", &["DATASTORE_ENGINE_ID"]),
    ));

    lines.push(render_line(
        "web_search.model",
        &config.web_search.model,
        source("web_search.model", &["PERCH_WEB_SEARCH_MODEL"]),
    ));
    lines.push(render_line(
        "web_search.instruction_path",
        &config.web_search.instruction_path.display().to_string(),
        source("web_search.instruction_path", &[]),
    ));

    lines.push(render_line(
        "toolbox.base_url",
        &config.toolbox.base_url,
        source("toolbox.base_url", &["TOOLBOX_URL"]),
    ));
    lines.push(render_line(
        "toolbox.tool_name",
        &config.toolbox.tool_name,
        source("toolbox.tool_name", &[]),
    ));

    lines.push(render_line(
        "database.host",
        &display_or_unset(&config.database.host),
        source("database.host", &["MYSQL_HOST"]),
    ));
    lines.push(render_line(
        "database.port",
        &config.database.port.to_string(),
        source("database.port", &["MYSQL_PORT"]),
    ));
    lines.push(render_line(
        "database.user",
        &display_or_unset(&config.database.user),
        source("database.user", &["MYSQL_USER"]),
    ));
    lines.push(render_line(
        "database.password",
        &redact_secret(config.database.password.expose_secret()),
        source("database.password", &["MYSQL_PASSWORD"]),
    ));
    lines.push(render_line(
        "database.database",
        &config.database.database,
        source("database.database", &["MYSQL_DATABASE"]),
    ));

    lines.push(render_line("agent.name", &config.agent.name, source("agent.name", &[])));
    lines.push(render_line(
        "agent.model",
        &config.agent.model,
        source("agent.model", &["PERCH_AGENT_MODEL"]),
    ));
    lines.push(render_line(
        "agent.instruction_path",
        &config.agent.instruction_path.display().to_string(),
        source("agent.instruction_path", &[]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["PERCH_LOGGING_LEVEL", "PERCH_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_lowercase(),
        source("logging.format", &["PERCH_LOGGING_FORMAT", "PERCH_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn render_line(field: &str, value: &str, source: String) -> String {
    format!("- {field} = {value} ({source})")
}

fn display_or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

fn redact_secret(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        "<redacted>".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("perch.toml"), PathBuf::from("config/perch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &str,
    env_vars: &[&str],
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    for var in env_vars {
        if env::var(var).map(|value| !value.trim().is_empty()).unwrap_or(false) {
            return format!("env:{var}");
        }
    }

    if let (Some(doc), Some(path)) = (file_doc, file_path) {
        if file_has_field(doc, field) {
            return format!("file:{}", path.display());
        }
    }

    "default".to_string()
}

fn file_has_field(doc: &Value, field: &str) -> bool {
    let mut current = doc;
    for part in field.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{display_or_unset, field_source, file_has_field, redact_secret, render_line};

    fn doc() -> Value {
        "[datastore]\nproject_id = \"boutique-prod\"\n[logging]\nlevel = \"debug\"\n"
            .parse::<Value>()
            .expect("valid toml")
    }

    #[test]
    fn dotted_field_lookup_walks_tables() {
        let doc = doc();
        assert!(file_has_field(&doc, "datastore.project_id"));
        assert!(file_has_field(&doc, "logging.level"));
        assert!(!file_has_field(&doc, "datastore.engine_id"));
        assert!(!file_has_field(&doc, "toolbox.base_url"));
    }

    #[test]
    fn file_source_is_reported_when_env_is_absent() {
        let doc = doc();
        let source = field_source(
            "datastore.project_id",
            &["PERCH_TEST_CONFIG_UNSET_VAR"],
            Some(&doc),
            Some(std::path::Path::new("perch.toml")),
        );
        assert_eq!(source, "file:perch.toml");
    }

    #[test]
    fn default_source_is_reported_when_nothing_sets_the_field() {
        let doc = doc();
        let source = field_source(
            "toolbox.base_url",
            &["PERCH_TEST_CONFIG_UNSET_VAR"],
            Some(&doc),
            Some(std::path::Path::new("perch.toml")),
        );
        assert_eq!(source, "default");
    }

    #[test]
    fn env_source_wins_over_file() {
        std::env::set_var("PERCH_TEST_CONFIG_SET_VAR", "value");
        let doc = doc();
        let source = field_source(
            "datastore.project_id",
            &["PERCH_TEST_CONFIG_SET_VAR"],
            Some(&doc),
            Some(std::path::Path::new("perch.toml")),
        );
        assert_eq!(source, "env:PERCH_TEST_CONFIG_SET_VAR");
        std::env::remove_var("PERCH_TEST_CONFIG_SET_VAR");
    }

    #[test]
    fn secrets_are_redacted_and_blanks_marked_unset() {
        assert_eq!(redact_secret("hunter2"), "<redacted>");
        assert_eq!(redact_secret("  "), "<unset>");
        assert_eq!(display_or_unset(""), "<unset>");
        assert_eq!(display_or_unset("boutique-prod"), "boutique-prod");
    }

    #[test]
    fn rendered_line_carries_field_value_and_source() {
        assert_eq!(
            render_line("toolbox.base_url", "http://127.0.0.1:5000", "default".to_string()),
            "- toolbox.base_url = http://127.0.0.1:5000 (default)"
        );
    }
}
