use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};
use tinytemplate::TinyTemplate;

use crate::storage::models::MetaItem;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
    #[serde(default)]
    pub listen_port: Option<u16>,
    #[serde(default)]
    pub dev_cors_origin: Option<String>,
    #[serde(default)]
    pub push: Option<PushConfig>,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default = "default_statuses")]
    pub statuses: Vec<MetaEntry>,
    #[serde(default = "default_priorities")]
    pub priorities: Vec<MetaEntry>,
    #[serde(default = "default_connection_types")]
    pub connection_types: Vec<MetaEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub enabled: bool,
    pub vapid_public: Option<String>,
    pub vapid_private: Option<String>,
    /// VAPID `sub` claim, e.g. `mailto:ops@example.com`.
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_reminder_title")]
    pub title: String,
    /// TinyTemplate source; `{task_name}` and `{task_id}` are available.
    #[serde(default = "default_reminder_body")]
    pub body_template: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            title: default_reminder_title(),
            body_template: default_reminder_body(),
        }
    }
}

#[derive(Serialize)]
struct ReminderCtx<'a> {
    task_id: i32,
    task_name: &'a str,
}

impl ReminderConfig {
    pub fn render_body(&self, task_id: i32, task_name: &str) -> Result<String, String> {
        let mut tt = TinyTemplate::new();
        // Push bodies are plain text
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        tt.add_template("body", &self.body_template)
            .map_err(|e| format!("template: {e}"))?;
        tt.render("body", &ReminderCtx { task_id, task_name })
            .map_err(|e| format!("render: {e}"))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MetaEntry {
    pub id: i32,
    pub name: String,
}

pub fn meta_items(entries: &[MetaEntry]) -> Vec<MetaItem> {
    entries
        .iter()
        .map(|e| MetaItem {
            id: e.id,
            name: e.name.clone(),
        })
        .collect()
}

fn default_token_ttl_days() -> i64 {
    30
}

fn default_reminder_title() -> String {
    "Reminder".to_string()
}

fn default_reminder_body() -> String {
    "Deadline approaching for task {task_name}".to_string()
}

fn entries(items: &[(i32, &str)]) -> Vec<MetaEntry> {
    items
        .iter()
        .map(|(id, name)| MetaEntry {
            id: *id,
            name: name.to_string(),
        })
        .collect()
}

fn default_statuses() -> Vec<MetaEntry> {
    entries(&[(1, "To Do"), (2, "In Progress"), (3, "Done")])
}

fn default_priorities() -> Vec<MetaEntry> {
    entries(&[(1, "Low"), (2, "Medium"), (3, "High")])
}

fn default_connection_types() -> Vec<MetaEntry> {
    entries(&[(1, "blocks"), (2, "depends on")])
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }
        if self.token_ttl_days <= 0 {
            return Err(ConfigError::Invalid("token_ttl_days must be positive".into()));
        }
        // The default status and priority of new tasks is id 1
        if !self.statuses.iter().any(|s| s.id == 1) {
            return Err(ConfigError::Invalid("statuses must contain id 1".into()));
        }
        if !self.priorities.iter().any(|p| p.id == 1) {
            return Err(ConfigError::Invalid("priorities must contain id 1".into()));
        }
        self.reminders
            .render_body(0, "")
            .map_err(|e| ConfigError::Invalid(format!("reminders.body_template: {e}")))?;
        Ok(())
    }

    pub fn vapid_public_key(&self) -> Option<&str> {
        self.push
            .as_ref()
            .filter(|p| p.enabled)
            .and_then(|p| p.vapid_public.as_deref())
            .filter(|k| !k.trim().is_empty())
    }
}
