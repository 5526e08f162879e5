use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::try_exists;

use crate::editor::DEFAULT_HISTORY_LIMIT;
use crate::keymap::KeySpec;

const MAX_HISTORY_LIMIT: usize = 10_000;
const DEFAULT_MAX_LIST_DEPTH: usize = 4;
const MAX_LIST_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub keybindings: KeybindingsConfig,
    #[serde(default)]
    pub codec: CodecConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub max_list_depth: usize,
    /// Typing a bare URL inserts it as a link.
    pub auto_link: bool,
    /// Shift+Enter inserts a line break inside the current block.
    pub soft_break: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_list_depth: DEFAULT_MAX_LIST_DEPTH,
            auto_link: true,
            soft_break: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeybindingsConfig {
    pub bold: String,
    pub italic: String,
    pub underline: String,
    pub strikethrough: String,
    pub code: String,
    pub link: String,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            bold: String::from("mod+b"),
            italic: String::from("mod+i"),
            underline: String::from("mod+u"),
            strikethrough: String::from("mod+shift+x"),
            code: String::from("mod+e"),
            link: String::from("mod+k"),
        }
    }
}

impl KeybindingsConfig {
    fn entries_mut(&mut self) -> [(&'static str, &mut String); 6] {
        [
            ("bold", &mut self.bold),
            ("italic", &mut self.italic),
            ("underline", &mut self.underline),
            ("strikethrough", &mut self.strikethrough),
            ("code", &mut self.code),
            ("link", &mut self.link),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Run incoming markup through the sanitizer before decoding.
    pub sanitize_input: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            sanitize_input: true,
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        match Self::config_path() {
            Some(config_path) => Self::load_from(&config_path).await,
            None => Ok(Self::default()),
        }
    }

    pub async fn load_from(config_path: &Path) -> Result<Self> {
        if try_exists(config_path).await? {
            // Try to read existing config
            match tokio::fs::read_to_string(config_path).await {
                Ok(content) => {
                    if content.trim().is_empty() {
                        log::warn!("Config file is empty, creating new one");
                        let default_config = Self::default();
                        let _ = default_config.save_to(config_path).await;
                        return Ok(default_config);
                    }

                    match serde_json::from_str::<Self>(&content) {
                        Ok(mut config) => {
                            config.validate()?;
                            log::info!(
                                "Successfully loaded config from: {}",
                                config_path.display()
                            );
                            return Ok(config);
                        }
                        Err(json_err) => {
                            log::error!("Failed to parse config file: {}", json_err);

                            // Backup broken config
                            let backup_path = config_path.with_extension("bak");
                            if let Err(e) = tokio::fs::copy(config_path, &backup_path).await {
                                log::warn!("Failed to backup broken config: {}", e);
                            } else {
                                log::info!(
                                    "Backed up broken config to: {}",
                                    backup_path.display()
                                );
                            }

                            let default_config = Self::default();
                            let _ = default_config.save_to(config_path).await;
                            return Ok(default_config);
                        }
                    }
                }
                Err(io_err) => {
                    log::error!("Failed to read config file: {}", io_err);
                }
            }
        } else {
            log::info!("Config file does not exist, creating default");
        }

        let default_config = Self::default();
        let _ = default_config.save_to(config_path).await;
        Ok(default_config)
    }

    pub async fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(config_path) => self.save_to(&config_path).await,
            None => Ok(()),
        }
    }

    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        let mut config_to_save = self.clone();
        config_to_save.validate()?;

        if let Some(parent) = config_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Err(anyhow::anyhow!(
                    "failed to create config directory {}: {}",
                    parent.display(),
                    e
                ));
            }
            log::debug!("Config directory exists or was created: {}", parent.display());
        }

        let content = serde_json::to_string_pretty(&config_to_save)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {}", e))?;
        tokio::fs::write(config_path, content).await.map_err(|e| {
            anyhow::anyhow!("failed to write config {}: {}", config_path.display(), e)
        })?;
        log::info!("Successfully saved config to: {}", config_path.display());
        Ok(())
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;

        if self.editor.history_limit == 0 || self.editor.history_limit > MAX_HISTORY_LIMIT {
            log::warn!(
                "Invalid history limit: {}, using default",
                self.editor.history_limit
            );
            self.editor.history_limit = DEFAULT_HISTORY_LIMIT;
            has_issues = true;
        }

        if self.editor.max_list_depth == 0 || self.editor.max_list_depth > MAX_LIST_DEPTH {
            log::warn!(
                "Invalid list depth: {}, using default",
                self.editor.max_list_depth
            );
            self.editor.max_list_depth = DEFAULT_MAX_LIST_DEPTH;
            has_issues = true;
        }

        let mut fallback = KeybindingsConfig::default();
        for ((name, binding), (_, default)) in self
            .keybindings
            .entries_mut()
            .into_iter()
            .zip(fallback.entries_mut())
        {
            if let Err(e) = binding.parse::<KeySpec>() {
                log::warn!("Invalid {} binding {:?}: {}, using default", name, binding, e);
                *binding = default.clone();
                has_issues = true;
            }
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("BLOCKEDIT_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("BLOCKEDIT_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        ProjectDirs::from("com", "blockedit", "blockedit")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}
