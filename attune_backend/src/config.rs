use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "attune_config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing language model API key (set llm_api_key, LLM_API_KEY or GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("Invalid {field} = {value}: {expected}")]
    InvalidSetting {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    // LLM configuration (OpenAI-compatible endpoint)
    #[serde(default = "default_llm_url")]
    pub llm_api_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,

    /// When set, emotion is classified by asking this model instead of the keyword lexicon.
    #[serde(default)]
    pub emotion_model: Option<String>,

    // Embeddings. Without an API URL the local hashing embedder is used.
    #[serde(default)]
    pub embedding_api_url: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub embedding_api_key: Option<String>,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    // Storage
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_personality_database_path")]
    pub personality_database_path: String,
    #[serde(default = "default_memory_database_path")]
    pub memory_database_path: String,

    // Retrieval
    #[serde(default = "default_memory_top_k")]
    pub memory_top_k: usize,
    #[serde(default = "default_true")]
    pub include_long_term: bool,

    // Personality dynamics
    #[serde(default = "default_drift_magnitude")]
    pub drift_magnitude: f64,
    #[serde(default = "default_topic_decay_probability")]
    pub topic_decay_probability: f64,

    /// Free-text context stored on every new conversation.
    #[serde(default)]
    pub conversation_context: Option<String>,
}

fn default_llm_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_llm_model() -> String {
    "gemini-1.5-pro-latest".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_database_path() -> String {
    "emotion_chat_memory.db".to_string()
}

fn default_personality_database_path() -> String {
    "personality_profile.db".to_string()
}

fn default_memory_database_path() -> String {
    "chatbot_memory.db".to_string()
}

fn default_memory_top_k() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_drift_magnitude() -> f64 {
    0.05
}

fn default_topic_decay_probability() -> f64 {
    0.2
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            llm_api_url: default_llm_url(),
            llm_model: default_llm_model(),
            llm_api_key: None,
            emotion_model: None,
            embedding_api_url: None,
            embedding_model: default_embedding_model(),
            embedding_api_key: None,
            embedding_dimensions: default_embedding_dimensions(),
            database_path: default_database_path(),
            personality_database_path: default_personality_database_path(),
            memory_database_path: default_memory_database_path(),
            memory_top_k: default_memory_top_k(),
            include_long_term: true,
            drift_magnitude: default_drift_magnitude(),
            topic_decay_probability: default_topic_decay_probability(),
            conversation_context: None,
        }
    }
}

impl AgentConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Path of the config file next to the executable
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join(CONFIG_FILE_NAME)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("attune").join(CONFIG_FILE_NAME))
    }

    /// Load config from an explicit file. Env vars are applied on top.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config = toml::from_str::<AgentConfig>(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {:?}", path))?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config.with_env_overrides())
    }

    /// Load config from attune_config.toml next to the executable, then the user
    /// config directory, falling back to defaults + env vars.
    pub fn load() -> Self {
        let candidates = std::iter::once(Self::config_path()).chain(Self::user_config_path());

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from(&path) {
                Ok(config) => return config,
                Err(e) => tracing::error!("{:#}", e),
            }
        }

        tracing::debug!("No config file found, using defaults + env vars");
        Self::from_env()
    }

    /// Save config to file (next to executable)
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("LLM_API_URL") {
            self.llm_api_url = url;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm_model = model;
        }

        if self.llm_api_key.is_none() {
            self.llm_api_key = env::var("LLM_API_KEY")
                .or_else(|_| env::var("GEMINI_API_KEY"))
                .ok();
        }

        if let Ok(model) = env::var("EMOTION_MODEL") {
            if !model.trim().is_empty() {
                self.emotion_model = Some(model);
            }
        }

        if let Ok(url) = env::var("EMBEDDING_API_URL") {
            if !url.trim().is_empty() {
                self.embedding_api_url = Some(url);
            }
        }

        if let Ok(model) = env::var("EMBEDDING_MODEL") {
            self.embedding_model = model;
        }

        if let Ok(key) = env::var("EMBEDDING_API_KEY") {
            self.embedding_api_key = Some(key);
        }

        if let Ok(dir) = env::var("ATTUNE_DATABASE_DIR") {
            if !dir.trim().is_empty() {
                self.relocate_databases(Path::new(&dir));
            }
        }

        self
    }

    /// Move the three database files into `dir`, keeping their file names.
    pub fn relocate_databases(&mut self, dir: &Path) {
        for path in [
            &mut self.database_path,
            &mut self.personality_database_path,
            &mut self.memory_database_path,
        ] {
            let file_name = Path::new(path.as_str())
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_default();
            *path = dir.join(file_name).to_string_lossy().into_owned();
        }
    }

    /// Reject settings that would break the random trait drift or topic decay.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.drift_magnitude.is_finite() || self.drift_magnitude < 0.0 {
            return Err(ConfigError::InvalidSetting {
                field: "drift_magnitude",
                value: self.drift_magnitude,
                expected: "a finite number >= 0",
            });
        }
        if !(0.0..=1.0).contains(&self.topic_decay_probability) {
            return Err(ConfigError::InvalidSetting {
                field: "topic_decay_probability",
                value: self.topic_decay_probability,
                expected: "a probability between 0 and 1",
            });
        }
        Ok(())
    }

    /// The language model credential; its absence is fatal at startup.
    pub fn require_api_key(&self) -> std::result::Result<&str, ConfigError> {
        self.llm_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}
