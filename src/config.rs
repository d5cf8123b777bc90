use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::internal::ui::app::Command;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Theme used when no preference has been stored yet: "light" or "dark".
    pub theme: String,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    /// Optional per-context key overrides, e.g. `list: { "J": NavigateDown }`.
    pub keybindings: Option<KeyBindingConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            keybindings: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jikan.moe/v4".to_string(),
            timeout_secs: 10,
            user_agent: format!("tui-anime-app/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Extra `target=level` directives appended to the filter.
    pub module_levels: HashMap<String, LogLevel>,
    /// Defaults to "logs" when unset.
    pub log_directory: Option<String>,
    pub enable_performance_metrics: bool,
}

impl LoggingConfig {
    /// Builds an `EnvFilter` directive string such as `info,tui_anime_app::api=debug`.
    pub fn filter_directives(&self) -> String {
        let mut filter = self.level.to_string();
        let mut modules: Vec<_> = self.module_levels.iter().collect();
        modules.sort_by(|a, b| a.0.cmp(b.0));
        for (module, level) in modules {
            filter.push_str(&format!(",{}={}", module, level));
        }
        filter
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub page_size: u32,
    pub load_more_cooldown_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            page_size: 10,
            load_more_cooldown_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory used for favorites and theme.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct KeyBindingConfig {
    pub global: HashMap<String, Command>,
    pub list: HashMap<String, Command>,
    pub categories: HashMap<String, Command>,
    pub detail: HashMap<String, Command>,
}

impl AppConfig {
    pub fn load() -> Self {
        // config.ron in the working directory wins over one next to the executable
        let mut candidates = vec![PathBuf::from("config.ron")];
        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join("config.ron"));
        }

        for path in candidates {
            if let Some(config) = Self::load_from(&path) {
                return config;
            }
        }

        tracing::info!("No config file found, using defaults");
        Self::default()
    }

    /// Parses one candidate file. Missing or invalid files yield `None`.
    pub fn load_from(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match ron::from_str::<AppConfig>(&content) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::error!("Failed to parse config at {}: {}", path.display(), e);
                None
            }
        }
    }
}
