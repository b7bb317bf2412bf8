//! Configuration management for askdb.
//!
//! Configuration is assembled from several layers, later layers winning:
//! - Built-in defaults
//! - The workspace config file (`.askdb/config.yaml`, or `ASKDB_CONFIG`)
//! - Environment variables (`OPENAI_*`, `POSTGRES_*`, `TELEGRAM_BOT_TOKEN`, ...)
//! - Command-line flags
//!
//! Credentials are optional at load time. Each component asks for what it
//! needs (`require_api_key`, `DatabaseConfig::target`,
//! `TelegramConfig::require_token`) and fails with a configuration error
//! naming the missing variable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Directory under the workspace that holds askdb state.
pub const STATE_DIR: &str = ".askdb";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .askdb/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat-completion provider ("openai" or "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// API key for the chat provider
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Custom provider endpoint
    pub endpoint: Option<String>,

    /// Embedding settings for the training store
    pub embedding: EmbeddingSettings,

    /// Target database
    pub database: DatabaseConfig,

    /// Telegram front-end settings
    pub telegram: TelegramConfig,

    /// SQL generator tuning
    pub generator: GeneratorSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// "trigram" (offline) or "openai"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
        }
    }
}

/// PostgreSQL connection settings, mostly from `POSTGRES_*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub port: u16,
    pub name: Option<String>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 5432,
            name: None,
            user: None,
            password: None,
            max_connections: 5,
        }
    }
}

/// Fully specified connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DatabaseConfig {
    /// Resolve a complete connection target, or report every missing variable.
    pub fn target(&self) -> AppResult<DatabaseTarget> {
        let mut missing = Vec::new();
        if self.host.is_none() {
            missing.push("POSTGRES_HOST");
        }
        if self.name.is_none() {
            missing.push("POSTGRES_DB_NAME");
        }
        if self.user.is_none() {
            missing.push("POSTGRES_USER");
        }
        if self.password.is_none() {
            missing.push("POSTGRES_PASSWORD");
        }

        match (&self.host, &self.name, &self.user, &self.password) {
            (Some(host), Some(name), Some(user), Some(password)) => Ok(DatabaseTarget {
                host: host.clone(),
                port: self.port,
                name: name.clone(),
                user: user.clone(),
                password: password.clone(),
            }),
            _ => Err(AppError::Config(format!(
                "Database is not configured; missing {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Long-polling timeout passed to getUpdates
    pub poll_timeout_secs: u64,

    /// Custom Bot API base URL
    pub api_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            poll_timeout_secs: 30,
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl TelegramConfig {
    pub fn require_token(&self) -> AppResult<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("Bot token not found in TELEGRAM_BOT_TOKEN".to_string())
            })
    }
}

/// SQL generator tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Training items retrieved per kind for each question
    pub n_results: usize,

    /// Store (question, sql) pairs that produced rows
    pub auto_train: bool,

    /// Character budget for the schema and documentation context
    pub max_context_chars: usize,

    /// Dialect named in the generation prompt
    pub dialect: String,

    /// Sampling temperature for SQL and question generation
    pub temperature: f32,

    /// Completion length cap for SQL and question generation
    pub max_tokens: Option<u32>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            n_results: 10,
            auto_train: true,
            max_context_chars: 56_000,
            dialect: "PostgreSQL".to_string(),
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingSection>,
    database: Option<DatabaseSection>,
    telegram: Option<TelegramSection>,
    generator: Option<GeneratorSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSection {
    host: Option<String>,
    port: Option<u16>,
    name: Option<String>,
    user: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TelegramSection {
    poll_timeout_secs: Option<u64>,
    api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratorSection {
    n_results: Option<usize>,
    auto_train: Option<bool>,
    max_context_chars: Option<usize>,
    dialect: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            endpoint: None,
            embedding: EmbeddingSettings::default(),
            database: DatabaseConfig::default(),
            telegram: TelegramConfig::default(),
            generator: GeneratorSettings::default(),
            log_level: None,
            log_format: LogFormat::Text,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and the process environment.
    ///
    /// Environment variables:
    /// - `ASKDB_WORKSPACE`, `ASKDB_CONFIG`, `ASKDB_PROVIDER`
    /// - `OPENAI_API_KEY`, `OPENAI_MODEL_NAME`
    /// - `POSTGRES_HOST`, `POSTGRES_PORT`, `POSTGRES_DB_NAME`, `POSTGRES_USER`,
    ///   `POSTGRES_PASSWORD`
    /// - `TELEGRAM_BOT_TOKEN`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use askdb_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using `env` to look up variables.
    pub fn load_with<F>(env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = env("ASKDB_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = env("ASKDB_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        let mut api_key_env = "OPENAI_API_KEY".to_string();
        if config_path.exists() {
            let file = read_config_file(&config_path)?;
            if let Some(var) = file.llm.as_ref().and_then(|l| l.api_key_env.clone()) {
                api_key_env = var;
            }
            config.merge_file(file);
        }

        if let Some(provider) = env("ASKDB_PROVIDER") {
            config.provider = provider;
        }
        if let Some(model) = env("OPENAI_MODEL_NAME") {
            config.model = model;
        }
        config.api_key = env(&api_key_env);

        if let Some(host) = env("POSTGRES_HOST") {
            config.database.host = Some(host);
        }
        if let Some(port) = env("POSTGRES_PORT") {
            config.database.port = port.trim().parse().map_err(|_| {
                AppError::Config(format!("POSTGRES_PORT is not a valid port: {}", port))
            })?;
        }
        if let Some(name) = env("POSTGRES_DB_NAME") {
            config.database.name = Some(name);
        }
        if let Some(user) = env("POSTGRES_USER") {
            config.database.user = Some(user);
        }
        config.database.password = env("POSTGRES_PASSWORD");

        config.telegram.token = env("TELEGRAM_BOT_TOKEN");

        if let Some(level) = env("RUST_LOG") {
            config.log_level = Some(level);
        }
        if env("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    fn merge_file(&mut self, file: ConfigFile) {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.provider = provider;
            }
            if let Some(model) = llm.model {
                self.model = model;
            }
            if llm.endpoint.is_some() {
                self.endpoint = llm.endpoint;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding.dimensions = dimensions;
            }
        }

        if let Some(db) = file.database {
            if db.host.is_some() {
                self.database.host = db.host;
            }
            if let Some(port) = db.port {
                self.database.port = port;
            }
            if db.name.is_some() {
                self.database.name = db.name;
            }
            if db.user.is_some() {
                self.database.user = db.user;
            }
            if let Some(max) = db.max_connections {
                self.database.max_connections = max;
            }
        }

        if let Some(telegram) = file.telegram {
            if let Some(timeout) = telegram.poll_timeout_secs {
                self.telegram.poll_timeout_secs = timeout;
            }
            if let Some(url) = telegram.api_url {
                self.telegram.api_url = url;
            }
        }

        if let Some(generator) = file.generator {
            if let Some(n) = generator.n_results {
                self.generator.n_results = n;
            }
            if let Some(auto_train) = generator.auto_train {
                self.generator.auto_train = auto_train;
            }
            if let Some(max) = generator.max_context_chars {
                self.generator.max_context_chars = max;
            }
            if let Some(dialect) = generator.dialect {
                self.generator.dialect = dialect;
            }
            if let Some(temperature) = generator.temperature {
                self.generator.temperature = temperature;
            }
            if generator.max_tokens.is_some() {
                self.generator.max_tokens = generator.max_tokens;
            }
        }

        if let Some(logging) = file.logging {
            if logging.level.is_some() {
                self.log_level = logging.level;
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = format;
            }
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over the environment and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        log_format: Option<LogFormat>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = log_format;
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .askdb directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .askdb directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// SQLite file backing the training store.
    pub fn store_path(&self) -> PathBuf {
        self.state_dir().join("training.sqlite")
    }

    /// The chat provider's API key, required for hosted providers.
    pub fn require_api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "API key for provider '{}' not found in OPENAI_API_KEY",
                    self.provider
                ))
            })
    }

    /// Validate provider names before any client is built.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama"];
        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        let known_embedders = ["trigram", "openai"];
        if !known_embedders.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedders.join(", ")
            )));
        }

        if self.provider == "openai" {
            self.require_api_key()?;
        }

        Ok(())
    }
}

/// Export the variables in a `.env` file into the process environment.
///
/// Variables already set in the environment win. Returns `false` when the
/// file does not exist.
pub fn load_dotenv(path: &Path) -> AppResult<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Loaded environment file");
            Ok(true)
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::Config(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn read_config_file(path: &Path) -> AppResult<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

    serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
}
