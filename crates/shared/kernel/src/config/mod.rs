use config::{Config, Environment, File, FileFormat, Map};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of the environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "NEXO";

/// Custom error type for config loading.
#[nexo_derive::nexo_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Layered configuration source: serde defaults, an optional TOML file, then environment.
///
/// Environment variables use the `NEXO` prefix and `__` as the nesting separator, so
/// `NEXO__DATABASE__URL` maps to `database.url`.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<Map<String, String>>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required TOML file layer.
    #[must_use]
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replaces the process environment with `vars` (full variable names, prefix included).
    #[must_use]
    pub fn env_source(mut self, vars: Map<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Builds the layers and deserializes them into `T`.
    ///
    /// Fields absent from every layer fall back to `T`'s serde defaults.
    ///
    /// # Errors
    /// * A file layer was given but cannot be read or parsed.
    /// * An environment value does not fit the target field.
    /// * The merged document does not deserialize into `T`.
    pub fn load<T>(self) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        let mut builder = Config::builder();

        if let Some(path) = &self.file {
            info!("Loading config from {}", path.display());
            let file = File::from(path.as_path()).format(FileFormat::Toml).required(true);
            builder = builder.add_source(file);
        } else {
            debug!("No config file given, using defaults and environment");
        }

        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(self.env);

        builder
            .add_source(env)
            .build()
            .context("Failed to build config")?
            .try_deserialize::<T>()
            .context("Failed to deserialize config")
    }
}

/// Loads `T` from the optional TOML file at `path` overlaid with `NEXO__*` variables.
///
/// # Errors
/// See [`ConfigLoader::load`].
///
/// # Example
/// ```rust
/// use nexo_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AdminConfig {
///     #[serde(default)]
///     port: u16,
/// }
///
/// let cfg: AdminConfig = load_config(Some("config/local.toml")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let loader = match path {
        Some(path) => ConfigLoader::new().file(path),
        None => ConfigLoader::new(),
    };
    loader.load()
}
