use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Backend API root, e.g. http://localhost:8080/api
    #[arg(long, env = "CHAT_API_URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// File holding the persisted token, identity and theme
    #[arg(long, env = "CHAT_STATE_FILE")]
    pub state_file: Option<String>,

    /// Keep client state in memory only
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub ephemeral: bool,
}

impl ClientConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("api.base_url", "http://localhost:8080/api")?
            .set_default("api.timeout_secs", 30)?
            .set_default("storage.path", ".chat-client/state.json")?
            .set_default("storage.ephemeral", false)?;

        // Explicit file must exist; the cwd fallback is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("chat-client").required(false)),
        };

        // CHAT_API__BASE_URL=... etc.
        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Priority: CLI flag > CLI env var > environment > config file > defaults.
        if let Some(url) = cli.base_url {
            builder = builder.set_override("api.base_url", url)?;
        }
        if let Some(secs) = cli.timeout_secs {
            builder = builder.set_override("api.timeout_secs", secs)?;
        }
        if let Some(path) = cli.state_file {
            builder = builder.set_override("storage.path", path)?;
        }
        if cli.ephemeral {
            builder = builder.set_override("storage.ephemeral", true)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
