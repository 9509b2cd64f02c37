use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::Parser;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DB_DIR: &str = "finance-assistant-db";

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub address: SocketAddr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LlmSettings {
    pub ollama_host: String,
    pub ollama_port: u16,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Longest chat message accepted, in characters.
    pub max_message_len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub web: Web,
    pub database: DatabaseSettings,
    pub llm: LlmSettings,
    pub chat: ChatSettings,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults. Without a
    /// file, the defaults alone are used.
    pub fn from_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("database.path", default_db_path())?
            .set_default("llm.ollama_host", "http://127.0.0.1")?
            .set_default("llm.ollama_port", 11434)?
            .set_default("llm.model", "llama3.2")?
            .set_default("chat.max_message_len", 1000)?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder,
        };

        builder.build()?.try_deserialize()
    }
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "finance-assistant").map_or_else(
        || DEFAULT_DB_DIR.to_string(),
        |dirs| dirs.data_dir().join("db").to_string_lossy().into_owned(),
    )
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}
