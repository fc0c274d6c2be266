use serde::Deserialize;
use simply_core::RunOptions;
use std::fs;

fn default_console_level() -> String {
    String::from("warn")
}

fn default_file_level() -> String {
    String::from("trace")
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Logger {
    pub console_level: String,
    pub file_level: String,
    pub dir: Option<String>,
}

impl Default for Logger {
    fn default() -> Self {
        Logger {
            console_level: default_console_level(),
            file_level: default_file_level(),
            dir: None,
        }
    }
}

/// Contents of the optional TOML configuration file. Every field has a default,
/// so an empty file is a valid configuration.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub run: RunOptions,
    pub logging: Logger,
}

pub fn parse_config(content: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config: Config = toml::de::from_str(content)?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
