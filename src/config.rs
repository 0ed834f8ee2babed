use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bokmerke")]
#[command(about = "Runs the bokmerke bookmark-sync service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bokmerke")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct App {
    database: String,
    port: u16,
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let yaml_str = fs::read_to_string(path)?;
        let expanded = expand_env_vars(&yaml_str);
        let config: Config = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }
}

/// Replaces `${VAR}` and `${VAR:-default}` occurrences with values from the
/// process environment. Unset variables without a default expand to the
/// empty string.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let expr = &after[..end];
                let value = match expr.split_once(":-") {
                    Some((name, default)) => {
                        env::var(name).unwrap_or_else(|_| default.to_string())
                    }
                    None => env::var(expr).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not set", expr);
                        String::new()
                    }),
                };
                out.push_str(&value);
                rest = &after[end + 1..];
            }
            None => {
                // unterminated ${, keep it literally
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
