use anyhow::{Context, bail};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::scheduler::DebounceConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub debounce: Debounce,
    pub art: Option<ArtConfig>,
    #[serde(default)]
    pub notifier: NotifierConfig,
    pub http: Option<HttpConfig>,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config {path}"))?;
        let config: Config =
            toml::from_str(&contents).with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let d = &self.debounce;
        for (name, secs) in [
            ("poll_interval_secs", d.poll_interval_secs),
            ("complete_after_secs", d.complete_after_secs),
            ("partial_after_secs", d.partial_after_secs),
            ("cooldown_secs", d.cooldown_secs),
        ] {
            if secs == 0 {
                bail!("debounce.{name} must be positive");
            }
        }
        if !(d.poll_interval_secs < d.complete_after_secs
            && d.complete_after_secs < d.partial_after_secs)
        {
            bail!(
                "debounce intervals must satisfy poll_interval ({}) < complete_after ({}) < partial_after ({})",
                d.poll_interval_secs,
                d.complete_after_secs,
                d.partial_after_secs
            );
        }
        Ok(())
    }
}

/// Debounce thresholds, in seconds
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Debounce {
    pub poll_interval_secs: u64,
    pub complete_after_secs: u64,
    pub partial_after_secs: u64,
    pub cooldown_secs: u64,
}

impl Default for Debounce {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            complete_after_secs: 5,
            partial_after_secs: 10,
            cooldown_secs: 5,
        }
    }
}

impl From<&Debounce> for DebounceConfig {
    fn from(d: &Debounce) -> Self {
        DebounceConfig {
            poll_interval: Duration::from_secs(d.poll_interval_secs),
            complete_after: Duration::from_secs(d.complete_after_secs),
            partial_after: Duration::from_secs(d.partial_after_secs),
            cooldown: Duration::from_secs(d.cooldown_secs),
        }
    }
}

/// Where cover art goes
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArtConfig {
    /// Local directory, exposed by the built-in http server under `base_url`
    Local { dir: PathBuf, base_url: String },
    /// Remote web root reached with rsync
    Rsync {
        host: String,
        user: String,
        upload_path: String,
        download_path: String,
    },
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifierConfig {
    #[default]
    Log,
    /// JSON lines appended to `path`, or stdout
    Jsonl { path: Option<PathBuf> },
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        /// The command is killed when it runs longer than this
        #[serde(default = "default_command_timeout_secs")]
        timeout_secs: u64,
    },
    /// HipChat room notification, posted with a room token
    Hipchat {
        #[serde(default = "default_hipchat_host")]
        host: String,
        room: String,
        api_token: String,
        #[serde(default = "default_img_width")]
        img_width: String,
    },
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_hipchat_host() -> String {
    "api.hipchat.com".to_string()
}

fn default_img_width() -> String {
    "128px".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}
