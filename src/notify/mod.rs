//! Where settled track descriptions are announced

use std::time::Duration;

use thiserror::Error;

use crate::{config::NotifierConfig, domain::track::NotificationPayload};

pub mod command;
pub mod hipchat;
pub mod jsonl;

pub use command::CommandSink;
pub use hipchat::HipChatSink;
pub use jsonl::JsonLinesSink;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{program} exited with {status}")]
    Command { program: String, status: String },

    #[error("{program} still running after {timeout:?}, killed")]
    Timeout { program: String, timeout: Duration },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
}

/// Delivers one announcement. Called from the scheduler thread.
pub trait DispatchSink: Send + Sync {
    fn notify(&self, payload: &NotificationPayload) -> Result<(), DispatchError>;
}

/// Announces through the log only
#[derive(Debug, Default)]
pub struct LogSink;

impl DispatchSink for LogSink {
    fn notify(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        log::info!("now playing: {payload}");
        Ok(())
    }
}

pub fn from_config(config: &NotifierConfig) -> anyhow::Result<Box<dyn DispatchSink>> {
    Ok(match config {
        NotifierConfig::Log => Box::new(LogSink),
        NotifierConfig::Jsonl { path: Some(path) } => Box::new(JsonLinesSink::append_to(path)?),
        NotifierConfig::Jsonl { path: None } => Box::new(JsonLinesSink::stdout()),
        NotifierConfig::Command {
            program,
            args,
            timeout_secs,
        } => Box::new(CommandSink::new(
            program.clone(),
            args.clone(),
            Duration::from_secs(*timeout_secs),
        )),
        NotifierConfig::Hipchat {
            host,
            room,
            api_token,
            img_width,
        } => Box::new(HipChatSink::new(host, room, api_token.clone(), img_width.clone())?),
    })
}
