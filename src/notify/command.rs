use std::{
    io::Write,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use crate::{
    domain::track::NotificationPayload,
    notify::{DispatchError, DispatchSink},
};

/// Runs a command per announcement with the payload as JSON on its stdin.
///
/// The payload fields are also exported as `NOW_PLAYING_*` environment
/// variables for scripts that do not want to parse JSON. A command running
/// longer than `timeout` is killed.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

const WAIT_POLL: Duration = Duration::from_millis(50);

impl CommandSink {
    pub fn new(program: String, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }

    fn wait_bounded(&self, child: &mut Child) -> Result<ExitStatus, DispatchError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            let now = Instant::now();
            if now >= deadline {
                if let Err(e) = child.kill() {
                    log::warn!("failed to kill {}: {e}", self.program);
                }
                // reap it so no zombie is left behind
                let _ = child.wait();
                return Err(DispatchError::Timeout {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(WAIT_POLL.min(deadline - now));
        }
    }
}

impl DispatchSink for CommandSink {
    fn notify(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        let mut json = serde_json::to_vec(payload)?;
        json.push(b'\n');

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("NOW_PLAYING_SONG_TITLE", &payload.song_title)
            .env("NOW_PLAYING_ARTIST", &payload.artist)
            .env("NOW_PLAYING_ALBUM", &payload.album)
            .env("NOW_PLAYING_GENRE", &payload.genre)
            .env("NOW_PLAYING_ART_URL", &payload.art_url)
            .stdin(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // the command may exit without reading its input
            if let Err(e) = stdin.write_all(&json) {
                log::debug!("{} did not read its input: {e}", self.program);
            }
        }

        let status = self.wait_bounded(&mut child)?;
        if !status.success() {
            return Err(DispatchError::Command {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
