use std::time::Duration;

use serde::Serialize;

use crate::{
    domain::track::NotificationPayload,
    notify::{DispatchError, DispatchSink},
};

const SENDER: &str = "Now Playing";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a room notification
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RoomNotification {
    pub from: String,
    pub message: String,
    pub notify: bool,
    pub message_format: String,
    pub color: String,
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Cover on the left, the four text fields on the right
pub fn render_message(payload: &NotificationPayload, img_width: &str) -> String {
    format!(
        "\n<table><tr><td>\n\
<img src=\"{art_url}\" width=\"{img_width}\"></td><td>\n\
Song: <strong>{song_title}</strong></br>\n\
Artist: <strong>{artist}</strong></br>\n\
Album: <strong>{album}</strong></br>\n\
Genre: <strong>{genre}</strong></td></tr></table>\n",
        art_url = escape_html(&payload.art_url),
        img_width = escape_html(img_width),
        song_title = escape_html(&payload.song_title),
        artist = escape_html(&payload.artist),
        album = escape_html(&payload.album),
        genre = escape_html(&payload.genre),
    )
}

/// Posts each announcement to a HipChat room
pub struct HipChatSink {
    client: reqwest::blocking::Client,
    url: String,
    api_token: String,
    img_width: String,
}

impl HipChatSink {
    pub fn new(host: &str, room: &str, api_token: String, img_width: String) -> reqwest::Result<Self> {
        Self::with_base_url(&format!("https://{host}"), room, api_token, img_width)
    }

    pub fn with_base_url(
        base_url: &str,
        room: &str,
        api_token: String,
        img_width: String,
    ) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            url: format!("{base_url}/v2/room/{room}/notification"),
            api_token,
            img_width,
        })
    }

    pub fn notification(&self, payload: &NotificationPayload) -> RoomNotification {
        RoomNotification {
            from: SENDER.to_string(),
            message: render_message(payload, &self.img_width),
            notify: false,
            message_format: "html".to_string(),
            color: "green".to_string(),
        }
    }
}

impl DispatchSink for HipChatSink {
    fn notify(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_token)
            .json(&self.notification(payload))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        log::debug!("room notification sent: {status}");
        Ok(())
    }
}
