use std::fmt::Display;

use serde::Serialize;

/// Placeholder announced for text fields that never arrived.
pub const UNKNOWN: &str = "Unknown";

/// Fields describing the track currently playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackField {
    SongTitle,
    Artist,
    Album,
    Genre,
    ArtUrl,
}

impl TrackField {
    pub const ALL: [TrackField; 5] = [
        TrackField::SongTitle,
        TrackField::Artist,
        TrackField::Album,
        TrackField::Genre,
        TrackField::ArtUrl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TrackField::SongTitle => "song_title",
            TrackField::Artist => "artist",
            TrackField::Album => "album",
            TrackField::Genre => "genre",
            TrackField::ArtUrl => "art_url",
        }
    }
}

impl Display for TrackField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of the track fields taken by a flush
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub song_title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub art_url: String,
}

impl NotificationPayload {
    #[cfg(test)]
    pub fn get(&self, field: TrackField) -> &str {
        match field {
            TrackField::SongTitle => &self.song_title,
            TrackField::Artist => &self.artist,
            TrackField::Album => &self.album,
            TrackField::Genre => &self.genre,
            TrackField::ArtUrl => &self.art_url,
        }
    }

    pub(crate) fn slot_mut(&mut self, field: TrackField) -> &mut String {
        match field {
            TrackField::SongTitle => &mut self.song_title,
            TrackField::Artist => &mut self.artist,
            TrackField::Album => &mut self.album,
            TrackField::Genre => &mut self.genre,
            TrackField::ArtUrl => &mut self.art_url,
        }
    }

    /// Replaces empty text fields with [`UNKNOWN`]. The art URL stays empty
    /// when there is no art.
    pub fn with_placeholders(mut self) -> Self {
        for field in [
            TrackField::SongTitle,
            TrackField::Artist,
            TrackField::Album,
            TrackField::Genre,
        ] {
            let slot = self.slot_mut(field);
            if slot.is_empty() {
                *slot = UNKNOWN.to_string();
            }
        }
        self
    }
}

impl Display for NotificationPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" by {} from {} ({})",
            self.song_title, self.artist, self.album, self.genre
        )?;
        if !self.art_url.is_empty() {
            write!(f, " art: {}", self.art_url)?;
        }
        Ok(())
    }
}
