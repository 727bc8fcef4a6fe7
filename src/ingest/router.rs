//! Applies decoded records to the aggregator, keyed on the record code

use std::sync::Arc;

use crate::{
    aggregator::MetadataAggregator,
    art::ArtResolver,
    domain::{code::FourCc, track::TrackField},
    ingest::decoder::DecodedRecord,
};

/// What routing did with one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// `field` was offered a value; `written` is false when a fallback write
    /// found the field already filled
    Field { field: TrackField, written: bool },
    /// Picture record whose upload failed or that carried no picture
    ArtSkipped,
    /// Known record kind that does not describe the track
    Ignored(FourCc),
    /// Record without a usable code
    Unroutable,
}

/// How a code maps onto a track field
fn text_target(code: FourCc) -> Option<(TrackField, bool)> {
    match code {
        FourCc::ARTIST => Some((TrackField::Artist, true)),
        FourCc::ARTIST_FALLBACK => Some((TrackField::Artist, false)),
        FourCc::TITLE => Some((TrackField::SongTitle, true)),
        FourCc::TITLE_FALLBACK => Some((TrackField::SongTitle, false)),
        FourCc::ALBUM => Some((TrackField::Album, true)),
        FourCc::GENRE => Some((TrackField::Genre, true)),
        _ => None,
    }
}

pub struct Router {
    aggregator: Arc<MetadataAggregator>,
    art: Box<dyn ArtResolver>,
}

impl Router {
    pub fn new(aggregator: Arc<MetadataAggregator>, art: Box<dyn ArtResolver>) -> Self {
        Self { aggregator, art }
    }

    pub fn route(&self, record: &DecodedRecord) -> Routed {
        let Some(code) = record.code else {
            log::info!("unroutable record {record}");
            return Routed::Unroutable;
        };

        if code == FourCc::PICTURE {
            return self.route_picture(record);
        }

        match text_target(code) {
            Some((field, overwrite)) => {
                let value = record
                    .payload
                    .as_ref()
                    .map(|p| p.to_text())
                    .unwrap_or_default();
                let written = if overwrite {
                    self.aggregator.set_field(field, value);
                    true
                } else {
                    self.aggregator.set_field_if_empty(field, value)
                };
                log::debug!("{record} -> {field} (written: {written})");
                Routed::Field { field, written }
            }
            None => {
                log::debug!("ignoring {record}");
                Routed::Ignored(code)
            }
        }
    }

    /// Upload runs on the calling thread and blocks until it returns
    fn route_picture(&self, record: &DecodedRecord) -> Routed {
        let Some(picture) = record.payload.as_ref() else {
            log::warn!("picture record without data");
            return Routed::ArtSkipped;
        };

        match self.art.upload(picture.as_bytes()) {
            Ok(url) => {
                log::info!("art uploaded to {url}");
                self.aggregator.set_field(TrackField::ArtUrl, url);
                Routed::Field {
                    field: TrackField::ArtUrl,
                    written: true,
                }
            }
            Err(e) => {
                log::error!("art upload failed: {e}");
                Routed::ArtSkipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{Routed, Router};
    use crate::{
        aggregator::{MetadataAggregator, testing::ManualClock},
        art::{ArtResolver, DisabledArt, UploadError},
        domain::{code::FourCc, track::TrackField},
        ingest::decoder::{DecodedRecord, Payload},
    };

    /// Records what it was given and answers with a fixed URL
    #[derive(Default, Clone)]
    struct FakeArt(Arc<Mutex<Vec<Vec<u8>>>>);

    impl ArtResolver for FakeArt {
        fn upload(&self, bytes: &[u8]) -> Result<String, UploadError> {
            self.0.lock().unwrap().push(bytes.to_vec());
            Ok("http://x/1.png".to_string())
        }
    }

    fn text(code: FourCc, value: &str) -> DecodedRecord {
        DecodedRecord {
            code: Some(code),
            kind: Some(FourCc(*b"core")),
            payload: Some(Payload::Text(value.to_string())),
        }
    }

    fn router(art: Box<dyn ArtResolver>) -> (Router, Arc<MetadataAggregator>) {
        let agg = Arc::new(MetadataAggregator::new(Box::new(ManualClock::at(1_000))));
        (Router::new(Arc::clone(&agg), art), agg)
    }

    #[test]
    fn test_routes_every_text_code() {
        let (router, agg) = router(Box::new(DisabledArt));

        router.route(&text(FourCc::TITLE, "Foo"));
        router.route(&text(FourCc::ARTIST, "Bar"));
        router.route(&text(FourCc::ALBUM, "Baz"));
        router.route(&text(FourCc::GENRE, "Rock"));

        assert_eq!(agg.value(TrackField::SongTitle), "Foo");
        assert_eq!(agg.value(TrackField::Artist), "Bar");
        assert_eq!(agg.value(TrackField::Album), "Baz");
        assert_eq!(agg.value(TrackField::Genre), "Rock");
        assert!(!agg.is_complete(&TrackField::ALL));
    }

    #[test]
    fn test_fallback_codes_never_overwrite_primary() {
        let (router, agg) = router(Box::new(DisabledArt));

        router.route(&text(FourCc::ARTIST, "Primary"));
        let routed = router.route(&text(FourCc::ARTIST_FALLBACK, "Fallback"));

        assert_eq!(
            routed,
            Routed::Field {
                field: TrackField::Artist,
                written: false
            }
        );
        assert_eq!(agg.value(TrackField::Artist), "Primary");
    }

    #[test]
    fn test_primary_codes_overwrite_fallback() {
        let (router, agg) = router(Box::new(DisabledArt));

        router.route(&text(FourCc::TITLE_FALLBACK, "Sort Name"));
        assert_eq!(agg.value(TrackField::SongTitle), "Sort Name");

        router.route(&text(FourCc::TITLE, "Name"));
        assert_eq!(agg.value(TrackField::SongTitle), "Name");
    }

    #[test]
    fn test_picture_is_uploaded_and_url_recorded() {
        let art = FakeArt::default();
        let (router, agg) = router(Box::new(art.clone()));
        let png = b"\x89PNG\xff".to_vec();

        let routed = router.route(&DecodedRecord {
            code: Some(FourCc::PICTURE),
            kind: Some(FourCc(*b"ssnc")),
            payload: Some(Payload::Bytes(png.clone())),
        });

        assert_eq!(
            routed,
            Routed::Field {
                field: TrackField::ArtUrl,
                written: true
            }
        );
        assert_eq!(agg.value(TrackField::ArtUrl), "http://x/1.png");
        assert_eq!(*art.0.lock().unwrap(), vec![png]);
    }

    #[test]
    fn test_failed_upload_leaves_art_unset() {
        let (router, agg) = router(Box::new(DisabledArt));

        let routed = router.route(&DecodedRecord {
            code: Some(FourCc::PICTURE),
            kind: None,
            payload: Some(Payload::Bytes(vec![1, 2, 3])),
        });

        assert_eq!(routed, Routed::ArtSkipped);
        assert_eq!(agg.arrived_at(TrackField::ArtUrl), 0);
    }

    #[test]
    fn test_text_code_without_payload_still_arrives() {
        let (router, agg) = router(Box::new(DisabledArt));

        router.route(&DecodedRecord {
            code: Some(FourCc::GENRE),
            kind: None,
            payload: None,
        });

        assert_eq!(agg.value(TrackField::Genre), "");
        assert_eq!(agg.arrived_at(TrackField::Genre), 1_000);
    }

    #[test]
    fn test_unknown_and_missing_codes_are_not_routed() {
        let (router, agg) = router(Box::new(DisabledArt));

        assert_eq!(
            router.route(&text(FourCc(*b"pbeg"), "")),
            Routed::Ignored(FourCc(*b"pbeg"))
        );
        assert_eq!(router.route(&DecodedRecord::default()), Routed::Unroutable);
        assert_eq!(agg.last_arrival(), 0);
    }
}
