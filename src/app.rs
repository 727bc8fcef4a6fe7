//! Wires the ingest path and the debounce scheduler around one shared
//! aggregator

use std::{io::BufRead, sync::Arc};

use crate::{
    aggregator::MetadataAggregator,
    art::ArtResolver,
    config::Config,
    domain::track::TrackField,
    ingest::{
        decoder::decode,
        framer::Framer,
        router::{Routed, Router},
    },
    notify::DispatchSink,
    scheduler::{self, DebounceConfig, DebounceScheduler, FlushReason},
};

/// Counters for one run of the ingest loop
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub records: usize,
    pub routed: usize,
    pub ignored: usize,
    pub unroutable: usize,
    pub malformed: usize,
}

/// Everything the two activities share, built once at startup
pub struct App {
    aggregator: Arc<MetadataAggregator>,
    art: Box<dyn ArtResolver>,
    sink: Arc<dyn DispatchSink>,
    debounce: DebounceConfig,
}

impl App {
    pub fn new(
        aggregator: Arc<MetadataAggregator>,
        art: Box<dyn ArtResolver>,
        sink: Arc<dyn DispatchSink>,
        debounce: DebounceConfig,
    ) -> Self {
        Self {
            aggregator,
            art,
            sink,
            debounce,
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            Arc::new(MetadataAggregator::with_system_clock()),
            crate::art::from_config(cfg.art.as_ref()),
            Arc::from(crate::notify::from_config(&cfg.notifier)?),
            DebounceConfig::from(&cfg.debounce),
        ))
    }

    /// Reads `input` until it closes while the scheduler announces tracks in
    /// the background. Whatever is still pending when the input closes is
    /// announced once before returning.
    pub fn run<R: BufRead>(self, input: R) -> anyhow::Result<IngestReport> {
        let App {
            aggregator,
            art,
            sink,
            debounce,
        } = self;

        let handle =
            DebounceScheduler::new(Arc::clone(&aggregator), Arc::clone(&sink), debounce)
                .spawn()?;

        let router = Router::new(Arc::clone(&aggregator), art);
        let report = ingest(Framer::new(input), &router);
        log::info!("input closed: {report:?}");

        handle.stop();

        if aggregator.last_arrival() > 0 {
            let reason = if aggregator.is_complete(&TrackField::ALL) {
                FlushReason::Complete
            } else {
                FlushReason::Partial
            };
            let payload = aggregator.flush();
            scheduler::dispatch(sink.as_ref(), reason, &payload);
        }

        Ok(report)
    }
}

/// Frames, decodes and routes every record, one at a time in arrival order
pub fn ingest<R: BufRead>(framer: Framer<R>, router: &Router) -> IngestReport {
    let mut report = IngestReport::default();

    for raw in framer {
        let record = match raw.and_then(|raw| decode(&raw)) {
            Ok(record) => record,
            Err(e) => {
                log::error!("{e}");
                report.malformed += 1;
                continue;
            }
        };
        report.records += 1;

        match router.route(&record) {
            Routed::Field { .. } | Routed::ArtSkipped => report.routed += 1,
            Routed::Ignored(_) => report.ignored += 1,
            Routed::Unroutable => report.unroutable += 1,
        }
    }

    report
}
