//! Paced playback of recorded telemetry.

use futures::stream::BoxStream;
use futures::{Stream, StreamExt, ready};
use pin_project_lite::pin_project;
use std::io::{Read, Seek};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, interval};
use tracing::{debug, info};

use super::ThrottleExt;
use crate::ibt::DiskReader;
use crate::types::{TelemetryRecord, UpdateRate};
use crate::Result;

pin_project! {
    /// Records from a [`DiskReader`], one per tick of the file's recording rate.
    pub struct Paced<R> {
        reader: DiskReader<R>,
        interval: Interval,
        finished: bool,
    }
}

impl<R: Read + Seek> Paced<R> {
    pub fn new(reader: DiskReader<R>) -> Self {
        let period = Duration::from_secs_f64(1.0 / reader.tick_rate());
        Self { reader, interval: interval(period), finished: false }
    }

    pub fn reader(&self) -> &DiskReader<R> {
        &self.reader
    }
}

impl<R: Read + Seek> Stream for Paced<R> {
    type Item = Result<TelemetryRecord>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }
        ready!(this.interval.poll_tick(cx));

        // rows are small and the reader is usually buffered, so read inline
        match this.reader.next_record() {
            Ok(Some(record)) => Poll::Ready(Some(Ok(record))),
            Ok(None) => {
                debug!(records = this.reader.position(), "Replay finished");
                *this.finished = true;
                Poll::Ready(None)
            }
            Err(e) => {
                *this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
        }
    }
}

/// Play `reader` back at its recording rate, capped at `rate`.
///
/// Under a cap, rows that arrive within one interval collapse to the latest.
/// Must be called and polled inside a tokio runtime.
pub fn replay<R>(reader: DiskReader<R>, rate: UpdateRate) -> BoxStream<'static, Result<TelemetryRecord>>
where
    R: Read + Seek + Send + 'static,
{
    let tick_rate = reader.tick_rate();
    let rate = rate.normalize(tick_rate);
    info!(tick_rate, ?rate, records = reader.record_count(), "Starting replay");

    let paced = Paced::new(reader);
    match rate.throttle_interval(tick_rate) {
        Some(period) => paced.throttle(period).boxed(),
        None => paced.boxed(),
    }
}
