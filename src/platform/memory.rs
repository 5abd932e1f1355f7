//! In-process platform backed by a byte buffer.
//!
//! A [`MemoryPlatform`] and its [`MemoryProducer`] share one image. The producer side writes
//! rows the way the simulator does (row first, then the slot's tick) and fires the wake
//! signal; the platform side hands out views that copy from the same buffer.
//!
//! ```rust
//! use irtelem::platform::{MemoryPlatform, Platform};
//!
//! let platform = MemoryPlatform::new();
//! // nothing published yet
//! assert!(platform.open_shared_region("Local\\IRSDKMemMapFileName").is_err());
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use super::{Platform, WaitResult};
use crate::schema::{HEADER_SIZE, Header, IRSDK_STATUS_CONNECTED};
use crate::source::{ByteSource, check_range};
use crate::{Result, TelemetryError};

/// First id handed out by [`Platform::register_broadcast_message`], matching the range
/// Windows uses for registered messages.
const FIRST_MESSAGE_ID: u32 = 0xC000;

type SharedImage = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Default)]
struct Shared {
    image: Mutex<Option<SharedImage>>,
    generation: Mutex<u64>,
    woken: Condvar,
    open_handles: AtomicUsize,
    messages: Mutex<HashMap<String, u32>>,
    sent: Mutex<Vec<SentBroadcast>>,
}

/// One message passed to [`Platform::send_broadcast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentBroadcast {
    pub message_id: u32,
    pub wparam: u32,
    pub lparam: u32,
}

/// Platform whose shared region lives in this process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlatform {
    shared: Arc<Shared>,
}

/// Open region: keeps the image it was opened on alive.
#[derive(Debug)]
pub struct MemoryRegion {
    image: SharedImage,
}

/// Mapped view over a [`MemoryRegion`].
#[derive(Debug, Clone)]
pub struct MemoryView {
    image: SharedImage,
    len: usize,
}

/// Open wake signal.
#[derive(Debug)]
pub struct MemorySignal {
    name: String,
}

impl MemoryPlatform {
    /// Platform with no region published.
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform with `image` already published.
    pub fn with_image(image: Vec<u8>) -> Self {
        let platform = Self::new();
        platform.producer().install(image);
        platform
    }

    /// Producer side of the shared state.
    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer { shared: Arc::clone(&self.shared) }
    }

    /// Regions, views and signals opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.shared.open_handles.load(Ordering::SeqCst)
    }

    /// Every broadcast sent so far, oldest first.
    pub fn sent_broadcasts(&self) -> Vec<SentBroadcast> {
        self.shared.sent.lock().clone()
    }
}

impl Platform for MemoryPlatform {
    type Region = MemoryRegion;
    type View = MemoryView;
    type Signal = MemorySignal;

    fn open_shared_region(&self, name: &str) -> Result<MemoryRegion> {
        let image = self.shared.image.lock().clone().ok_or_else(|| {
            TelemetryError::platform_failure("open_shared_region", format!("{name} does not exist"))
        })?;
        self.shared.open_handles.fetch_add(1, Ordering::SeqCst);
        trace!(name, "Opened in-memory region");
        Ok(MemoryRegion { image })
    }

    fn map_region(&self, region: &MemoryRegion, size: usize) -> Result<MemoryView> {
        let len = size.min(region.image.lock().len());
        self.shared.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryView { image: Arc::clone(&region.image), len })
    }

    fn open_wake_signal(&self, name: &str) -> Result<MemorySignal> {
        self.shared.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySignal { name: name.to_string() })
    }

    fn wait_on_signal(&self, signal: &MemorySignal, timeout: Duration) -> Result<WaitResult> {
        let mut generation = self.shared.generation.lock();
        let start = *generation;
        self.shared.woken.wait_while_for(&mut generation, |current| *current == start, timeout);

        if *generation == start {
            trace!(signal = %signal.name, ?timeout, "Wait timed out");
            Ok(WaitResult::TimedOut)
        } else {
            Ok(WaitResult::Signaled)
        }
    }

    fn close_region(&self, region: MemoryRegion, view: Option<MemoryView>) {
        let handles = 1 + usize::from(view.is_some());
        drop(view);
        drop(region);
        self.shared.open_handles.fetch_sub(handles, Ordering::SeqCst);
    }

    fn close_signal(&self, signal: MemorySignal) {
        trace!(signal = %signal.name, "Closed in-memory signal");
        self.shared.open_handles.fetch_sub(1, Ordering::SeqCst);
    }

    fn register_broadcast_message(&self, name: &str) -> Result<u32> {
        let mut messages = self.shared.messages.lock();
        let next = FIRST_MESSAGE_ID + messages.len() as u32;
        Ok(*messages.entry(name.to_string()).or_insert(next))
    }

    fn send_broadcast(&self, message_id: u32, wparam: u32, lparam: u32) -> Result<()> {
        self.shared.sent.lock().push(SentBroadcast { message_id, wparam, lparam });
        Ok(())
    }
}

impl ByteSource for MemoryView {
    fn len(&self) -> usize {
        self.len
    }

    fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        check_range(offset, dst.len(), self.len)?;
        self.image.lock().as_slice().read_into(offset, dst)
    }
}

/// Writes to the shared image the way the simulator does.
#[derive(Debug, Clone)]
pub struct MemoryProducer {
    shared: Arc<Shared>,
}

impl MemoryProducer {
    /// Publish a new image. Regions opened earlier keep the old one.
    pub fn install(&self, image: Vec<u8>) {
        debug!(len = image.len(), "Installing in-memory image");
        *self.shared.image.lock() = Some(Arc::new(Mutex::new(image)));
    }

    /// Withdraw the image so new opens fail.
    pub fn remove(&self) {
        *self.shared.image.lock() = None;
    }

    /// Run `f` against the current image.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> Result<R>) -> Result<R> {
        let image = self.shared.image.lock().clone().ok_or_else(|| {
            TelemetryError::platform_failure("update image", "no image installed")
        })?;
        let mut bytes = image.lock();
        f(&mut bytes)
    }

    /// Write `row` into `slot` and stamp it with `tick`, without signaling.
    pub fn write_row(&self, slot: usize, tick: i32, row: &[u8]) -> Result<()> {
        self.update(|image| write_row(image, slot, tick, row))
    }

    /// Write `row` into the slot after the current latest one, then fire the wake signal.
    ///
    /// Returns the slot written.
    pub fn publish(&self, tick: i32, row: &[u8]) -> Result<usize> {
        let slot = self.update(|image| {
            let header = Header::decode(image)?;
            let slot = (header.latest_slot() + 1) % header.active_slots();
            write_row(image, slot, tick, row)?;
            Ok(slot)
        })?;
        self.signal();
        Ok(slot)
    }

    /// Set or clear the status connected bit.
    pub fn set_connected(&self, connected: bool) -> Result<()> {
        self.update(|image| {
            let mut header = Header::decode(image)?;
            if connected {
                header.status |= IRSDK_STATUS_CONNECTED;
            } else {
                header.status &= !IRSDK_STATUS_CONNECTED;
            }
            image[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
            Ok(())
        })
    }

    /// Wake every waiter.
    pub fn signal(&self) {
        *self.shared.generation.lock() += 1;
        self.shared.woken.notify_all();
    }
}

/// Write `row` into `slot` of a live image, then store `tick` in the slot's tick count.
pub fn write_row(image: &mut [u8], slot: usize, tick: i32, row: &[u8]) -> Result<()> {
    let header = Header::decode(image)?;
    let range = header.row_range(slot)?;
    if row.len() != range.len() {
        return Err(TelemetryError::parse(
            "row write",
            format!("row is {} bytes, slot holds {}", row.len(), range.len()),
        ));
    }
    check_range(range.start, range.len(), image.len())?;
    image[range].copy_from_slice(row);

    let tick_at = Header::tick_count_offset(slot);
    image[tick_at..tick_at + 4].copy_from_slice(&tick.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::read_live_header;
    use crate::test_utils::{ImageBuilder, float_descriptor};
    use std::thread;
    use std::time::Instant;

    fn image() -> Vec<u8> {
        ImageBuilder::new(vec![float_descriptor("Speed", 0)], 4).num_buf(3).build_live()
    }

    #[test]
    fn views_follow_producer_writes() -> anyhow::Result<()> {
        let platform = MemoryPlatform::with_image(image());
        let region = platform.open_shared_region("region")?;
        let view = platform.map_region(&region, usize::MAX)?;

        let slot = platform.producer().publish(9, &2.5f32.to_le_bytes())?;
        let header = read_live_header(&view)?;
        assert_eq!(header.var_buf[slot].tick_count, 9);
        assert_eq!(header.latest_slot(), slot);

        let mut row = [0u8; 4];
        view.read_into(header.row_range(slot)?.start, &mut row)?;
        assert_eq!(f32::from_le_bytes(row), 2.5);
        Ok(())
    }

    #[test]
    fn publish_rotates_through_slots() -> anyhow::Result<()> {
        let platform = MemoryPlatform::with_image(image());
        let producer = platform.producer();
        let slots: Vec<usize> =
            (1..=4).map(|tick| producer.publish(tick, &[0u8; 4])).collect::<Result<_>>()?;
        assert_eq!(slots, vec![1, 2, 0, 1]);
        Ok(())
    }

    #[test]
    fn mapped_length_is_capped_by_the_image() -> anyhow::Result<()> {
        let image = image();
        let len = image.len();
        let platform = MemoryPlatform::with_image(image);
        let region = platform.open_shared_region("region")?;
        assert_eq!(platform.map_region(&region, 16)?.len(), 16);
        assert_eq!(platform.map_region(&region, len * 2)?.len(), len);
        Ok(())
    }

    #[test]
    fn handles_are_counted_until_closed() -> anyhow::Result<()> {
        let platform = MemoryPlatform::with_image(image());
        let region = platform.open_shared_region("region")?;
        let view = platform.map_region(&region, 1024)?;
        let signal = platform.open_wake_signal("event")?;
        assert_eq!(platform.open_handles(), 3);

        platform.close_region(region, Some(view));
        platform.close_signal(signal);
        assert_eq!(platform.open_handles(), 0);
        Ok(())
    }

    #[test]
    fn removed_image_stays_readable_through_open_views() -> anyhow::Result<()> {
        let platform = MemoryPlatform::with_image(image());
        let region = platform.open_shared_region("region")?;
        let view = platform.map_region(&region, usize::MAX)?;

        platform.producer().remove();
        assert!(platform.open_shared_region("region").is_err());
        assert!(read_live_header(&view)?.is_connected());
        Ok(())
    }

    #[test]
    fn wait_times_out_without_a_signal() -> anyhow::Result<()> {
        let platform = MemoryPlatform::new();
        let signal = platform.open_wake_signal("event")?;
        let started = Instant::now();
        assert_eq!(platform.wait_on_signal(&signal, Duration::from_millis(5))?, WaitResult::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(5));
        Ok(())
    }

    #[test]
    fn wait_wakes_on_signal_from_another_thread() -> anyhow::Result<()> {
        let platform = MemoryPlatform::new();
        let signal = platform.open_wake_signal("event")?;
        let producer = platform.producer();

        let pulser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.signal();
        });
        let result = platform.wait_on_signal(&signal, Duration::from_secs(5))?;
        pulser.join().map_err(|_| anyhow::anyhow!("signal thread panicked"))?;
        assert_eq!(result, WaitResult::Signaled);
        Ok(())
    }

    #[test]
    fn broadcast_ids_are_stable_per_name() -> anyhow::Result<()> {
        let platform = MemoryPlatform::new();
        let first = platform.register_broadcast_message("IRSDK_BROADCASTMSG")?;
        assert_eq!(platform.register_broadcast_message("IRSDK_BROADCASTMSG")?, first);
        assert_ne!(platform.register_broadcast_message("OTHER")?, first);

        platform.send_broadcast(first, 1, 2)?;
        assert_eq!(
            platform.sent_broadcasts(),
            vec![SentBroadcast { message_id: first, wparam: 1, lparam: 2 }]
        );
        Ok(())
    }

    #[test]
    fn write_row_rejects_wrong_length() {
        let mut image = image();
        assert!(matches!(write_row(&mut image, 0, 1, &[0u8; 3]), Err(TelemetryError::Parse { .. })));
        assert!(write_row(&mut image, 7, 1, &[0u8; 4]).is_err());
    }
}
