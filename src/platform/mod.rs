//! Operating-system primitives behind a live connection.
//!
//! The simulator publishes telemetry through three named kernel objects: a file mapping holding
//! the image, an event pulsed after every row, and a registered window message used for
//! remote-control commands. [`Platform`] is the seam between those objects and the
//! [`Connection`](crate::connection::Connection) state machine:
//!
//! - [`WindowsPlatform`] talks to the real objects (Windows only)
//! - [`MemoryPlatform`] keeps the image in process, for tests and for tooling that replays
//!   captured images on any OS
//!
//! Handles are owned values. Closing consumes them, so a closed handle cannot be reused.

use std::time::Duration;

use crate::Result;
use crate::source::ByteSource;

pub mod memory;
#[cfg(windows)]
pub mod windows;

pub use memory::{MemoryPlatform, MemoryProducer, SentBroadcast};
#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Outcome of waiting on the wake signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Signaled,
    TimedOut,
}

/// Access to the producer's shared region, wake signal and broadcast channel.
pub trait Platform {
    /// Open handle to the shared region
    type Region;
    /// Mapped, read-only view of a region
    type View: ByteSource;
    /// Open handle to the wake signal
    type Signal;

    /// Open the named shared region. Fails when the producer is not running.
    fn open_shared_region(&self, name: &str) -> Result<Self::Region>;

    /// Map up to `size` bytes of an open region.
    fn map_region(&self, region: &Self::Region, size: usize) -> Result<Self::View>;

    /// Open the named wake signal.
    fn open_wake_signal(&self, name: &str) -> Result<Self::Signal>;

    /// Block until the signal fires or `timeout` elapses.
    fn wait_on_signal(&self, signal: &Self::Signal, timeout: Duration) -> Result<WaitResult>;

    /// Unmap `view`, if one was mapped, and close `region`.
    fn close_region(&self, region: Self::Region, view: Option<Self::View>);

    fn close_signal(&self, signal: Self::Signal);

    /// Register (or look up) a system-wide message id.
    fn register_broadcast_message(&self, name: &str) -> Result<u32>;

    /// Post a message to every top-level window.
    fn send_broadcast(&self, message_id: u32, wparam: u32, lparam: u32) -> Result<()>;
}
