//! Win32 kernel objects published by the simulator.
//!
//! The mapping is opened read-only and copied out of through [`ByteSource`]; nothing in the
//! view is reinterpreted in place.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::ptr::NonNull;
use std::time::Duration;

use tracing::{debug, trace, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE, LPARAM, WAIT_OBJECT_0, WAIT_TIMEOUT, WPARAM};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
};
use windows::Win32::System::Threading::{
    OpenEventW, SYNCHRONIZATION_ACCESS_RIGHTS, WaitForSingleObject,
};
use windows::Win32::UI::WindowsAndMessaging::{
    HWND_BROADCAST, RegisterWindowMessageW, SendNotifyMessageW,
};
use windows::core::PCWSTR;

use super::{Platform, WaitResult};
use crate::source::{ByteSource, check_range};
use crate::{Result, TelemetryError};

/// SYNCHRONIZE access right
const SYNCHRONIZE: u32 = 0x0010_0000;

/// The simulator's shared memory and event objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPlatform;

/// Open file mapping handle.
#[derive(Debug)]
pub struct WindowsRegion {
    mapping: HANDLE,
}

/// Read-only view of a mapping.
#[derive(Debug)]
pub struct WindowsView {
    base: NonNull<u8>,
    len: usize,
}

/// Open event handle.
#[derive(Debug)]
pub struct WindowsSignal {
    event: HANDLE,
}

// SAFETY: kernel handles and a read-only view may be used from any thread; every access
// copies out through `read_into`.
unsafe impl Send for WindowsRegion {}
unsafe impl Send for WindowsView {}
unsafe impl Sync for WindowsView {}
unsafe impl Send for WindowsSignal {}

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Platform for WindowsPlatform {
    type Region = WindowsRegion;
    type View = WindowsView;
    type Signal = WindowsSignal;

    fn open_shared_region(&self, name: &str) -> Result<WindowsRegion> {
        trace!(name, "Opening file mapping");
        let wide_name = wide_string(name);
        let mapping = unsafe {
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr()))
                .map_err(|e| TelemetryError::windows_api_error("OpenFileMappingW", e))?
        };
        Ok(WindowsRegion { mapping })
    }

    fn map_region(&self, region: &WindowsRegion, size: usize) -> Result<WindowsView> {
        let view = unsafe { MapViewOfFile(region.mapping, FILE_MAP_READ, 0, 0, size) };
        let base = NonNull::new(view.Value as *mut u8).ok_or_else(|| {
            let win_err = windows::core::Error::from_thread();
            TelemetryError::windows_api_error("MapViewOfFile", win_err)
        })?;
        debug!(size, "Mapped telemetry view");
        Ok(WindowsView { base, len: size })
    }

    fn open_wake_signal(&self, name: &str) -> Result<WindowsSignal> {
        let wide_name = wide_string(name);
        let event = unsafe {
            OpenEventW(
                SYNCHRONIZATION_ACCESS_RIGHTS(SYNCHRONIZE),
                false,
                PCWSTR::from_raw(wide_name.as_ptr()),
            )
            .map_err(|e| TelemetryError::windows_api_error("OpenEventW", e))?
        };
        Ok(WindowsSignal { event })
    }

    fn wait_on_signal(&self, signal: &WindowsSignal, timeout: Duration) -> Result<WaitResult> {
        let ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        let result = unsafe { WaitForSingleObject(signal.event, ms) };

        match result {
            WAIT_OBJECT_0 => Ok(WaitResult::Signaled),
            WAIT_TIMEOUT => {
                trace!(timeout_ms = ms, "Wait timed out");
                Ok(WaitResult::TimedOut)
            }
            _ => {
                let win_err = windows::core::Error::from_thread();
                Err(TelemetryError::windows_api_error("WaitForSingleObject", win_err))
            }
        }
    }

    fn close_region(&self, region: WindowsRegion, view: Option<WindowsView>) {
        unsafe {
            if let Some(view) = view {
                let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: view.base.as_ptr() as *mut _ };
                if let Err(e) = UnmapViewOfFile(addr) {
                    warn!(error = %e, "UnmapViewOfFile failed");
                }
            }
            if let Err(e) = CloseHandle(region.mapping) {
                warn!(error = %e, "CloseHandle on file mapping failed");
            }
        }
    }

    fn close_signal(&self, signal: WindowsSignal) {
        if let Err(e) = unsafe { CloseHandle(signal.event) } {
            warn!(error = %e, "CloseHandle on event failed");
        }
    }

    fn register_broadcast_message(&self, name: &str) -> Result<u32> {
        let wide_name = wide_string(name);
        let id = unsafe { RegisterWindowMessageW(PCWSTR::from_raw(wide_name.as_ptr())) };
        if id == 0 {
            let win_err = windows::core::Error::from_thread();
            return Err(TelemetryError::windows_api_error("RegisterWindowMessageW", win_err));
        }
        Ok(id)
    }

    fn send_broadcast(&self, message_id: u32, wparam: u32, lparam: u32) -> Result<()> {
        unsafe {
            SendNotifyMessageW(
                HWND_BROADCAST,
                message_id,
                WPARAM(wparam as usize),
                LPARAM(lparam as i32 as isize),
            )
            .map_err(|e| TelemetryError::windows_api_error("SendNotifyMessageW", e))
        }
    }
}

impl ByteSource for WindowsView {
    fn len(&self) -> usize {
        self.len
    }

    fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        check_range(offset, dst.len(), self.len)?;
        // SAFETY: the range lies inside the mapped view, which stays mapped until
        // `close_region` consumes it.
        unsafe {
            std::ptr::copy_nonoverlapping(self.base.as_ptr().add(offset), dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }

    /// Tick counts are rewritten by the producer, so every read goes to memory.
    fn read_i32(&self, offset: usize) -> Result<i32> {
        check_range(offset, 4, self.len)?;
        // SAFETY: in range as above; `[u8; 4]` has alignment 1.
        let bytes = unsafe { std::ptr::read_volatile(self.base.as_ptr().add(offset).cast::<[u8; 4]>()) };
        Ok(i32::from_le_bytes(bytes))
    }
}

/// Convert string to null-terminated wide string for Windows APIs
fn wide_string(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IRSDK_DATAVALIDEVENTNAME, IRSDK_MEMMAPFILENAME, MEMMAPFILESIZE};
    use crate::snapshot::read_live_header;

    #[test]
    fn wide_strings_are_nul_terminated() {
        let wide = wide_string("Local\\A");
        assert_eq!(wide.len(), 8);
        assert_eq!(wide.last(), Some(&0));
    }

    #[test]
    fn missing_mapping_is_an_error() {
        let platform = WindowsPlatform::new();
        assert!(platform.open_shared_region("Local\\irtelem-test-does-not-exist").is_err());
    }

    #[test]
    #[ignore = "iracing_required"]
    fn maps_live_simulator_memory() -> anyhow::Result<()> {
        let platform = WindowsPlatform::new();
        let region = platform.open_shared_region(IRSDK_MEMMAPFILENAME)?;
        let view = platform.map_region(&region, MEMMAPFILESIZE)?;
        let signal = platform.open_wake_signal(IRSDK_DATAVALIDEVENTNAME)?;

        let header = read_live_header(&view)?;
        assert_eq!(header.ver, 2);
        assert!(header.tick_rate > 0);
        platform.wait_on_signal(&signal, Duration::from_millis(100))?;

        platform.close_region(region, Some(view));
        platform.close_signal(signal);
        Ok(())
    }
}
