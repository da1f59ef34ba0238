//! Ownership of the vendor UHF reader connection.
//!
//! The vendor ships the reader as a stdcall HID DLL (`UHFPrimeReader`), so the
//! real implementation only exists on Windows; other targets get a stub that
//! reports zero attached devices, in which case startup bails out before any
//! command is accepted. `ReaderSession` is the sole owner of the native handle
//! and closes it exactly once on drop.

use thiserror::Error;

/// Largest tag identifier the native `TagInfo` buffer can carry.
pub const MAX_EPC_BYTES: usize = 64;

/// Native status for a successful call.
pub const STATUS_OK: i32 = 0x00;
/// Native status for "no tag seen within the timeout window"; not an error.
pub const STATUS_NO_TAG: i32 = 0x15;

/// Why opening the reader connection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OpenError {
    #[error("no UHF reader attached")]
    NoDevice,
    #[error("OpenHidConnection failed with status {0:#04x}")]
    Native(i32),
    #[error("reader returned a null connection handle")]
    NullHandle,
}

/// A native call reported a status that is neither success nor no-tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("reader returned status {code:#04x}")]
pub struct ReaderError {
    pub code: i32,
}

/// One successful tag read; the identifier bytes, 1..=64 of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRead {
    pub bytes: Vec<u8>,
}

/// Blocking operation surface of an opened reader, the seam the inventory
/// controller (and its tests) depend on.
///
/// Callers must not overlap a control call with an in-flight poll; the
/// controller guarantees this by joining its polling thread before issuing
/// `stop_inventory`.
pub trait TagReader: Send + Sync {
    /// Arm the device for continuous reads. On failure no polling loop may be
    /// started for this invocation.
    fn start_inventory(&self, burst_count: u8, param: u32) -> Result<(), ReaderError>;

    /// Disarm continuous reads. Best-effort teardown; failures are swallowed.
    fn stop_inventory(&self, timeout_ms: u16);

    /// One bounded attempt to read a tag. `Ok(None)` when nothing was in
    /// range within the window.
    fn poll_tag(&self, timeout_ms: u16) -> Result<Option<TagRead>, ReaderError>;
}

#[cfg(windows)]
mod platform {
    use super::{OpenError, ReaderError, TagRead, TagReader, MAX_EPC_BYTES, STATUS_NO_TAG, STATUS_OK};
    use crate::log_debug;
    use std::os::raw::c_void;

    #[allow(non_snake_case)]
    mod ffi {
        use super::MAX_EPC_BYTES;
        use std::os::raw::{c_int, c_void};

        #[repr(C)]
        pub struct TagInfo {
            pub len: c_int,
            pub code: [u8; MAX_EPC_BYTES],
        }

        #[link(name = "UHFPrimeReader")]
        extern "system" {
            pub fn CFHid_GetUsbCount() -> c_int;
            pub fn OpenHidConnection(h_comm: *mut *mut c_void, index: u16) -> c_int;
            pub fn CloseDevice(h_comm: *mut c_void) -> c_int;
            pub fn InventoryContinue(h_comm: *mut c_void, inv_count: u8, inv_param: u32) -> c_int;
            pub fn InventoryStop(h_comm: *mut c_void, timeout_ms: u16) -> c_int;
            pub fn GetTagUii(h_comm: *mut c_void, info: *mut TagInfo, timeout_ms: u16) -> c_int;
        }
    }

    /// Number of HID-attached readers the vendor library can see.
    pub fn usb_device_count() -> i32 {
        unsafe { ffi::CFHid_GetUsbCount() }
    }

    /// Sole owner of one open reader connection.
    pub struct ReaderSession {
        handle: *mut c_void,
    }

    // The handle crosses into the polling thread. The vendor library tolerates
    // one poller plus control calls as long as they never overlap, which the
    // inventory controller enforces by quiescing the poller before any
    // control call.
    unsafe impl Send for ReaderSession {}
    unsafe impl Sync for ReaderSession {}

    impl ReaderSession {
        /// Open the reader at `index`. Fails on a non-success status or a
        /// null handle.
        pub fn open(index: u16) -> Result<Self, OpenError> {
            let mut handle: *mut c_void = std::ptr::null_mut();
            let status = unsafe { ffi::OpenHidConnection(&mut handle, index) };
            if status != STATUS_OK {
                return Err(OpenError::Native(status));
            }
            if handle.is_null() {
                return Err(OpenError::NullHandle);
            }
            log_debug(&format!("Reader opened at index {index}"));
            Ok(Self { handle })
        }
    }

    impl TagReader for ReaderSession {
        fn start_inventory(&self, burst_count: u8, param: u32) -> Result<(), ReaderError> {
            let status = unsafe { ffi::InventoryContinue(self.handle, burst_count, param) };
            if status != STATUS_OK {
                return Err(ReaderError { code: status });
            }
            Ok(())
        }

        fn stop_inventory(&self, timeout_ms: u16) {
            let status = unsafe { ffi::InventoryStop(self.handle, timeout_ms) };
            if status != STATUS_OK {
                log_debug(&format!("InventoryStop returned {status:#04x} (ignored)"));
            }
        }

        fn poll_tag(&self, timeout_ms: u16) -> Result<Option<TagRead>, ReaderError> {
            let mut info = ffi::TagInfo {
                len: 0,
                code: [0u8; MAX_EPC_BYTES],
            };
            let status = unsafe { ffi::GetTagUii(self.handle, &mut info, timeout_ms) };
            match status {
                STATUS_OK => {
                    if info.len <= 0 {
                        return Ok(None);
                    }
                    let len = (info.len as usize).min(MAX_EPC_BYTES);
                    Ok(Some(TagRead {
                        bytes: info.code[..len].to_vec(),
                    }))
                }
                STATUS_NO_TAG => Ok(None),
                code => Err(ReaderError { code }),
            }
        }
    }

    impl Drop for ReaderSession {
        fn drop(&mut self) {
            // Terminal cleanup; a failed close changes nothing for us.
            unsafe {
                let _ = ffi::CloseDevice(self.handle);
            }
            log_debug("Reader connection closed");
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use super::{OpenError, ReaderError, TagRead, TagReader};

    /// Stub for targets without the vendor HID runtime. Reports no devices,
    /// so the bridge exits with the "no device" code before any command is
    /// accepted.
    pub struct ReaderSession;

    pub fn usb_device_count() -> i32 {
        0
    }

    impl ReaderSession {
        pub fn open(_index: u16) -> Result<Self, OpenError> {
            Err(OpenError::NoDevice)
        }
    }

    impl TagReader for ReaderSession {
        fn start_inventory(&self, _burst_count: u8, _param: u32) -> Result<(), ReaderError> {
            Err(ReaderError { code: -1 })
        }

        fn stop_inventory(&self, _timeout_ms: u16) {}

        fn poll_tag(&self, _timeout_ms: u16) -> Result<Option<TagRead>, ReaderError> {
            Err(ReaderError { code: -1 })
        }
    }
}

pub use platform::{usb_device_count, ReaderSession};
