//! The KCS character device.
//!
//! The kernel's `ipmi_bmc` KCS drivers expose each channel as a character
//! device (`/dev/ipmi-kcs*`).  One `read` returns one whole host request; one
//! `write` hands one whole response back to the host.  Three argument-less
//! ioctls drive the SMS attention bit and abort a transfer in progress.
//!
//! The device is opened non-blocking and registered with the Tokio reactor
//! through [`AsyncFd`], so waiting for the next request never blocks the
//! loop.  Readiness is edge-like: after an empty read or a read error the
//! device waits for fresh readiness before reading again, and once the other
//! end has hung up it stops producing frames altogether.  Writes are issued
//! directly: the driver either takes the whole frame or fails.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use kcs_core::MAX_FRAME_SIZE;
use nix::fcntl::OFlag;
use tokio::io::unix::{AsyncFd, AsyncFdReadyGuard};
use tracing::warn;

use crate::application::{AttentionControl, DeviceError, FrameSink};

/// `ipmi_bmc` ioctls from `linux/ipmi_bmc.h`.
mod ioctl {
    const IPMI_BMC_IOCTL_MAGIC: u8 = 0xB1;

    nix::ioctl_none!(set_sms_atn, IPMI_BMC_IOCTL_MAGIC, 0x00);
    nix::ioctl_none!(clear_sms_atn, IPMI_BMC_IOCTL_MAGIC, 0x01);
    nix::ioctl_none!(force_abort, IPMI_BMC_IOCTL_MAGIC, 0x02);
}

type IoctlFn = unsafe fn(RawFd) -> nix::Result<i32>;

/// A KCS channel device registered with the Tokio reactor.
#[derive(Debug)]
pub struct KcsDevice {
    fd: AsyncFd<File>,
    hung_up: AtomicBool,
}

impl KcsDevice {
    /// Opens `path` read-write and non-blocking.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Io`] if the device cannot be opened or
    /// registered with the reactor.
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)?;
        Ok(Self::from_file(file)?)
    }

    /// Wraps an already-open, non-blocking descriptor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_file(file: File) -> io::Result<Self> {
        Ok(Self {
            fd: AsyncFd::new(file)?,
            hung_up: AtomicBool::new(false),
        })
    }

    /// Waits for the next frame and returns its bytes.
    ///
    /// At most [`MAX_FRAME_SIZE`] bytes are returned; an empty vector means
    /// the read returned nothing.  After an empty read or a read error the
    /// next call waits for the device to signal readiness anew.  Once the
    /// other end has hung up, every later call stays pending.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Io`] for any read failure other than
    /// `WouldBlock`, which is handled by waiting for readiness again.
    pub async fn read_frame(&self) -> Result<Vec<u8>, DeviceError> {
        if self.hung_up.load(Ordering::Relaxed) {
            return std::future::pending().await;
        }
        let mut buf = [0u8; MAX_FRAME_SIZE];
        loop {
            let mut guard = self.fd.readable().await?;
            let result = guard.try_io(|fd| {
                let mut file: &File = fd.get_ref();
                file.read(&mut buf)
            });
            match result {
                Ok(Ok(0)) => {
                    self.settle(&mut guard);
                    return Ok(Vec::new());
                }
                Ok(Ok(len)) => return Ok(buf[..len].to_vec()),
                Ok(Err(e)) => {
                    self.settle(&mut guard);
                    return Err(e.into());
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Drops the readiness that produced an empty read or an error, and
    /// latches a hang-up, which the reactor keeps reporting as ready.
    fn settle(&self, guard: &mut AsyncFdReadyGuard<'_, File>) {
        if guard.ready().is_read_closed() && !self.hung_up.swap(true, Ordering::Relaxed) {
            warn!("KCS device hung up; no further requests will be read");
        }
        guard.clear_ready();
    }

    fn control(&self, op: &'static str, request: IoctlFn) -> Result<(), DeviceError> {
        // SAFETY: the descriptor stays open for as long as `self` lives, and
        // these ioctls take no argument pointer.
        unsafe { request(self.fd.as_raw_fd()) }
            .map(|_| ())
            .map_err(|errno| DeviceError::Control {
                op,
                source: io::Error::from(errno),
            })
    }
}

impl FrameSink for KcsDevice {
    fn write_frame(&self, frame: &[u8]) -> Result<(), DeviceError> {
        let mut file: &File = self.fd.get_ref();
        let written = file.write(frame)?;
        if written != frame.len() {
            return Err(DeviceError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }
        Ok(())
    }
}

impl AttentionControl for KcsDevice {
    fn set_attention(&self) -> Result<(), DeviceError> {
        self.control("setAttention", ioctl::set_sms_atn)
    }

    fn clear_attention(&self) -> Result<(), DeviceError> {
        self.control("clearAttention", ioctl::clear_sms_atn)
    }

    fn force_abort(&self) -> Result<(), DeviceError> {
        self.control("forceAbort", ioctl::force_abort)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
