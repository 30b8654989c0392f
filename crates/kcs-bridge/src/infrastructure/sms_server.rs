//! D-Bus object exposing SMS attention control for one KCS channel.
//!
//! Served at the channel's object path (e.g.
//! `/xyz/openbmc_project/Ipmi/Channel/ipmi_kcs3`) under the interface
//! `xyz.openbmc_project.Ipmi.Channel.SMS`.  Each method is a straight
//! pass-through to one device ioctl.
//!
//! ```text
//! busctl call xyz.openbmc_project.Ipmi.Channel.ipmi_kcs3 \
//!     /xyz/openbmc_project/Ipmi/Channel/ipmi_kcs3 \
//!     xyz.openbmc_project.Ipmi.Channel.SMS setAttention
//! ```

use std::sync::Arc;

use crate::application::{apply_attention, AttentionCommand, AttentionControl};

/// Errors returned to D-Bus callers.
#[derive(Debug, zbus::DBusError)]
#[zbus(prefix = "xyz.openbmc_project.Common.Error")]
pub enum CommonError {
    #[zbus(error)]
    ZBus(zbus::Error),
    /// The device rejected the control request.
    InternalFailure(String),
}

/// Implementation of the `SMS` interface.
pub struct SmsHandler {
    control: Arc<dyn AttentionControl>,
}

impl SmsHandler {
    pub fn new(control: Arc<dyn AttentionControl>) -> Self {
        Self { control }
    }

    fn run(&self, command: AttentionCommand) -> Result<(), CommonError> {
        apply_attention(self.control.as_ref(), command)
            .map_err(|e| CommonError::InternalFailure(e.to_string()))
    }
}

#[zbus::interface(name = "xyz.openbmc_project.Ipmi.Channel.SMS")]
impl SmsHandler {
    #[zbus(name = "setAttention")]
    fn set_attention(&self) -> Result<(), CommonError> {
        self.run(AttentionCommand::SetAttention)
    }

    #[zbus(name = "clearAttention")]
    fn clear_attention(&self) -> Result<(), CommonError> {
        self.run(AttentionCommand::ClearAttention)
    }

    #[zbus(name = "forceAbort")]
    fn force_abort(&self) -> Result<(), CommonError> {
        self.run(AttentionCommand::ForceAbort)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
