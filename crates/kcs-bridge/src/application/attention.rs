//! Administrative attention control.
//!
//! Three one-shot device-control operations the BMC side can trigger through
//! the SMS interface.  None of them touches the outstanding-call slot: they go
//! straight to the device and report success or the device error.

use std::fmt;

use tracing::{info, warn};

use super::bridge_service::DeviceError;

/// Device-level control requests.
///
/// Implemented by the KCS character device; tests use recording doubles.
pub trait AttentionControl: Send + Sync {
    /// Raises the SMS attention bit so the host knows a message is waiting.
    fn set_attention(&self) -> Result<(), DeviceError>;

    /// Clears the SMS attention bit.
    fn clear_attention(&self) -> Result<(), DeviceError>;

    /// Forces the KCS state machine back to idle, aborting any transfer.
    fn force_abort(&self) -> Result<(), DeviceError>;
}

/// One of the three administrative operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionCommand {
    SetAttention,
    ClearAttention,
    ForceAbort,
}

impl fmt::Display for AttentionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttentionCommand::SetAttention => "setAttention",
            AttentionCommand::ClearAttention => "clearAttention",
            AttentionCommand::ForceAbort => "forceAbort",
        };
        f.write_str(name)
    }
}

/// Issues `command` against `control`, logging the outcome.
///
/// # Errors
///
/// Propagates the device-control failure unchanged.
pub fn apply_attention<C>(control: &C, command: AttentionCommand) -> Result<(), DeviceError>
where
    C: AttentionControl + ?Sized,
{
    let result = match command {
        AttentionCommand::SetAttention => control.set_attention(),
        AttentionCommand::ClearAttention => control.clear_attention(),
        AttentionCommand::ForceAbort => control.force_abort(),
    };

    match &result {
        Ok(()) => info!("{command}: done"),
        Err(e) => warn!("{command}: failed: {e}"),
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    /// Records every call; optionally fails all of them.
    #[derive(Default)]
    struct RecordingControl {
        calls: Mutex<Vec<AttentionCommand>>,
        fail: bool,
    }

    impl RecordingControl {
        fn record(&self, command: AttentionCommand) -> Result<(), DeviceError> {
            self.calls.lock().unwrap().push(command);
            if self.fail {
                return Err(DeviceError::Control {
                    op: "test",
                    source: io::Error::from(nix::errno::Errno::ENOTTY),
                });
            }
            Ok(())
        }
    }

    impl AttentionControl for RecordingControl {
        fn set_attention(&self) -> Result<(), DeviceError> {
            self.record(AttentionCommand::SetAttention)
        }
        fn clear_attention(&self) -> Result<(), DeviceError> {
            self.record(AttentionCommand::ClearAttention)
        }
        fn force_abort(&self) -> Result<(), DeviceError> {
            self.record(AttentionCommand::ForceAbort)
        }
    }

    #[test]
    fn test_each_command_reaches_matching_operation() {
        // Arrange
        let control = RecordingControl::default();

        // Act
        apply_attention(&control, AttentionCommand::SetAttention).unwrap();
        apply_attention(&control, AttentionCommand::ClearAttention).unwrap();
        apply_attention(&control, AttentionCommand::ForceAbort).unwrap();

        // Assert
        assert_eq!(
            *control.calls.lock().unwrap(),
            vec![
                AttentionCommand::SetAttention,
                AttentionCommand::ClearAttention,
                AttentionCommand::ForceAbort,
            ]
        );
    }

    #[test]
    fn test_device_failure_is_propagated() {
        let control = RecordingControl {
            fail: true,
            ..Default::default()
        };

        let result = apply_attention(&control, AttentionCommand::ForceAbort);

        assert!(matches!(result, Err(DeviceError::Control { .. })));
    }

    #[test]
    fn test_works_through_trait_object() {
        let control: Box<dyn AttentionControl> = Box::new(RecordingControl::default());

        assert!(apply_attention(control.as_ref(), AttentionCommand::SetAttention).is_ok());
    }

    #[test]
    fn test_command_display_uses_dbus_method_names() {
        assert_eq!(AttentionCommand::SetAttention.to_string(), "setAttention");
        assert_eq!(AttentionCommand::ClearAttention.to_string(), "clearAttention");
        assert_eq!(AttentionCommand::ForceAbort.to_string(), "forceAbort");
    }
}
