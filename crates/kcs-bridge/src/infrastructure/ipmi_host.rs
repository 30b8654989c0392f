//! D-Bus client for the IPMI host service.
//!
//! Every decoded request is forwarded to
//! `xyz.openbmc_project.Ipmi.Server.execute` on the IPMI host daemon:
//!
//! ```text
//! execute(netfn: y, lun: y, cmd: y, data: ay, options: a{sv})
//!     -> (netfn: y, lun: y, cmd: y, cc: y, data: ay)
//! ```
//!
//! The options map is always empty.  The reply's header fields are passed
//! through as-is; the bridge decides whether to trust them.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use kcs_core::{CompletionCode, Request, Response};
use zbus::zvariant::OwnedValue;
use zbus::Connection;

use crate::application::{IpmiExecutor, UpstreamError};

/// Bus name of the IPMI host daemon.
pub const IPMI_HOST_SERVICE: &str = "xyz.openbmc_project.Ipmi.Host";

/// Object path of the IPMI host daemon's server object.
pub const IPMI_HOST_PATH: &str = "/xyz/openbmc_project/Ipmi";

/// Interface carrying the `execute` method.
pub const IPMI_SERVER_INTERFACE: &str = "xyz.openbmc_project.Ipmi.Server";

const EXECUTE_METHOD: &str = "execute";

/// Timeout used when none is configured; matches the bus default.
pub const DEFAULT_METHOD_TIMEOUT: Duration = Duration::from_secs(25);

type ExecuteArgs = (u8, u8, u8, Vec<u8>, HashMap<String, OwnedValue>);
type ExecuteReply = (u8, u8, u8, u8, Vec<u8>);

/// Calls `execute` on the IPMI host service over a shared bus connection.
#[derive(Debug, Clone)]
pub struct DbusIpmiExecutor {
    connection: Connection,
}

impl DbusIpmiExecutor {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    async fn call(&self, request: Request) -> Result<Response, UpstreamError> {
        let reply = self
            .connection
            .call_method(
                Some(IPMI_HOST_SERVICE),
                IPMI_HOST_PATH,
                Some(IPMI_SERVER_INTERFACE),
                EXECUTE_METHOD,
                &execute_args(request),
            )
            .await
            .map_err(transport_error)?;

        let body = reply.body();
        let fields: ExecuteReply = body.deserialize().map_err(transport_error)?;
        Ok(response_from_reply(fields))
    }
}

#[async_trait]
impl IpmiExecutor for DbusIpmiExecutor {
    async fn execute(
        &self,
        request: Request,
        timeout: Option<Duration>,
    ) -> Result<Response, UpstreamError> {
        tokio::time::timeout(effective_timeout(timeout), self.call(request))
            .await
            .map_err(|_elapsed| UpstreamError::Timeout)?
    }
}

fn execute_args(request: Request) -> ExecuteArgs {
    (
        request.netfn,
        request.lun,
        request.cmd,
        request.payload,
        HashMap::new(),
    )
}

fn response_from_reply((netfn, lun, cmd, cc, payload): ExecuteReply) -> Response {
    Response {
        netfn,
        lun,
        cmd,
        completion_code: CompletionCode::from(cc),
        payload,
    }
}

fn effective_timeout(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(t) if !t.is_zero() => t,
        _ => DEFAULT_METHOD_TIMEOUT,
    }
}

fn transport_error(e: zbus::Error) -> UpstreamError {
    UpstreamError::Transport(e.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use zbus::zvariant::Type;

    #[test]
    fn test_execute_args_carry_request_fields_and_empty_options() {
        // Arrange
        let request = Request {
            netfn: 6,
            lun: 1,
            cmd: 0x22,
            payload: vec![0xAA, 0xBB],
        };

        // Act
        let (netfn, lun, cmd, data, options) = execute_args(request);

        // Assert
        assert_eq!((netfn, lun, cmd), (6, 1, 0x22));
        assert_eq!(data, vec![0xAA, 0xBB]);
        assert!(options.is_empty());
    }

    #[test]
    fn test_execute_args_signature_matches_host_service() {
        assert_eq!(ExecuteArgs::SIGNATURE.to_string(), "(yyyaya{sv})");
    }

    #[test]
    fn test_reply_signature_matches_host_service() {
        assert_eq!(ExecuteReply::SIGNATURE.to_string(), "(yyyyay)");
    }

    #[test]
    fn test_reply_maps_to_response_verbatim() {
        let response = response_from_reply((7, 0, 1, 0xC9, vec![0x01, 0x02]));

        assert_eq!(
            response,
            Response {
                netfn: 7,
                lun: 0,
                cmd: 1,
                completion_code: CompletionCode(0xC9),
                payload: vec![0x01, 0x02],
            }
        );
    }

    #[test]
    fn test_unset_timeout_uses_bus_default() {
        assert_eq!(effective_timeout(None), Duration::from_secs(25));
    }

    #[test]
    fn test_zero_timeout_uses_bus_default() {
        assert_eq!(effective_timeout(Some(Duration::ZERO)), DEFAULT_METHOD_TIMEOUT);
    }

    #[test]
    fn test_configured_timeout_is_used() {
        assert_eq!(
            effective_timeout(Some(Duration::from_millis(750))),
            Duration::from_millis(750)
        );
    }

    #[test]
    fn test_bus_errors_become_transport_errors() {
        let err = transport_error(zbus::Error::Failure("host daemon gone".into()));

        assert!(matches!(err, UpstreamError::Transport(msg) if msg.contains("host daemon gone")));
    }
}
