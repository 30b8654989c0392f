//! Encoding and decoding of KCS frames.
//!
//! Wire format:
//! ```text
//! request:  [netfn<<2 | lun][cmd][payload:N]
//! response: [(netfn|1)<<2 | lun][cmd][cc][payload:N]
//! ```
//! A response frame may not exceed [`MAX_FRAME_SIZE`] bytes.

use thiserror::Error;

use crate::protocol::messages::{
    Request, Response, LUN_MAX, MAX_FRAME_SIZE, NETFN_MAX, REQUEST_HEADER_SIZE,
    RESPONSE_HEADER_SIZE,
};

/// Errors that can occur while decoding an inbound frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than a request header were read.
    #[error("frame too short: need at least {needed} bytes, got {available}")]
    TooShort { needed: usize, available: usize },
}

/// Errors that can occur while encoding an outbound frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Header plus payload does not fit the transfer buffer.
    #[error("frame too large: {size} > {capacity}")]
    FrameTooLarge { size: usize, capacity: usize },

    /// A header field does not fit its bit width.
    #[error("{field} out of range: 0x{value:02x} > 0x{max:02x}")]
    HeaderOutOfRange {
        field: &'static str,
        value: u8,
        max: u8,
    },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes a host-written KCS frame into a [`Request`].
///
/// # Errors
///
/// Returns [`DecodeError::TooShort`] if `bytes` holds fewer than two bytes.
///
/// # Examples
///
/// ```rust
/// use kcs_core::decode_request;
///
/// let request = decode_request(&[0x18, 0x01, 0xAA, 0xBB]).unwrap();
/// assert_eq!((request.netfn, request.lun, request.cmd), (6, 0, 1));
/// assert_eq!(request.payload, vec![0xAA, 0xBB]);
/// ```
pub fn decode_request(bytes: &[u8]) -> Result<Request, DecodeError> {
    if bytes.len() < REQUEST_HEADER_SIZE {
        return Err(DecodeError::TooShort {
            needed: REQUEST_HEADER_SIZE,
            available: bytes.len(),
        });
    }

    Ok(Request {
        netfn: bytes[0] >> 2,
        lun: bytes[0] & LUN_MAX,
        cmd: bytes[1],
        payload: bytes[REQUEST_HEADER_SIZE..].to_vec(),
    })
}

/// Encodes a [`Response`] into a KCS response frame.
///
/// The netfn written on the wire always has its low bit set, which turns a
/// request netfn into the matching response netfn.
///
/// # Errors
///
/// - [`EncodeError::HeaderOutOfRange`] if `netfn > 0x3F` or `lun > 3`.
/// - [`EncodeError::FrameTooLarge`] if `3 + payload.len()` exceeds
///   [`MAX_FRAME_SIZE`].  The payload is never truncated.
///
/// # Examples
///
/// ```rust
/// use kcs_core::{encode_response, CompletionCode, Response};
///
/// let response = Response {
///     netfn: 6,
///     lun: 0,
///     cmd: 1,
///     completion_code: CompletionCode::SUCCESS,
///     payload: vec![0x01],
/// };
/// assert_eq!(encode_response(&response).unwrap(), vec![0x1C, 0x01, 0x00, 0x01]);
/// ```
pub fn encode_response(response: &Response) -> Result<Vec<u8>, EncodeError> {
    check_header(response.netfn, response.lun)?;

    let size = RESPONSE_HEADER_SIZE + response.payload.len();
    if size > MAX_FRAME_SIZE {
        return Err(EncodeError::FrameTooLarge {
            size,
            capacity: MAX_FRAME_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(size);
    buf.push(response_header_byte(response.netfn, response.lun));
    buf.push(response.cmd);
    buf.push(response.completion_code.0);
    buf.extend_from_slice(&response.payload);
    Ok(buf)
}

/// Encodes the synthetic failure frame for `request`.
///
/// Always succeeds: the frame is three bytes long and the header fields are
/// masked to their bit widths, so no input can make it unencodable.
pub fn encode_failure(request: &Request) -> Vec<u8> {
    let response = Response::failure(request);
    vec![
        response_header_byte(response.netfn & NETFN_MAX, response.lun & LUN_MAX),
        response.cmd,
        response.completion_code.0,
    ]
}

/// Encodes a [`Request`] into the frame a host would write.
///
/// The bridge never writes requests itself; this is the inverse of
/// [`decode_request`] for host-side tooling and tests.
///
/// # Errors
///
/// - [`EncodeError::HeaderOutOfRange`] if `netfn > 0x3F` or `lun > 3`.
/// - [`EncodeError::FrameTooLarge`] if `2 + payload.len()` exceeds
///   [`MAX_FRAME_SIZE`].
pub fn encode_request(request: &Request) -> Result<Vec<u8>, EncodeError> {
    check_header(request.netfn, request.lun)?;

    let size = REQUEST_HEADER_SIZE + request.payload.len();
    if size > MAX_FRAME_SIZE {
        return Err(EncodeError::FrameTooLarge {
            size,
            capacity: MAX_FRAME_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(size);
    buf.push((request.netfn << 2) | request.lun);
    buf.push(request.cmd);
    buf.extend_from_slice(&request.payload);
    Ok(buf)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn check_header(netfn: u8, lun: u8) -> Result<(), EncodeError> {
    if netfn > NETFN_MAX {
        return Err(EncodeError::HeaderOutOfRange {
            field: "netfn",
            value: netfn,
            max: NETFN_MAX,
        });
    }
    if lun > LUN_MAX {
        return Err(EncodeError::HeaderOutOfRange {
            field: "lun",
            value: lun,
            max: LUN_MAX,
        });
    }
    Ok(())
}

/// Packs `netfn` (forced odd) and `lun` into the first response byte.
///
/// Callers must have range-checked or masked both fields.
fn response_header_byte(netfn: u8, lun: u8) -> u8 {
    ((netfn | 1) << 2) | lun
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::CompletionCode;

    fn make_response(netfn: u8, lun: u8, payload_len: usize) -> Response {
        Response {
            netfn,
            lun,
            cmd: 0x01,
            completion_code: CompletionCode::SUCCESS,
            payload: vec![0x5A; payload_len],
        }
    }

    // ── decode_request ────────────────────────────────────────────────────────

    #[test]
    fn test_decode_get_device_id_request() {
        // Arrange: netfn=6 (App), lun=0, cmd=1, two payload bytes
        let bytes = [0x18, 0x01, 0xAA, 0xBB];

        // Act
        let request = decode_request(&bytes).unwrap();

        // Assert
        assert_eq!(
            request,
            Request {
                netfn: 6,
                lun: 0,
                cmd: 1,
                payload: vec![0xAA, 0xBB],
            }
        );
    }

    #[test]
    fn test_decode_extracts_lun_from_low_bits() {
        let request = decode_request(&[0x1B, 0x22]).unwrap();
        assert_eq!(request.netfn, 6);
        assert_eq!(request.lun, 3);
        assert_eq!(request.cmd, 0x22);
    }

    #[test]
    fn test_decode_header_only_yields_empty_payload() {
        let request = decode_request(&[0x28, 0x40]).unwrap();
        assert!(request.payload.is_empty());
    }

    #[test]
    fn test_decode_empty_buffer_is_too_short() {
        assert_eq!(
            decode_request(&[]),
            Err(DecodeError::TooShort {
                needed: 2,
                available: 0
            })
        );
    }

    #[test]
    fn test_decode_single_byte_is_too_short() {
        assert_eq!(
            decode_request(&[0x18]),
            Err(DecodeError::TooShort {
                needed: 2,
                available: 1
            })
        );
    }

    // ── encode_response ───────────────────────────────────────────────────────

    #[test]
    fn test_encode_get_device_id_response() {
        // Arrange
        let response = Response {
            netfn: 6,
            lun: 0,
            cmd: 1,
            completion_code: CompletionCode::SUCCESS,
            payload: vec![0x01],
        };

        // Act
        let bytes = encode_response(&response).unwrap();

        // Assert: netfn 6 becomes 7 on the wire → 0x1C
        assert_eq!(bytes, vec![0x1C, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_encode_response_keeps_already_odd_netfn() {
        let bytes = encode_response(&make_response(7, 0, 0)).unwrap();
        assert_eq!(bytes[0] >> 2, 7);
    }

    #[test]
    fn test_encode_response_packs_lun() {
        let bytes = encode_response(&make_response(0x0A, 2, 0)).unwrap();
        assert_eq!(bytes[0], (0x0B << 2) | 2);
    }

    #[test]
    fn test_encode_response_at_capacity_succeeds() {
        // 3 header bytes + 1021 payload bytes = exactly 1024
        let bytes = encode_response(&make_response(6, 0, MAX_FRAME_SIZE - 3)).unwrap();
        assert_eq!(bytes.len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn test_encode_response_over_capacity_is_rejected() {
        let result = encode_response(&make_response(6, 0, MAX_FRAME_SIZE - 2));
        assert_eq!(
            result,
            Err(EncodeError::FrameTooLarge {
                size: MAX_FRAME_SIZE + 1,
                capacity: MAX_FRAME_SIZE
            })
        );
    }

    #[test]
    fn test_encode_response_rejects_wide_netfn() {
        let result = encode_response(&make_response(0x40, 0, 0));
        assert!(matches!(
            result,
            Err(EncodeError::HeaderOutOfRange { field: "netfn", .. })
        ));
    }

    #[test]
    fn test_encode_response_rejects_wide_lun() {
        let result = encode_response(&make_response(6, 4, 0));
        assert!(matches!(
            result,
            Err(EncodeError::HeaderOutOfRange { field: "lun", .. })
        ));
    }

    // ── encode_failure ────────────────────────────────────────────────────────

    #[test]
    fn test_encode_failure_uses_request_header_and_unspecified_code() {
        // Arrange
        let request = Request {
            netfn: 0x2C,
            lun: 1,
            cmd: 0x3E,
            payload: vec![0x01, 0x02],
        };

        // Act
        let bytes = encode_failure(&request);

        // Assert: three bytes only, payload dropped
        assert_eq!(bytes, vec![(0x2D << 2) | 1, 0x3E, 0xFF]);
    }

    #[test]
    fn test_encode_failure_masks_out_of_range_fields() {
        let request = Request {
            netfn: 0xFF,
            lun: 0xFF,
            cmd: 0x00,
            payload: Vec::new(),
        };
        let bytes = encode_failure(&request);
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(bytes.len(), 3);
    }

    // ── encode_request ────────────────────────────────────────────────────────

    #[test]
    fn test_encode_request_is_inverse_of_decode() {
        let bytes = [0x18, 0x01, 0xAA, 0xBB];
        let request = decode_request(&bytes).unwrap();
        assert_eq!(encode_request(&request).unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_encode_request_over_capacity_is_rejected() {
        let request = Request {
            netfn: 6,
            lun: 0,
            cmd: 1,
            payload: vec![0; MAX_FRAME_SIZE - 1],
        };
        assert!(matches!(
            encode_request(&request),
            Err(EncodeError::FrameTooLarge { .. })
        ));
    }
}
