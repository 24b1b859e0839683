//! Host command framing
//!
//! Three protocol generations exist in the field. The oldest puts a bare
//! command byte in front of the payload, the second wraps the payload in
//! a small argument header with an additive checksum, and the third is a
//! packet protocol with 16-bit command numbers and a whole-frame zero-sum
//! checksum. One codec handles all three; which framing to speak is a
//! value, not a compile-time choice, so a single probe routine can walk
//! the generations from newest to oldest.

use alloc::vec::Vec;

use maybe_async::maybe_async;
use zerocopy::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::commands::{EcStatus, HelloParams, HelloResponse, CMD_HELLO, HELLO_DELTA, HELLO_MAGIC};
use crate::error::{EcError, Result};
use crate::transport::EcTransport;

/// Protocol generation spoken on a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcProtocolVersion {
    /// Bare command byte, status byte, no checksum.
    V0Legacy,
    /// Argument header with an additive byte checksum.
    V1Args,
    /// Packet headers with 16-bit commands and zero-sum checksum.
    V3Packet,
}

impl EcProtocolVersion {
    pub fn name(&self) -> &'static str {
        match self {
            Self::V0Legacy => "legacy",
            Self::V1Args => "args",
            Self::V3Packet => "packet",
        }
    }

    /// Largest request or response payload this generation can carry on
    /// a bus with `max_frame`-byte frames.
    pub fn max_param_len(&self, max_frame: usize) -> usize {
        match self {
            Self::V0Legacy => PROTO2_MAX_PARAM_SIZE.min(max_frame.saturating_sub(1)),
            Self::V1Args => {
                PROTO2_MAX_PARAM_SIZE.min(max_frame.saturating_sub(ARGS_HEADER_LEN))
            }
            Self::V3Packet => max_frame.saturating_sub(PACKET_HEADER_LEN),
        }
    }
}

/// Fixed parameter block size of the pre-packet generations
pub const PROTO2_MAX_PARAM_SIZE: usize = 0xfc;

const ARGS_HEADER_LEN: usize = 5;
const PACKET_HEADER_LEN: usize = 8;

/// Argument-header flag: frame travels host to EC.
const ARGS_FLAG_FROM_HOST: u8 = 0x01;
/// Argument-header flag: frame travels EC to host.
const ARGS_FLAG_TO_HOST: u8 = 0x02;

const PACKET_VERSION: u8 = 3;

/// Packet-generation request header
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct HostRequestHeader {
    pub struct_version: u8,
    pub checksum: u8,
    pub command: U16,
    pub command_version: u8,
    pub reserved: u8,
    pub data_len: U16,
}

/// Packet-generation response header
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct HostResponseHeader {
    pub struct_version: u8,
    pub checksum: u8,
    pub result: U16,
    pub data_len: U16,
    pub reserved: U16,
}

fn byte_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Frame a request for the wire.
pub fn encode_request(
    version: EcProtocolVersion,
    command: u16,
    command_version: u8,
    data: &[u8],
    max_frame: usize,
) -> Result<Vec<u8>> {
    if data.len() > version.max_param_len(max_frame) {
        return Err(EcError::FrameTooLong);
    }
    match version {
        EcProtocolVersion::V0Legacy => {
            let command = u8::try_from(command).map_err(|_| EcError::FrameTooLong)?;
            if command_version != 0 {
                // The legacy framing has nowhere to carry a version.
                return Err(EcError::FrameTooLong);
            }
            let mut frame = Vec::with_capacity(1 + data.len());
            frame.push(command);
            frame.extend_from_slice(data);
            Ok(frame)
        }
        EcProtocolVersion::V1Args => {
            let command = u8::try_from(command).map_err(|_| EcError::FrameTooLong)?;
            let data_size = data.len() as u8;
            let csum = command
                .wrapping_add(ARGS_FLAG_FROM_HOST)
                .wrapping_add(command_version)
                .wrapping_add(data_size)
                .wrapping_add(byte_sum(data));
            let mut frame = Vec::with_capacity(ARGS_HEADER_LEN + data.len());
            frame.push(command);
            frame.push(ARGS_FLAG_FROM_HOST);
            frame.push(command_version);
            frame.push(data_size);
            frame.push(csum);
            frame.extend_from_slice(data);
            Ok(frame)
        }
        EcProtocolVersion::V3Packet => {
            let mut header = HostRequestHeader {
                struct_version: PACKET_VERSION,
                checksum: 0,
                command: U16::new(command),
                command_version,
                reserved: 0,
                data_len: U16::new(data.len() as u16),
            };
            let partial = byte_sum(header.as_bytes()).wrapping_add(byte_sum(data));
            header.checksum = partial.wrapping_neg();
            let mut frame = Vec::with_capacity(PACKET_HEADER_LEN + data.len());
            frame.extend_from_slice(header.as_bytes());
            frame.extend_from_slice(data);
            Ok(frame)
        }
    }
}

/// Unframe a response and surface the EC's status as an error.
pub fn decode_response(
    version: EcProtocolVersion,
    command: u16,
    frame: &[u8],
) -> Result<&[u8]> {
    match version {
        EcProtocolVersion::V0Legacy => {
            let (result, data) = frame.split_first().ok_or(EcError::MalformedResponse)?;
            check_status(u16::from(*result))?;
            Ok(data)
        }
        EcProtocolVersion::V1Args => {
            if frame.len() < ARGS_HEADER_LEN {
                return Err(EcError::MalformedResponse);
            }
            let (result, flags, command_version, data_size, csum) =
                (frame[0], frame[1], frame[2], frame[3], frame[4]);
            if flags & ARGS_FLAG_TO_HOST == 0 {
                return Err(EcError::ProtocolMismatch);
            }
            let data = &frame[ARGS_HEADER_LEN..];
            if usize::from(data_size) != data.len() {
                return Err(EcError::MalformedResponse);
            }
            let command = u8::try_from(command).map_err(|_| EcError::MalformedResponse)?;
            let expected = command
                .wrapping_add(flags)
                .wrapping_add(command_version)
                .wrapping_add(data_size)
                .wrapping_add(byte_sum(data));
            if csum != expected {
                return Err(EcError::InvalidChecksum);
            }
            check_status(u16::from(result))?;
            Ok(data)
        }
        EcProtocolVersion::V3Packet => {
            if frame.len() < PACKET_HEADER_LEN {
                return Err(EcError::MalformedResponse);
            }
            let header = HostResponseHeader::read_from_bytes(&frame[..PACKET_HEADER_LEN])
                .map_err(|_| EcError::MalformedResponse)?;
            if header.struct_version != PACKET_VERSION {
                return Err(EcError::ProtocolMismatch);
            }
            let data = &frame[PACKET_HEADER_LEN..];
            if usize::from(header.data_len.get()) != data.len() {
                return Err(EcError::MalformedResponse);
            }
            if byte_sum(frame) != 0 {
                return Err(EcError::InvalidChecksum);
            }
            check_status(header.result.get())?;
            Ok(data)
        }
    }
}

fn check_status(raw: u16) -> Result<()> {
    let status = EcStatus::from_raw(raw).ok_or(EcError::MalformedResponse)?;
    if status == EcStatus::Success {
        Ok(())
    } else {
        Err(EcError::Status(status))
    }
}

/// Unframe a request. Counterpart of [`encode_request`] for code that
/// plays the EC side of the wire.
pub fn decode_request(
    version: EcProtocolVersion,
    frame: &[u8],
) -> Result<(u16, u8, &[u8])> {
    match version {
        EcProtocolVersion::V0Legacy => {
            let (command, data) = frame.split_first().ok_or(EcError::MalformedResponse)?;
            Ok((u16::from(*command), 0, data))
        }
        EcProtocolVersion::V1Args => {
            if frame.len() < ARGS_HEADER_LEN {
                return Err(EcError::MalformedResponse);
            }
            let (command, flags, command_version, data_size, csum) =
                (frame[0], frame[1], frame[2], frame[3], frame[4]);
            if flags & ARGS_FLAG_FROM_HOST == 0 {
                return Err(EcError::ProtocolMismatch);
            }
            let data = &frame[ARGS_HEADER_LEN..];
            if usize::from(data_size) != data.len() {
                return Err(EcError::MalformedResponse);
            }
            let expected = command
                .wrapping_add(flags)
                .wrapping_add(command_version)
                .wrapping_add(data_size)
                .wrapping_add(byte_sum(data));
            if csum != expected {
                return Err(EcError::InvalidChecksum);
            }
            Ok((u16::from(command), command_version, data))
        }
        EcProtocolVersion::V3Packet => {
            if frame.len() < PACKET_HEADER_LEN {
                return Err(EcError::MalformedResponse);
            }
            let header = HostRequestHeader::read_from_bytes(&frame[..PACKET_HEADER_LEN])
                .map_err(|_| EcError::MalformedResponse)?;
            if header.struct_version != PACKET_VERSION {
                return Err(EcError::ProtocolMismatch);
            }
            let data = &frame[PACKET_HEADER_LEN..];
            if usize::from(header.data_len.get()) != data.len() {
                return Err(EcError::MalformedResponse);
            }
            if byte_sum(frame) != 0 {
                return Err(EcError::InvalidChecksum);
            }
            Ok((header.command.get(), header.command_version, data))
        }
    }
}

/// Frame a response. Counterpart of [`decode_response`].
pub fn encode_response(
    version: EcProtocolVersion,
    command: u16,
    status: EcStatus,
    data: &[u8],
) -> Vec<u8> {
    match version {
        EcProtocolVersion::V0Legacy => {
            let mut frame = Vec::with_capacity(1 + data.len());
            frame.push(status as u16 as u8);
            frame.extend_from_slice(data);
            frame
        }
        EcProtocolVersion::V1Args => {
            let result = status as u16 as u8;
            let data_size = data.len() as u8;
            let csum = (command as u8)
                .wrapping_add(ARGS_FLAG_TO_HOST)
                .wrapping_add(0)
                .wrapping_add(data_size)
                .wrapping_add(byte_sum(data));
            let mut frame = Vec::with_capacity(ARGS_HEADER_LEN + data.len());
            frame.push(result);
            frame.push(ARGS_FLAG_TO_HOST);
            frame.push(0);
            frame.push(data_size);
            frame.push(csum);
            frame.extend_from_slice(data);
            frame
        }
        EcProtocolVersion::V3Packet => {
            let mut header = HostResponseHeader {
                struct_version: PACKET_VERSION,
                checksum: 0,
                result: U16::new(status as u16),
                data_len: U16::new(data.len() as u16),
                reserved: U16::new(0),
            };
            let partial = byte_sum(header.as_bytes()).wrapping_add(byte_sum(data));
            header.checksum = partial.wrapping_neg();
            let mut frame = Vec::with_capacity(PACKET_HEADER_LEN + data.len());
            frame.extend_from_slice(header.as_bytes());
            frame.extend_from_slice(data);
            frame
        }
    }
}

/// Probe which protocol generation the EC on `transport` speaks.
///
/// Walks the generations newest to oldest, sending a hello through each
/// framing and accepting the first one that answers with the expected
/// arithmetic. An EC that speaks a newer generation ignores or rejects
/// older framings, so the first hit is the best the EC supports.
#[maybe_async]
pub async fn detect<T: EcTransport>(transport: &mut T) -> Result<EcProtocolVersion> {
    for version in [
        EcProtocolVersion::V3Packet,
        EcProtocolVersion::V1Args,
        EcProtocolVersion::V0Legacy,
    ] {
        if let Ok(true) = probe_hello(transport, version).await {
            log::debug!("EC speaks the {} host command protocol", version.name());
            return Ok(version);
        }
    }
    Err(EcError::NotDetected)
}

#[maybe_async]
async fn probe_hello<T: EcTransport>(
    transport: &mut T,
    version: EcProtocolVersion,
) -> Result<bool> {
    let params = HelloParams {
        in_data: HELLO_MAGIC.into(),
    };
    let max_frame = transport.max_frame_len();
    let request = encode_request(version, CMD_HELLO, 0, params.as_bytes(), max_frame)?;
    let mut buf = alloc::vec![0u8; max_frame];
    let len = transport.exchange(&request, &mut buf).await?;
    let data = decode_response(version, CMD_HELLO, &buf[..len])?;
    let response =
        HelloResponse::read_from_bytes(data).map_err(|_| EcError::MalformedResponse)?;
    Ok(response.out_data.get() == HELLO_MAGIC.wrapping_add(HELLO_DELTA))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_round_trip() {
        let frame =
            encode_request(EcProtocolVersion::V0Legacy, 0x11, 0, &[1, 2, 3], 0x100).unwrap();
        assert_eq!(frame, [0x11, 1, 2, 3]);
        let (cmd, ver, data) = decode_request(EcProtocolVersion::V0Legacy, &frame).unwrap();
        assert_eq!((cmd, ver, data), (0x11, 0, &[1u8, 2, 3][..]));

        let resp = encode_response(EcProtocolVersion::V0Legacy, 0x11, EcStatus::Success, &[9]);
        assert_eq!(
            decode_response(EcProtocolVersion::V0Legacy, 0x11, &resp).unwrap(),
            &[9]
        );
    }

    #[test]
    fn args_checksum_covers_header_and_data() {
        let frame =
            encode_request(EcProtocolVersion::V1Args, 0x12, 1, &[0x10, 0x20], 0x100).unwrap();
        // cmd + FROM_HOST + version + size + data bytes
        let expect = 0x12u8
            .wrapping_add(0x01)
            .wrapping_add(1)
            .wrapping_add(2)
            .wrapping_add(0x30);
        assert_eq!(frame[4], expect);
        let (cmd, ver, data) = decode_request(EcProtocolVersion::V1Args, &frame).unwrap();
        assert_eq!((cmd, ver, data), (0x12, 1, &[0x10u8, 0x20][..]));
    }

    #[test]
    fn args_rejects_corrupt_checksum() {
        let mut resp = encode_response(EcProtocolVersion::V1Args, 0x10, EcStatus::Success, &[7]);
        resp[5] ^= 0xff;
        assert_eq!(
            decode_response(EcProtocolVersion::V1Args, 0x10, &resp),
            Err(EcError::InvalidChecksum)
        );
    }

    #[test]
    fn args_requires_direction_flag() {
        let mut resp = encode_response(EcProtocolVersion::V1Args, 0x10, EcStatus::Success, &[]);
        resp[1] = 0;
        assert_eq!(
            decode_response(EcProtocolVersion::V1Args, 0x10, &resp),
            Err(EcError::ProtocolMismatch)
        );
    }

    #[test]
    fn packet_frames_sum_to_zero() {
        let frame =
            encode_request(EcProtocolVersion::V3Packet, 0x4011, 2, &[1, 2, 3, 4], 0x100).unwrap();
        assert_eq!(byte_sum(&frame), 0);
        let (cmd, ver, data) = decode_request(EcProtocolVersion::V3Packet, &frame).unwrap();
        assert_eq!((cmd, ver, data), (0x4011, 2, &[1u8, 2, 3, 4][..]));

        let resp = encode_response(EcProtocolVersion::V3Packet, 0x4011, EcStatus::Success, &[5]);
        assert_eq!(byte_sum(&resp), 0);
        assert_eq!(
            decode_response(EcProtocolVersion::V3Packet, 0x4011, &resp).unwrap(),
            &[5]
        );
    }

    #[test]
    fn packet_rejects_flipped_bit() {
        let mut resp = encode_response(EcProtocolVersion::V3Packet, 0x02, EcStatus::Success, &[5]);
        let last = resp.len() - 1;
        resp[last] ^= 0x40;
        assert_eq!(
            decode_response(EcProtocolVersion::V3Packet, 0x02, &resp),
            Err(EcError::InvalidChecksum)
        );
    }

    #[test]
    fn status_surfaces_as_error() {
        let resp =
            encode_response(EcProtocolVersion::V1Args, 0x13, EcStatus::AccessDenied, &[]);
        assert_eq!(
            decode_response(EcProtocolVersion::V1Args, 0x13, &resp),
            Err(EcError::Status(EcStatus::AccessDenied))
        );
    }

    #[test]
    fn wide_commands_need_the_packet_framing() {
        assert_eq!(
            encode_request(EcProtocolVersion::V1Args, 0x4011, 0, &[], 0x100),
            Err(EcError::FrameTooLong)
        );
        assert!(encode_request(EcProtocolVersion::V3Packet, 0x4011, 0, &[], 0x100).is_ok());
    }

    #[test]
    fn param_budgets() {
        assert_eq!(EcProtocolVersion::V0Legacy.max_param_len(0x100), 0xfc);
        assert_eq!(EcProtocolVersion::V1Args.max_param_len(0x100), 0xfc);
        assert_eq!(EcProtocolVersion::V3Packet.max_param_len(0x100), 0xf8);
        assert_eq!(EcProtocolVersion::V1Args.max_param_len(0x40), 0x3b);
    }
}
