//! Typed host command client
//!
//! [`EcClient`] owns a transport plus the protocol generation detected on
//! it and exposes one method per host command the flash tooling needs.
//! Responses with a fixed wire layout are decoded by reinterpretation
//! and must match their expected length exactly.

use alloc::vec;
use alloc::vec::Vec;

use maybe_async::maybe_async;
use zerocopy::{FromBytes, IntoBytes};

use crate::commands::*;
use crate::error::{EcError, Result};
use crate::proto::{self, EcProtocolVersion};
use crate::transport::EcTransport;

/// Host command client bound to one EC
pub struct EcClient<T> {
    transport: T,
    version: EcProtocolVersion,
    dev_index: u8,
}

#[maybe_async]
impl<T: EcTransport> EcClient<T> {
    /// Probe `transport` for an EC and bind to the protocol generation
    /// it answers on.
    pub async fn new(transport: T, dev_index: u8) -> Result<Self> {
        let mut transport = transport;
        let version = proto::detect(&mut transport).await?;
        Ok(Self {
            transport,
            version,
            dev_index,
        })
    }

    pub fn protocol_version(&self) -> EcProtocolVersion {
        self.version
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Largest payload one command can carry in either direction.
    pub fn max_param_len(&self) -> usize {
        self.version.max_param_len(self.transport.max_frame_len())
    }

    pub async fn delay_us(&mut self, us: u32) {
        self.transport.delay_us(us).await;
    }

    /// Issue one command and copy its response payload into `infill`.
    /// Returns the payload length.
    pub async fn command(
        &mut self,
        command: u16,
        command_version: u8,
        outdata: &[u8],
        infill: &mut [u8],
    ) -> Result<usize> {
        let command = command | dev_command_offset(self.dev_index);
        let max_frame = self.transport.max_frame_len();
        let request =
            proto::encode_request(self.version, command, command_version, outdata, max_frame)?;
        let mut buf = vec![0u8; max_frame];
        let len = self.transport.exchange(&request, &mut buf).await?;
        let data = proto::decode_response(self.version, command, &buf[..len])?;
        if data.len() > infill.len() {
            return Err(EcError::ResponseTooLong);
        }
        infill[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    /// Issue a command whose response has a fixed wire layout.
    async fn command_typed<R: FromBytes>(
        &mut self,
        command: u16,
        command_version: u8,
        outdata: &[u8],
    ) -> Result<R> {
        let mut buf = vec![0u8; core::mem::size_of::<R>()];
        let len = self.command(command, command_version, outdata, &mut buf).await?;
        if len != buf.len() {
            return Err(EcError::MalformedResponse);
        }
        R::read_from_bytes(&buf).map_err(|_| EcError::MalformedResponse)
    }

    /// Round-trip the hello arithmetic to confirm the EC is responsive.
    pub async fn hello(&mut self) -> Result<()> {
        let params = HelloParams {
            in_data: HELLO_MAGIC.into(),
        };
        let response: HelloResponse =
            self.command_typed(CMD_HELLO, 0, params.as_bytes()).await?;
        if response.out_data.get() == HELLO_MAGIC.wrapping_add(HELLO_DELTA) {
            Ok(())
        } else {
            Err(EcError::MalformedResponse)
        }
    }

    /// Which firmware copy the EC is currently executing.
    pub async fn current_image(&mut self) -> Result<EcImage> {
        let response: GetVersionResponse =
            self.command_typed(CMD_GET_VERSION, 0, &[]).await?;
        match EcImage::from_raw(response.current_image.get()) {
            EcImage::Unknown => Err(EcError::UnknownImage),
            image => Ok(image),
        }
    }

    /// Whether the EC implements `version` of `command`.
    pub async fn cmd_version_supported(&mut self, command: u16, version: u8) -> Result<bool> {
        let params = GetCmdVersionsParams { cmd: command as u8 };
        match self
            .command_typed::<GetCmdVersionsResponse>(CMD_GET_CMD_VERSIONS, 0, params.as_bytes())
            .await
        {
            Ok(response) => Ok(response.version_mask.get() & (1 << version) != 0),
            // Old ECs predate the version query itself.
            Err(EcError::Status(EcStatus::InvalidCommand)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn flash_info(&mut self) -> Result<FlashInfoResponse> {
        self.command_typed(CMD_FLASH_INFO, 0, &[]).await
    }

    pub async fn flash_info_1(&mut self) -> Result<FlashInfo1Response> {
        self.command_typed(CMD_FLASH_INFO, VER_FLASH_INFO_1, &[]).await
    }

    pub async fn region_info(&mut self, region: EcFlashRegion) -> Result<(u32, u32)> {
        let params = FlashRegionInfoParams {
            region: (region as u32).into(),
        };
        let response: FlashRegionInfoResponse = self
            .command_typed(CMD_FLASH_REGION_INFO, 0, params.as_bytes())
            .await?;
        Ok((response.offset.get(), response.size.get()))
    }

    /// Read one chunk of flash. `buf` bounds the chunk size.
    pub async fn flash_read(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        let params = FlashReadParams {
            offset: offset.into(),
            size: (buf.len() as u32).into(),
        };
        let len = self
            .command(CMD_FLASH_READ, 0, params.as_bytes(), buf)
            .await?;
        if len != buf.len() {
            return Err(EcError::MalformedResponse);
        }
        Ok(())
    }

    /// Program one chunk of flash. The payload rides in the same frame
    /// as the parameters.
    pub async fn flash_write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let params = FlashWriteParams {
            offset: offset.into(),
            size: (data.len() as u32).into(),
        };
        let mut outdata = Vec::with_capacity(params.as_bytes().len() + data.len());
        outdata.extend_from_slice(params.as_bytes());
        outdata.extend_from_slice(data);
        self.command(CMD_FLASH_WRITE, 0, &outdata, &mut []).await?;
        Ok(())
    }

    /// Erase a span of flash in one command.
    pub async fn flash_erase(&mut self, offset: u32, size: u32) -> Result<()> {
        let params = FlashEraseParams {
            offset: offset.into(),
            size: size.into(),
        };
        self.command(CMD_FLASH_ERASE, 0, params.as_bytes(), &mut [])
            .await?;
        Ok(())
    }

    /// Change the masked protection flags and report the resulting
    /// state. A zero mask only reads.
    pub async fn flash_protect(
        &mut self,
        mask: ProtectFlags,
        flags: ProtectFlags,
    ) -> Result<FlashProtectResponse> {
        let params = FlashProtectParams {
            mask: mask.bits().into(),
            flags: flags.bits().into(),
        };
        self.command_typed(CMD_FLASH_PROTECT, VER_FLASH_PROTECT_1, params.as_bytes())
            .await
    }

    pub async fn reboot(&mut self, cmd: RebootCmd, flags: RebootFlags) -> Result<()> {
        let params = RebootParams {
            cmd: cmd as u8,
            flags: flags.bits(),
        };
        self.command(CMD_REBOOT_EC, 0, params.as_bytes(), &mut [])
            .await?;
        Ok(())
    }

    /// Preferred flash write chunk size for this EC.
    ///
    /// Newer ECs report an ideal size through the extended geometry
    /// query; older ones are stuck with the fixed legacy parameter
    /// block minus the write header.
    pub async fn ideal_write_size(&mut self) -> Result<usize> {
        if self
            .cmd_version_supported(CMD_FLASH_WRITE, VER_FLASH_WRITE_1)
            .await?
        {
            let info = self.flash_info_1().await?;
            Ok(info.write_ideal_size.get() as usize)
        } else {
            Ok(FLASH_WRITE_V0_SIZE)
        }
    }
}
