//! JEDEC SPI NOR command sequences
//!
//! Free functions over any [`SpiBus`]. Each wraps one protocol step:
//! latch control, status access, array read and program, erase, and the
//! 4-byte address mode switch. Timed operations poll the busy bit with
//! per-operation cadences.

use crate::error::{Error, Result};
use crate::programmer::SpiBus;
use crate::spi::{opcodes, AddrWidth, SpiOp};
use maybe_async::maybe_async;

/// Which status or configuration register to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReg {
    /// Status register 1, present on every part
    Sr1,
    /// Status register 2 (Winbond lineage)
    Sr2,
    /// Status register 3 (Winbond lineage)
    Sr3,
    /// Configuration register (Macronix)
    Cfg,
}

impl StatusReg {
    const fn opcode(self) -> u8 {
        match self {
            Self::Sr1 => opcodes::READ_SR1,
            Self::Sr2 => opcodes::READ_SR2,
            Self::Sr3 => opcodes::READ_SR3,
            Self::Cfg => opcodes::READ_CFG,
        }
    }
}

/// Read one status or configuration register byte
#[maybe_async]
pub async fn read_status<B: SpiBus + ?Sized>(bus: &mut B, reg: StatusReg) -> Result<u8> {
    let mut byte = [0u8; 1];
    let mut op = SpiOp::reg_read(reg.opcode(), &mut byte);
    bus.run(&mut op).await?;
    Ok(byte[0])
}

/// Read the JEDEC identification as (manufacturer, device)
#[maybe_async]
pub async fn jedec_id<B: SpiBus + ?Sized>(bus: &mut B) -> Result<(u8, u16)> {
    let mut id = [0u8; 3];
    let mut op = SpiOp::reg_read(opcodes::READ_JEDEC_ID, &mut id);
    bus.run(&mut op).await?;
    Ok((id[0], u16::from_be_bytes([id[1], id[2]])))
}

/// Set the write enable latch
#[maybe_async]
pub async fn write_enable<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    bus.run(&mut SpiOp::bare(opcodes::WRITE_ENABLE)).await
}

/// Clear the write enable latch
#[maybe_async]
pub async fn write_disable<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    bus.run(&mut SpiOp::bare(opcodes::WRITE_DISABLE)).await
}

/// Arm a volatile status register write (0x50)
///
/// The next status write lands in the volatile copy and is lost at
/// power-off. Not every part implements this.
#[maybe_async]
pub async fn write_enable_volatile<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    bus.run(&mut SpiOp::bare(opcodes::VOLATILE_SR_WRITE_ENABLE))
        .await
}

/// Poll SR1 until the busy bit clears
///
/// `poll_us` sets the cadence between polls and should match the
/// expected operation time: 10us for page program, 10ms for sector
/// erase, 100ms for block erase, 1s for chip erase.
#[maybe_async]
pub async fn wait_idle<B: SpiBus + ?Sized>(
    bus: &mut B,
    poll_us: u32,
    timeout_us: u32,
) -> Result<()> {
    let step = poll_us.max(1);
    let mut waited: u64 = 0;

    loop {
        if read_status(bus, StatusReg::Sr1).await? & opcodes::SR1_BUSY == 0 {
            return Ok(());
        }
        if waited >= timeout_us as u64 {
            return Err(Error::Timeout);
        }
        bus.delay_us(step).await;
        waited += step as u64;
    }
}

/// Write the status registers with full sequencing
///
/// Sets the write enable latch, issues a single status write carrying
/// `bytes` (SR1, or SR1 then SR2), and waits for completion. Status
/// writes self-time in 5-200ms, polled every 10ms.
#[maybe_async]
pub async fn update_status<B: SpiBus + ?Sized>(bus: &mut B, bytes: &[u8]) -> Result<()> {
    write_enable(bus).await?;
    bus.run(&mut SpiOp::reg_write(opcodes::WRITE_SR1, bytes))
        .await?;
    wait_idle(bus, 10_000, 500_000).await
}

/// Issue a bare status write with no latch handling and no wait
///
/// The caller owns the sequencing around it, either the nonvolatile
/// write enable or the volatile 0x50 form, plus a settle delay or poll.
#[maybe_async]
pub async fn push_status<B: SpiBus + ?Sized>(bus: &mut B, bytes: &[u8]) -> Result<()> {
    bus.run(&mut SpiOp::reg_write(opcodes::WRITE_SR1, bytes))
        .await
}

/// Read from the array, chunked to the programmer's transfer limit
///
/// `AddrWidth::Four` selects the native 4-byte read opcode; anything
/// else uses the classic 24-bit read.
#[maybe_async]
pub async fn read_data<B: SpiBus + ?Sized>(
    bus: &mut B,
    width: AddrWidth,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    let (opcode, width) = match width {
        AddrWidth::Four => (opcodes::READ_DATA_4B, AddrWidth::Four),
        _ => (opcodes::READ_DATA, AddrWidth::Three),
    };
    let limit = bus.max_read();

    let mut done = 0;
    while done < buf.len() {
        let n = limit.min(buf.len() - done);
        let mut op = SpiOp::data_read(width, opcode, addr + done as u32, &mut buf[done..done + n]);
        bus.run(&mut op).await?;
        done += n;
    }

    Ok(())
}

/// Program one page; `data` must not cross a page boundary
///
/// Sequences the write enable latch, the program opcode matching
/// `width`, and a busy poll (10us cadence, 10ms timeout against a
/// typical 0.7-5ms program time).
#[maybe_async]
pub async fn program_page<B: SpiBus + ?Sized>(
    bus: &mut B,
    width: AddrWidth,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    let (opcode, width) = match width {
        AddrWidth::Four => (opcodes::PAGE_PROGRAM_4B, AddrWidth::Four),
        _ => (opcodes::PAGE_PROGRAM, AddrWidth::Three),
    };

    write_enable(bus).await?;
    bus.run(&mut SpiOp::data_write(width, opcode, addr, data))
        .await?;
    wait_idle(bus, 10, 10_000).await
}

/// Erase one block with the given opcode
///
/// The caller picks `poll_us`/`timeout_us` for the block size: 4 KiB
/// sectors finish in 45-400ms, 64 KiB blocks in 150-2000ms.
#[maybe_async]
pub async fn erase_block<B: SpiBus + ?Sized>(
    bus: &mut B,
    width: AddrWidth,
    opcode: u8,
    addr: u32,
    poll_us: u32,
    timeout_us: u32,
) -> Result<()> {
    write_enable(bus).await?;
    bus.run(&mut SpiOp::block_erase(width, opcode, addr)).await?;
    wait_idle(bus, poll_us, timeout_us).await
}

/// Erase the whole array
///
/// Large parts take 25-100s, polled once a second with a 200s timeout.
#[maybe_async]
pub async fn erase_chip<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_enable(bus).await?;
    bus.run(&mut SpiOp::bare(opcodes::CHIP_ERASE)).await?;
    wait_idle(bus, 1_000_000, 200_000_000).await
}

/// Switch the chip into 4-byte address mode
#[maybe_async]
pub async fn enter_4ba<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    bus.run(&mut SpiOp::bare(opcodes::ENTER_4BA)).await
}

/// Switch the chip back to 3-byte address mode
#[maybe_async]
pub async fn leave_4ba<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    bus.run(&mut SpiOp::bare(opcodes::EXIT_4BA)).await
}

/// Arm and execute a software reset, with the datasheet settle delays
#[maybe_async]
pub async fn soft_reset<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    bus.run(&mut SpiOp::bare(opcodes::RESET_ENABLE)).await?;
    bus.delay_us(50).await;
    bus.run(&mut SpiOp::bare(opcodes::RESET_DEVICE)).await?;
    bus.delay_us(100).await;
    Ok(())
}

/// Whether the write enable latch is currently set
#[maybe_async]
pub async fn wel_set<B: SpiBus + ?Sized>(bus: &mut B) -> Result<bool> {
    Ok(read_status(bus, StatusReg::Sr1).await? & opcodes::SR1_WEL != 0)
}

/// Whether an erase or program is still running
#[maybe_async]
pub async fn busy<B: SpiBus + ?Sized>(bus: &mut B) -> Result<bool> {
    Ok(read_status(bus, StatusReg::Sr1).await? & opcodes::SR1_BUSY != 0)
}

#[cfg(all(test, feature = "is_sync", feature = "alloc"))]
mod tests {
    use super::*;
    use crate::programmer::SpiCaps;

    // SR1 values handed out in order, sticking on the last one.
    struct ScriptedBus {
        sr1: alloc::vec::Vec<u8>,
        polls: usize,
        delays: u64,
    }

    impl ScriptedBus {
        fn new(sr1: &[u8]) -> Self {
            Self {
                sr1: sr1.to_vec(),
                polls: 0,
                delays: 0,
            }
        }
    }

    impl SpiBus for ScriptedBus {
        fn caps(&self) -> SpiCaps {
            SpiCaps::empty()
        }

        fn max_read(&self) -> usize {
            4
        }

        fn max_write(&self) -> usize {
            256
        }

        fn run(&mut self, op: &mut SpiOp<'_>) -> Result<()> {
            match op.opcode {
                opcodes::READ_SR1 => {
                    let i = self.polls.min(self.sr1.len() - 1);
                    op.rx[0] = self.sr1[i];
                    self.polls += 1;
                    Ok(())
                }
                opcodes::READ_JEDEC_ID => {
                    op.rx.copy_from_slice(&[0xEF, 0x40, 0x16]);
                    Ok(())
                }
                opcodes::READ_DATA => {
                    op.rx.fill(0xA5);
                    Ok(())
                }
                _ => Ok(()),
            }
        }

        fn delay_us(&mut self, us: u32) {
            self.delays += us as u64;
        }
    }

    #[test]
    fn jedec_id_is_big_endian_device() {
        let mut bus = ScriptedBus::new(&[0]);
        assert_eq!(jedec_id(&mut bus).unwrap(), (0xEF, 0x4016));
    }

    #[test]
    fn wait_idle_returns_once_busy_clears() {
        let mut bus = ScriptedBus::new(&[opcodes::SR1_BUSY, opcodes::SR1_BUSY, 0]);
        wait_idle(&mut bus, 10, 1_000).unwrap();
        assert_eq!(bus.polls, 3);
    }

    #[test]
    fn wait_idle_times_out_on_stuck_busy() {
        let mut bus = ScriptedBus::new(&[opcodes::SR1_BUSY]);
        assert_eq!(wait_idle(&mut bus, 10, 50).unwrap_err(), Error::Timeout);
        assert!(bus.delays >= 50);
    }

    #[test]
    fn read_data_chunks_to_the_bus_limit() {
        let mut bus = ScriptedBus::new(&[0]);
        let mut buf = [0u8; 10];
        read_data(&mut bus, AddrWidth::Three, 0, &mut buf).unwrap();
        assert_eq!(buf, [0xA5; 10]);
    }
}
