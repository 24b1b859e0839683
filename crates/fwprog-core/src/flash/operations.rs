//! Array operations: probe, read, program, erase, smart write

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::chip::{self, EraseBlock, WriteGranularity};
use crate::error::{EraseFailure, Error, Result};
use crate::programmer::SpiBus;
use crate::protocol;
use crate::spi::AddrWidth;
use maybe_async::maybe_async;

#[cfg(feature = "alloc")]
use super::device::FlashDevice;
use super::probed::{AddrMode, ProbedChip};

/// Value every byte reads as after an erase
pub const ERASED_VALUE: u8 = 0xFF;

// -----------------------------------------------------------------------------
// Change detection for smart writes
// -----------------------------------------------------------------------------

/// Whether getting from `have` to `want` requires an erase first
///
/// Programming can only clear bits. Any 0 to 1 transition forces an
/// erase; at byte or page granularity a changed byte is only
/// programmable when the old byte still reads erased.
pub fn need_erase(have: &[u8], want: &[u8], granularity: WriteGranularity) -> bool {
    assert_eq!(have.len(), want.len());

    match granularity {
        WriteGranularity::Bit => {
            // Only 1->0 transitions are possible without erase
            have.iter().zip(want.iter()).any(|(h, w)| (h & w) != *w)
        }
        WriteGranularity::Byte | WriteGranularity::Page => {
            // A changed byte is only writable if the old byte is erased
            have.iter().zip(want.iter()).any(
                |(h, w)| {
                    if h == w {
                        false
                    } else {
                        *h != ERASED_VALUE
                    }
                },
            )
        }
    }
}

/// Whether the buffers differ at all
#[inline]
pub fn need_write(have: &[u8], want: &[u8]) -> bool {
    have != want
}

/// A contiguous run of bytes that needs programming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRange {
    /// Start offset within the compared buffers
    pub start: u32,
    /// Length in bytes
    pub len: u32,
}

/// Find the next run of changed bytes at or after `offset`
///
/// Returns `None` once the buffers agree for the rest of their length.
pub fn get_next_write_range(have: &[u8], want: &[u8], offset: u32) -> Option<WriteRange> {
    assert_eq!(have.len(), want.len());

    let start_offset = offset as usize;
    if start_offset >= have.len() {
        return None;
    }

    let have_slice = &have[start_offset..];
    let want_slice = &want[start_offset..];

    let rel_start = have_slice
        .iter()
        .zip(want_slice.iter())
        .position(|(h, w)| h != w)?;

    let after_start = rel_start + 1;
    let rel_end = have_slice[after_start..]
        .iter()
        .zip(want_slice[after_start..].iter())
        .position(|(h, w)| h == w)
        .map(|pos| after_start + pos)
        .unwrap_or(have_slice.len());

    Some(WriteRange {
        start: (start_offset + rel_start) as u32,
        len: (rel_end - rel_start) as u32,
    })
}

/// Collect every run of changed bytes
#[cfg(feature = "alloc")]
pub fn get_all_write_ranges(have: &[u8], want: &[u8]) -> Vec<WriteRange> {
    let mut ranges = Vec::new();
    let mut offset = 0u32;

    while let Some(range) = get_next_write_range(have, want, offset) {
        ranges.push(range);
        offset = range.start + range.len;
    }

    ranges
}

/// What a smart write ended up doing
#[derive(Debug, Clone, Default)]
pub struct WriteStats {
    /// Number of erase operations performed
    pub erases_performed: usize,
    /// Total bytes erased
    pub bytes_erased: usize,
    /// Number of write operations performed
    pub writes_performed: usize,
    /// Total bytes written
    pub bytes_written: usize,
    /// Number of erase/write passes that ran
    pub passes: usize,
    /// Whether any flash operations were performed
    pub flash_modified: bool,
}

// -----------------------------------------------------------------------------
// SPI array access
// -----------------------------------------------------------------------------

/// How to reach the full array of the probed part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayAccess {
    /// Issue opcodes at this address width directly
    Direct(AddrWidth),
    /// Enter 4-byte mode around the operation, then leave it again
    Switched,
}

fn access_plan(probed: &ProbedChip) -> ArrayAccess {
    match probed.addr_mode {
        AddrMode::Three => ArrayAccess::Direct(AddrWidth::Three),
        AddrMode::Four if probed.native_4ba => ArrayAccess::Direct(AddrWidth::Four),
        AddrMode::Four => ArrayAccess::Switched,
    }
}

/// Identify the chip on the bus via its JEDEC id
#[maybe_async]
pub async fn probe<B: SpiBus + ?Sized>(bus: &mut B) -> Result<ProbedChip> {
    let (vendor, device) = protocol::jedec_id(bus).await?;
    log::debug!("JEDEC id: vendor 0x{:02X}, device 0x{:04X}", vendor, device);

    chip::find_by_jedec_id(vendor, device)
        .map(ProbedChip::new)
        .ok_or(Error::ChipNotFound)
}

/// Read the raw JEDEC identification without consulting the database
#[maybe_async]
pub async fn read_jedec_id<B: SpiBus + ?Sized>(bus: &mut B) -> Result<(u8, u16)> {
    protocol::jedec_id(bus).await
}

/// Read `buf.len()` bytes starting at `addr`
#[maybe_async]
pub async fn read<B: SpiBus + ?Sized>(
    bus: &mut B,
    probed: &ProbedChip,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    if !probed.in_bounds(addr, buf.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    match access_plan(probed) {
        ArrayAccess::Direct(width) => protocol::read_data(bus, width, addr, buf).await,
        ArrayAccess::Switched => {
            protocol::enter_4ba(bus).await?;
            let out = protocol::read_data(bus, AddrWidth::Three, addr, buf).await;
            let left = protocol::leave_4ba(bus).await;
            out.and(left)
        }
    }
}

/// Program `data` at `addr`, splitting at page boundaries
///
/// The target range must already read erased.
#[maybe_async]
pub async fn write<B: SpiBus + ?Sized>(
    bus: &mut B,
    probed: &ProbedChip,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    if !probed.in_bounds(addr, data.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    let page = probed.page_size();
    match access_plan(probed) {
        ArrayAccess::Direct(width) => write_pages(bus, page, width, addr, data).await,
        ArrayAccess::Switched => {
            protocol::enter_4ba(bus).await?;
            let out = write_pages(bus, page, AddrWidth::Three, addr, data).await;
            let left = protocol::leave_4ba(bus).await;
            out.and(left)
        }
    }
}

#[maybe_async]
async fn write_pages<B: SpiBus + ?Sized>(
    bus: &mut B,
    page_size: usize,
    width: AddrWidth,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    let mut pos = 0usize;
    while pos < data.len() {
        let at = addr + pos as u32;
        // One program command must stay inside a single page
        let room = page_size - (at as usize % page_size);
        let n = room.min(data.len() - pos);
        protocol::program_page(bus, width, at, &data[pos..pos + n]).await?;
        pos += n;
    }
    Ok(())
}

/// Erase `len` bytes at `addr` and confirm they read blank
///
/// Both ends must sit on a boundary of one of the chip's erase block
/// sizes; the largest block that fits is used.
#[maybe_async]
pub async fn erase<B: SpiBus + ?Sized>(
    bus: &mut B,
    probed: &ProbedChip,
    addr: u32,
    len: u32,
) -> Result<()> {
    if !probed.in_bounds(addr, len as usize) {
        return Err(Error::AddressOutOfBounds);
    }

    let block =
        select_erase_block(probed.chip.erase_blocks, addr, len).ok_or(Error::InvalidAlignment)?;

    match access_plan(probed) {
        ArrayAccess::Direct(width) => erase_span(bus, probed, width, block, addr, len).await,
        ArrayAccess::Switched => {
            protocol::enter_4ba(bus).await?;
            let out = erase_span(bus, probed, AddrWidth::Three, block, addr, len).await;
            let left = protocol::leave_4ba(bus).await;
            out.and(left)
        }
    }
}

#[maybe_async]
async fn erase_span<B: SpiBus + ?Sized>(
    bus: &mut B,
    probed: &ProbedChip,
    width: AddrWidth,
    block: EraseBlock,
    addr: u32,
    len: u32,
) -> Result<()> {
    let opcode = match width {
        AddrWidth::Four => native_4ba_opcode(block.opcode),
        _ => block.opcode,
    };
    let (poll_us, timeout_us) = erase_cadence(block.size);

    let mut at = addr;
    while at < addr + len {
        protocol::erase_block(bus, width, opcode, at, poll_us, timeout_us).await?;
        confirm_blank(bus, probed, at, block.size).await?;
        at += block.size;
    }
    Ok(())
}

/// Poll cadence and timeout matched to the erase block size
const fn erase_cadence(block_size: u32) -> (u32, u32) {
    if block_size <= 4096 {
        (10_000, 1_000_000)
    } else {
        (100_000, 4_000_000)
    }
}

/// Erase the whole chip and confirm it reads blank
#[maybe_async]
pub async fn chip_erase<B: SpiBus + ?Sized>(bus: &mut B, probed: &ProbedChip) -> Result<()> {
    protocol::erase_chip(bus).await?;
    confirm_blank(bus, probed, 0, probed.total_size() as u32).await
}

/// Check that `len` bytes at `addr` all read as [`ERASED_VALUE`]
#[maybe_async]
async fn confirm_blank<B: SpiBus + ?Sized>(
    bus: &mut B,
    probed: &ProbedChip,
    addr: u32,
    len: u32,
) -> Result<()> {
    // Fixed-size chunks keep this off the heap
    let mut chunk = [0u8; 4096];

    let mut done = 0u32;
    while done < len {
        let n = (chunk.len() as u32).min(len - done) as usize;
        let window = &mut chunk[..n];
        read(bus, probed, addr + done, window).await?;

        if let Some(i) = window.iter().position(|&b| b != ERASED_VALUE) {
            return Err(Error::EraseError(EraseFailure::VerifyFailed {
                addr: addr + done + i as u32,
                found: window[i],
            }));
        }

        done += n as u32;
    }

    Ok(())
}

/// Read back `expected.len()` bytes into `buf` and compare
#[maybe_async]
pub async fn verify<B: SpiBus + ?Sized>(
    bus: &mut B,
    probed: &ProbedChip,
    addr: u32,
    expected: &[u8],
    buf: &mut [u8],
) -> Result<()> {
    if !probed.in_bounds(addr, expected.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    if buf.len() < expected.len() {
        return Err(Error::BufferTooSmall);
    }

    let window = &mut buf[..expected.len()];
    read(bus, probed, addr, window).await?;

    if window != expected {
        return Err(Error::VerifyError);
    }

    Ok(())
}

/// Largest erase block that tiles `addr..addr+len` exactly
pub(crate) fn select_erase_block(
    erase_blocks: &[EraseBlock],
    addr: u32,
    len: u32,
) -> Option<EraseBlock> {
    erase_blocks
        .iter()
        .filter(|eb| eb.size <= len)
        .filter(|eb| addr % eb.size == 0 && len % eb.size == 0)
        .max_by_key(|eb| eb.size)
        .copied()
}

/// The 4-byte-address twin of a classic erase opcode
pub(crate) fn native_4ba_opcode(opcode: u8) -> u8 {
    use crate::spi::opcodes;
    match opcode {
        opcodes::ERASE_SECTOR_4K => opcodes::ERASE_SECTOR_4K_4B,
        opcodes::ERASE_BLOCK_32K => opcodes::ERASE_BLOCK_32K_4B,
        opcodes::ERASE_BLOCK_64K => opcodes::ERASE_BLOCK_64K_4B,
        _ => opcode,
    }
}

// -----------------------------------------------------------------------------
// Device-level smart write
// -----------------------------------------------------------------------------

/// Erase and write a region, touching only the blocks that need it
///
/// Reads the current contents, then for each erase block in the region:
/// erases only if a 0->1 bit transition is required, then writes only the
/// changed byte ranges. Blocks the device denies (`AccessDenied`) are
/// skipped; when the device requests a second pass, the device is moved
/// out of the way and the skipped blocks are retried once. The region is
/// verified after the final pass.
///
/// `addr` and `want.len()` must be aligned to the device's erase
/// granularity.
#[cfg(feature = "alloc")]
#[maybe_async]
pub async fn erase_and_write<D: FlashDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    want: &[u8],
) -> Result<WriteStats> {
    if !device.in_bounds(addr, want.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    let granularity = device.min_erase_size();
    if addr % granularity != 0 || (want.len() as u32) % granularity != 0 {
        return Err(Error::InvalidAlignment);
    }

    let mut stats = WriteStats::default();
    let write_gran = device.write_granularity();

    // One regular pass plus at most one retry pass
    for pass in 0..2 {
        stats.passes = pass + 1;

        let mut have = vec![0u8; want.len()];
        device.read(addr, &mut have).await?;

        let mut denied = false;

        let mut block_start = 0usize;
        while block_start < want.len() {
            let block_addr = addr + block_start as u32;
            let block_len = core::cmp::min(granularity as usize, want.len() - block_start);
            let block_end = block_start + block_len;

            let have_block = &have[block_start..block_end];
            let want_block = &want[block_start..block_end];

            if !need_write(have_block, want_block) {
                block_start = block_end;
                continue;
            }

            if need_erase(have_block, want_block, write_gran) {
                match device.erase(block_addr, block_len as u32).await {
                    Ok(()) => {
                        stats.erases_performed += 1;
                        stats.bytes_erased += block_len;
                        stats.flash_modified = true;
                    }
                    Err(Error::AccessDenied) => {
                        log::warn!(
                            "erase denied at 0x{:08X}, deferring to a later pass",
                            block_addr
                        );
                        denied = true;
                        block_start = block_end;
                        continue;
                    }
                    Err(e) => return Err(e),
                }

                // After erase the block reads as all 0xFF
                let erased = vec![ERASED_VALUE; block_len];
                let write_result =
                    write_changed_ranges(device, block_addr, &erased, want_block, &mut stats)
                        .await?;
                denied |= write_result;
            } else {
                let write_result =
                    write_changed_ranges(device, block_addr, have_block, want_block, &mut stats)
                        .await?;
                denied |= write_result;
            }

            block_start = block_end;
        }

        if device.need_second_pass() && pass == 0 {
            log::info!("device requested a second erase/write pass");
            device.start_second_pass().await?;
            continue;
        }

        if denied {
            return Err(Error::AccessDenied);
        }
        break;
    }

    // Final verify of the whole region
    let mut readback = vec![0u8; want.len()];
    device.read(addr, &mut readback).await?;
    if readback != want {
        return Err(Error::VerifyError);
    }

    Ok(stats)
}

/// Write the changed ranges of one block; returns true if any write was denied
#[cfg(feature = "alloc")]
#[maybe_async]
async fn write_changed_ranges<D: FlashDevice + ?Sized>(
    device: &mut D,
    block_addr: u32,
    have: &[u8],
    want: &[u8],
    stats: &mut WriteStats,
) -> Result<bool> {
    let mut denied = false;
    let mut offset = 0u32;

    while let Some(range) = get_next_write_range(have, want, offset) {
        let data = &want[range.start as usize..(range.start + range.len) as usize];
        match device.write(block_addr + range.start, data).await {
            Ok(()) => {
                stats.writes_performed += 1;
                stats.bytes_written += data.len();
                stats.flash_modified = true;
            }
            Err(Error::AccessDenied) => {
                log::warn!(
                    "write denied at 0x{:08X}, deferring to a later pass",
                    block_addr + range.start
                );
                denied = true;
            }
            Err(e) => return Err(e),
        }
        offset = range.start + range.len;
    }

    Ok(denied)
}

/// Verify device contents against `expected`
#[cfg(feature = "alloc")]
#[maybe_async]
pub async fn verify_device<D: FlashDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    expected: &[u8],
) -> Result<()> {
    if !device.in_bounds(addr, expected.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    let mut readback = vec![0u8; expected.len()];
    device.read(addr, &mut readback).await?;

    if readback != expected {
        return Err(Error::VerifyError);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erase_needed_for_zero_to_one() {
        // 0x00 -> 0xFF requires erase
        assert!(need_erase(&[0x00], &[0xFF], WriteGranularity::Bit));
        // 0xFF -> 0x00 does not
        assert!(!need_erase(&[0xFF], &[0x00], WriteGranularity::Bit));
        // Page granularity: changed byte on non-erased source needs erase
        assert!(need_erase(&[0x12], &[0x34], WriteGranularity::Page));
        assert!(!need_erase(&[0xFF], &[0x34], WriteGranularity::Page));
    }

    #[test]
    fn write_range_detection() {
        let have = [0xFF, 0xFF, 0x00, 0x00, 0xFF, 0x00];
        let want = [0xFF, 0xFF, 0x11, 0x22, 0xFF, 0x33];

        let r1 = get_next_write_range(&have, &want, 0).unwrap();
        assert_eq!(r1, WriteRange { start: 2, len: 2 });

        let r2 = get_next_write_range(&have, &want, r1.start + r1.len).unwrap();
        assert_eq!(r2, WriteRange { start: 5, len: 1 });

        assert!(get_next_write_range(&have, &want, 6).is_none());
    }

    #[test]
    fn erase_block_selection() {
        use crate::spi::opcodes;
        let blocks = [
            EraseBlock::new(opcodes::ERASE_SECTOR_4K, 4096),
            EraseBlock::new(opcodes::ERASE_BLOCK_64K, 65536),
        ];

        let eb = select_erase_block(&blocks, 0x10000, 0x20000).unwrap();
        assert_eq!(eb.size, 65536);

        let eb = select_erase_block(&blocks, 0x1000, 0x2000).unwrap();
        assert_eq!(eb.size, 4096);

        assert!(select_erase_block(&blocks, 0x100, 0x200).is_none());
    }

    #[test]
    fn erase_opcode_mapping_covers_all_blocks() {
        use crate::spi::opcodes;
        assert_eq!(
            native_4ba_opcode(opcodes::ERASE_SECTOR_4K),
            opcodes::ERASE_SECTOR_4K_4B
        );
        assert_eq!(
            native_4ba_opcode(opcodes::ERASE_BLOCK_64K),
            opcodes::ERASE_BLOCK_64K_4B
        );
        assert_eq!(native_4ba_opcode(opcodes::CHIP_ERASE), opcodes::CHIP_ERASE);
    }

    #[test]
    fn erase_cadence_scales_with_block_size() {
        assert_eq!(erase_cadence(4096), (10_000, 1_000_000));
        assert_eq!(erase_cadence(65536), (100_000, 4_000_000));
    }
}

#[cfg(all(test, feature = "is_sync", feature = "alloc"))]
mod erase_and_write_tests {
    use super::*;
    use crate::chip::WriteGranularity;
    use maybe_async::maybe_async;

    const BLOCK: u32 = 4096;
    const BLOCKS: &[EraseBlock] = &[EraseBlock::new(0x20, BLOCK)];

    /// RAM-backed device that can deny access to one block until a
    /// second pass is started
    struct RamFlash {
        data: Vec<u8>,
        denied_block: Option<u32>,
        erases: usize,
    }

    impl RamFlash {
        fn filled(size: usize, byte: u8) -> Self {
            Self {
                data: vec![byte; size],
                denied_block: None,
                erases: 0,
            }
        }
    }

    #[maybe_async(AFIT)]
    impl FlashDevice for RamFlash {
        fn size(&self) -> u32 {
            self.data.len() as u32
        }

        fn min_erase_size(&self) -> u32 {
            BLOCK
        }

        fn write_granularity(&self) -> WriteGranularity {
            WriteGranularity::Bit
        }

        fn erase_blocks(&self) -> &[EraseBlock] {
            BLOCKS
        }

        async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
            let start = addr as usize;
            buf.copy_from_slice(&self.data[start..start + buf.len()]);
            Ok(())
        }

        async fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
            if self.denied_block == Some(addr / BLOCK * BLOCK) {
                return Err(Error::AccessDenied);
            }
            let start = addr as usize;
            self.data[start..start + data.len()].copy_from_slice(data);
            Ok(())
        }

        async fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
            if self.denied_block == Some(addr) {
                return Err(Error::AccessDenied);
            }
            let start = addr as usize;
            self.data[start..start + len as usize].fill(ERASED_VALUE);
            self.erases += 1;
            Ok(())
        }

        fn need_second_pass(&self) -> bool {
            self.denied_block.is_some()
        }

        async fn start_second_pass(&mut self) -> Result<()> {
            self.denied_block = None;
            Ok(())
        }
    }

    #[test]
    fn identical_data_is_left_alone() {
        let mut device = RamFlash::filled(2 * BLOCK as usize, 0x5A);
        let want = vec![0x5A; 2 * BLOCK as usize];

        let stats = erase_and_write(&mut device, 0, &want).unwrap();
        assert!(!stats.flash_modified);
        assert_eq!(stats.erases_performed, 0);
        assert_eq!(stats.writes_performed, 0);
        assert_eq!(stats.passes, 1);
    }

    #[test]
    fn only_dirty_blocks_are_touched() {
        let mut device = RamFlash::filled(2 * BLOCK as usize, 0xFF);
        let mut want = vec![0xFF; 2 * BLOCK as usize];
        want[BLOCK as usize] = 0x12;

        let stats = erase_and_write(&mut device, 0, &want).unwrap();
        // 0xFF -> 0x12 clears bits only, no erase required
        assert_eq!(stats.erases_performed, 0);
        assert_eq!(stats.writes_performed, 1);
        assert_eq!(device.data, want);
    }

    #[test]
    fn rewriting_programmed_data_erases_first() {
        let mut device = RamFlash::filled(BLOCK as usize, 0x00);
        let want = vec![0x5A; BLOCK as usize];

        let stats = erase_and_write(&mut device, 0, &want).unwrap();
        assert_eq!(stats.erases_performed, 1);
        assert_eq!(device.data, want);
    }

    #[test]
    fn rejects_misaligned_and_out_of_bounds_requests() {
        let mut device = RamFlash::filled(2 * BLOCK as usize, 0xFF);

        let want = vec![0u8; BLOCK as usize];
        assert_eq!(
            erase_and_write(&mut device, 1, &want).unwrap_err(),
            Error::InvalidAlignment
        );

        let short = vec![0u8; 100];
        assert_eq!(
            erase_and_write(&mut device, 0, &short).unwrap_err(),
            Error::InvalidAlignment
        );

        let too_big = vec![0u8; 3 * BLOCK as usize];
        assert_eq!(
            erase_and_write(&mut device, 0, &too_big).unwrap_err(),
            Error::AddressOutOfBounds
        );
    }

    #[test]
    fn denied_blocks_are_retried_on_the_second_pass() {
        let mut device = RamFlash::filled(2 * BLOCK as usize, 0x00);
        device.denied_block = Some(0);
        let want = vec![0x33; 2 * BLOCK as usize];

        let stats = erase_and_write(&mut device, 0, &want).unwrap();
        assert_eq!(stats.passes, 2);
        assert_eq!(device.data, want);
    }

    #[test]
    fn verify_reports_mismatches() {
        let mut device = RamFlash::filled(BLOCK as usize, 0xFF);
        let expected = vec![0x01; BLOCK as usize];
        assert_eq!(
            verify_device(&mut device, 0, &expected),
            Err(Error::VerifyError)
        );
        assert!(verify_device(&mut device, 0, &vec![0xFF; BLOCK as usize]).is_ok());
    }
}
