//! Wire-level description of a single SPI transfer
//!
//! A transfer is an opcode, an optional address phase, optional dummy
//! cycles, then a data phase that either sends `tx` or fills `rx`.
//! Programmers that expose raw transmit/receive buffers can serialize
//! the opcode and address themselves via [`SpiOp::encode_prefix`].

use super::address::AddrWidth;

/// One SPI flash transaction
#[derive(Debug)]
pub struct SpiOp<'a> {
    /// Command byte, first on the wire
    pub opcode: u8,
    /// Address phase payload, if the opcode takes one
    pub addr: Option<u32>,
    /// How many address bytes to send
    pub width: AddrWidth,
    /// Dummy clock cycles between address and data (multiple of 8)
    pub dummy_cycles: u8,
    /// Bytes transmitted after the prefix
    pub tx: &'a [u8],
    /// Buffer filled from the wire after the prefix
    pub rx: &'a mut [u8],
}

impl<'a> SpiOp<'a> {
    /// Opcode with no address and no data phase (WRITE_ENABLE, chip erase, ...)
    pub fn bare(opcode: u8) -> Self {
        Self {
            opcode,
            addr: None,
            width: AddrWidth::None,
            dummy_cycles: 0,
            tx: &[],
            rx: &mut [],
        }
    }

    /// Register read: opcode then clock `rx.len()` bytes out of the chip
    pub fn reg_read(opcode: u8, rx: &'a mut [u8]) -> Self {
        Self {
            opcode,
            addr: None,
            width: AddrWidth::None,
            dummy_cycles: 0,
            tx: &[],
            rx,
        }
    }

    /// Register write: opcode followed by `tx`
    pub fn reg_write(opcode: u8, tx: &'a [u8]) -> Self {
        Self {
            opcode,
            addr: None,
            width: AddrWidth::None,
            dummy_cycles: 0,
            tx,
            rx: &mut [],
        }
    }

    /// Addressed read at the given width
    pub fn data_read(width: AddrWidth, opcode: u8, addr: u32, rx: &'a mut [u8]) -> Self {
        Self {
            opcode,
            addr: Some(addr),
            width,
            dummy_cycles: 0,
            tx: &[],
            rx,
        }
    }

    /// Addressed write (page program) at the given width
    pub fn data_write(width: AddrWidth, opcode: u8, addr: u32, tx: &'a [u8]) -> Self {
        Self {
            opcode,
            addr: Some(addr),
            width,
            dummy_cycles: 0,
            tx,
            rx: &mut [],
        }
    }

    /// Addressed erase, no data phase
    pub fn block_erase(width: AddrWidth, opcode: u8, addr: u32) -> Self {
        Self {
            opcode,
            addr: Some(addr),
            width,
            dummy_cycles: 0,
            tx: &[],
            rx: &mut [],
        }
    }

    /// Add dummy cycles after the address phase
    pub fn dummy(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Length of the opcode + address + dummy prefix in bytes
    pub fn prefix_len(&self) -> usize {
        1 + self.width.nbytes() + (self.dummy_cycles as usize) / 8
    }

    /// Serialize opcode, address and dummy filler into `out`
    ///
    /// `out` must hold at least `prefix_len()` bytes. Dummy cycles are
    /// emitted as zero bytes, which assumes single-lane transfers.
    pub fn encode_prefix(&self, out: &mut [u8]) {
        out[0] = self.opcode;
        if let Some(addr) = self.addr {
            self.width.put(addr, &mut out[1..]);
        }
        let fill = 1 + self.width.nbytes();
        for b in out[fill..self.prefix_len()].iter_mut() {
            *b = 0;
        }
    }

    /// Total bytes clocked on the wire for this transfer
    pub fn wire_len(&self) -> usize {
        self.prefix_len() + self.tx.len() + self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_op_is_one_byte() {
        let op = SpiOp::bare(0x06);
        assert_eq!(op.prefix_len(), 1);
        assert_eq!(op.wire_len(), 1);
    }

    #[test]
    fn reg_read_counts_rx() {
        let mut rx = [0u8; 3];
        let op = SpiOp::reg_read(0x9F, &mut rx);
        assert_eq!(op.prefix_len(), 1);
        assert_eq!(op.wire_len(), 4);
    }

    #[test]
    fn prefix_holds_opcode_and_address() {
        let mut rx = [0u8; 8];
        let op = SpiOp::data_read(AddrWidth::Three, 0x03, 0x012345, &mut rx);
        let mut prefix = [0u8; 4];
        op.encode_prefix(&mut prefix);
        assert_eq!(prefix, [0x03, 0x01, 0x23, 0x45]);
    }

    #[test]
    fn dummy_cycles_extend_prefix() {
        let mut rx = [0u8; 4];
        let op = SpiOp::data_read(AddrWidth::Four, 0x0C, 0x0100_0000, &mut rx).dummy(8);
        assert_eq!(op.prefix_len(), 1 + 4 + 1);
        let mut prefix = [0xAAu8; 6];
        op.encode_prefix(&mut prefix);
        assert_eq!(prefix, [0x0C, 0x01, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn erase_has_no_data_phase() {
        let op = SpiOp::block_erase(AddrWidth::Three, 0x20, 0x1000);
        assert_eq!(op.wire_len(), 4);
    }
}
