//! Firmware copy bookkeeping
//!
//! The EC refuses to touch flash backing the copy it is currently
//! running from, so a full reprogram has to happen in two passes with a
//! jump to the other copy in between. This module tracks which copies
//! the incoming image provides, which of them have been made stale by a
//! partial write, and whether a second pass is still owed.

use crate::commands::EcImage;

/// Per-open configuration
#[derive(Debug, Clone, Copy)]
pub struct EcConfig {
    /// Which EC behind the transport to address.
    pub dev_index: u8,
    /// Leave the EC running the newest fresh copy when closing instead
    /// of parking it in the read-only copy.
    pub try_latest_firmware: bool,
}

impl Default for EcConfig {
    fn default() -> Self {
        Self {
            dev_index: 0,
            try_latest_firmware: false,
        }
    }
}

/// One firmware copy inside the flash image
#[derive(Debug, Clone, Copy)]
pub struct FirmwareCopy {
    pub offset: u32,
    pub size: u32,
    /// Set once any part of the copy has been erased or rewritten.
    pub stale: bool,
}

/// Write-coordination state for one EC
#[derive(Debug, Default)]
pub struct EcSession {
    pub config: EcConfig,
    copies: [Option<FirmwareCopy>; 2],
    need_second_pass: bool,
}

fn slot(image: EcImage) -> Option<usize> {
    match image {
        EcImage::Ro => Some(0),
        EcImage::Rw => Some(1),
        EcImage::Unknown => None,
    }
}

impl EcSession {
    pub fn new(config: EcConfig) -> Self {
        Self {
            config,
            copies: [None, None],
            need_second_pass: false,
        }
    }

    /// Forget everything learned from a previous image.
    pub fn reset(&mut self) {
        self.copies = [None, None];
        self.need_second_pass = false;
    }

    /// Record where `image`'s copy lives in the new flash image.
    pub fn set_copy(&mut self, image: EcImage, offset: u32, size: u32) {
        if let Some(i) = slot(image) {
            self.copies[i] = Some(FirmwareCopy {
                offset,
                size,
                stale: false,
            });
        }
    }

    pub fn copy(&self, image: EcImage) -> Option<&FirmwareCopy> {
        slot(image).and_then(|i| self.copies[i].as_ref())
    }

    /// Mark every copy overlapping `[addr, addr + len)` stale. Called
    /// before the write or erase is issued, since afterwards the copy
    /// is no longer trustworthy either way.
    pub fn invalidate_overlapping(&mut self, addr: u32, len: u32) {
        for (i, entry) in self.copies.iter_mut().enumerate() {
            let Some(copy) = entry else { continue };
            let hits = (addr >= copy.offset && addr < copy.offset + copy.size)
                || (copy.offset >= addr && copy.offset < addr + len);
            if hits && !copy.stale {
                copy.stale = true;
                log::debug!(
                    "firmware copy {} ({:#x}+{:#x}) now stale",
                    if i == 0 { "RO" } else { "RW" },
                    copy.offset,
                    copy.size
                );
            }
        }
    }

    /// Note that a write was denied and must be retried from the other
    /// copy.
    pub fn request_second_pass(&mut self) {
        self.need_second_pass = true;
    }

    pub fn needs_second_pass(&self) -> bool {
        self.need_second_pass
    }

    /// Consume the second-pass request. The caller jumps copies and
    /// replays the denied spans.
    pub fn begin_second_pass(&mut self) {
        self.need_second_pass = false;
    }

    /// Pick a copy that is still intact to jump to, preferring the
    /// read-only copy.
    pub fn fresh_target(&self) -> Option<EcImage> {
        for image in [EcImage::Ro, EcImage::Rw] {
            if let Some(copy) = self.copy(image) {
                if !copy.stale {
                    return Some(image);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EcSession {
        let mut s = EcSession::new(EcConfig::default());
        s.set_copy(EcImage::Ro, 0x0, 0x10000);
        s.set_copy(EcImage::Rw, 0x10000, 0x10000);
        s
    }

    #[test]
    fn overlap_marks_stale() {
        let mut s = session();
        s.invalidate_overlapping(0x8000, 0x1000);
        assert!(s.copy(EcImage::Ro).unwrap().stale);
        assert!(!s.copy(EcImage::Rw).unwrap().stale);
    }

    #[test]
    fn span_covering_copy_start_marks_stale() {
        let mut s = session();
        // Starts below RW but reaches into it.
        s.invalidate_overlapping(0xf000, 0x2000);
        assert!(s.copy(EcImage::Ro).unwrap().stale);
        assert!(s.copy(EcImage::Rw).unwrap().stale);
    }

    #[test]
    fn adjacent_span_leaves_copy_fresh() {
        let mut s = session();
        s.invalidate_overlapping(0x20000, 0x1000);
        assert!(!s.copy(EcImage::Ro).unwrap().stale);
        assert!(!s.copy(EcImage::Rw).unwrap().stale);
    }

    #[test]
    fn fresh_target_prefers_ro() {
        let mut s = session();
        assert_eq!(s.fresh_target(), Some(EcImage::Ro));
        s.invalidate_overlapping(0x0, 0x100);
        assert_eq!(s.fresh_target(), Some(EcImage::Rw));
        s.invalidate_overlapping(0x10000, 0x100);
        assert_eq!(s.fresh_target(), None);
    }

    #[test]
    fn second_pass_flag_lifecycle() {
        let mut s = session();
        assert!(!s.needs_second_pass());
        s.request_second_pass();
        assert!(s.needs_second_pass());
        s.begin_second_pass();
        assert!(!s.needs_second_pass());
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = session();
        s.request_second_pass();
        s.reset();
        assert!(s.copy(EcImage::Ro).is_none());
        assert!(!s.needs_second_pass());
    }
}
