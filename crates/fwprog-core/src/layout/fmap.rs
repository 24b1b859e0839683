//! FMAP decoding
//!
//! Chromebook-lineage firmware embeds a flash map structure somewhere
//! in the image: a fixed header followed by an array of area records.
//! Nothing says where, so discovery is a signature scan over the whole
//! image.

use alloc::format;
use alloc::string::{String, ToString};
use zerocopy::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use super::{Layout, LayoutError, LayoutSource, Region};

const FMAP_SIGNATURE: &[u8; 8] = b"__FMAP__";

/// Highest header major version this decoder understands
const FMAP_VER_MAJOR: u8 = 1;

/// FMAP area flags
pub mod flags {
    /// Contents never change at runtime
    pub const STATIC: u16 = 1 << 0;
    /// Contents are compressed
    #[allow(dead_code)]
    pub const COMPRESSED: u16 = 1 << 1;
    /// Area must not be written
    pub const RO: u16 = 1 << 2;
}

/// On-flash FMAP header, all fields little endian
#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct FmapHeader {
    signature: [u8; 8],
    ver_major: u8,
    ver_minor: u8,
    base: U64,
    size: U32,
    name: [u8; 32],
    nareas: U16,
}

/// On-flash FMAP area record
#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct FmapArea {
    offset: U32,
    size: U32,
    name: [u8; 32],
    flags: U16,
}

/// Split `data` into the header and its area records
fn decode(data: &[u8]) -> Result<(&FmapHeader, &[FmapArea]), LayoutError> {
    let (header, rest) =
        FmapHeader::ref_from_prefix(data).map_err(|_| LayoutError::InvalidFmapSignature)?;

    if header.signature != *FMAP_SIGNATURE {
        return Err(LayoutError::InvalidFmapSignature);
    }
    if header.ver_major > FMAP_VER_MAJOR {
        return Err(LayoutError::UnsupportedFmapVersion);
    }

    let (areas, _) = <[FmapArea]>::ref_from_prefix_with_elems(rest, header.nareas.get() as usize)
        .map_err(|_| LayoutError::InvalidFmapSignature)?;

    Ok((header, areas))
}

/// Scan for the first offset that decodes as a valid FMAP
fn find_fmap(data: &[u8]) -> Option<usize> {
    let header_len = core::mem::size_of::<FmapHeader>();
    if data.len() < header_len {
        return None;
    }

    (0..=data.len() - header_len)
        .find(|&offset| data[offset..].starts_with(FMAP_SIGNATURE) && decode(&data[offset..]).is_ok())
}

/// Decode the first FMAP found in `data` into a layout
pub fn parse_fmap(data: &[u8]) -> Result<Layout, LayoutError> {
    let offset = find_fmap(data).ok_or(LayoutError::InvalidFmapSignature)?;
    parse_fmap_at(data, offset)
}

/// Decode the FMAP at a known offset into a layout
///
/// Zero-size areas are dropped; everything else becomes a region, with
/// the STATIC and RO flags both mapping to read-only. Regions come out
/// sorted by start address.
pub fn parse_fmap_at(data: &[u8], offset: usize) -> Result<Layout, LayoutError> {
    let (header, areas) = decode(&data[offset..])?;

    let mut layout = Layout::with_source(LayoutSource::Fmap);
    layout.name = Some(format!(
        "FMAP: {} (v{}.{})",
        fixed_str(&header.name),
        header.ver_major,
        header.ver_minor
    ));

    for area in areas {
        if area.size.get() == 0 {
            continue;
        }

        let mut region = Region::new(fixed_str(&area.name), area.offset.get(), area.size.get());
        region.readonly = area.flags.get() & (flags::STATIC | flags::RO) != 0;
        layout.add_region(region);
    }

    layout.sort_by_address();
    Ok(layout)
}

/// Text of a fixed-width, NUL-padded name field
fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).to_string()
}

/// Whether `data` contains a decodable FMAP
pub fn has_fmap(data: &[u8]) -> bool {
    find_fmap(data).is_some()
}

/// Offset of the FMAP inside `data`, if one decodes
pub fn fmap_offset(data: &[u8]) -> Option<usize> {
    find_fmap(data)
}

impl Layout {
    /// Build a layout from the FMAP embedded in an image
    pub fn from_fmap(data: &[u8]) -> Result<Self, LayoutError> {
        parse_fmap(data)
    }

    /// Build a layout from the FMAP embedded in an image file
    #[cfg(feature = "std")]
    pub fn from_fmap_file(path: impl AsRef<std::path::Path>) -> Result<Self, LayoutError> {
        let data = std::fs::read(path).map_err(|_| LayoutError::IoError)?;
        parse_fmap(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    const FMAP_AT: usize = 0x100;

    fn image_with_fmap() -> Vec<u8> {
        let mut data = vec![0xFF; 0x1000];
        let mut at = FMAP_AT;

        let mut put = |bytes: &[u8], at: &mut usize| {
            data[*at..*at + bytes.len()].copy_from_slice(bytes);
            *at += bytes.len();
        };

        put(FMAP_SIGNATURE, &mut at);
        put(&[1, 0], &mut at); // v1.0
        put(&0u64.to_le_bytes(), &mut at);
        put(&0x1000u32.to_le_bytes(), &mut at);
        let mut name = [0u8; 32];
        name[..9].copy_from_slice(b"TEST_FMAP");
        put(&name, &mut at);
        put(&2u16.to_le_bytes(), &mut at);

        // RO_SECTION at 0, 0x200 bytes, static
        put(&0u32.to_le_bytes(), &mut at);
        put(&0x200u32.to_le_bytes(), &mut at);
        let mut name = [0u8; 32];
        name[..10].copy_from_slice(b"RO_SECTION");
        put(&name, &mut at);
        put(&flags::STATIC.to_le_bytes(), &mut at);

        // RW_SECTION at 0x200, 0xE00 bytes
        put(&0x200u32.to_le_bytes(), &mut at);
        put(&0xE00u32.to_le_bytes(), &mut at);
        let mut name = [0u8; 32];
        name[..10].copy_from_slice(b"RW_SECTION");
        put(&name, &mut at);
        put(&0u16.to_le_bytes(), &mut at);

        data
    }

    #[test]
    fn signature_scan_finds_the_map() {
        let data = image_with_fmap();
        assert_eq!(fmap_offset(&data), Some(FMAP_AT));
        assert!(!has_fmap(&[0xFF; 0x1000]));
    }

    #[test]
    fn areas_become_sorted_regions() {
        let data = image_with_fmap();
        let layout = parse_fmap(&data).unwrap();

        assert!(layout.name.as_ref().unwrap().contains("TEST_FMAP"));
        assert_eq!(layout.regions.len(), 2);

        assert_eq!(layout.regions[0].name, "RO_SECTION");
        assert_eq!(layout.regions[0].start, 0x000);
        assert_eq!(layout.regions[0].size, 0x200);
        assert!(layout.regions[0].readonly);

        assert_eq!(layout.regions[1].name, "RW_SECTION");
        assert_eq!(layout.regions[1].start, 0x200);
        assert_eq!(layout.regions[1].size, 0xE00);
        assert!(!layout.regions[1].readonly);
    }

    #[test]
    fn newer_major_version_is_refused() {
        let mut data = image_with_fmap();
        data[FMAP_AT + 8] = 2;
        assert!(!has_fmap(&data));
        assert_eq!(
            parse_fmap_at(&data, FMAP_AT).unwrap_err(),
            LayoutError::UnsupportedFmapVersion
        );
    }
}
