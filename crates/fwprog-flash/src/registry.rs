//! Opening programmers by name
//!
//! Maps a `name:key=value,...` specification to a live [`FlashHandle`].
//! `SpiBus` and `OpaqueProgrammer` never cross this boundary; callers
//! only ever see the handle.

use crate::handle::{ChipInfo, FlashHandle};
#[allow(unused_imports)] // used from feature-gated paths
use fwprog_core::flash::FlashDevice;
use std::collections::HashMap;

/// Probe the chip on `bus` and wrap the pair in a handle
#[cfg(feature = "dummy")]
fn probe_on_bus<B>(bus: B) -> Result<FlashHandle, Box<dyn std::error::Error>>
where
    B: fwprog_core::programmer::SpiBus + 'static,
{
    use fwprog_core::flash::{probe, SpiFlashDevice};

    let mut bus = bus;
    let probed = probe(&mut bus)?;

    log::info!(
        "found {} {} ({} bytes)",
        probed.chip.vendor,
        probed.chip.name,
        probed.chip.total_size
    );

    let chip_info = ChipInfo::from(&probed);
    let device = SpiFlashDevice::new(bus, probed);
    Ok(FlashHandle::with_chip_info(Box::new(device), chip_info))
}

/// A programmer specification split into name and options
pub struct ProgrammerParams {
    /// Canonical programmer name
    pub name: String,
    /// The key=value options that followed it
    pub params: HashMap<String, String>,
}

/// Split `"name"` or `"name:key1=value1,key2=value2"` into its parts
///
/// ```ignore
/// let params = parse_programmer_params("ec:dev=1")?;
/// assert_eq!(params.name, "ec");
/// assert_eq!(params.params.get("dev"), Some(&"1".to_string()));
/// ```
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    for opt in opts.split(',').filter(|o| !o.is_empty()) {
        let (key, value) = opt
            .split_once('=')
            .ok_or_else(|| format!("malformed option '{}', expected key=value", opt))?;
        params.insert(key.to_string(), value.to_string());
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match value {
        "yes" | "on" | "1" | "true" => Ok(true),
        "no" | "off" | "0" | "false" => Ok(false),
        other => Err(format!("{}={} is not a yes/no value", key, other).into()),
    }
}

/// Open the programmer a specification names and hand back its flash
///
/// Parses the specification, opens the matching programmer, probes the
/// chip where the transport allows it and wraps everything in a
/// [`FlashHandle`].
pub fn open_flash(programmer: &str) -> Result<FlashHandle, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params),

        #[cfg(feature = "ec")]
        "ec" => open_ec(&params),

        _ => Err(format!("unknown programmer: {}", params.name).into()),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &ProgrammerParams) -> Result<FlashHandle, Box<dyn std::error::Error>> {
    use fwprog_dummy::{DummyConfig, DummyFlash};

    let mut config = DummyConfig::default();
    if let Some(value) = params.params.get("hwwp") {
        config.wp_pin_asserted = parse_bool("hwwp", value)?;
    }

    probe_on_bus(DummyFlash::new(config))
}

#[cfg(feature = "ec")]
fn open_ec(params: &ProgrammerParams) -> Result<FlashHandle, Box<dyn std::error::Error>> {
    use fwprog_ec::{EcConfig, EcFlashDevice, EcProtocolVersion, MockEc};

    let mut config = EcConfig::default();
    if let Some(value) = params.params.get("dev") {
        config.dev_index = value
            .parse()
            .map_err(|_| format!("bad dev index: '{}'", value))?;
    }
    if let Some(value) = params.params.get("latest") {
        config.try_latest_firmware = parse_bool("latest", value)?;
    }

    let version = match params.params.get("proto").map(String::as_str) {
        None => EcProtocolVersion::V3Packet,
        Some("0") => EcProtocolVersion::V0Legacy,
        Some("1") => EcProtocolVersion::V1Args,
        Some("3") => EcProtocolVersion::V3Packet,
        Some(other) => {
            return Err(format!("bad proto value: '{}' (expected 0, 1 or 3)", other).into())
        }
    };

    let transport = MockEc::new(version);
    let device = EcFlashDevice::open(transport, config)
        .map_err(|e| format!("cannot open EC: {}", e))?;

    Ok(FlashHandle::without_chip_info(Box::new(device)))
}

/// One entry in the programmer listing
pub struct ProgrammerInfo {
    /// Name the specification matches on
    pub name: &'static str,
    /// Accepted aliases
    pub aliases: &'static [&'static str],
    /// One-line description with the options it takes
    pub description: &'static str,
}

/// The programmers this build was compiled with
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory flash emulator for testing (hwwp=<yes|no>)",
    });

    #[cfg(feature = "ec")]
    programmers.push(ProgrammerInfo {
        name: "ec",
        aliases: &[],
        description: "Emulated EC host command interface (dev=<index>, proto=<0|1|3>, latest=<yes|no>)",
    });

    programmers
}

/// Comma-joined programmer names for help text
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    if programmers.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

#[cfg(all(test, feature = "is_sync"))]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bare_name() {
        let params = parse_programmer_params("dummy").unwrap();
        assert_eq!(params.name, "dummy");
        assert!(params.params.is_empty());
    }

    #[test]
    fn parses_key_value_parameters() {
        let params = parse_programmer_params("ec:dev=1,proto=3").unwrap();
        assert_eq!(params.name, "ec");
        assert_eq!(params.params.get("dev"), Some(&"1".to_string()));
        assert_eq!(params.params.get("proto"), Some(&"3".to_string()));
    }

    #[test]
    fn rejects_parameters_without_a_value() {
        assert!(parse_programmer_params("dummy:hwwp").is_err());
    }

    #[test]
    fn unknown_programmers_are_rejected() {
        assert!(open_flash("no-such-programmer").is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn dummy_probes_and_round_trips() {
        let mut handle = open_flash("dummy").unwrap();
        let info = *handle.chip_info().expect("dummy probes a chip");
        assert_eq!(info.vendor, "Winbond");
        assert_eq!(info.name, "W25Q32");
        assert_eq!(handle.size(), 4 * 1024 * 1024);

        handle.write(0x1000, &[0x5a; 16]).unwrap();
        let mut buf = [0u8; 16];
        handle.read(0x1000, &mut buf).unwrap();
        assert_eq!(buf, [0x5a; 16]);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn dummy_manages_write_protection() {
        use fwprog_core::wp::WpRange;

        let mut handle = open_flash("dummy").unwrap();
        assert!(handle.wp_supported());
        let ranges = handle.list_wp_ranges().unwrap();
        assert!(ranges.contains(&WpRange::none()));
        assert!(ranges.contains(&WpRange::new(0, 4 * 1024 * 1024)));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn dummy_rejects_bad_hwwp_values() {
        assert!(open_flash("dummy:hwwp=maybe").is_err());
    }

    #[cfg(feature = "ec")]
    #[test]
    fn ec_opens_without_chip_info() {
        let handle = open_flash("ec:proto=1").unwrap();
        assert!(handle.chip_info().is_none());
        assert_eq!(handle.size(), 0x20000);
    }

    #[cfg(feature = "ec")]
    #[test]
    fn ec_rejects_bad_proto_values() {
        assert!(open_flash("ec:proto=2").is_err());
    }
}
