use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Fields recovered from a Windows PnP device instance id such as
/// `PCI\VEN_8086&DEV_1616&SUBSYS_00000000&REV_09\3&11583659&0&10`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PnpInfo {
    pub bus_type: String,
    pub device_id: Option<String>,
    pub device: Option<String>,
    pub subsystem_id: Option<String>,
}

/// Canonical bus-topology location of one device. Empty strings never appear; a
/// path that could not be decoded is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PathInfo {
    pub pci_path: Option<String>,
    pub acpi_path: Option<String>,
}

impl PathInfo {
    fn from_parts(pci: String, acpi: String) -> Self {
        PathInfo { pci_path: (!pci.is_empty()).then_some(pci), acpi_path: (!acpi.is_empty()).then_some(acpi) }
    }
    pub fn is_empty(&self) -> bool { self.pci_path.is_none() && self.acpi_path.is_none() }
}

fn pad_vendor(v: &str) -> String {
    let v = v.to_uppercase();
    if v.len() < 4 && v.chars().all(|c| c.is_ascii_hexdigit()) { format!("{:0>4}", v) } else { v }
}

fn token_value<'a>(tokens: &[&'a str], prefix: &str) -> Option<&'a str> {
    tokens.iter().copied().find_map(|t| t.get(..prefix.len()).filter(|p| p.eq_ignore_ascii_case(prefix)).map(|_| &t[prefix.len()..])).filter(|v| !v.is_empty())
}

/// `ELAN0662` → `ELAN-0662`, `SYN1B7F` → `SYN-1B7F`. Seven-character tags carry a
/// three-letter vendor, everything else a four-letter one.
pub fn split_device_tag(tag: &str) -> String {
    let idx = if tag.chars().count() == 7 { 3 } else { 4 };
    let at = tag.char_indices().nth(idx).map_or(tag.len(), |(at, _)| at);
    format!("{}-{}", &tag[..at], &tag[at..])
}

fn is_tag_len(tag: &str) -> bool { matches!(tag.chars().count(), 7 | 8) }

/// Decode a PnP instance id. Total: unknown grammars yield only the bus type.
pub fn parse_pnp_id(raw: &str) -> PnpInfo {
    let raw = raw.trim();
    let (bus, rest) = raw.split_once('\\').unwrap_or((raw, ""));
    let tokens: Vec<&str> = rest.split(['\\', '&']).filter(|t| !t.is_empty()).collect();
    let mut info = PnpInfo { bus_type: bus.to_uppercase(), ..Default::default() };
    if let (Some(v), Some(d)) = (token_value(&tokens, "VEN_"), token_value(&tokens, "DEV_")) {
        info.device_id = Some(format!("{}-{}", pad_vendor(v), d.to_uppercase()));
    } else if let (Some(v), Some(p)) = (token_value(&tokens, "VID_"), token_value(&tokens, "PID_")) {
        info.device_id = Some(format!("{}-{}", pad_vendor(v), p.to_uppercase()));
    } else if let Some(first) = tokens.first() {
        if info.bus_type == "HID" {
            info.device_id = Some(if first.chars().count() < 9 { split_device_tag(first) } else { first.to_string() });
        } else if is_tag_len(first) {
            info.device = Some(first.to_string());
        }
    }
    info.subsystem_id = token_value(&tokens, "SUBSYS_").map(|s| s.to_uppercase());
    info
}

/// `PCIROOT(0)#PCI(1C04)#PCI(0000)` → `PciRoot(0x0)/Pci(0x1c,0x4)/Pci(0x0,0x0)`.
pub fn windows_pci_path(raw: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for component in raw.trim().split('#') {
        if let Some(n) = component.strip_prefix("PCIROOT(").and_then(|s| s.strip_suffix(')')) {
            if let Ok(n) = n.parse::<u32>() { out.push(format!("PciRoot(0x{:x})", n)); }
        } else if let Some(v) = component.strip_prefix("PCI(").and_then(|s| s.strip_suffix(')')) {
            if v.len() == 4 && v.is_char_boundary(2) {
                if let (Ok(bus), Ok(dev)) = (u32::from_str_radix(&v[..2], 16), u32::from_str_radix(&v[2..], 16)) { out.push(format!("Pci(0x{:x},0x{:x})", bus, dev)); }
            } else if let Ok(f) = u32::from_str_radix(v, 16) {
                out.push(format!("Pci(0x{:x})", f));
            }
        }
    }
    out.join("/")
}

/// `ACPI(_SB_)#ACPI(PCI0)#ACPI(GFX0)` → `\_SB.PCI0.GFX0`. Mixed PCI/ACPI paths decode to nothing.
pub fn windows_acpi_path(raw: &str) -> String {
    if raw.contains("PCI(") { return String::new(); }
    let mut out: Vec<String> = Vec::new();
    for component in raw.trim().split('#') {
        let Some(id) = component.strip_prefix("ACPI(").and_then(|s| s.strip_suffix(')')) else { continue };
        if id.is_empty() || !id.chars().all(|c| c.is_alphanumeric() || c == '_') { continue; }
        if out.is_empty() {
            let mut scope = id.to_string();
            scope.pop();
            out.push(format!("\\{}", scope));
        } else {
            out.push(id.to_string());
        }
    }
    out.join(".")
}

fn slot_regex() -> Option<&'static Regex> {
    static SLOT: OnceLock<Option<Regex>> = OnceLock::new();
    SLOT.get_or_init(|| Regex::new(r"^([0-9a-f]{4}):([0-9a-f]{2}):([0-9a-f]{2})\.([0-7])$").ok()).as_ref()
}

/// `0000:02:1f.3` → `(domain, bus, device, function)`.
pub fn parse_pci_slot(name: &str) -> Option<(u32, u32, u32, u32)> {
    let cap = slot_regex()?.captures(name)?;
    let hex = |i: usize| u32::from_str_radix(&cap[i], 16).ok();
    Some((hex(1)?, hex(2)?, hex(3)?, hex(4)?))
}

pub fn is_pci_slot(name: &str) -> bool { parse_pci_slot(name).is_some() }

/// Build the PCI path from the PCI-slot-named components of a canonical sysfs
/// device path, e.g. `/sys/devices/pci0000:00/0000:00:1c.0/0000:02:00.0`.
/// Hops run from the root bridge down to the device, matching `windows_pci_path`.
pub fn sysfs_pci_path(canonical: &Path) -> String {
    let mut slots: Vec<&str> = canonical.components().filter_map(|c| c.as_os_str().to_str()).filter(|c| is_pci_slot(c)).collect();
    let Some((domain, ..)) = slots.first().and_then(|s| parse_pci_slot(s)) else { return String::new() };
    slots.dedup();
    let mut out = vec![format!("PciRoot(0x{:x})", domain)];
    for (_, _, dev, func) in slots.iter().filter_map(|s| parse_pci_slot(s)) {
        out.push(format!("Pci(0x{:x},0x{:x})", dev, func));
    }
    out.join("/")
}

/// Location path lookup, chosen once per run for the platform being collected.
#[derive(Clone, Debug)]
pub enum LocationPathResolver {
    /// Input is the `DEVPKEY_Device_LocationPaths` value, one path per line.
    Windows,
    /// Input is a device directory inside the sysfs tree under `root`.
    Linux { root: PathBuf },
}

impl LocationPathResolver {
    pub fn resolve(&self, raw: &str) -> PathInfo {
        match self {
            LocationPathResolver::Windows => {
                let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
                match (lines.first(), lines.last()) {
                    (Some(first), Some(last)) => PathInfo::from_parts(windows_pci_path(first), windows_acpi_path(last)),
                    _ => PathInfo::default(),
                }
            }
            LocationPathResolver::Linux { root } => {
                let dir = Path::new(raw);
                let dir = if dir.is_absolute() { dir.to_path_buf() } else { root.join(dir) };
                let pci = match std::fs::canonicalize(&dir) {
                    Ok(c) => sysfs_pci_path(&c),
                    Err(e) => { log::debug!("cannot canonicalize {}: {}", dir.display(), e); String::new() }
                };
                let acpi = std::fs::read_to_string(dir.join("firmware_node").join("path")).map(|s| s.trim().to_string()).unwrap_or_default();
                PathInfo::from_parts(pci, acpi)
            }
        }
    }
}
