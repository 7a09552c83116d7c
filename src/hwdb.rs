use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
pub struct Vendor {
    pub name: String,
    pub devices: HashMap<String, String>,
}

/// An in-memory `pci.ids` / `usb.ids` database. Keys are lowercase hex.
#[derive(Clone, Debug, Default)]
pub struct IdsDatabase {
    vendors: HashMap<String, Vendor>,
}

fn is_hex4(s: &str) -> bool { s.len() == 4 && s.chars().all(|c| c.is_ascii_hexdigit()) }

impl IdsDatabase {
    /// Vendor lines start at column 0, device lines with one tab; deeper lines
    /// (subsystems, interfaces) and the trailing class sections are ignored.
    pub fn parse(text: &str) -> Self {
        let mut vendors: HashMap<String, Vendor> = HashMap::new();
        let mut current: Option<String> = None;
        for line in text.lines() {
            if line.starts_with('#') || line.trim().is_empty() { continue; }
            if line.starts_with("\t\t") { continue; }
            if let Some(dev) = line.strip_prefix('\t') {
                let Some(vendor) = current.as_ref() else { continue };
                if let Some((id, name)) = dev.split_once(char::is_whitespace)
                    && is_hex4(id)
                    && let Some(v) = vendors.get_mut(vendor) {
                    v.devices.insert(id.to_lowercase(), name.trim().to_string());
                }
                continue;
            }
            match line.split_once(char::is_whitespace) {
                Some((id, name)) if is_hex4(id) => {
                    let key = id.to_lowercase();
                    vendors.insert(key.clone(), Vendor { name: name.trim().to_string(), devices: HashMap::new() });
                    current = Some(key);
                }
                _ => current = None,
            }
        }
        IdsDatabase { vendors }
    }

    pub fn vendor_name(&self, vendor: &str) -> Option<&str> {
        self.vendors.get(&vendor.to_lowercase()).map(|v| v.name.as_str())
    }

    /// Device name for a `VVVV-DDDD` identifier.
    pub fn device_name(&self, id: &str) -> Option<&str> {
        let (vendor, device) = id.split_once('-')?;
        self.vendors.get(&vendor.to_lowercase())?.devices.get(&device.to_lowercase()).map(String::as_str)
    }

    /// `"<vendor> <device>"`, the way `lspci`/`lsusb` print a device.
    pub fn full_name(&self, id: &str) -> Option<String> {
        let (vendor, _) = id.split_once('-')?;
        let device = self.device_name(id)?;
        Some(match self.vendor_name(vendor) { Some(v) => format!("{} {}", v, device), None => device.to_string() })
    }

    pub fn is_empty(&self) -> bool { self.vendors.is_empty() }
}

pub const PCI_IDS_ENV: &str = "HWSNIFFER_PCI_IDS";
pub const USB_IDS_ENV: &str = "HWSNIFFER_USB_IDS";

const PCI_IDS_DEFAULTS: &[&str] = &["/usr/share/hwdata/pci.ids", "/usr/share/misc/pci.ids", "pci.ids"];
const USB_IDS_DEFAULTS: &[&str] = &["/usr/share/hwdata/usb.ids", "/usr/share/misc/usb.ids", "usb.ids"];

fn load(path_opt: Option<&Path>, env: &str, defaults: &[&str]) -> Option<IdsDatabase> {
    let candidates: Vec<PathBuf> = match path_opt.map(Path::to_path_buf).or_else(|| std::env::var_os(env).map(PathBuf::from)) {
        Some(p) => vec![p],
        None => defaults.iter().map(PathBuf::from).collect(),
    };
    for p in &candidates {
        match std::fs::read(p) {
            Ok(data) => {
                let db = IdsDatabase::parse(&String::from_utf8_lossy(&data));
                log::debug!("loaded {} vendors from {}", db.vendors.len(), p.display());
                return Some(db);
            }
            Err(e) => log::debug!("ids database {} unavailable: {}", p.display(), e),
        }
    }
    log::warn!("No {} database found; device names will fall back to the platform", if env == PCI_IDS_ENV { "PCI ID" } else { "USB ID" });
    None
}

pub fn load_pci_ids(path_opt: Option<&Path>) -> Option<IdsDatabase> { load(path_opt, PCI_IDS_ENV, PCI_IDS_DEFAULTS) }

pub fn load_usb_ids(path_opt: Option<&Path>) -> Option<IdsDatabase> { load(path_opt, USB_IDS_ENV, USB_IDS_DEFAULTS) }
