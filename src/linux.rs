use crate::classify;
use crate::edid;
use crate::error::{CollectError, CollectResult};
use crate::hwdb::IdsDatabase;
use crate::locator::LocationPathResolver;
use crate::report::{self, Bios, Collector, Cpu, DeviceInfo, Gpu, Monitor, Motherboard, Section};
use crate::tables;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PCI_DEVICES: &str = "sys/bus/pci/devices";
const DMI: &str = "sys/class/dmi/id";
const SECURE_BOOT_VAR: &str = "sys/firmware/efi/efivars/SecureBoot-8be4df61-93ca-11d2-aa0d-00e098032b8c";

/// PCI classes that have their own category or are handled through another class tree.
const SKIPPED_PCI_CLASSES: &[&str] = &["Network controller", "Display controller", "VGA compatible controller", "3D controller"];
const NOT_SYSTEM_CLASSES: &[&str] = &["USB controller", "VGA compatible controller", "3D controller", "Non-Volatile memory controller", "SATA controller"];

fn read_value(p: &Path) -> Option<String> {
    fs::read_to_string(p).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn require(p: &Path) -> CollectResult<String> {
    let s = fs::read_to_string(p).map_err(|e| CollectError::read(p, e))?;
    let s = s.trim();
    if s.is_empty() { return Err(CollectError::Malformed(format!("{} is empty", p.display()))); }
    Ok(s.to_string())
}

fn strip_hex(s: &str) -> &str { s.trim().trim_start_matches("0x").trim_start_matches("0X") }

fn pad4(s: &str) -> String { format!("{:0>4}", s.trim()).to_uppercase() }

/// Sorted `(name, path)` entries of a sysfs class directory. A missing directory
/// means the subsystem does not exist on this machine.
fn entries(dir: &Path) -> CollectResult<Vec<(String, PathBuf)>> {
    let rd = fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CollectError::CategoryUnavailable(dir.display().to_string()),
        _ => CollectError::read(dir, e),
    })?;
    let mut out: Vec<(String, PathBuf)> = rd.filter_map(Result::ok).map(|de| (de.file_name().to_string_lossy().into_owned(), de.path())).collect();
    out.sort();
    Ok(out)
}

/// Paths below `dir` whose name satisfies `pred`, sorted. Symlinks are reported but never descended into.
fn find(dir: &Path, max_depth: usize, want_dir: bool, pred: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = WalkDir::new(dir).min_depth(1).max_depth(max_depth).follow_links(false).into_iter().filter_map(Result::ok)
        .filter(|de| de.file_name().to_str().is_some_and(|n| !n.starts_with('.') && pred(n)))
        .filter(|de| if want_dir { de.path().is_dir() } else { de.path().is_file() })
        .map(walkdir::DirEntry::into_path)
        .collect();
    out.sort();
    out
}

/// Identifiers carried by a sysfs `uevent` file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Uevent {
    pub bus_type: Option<String>,
    pub vendor: Option<String>,
    pub device: Option<String>,
    pub subsystem_id: Option<String>,
    pub slot: Option<String>,
}

impl Uevent {
    pub fn device_id(&self) -> Option<String> { Some(format!("{}-{}", self.vendor.as_ref()?, self.device.as_ref()?)) }
}

/// `PCI_ID`, `PCI_SUBSYS_ID`, `PCI_SLOT_NAME`, USB `PRODUCT` and `MODALIAS`. Once a
/// PCI or USB bus has been seen, later modaliases do not replace it.
pub fn parse_uevent(text: &str) -> Uevent {
    let mut u = Uevent::default();
    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else { continue };
        match key {
            "PCI_ID" => if let Some((v, d)) = value.split_once(':') { u.vendor = Some(pad4(v)); u.device = Some(pad4(d)); },
            "PCI_SUBSYS_ID" => if let Some((sv, sd)) = value.split_once(':') { u.subsystem_id = Some(format!("{}{}", pad4(sd), pad4(sv))); },
            "PCI_SLOT_NAME" => u.slot = Some(value.trim().to_string()),
            "PRODUCT" if u.vendor.is_none() => {
                let mut parts = value.split('/');
                if let (Some(v), Some(p)) = (parts.next(), parts.next()) { u.vendor = Some(pad4(v)); u.device = Some(pad4(p)); }
            }
            "MODALIAS" => {
                if !matches!(u.bus_type.as_deref(), Some("PCI") | Some("USB")) {
                    u.bus_type = value.split(':').next().map(str::to_uppercase).filter(|b| !b.is_empty());
                }
            }
            _ => {}
        }
    }
    u
}

/// `(start, end)` pairs of a PCI `resource` file; unparsable lines are skipped.
pub fn parse_resource(text: &str) -> Vec<(u64, u64)> {
    text.lines().filter_map(|line| {
        let mut it = line.split_whitespace();
        let start = u64::from_str_radix(strip_hex(it.next()?), 16).ok()?;
        let end = u64::from_str_radix(strip_hex(it.next()?), 16).ok()?;
        Some((start, end))
    }).collect()
}

/// `(name, class)` from `lspci -vmm -s <slot>`; the class drops any `[xxxx]` suffix.
pub fn parse_lspci_vmm(output: &str) -> (Option<String>, Option<String>) {
    let (mut class, mut vendor, mut device) = (None, None, None);
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else { continue };
        let value = value.trim();
        if value.is_empty() { continue; }
        match key.trim() {
            "Class" if class.is_none() => class = value.split('[').next().map(|c| c.trim().to_string()),
            "Vendor" if vendor.is_none() => vendor = Some(value.to_string()),
            "Device" if device.is_none() => device = Some(value.to_string()),
            _ => {}
        }
    }
    let name = [vendor, device].into_iter().flatten().collect::<Vec<_>>().join(" ");
    ((!name.is_empty()).then_some(name), class)
}

/// Device name from `lsusb -v -d vvvv:pppp`: vendor string followed by product string.
pub fn parse_lsusb_verbose(output: &str) -> Option<String> {
    let (mut vendor, mut product) = (None, None);
    for line in output.lines() {
        let mut words = line.split_whitespace();
        let Some(key) = words.next() else { continue };
        let value = words.skip(1).collect::<Vec<_>>().join(" ");
        if value.is_empty() { continue; }
        match key {
            "idVendor" => vendor = Some(value),
            "idProduct" | "iProduct" => product = Some(value),
            _ => {}
        }
    }
    let name = [vendor, product].into_iter().flatten().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

/// Processor name, codename key and counts from `/proc/cpuinfo`.
pub fn parse_cpuinfo(text: &str) -> CollectResult<Cpu> {
    let (mut vendor, mut family, mut model, mut name, mut stepping, mut flags) = (None, None, None, None, None, None);
    let mut cores = 0usize;
    let mut max_physical: Option<usize> = None;
    for block in text.split("\n\n").filter(|b| !b.trim().is_empty()) {
        cores += 1;
        for line in block.lines() {
            let Some((key, value)) = line.split_once(':') else { continue };
            let value = value.trim().to_string();
            let slot = match key.trim() {
                "vendor_id" => &mut vendor,
                "cpu family" => &mut family,
                "model" => &mut model,
                "model name" => &mut name,
                "stepping" => &mut stepping,
                "flags" => &mut flags,
                "physical id" => {
                    if let Ok(id) = value.parse::<usize>() { max_physical = Some(max_physical.map_or(id, |m| m.max(id))); }
                    continue;
                }
                _ => continue,
            };
            if slot.is_none() { *slot = Some(value); }
        }
    }
    let (Some(vendor), Some(family), Some(model), Some(name), Some(stepping), Some(flags)) = (vendor, family, model, name, stepping, flags) else {
        return Err(CollectError::Malformed("incomplete /proc/cpuinfo".into()));
    };
    let processor_name = name.split("with").next().unwrap_or("").split('@').next().unwrap_or("").replace(" CPU", "").trim().to_string();
    Ok(Cpu {
        manufacturer: classify::cpu_manufacturer(&vendor),
        codename: classify::cpu_codename(&processor_name, &classify::cpu_key(&family, &model, &stepping)),
        processor_name,
        core_count: classify::zero_pad(cores),
        cpu_count: classify::zero_pad(max_physical.map_or(1, |m| m + 1)),
        simd_features: classify::simd_from_flags(&flags),
    })
}

/// `BUS_*` codes from `linux/input.h` that describe physical devices.
fn input_bus(code: u16) -> Option<&'static str> {
    match code {
        0x03 => Some("USB"),
        0x05 => Some("Bluetooth"),
        0x11 => Some("PS/2"),
        0x18 => Some("I2C"),
        _ => None,
    }
}

#[derive(Clone, Debug)]
struct PciDevice {
    name: String,
    dir: PathBuf,
    info: DeviceInfo,
}

pub struct LinuxCollector {
    root: PathBuf,
    resolver: LocationPathResolver,
    pci_ids: Option<IdsDatabase>,
    usb_ids: Option<IdsDatabase>,
    use_tools: bool,
    by_class: BTreeMap<String, Vec<PciDevice>>,
    /// PCI slots already reported under Network.
    network_slots: HashSet<String>,
}

impl LinuxCollector {
    /// `lspci`/`lsusb` are consulted only when collecting the live root.
    pub fn new(root: impl Into<PathBuf>, pci_ids: Option<IdsDatabase>, usb_ids: Option<IdsDatabase>) -> Self {
        let root = root.into();
        let use_tools = root == Path::new("/");
        LinuxCollector { resolver: LocationPathResolver::Linux { root: root.clone() }, root, pci_ids, usb_ids, use_tools, by_class: BTreeMap::new(), network_slots: HashSet::new() }
    }

    fn path(&self, rel: &str) -> PathBuf { self.root.join(rel) }

    fn tool(&self, program: &str, args: &[&str]) -> Option<String> {
        if !self.use_tools { return None; }
        match std::process::Command::new(program).args(args).output() {
            Ok(o) if o.status.success() => Some(String::from_utf8_lossy(&o.stdout).into_owned()),
            Ok(o) => { log::debug!("{} {:?} exited with {}", program, args, o.status); None }
            Err(e) => { log::debug!("{} unavailable: {}", program, e); None }
        }
    }

    fn pci_name(&self, slot: Option<&str>, id: &str) -> String {
        slot.and_then(|s| self.tool("lspci", &["-vmm", "-s", s])).and_then(|o| parse_lspci_vmm(&o).0)
            .or_else(|| self.pci_ids.as_ref().and_then(|db| db.full_name(id)))
            .unwrap_or_else(|| tables::UNKNOWN.to_string())
    }

    fn usb_name(&self, id: &str) -> Option<String> {
        let (v, p) = id.split_once('-')?;
        self.tool("lsusb", &["-v", "-d", &format!("{}:{}", v.to_lowercase(), p.to_lowercase())]).and_then(|o| parse_lsusb_verbose(&o))
            .or_else(|| self.usb_ids.as_ref().and_then(|db| db.full_name(id)))
    }

    fn pci_class(&self, dir: &Path, slot: &str) -> String {
        read_value(&dir.join("class")).and_then(|c| u32::from_str_radix(strip_hex(&c), 16).ok()).and_then(|c| tables::pci_class_name(c >> 8)).map(str::to_string)
            .or_else(|| self.tool("lspci", &["-vmm", "-s", slot]).and_then(|o| parse_lspci_vmm(&o).1))
            .unwrap_or_else(|| tables::UNKNOWN.to_string())
    }

    fn read_pci_device(&self, slot: &str, dir: &Path) -> CollectResult<(String, PciDevice)> {
        let vendor = require(&dir.join("vendor"))?;
        let device = require(&dir.join("device"))?;
        let id = format!("{}-{}", strip_hex(&vendor), strip_hex(&device)).to_uppercase();
        let subsystem_id = match (read_value(&dir.join("subsystem_vendor")), read_value(&dir.join("subsystem_device"))) {
            (Some(sv), Some(sd)) => Some(format!("{}{}", strip_hex(&sd), strip_hex(&sv)).to_uppercase()),
            _ => None,
        };
        let info = DeviceInfo { bus_type: Some("PCI".into()), device_id: Some(id.clone()), subsystem_id, ..Default::default() }
            .with_paths(self.resolver.resolve(&dir.to_string_lossy()));
        Ok((self.pci_class(dir, slot), PciDevice { name: self.pci_name(Some(slot), &id), dir: dir.to_path_buf(), info }))
    }

    fn pci_group(&self, classes: &[&str]) -> Vec<&PciDevice> {
        classes.iter().filter_map(|c| self.by_class.get(*c)).flatten().collect()
    }

    fn dmi(&self, name: &str) -> Option<String> { read_value(&self.path(DMI).join(name)) }

    /// Entries of a class directory whose `device/uevent` carries a PCI identity.
    fn pci_uevent_devices(&self, category: &str, class_dir: &str, slots: &mut HashSet<String>) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        for (name, dir) in entries(&self.path(class_dir))? {
            let Some(u) = report::skip_failed(category, &name, require(&dir.join("device").join("uevent")).map(|t| parse_uevent(&t))) else { continue };
            let Some(id) = u.device_id() else { log::debug!("{}: {} has no PCI identity", category, name); continue };
            let info = DeviceInfo { bus_type: u.bus_type.clone(), device_id: Some(id.clone()), subsystem_id: u.subsystem_id.clone(), ..Default::default() }
                .with_paths(self.resolver.resolve(&dir.join("device").to_string_lossy()));
            out.insert_unique(&self.pci_name(u.slot.as_deref(), &id), info);
            if let Some(slot) = u.slot { slots.insert(slot); }
        }
        Ok(out)
    }
}

impl Collector for LinuxCollector {
    fn pci_devices(&mut self) -> CollectResult<()> {
        self.by_class.clear();
        self.network_slots.clear();
        let mut grouped: BTreeMap<String, Vec<PciDevice>> = BTreeMap::new();
        for (slot, dir) in entries(&self.path(PCI_DEVICES))? {
            let Some((class, dev)) = report::skip_failed("PCI devices", &slot, self.read_pci_device(&slot, &dir)) else { continue };
            if SKIPPED_PCI_CLASSES.contains(&class.as_str()) { continue; }
            grouped.entry(class).or_default().push(dev);
        }
        log::debug!("grouped PCI devices into {} classes", grouped.len());
        self.by_class = grouped;
        Ok(())
    }

    fn motherboard(&mut self) -> CollectResult<Motherboard> {
        if !self.path(DMI).is_dir() { return Err(CollectError::CategoryUnavailable(DMI.into())); }
        let get = |n: &str| self.dmi(n).unwrap_or_default();
        let name = classify::system_name(&get("sys_vendor"), &get("product_name"), &get("board_vendor"), &get("board_name"));
        let bridges: Vec<&str> = self.pci_group(&["ISA bridge"]).into_iter().filter_map(|d| d.info.device_id.as_deref()).collect();
        let chipset = classify::chipset(bridges, &name);
        Ok(Motherboard { chipset, platform: classify::platform(self.dmi("chassis_type").as_deref()), name })
    }

    fn bios(&mut self) -> CollectResult<Bios> {
        if !self.path(DMI).is_dir() { return Err(CollectError::CategoryUnavailable(DMI.into())); }
        let secure_boot = fs::read(self.path(SECURE_BOOT_VAR)).ok().and_then(|b| b.last().copied()) == Some(1);
        let above_4g = self.by_class.values().flatten()
            .filter_map(|d| fs::read_to_string(d.dir.join("resource")).ok())
            .any(|r| parse_resource(&r).iter().any(|&(_, end)| end >= 1u64 << 32));
        Ok(Bios {
            version: self.dmi("bios_version").unwrap_or_else(|| tables::UNKNOWN.into()),
            release_date: self.dmi("bios_date").unwrap_or_else(|| tables::UNKNOWN.into()),
            firmware_type: if self.path("sys/firmware/efi").exists() { "UEFI".into() } else { "BIOS".into() },
            secure_boot: report::enabled(secure_boot),
            above_4g_decoding: report::enabled(above_4g),
        })
    }

    fn cpu(&mut self) -> CollectResult<Cpu> {
        parse_cpuinfo(&require(&self.path("proc/cpuinfo"))?)
    }

    fn gpu(&mut self) -> CollectResult<Section<Gpu>> {
        let mut out = Section::new();
        for (card, dir) in entries(&self.path("sys/class/drm"))? {
            if !card.contains("card") || card.contains('-') { continue; }
            let device_dir = dir.join("device");
            let Some(u) = report::skip_failed("GPU", &card, require(&device_dir.join("uevent")).map(|t| parse_uevent(&t))) else { continue };
            let (Some(bus), Some(id)) = (u.bus_type.clone(), u.device_id()) else { log::debug!("GPU: {} has no PCI identity", card); continue };
            let class = classify::classify_gpu(&id);
            let paths = self.resolver.resolve(&device_dir.to_string_lossy());
            let ranges = fs::read_to_string(device_dir.join("resource")).map(|r| parse_resource(&r)).unwrap_or_default();
            out.insert_unique(&self.pci_name(u.slot.as_deref(), &id), Gpu {
                manufacturer: class.manufacturer,
                codename: class.codename,
                bus_type: Some(bus),
                device_id: class.device_id,
                device_type: class.device_type,
                subsystem_id: u.subsystem_id,
                pci_path: paths.pci_path,
                acpi_path: paths.acpi_path,
                resizable_bar: report::enabled(ranges.iter().any(|&(s, e)| report::spans_4g(s, e))),
                source: device_dir.to_string_lossy().into_owned(),
            });
        }
        Ok(out)
    }

    fn monitor(&mut self, gpus: &Section<Gpu>) -> CollectResult<Section<Monitor>> {
        let mut out = Section::new();
        for (gpu_name, gpu) in gpus.iter() {
            for edid_path in find(Path::new(&gpu.source), usize::MAX, false, |n| n == "edid") {
                let Some(connector_dir) = edid_path.parent() else { continue };
                if read_value(&connector_dir.join("status")).as_deref() != Some("connected") { continue; }
                let name = fs::read(&edid_path).ok().and_then(|b| edid::decode(&b).monitor_name()).unwrap_or_else(|| tables::UNKNOWN.to_string());
                let (w, h) = read_value(&connector_dir.join("modes")).unwrap_or_default().lines()
                    .filter_map(|m| { let (w, h) = m.trim().split_once('x')?; Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)) })
                    .fold((0u32, 0u32), |(mw, mh), (w, h)| (mw.max(w), mh.max(h)));
                let dir_name = connector_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                let parts: Vec<&str> = dir_name.split('-').collect();
                let connector = if parts.len() > 2 { parts[1..parts.len() - 1].join("-") } else { "Uninitialized".to_string() };
                out.insert_unique(&name, Monitor { connector_type: connector, resolution: format!("{}x{}", w, h), connected_gpu: Some(gpu_name.to_string()) });
            }
        }
        Ok(out)
    }

    fn network(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut slots = HashSet::new();
        let out = self.pci_uevent_devices("Network", "sys/class/net", &mut slots)?;
        self.network_slots = slots;
        Ok(out)
    }

    fn sound(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        for (card, dir) in entries(&self.path("sys/class/sound"))? {
            if !card.contains("card") { continue; }
            let device_dir = dir.join("device");
            let ids = require(&device_dir.join("vendor")).and_then(|v| Ok((v, require(&device_dir.join("device"))?)));
            let Some((vendor, device)) = report::skip_failed("Sound", &card, ids) else { continue };
            let controller = format!("{}-{}", strip_hex(&vendor), strip_hex(&device)).to_uppercase();
            for codec in find(&device_dir, usize::MAX, true, |n| n.contains("hdaudio")) {
                let (Some(vendor_id), Some(subsystem)) = (read_value(&codec.join("vendor_id")), read_value(&codec.join("subsystem_id"))) else { continue };
                let vendor_id = strip_hex(&vendor_id).to_uppercase();
                let device_id = match vendor_id.char_indices().nth(4) { Some((at, _)) => format!("{}-{}", &vendor_id[..at], &vendor_id[at..]), None => vendor_id.clone() };
                let name = match (read_value(&codec.join("vendor_name")), read_value(&codec.join("chip_name"))) {
                    (Some(v), Some(c)) => format!("{} {}", v, c),
                    (None, Some(c)) => c,
                    _ => tables::UNKNOWN.to_string(),
                };
                let bus_type = read_value(&codec.join("modalias")).and_then(|m| m.split(':').next().map(str::to_uppercase));
                out.insert_unique(&name, DeviceInfo {
                    bus_type,
                    device_id: Some(device_id),
                    subsystem_id: Some(strip_hex(&subsystem).to_uppercase()),
                    controller_device_id: Some(controller.clone()),
                    ..Default::default()
                });
            }
        }
        Ok(out)
    }

    fn usb_controllers(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        for d in self.pci_group(&["USB controller"]) { out.insert_unique(&d.name, d.info.clone()); }
        Ok(out)
    }

    fn input(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (entry, dir) in entries(&self.path("sys/class/input"))? {
            if !entry.starts_with("input") { continue; }
            let id_dir = dir.join("id");
            let Some(bus) = read_value(&id_dir.join("bustype")).and_then(|b| u16::from_str_radix(strip_hex(&b), 16).ok()).and_then(input_bus) else {
                log::debug!("Input: skipping {} (virtual or unknown bus)", entry);
                continue;
            };
            let mut name = read_value(&dir.join("name")).unwrap_or_else(|| tables::UNKNOWN.to_string());
            let device_id = match (read_value(&id_dir.join("vendor")), read_value(&id_dir.join("product"))) {
                (Some(v), Some(p)) if bus != "PS/2" => Some(format!("{}-{}", pad4(strip_hex(&v)), pad4(strip_hex(&p)))),
                _ => None,
            };
            if !seen.insert(device_id.clone().unwrap_or_else(|| name.clone())) { continue; }
            if bus == "USB" && let Some(n) = device_id.as_deref().and_then(|id| self.usb_ids.as_ref()?.device_name(id)) { name = n.to_string(); }
            out.insert_unique(&name, DeviceInfo { bus_type: Some(bus.into()), device_id, ..Default::default() });
        }
        Ok(out)
    }

    fn storage_controllers(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        for d in self.pci_group(&["Non-Volatile memory controller", "SATA controller"]) {
            let drives: Vec<String> = find(&d.dir, usize::MAX, false, |n| n == "model").iter().filter_map(|p| read_value(p)).collect();
            let info = DeviceInfo { disk_drives: (!drives.is_empty()).then_some(drives), ..d.info.clone() };
            out.insert_unique(&d.name, info);
        }
        Ok(out)
    }

    fn biometric(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        for (entry, dir) in entries(&self.path("sys/bus/usb/devices"))? {
            let (Some(v), Some(p)) = (read_value(&dir.join("idVendor")), read_value(&dir.join("idProduct"))) else { continue };
            let id = format!("{}-{}", pad4(&v), pad4(&p));
            let Some(name) = read_value(&dir.join("product")).or_else(|| self.usb_name(&id)) else { continue };
            let lower = name.to_lowercase();
            if !(lower.contains("fingerprint") || lower.contains("biometric")) { continue; }
            log::debug!("Biometric: {} ({}) at {}", name, id, entry);
            out.insert_unique(&name, DeviceInfo { bus_type: Some("USB".into()), device_id: Some(id), ..Default::default() });
        }
        Ok(out)
    }

    fn bluetooth(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        for (entry, dir) in entries(&self.path("sys/class/bluetooth"))? {
            let Some(u) = report::skip_failed("Bluetooth", &entry, require(&dir.join("device").join("uevent")).map(|t| parse_uevent(&t))) else { continue };
            let Some(id) = u.device_id() else { continue };
            let name = self.usb_name(&id).unwrap_or_else(|| tables::UNKNOWN.to_string());
            out.insert_unique(&name, DeviceInfo { bus_type: u.bus_type, device_id: Some(id), ..Default::default() });
        }
        Ok(out)
    }

    fn sd_controller(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        for (entry, dir) in entries(&self.path("sys/class/mmc_host"))? {
            let fw = dir.join("device").join("firmware_node");
            let uevents: String = find(&fw, 1, true, |n| n.contains("physical_node")).iter()
                .filter_map(|node| fs::read_to_string(node.join("uevent")).ok())
                .collect::<Vec<_>>().join("\n");
            let u = parse_uevent(&uevents);
            let (Some(bus), Some(id)) = (u.bus_type.clone(), u.device_id()) else { log::debug!("SD Controller: {} has no PCI identity", entry); continue };
            let info = DeviceInfo { bus_type: Some(bus), device_id: Some(id.clone()), subsystem_id: u.subsystem_id.clone(), ..Default::default() }
                .with_paths(self.resolver.resolve(&dir.join("device").to_string_lossy()));
            out.insert_unique(&self.pci_name(u.slot.as_deref(), &id), info);
        }
        Ok(out)
    }

    fn system_devices(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut out = Section::new();
        match entries(&self.path("sys/bus/platform/devices")) {
            Ok(list) => for (entry, dir) in list {
                let Some(bus) = read_value(&dir.join("modalias")).and_then(|m| m.split(':').next().map(str::to_uppercase)).filter(|b| !b.is_empty()) else { continue };
                let hid = read_value(&dir.join("firmware_node").join("hid"));
                let description = read_value(&dir.join("firmware_node").join("description"));
                let base = entry.split(':').next().unwrap_or("").split('.').next().unwrap_or("").to_string();
                let name = description.or_else(|| hid.clone()).unwrap_or_else(|| base.clone());
                let info = DeviceInfo { bus_type: Some(bus), device: Some(hid.unwrap_or(base)), ..Default::default() }
                    .with_paths(self.resolver.resolve(&dir.to_string_lossy()));
                out.insert_unique(&name, info);
            },
            Err(e) => log::debug!("platform devices unavailable: {}", e),
        }
        for (class, devices) in &self.by_class {
            if NOT_SYSTEM_CLASSES.contains(&class.as_str()) { continue; }
            for d in devices {
                if d.dir.file_name().and_then(|n| n.to_str()).is_some_and(|slot| self.network_slots.contains(slot)) { continue; }
                out.insert_unique(&d.name, d.info.clone());
            }
        }
        Ok(out)
    }
}
