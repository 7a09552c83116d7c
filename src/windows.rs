use crate::classify;
use crate::edid;
use crate::error::{CollectError, CollectResult};
use crate::hwdb::IdsDatabase;
use crate::locator::{self, LocationPathResolver, PathInfo};
use crate::report::{self, Bios, Collector, Cpu, DeviceInfo, Gpu, Monitor, Motherboard, Section};
use crate::tables;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComputerSystem {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub pc_system_type: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BaseBoard {
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BiosRecord {
    pub version: Option<String>,
    /// CIM datetime, e.g. `20230512000000.000000+000`.
    pub release_date: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Processor {
    pub manufacturer: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub number_of_cores: Option<u32>,
}

/// One `Win32_PnPEntity` row joined with its device properties and memory resources.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PnpEntity {
    pub name: Option<String>,
    pub pnp_class: Option<String>,
    pub device_id: Option<String>,
    pub error_code: Option<u32>,
    pub service: Option<String>,
    #[serde(default)]
    pub location_paths: Vec<String>,
    pub parent: Option<String>,
    #[serde(default)]
    pub memory_ranges: Vec<(u64, u64)>,
}

impl PnpEntity {
    fn name(&self) -> String { self.name.clone().filter(|n| !n.is_empty()).unwrap_or_else(|| tables::UNKNOWN.to_string()) }
    fn class(&self) -> &str { self.pnp_class.as_deref().filter(|c| !c.is_empty()).unwrap_or(tables::UNKNOWN) }
    fn id(&self) -> CollectResult<&str> {
        self.device_id.as_deref().filter(|id| !id.is_empty()).ok_or_else(|| CollectError::Malformed(format!("{} has no PNPDeviceID", self.name())))
    }
}

/// The `root\wmi` view of one display output.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub instance_name: String,
    #[serde(default)]
    pub user_friendly_name: Vec<u16>,
    pub video_output_technology: Option<i64>,
    #[serde(default)]
    pub source_modes: Vec<(u32, u32)>,
    #[serde(default)]
    pub edid: Vec<u8>,
}

/// Everything the Windows collector reads, captured in one pass so it can be saved and replayed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WindowsSnapshot {
    pub captured_at: Option<DateTime<Utc>>,
    pub computer_system: Option<ComputerSystem>,
    pub base_board: Option<BaseBoard>,
    pub bios: Option<BiosRecord>,
    #[serde(default)]
    pub processors: Vec<Processor>,
    #[serde(default)]
    pub simd_features: Vec<String>,
    #[serde(default)]
    pub pnp_entities: Vec<PnpEntity>,
    #[serde(default)]
    pub monitors: Vec<MonitorRecord>,
    pub firmware_type: Option<String>,
    pub secure_boot: Option<bool>,
}

impl WindowsSnapshot {
    pub fn from_json(s: &str) -> CollectResult<Self> {
        serde_json::from_str(s).map_err(|e| CollectError::Malformed(format!("snapshot: {}", e)))
    }
}

/// Key value of a WMI object path: `...Win32_PnPEntity.DeviceID="PCI\\VEN_8086"` → `PCI\VEN_8086`.
pub fn parse_wmi_ref_key(reference: &str) -> Option<String> {
    let (_, value) = reference.split_once('=')?;
    let value = value.trim().trim_matches('"');
    Some(value.replace("\\\\", "\\"))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceProps {
    pub location_paths: Vec<String>,
    pub parent: Option<String>,
}

/// Parse `Get-PnpDeviceProperty ... | ConvertTo-Json` output keyed by uppercased instance id.
pub fn parse_device_properties(json: &str) -> HashMap<String, DeviceProps> {
    let mut out: HashMap<String, DeviceProps> = HashMap::new();
    let value: serde_json::Value = match serde_json::from_str(json.trim()) { Ok(v) => v, Err(e) => { log::warn!("device property output unreadable: {}", e); return out } };
    let rows = match value { serde_json::Value::Array(a) => a, other => vec![other] };
    for row in rows {
        let Some(id) = row.get("InstanceId").and_then(|v| v.as_str()) else { continue };
        let entry = out.entry(id.to_uppercase()).or_default();
        let data = row.get("Data");
        match row.get("KeyName").and_then(|v| v.as_str()) {
            Some("DEVPKEY_Device_LocationPaths") => {
                entry.location_paths = match data {
                    Some(serde_json::Value::Array(a)) => a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
                    Some(serde_json::Value::String(s)) => vec![s.clone()],
                    _ => Vec::new(),
                };
            }
            Some("DEVPKEY_Device_Parent") => entry.parent = data.and_then(|v| v.as_str()).map(str::to_string),
            _ => {}
        }
    }
    out
}

/// `0,255,255,...` → bytes; malformed items end the sequence.
pub fn parse_byte_list(s: &str) -> Vec<u8> {
    s.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()).map_while(|t| t.parse::<u8>().ok()).collect()
}

/// CIM datetime → `MM/DD/YYYY`, the format firmware reports through DMI.
pub fn cim_date(raw: &str) -> Option<String> {
    let d = NaiveDate::parse_from_str(raw.get(..8)?, "%Y%m%d").ok()?;
    Some(d.format("%m/%d/%Y").to_string())
}

/// `DISPLAY\DELA07A\5&2b1c&0&UID4352_0` → `DISPLAY\DELA07A\5&2b1c&0&UID4352`.
pub fn strip_instance_suffix(instance: &str) -> &str {
    match instance.rsplit_once('_') {
        Some((head, tail)) if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) => head,
        _ => instance,
    }
}

pub fn decode_friendly_name(units: &[u16]) -> Option<String> {
    let s: String = char::decode_utf16(units.iter().copied().take_while(|&u| u != 0)).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)).collect();
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let h = haystack.to_lowercase();
    needles.iter().any(|n| h.contains(&n.to_lowercase()))
}

fn unknown_class(name: &str) -> Option<&'static str> {
    contains_any(name, &["Video Controller", "Video Adapter", "Graphics Controller"]).then_some("Display")
}

const GROUPED_CLASSES: &[&str] = &["Display", "Monitor", "Net", "MEDIA", "USB", "HIDClass", "Keyboard", "Mouse", "HDC", "SCSIAdapter", "Biometric", "Bluetooth", "SDHost", "MTD", "System"];

pub struct WindowsCollector {
    snap: WindowsSnapshot,
    resolver: LocationPathResolver,
    pci_ids: Option<IdsDatabase>,
    usb_ids: Option<IdsDatabase>,
    by_class: HashMap<&'static str, Vec<usize>>,
    chipset_device: Option<usize>,
}

impl WindowsCollector {
    pub fn new(snap: WindowsSnapshot, pci_ids: Option<IdsDatabase>, usb_ids: Option<IdsDatabase>) -> Self {
        WindowsCollector { snap, resolver: LocationPathResolver::Windows, pci_ids, usb_ids, by_class: HashMap::new(), chipset_device: None }
    }

    fn class(&self, class: &str) -> Vec<&PnpEntity> {
        self.by_class.get(class).map(|v| v.iter().filter_map(|&i| self.snap.pnp_entities.get(i)).collect()).unwrap_or_default()
    }

    fn paths(&self, e: &PnpEntity) -> PathInfo { self.resolver.resolve(&e.location_paths.join("\n")) }

    /// Bus-filtered devices of the given classes, optionally with location paths.
    fn simple(&self, category: &str, classes: &[&str], keep: impl Fn(&PnpEntity, &DeviceInfo) -> bool, with_paths: impl Fn(&DeviceInfo) -> bool) -> Section<DeviceInfo> {
        let mut out = Section::new();
        for e in classes.iter().flat_map(|c| self.class(c)) {
            let name = e.name();
            let Some(id) = report::skip_failed(category, &name, e.id()) else { continue };
            let info = DeviceInfo::from_pnp(&locator::parse_pnp_id(id));
            if !keep(e, &info) { log::debug!("{}: skipping {} ({})", category, name, id); continue; }
            let info = if with_paths(&info) { info.with_paths(self.paths(e)) } else { info };
            out.insert_unique(&name, info);
        }
        out
    }

    fn bus_is(info: &DeviceInfo, buses: &[&str]) -> bool { info.bus_type.as_deref().is_some_and(|b| buses.contains(&b)) }
}

impl Collector for WindowsCollector {
    fn pci_devices(&mut self) -> CollectResult<()> {
        self.by_class.clear();
        self.chipset_device = None;
        for (i, e) in self.snap.pnp_entities.iter().enumerate() {
            let name = e.name();
            let mut class = e.class().to_string();
            if class == tables::UNKNOWN && let Some(c) = unknown_class(&name) { class = c.to_string(); }
            if class == "System" && contains_any(&name, &["LPC ", "eSPI ", "ISA "]) { self.chipset_device = Some(i); }
            if let Some(key) = GROUPED_CLASSES.iter().find(|k| **k == class) { self.by_class.entry(*key).or_default().push(i); }
        }
        log::debug!("grouped {} PnP entities into {} classes", self.snap.pnp_entities.len(), self.by_class.len());
        Ok(())
    }

    fn motherboard(&mut self) -> CollectResult<Motherboard> {
        let cs = self.snap.computer_system.clone().unwrap_or_default();
        let bb = self.snap.base_board.clone().unwrap_or_default();
        let name = classify::system_name(cs.manufacturer.as_deref().unwrap_or(""), cs.model.as_deref().unwrap_or(""), bb.manufacturer.as_deref().unwrap_or(""), bb.product.as_deref().unwrap_or(""));
        let bridge = self.chipset_device.and_then(|i| self.snap.pnp_entities.get(i)).and_then(|e| e.device_id.as_deref()).and_then(|id| locator::parse_pnp_id(id).device_id);
        let chipset = classify::chipset(bridge.as_deref(), &name);
        let platform = classify::platform(cs.pc_system_type.map(|t| t.to_string()).as_deref());
        Ok(Motherboard { name, chipset, platform })
    }

    fn bios(&mut self) -> CollectResult<Bios> {
        let rec = self.snap.bios.clone().unwrap_or_default();
        let above_4g = self.snap.pnp_entities.iter().flat_map(|e| e.memory_ranges.iter()).any(|&(_, end)| end >= 1u64 << 32);
        Ok(Bios {
            version: rec.version.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).unwrap_or_else(|| tables::UNKNOWN.into()),
            release_date: rec.release_date.as_deref().and_then(cim_date).unwrap_or_else(|| tables::UNKNOWN.into()),
            firmware_type: if self.snap.firmware_type.as_deref().is_some_and(|f| f.eq_ignore_ascii_case("UEFI")) { "UEFI".into() } else { "BIOS".into() },
            secure_boot: report::enabled(self.snap.secure_boot.unwrap_or(false)),
            above_4g_decoding: report::enabled(above_4g),
        })
    }

    fn cpu(&mut self) -> CollectResult<Cpu> {
        let count = self.snap.processors.len();
        let last = self.snap.processors.last().ok_or_else(|| CollectError::CategoryUnavailable("Win32_Processor".into()))?;
        let full_name = last.name.clone().unwrap_or_default();
        let name = full_name.split("CPU").next().unwrap_or("").trim().to_string();
        let features: Vec<&str> = self.snap.simd_features.iter().map(String::as_str).collect();
        Ok(Cpu {
            manufacturer: classify::cpu_manufacturer(last.manufacturer.as_deref().unwrap_or("")),
            codename: classify::cpu_codename(&name, last.description.as_deref().unwrap_or("")),
            processor_name: name,
            core_count: classify::zero_pad(last.number_of_cores.unwrap_or(0) as usize * count),
            cpu_count: classify::zero_pad(count),
            simd_features: classify::format_simd(&features),
        })
    }

    fn gpu(&mut self) -> CollectResult<Section<Gpu>> {
        let mut out = Section::new();
        for e in self.class("Display") {
            let Some(id) = report::skip_failed("GPU", &e.name(), e.id()) else { continue };
            if !id.to_uppercase().starts_with("PCI") { log::debug!("GPU: skipping non-PCI display device {}", id); continue; }
            let pnp = locator::parse_pnp_id(id);
            let class = classify::classify_gpu(pnp.device_id.as_deref().unwrap_or(""));
            let mut name = e.name();
            if (name == tables::UNKNOWN || e.class() == tables::UNKNOWN)
                && let Some(n) = self.pci_ids.as_ref().and_then(|db| db.device_name(&class.device_id)) {
                name = n.to_string();
            }
            let paths = self.paths(e);
            out.insert_unique(&name, Gpu {
                manufacturer: class.manufacturer,
                codename: class.codename,
                bus_type: None,
                device_id: class.device_id,
                device_type: class.device_type,
                subsystem_id: pnp.subsystem_id,
                pci_path: paths.pci_path,
                acpi_path: paths.acpi_path,
                resizable_bar: report::enabled(e.memory_ranges.iter().any(|&(s, end)| report::spans_4g(s, end))),
                source: id.to_string(),
            });
        }
        Ok(out)
    }

    fn monitor(&mut self, gpus: &Section<Gpu>) -> CollectResult<Section<Monitor>> {
        if self.snap.monitors.is_empty() { return Err(CollectError::CategoryUnavailable("WmiMonitorID".into())); }
        let mut records: Vec<&MonitorRecord> = self.snap.monitors.iter().collect();
        records.sort_by(|a, b| a.instance_name.cmp(&b.instance_name));
        let entities = self.class("Monitor");
        let mut out = Section::new();
        for m in records {
            let instance = strip_instance_suffix(&m.instance_name);
            let entity = entities.iter().find(|e| e.device_id.as_deref().is_some_and(|id| id.eq_ignore_ascii_case(instance)));
            let name = edid::decode(&m.edid).monitor_name()
                .or_else(|| decode_friendly_name(&m.user_friendly_name))
                .or_else(|| m.instance_name.split('\\').nth(1).map(str::to_string))
                .unwrap_or_else(|| tables::UNKNOWN.to_string());
            let (w, h) = m.source_modes.iter().fold((0u32, 0u32), |(w, h), &(mw, mh)| (w.max(mw), h.max(mh)));
            let connected_gpu = entity.and_then(|e| e.parent.as_deref())
                .and_then(|parent| gpus.iter().find(|(_, g)| g.source.eq_ignore_ascii_case(parent)).map(|(k, _)| k.to_string()));
            out.insert_unique(&name, Monitor {
                connector_type: m.video_output_technology.map(tables::connector_type).unwrap_or("Uninitialized").to_string(),
                resolution: format!("{}x{}", w, h),
                connected_gpu,
            });
        }
        Ok(out)
    }

    fn network(&mut self) -> CollectResult<Section<DeviceInfo>> {
        Ok(self.simple("Network", &["Net"], |_, i| Self::bus_is(i, &["PCI", "USB"]), |i| Self::bus_is(i, &["PCI"])))
    }

    fn sound(&mut self) -> CollectResult<Section<DeviceInfo>> {
        Ok(self.simple("Sound", &["MEDIA"], |_, i| i.bus_type.as_deref().is_some_and(|b| ["AUDIO", "USB", "ACP"].iter().any(|s| b.ends_with(s))), |_| false))
    }

    fn usb_controllers(&mut self) -> CollectResult<Section<DeviceInfo>> {
        Ok(self.simple("USB Controllers", &["USB"], |_, i| Self::bus_is(i, &["PCI"]), |_| true))
    }

    fn input(&mut self) -> CollectResult<Section<DeviceInfo>> {
        let mut hid = self.class("HIDClass");
        hid.sort_by_key(|e| e.device_id.as_deref().and_then(|id| id.split('\\').nth(1)).unwrap_or("").to_string());
        let devices: Vec<&PnpEntity> = hid.into_iter().chain(self.class("Keyboard")).chain(self.class("Mouse")).collect();
        let mut out = Section::new();
        let mut acpi_device: Option<DeviceInfo> = None;
        let mut seen: HashSet<String> = HashSet::new();
        for e in devices {
            let mut name = e.name();
            let Some(id) = report::skip_failed("Input", &name, e.id()) else { continue };
            let mut info = DeviceInfo::from_pnp(&locator::parse_pnp_id(id));
            if let Some(tag) = &info.device { info.device_id = Some(locator::split_device_tag(tag)); }
            if contains_any(&name, &["wireless radio controls", "vendor-defined device", "consumer control device", "system controller"]) || e.error_code.unwrap_or(0) != 0 {
                log::debug!("Input: skipping {} ({})", name, id);
                continue;
            }
            info.device_type = match e.service.as_deref().map(str::to_lowercase).as_deref() {
                Some("i8042prt") | Some("kbdclass") => Some("PS/2".into()),
                Some("kbdhid") | Some("mouhid") => Some("USB".into()),
                _ => match e.class() { "Keyboard" => Some("Keyboard".into()), "Mouse" => Some("Mouse".into()), _ => None },
            };
            if e.class() == "HIDClass" {
                if Self::bus_is(&info, &["ACPI"]) {
                    acpi_device = Some(DeviceInfo { device_type: Some(name.clone()), ..info });
                    continue;
                }
                if let Some(acpi) = acpi_device.as_ref().filter(|a| a.device_id.is_some() && a.device_id == info.device_id) { info.merge_from(acpi); }
            }
            let Some(device_id) = info.device_id.clone() else { continue };
            if seen.contains(&device_id) { continue; }
            if !Self::bus_is(&info, &["ACPI", "USB", "HID"]) || info.device_type.is_none() || device_id.find('-').is_none_or(|i| i > 4) { continue; }
            seen.insert(device_id.clone());
            if Self::bus_is(&info, &["ACPI"]) {
                info.device_id = None;
            } else {
                if let Some(n) = self.usb_ids.as_ref().and_then(|db| db.device_name(&device_id)) { name = n.to_string(); }
                info.bus_type = Some("USB".into());
                info.device_type = None;
            }
            out.insert_unique(&name, info);
        }
        Ok(out)
    }

    fn storage_controllers(&mut self) -> CollectResult<Section<DeviceInfo>> {
        Ok(self.simple("Storage Controllers", &["HDC", "SCSIAdapter"], |e, i| {
            let name = e.name();
            Self::bus_is(i, &["PCI", "VID"]) && !name.contains(" SD ") && !name.contains("MMC")
        }, |_| true))
    }

    fn biometric(&mut self) -> CollectResult<Section<DeviceInfo>> {
        Ok(self.simple("Biometric", &["Biometric"], |_, i| Self::bus_is(i, &["ROOT", "USB"]), |_| false))
    }

    fn bluetooth(&mut self) -> CollectResult<Section<DeviceInfo>> {
        Ok(self.simple("Bluetooth", &["Bluetooth"], |_, i| Self::bus_is(i, &["USB"]), |_| false))
    }

    fn sd_controller(&mut self) -> CollectResult<Section<DeviceInfo>> {
        Ok(self.simple("SD Controller", &["SDHost", "MTD"], |_, _| true, |_| false))
    }

    fn system_devices(&mut self) -> CollectResult<Section<DeviceInfo>> {
        Ok(self.simple("System Devices", &["System"], |_, _| true, |_| true))
    }
}

#[cfg(target_os = "windows")]
fn powershell(script: &str) -> Option<String> {
    let out = std::process::Command::new("powershell").args(["-NoProfile", "-NonInteractive", "-Command", script]).output();
    match out {
        Ok(o) if o.status.success() => Some(String::from_utf8_lossy(&o.stdout).into_owned()),
        Ok(o) => { log::debug!("powershell exited with {}: {}", o.status, String::from_utf8_lossy(&o.stderr).trim()); None }
        Err(e) => { log::warn!("powershell unavailable: {}", e); None }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn detect_simd() -> Vec<String> {
    let mut v: Vec<&str> = Vec::new();
    if std::arch::is_x86_feature_detected!("sse") { v.push("SSE"); }
    if std::arch::is_x86_feature_detected!("sse2") { v.push("SSE2"); }
    if std::arch::is_x86_feature_detected!("sse3") { v.push("SSE3"); }
    if std::arch::is_x86_feature_detected!("ssse3") { v.push("SSSE3"); }
    if std::arch::is_x86_feature_detected!("sse4.1") { v.push("SSE4.1"); }
    if std::arch::is_x86_feature_detected!("sse4.2") { v.push("SSE4.2"); }
    if std::arch::is_x86_feature_detected!("sse4a") { v.push("SSE4a"); }
    if std::arch::is_x86_feature_detected!("avx") { v.push("AVX"); }
    if std::arch::is_x86_feature_detected!("avx2") { v.push("AVX2"); }
    v.into_iter().map(str::to_string).collect()
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn detect_simd() -> Vec<String> { Vec::new() }

/// Query WMI and the PnP property store once and keep everything the collector needs.
#[cfg(target_os = "windows")]
pub fn capture() -> CollectResult<WindowsSnapshot> {
    use wmi::WMIConnection;
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct CsRow { Manufacturer: Option<String>, Model: Option<String>, PCSystemType: Option<i64> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct BbRow { Manufacturer: Option<String>, Product: Option<String> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct BiosRow { SMBIOSBIOSVersion: Option<String>, ReleaseDate: Option<String> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct ProcRow { Manufacturer: Option<String>, Name: Option<String>, Description: Option<String>, NumberOfCores: Option<u32> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct PnpRow { Name: Option<String>, PNPClass: Option<String>, PNPDeviceID: Option<String>, ConfigManagerErrorCode: Option<u32>, Service: Option<String> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct AllocRow { Antecedent: String, Dependent: String }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct MemRow { StartingAddress: Option<String>, EndingAddress: Option<String> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct MonIdRow { InstanceName: String, UserFriendlyName: Option<Vec<u16>> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct ConnRow { InstanceName: String, VideoOutputTechnology: Option<i64> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct ModeRow { HorizontalActivePixels: Option<u32>, VerticalActivePixels: Option<u32> }
    #[allow(non_snake_case)]
    #[derive(Deserialize)]
    struct ModesRow { InstanceName: String, MonitorSourceModes: Option<Vec<ModeRow>> }

    let wmi = WMIConnection::new().map_err(|e| CollectError::Query(format!("WMI connection: {}", e)))?;
    fn rows<T: serde::de::DeserializeOwned>(wmi: &WMIConnection, q: &str) -> Vec<T> {
        match wmi.raw_query::<T>(q) { Ok(r) => r, Err(e) => { log::warn!("WMI query failed ({}): {}", q, e); Vec::new() } }
    }
    let mut snap = WindowsSnapshot { captured_at: Some(Utc::now()), ..Default::default() };
    snap.computer_system = rows::<CsRow>(&wmi, "SELECT Manufacturer, Model, PCSystemType FROM Win32_ComputerSystem").into_iter().next()
        .map(|r| ComputerSystem { manufacturer: r.Manufacturer, model: r.Model, pc_system_type: r.PCSystemType });
    snap.base_board = rows::<BbRow>(&wmi, "SELECT Manufacturer, Product FROM Win32_BaseBoard").into_iter().next()
        .map(|r| BaseBoard { manufacturer: r.Manufacturer, product: r.Product });
    snap.bios = rows::<BiosRow>(&wmi, "SELECT SMBIOSBIOSVersion, ReleaseDate FROM Win32_BIOS").into_iter().next()
        .map(|r| BiosRecord { version: r.SMBIOSBIOSVersion, release_date: r.ReleaseDate });
    snap.processors = rows::<ProcRow>(&wmi, "SELECT Manufacturer, Name, Description, NumberOfCores FROM Win32_Processor").into_iter()
        .map(|r| Processor { manufacturer: r.Manufacturer, name: r.Name, description: r.Description, number_of_cores: r.NumberOfCores }).collect();
    snap.simd_features = detect_simd();

    let props = powershell("$ids = (Get-PnpDevice).InstanceId; Get-PnpDeviceProperty -InstanceId $ids -KeyName DEVPKEY_Device_LocationPaths,DEVPKEY_Device_Parent -ErrorAction SilentlyContinue | Select-Object InstanceId,KeyName,Data | ConvertTo-Json -Compress -Depth 3")
        .map(|s| parse_device_properties(&s)).unwrap_or_default();
    let memory: HashMap<String, u64> = rows::<MemRow>(&wmi, "SELECT StartingAddress, EndingAddress FROM Win32_DeviceMemoryAddress").into_iter()
        .filter_map(|r| Some((r.StartingAddress?, r.EndingAddress?.parse::<u64>().ok()?))).collect();
    let mut ranges: HashMap<String, Vec<(u64, u64)>> = HashMap::new();
    for a in rows::<AllocRow>(&wmi, "SELECT Antecedent, Dependent FROM Win32_PNPAllocatedResource") {
        if !a.Antecedent.contains("Win32_DeviceMemoryAddress") { continue; }
        if let (Some(start), Some(dev)) = (parse_wmi_ref_key(&a.Antecedent), parse_wmi_ref_key(&a.Dependent))
            && let (Ok(s), Some(&end)) = (start.parse::<u64>(), memory.get(&start)) {
            ranges.entry(dev.to_uppercase()).or_default().push((s, end));
        }
    }
    snap.pnp_entities = rows::<PnpRow>(&wmi, "SELECT Name, PNPClass, PNPDeviceID, ConfigManagerErrorCode, Service FROM Win32_PnPEntity").into_iter().map(|r| {
        let key = r.PNPDeviceID.as_deref().unwrap_or("").to_uppercase();
        let p = props.get(&key).cloned().unwrap_or_default();
        PnpEntity {
            name: r.Name, pnp_class: r.PNPClass, device_id: r.PNPDeviceID, error_code: r.ConfigManagerErrorCode, service: r.Service,
            location_paths: p.location_paths, parent: p.parent, memory_ranges: ranges.remove(&key).unwrap_or_default(),
        }
    }).collect();

    match WMIConnection::with_namespace_path("root\\wmi") {
        Ok(wmi_root) => {
            let conn: HashMap<String, Option<i64>> = rows::<ConnRow>(&wmi_root, "SELECT InstanceName, VideoOutputTechnology FROM WmiMonitorConnectionParams").into_iter().map(|r| (r.InstanceName, r.VideoOutputTechnology)).collect();
            let modes: HashMap<String, Vec<(u32, u32)>> = rows::<ModesRow>(&wmi_root, "SELECT InstanceName, MonitorSourceModes FROM WmiMonitorListedSupportedSourceModes").into_iter()
                .map(|r| (r.InstanceName, r.MonitorSourceModes.unwrap_or_default().into_iter().map(|m| (m.HorizontalActivePixels.unwrap_or(0), m.VerticalActivePixels.unwrap_or(0))).collect())).collect();
            snap.monitors = rows::<MonIdRow>(&wmi_root, "SELECT InstanceName, UserFriendlyName FROM WmiMonitorID").into_iter().map(|r| {
                let id = strip_instance_suffix(&r.InstanceName).to_string();
                let edid = powershell(&format!("(Get-ItemProperty -LiteralPath 'HKLM:\\SYSTEM\\CurrentControlSet\\Enum\\{}\\Device Parameters' -Name EDID).EDID -join ','", id))
                    .map(|s| parse_byte_list(&s)).unwrap_or_default();
                MonitorRecord {
                    video_output_technology: conn.get(&r.InstanceName).copied().flatten(),
                    source_modes: modes.get(&r.InstanceName).cloned().unwrap_or_default(),
                    user_friendly_name: r.UserFriendlyName.unwrap_or_default(),
                    instance_name: r.InstanceName,
                    edid,
                }
            }).collect();
        }
        Err(e) => log::warn!("root\\wmi unavailable, monitors skipped: {}", e),
    }

    snap.firmware_type = std::env::var("firmware_type").ok();
    snap.secure_boot = powershell("(Get-ItemProperty 'HKLM:\\SYSTEM\\CurrentControlSet\\Control\\SecureBoot\\State' -ErrorAction SilentlyContinue).UEFISecureBootEnabled")
        .map(|s| s.trim() == "1");
    log::debug!("captured {} PnP entities and {} monitors", snap.pnp_entities.len(), snap.monitors.len());
    Ok(snap)
}

#[cfg(not(target_os = "windows"))]
pub fn capture() -> CollectResult<WindowsSnapshot> { Err(CollectError::CategoryUnavailable("WMI".into())) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::build_report;

    fn entity(name: &str, class: &str, id: &str) -> PnpEntity {
        PnpEntity { name: Some(name.into()), pnp_class: Some(class.into()), device_id: Some(id.into()), error_code: Some(0), ..Default::default() }
    }

    fn edid_block() -> Vec<u8> {
        let mut b = vec![0u8; 128];
        b[..8].copy_from_slice(&[0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00]);
        b[8] = 0x10;
        b[9] = 0xac;
        b[10] = 0x7a;
        b[11] = 0xa0;
        b
    }

    fn snapshot() -> WindowsSnapshot {
        let igpu_id = "PCI\\VEN_8086&DEV_5916&SUBSYS_224B17AA&REV_02\\3&E89B380&0&10";
        let mut igpu = entity("Intel(R) HD Graphics 620", "Display", igpu_id);
        igpu.location_paths = vec!["PCIROOT(0)#PCI(0200)".into(), "ACPI(_SB_)#ACPI(PCI0)#ACPI(GFX0)".into()];
        let mut dgpu = entity("NVIDIA GeForce GTX 1080", "Display", "PCI\\VEN_10DE&DEV_1B80&SUBSYS_119E10DE\\4&1");
        dgpu.memory_ranges = vec![(0x4000000000, 0x41ffffffff)];
        let mut second_igpu = entity("Intel(R) HD Graphics 620", "Display", "PCI\\VEN_8086&DEV_5916&SUBSYS_00000000\\3&2");
        second_igpu.location_paths = vec!["PCIROOT(0)#PCI(0201)".into()];
        let mut panel = entity("Generic PnP Monitor", "Monitor", "DISPLAY\\DELA07A\\5&2B1C&0&UID4352");
        panel.parent = Some(igpu_id.to_lowercase());
        let mut kbd = entity("Standard PS/2 Keyboard", "Keyboard", "ACPI\\VEN_MSFT&DEV_0001\\4&1");
        kbd.service = Some("i8042prt".into());
        let mut touchpad_acpi = entity("ELAN Touchpad", "HIDClass", "ACPI\\ELAN0662\\4&2");
        touchpad_acpi.service = Some("hidi2c".into());
        let touchpad_hid = entity("HID-compliant mouse", "HIDClass", "HID\\ELAN0662&COL01\\5&3");
        let mut mouse = entity("HID-compliant mouse", "Mouse", "HID\\VID_046D&PID_C52B&MI_01\\7&1");
        mouse.service = Some("mouhid".into());
        let mut mouse_dup = entity("HID-compliant mouse", "Mouse", "HID\\VID_046D&PID_C52B&MI_02\\7&2");
        mouse_dup.service = Some("mouhid".into());
        let mut broken = entity("HID Keyboard Device", "Keyboard", "HID\\VID_1234&PID_5678\\1");
        broken.error_code = Some(22);
        let radio = entity("HID-compliant wireless radio controls", "HIDClass", "HID\\VID_0001&PID_0002\\1");
        let mut lpc = entity("Intel(R) 100 Series Chipset Family LPC Controller/eSPI Controller - A145", "System", "PCI\\VEN_8086&DEV_A145&SUBSYS_00000000\\3&3");
        lpc.location_paths = vec!["PCIROOT(0)#PCI(1F00)".into(), "ACPI(_SB_)#ACPI(PCI0)#ACPI(LPCB)".into()];
        let mut wifi = entity("Intel(R) Wireless-AC 9560", "Net", "PCI\\VEN_8086&DEV_9DF0&SUBSYS_00348086\\3&4");
        wifi.location_paths = vec!["PCIROOT(0)#PCI(1403)".into()];
        let virt = entity("WAN Miniport (IP)", "Net", "SWD\\MSRRAS\\MS_NDISWANIP");
        let audio = entity("Realtek High Definition Audio", "MEDIA", "HDAUDIO\\FUNC_01&VEN_10EC&DEV_0257&SUBSYS_17AA224B\\4&5");
        let xhci = entity("Intel(R) USB 3.0 eXtensible Host Controller", "USB", "PCI\\VEN_8086&DEV_9D2F&SUBSYS_224B17AA\\3&6");
        let hub = entity("USB Root Hub (USB 3.0)", "USB", "USB\\ROOT_HUB30\\4&7");
        let nvme = entity("Standard NVM Express Controller", "SCSIAdapter", "PCI\\VEN_144D&DEV_A808&SUBSYS_A801144D\\4&8");
        let sd = entity("Realtek PCIE SD Card Reader", "SCSIAdapter", "PCI\\VEN_10EC&DEV_525A\\4&9");
        let fp = entity("Synaptics FP Sensors", "Biometric", "USB\\VID_06CB&PID_009A\\1");
        let bt = entity("Intel(R) Wireless Bluetooth(R)", "Bluetooth", "USB\\VID_8087&PID_0AAA\\5&10");
        let no_id = PnpEntity { name: Some("Phantom".into()), pnp_class: Some("System".into()), ..Default::default() };
        let unknown_video = entity("Microsoft Basic Video Adapter", "", "ROOT\\BasicDisplay\\0000");
        WindowsSnapshot {
            computer_system: Some(ComputerSystem { manufacturer: Some("LENOVO".into()), model: Some("20HDCTO1WW".into()), pc_system_type: Some(2) }),
            base_board: Some(BaseBoard { manufacturer: Some("LENOVO".into()), product: Some("20HDCTO1WW".into()) }),
            bios: Some(BiosRecord { version: Some("N1QET98W (1.73 )".into()), release_date: Some("20221108000000.000000+000".into()) }),
            processors: vec![Processor { manufacturer: Some("GenuineIntel".into()), name: Some("Intel(R) Core(TM) i7-8550U CPU @ 1.80GHz".into()), description: Some("Intel64 Family 6 Model 142 Stepping 10".into()), number_of_cores: Some(4) }],
            simd_features: vec!["SSE".into(), "SSE2".into(), "AVX2".into()],
            pnp_entities: vec![igpu, dgpu, second_igpu, panel, kbd, touchpad_acpi, touchpad_hid, mouse, mouse_dup, broken, radio, lpc, wifi, virt, audio, xhci, hub, nvme, sd, fp, bt, no_id, unknown_video],
            monitors: vec![MonitorRecord { instance_name: "DISPLAY\\DELA07A\\5&2b1c&0&UID4352_0".into(), user_friendly_name: vec![0x44, 0x45, 0x4c, 0], video_output_technology: Some(11), source_modes: vec![(1920, 1080), (2560, 1440), (3840, 1200)], edid: edid_block() }],
            firmware_type: Some("UEFI".into()),
            secure_boot: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn full_pipeline_from_snapshot() {
        let mut c = WindowsCollector::new(snapshot(), None, None);
        let r = build_report(&mut c, None);

        let mb = r.motherboard.as_ref().unwrap();
        assert_eq!((mb.name.as_str(), mb.chipset.as_str(), mb.platform.as_str()), ("LENOVO 20HDCTO1WW", "Z170", "Laptop"));

        let bios = r.bios.as_ref().unwrap();
        assert_eq!(bios.release_date, "11/08/2022");
        assert_eq!((bios.firmware_type.as_str(), bios.secure_boot.as_str(), bios.above_4g_decoding.as_str()), ("UEFI", "Enabled", "Enabled"));

        let cpu = r.cpu.as_ref().unwrap();
        assert_eq!(cpu.processor_name, "Intel(R) Core(TM) i7-8550U");
        assert_eq!(cpu.codename, "Kaby Lake-R");
        assert_eq!((cpu.core_count.as_str(), cpu.cpu_count.as_str()), ("04", "01"));
        assert_eq!(cpu.simd_features, "SSE, SSE2, AVX2");

        let gpu = r.gpu.as_ref().unwrap();
        let keys: Vec<&str> = gpu.keys().collect();
        assert_eq!(keys, ["NVIDIA GeForce GTX 1080", "Intel(R) HD Graphics 620", "Intel(R) HD Graphics 620_#1"]);
        let igpu = gpu.get("Intel(R) HD Graphics 620").unwrap();
        assert_eq!((igpu.codename.as_str(), igpu.device_type.as_str()), ("Kaby Lake", "Integrated GPU"));
        assert_eq!(igpu.pci_path.as_deref(), Some("PciRoot(0x0)/Pci(0x2,0x0)"));
        assert_eq!(igpu.acpi_path.as_deref(), Some("\\_SB.PCI0.GFX0"));
        assert_eq!(igpu.subsystem_id.as_deref(), Some("224B17AA"));
        assert_eq!(gpu.get("NVIDIA GeForce GTX 1080").unwrap().resizable_bar, "Enabled");
        assert_eq!(igpu.resizable_bar, "Disabled");

        let mon = r.monitor.as_ref().unwrap();
        let m = mon.get("DELA07A").unwrap();
        assert_eq!((m.connector_type.as_str(), m.resolution.as_str()), ("eDP", "3840x1440"));
        assert_eq!(m.connected_gpu.as_deref(), Some("Intel(R) HD Graphics 620"));

        let net = r.network.as_ref().unwrap();
        assert_eq!(net.len(), 1);
        assert_eq!(net.get("Intel(R) Wireless-AC 9560").unwrap().pci_path.as_deref(), Some("PciRoot(0x0)/Pci(0x14,0x3)"));

        let sound = r.sound.as_ref().unwrap();
        assert_eq!(sound.get("Realtek High Definition Audio").unwrap().device_id.as_deref(), Some("10EC-0257"));

        let usb = r.usb_controllers.as_ref().unwrap();
        assert_eq!(usb.keys().collect::<Vec<_>>(), ["Intel(R) USB 3.0 eXtensible Host Controller"]);

        let storage = r.storage_controllers.as_ref().unwrap();
        assert_eq!(storage.keys().collect::<Vec<_>>(), ["Standard NVM Express Controller"]);

        assert!(r.biometric.as_ref().unwrap().contains_key("Synaptics FP Sensors"));
        assert!(r.bluetooth.as_ref().unwrap().contains_key("Intel(R) Wireless Bluetooth(R)"));
        assert!(r.sd_controller.is_none());

        let sys = r.system_devices.as_ref().unwrap();
        assert_eq!(sys.keys().collect::<Vec<_>>(), ["Intel(R) 100 Series Chipset Family LPC Controller/eSPI Controller - A145"]);
    }

    #[test]
    fn input_pairs_acpi_and_dedups_usb() {
        let mut c = WindowsCollector::new(snapshot(), None, None);
        c.pci_devices().unwrap();
        let input = c.input().unwrap();
        let keys: Vec<&str> = input.keys().collect();
        assert_eq!(keys, ["HID-compliant mouse", "Standard PS/2 Keyboard", "HID-compliant mouse_#1"]);
        let touchpad = input.get("HID-compliant mouse").unwrap();
        assert_eq!(touchpad.bus_type.as_deref(), Some("ACPI"));
        assert_eq!(touchpad.device_type.as_deref(), Some("ELAN Touchpad"));
        assert_eq!(touchpad.device_id, None);
        let kbd = input.get("Standard PS/2 Keyboard").unwrap();
        assert_eq!(kbd.device_type.as_deref(), Some("PS/2"));
        let usb_mouse = input.get("HID-compliant mouse_#1").unwrap();
        assert_eq!((usb_mouse.bus_type.as_deref(), usb_mouse.device_id.as_deref(), usb_mouse.device_type.as_deref()), (Some("USB"), Some("046D-C52B"), None));
    }

    #[test]
    fn paired_hid_keeps_its_own_fields() {
        let mut snap = snapshot();
        let hid = snap.pnp_entities.iter_mut().find(|e| e.device_id.as_deref() == Some("HID\\ELAN0662&COL01\\5&3")).unwrap();
        hid.device_id = Some("HID\\ELAN0662&COL01&SUBSYS_1234ABCD\\5&3".into());
        let mut c = WindowsCollector::new(snap, None, None);
        c.pci_devices().unwrap();
        let input = c.input().unwrap();
        let touchpad = input.get("HID-compliant mouse").unwrap();
        assert_eq!(touchpad.bus_type.as_deref(), Some("ACPI"));
        assert_eq!(touchpad.device_type.as_deref(), Some("ELAN Touchpad"));
        assert_eq!(touchpad.subsystem_id.as_deref(), Some("1234ABCD"));
    }

    #[test]
    fn unknown_names_fall_back_to_ids_database() {
        let mut snap = snapshot();
        snap.pnp_entities[1].name = None;
        let db = IdsDatabase::parse("10de  NVIDIA Corporation\n\t1b80  GP104 [GeForce GTX 1080]\n");
        let mut c = WindowsCollector::new(snap, Some(db), None);
        c.pci_devices().unwrap();
        assert!(c.gpu().unwrap().contains_key("GP104 [GeForce GTX 1080]"));
    }

    #[test]
    fn unknown_class_video_adapter_is_display() {
        let mut c = WindowsCollector::new(snapshot(), None, None);
        c.pci_devices().unwrap();
        assert_eq!(c.class("Display").len(), 4);
        assert_eq!(c.gpu().unwrap().len(), 3);
    }

    #[test]
    fn monitor_name_fallbacks() {
        let mut snap = snapshot();
        snap.monitors[0].edid.clear();
        let mut c = WindowsCollector::new(snap.clone(), None, None);
        c.pci_devices().unwrap();
        assert!(c.monitor(&Section::new()).unwrap().contains_key("DEL"));
        snap.monitors[0].user_friendly_name.clear();
        let mut c = WindowsCollector::new(snap, None, None);
        c.pci_devices().unwrap();
        let m = c.monitor(&Section::new()).unwrap();
        assert_eq!(m.get("DELA07A").unwrap().connected_gpu, None);
    }

    #[test]
    fn missing_processor_omits_cpu() {
        let mut snap = snapshot();
        snap.processors.clear();
        snap.monitors.clear();
        let r = build_report(&mut WindowsCollector::new(snap, None, None), None);
        assert!(r.cpu.is_none());
        assert!(r.monitor.is_none());
        assert!(r.gpu.is_some());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        let back = WindowsSnapshot::from_json(&json).unwrap();
        assert_eq!(back.pnp_entities.len(), snapshot().pnp_entities.len());
        assert!(WindowsSnapshot::from_json("{not json").is_err());
        assert_eq!(WindowsSnapshot::from_json("{}").unwrap().pnp_entities.len(), 0);
    }

    #[test]
    fn wmi_reference_keys() {
        assert_eq!(parse_wmi_ref_key("\\\\HOST\\root\\cimv2:Win32_DeviceMemoryAddress.StartingAddress=\"4026531840\"").as_deref(), Some("4026531840"));
        assert_eq!(parse_wmi_ref_key("\\\\HOST\\root\\cimv2:Win32_PnPEntity.DeviceID=\"PCI\\\\VEN_8086&DEV_5916\\\\3&11\"").as_deref(), Some("PCI\\VEN_8086&DEV_5916\\3&11"));
        assert_eq!(parse_wmi_ref_key("no key"), None);
    }

    #[test]
    fn device_property_json() {
        let json = r#"[{"InstanceId":"PCI\\VEN_8086&DEV_5916\\3&1","KeyName":"DEVPKEY_Device_LocationPaths","Data":["PCIROOT(0)#PCI(0200)","ACPI(_SB_)#ACPI(PCI0)#ACPI(GFX0)"]},
                       {"InstanceId":"DISPLAY\\DELA07A\\5&2","KeyName":"DEVPKEY_Device_Parent","Data":"PCI\\VEN_8086&DEV_5916\\3&1"}]"#;
        let p = parse_device_properties(json);
        assert_eq!(p["PCI\\VEN_8086&DEV_5916\\3&1"].location_paths.len(), 2);
        assert_eq!(p["DISPLAY\\DELA07A\\5&2"].parent.as_deref(), Some("PCI\\VEN_8086&DEV_5916\\3&1"));
        assert!(parse_device_properties("").is_empty());
    }

    #[test]
    fn small_helpers() {
        assert_eq!(parse_byte_list("0,255,255\r\n"), vec![0, 255, 255]);
        assert_eq!(parse_byte_list("1,x,3"), vec![1]);
        assert_eq!(cim_date("20221108000000.000000+000").as_deref(), Some("11/08/2022"));
        assert_eq!(cim_date("bad"), None);
        assert_eq!(strip_instance_suffix("DISPLAY\\X\\UID1_0"), "DISPLAY\\X\\UID1");
        assert_eq!(strip_instance_suffix("DISPLAY\\X\\UID1"), "DISPLAY\\X\\UID1");
        assert_eq!(decode_friendly_name(&[0x44, 0x45, 0x4c, 0, 0]).as_deref(), Some("DEL"));
        assert_eq!(decode_friendly_name(&[0, 0]), None);
    }
}
