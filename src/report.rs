use crate::error::{CollectError, CollectResult};
use crate::locator::{PathInfo, PnpInfo};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Pick a display name not yet used in `section`: the name itself, else
/// `name_#k` with the smallest free `k` starting at 1.
pub fn unique_key<T>(base: &str, section: &Section<T>) -> String {
    if !section.contains_key(base) { return base.to_string(); }
    (1..).map(|k| format!("{}_#{}", base, k)).find(|k| !section.contains_key(k)).unwrap_or_else(|| base.to_string())
}

/// Insertion-ordered name → entry mapping; serializes as a JSON object in that order.
#[derive(Clone, Debug, PartialEq)]
pub struct Section<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Section<T> {
    fn default() -> Self { Section { entries: Vec::new() } }
}

impl<T> Section<T> {
    pub fn new() -> Self { Self::default() }
    pub fn contains_key(&self, key: &str) -> bool { self.entries.iter().any(|(k, _)| k == key) }
    pub fn get(&self, key: &str) -> Option<&T> { self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> { self.entries.iter().map(|(k, v)| (k.as_str(), v)) }
    pub fn keys(&self) -> impl Iterator<Item = &str> { self.entries.iter().map(|(k, _)| k.as_str()) }

    /// Store `value` under a collision-free variant of `name` and return the key used.
    pub fn insert_unique(&mut self, name: &str, value: T) -> String {
        let key = unique_key(name, self);
        self.entries.push((key.clone(), value));
        key
    }

    /// Stable sort; entries comparing equal keep their collection order.
    pub fn sort_by_key<K: Ord>(&mut self, mut f: impl FnMut(&T) -> K) {
        self.entries.sort_by_key(|(_, v)| f(v));
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries { map.serialize_entry(k, v)?; }
        map.end()
    }
}

/// Attribute set shared by every bus-attached device category.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DeviceInfo {
    #[serde(rename = "Bus Type", skip_serializing_if = "Option::is_none")]
    pub bus_type: Option<String>,
    #[serde(rename = "Device", skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(rename = "Device ID", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(rename = "Subsystem ID", skip_serializing_if = "Option::is_none")]
    pub subsystem_id: Option<String>,
    #[serde(rename = "Controller Device ID", skip_serializing_if = "Option::is_none")]
    pub controller_device_id: Option<String>,
    #[serde(rename = "Device Type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(rename = "PCI Path", skip_serializing_if = "Option::is_none")]
    pub pci_path: Option<String>,
    #[serde(rename = "ACPI Path", skip_serializing_if = "Option::is_none")]
    pub acpi_path: Option<String>,
    #[serde(rename = "Disk Drives", skip_serializing_if = "Option::is_none")]
    pub disk_drives: Option<Vec<String>>,
}

impl DeviceInfo {
    pub fn from_pnp(p: &PnpInfo) -> Self {
        DeviceInfo {
            bus_type: (!p.bus_type.is_empty()).then(|| p.bus_type.clone()),
            device: p.device.clone(),
            device_id: p.device_id.clone(),
            subsystem_id: p.subsystem_id.clone(),
            ..Default::default()
        }
    }

    /// Overwrite every field `other` sets, keeping the ones it leaves empty.
    pub fn merge_from(&mut self, other: &DeviceInfo) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) { if src.is_some() { dst.clone_from(src); } }
        take(&mut self.bus_type, &other.bus_type);
        take(&mut self.device, &other.device);
        take(&mut self.device_id, &other.device_id);
        take(&mut self.subsystem_id, &other.subsystem_id);
        take(&mut self.controller_device_id, &other.controller_device_id);
        take(&mut self.device_type, &other.device_type);
        take(&mut self.pci_path, &other.pci_path);
        take(&mut self.acpi_path, &other.acpi_path);
        take(&mut self.disk_drives, &other.disk_drives);
    }

    pub fn with_paths(mut self, paths: PathInfo) -> Self {
        self.pci_path = paths.pci_path;
        self.acpi_path = paths.acpi_path;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Motherboard {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Chipset")]
    pub chipset: String,
    #[serde(rename = "Platform")]
    pub platform: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bios {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Release Date")]
    pub release_date: String,
    #[serde(rename = "Firmware Type")]
    pub firmware_type: String,
    #[serde(rename = "Secure Boot")]
    pub secure_boot: String,
    #[serde(rename = "Above 4G Decoding")]
    pub above_4g_decoding: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cpu {
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "Processor Name")]
    pub processor_name: String,
    #[serde(rename = "Codename")]
    pub codename: String,
    #[serde(rename = "Core Count")]
    pub core_count: String,
    #[serde(rename = "CPU Count")]
    pub cpu_count: String,
    #[serde(rename = "SIMD Features")]
    pub simd_features: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Gpu {
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "Codename")]
    pub codename: String,
    #[serde(rename = "Bus Type", skip_serializing_if = "Option::is_none")]
    pub bus_type: Option<String>,
    #[serde(rename = "Device ID")]
    pub device_id: String,
    #[serde(rename = "Device Type")]
    pub device_type: String,
    #[serde(rename = "Subsystem ID", skip_serializing_if = "Option::is_none")]
    pub subsystem_id: Option<String>,
    #[serde(rename = "PCI Path", skip_serializing_if = "Option::is_none")]
    pub pci_path: Option<String>,
    #[serde(rename = "ACPI Path", skip_serializing_if = "Option::is_none")]
    pub acpi_path: Option<String>,
    #[serde(rename = "Resizable BAR")]
    pub resizable_bar: String,
    /// PnP instance id (Windows) or sysfs device directory (Linux) the entry came from.
    #[serde(skip)]
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Monitor {
    #[serde(rename = "Connector Type")]
    pub connector_type: String,
    #[serde(rename = "Resolution")]
    pub resolution: String,
    #[serde(rename = "Connected GPU", skip_serializing_if = "Option::is_none")]
    pub connected_gpu: Option<String>,
}

pub fn enabled(flag: bool) -> String { if flag { "Enabled".into() } else { "Disabled".into() } }

/// `true` when the inclusive range covers 4 GiB or more.
pub fn spans_4g(start: u64, end: u64) -> bool { end >= start && end - start >= u32::MAX as u64 }

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HardwareReport {
    #[serde(rename = "Motherboard", skip_serializing_if = "Option::is_none")]
    pub motherboard: Option<Motherboard>,
    #[serde(rename = "BIOS", skip_serializing_if = "Option::is_none")]
    pub bios: Option<Bios>,
    #[serde(rename = "CPU", skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Cpu>,
    #[serde(rename = "GPU", skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Section<Gpu>>,
    #[serde(rename = "Monitor", skip_serializing_if = "Option::is_none")]
    pub monitor: Option<Section<Monitor>>,
    #[serde(rename = "Network", skip_serializing_if = "Option::is_none")]
    pub network: Option<Section<DeviceInfo>>,
    #[serde(rename = "Sound", skip_serializing_if = "Option::is_none")]
    pub sound: Option<Section<DeviceInfo>>,
    #[serde(rename = "USB Controllers", skip_serializing_if = "Option::is_none")]
    pub usb_controllers: Option<Section<DeviceInfo>>,
    #[serde(rename = "Input", skip_serializing_if = "Option::is_none")]
    pub input: Option<Section<DeviceInfo>>,
    #[serde(rename = "Storage Controllers", skip_serializing_if = "Option::is_none")]
    pub storage_controllers: Option<Section<DeviceInfo>>,
    #[serde(rename = "Biometric", skip_serializing_if = "Option::is_none")]
    pub biometric: Option<Section<DeviceInfo>>,
    #[serde(rename = "Bluetooth", skip_serializing_if = "Option::is_none")]
    pub bluetooth: Option<Section<DeviceInfo>>,
    #[serde(rename = "SD Controller", skip_serializing_if = "Option::is_none")]
    pub sd_controller: Option<Section<DeviceInfo>>,
    #[serde(rename = "System Devices", skip_serializing_if = "Option::is_none")]
    pub system_devices: Option<Section<DeviceInfo>>,
}

/// Flattened `(label, value)` view of an entry, used by the text and Markdown renderers.
pub trait Fields {
    fn fields(&self) -> Vec<(&'static str, String)>;
}

fn push(out: &mut Vec<(&'static str, String)>, label: &'static str, v: &Option<String>) {
    if let Some(v) = v { out.push((label, v.clone())); }
}

impl Fields for DeviceInfo {
    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        push(&mut out, "Bus Type", &self.bus_type);
        push(&mut out, "Device", &self.device);
        push(&mut out, "Device ID", &self.device_id);
        push(&mut out, "Subsystem ID", &self.subsystem_id);
        push(&mut out, "Controller Device ID", &self.controller_device_id);
        push(&mut out, "Device Type", &self.device_type);
        push(&mut out, "PCI Path", &self.pci_path);
        push(&mut out, "ACPI Path", &self.acpi_path);
        if let Some(d) = &self.disk_drives { out.push(("Disk Drives", d.join(", "))); }
        out
    }
}

impl Fields for Motherboard {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![("Name", self.name.clone()), ("Chipset", self.chipset.clone()), ("Platform", self.platform.clone())]
    }
}

impl Fields for Bios {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Version", self.version.clone()),
            ("Release Date", self.release_date.clone()),
            ("Firmware Type", self.firmware_type.clone()),
            ("Secure Boot", self.secure_boot.clone()),
            ("Above 4G Decoding", self.above_4g_decoding.clone()),
        ]
    }
}

impl Fields for Cpu {
    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Manufacturer", self.manufacturer.clone()),
            ("Processor Name", self.processor_name.clone()),
            ("Codename", self.codename.clone()),
            ("Core Count", self.core_count.clone()),
            ("CPU Count", self.cpu_count.clone()),
            ("SIMD Features", self.simd_features.clone()),
        ]
    }
}

impl Fields for Gpu {
    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("Manufacturer", self.manufacturer.clone()), ("Codename", self.codename.clone())];
        push(&mut out, "Bus Type", &self.bus_type);
        out.push(("Device ID", self.device_id.clone()));
        out.push(("Device Type", self.device_type.clone()));
        push(&mut out, "Subsystem ID", &self.subsystem_id);
        push(&mut out, "PCI Path", &self.pci_path);
        push(&mut out, "ACPI Path", &self.acpi_path);
        out.push(("Resizable BAR", self.resizable_bar.clone()));
        out
    }
}

impl Fields for Monitor {
    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("Connector Type", self.connector_type.clone()), ("Resolution", self.resolution.clone())];
        push(&mut out, "Connected GPU", &self.connected_gpu);
        out
    }
}

/// One report category as rendered text: entries without a name are single-record categories.
pub struct CategoryView {
    pub name: &'static str,
    pub entries: Vec<(Option<String>, Vec<(&'static str, String)>)>,
}

fn single<T: Fields>(out: &mut Vec<CategoryView>, name: &'static str, v: &Option<T>) {
    if let Some(v) = v { out.push(CategoryView { name, entries: vec![(None, v.fields())] }); }
}

fn many<T: Fields>(out: &mut Vec<CategoryView>, name: &'static str, v: &Option<Section<T>>) {
    if let Some(s) = v { out.push(CategoryView { name, entries: s.iter().map(|(k, e)| (Some(k.to_string()), e.fields())).collect() }); }
}

impl HardwareReport {
    pub fn view(&self) -> Vec<CategoryView> {
        let mut out = Vec::new();
        single(&mut out, "Motherboard", &self.motherboard);
        single(&mut out, "BIOS", &self.bios);
        single(&mut out, "CPU", &self.cpu);
        many(&mut out, "GPU", &self.gpu);
        many(&mut out, "Monitor", &self.monitor);
        many(&mut out, "Network", &self.network);
        many(&mut out, "Sound", &self.sound);
        many(&mut out, "USB Controllers", &self.usb_controllers);
        many(&mut out, "Input", &self.input);
        many(&mut out, "Storage Controllers", &self.storage_controllers);
        many(&mut out, "Biometric", &self.biometric);
        many(&mut out, "Bluetooth", &self.bluetooth);
        many(&mut out, "SD Controller", &self.sd_controller);
        many(&mut out, "System Devices", &self.system_devices);
        out
    }

    pub fn is_empty(&self) -> bool { self.view().is_empty() }
}

/// A platform backend. Stages run in the order they are declared here; each
/// reads only state produced by earlier stages.
pub trait Collector {
    /// Enumerate and group PCI/PnP devices for the later stages. Produces no report entry.
    fn pci_devices(&mut self) -> CollectResult<()>;
    fn motherboard(&mut self) -> CollectResult<Motherboard>;
    fn bios(&mut self) -> CollectResult<Bios>;
    fn cpu(&mut self) -> CollectResult<Cpu>;
    fn gpu(&mut self) -> CollectResult<Section<Gpu>>;
    fn monitor(&mut self, gpus: &Section<Gpu>) -> CollectResult<Section<Monitor>>;
    fn network(&mut self) -> CollectResult<Section<DeviceInfo>>;
    fn sound(&mut self) -> CollectResult<Section<DeviceInfo>>;
    fn usb_controllers(&mut self) -> CollectResult<Section<DeviceInfo>>;
    fn input(&mut self) -> CollectResult<Section<DeviceInfo>>;
    fn storage_controllers(&mut self) -> CollectResult<Section<DeviceInfo>>;
    fn biometric(&mut self) -> CollectResult<Section<DeviceInfo>>;
    fn bluetooth(&mut self) -> CollectResult<Section<DeviceInfo>>;
    fn sd_controller(&mut self) -> CollectResult<Section<DeviceInfo>>;
    fn system_devices(&mut self) -> CollectResult<Section<DeviceInfo>>;
}

/// Per-device skip-and-continue: a failed device is logged and dropped.
pub fn skip_failed<T>(category: &str, device: &str, r: CollectResult<T>) -> Option<T> {
    match r {
        Ok(v) => Some(v),
        Err(e) => { log::debug!("{}: skipping {}: {}", category, device, e); None }
    }
}

trait Emptiness { fn is_empty_result(&self) -> bool { false } }
impl Emptiness for () {}
impl Emptiness for Motherboard {}
impl Emptiness for Bios {}
impl Emptiness for Cpu {}
impl<T> Emptiness for Section<T> { fn is_empty_result(&self) -> bool { self.is_empty() } }

pub const STEP_COUNT: usize = 15;

struct Steps<'a> {
    index: usize,
    progress: Option<&'a indicatif::ProgressBar>,
}

impl Steps<'_> {
    /// Category-level policy: failures and empty results both leave the category out.
    fn run<T: Emptiness>(&mut self, what: &str, category: Option<&str>, f: impl FnOnce() -> CollectResult<T>) -> Option<T> {
        self.index += 1;
        log::info!("[{}/{}] Gathering {}...", self.index, STEP_COUNT, what);
        if let Some(pb) = self.progress { pb.set_message(format!("Gathering {}", what)); pb.set_position(self.index as u64); }
        let label = category.unwrap_or(what);
        match f() {
            Ok(v) if v.is_empty_result() => { log::info!("    - No {} found.", label.to_lowercase()); None }
            Ok(v) => Some(v),
            Err(CollectError::CategoryUnavailable(c)) => { log::info!("    - No {} found ({} unavailable).", label.to_lowercase(), c); None }
            Err(e) => { log::warn!("{} collection failed: {}", label, e); None }
        }
    }
}

/// Run every stage of `collector` in order and assemble the report.
pub fn build_report(collector: &mut dyn Collector, progress: Option<&indicatif::ProgressBar>) -> HardwareReport {
    let mut s = Steps { index: 0, progress };
    let mut r = HardwareReport::default();
    s.run("PCI devices", None, || collector.pci_devices());
    r.motherboard = s.run("motherboard information", Some("Motherboard"), || collector.motherboard());
    r.bios = s.run("BIOS information", Some("BIOS"), || collector.bios());
    r.cpu = s.run("CPU information", Some("CPU"), || collector.cpu());
    r.gpu = s.run("GPU information", Some("GPU"), || collector.gpu()).map(|mut g| { g.sort_by_key(|e| e.device_type.clone()); g });
    let gpus = r.gpu.clone().unwrap_or_default();
    r.monitor = s.run("monitor information", Some("Monitor"), || collector.monitor(&gpus));
    r.network = s.run("network information", Some("Network"), || collector.network());
    r.sound = s.run("sound information", Some("Sound"), || collector.sound());
    r.usb_controllers = s.run("USB controllers", Some("USB Controllers"), || collector.usb_controllers());
    r.input = s.run("input devices", Some("Input"), || collector.input());
    r.storage_controllers = s.run("storage controllers", Some("Storage Controllers"), || collector.storage_controllers());
    r.biometric = s.run("biometric information", Some("Biometric"), || collector.biometric());
    r.bluetooth = s.run("bluetooth information", Some("Bluetooth"), || collector.bluetooth());
    r.sd_controller = s.run("sd controller information", Some("SD Controller"), || collector.sd_controller());
    r.system_devices = s.run("system devices", Some("System Devices"), || collector.system_devices());
    log::info!("Hardware information collection complete.");
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_fields_the_other_side_lacks() {
        let mut hid = DeviceInfo { bus_type: Some("HID".into()), device_id: Some("ELAN-0662".into()), subsystem_id: Some("1234ABCD".into()), device_type: Some("USB".into()), ..Default::default() };
        let acpi = DeviceInfo { bus_type: Some("ACPI".into()), device: Some("ELAN0662".into()), device_id: Some("ELAN-0662".into()), device_type: Some("ELAN Touchpad".into()), ..Default::default() };
        hid.merge_from(&acpi);
        assert_eq!(hid.bus_type.as_deref(), Some("ACPI"));
        assert_eq!(hid.device.as_deref(), Some("ELAN0662"));
        assert_eq!(hid.device_type.as_deref(), Some("ELAN Touchpad"));
        assert_eq!(hid.subsystem_id.as_deref(), Some("1234ABCD"));
    }

    #[test]
    fn allocation_sequence() {
        let mut s: Section<u8> = Section::new();
        assert_eq!(unique_key("GPU", &s), "GPU");
        s.insert_unique("GPU", 0);
        assert_eq!(unique_key("GPU", &s), "GPU_#1");
        s.insert_unique("GPU", 1);
        assert_eq!(unique_key("GPU", &s), "GPU_#2");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn allocation_fills_the_smallest_gap() {
        let mut s: Section<u8> = Section::new();
        s.insert_unique("GPU", 0);
        s.insert_unique("GPU_#2", 0);
        assert_eq!(unique_key("GPU", &s), "GPU_#1");
    }

    #[test]
    fn duplicate_display_names_keep_first_seen_order() {
        let mut s: Section<&str> = Section::new();
        assert_eq!(s.insert_unique("Intel(R) UHD Graphics", "a"), "Intel(R) UHD Graphics");
        assert_eq!(s.insert_unique("Intel(R) UHD Graphics", "b"), "Intel(R) UHD Graphics_#1");
        let keys: Vec<&str> = s.keys().collect();
        assert_eq!(keys, ["Intel(R) UHD Graphics", "Intel(R) UHD Graphics_#1"]);
        assert_eq!(s.get("Intel(R) UHD Graphics_#1"), Some(&"b"));
    }

    #[test]
    fn section_serializes_in_insertion_order() {
        let mut s: Section<DeviceInfo> = Section::new();
        s.insert_unique("Zeta", DeviceInfo { bus_type: Some("PCI".into()), ..Default::default() });
        s.insert_unique("Alpha", DeviceInfo { device_id: Some("8086-1616".into()), ..Default::default() });
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"Zeta":{"Bus Type":"PCI"},"Alpha":{"Device ID":"8086-1616"}}"#);
    }

    #[test]
    fn gpu_sort_is_stable() {
        let mut s: Section<Gpu> = Section::new();
        for (name, t) in [("a", "Integrated GPU"), ("b", "Discrete GPU"), ("c", "Integrated GPU"), ("d", "Discrete GPU")] {
            s.insert_unique(name, Gpu { device_type: t.into(), ..Default::default() });
        }
        s.sort_by_key(|g| g.device_type.clone());
        assert_eq!(s.keys().collect::<Vec<_>>(), ["b", "d", "a", "c"]);
    }

    #[test]
    fn four_gig_ranges() {
        assert!(spans_4g(0x4000000000, 0x40ffffffff));
        assert!(!spans_4g(0xe0000000, 0xefffffff));
        assert!(!spans_4g(10, 0));
    }

    struct Fake { pci_called: bool, gpu_seen_by_monitor: usize }

    fn dev(id: &str) -> Section<DeviceInfo> {
        let mut s = Section::new();
        s.insert_unique("Device", DeviceInfo { device_id: Some(id.into()), ..Default::default() });
        s
    }

    impl Collector for Fake {
        fn pci_devices(&mut self) -> CollectResult<()> { self.pci_called = true; Ok(()) }
        fn motherboard(&mut self) -> CollectResult<Motherboard> { Ok(Motherboard { name: "ACME BOARD".into(), chipset: "Z390".into(), platform: "Desktop".into() }) }
        fn bios(&mut self) -> CollectResult<Bios> { Err(CollectError::CategoryUnavailable("DMI".into())) }
        fn cpu(&mut self) -> CollectResult<Cpu> { Err(CollectError::Malformed("no cpuinfo".into())) }
        fn gpu(&mut self) -> CollectResult<Section<Gpu>> {
            let mut s = Section::new();
            s.insert_unique("iGPU", Gpu { device_type: "Integrated GPU".into(), ..Default::default() });
            s.insert_unique("dGPU", Gpu { device_type: "Discrete GPU".into(), ..Default::default() });
            Ok(s)
        }
        fn monitor(&mut self, gpus: &Section<Gpu>) -> CollectResult<Section<Monitor>> {
            assert!(self.pci_called);
            self.gpu_seen_by_monitor = gpus.len();
            Ok(Section::new())
        }
        fn network(&mut self) -> CollectResult<Section<DeviceInfo>> { Ok(dev("8086-15BC")) }
        fn sound(&mut self) -> CollectResult<Section<DeviceInfo>> { Ok(Section::new()) }
        fn usb_controllers(&mut self) -> CollectResult<Section<DeviceInfo>> { Ok(dev("8086-A36D")) }
        fn input(&mut self) -> CollectResult<Section<DeviceInfo>> { Err(CollectError::Query("boom".into())) }
        fn storage_controllers(&mut self) -> CollectResult<Section<DeviceInfo>> { Ok(Section::new()) }
        fn biometric(&mut self) -> CollectResult<Section<DeviceInfo>> { Ok(Section::new()) }
        fn bluetooth(&mut self) -> CollectResult<Section<DeviceInfo>> { Ok(Section::new()) }
        fn sd_controller(&mut self) -> CollectResult<Section<DeviceInfo>> { Ok(Section::new()) }
        fn system_devices(&mut self) -> CollectResult<Section<DeviceInfo>> { Ok(dev("8086-A323")) }
    }

    #[test]
    fn pipeline_omits_failed_and_empty_categories() {
        let mut c = Fake { pci_called: false, gpu_seen_by_monitor: 0 };
        let r = build_report(&mut c, None);
        assert_eq!(c.gpu_seen_by_monitor, 2);
        assert!(r.bios.is_none() && r.cpu.is_none() && r.monitor.is_none() && r.sound.is_none() && r.input.is_none());
        let json = serde_json::to_value(&r).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["GPU", "Motherboard", "Network", "System Devices", "USB Controllers"]);
        let gpu_keys: Vec<&str> = r.gpu.as_ref().unwrap().keys().collect();
        assert_eq!(gpu_keys, ["dGPU", "iGPU"]);
        let names: Vec<&str> = r.view().iter().map(|c| c.name).collect();
        assert_eq!(names, ["Motherboard", "GPU", "Network", "USB Controllers", "System Devices"]);
    }
}
