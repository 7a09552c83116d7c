use crate::tables::{self, GpuVendorTable, UNKNOWN};

/// A `VVVV-DDDD` identifier split into its halves, uppercased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HardwareId {
    pub vendor: String,
    pub device: String,
}

impl HardwareId {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_uppercase();
        let (vendor, device) = raw.split_once('-')?;
        if vendor.is_empty() || device.is_empty() { return None; }
        let vendor = if vendor.len() < 4 && vendor.chars().all(|c| c.is_ascii_hexdigit()) { format!("{:0>4}", vendor) } else { vendor.to_string() };
        Some(HardwareId { vendor, device: device.to_string() })
    }

    pub fn from_hex(vendor: u32, device: u32) -> Self {
        HardwareId { vendor: format!("{:04X}", vendor), device: format!("{:04X}", device) }
    }
}

impl std::fmt::Display for HardwareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}-{}", self.vendor, self.device) }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpuClass {
    pub manufacturer: String,
    pub codename: String,
    pub device_id: String,
    pub device_type: String,
}

fn vendor_table(vendor: &str) -> Option<&'static GpuVendorTable> {
    tables::GPU_VENDORS.iter().find(|v| v.vendor_id == vendor)
}

/// Resolve a GPU identifier through its manufacturer's rule list, first match wins.
/// Never fails: anything unmatched comes back as `Unknown`.
pub fn classify_gpu(identifier: &str) -> GpuClass {
    let device_id = identifier.trim().to_uppercase();
    let unknown = |manufacturer: &str| GpuClass { manufacturer: manufacturer.to_string(), codename: UNKNOWN.into(), device_id: device_id.clone(), device_type: UNKNOWN.into() };
    let Some(id) = HardwareId::parse(&device_id) else { return unknown(UNKNOWN) };
    let Some(table) = vendor_table(&id.vendor) else { return unknown(UNKNOWN) };
    match table.rules.iter().find(|r| r.matches(&id.device)) {
        Some(rule) => GpuClass {
            manufacturer: table.manufacturer.to_string(),
            codename: rule.codename.to_string(),
            device_id: id.to_string(),
            device_type: rule.device_type.unwrap_or(table.default_type).to_string(),
        },
        None => GpuClass { device_id: id.to_string(), ..unknown(table.manufacturer) },
    }
}

/// Map a `Family f Model m Stepping s` key (optionally prefixed, as in WMI
/// descriptions) and the marketing name to a codename. Signatures match as plain
/// substrings of the key, tried from the end of the table.
pub fn cpu_codename(processor_name: &str, cpu_key: &str) -> String {
    if cpu_key.contains(tables::KABY_LAKE_R_SIGNATURE)
        && (processor_name.contains("0U") || processor_name.contains("7U"))
        && !processor_name.contains("82") {
        return "Kaby Lake-R".into();
    }
    for (codename, signature, hint) in tables::CPU_SIGNATURES.iter().rev() {
        if !cpu_key.contains(signature) { continue; }
        match hint {
            Some(h) if !processor_name.contains(h) => continue,
            _ => return codename.to_string(),
        }
    }
    UNKNOWN.into()
}

pub fn cpu_key(family: &str, model: &str, stepping: &str) -> String {
    format!("Family {} Model {} Stepping {}", family.trim(), model.trim(), stepping.trim())
}

/// Normalise a CPUID vendor string to the report's manufacturer name.
pub fn cpu_manufacturer(raw: &str) -> String {
    if raw.contains("Intel") { "Intel".into() } else if raw.contains("AMD") { "AMD".into() } else { raw.trim().to_string() }
}

pub fn format_simd(supported: &[&str]) -> String {
    if supported.is_empty() { "SIMD Capabilities Unknown".into() } else { supported.join(", ") }
}

/// SIMD features present in a `/proc/cpuinfo` flags line, in report order.
pub fn simd_from_flags(flags: &str) -> String {
    let have: Vec<&str> = flags.split_whitespace().collect();
    let found: Vec<&str> = tables::SIMD_FEATURES.iter()
        .filter(|(name, flag)| have.contains(flag) || have.contains(&name.to_lowercase().replace('.', "_").as_str()))
        .map(|(name, _)| *name)
        .collect();
    format_simd(&found)
}

fn is_placeholder(s: &str) -> bool {
    let lower = s.to_lowercase();
    tables::PLACEHOLDER_TOKENS.iter().any(|t| lower.contains(t))
}

/// Pick the system display name from the system-level and board-level strings,
/// discarding placeholders and preferring the longer candidate of each pair.
pub fn system_name(manufacturer: &str, model: &str, board_manufacturer: &str, board_model: &str) -> String {
    let first_word = |s: &str| s.split_whitespace().next().unwrap_or("").to_string();
    let mut manufacturer = first_word(manufacturer);
    let mut model = model.trim().to_string();
    let mut board_manufacturer = first_word(board_manufacturer);
    let mut board_model = board_model.trim().to_string();
    if is_placeholder(&board_manufacturer) { board_manufacturer.clear(); }
    if is_placeholder(&board_model) { board_model.clear(); }
    if is_placeholder(&manufacturer) { manufacturer = board_manufacturer.clone(); }
    if is_placeholder(&model) { model = board_model.clone(); }
    if manufacturer.len() < board_manufacturer.len() { manufacturer = board_manufacturer; }
    if model.len() < board_model.len() { model = board_model; }
    if manufacturer.is_empty() && model.is_empty() { return UNKNOWN.into(); }
    format!("{} {}", manufacturer, model).trim().to_uppercase()
}

/// Chipset model from bridge device ids, overridden by an AMD chipset named in the system name.
pub fn chipset<'a>(bridge_ids: impl IntoIterator<Item = &'a str>, system_name: &str) -> String {
    let mut model = bridge_ids.into_iter()
        .find_map(|id| tables::CHIPSET_CONTROLLERS.iter().find(|(k, _)| k.eq_ignore_ascii_case(id)).map(|(_, v)| v.to_string()))
        .unwrap_or_else(|| UNKNOWN.into());
    if let Some(amd) = tables::AMD_CHIPSETS.iter().find(|c| system_name.contains(*c)) { model = amd.to_string(); }
    model
}

/// SMBIOS chassis type or WMI `PCSystemType` → `Laptop`/`Desktop`; unreadable → `Unspecified`.
pub fn platform(chassis: Option<&str>) -> String {
    match chassis.and_then(|c| c.trim().parse::<i64>().ok()) {
        Some(v) if tables::LAPTOP_CHASSIS.contains(&v) => "Laptop".into(),
        Some(_) => "Desktop".into(),
        None => "Unspecified".into(),
    }
}

pub fn zero_pad(n: usize) -> String { format!("{:02}", n) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intel_kaby_lake_integrated() {
        let c = classify_gpu("8086-5916");
        assert_eq!(c, GpuClass { manufacturer: "Intel".into(), codename: "Kaby Lake".into(), device_id: "8086-5916".into(), device_type: "Integrated GPU".into() });
    }

    #[test]
    fn first_match_wins_on_overlapping_prefixes() {
        assert_eq!(classify_gpu("8086-0162").codename, "Ivy Bridge");
        assert_eq!(classify_gpu("8086-0102").codename, "Sandy Bridge");
        assert_eq!(classify_gpu("8086-0A16").codename, "Haswell");
        assert_eq!(classify_gpu("8086-0BD0").codename, "Broadwell");
        assert_eq!(classify_gpu("8086-4E55").codename, "Jasper Lake");
        assert_eq!(classify_gpu("1002-9552").codename, "RV710");
        assert_eq!(classify_gpu("1002-9555").codename, "RV711");
    }

    #[test]
    fn device_type_overrides() {
        assert_eq!(classify_gpu("8086-56A0").device_type, "Discrete GPU");
        assert_eq!(classify_gpu("1002-1638").device_type, "Integrated GPU");
        assert_eq!(classify_gpu("1002-73BF").device_type, "Discrete GPU");
        assert_eq!(classify_gpu("10de-2484").manufacturer, "NVIDIA");
    }

    #[test]
    fn nvidia_exclusions() {
        assert_eq!(classify_gpu("10DE-1180").codename, "Kepler");
        assert_eq!(classify_gpu("10DE-1140").codename, "Fermi");
        assert_eq!(classify_gpu("10DE-1380").codename, "Maxwell");
        assert_eq!(classify_gpu("10DE-1725").codename, "Pascal");
    }

    #[test]
    fn misses_are_unknown_never_errors() {
        let c = classify_gpu("10DE-2484");
        assert_eq!((c.manufacturer.as_str(), c.codename.as_str(), c.device_type.as_str()), ("NVIDIA", "Unknown", "Unknown"));
        let c = classify_gpu("1234-5678");
        assert_eq!((c.manufacturer.as_str(), c.codename.as_str(), c.device_type.as_str()), ("Unknown", "Unknown", "Unknown"));
        assert_eq!(classify_gpu("").codename, "Unknown");
        assert_eq!(classify_gpu("nonsense").device_id, "NONSENSE");
    }

    #[test]
    fn total_over_recognized_vendors() {
        for vendor in ["8086", "1002", "10DE"] {
            for device in (0u32..=0xffff).step_by(0x0111) {
                let c = classify_gpu(&format!("{}-{:04X}", vendor, device));
                assert!(!c.manufacturer.is_empty() && !c.codename.is_empty() && !c.device_type.is_empty());
            }
        }
    }

    #[test]
    fn cpu_reverse_order_and_hints() {
        assert_eq!(cpu_codename("Intel(R) Core(TM) i7-6700K", &cpu_key("6", "94", "3")), "Skylake");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i5-8200Y", &cpu_key("6", "142", "9")), "Amber Lake");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i7-7500U", &cpu_key("6", "142", "9")), "Kaby Lake");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i7-9700K", "Intel64 Family 6 Model 158 Stepping 13"), "Coffee Lake");
        assert_eq!(cpu_codename("AMD Ryzen 7 5800X 8-Core Processor", &cpu_key("25", "33", "0")), "Vermeer");
        assert_eq!(cpu_codename("Mystery", &cpu_key("99", "1", "1")), "Unknown");
    }

    #[test]
    fn unlisted_models_fall_back_to_their_prefix() {
        assert_eq!(cpu_codename("Intel(R) Core(TM)2 Duo", &cpu_key("6", "157", "1")), "Merom");
        assert_eq!(cpu_codename("AMD Ryzen 5 1600", &cpu_key("23", "160", "0")), "Summit Ridge");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i7-8700K", &cpu_key("6", "158", "10")), "Coffee Lake");
    }

    #[test]
    fn kaby_lake_r_exception() {
        let key = cpu_key("6", "142", "10");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i7-8550U", &key), "Kaby Lake-R");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i7-8650U", "Intel64 Family 6 Model 142 Stepping 10"), "Kaby Lake-R");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i5-8250U", &key), "Kaby Lake");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i5-8210Y", &key), "Kaby Lake");
        assert_eq!(cpu_codename("Intel(R) Core(TM) i5-8250U", &cpu_key("6", "142", "11")), "Whiskey Lake");
    }

    #[test]
    fn simd_flags() {
        assert_eq!(simd_from_flags("fpu sse sse2 pni ssse3 sse4_1 sse4_2 avx avx2"), "SSE, SSE2, SSE3, SSSE3, SSE4.1, SSE4.2, AVX, AVX2");
        assert_eq!(simd_from_flags("fpu vme"), "SIMD Capabilities Unknown");
        assert_eq!(simd_from_flags("sse sse4a"), "SSE, SSE4a");
    }

    #[test]
    fn system_name_prefers_real_strings() {
        assert_eq!(system_name("ASUSTeK COMPUTER INC.", "System Product Name", "ASUSTeK COMPUTER INC.", "ROG STRIX B550-F GAMING"), "ASUSTEK ROG STRIX B550-F GAMING");
        assert_eq!(system_name("LENOVO", "20L5", "LENOVO", "20L5"), "LENOVO 20L5");
        assert_eq!(system_name("To Be Filled By O.E.M.", "To Be Filled By O.E.M.", "", ""), "TO");
        assert_eq!(system_name("", "", "", ""), "Unknown");
    }

    #[test]
    fn chipset_lookup_and_amd_override() {
        assert_eq!(chipset(["8086-A305"], "GIGABYTE Z390 AORUS"), "Z390");
        assert_eq!(chipset(["1022-790E"], "ASUSTEK ROG STRIX B550-F GAMING"), "B550");
        assert_eq!(chipset(["1022-790E"], "ASUSTEK PRIME X670E-PRO"), "X670E");
        assert_eq!(chipset(Vec::<&str>::new(), "DELL 0X8DXD"), "Unknown");
    }

    #[test]
    fn chassis_platform() {
        assert_eq!(platform(Some("10\n")), "Laptop");
        assert_eq!(platform(Some("3")), "Desktop");
        assert_eq!(platform(Some("x")), "Unspecified");
        assert_eq!(platform(None), "Unspecified");
    }

    #[test]
    fn hardware_id_normalisation() {
        assert_eq!(HardwareId::parse("8086-5916").map(|h| h.to_string()).as_deref(), Some("8086-5916"));
        assert_eq!(HardwareId::parse("46d-c52b").map(|h| h.to_string()).as_deref(), Some("046D-C52B"));
        assert_eq!(HardwareId::from_hex(0x10de, 0x2484).to_string(), "10DE-2484");
        assert_eq!(HardwareId::parse("8086"), None);
        assert_eq!(zero_pad(4), "04");
    }
}
