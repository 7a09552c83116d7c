//! Static identification datasets.
//!
//! Every table here is ordered and the order is part of its meaning: GPU rules
//! resolve first-match-wins, CPU signatures are walked from the bottom up.
//! Several GPU prefixes overlap or repeat on purpose; do not "tidy" them.

/// One GPU device-id rule. `prefixes` are tested against the device half of a
/// `VVVV-DDDD` identifier, `except` vetoes the rule for the listed prefixes.
#[derive(Clone, Copy, Debug)]
pub struct GpuRule {
    pub prefixes: &'static [&'static str],
    pub except: &'static [&'static str],
    pub codename: &'static str,
    pub device_type: Option<&'static str>,
}

impl GpuRule {
    pub fn matches(&self, device_id: &str) -> bool {
        self.prefixes.iter().any(|p| device_id.starts_with(p)) && !self.except.iter().any(|p| device_id.starts_with(p))
    }
}

const fn rule(prefixes: &'static [&'static str], codename: &'static str) -> GpuRule {
    GpuRule { prefixes, except: &[], codename, device_type: None }
}

const fn typed(prefixes: &'static [&'static str], codename: &'static str, device_type: &'static str) -> GpuRule {
    GpuRule { prefixes, except: &[], codename, device_type: Some(device_type) }
}

const fn except(prefixes: &'static [&'static str], except: &'static [&'static str], codename: &'static str) -> GpuRule {
    GpuRule { prefixes, except, codename, device_type: None }
}

pub const INTEGRATED_GPU: &str = "Integrated GPU";
pub const DISCRETE_GPU: &str = "Discrete GPU";
pub const UNKNOWN: &str = "Unknown";

/// A manufacturer's rule list plus the device type used when a rule carries no override.
#[derive(Clone, Copy, Debug)]
pub struct GpuVendorTable {
    pub vendor_id: &'static str,
    pub manufacturer: &'static str,
    pub default_type: &'static str,
    pub rules: &'static [GpuRule],
}

pub static INTEL_GPU_RULES: &[GpuRule] = &[
    rule(&["015", "016"], "Ivy Bridge"),
    rule(&["01"], "Sandy Bridge"),
    rule(&["04", "0A", "0C", "0D"], "Haswell"),
    rule(&["0B", "16"], "Broadwell"),
    rule(&["09", "19"], "Skylake"),
    rule(&["0A", "1A", "5A"], "Apollo Lake"),
    rule(&["31"], "Gemini Lake"),
    rule(&["59", "87C0"], "Kaby Lake"),
    rule(&["3E", "87", "9B"], "Coffee Lake"),
    rule(&["8A"], "Ice Lake"),
    rule(&["4E"], "Jasper Lake"),
    rule(&["9A"], "Tiger Lake"),
    rule(&["45"], "Elkhart Lake"),
    rule(&["4E"], "Jasper Lake"),
    rule(&["4C"], "Rocket Lake"),
    rule(&["462", "46A"], "Alder Lake-P"),
    rule(&["46D"], "Alder Lake-N"),
    rule(&["468", "469"], "Alder Lake-S"),
    typed(&["49"], "DG1", DISCRETE_GPU),
    rule(&["A78"], "Raptor Lake-S"),
    rule(&["A7"], "Raptor Lake-P"),
    typed(&["56"], "Alchemist", DISCRETE_GPU),
    typed(&["0B"], "Ponte Vecchio", DISCRETE_GPU),
    rule(&["7D"], "Meteor Lake"),
];

pub static AMD_GPU_RULES: &[GpuRule] = &[
    typed(&["15D8"], "Picasso", INTEGRATED_GPU),
    typed(&["15DD"], "Raven Ridge", INTEGRATED_GPU),
    typed(&["15E7"], "Barcelo", INTEGRATED_GPU),
    typed(&["1636"], "Renoir", INTEGRATED_GPU),
    typed(&["1638"], "Cezanne", INTEGRATED_GPU),
    typed(&["164C"], "Lucienne", INTEGRATED_GPU),
    typed(&["164E"], "Raphael", INTEGRATED_GPU),
    typed(&["164D"], "Rembrandt", INTEGRATED_GPU),
    typed(&["164F", "19"], "Phoenix", INTEGRATED_GPU),
    rule(&["94C"], "RV610"),
    rule(&["958"], "RV630"),
    rule(&["940"], "R600"),
    rule(&["95C"], "RV620"),
    rule(&["959"], "RV635"),
    rule(&["950F"], "R680"),
    rule(&["950", "951"], "RV670"),
    rule(&["9555", "9557"], "RV711"),
    rule(&["954", "955"], "RV710"),
    rule(&["959"], "RV635"),
    rule(&["948", "949"], "RV730"),
    rule(&["9441", "9443"], "R700"),
    rule(&["944", "945", "946A"], "RV770"),
    rule(&["946"], "RV790"),
    rule(&["68C", "68D"], "Redwood"),
    rule(&["68A", "68B"], "Juniper"),
    rule(&["6880"], "Lexington"),
    rule(&["689C", "689D"], "Hemlock"),
    rule(&["688", "689"], "Cypress"),
    rule(&["6750"], "Onega"),
    rule(&["674", "675"], "Turks"),
    rule(&["673"], "Barts"),
    rule(&["671C", "671D"], "Antilles"),
    rule(&["670", "671"], "Cayman"),
    rule(&["68E8", "68E9", "68F"], "Cedar"),
    rule(&["6828", "6829", "682B", "683"], "Cape Verde"),
    rule(&["682"], "Venus"),
    rule(&["679B"], "Malta"),
    rule(&["678", "679"], "Tahiti"),
    rule(&["677"], "Caicos"),
    rule(&["67B9"], "Vesuvius"),
    rule(&["67A", "67B"], "Hawaii"),
    rule(&["6640", "6641", "6647"], "Saturn"),
    rule(&["664", "665"], "Bonaire"),
    rule(&["6810", "6811"], "Curacao"),
    rule(&["680", "681"], "Pitcairn"),
    rule(&["6929", "692B", "692F", "693"], "Tonga"),
    rule(&["67B0"], "Grenada"),
    rule(&["6907"], "Meso"),
    rule(&["690"], "Topaz"),
    rule(&["730"], "Fiji"),
    rule(&["6608", "6609", "661", "6631"], "Oland"),
    rule(&["67C", "67D"], "Ellesmere"),
    rule(&["67E", "67F"], "Baffin"),
    rule(&["698", "699"], "Lexa"),
    rule(&["6FDF"], "Polaris 20"),
    rule(&["694"], "Polaris 22"),
    rule(&["686", "687"], "Vega 10"),
    rule(&["69A"], "Vega 12"),
    rule(&["66A"], "Vega 20"),
    rule(&["731"], "Navi 10"),
    rule(&["736"], "Navi 12"),
    rule(&["734"], "Navi 14"),
    rule(&["73A", "73B"], "Navi 21"),
    rule(&["73C", "73D"], "Navi 22"),
    rule(&["73E", "73FF"], "Navi 23"),
    rule(&["742", "743"], "Navi 24"),
    rule(&["744", "745"], "Navi 31"),
    rule(&["746", "747"], "Navi 32"),
    rule(&["748", "749", "73F0"], "Navi 33"),
];

pub static NVIDIA_GPU_RULES: &[GpuRule] = &[
    except(&["0FC", "0FD", "0FE", "0FF", "100", "101", "102", "103", "11", "128", "129", "12A", "12B", "130"], &["1140"], "Kepler"),
    rule(&["05E", "05F", "0A2", "0A3", "0A6", "0A7", "0C", "10C", "10D"], "Tesla"),
    rule(&["06C", "06D", "0DC", "0DD", "0DE", "0DF", "0E2", "0E3", "0F0", "104", "105", "107", "108", "109", "114", "120", "121", "124", "125"], "Fermi"),
    except(&["13", "14", "16", "17"], &["172"], "Maxwell"),
    rule(&["15", "172", "1B", "1C", "1D0", "1D1", "1D3", "1D5"], "Pascal"),
];

pub static GPU_VENDORS: &[GpuVendorTable] = &[
    GpuVendorTable { vendor_id: "8086", manufacturer: "Intel", default_type: INTEGRATED_GPU, rules: INTEL_GPU_RULES },
    GpuVendorTable { vendor_id: "1002", manufacturer: "AMD", default_type: DISCRETE_GPU, rules: AMD_GPU_RULES },
    GpuVendorTable { vendor_id: "10DE", manufacturer: "NVIDIA", default_type: DISCRETE_GPU, rules: NVIDIA_GPU_RULES },
];

/// CPU signature table: `(codename, signature, marketing-name hint)`.
/// Walked from the last entry to the first, so narrower signatures go below broader ones.
pub static CPU_SIGNATURES: &[(&str, &str, Option<&str>)] = &[
    ("Bonnell", "Family 6 Model 28", None),
    ("Merom", "Family 6 Model 15", None),
    ("Penryn", "Family 6 Model 23", None),
    ("Nehalem", "Family 6 Model 26", None),
    ("Nehalem", "Family 6 Model 30", None),
    ("Westmere", "Family 6 Model 37", None),
    ("Westmere", "Family 6 Model 44", None),
    ("Sandy Bridge", "Family 6 Model 42", None),
    ("Sandy Bridge-E", "Family 6 Model 45", None),
    ("Ivy Bridge", "Family 6 Model 58", None),
    ("Ivy Bridge-E", "Family 6 Model 62", None),
    ("Bay Trail", "Family 6 Model 55", None),
    ("Haswell", "Family 6 Model 60", None),
    ("Haswell", "Family 6 Model 69", None),
    ("Haswell", "Family 6 Model 70", None),
    ("Haswell-E", "Family 6 Model 63", None),
    ("Broadwell", "Family 6 Model 61", None),
    ("Broadwell", "Family 6 Model 71", None),
    ("Broadwell-E", "Family 6 Model 79", None),
    ("Braswell", "Family 6 Model 76", None),
    ("Skylake", "Family 6 Model 78", None),
    ("Skylake", "Family 6 Model 94", None),
    ("Skylake-X", "Family 6 Model 85", None),
    ("Cascade Lake", "Family 6 Model 85 Stepping 7", None),
    ("Apollo Lake", "Family 6 Model 92", None),
    ("Gemini Lake", "Family 6 Model 122", None),
    ("Kaby Lake", "Family 6 Model 142", None),
    ("Amber Lake", "Family 6 Model 142 Stepping 9", Some("Y")),
    ("Whiskey Lake", "Family 6 Model 142 Stepping 11", None),
    ("Comet Lake", "Family 6 Model 142 Stepping 12", None),
    ("Amber Lake", "Family 6 Model 142 Stepping 12", Some("Y")),
    ("Kaby Lake", "Family 6 Model 158", None),
    ("Coffee Lake", "Family 6 Model 158 Stepping 10", None),
    ("Coffee Lake", "Family 6 Model 158 Stepping 11", None),
    ("Coffee Lake", "Family 6 Model 158 Stepping 12", None),
    ("Coffee Lake", "Family 6 Model 158 Stepping 13", None),
    ("Cannon Lake", "Family 6 Model 102", None),
    ("Comet Lake", "Family 6 Model 165", None),
    ("Comet Lake", "Family 6 Model 166", None),
    ("Ice Lake", "Family 6 Model 125", None),
    ("Ice Lake", "Family 6 Model 126", None),
    ("Elkhart Lake", "Family 6 Model 150", None),
    ("Jasper Lake", "Family 6 Model 156", None),
    ("Tiger Lake", "Family 6 Model 140", None),
    ("Tiger Lake", "Family 6 Model 141", None),
    ("Rocket Lake", "Family 6 Model 167", None),
    ("Alder Lake", "Family 6 Model 151", None),
    ("Alder Lake", "Family 6 Model 154", None),
    ("Alder Lake-N", "Family 6 Model 190", None),
    ("Raptor Lake", "Family 6 Model 183", None),
    ("Raptor Lake", "Family 6 Model 186", None),
    ("Raptor Lake", "Family 6 Model 191", None),
    ("Meteor Lake", "Family 6 Model 170", None),
    ("Lunar Lake", "Family 6 Model 189", None),
    ("Arrow Lake", "Family 6 Model 197", None),
    ("Arrow Lake", "Family 6 Model 198", None),
    ("Bulldozer", "Family 21 Model 1", None),
    ("Piledriver", "Family 21 Model 2", None),
    ("Trinity", "Family 21 Model 16", None),
    ("Richland", "Family 21 Model 19", None),
    ("Kaveri", "Family 21 Model 48", None),
    ("Godavari", "Family 21 Model 56", None),
    ("Carrizo", "Family 21 Model 96", None),
    ("Bristol Ridge", "Family 21 Model 101", None),
    ("Stoney Ridge", "Family 21 Model 112", None),
    ("Kabini", "Family 22 Model 0", None),
    ("Beema", "Family 22 Model 48", None),
    ("Mullins", "Family 22 Model 48", Some("Micro")),
    ("Summit Ridge", "Family 23 Model 1", None),
    ("Pinnacle Ridge", "Family 23 Model 8", None),
    ("Raven Ridge", "Family 23 Model 17", None),
    ("Picasso", "Family 23 Model 24", None),
    ("Matisse", "Family 23 Model 113", None),
    ("Castle Peak", "Family 23 Model 49", None),
    ("Renoir", "Family 23 Model 96", None),
    ("Lucienne", "Family 23 Model 104", None),
    ("Van Gogh", "Family 23 Model 144", None),
    ("Vermeer", "Family 25 Model 33", None),
    ("Cezanne", "Family 25 Model 80", None),
    ("Barcelo", "Family 25 Model 80", Some("25")),
    ("Rembrandt", "Family 25 Model 68", None),
    ("Raphael", "Family 25 Model 97", None),
    ("Phoenix", "Family 25 Model 116", None),
    ("Phoenix", "Family 25 Model 117", None),
    ("Strix Point", "Family 26 Model 36", None),
    ("Granite Ridge", "Family 26 Model 68", None),
];

/// Signature that is shared by Kaby Lake-R and later parts; see `classify::cpu_codename`.
pub const KABY_LAKE_R_SIGNATURE: &str = "Family 6 Model 142 Stepping 10";

/// LPC/eSPI/ISA bridge identifier → chipset model.
pub static CHIPSET_CONTROLLERS: &[(&str, &str)] = &[
    ("8086-1C44", "Z68"), ("8086-1C46", "P67"), ("8086-1C4A", "H67"), ("8086-1C4C", "Q65"), ("8086-1C4E", "Q67"),
    ("8086-1C5C", "H61"), ("8086-1C49", "HM65"), ("8086-1C4B", "HM67"), ("8086-1C4F", "QM67"),
    ("8086-1E44", "Z77"), ("8086-1E46", "Z75"), ("8086-1E4A", "H77"), ("8086-1E47", "Q77"), ("8086-1E48", "Q75"),
    ("8086-1E49", "B75"), ("8086-1E55", "QM77"), ("8086-1E57", "HM77"), ("8086-1E59", "HM76"), ("8086-1E5D", "HM75"),
    ("8086-1E5E", "HM70"),
    ("8086-8C44", "Z87"), ("8086-8C4A", "H87"), ("8086-8C4E", "Q87"), ("8086-8C50", "B85"), ("8086-8C5C", "H81"),
    ("8086-8C4B", "HM87"), ("8086-8C4F", "QM87"), ("8086-8C49", "HM86"), ("8086-8CC4", "Z97"), ("8086-8CC6", "H97"),
    ("8086-A143", "H110"), ("8086-A144", "H170"), ("8086-A145", "Z170"), ("8086-A146", "Q170"), ("8086-A147", "Q150"),
    ("8086-A148", "B150"), ("8086-A14D", "QM170"), ("8086-A14E", "HM170"),
    ("8086-A2C4", "H270"), ("8086-A2C5", "Z270"), ("8086-A2C6", "Q270"), ("8086-A2C7", "Q250"), ("8086-A2C8", "B250"),
    ("8086-A2CC", "B365"),
    ("8086-A303", "H310"), ("8086-A304", "H370"), ("8086-A305", "Z390"), ("8086-A306", "Q370"), ("8086-A308", "B360"),
    ("8086-A30C", "QM370"), ("8086-A30D", "HM370"),
    ("8086-A3C8", "B460"), ("8086-A3DA", "H410"), ("8086-0684", "H470"), ("8086-0685", "Z490"), ("8086-0687", "Q470"),
    ("8086-068D", "HM470"),
    ("8086-4385", "Z590"), ("8086-4386", "Q570"), ("8086-4387", "B560"), ("8086-4388", "H570"), ("8086-438B", "H510"),
    ("8086-7A83", "Q670"), ("8086-7A84", "Z690"), ("8086-7A85", "H670"), ("8086-7A86", "B660"), ("8086-7A87", "H610"),
    ("8086-7A04", "Z790"), ("8086-7A05", "H770"), ("8086-7A06", "B760"),
];

/// AMD chipset model names searched for inside the system name. Longer names precede their prefixes.
pub static AMD_CHIPSETS: &[&str] = &[
    "X870E", "X870", "B850", "B840", "X670E", "X670", "B650E", "B650", "A620",
    "X570", "B550", "A520", "X470", "B450", "X370", "B350", "A320", "TRX40", "X399", "WRX80",
];

/// Tokens that mark a firmware-provided manufacturer/model string as a placeholder.
pub static PLACEHOLDER_TOKENS: &[&str] = &["unknown", "manufacturer", "o.e.m.", "product"];

/// SMBIOS chassis / WMI PCSystemType codes reported as laptops.
pub static LAPTOP_CHASSIS: &[i64] = &[2, 8, 9, 10];

/// `(report name, /proc/cpuinfo flag)`; the report lists them in this order.
pub static SIMD_FEATURES: &[(&str, &str)] = &[
    ("SSE", "sse"), ("SSE2", "sse2"), ("SSE3", "pni"), ("SSSE3", "ssse3"), ("SSE4.1", "sse4_1"),
    ("SSE4.2", "sse4_2"), ("SSE4a", "sse4a"), ("AVX", "avx"), ("AVX2", "avx2"),
];

/// WmiMonitorConnectionParams.VideoOutputTechnology → connector name.
pub fn connector_type(code: i64) -> &'static str {
    match code {
        0 => "VGA",
        4 => "DVI",
        5 => "HDMI",
        6 => "LVDS",
        10 => "DP",
        11 => "eDP",
        -2147483648 | 2147483648 => "Internal",
        _ => "Uninitialized",
    }
}

/// PCI base class + subclass (`0xCCSS`) → the class name `lspci` would print.
pub fn pci_class_name(code: u32) -> Option<&'static str> {
    Some(match code {
        0x0100 => "SCSI storage controller",
        0x0101 => "IDE interface",
        0x0104 => "RAID bus controller",
        0x0106 => "SATA controller",
        0x0107 => "Serial Attached SCSI controller",
        0x0108 => "Non-Volatile memory controller",
        0x0200 => "Ethernet controller",
        0x0280 => "Network controller",
        0x0300 => "VGA compatible controller",
        0x0302 => "3D controller",
        0x0380 => "Display controller",
        0x0401 => "Multimedia audio controller",
        0x0403 => "Audio device",
        0x0500 => "RAM memory",
        0x0580 => "Memory controller",
        0x0600 => "Host bridge",
        0x0601 => "ISA bridge",
        0x0604 => "PCI bridge",
        0x0680 => "Bridge",
        0x0700 => "Serial controller",
        0x0780 => "Communication controller",
        0x0805 => "SD Host controller",
        0x0880 => "System peripheral",
        0x0c03 => "USB controller",
        0x0c05 => "SMBus",
        0x0c80 => "Serial bus controller",
        0x0d11 => "Bluetooth",
        0x1080 => "Encryption controller",
        0x1180 => "Signal processing controller",
        _ => return None,
    })
}
