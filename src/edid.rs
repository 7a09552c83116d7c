use serde::{Deserialize, Serialize};

pub const BLOCK_LEN: usize = 128;

/// A decoded EDID base block. Every field stays at its default when the input is
/// shorter than one block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edid {
    pub header: String,
    pub manufacturer_id: Option<String>,
    pub product_code: String,
    pub serial_number: u32,
    pub week_of_manufacture: u8,
    pub year_of_manufacture: u16,
    pub edid_version: String,
    pub basic_display_params: String,
    pub chroma_data: String,
    pub established_timings: String,
    pub standard_timings: String,
    pub descriptor_blocks: String,
    pub checksum: u8,
    pub checksum_valid: bool,
    pub extension_blocks: Option<String>,
}

fn hex(bytes: &[u8]) -> String { bytes.iter().map(|b| format!("{:02x}", b)).collect() }

/// Three 5-bit letters packed big-endian; `1` is `A`. Any field outside 1..=26 voids the id.
pub fn decode_manufacturer_id(bytes: &[u8]) -> Option<String> {
    let [hi, lo] = bytes else { return None };
    let word = u16::from_be_bytes([*hi, *lo]);
    [10u16, 5, 0].iter().map(|shift| {
        let v = ((word >> shift) & 0x1f) as u8;
        (1..=26).contains(&v).then(|| (b'A' + v - 1) as char)
    }).collect()
}

pub fn checksum_valid(block: &[u8]) -> bool {
    if block.len() < BLOCK_LEN { return false; }
    let sum: u32 = block[..127].iter().map(|&b| b as u32).sum();
    block[127] as u32 == (256 - sum % 256) % 256
}

pub fn decode(bytes: &[u8]) -> Edid {
    if bytes.len() < BLOCK_LEN { return Edid::default(); }
    Edid {
        header: hex(&bytes[0..8]),
        manufacturer_id: decode_manufacturer_id(&bytes[8..10]),
        product_code: format!("{:02X}{:02X}", bytes[11], bytes[10]),
        serial_number: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        week_of_manufacture: bytes[16],
        year_of_manufacture: bytes[17] as u16 + 1990,
        edid_version: format!("{}.{}", bytes[18], bytes[19]),
        basic_display_params: hex(&bytes[20..25]),
        chroma_data: hex(&bytes[25..35]),
        established_timings: hex(&bytes[35..38]),
        standard_timings: hex(&bytes[38..54]),
        descriptor_blocks: hex(&bytes[54..126]),
        checksum: bytes[127],
        checksum_valid: checksum_valid(bytes),
        extension_blocks: (bytes.len() > BLOCK_LEN).then(|| hex(&bytes[BLOCK_LEN..])),
    }
}

impl Edid {
    /// Display name used for a monitor: manufacturer id followed by product code.
    pub fn monitor_name(&self) -> Option<String> {
        match &self.manufacturer_id {
            Some(m) if !self.product_code.is_empty() => Some(format!("{}{}", m, self.product_code)),
            _ => None,
        }
    }
}
