//! Bluetooth SIG company identifiers
//!
//! Maps the 16-bit company identifier carried in manufacturer-specific data
//! to the name published in the SIG "Assigned Numbers" document. Only a
//! subset of the registry is listed; unknown identifiers resolve to `None`.

/// Sorted by identifier so lookups can binary search.
pub const COMPANY_IDENTIFIERS: &[(u16, &str)] = &[
    (0x0000, "Ericsson AB"),
    (0x0001, "Nokia Mobile Phones"),
    (0x0002, "Intel Corp."),
    (0x0003, "IBM Corp."),
    (0x0004, "Toshiba Corp."),
    (0x0005, "3Com"),
    (0x0006, "Microsoft"),
    (0x0007, "Lucent"),
    (0x0008, "Motorola"),
    (0x0009, "Infineon Technologies AG"),
    (0x000A, "Qualcomm Technologies International, Ltd. (QTIL)"),
    (0x000B, "Silicon Wave"),
    (0x000C, "Digianswer A/S"),
    (0x000D, "Texas Instruments Inc."),
    (0x000E, "Parthus Technologies Inc."),
    (0x000F, "Broadcom Corporation"),
    (0x0010, "Mitel Semiconductor"),
    (0x0011, "Widcomm, Inc."),
    (0x0012, "Zeevo, Inc."),
    (0x0013, "Atmel Corporation"),
    (0x0014, "Mitsubishi Electric Corporation"),
    (0x0015, "RTX A/S"),
    (0x0016, "KC Technology Inc."),
    (0x0017, "Newlogic"),
    (0x0018, "Transilica, Inc."),
    (0x0019, "Rohde & Schwarz GmbH & Co. KG"),
    (0x001A, "TTPCom Limited"),
    (0x001B, "Signia Technologies, Inc."),
    (0x001C, "Conexant Systems Inc."),
    (0x001D, "Qualcomm"),
    (0x001E, "Inventel"),
    (0x001F, "AVM Berlin"),
    (0x0020, "BandSpeed, Inc."),
    (0x0021, "Mansella Ltd"),
    (0x0022, "NEC Corporation"),
    (0x0023, "WavePlus Technology Co., Ltd."),
    (0x0024, "Alcatel"),
    (0x0025, "NXP Semiconductors (formerly Philips Semiconductors)"),
    (0x0026, "C Technologies"),
    (0x0027, "Open Interface"),
    (0x0028, "R F Micro Devices"),
    (0x0029, "Hitachi Ltd"),
    (0x002A, "Symbol Technologies, Inc."),
    (0x002B, "Tenovis"),
    (0x002C, "Macronix International Co. Ltd."),
    (0x002D, "GCT Semiconductor"),
    (0x002E, "Norwood Systems"),
    (0x002F, "MewTel Technology Inc."),
    (0x0030, "ST Microelectronics"),
    (0x0031, "Synopsys, Inc."),
    (0x0046, "MediaTek, Inc."),
    (0x0048, "Marvell Technology Group Ltd."),
    (0x004C, "Apple, Inc."),
    (0x0057, "Harman International Industries, Inc."),
    (0x0059, "Nordic Semiconductor ASA"),
    (0x005D, "Realtek Semiconductor Corporation"),
    (0x0065, "HP, Inc."),
    (0x0075, "Samsung Electronics Co. Ltd."),
    (0x0078, "Nike, Inc."),
    (0x0087, "Garmin International, Inc."),
    (0x009E, "Bose Corporation"),
    (0x00C4, "LG Electronics"),
    (0x00E0, "Google"),
    (0x012D, "Sony Corporation"),
    (0x0157, "Anhui Huami Information Technology Co., Ltd."),
    (0x0171, "Amazon.com Services, LLC"),
    (0x027D, "HUAWEI Technologies Co., Ltd."),
    (0x02E5, "Espressif Incorporated"),
    (0x038F, "Xiaomi Inc."),
    (0x0499, "Ruuvi Innovations Ltd."),
    (0x0553, "Nintendo Co., Ltd."),
];

/// Resolve a company identifier to its registered name.
pub fn name_for(id: u16) -> Option<&'static str> {
    COMPANY_IDENTIFIERS
        .binary_search_by_key(&id, |&(known, _)| known)
        .ok()
        .map(|idx| COMPANY_IDENTIFIERS[idx].1)
}

/// Reverse lookup of a registered name. Exact match only.
pub fn id_for(name: &str) -> Option<u16> {
    COMPANY_IDENTIFIERS
        .iter()
        .find(|&&(_, known)| known == name)
        .map(|&(id, _)| id)
}

/// Parse an identifier written as `0x004C` (or `0X004c`).
pub fn parse_identifier(s: &str) -> Option<u16> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))?;
    u16::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sorted_and_unique() {
        assert!(COMPANY_IDENTIFIERS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_name_for() {
        assert_eq!(name_for(0x004C), Some("Apple, Inc."));
        assert_eq!(name_for(0x0006), Some("Microsoft"));
        assert_eq!(name_for(0xFFFF), None);
    }

    #[test]
    fn test_id_for() {
        assert_eq!(id_for("Apple, Inc."), Some(0x004C));
        assert_eq!(id_for("Apple Inc."), None);
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(parse_identifier("0x004C"), Some(0x004C));
        assert_eq!(parse_identifier("0X0499"), Some(0x0499));
        assert_eq!(parse_identifier("Apple, Inc."), None);
        assert_eq!(parse_identifier("0x"), None);
    }
}
