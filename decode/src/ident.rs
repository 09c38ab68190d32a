// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Decoding of the serial interface ID memory at `0xA0`.
//!
//! See SFF-8472 rev 12.4 Table 4-1 for the layout of the fields.

use crate::utils::ascii_to_int;
use crate::utils::ascii_to_string;
use crate::utils::extract_bit;
use crate::utils::read_u16;
use crate::Page;
use chrono::NaiveDate;
use static_assertions::const_assert;
use static_assertions::const_assert_eq;
use std::fmt;
use std::ops::Range;

const IDENTIFIER: usize = 0;
const EXTENDED_IDENTIFIER: usize = 1;
const CONNECTOR: usize = 2;
const COMPLIANCE: Range<usize> = 3..11;
const ENCODING: usize = 11;
const NOMINAL_BIT_RATE: usize = 12;
const RATE_IDENTIFIER: usize = 13;
const LENGTH_SMF_KM: usize = 14;
const LENGTH_SMF: usize = 15;
const LENGTH_OM2: usize = 16;
const LENGTH_OM1: usize = 17;
const LENGTH_COPPER: usize = 18;
const VENDOR_NAME: Range<usize> = 20..36;
const VENDOR_OUI: Range<usize> = 37..40;
const VENDOR_PART: Range<usize> = 40..(40 + PART_NUMBER_LEN);
const VENDOR_REVISION: Range<usize> = 56..60;
const WAVELENGTH: usize = 60;
const OPTIONS: usize = 64;
const BIT_RATE_MAX: usize = 66;
const BIT_RATE_MIN: usize = 67;
const VENDOR_SERIAL: Range<usize> = 68..84;
const DATE_CODE: Range<usize> = 84..92;
const DIAGNOSTIC_TYPE: usize = 92;
const ENHANCED_OPTIONS: usize = 93;
const SFF_8472_COMPLIANCE: usize = 94;

/// The width of the vendor part number field.
pub const PART_NUMBER_LEN: usize = 16;

// The base ID fields must all fall before CC_BASE, and the extended ID fields
// before CC_EXT.
const_assert_eq!(COMPLIANCE.end, ENCODING);
const_assert_eq!(VENDOR_OUI.end, VENDOR_PART.start);
const_assert_eq!(VENDOR_PART.end, VENDOR_REVISION.start);
const_assert_eq!(VENDOR_REVISION.end, WAVELENGTH);
const_assert!(WAVELENGTH + 2 == 62);
const_assert_eq!(VENDOR_SERIAL.end, DATE_CODE.start);
const_assert_eq!(DATE_CODE.end, DIAGNOSTIC_TYPE);
const_assert!(SFF_8472_COMPLIANCE < 95);

/// The SFF-8024 identifier for a transceiver module.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
#[cfg_attr(any(feature = "api-traits", test), serde(rename_all = "snake_case"))]
pub enum Identifier {
    Unspecified,
    Gbic,
    Soldered,
    Sfp,
    Xbi,
    Xenpak,
    Xfp,
    Xff,
    XfpE,
    Xpak,
    X2,
    DwdmSfp,
    Qsfp,
    Reserved(u8),
    VendorSpecific(u8),
    Unknown(u8),
}

impl From<u8> for Identifier {
    fn from(x: u8) -> Self {
        use Identifier::*;
        match x {
            0x00 => Unspecified,
            0x01 => Gbic,
            0x02 => Soldered,
            0x03 => Sfp,
            0x04 => Xbi,
            0x05 => Xenpak,
            0x06 => Xfp,
            0x07 => Xff,
            0x08 => XfpE,
            0x09 => Xpak,
            0x0a => X2,
            0x0b => DwdmSfp,
            0x0c => Qsfp,
            0x21..=0x7f => Reserved(x),
            0x80.. => VendorSpecific(x),
            _ => Unknown(x),
        }
    }
}

impl From<Identifier> for u8 {
    fn from(id: Identifier) -> Self {
        use Identifier::*;
        match id {
            Unspecified => 0x00,
            Gbic => 0x01,
            Soldered => 0x02,
            Sfp => 0x03,
            Xbi => 0x04,
            Xenpak => 0x05,
            Xfp => 0x06,
            Xff => 0x07,
            XfpE => 0x08,
            Xpak => 0x09,
            X2 => 0x0a,
            DwdmSfp => 0x0b,
            Qsfp => 0x0c,
            Reserved(x) | VendorSpecific(x) | Unknown(x) => x,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Identifier::*;
        write!(
            f,
            "{}",
            match self {
                Unspecified => "Unknown or unspecified",
                Gbic => "GBIC",
                Soldered => "Module/connector soldered to motherboard",
                Sfp => "SFP/SFP+/SFP28",
                Xbi => "XBI",
                Xenpak => "XENPAK",
                Xfp => "XFP",
                Xff => "XFF",
                XfpE => "XFP-E",
                Xpak => "XPAK",
                X2 => "X2",
                DwdmSfp => "DWDM-SFP/SFP+",
                Qsfp => "QSFP",
                Reserved(_) => "Reserved",
                VendorSpecific(_) => "Vendor Specific",
                Unknown(_) => "Unsupported",
            }
        )
    }
}

crate::bitfield_enum! {
    name = ExtendedIdentifier,
    description = "The extended identifier, describing the module's MOD_DEF function.",
    variants = {
        0x00, Unspecified, "GBIC definition not specified",
        0x01, ModDef1, "MOD_DEF 1",
        0x02, ModDef2, "MOD_DEF 2",
        0x03, ModDef3, "MOD_DEF 3",
        0x04, SerialIdOnly, "Function defined by 2-wire interface ID only",
        0x05, ModDef5, "MOD_DEF 5",
        0x06, ModDef6, "MOD_DEF 6",
        0x07, ModDef7, "MOD_DEF 7",
    },
    other_variants = {
        Unallocated: 0x08..,
    }
}

crate::bitfield_enum! {
    name = Connector,
    description = "The SFF-8024 connector type of the module's media interface.",
    variants = {
        0x00, Unspecified, "Unknown or unspecified",
        0x01, Sc, "SC",
        0x02, FibreChannelCopper1, "Fibre Channel Style 1 copper",
        0x03, FibreChannelCopper2, "Fibre Channel Style 2 copper",
        0x04, Bnc, "BNC/TNC",
        0x05, FibreChannelCoax, "Fibre Channel coax headers",
        0x06, FiberJack, "Fiber Jack",
        0x07, Lc, "LC",
        0x08, MtRj, "MT-RJ",
        0x09, Mu, "MU",
        0x0a, Sg, "SG",
        0x0b, OpticalPigtail, "Optical pigtail",
        0x0c, Mpo1x12, "MPO 1x12",
        0x0d, Mpo2x16, "MPO 2x16",
        0x20, HssdcII, "HSSDC II",
        0x21, CopperPigtail, "Copper pigtail",
        0x22, Rj45, "RJ45",
        0x23, NoSeparableConnector, "No separable connector",
    },
    other_variants = {
        Unknown: _,
    }
}

impl Connector {
    /// The raw connector code of an RJ45 connector.
    pub const RJ45: u8 = 0x22;
}

crate::bitfield_enum! {
    name = Encoding,
    description = "The serial encoding mechanism of the module.",
    variants = {
        0x00, Unspecified, "Unspecified",
        0x01, Enc8B10B, "8B/10B",
        0x02, Enc4B5B, "4B/5B",
        0x03, Nrz, "NRZ",
        0x04, Manchester, "Manchester",
        0x05, Sonet, "SONET Scrambled",
        0x06, Enc64B66B, "64B/66B",
        0x07, Enc256B257B, "256B/257B",
        0x08, Pam4, "PAM4",
    },
    other_variants = {
        Unknown: _,
    }
}

crate::bitfield_enum! {
    name = RateIdentifier,
    description = "The rate select functionality the module implements.",
    variants = {
        0x00, Unspecified, "Unspecified",
        0x01, Sff8079, "SFF-8079 (4/2/1G Rate_Select and AS0/AS1)",
        0x02, Sff8431RxOnly, "SFF-8431 (8/4/2G Rx Rate_Select only)",
        0x04, Sff8431TxOnly, "SFF-8431 (8/4/2G Tx Rate_Select only)",
        0x06, Sff8431Independent, "SFF-8431 (8/4/2G independent Rx and Tx Rate_Select)",
        0x08, FcPi5RxOnly, "FC-PI-5 (16/8/4G Rx Rate_Select only)",
        0x0a, FcPi5Independent, "FC-PI-5 (16/8/4G independent Rx and Tx Rate_Select)",
        0x0c, FcPi6Independent, "FC-PI-6 (32/16/8G independent Rx and Tx Rate_Select)",
        0x0e, TenEightG, "10/8G Rx and Tx Rate_Select",
        0x10, FcPi7Independent, "FC-PI-7 (64/32/16G independent Rx and Tx Rate_Select)",
    },
    other_variants = {
        Unknown: _,
    }
}

/// The transceiver compliance codes, bytes 3-10.
///
/// Each bit declares support for one electronic or optical standard. Only the
/// bytes used to classify link speed are given names here; see SFF-8472 rev
/// 12.4 Table 5-3 for the rest.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct ComplianceCodes(pub [u8; 8]);

impl ComplianceCodes {
    // Byte 3, 10G Ethernet compliance.
    pub const ETH_10GBASE_ER: u8 = 0x80;
    pub const ETH_10GBASE_LRM: u8 = 0x40;
    pub const ETH_10GBASE_LR: u8 = 0x20;
    pub const ETH_10GBASE_SR: u8 = 0x10;
    pub const ETH_10G_MASK: u8 = 0xf0;

    // Byte 5, SONET compliance.
    pub const SONET_OC3_SHORT_REACH: u8 = 0x01;
    pub const SONET_OC3_INTERMEDIATE_REACH: u8 = 0x02;
    pub const SONET_OC3_LONG_REACH: u8 = 0x04;
    pub const SONET_OC12_SHORT_REACH: u8 = 0x10;
    pub const SONET_OC12_INTERMEDIATE_REACH: u8 = 0x20;
    pub const SONET_OC12_LONG_REACH: u8 = 0x40;
    pub const SONET_OC3_MASK: u8 = 0x07;

    // Byte 6, Ethernet compliance.
    pub const ETH_BASE_PX: u8 = 0x80;
    pub const ETH_BASE_BX10: u8 = 0x40;
    pub const ETH_100BASE_FX: u8 = 0x20;
    pub const ETH_100BASE_LX: u8 = 0x10;
    pub const ETH_1000BASE_T: u8 = 0x08;
    pub const ETH_1000BASE_CX: u8 = 0x04;
    pub const ETH_1000BASE_LX: u8 = 0x02;
    pub const ETH_1000BASE_SX: u8 = 0x01;

    const NAMED: [(usize, u8, &'static str); 18] = [
        (0, Self::ETH_10GBASE_ER, "10GBASE-ER"),
        (0, Self::ETH_10GBASE_LRM, "10GBASE-LRM"),
        (0, Self::ETH_10GBASE_LR, "10GBASE-LR"),
        (0, Self::ETH_10GBASE_SR, "10GBASE-SR"),
        (2, Self::SONET_OC3_SHORT_REACH, "OC-3 short reach"),
        (2, Self::SONET_OC3_INTERMEDIATE_REACH, "OC-3 intermediate reach"),
        (2, Self::SONET_OC3_LONG_REACH, "OC-3 long reach"),
        (2, Self::SONET_OC12_SHORT_REACH, "OC-12 short reach"),
        (2, Self::SONET_OC12_INTERMEDIATE_REACH, "OC-12 intermediate reach"),
        (2, Self::SONET_OC12_LONG_REACH, "OC-12 long reach"),
        (3, Self::ETH_BASE_PX, "BASE-PX"),
        (3, Self::ETH_BASE_BX10, "BASE-BX10"),
        (3, Self::ETH_100BASE_FX, "100BASE-FX"),
        (3, Self::ETH_100BASE_LX, "100BASE-LX/LX10"),
        (3, Self::ETH_1000BASE_T, "1000BASE-T"),
        (3, Self::ETH_1000BASE_CX, "1000BASE-CX"),
        (3, Self::ETH_1000BASE_LX, "1000BASE-LX"),
        (3, Self::ETH_1000BASE_SX, "1000BASE-SX"),
    ];

    /// The 10G Ethernet compliance byte (byte 3).
    pub const fn ethernet_10g(&self) -> u8 {
        self.0[0]
    }

    /// The low SONET compliance byte (byte 5).
    pub const fn sonet(&self) -> u8 {
        self.0[2]
    }

    /// The Ethernet compliance byte (byte 6).
    pub const fn ethernet(&self) -> u8 {
        self.0[3]
    }

    /// Return the names of the named standards the module declares.
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(byte, mask, _)| self.0[*byte] & mask != 0)
            .map(|(_, _, name)| *name)
            .collect()
    }
}

/// The link lengths supported by the module, each in the units SFF-8472
/// defines for its medium.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct LinkLengths {
    /// Single-mode fibre, in kilometers.
    pub single_mode_km: u8,
    /// Single-mode fibre, in units of 100 m.
    pub single_mode_100m: u8,
    /// 50 um OM2 multi-mode fibre, in units of 10 m.
    pub om2_10m: u8,
    /// 62.5 um OM1 multi-mode fibre, in units of 10 m.
    pub om1_10m: u8,
    /// Copper or active cable, in meters.
    pub copper_m: u8,
}

impl LinkLengths {
    /// Return the supported link length in meters.
    ///
    /// The fields are consulted in order of decreasing unit size, and the
    /// first nonzero one is used. If every field is zero, `None` is returned.
    pub fn length_m(&self) -> Option<u32> {
        [
            (self.single_mode_km, 1000),
            (self.single_mode_100m, 100),
            (self.om2_10m, 10),
            (self.om1_10m, 10),
            (self.copper_m, 1),
        ]
        .into_iter()
        .find(|(len, _)| *len != 0)
        .map(|(len, scale)| u32::from(len) * scale)
    }
}

/// An SFF-8472 date code.
///
/// The code is 8 ASCII characters: two digits each for the year (relative to
/// 2000), month and day, and an optional 2-digit lot code. Each pair is parsed
/// leniently, so a malformed code decodes to zeros rather than an error.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct DateCode {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub lot: u32,
}

impl DateCode {
    /// Return the calendar date, if the code names a valid one.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl From<&[u8]> for DateCode {
    fn from(buf: &[u8]) -> Self {
        let field = |range: Range<usize>| buf.get(range).map(ascii_to_int).unwrap_or(0);
        let unsigned = |x: i32| u32::try_from(x).unwrap_or(0);
        DateCode {
            year: field(0..2) + 2000,
            month: unsigned(field(2..4)),
            day: unsigned(field(4..6)),
            lot: unsigned(field(6..8)),
        }
    }
}

impl fmt::Display for DateCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const FMT: &str = "%d %b %Y";
        match self.date() {
            Some(date) => write!(f, "{} (Lot {:02})", date.format(FMT), self.lot),
            None => write!(
                f,
                "{}-{:02}-{:02} (Lot {:02})",
                self.year, self.month, self.day, self.lot
            ),
        }
    }
}

/// Vendor-specific information about a transceiver module.
#[derive(Clone, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct Vendor {
    pub name: String,
    pub oui: [u8; 3],
    pub part: String,
    pub revision: String,
    pub serial: String,
    pub date: DateCode,
}

impl Vendor {
    /// Return a formatted version of the Organizational Unique Identifier.
    pub fn format_oui(&self) -> String {
        format!(
            "{0:02x}-{1:02x}-{2:02x}",
            self.oui[0], self.oui[1], self.oui[2]
        )
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", &self.name, &self.part)
    }
}

impl fmt::Debug for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Vendor")
            .field("name", &self.name)
            .field("oui", &self.format_oui())
            .field("part", &self.part)
            .field("revision", &self.revision)
            .field("serial", &self.serial)
            .field("date", &self.date)
            .finish()
    }
}

/// The diagnostic monitoring features a module advertises.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct DiagnosticCapabilities {
    /// Digital diagnostic monitoring is implemented.
    pub diagnostics: bool,
    /// Readings are calibrated by the module itself.
    pub internally_calibrated: bool,
    /// Readings must be calibrated by the host, using the constants in the
    /// diagnostics region.
    pub externally_calibrated: bool,
    /// Alarm and warning flags are implemented.
    pub alarms: bool,
}

/// A view of the serial interface ID memory of one module.
///
/// Each accessor decodes its field directly from the page, so the view is
/// always consistent with the bytes it borrows.
#[derive(Clone, Copy, Debug)]
pub struct InterfaceIdMap<'a> {
    page: &'a Page,
}

impl<'a> InterfaceIdMap<'a> {
    pub const fn new(page: &'a Page) -> Self {
        Self { page }
    }

    pub fn identifier(&self) -> Identifier {
        Identifier::from(self.page[IDENTIFIER])
    }

    pub fn extended_identifier(&self) -> ExtendedIdentifier {
        ExtendedIdentifier::from(self.page[EXTENDED_IDENTIFIER])
    }

    pub fn connector(&self) -> Connector {
        Connector::from(self.page[CONNECTOR])
    }

    /// Return the raw connector code.
    pub const fn connector_code(&self) -> u8 {
        self.page[CONNECTOR]
    }

    pub fn compliance_codes(&self) -> ComplianceCodes {
        let mut codes = [0; 8];
        codes.copy_from_slice(&self.page[COMPLIANCE]);
        ComplianceCodes(codes)
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::from(self.page[ENCODING])
    }

    /// Return the raw encoding code.
    pub const fn encoding_code(&self) -> u8 {
        self.page[ENCODING]
    }

    /// Return the nominal bit rate, in units of 100 Mbit/s.
    pub const fn nominal_bit_rate(&self) -> u8 {
        self.page[NOMINAL_BIT_RATE]
    }

    pub fn rate_identifier(&self) -> RateIdentifier {
        RateIdentifier::from(self.page[RATE_IDENTIFIER])
    }

    pub const fn link_lengths(&self) -> LinkLengths {
        LinkLengths {
            single_mode_km: self.page[LENGTH_SMF_KM],
            single_mode_100m: self.page[LENGTH_SMF],
            om2_10m: self.page[LENGTH_OM2],
            om1_10m: self.page[LENGTH_OM1],
            copper_m: self.page[LENGTH_COPPER],
        }
    }

    pub fn vendor_name(&self) -> String {
        ascii_to_string(&self.page[VENDOR_NAME])
    }

    pub const fn vendor_oui(&self) -> [u8; 3] {
        [
            self.page[VENDOR_OUI.start],
            self.page[VENDOR_OUI.start + 1],
            self.page[VENDOR_OUI.start + 2],
        ]
    }

    /// Return the vendor part number, with its padding removed.
    pub fn part_number(&self) -> String {
        ascii_to_string(&self.page[VENDOR_PART])
    }

    /// Return the vendor part number as a NUL-terminated byte string.
    ///
    /// Trailing padding is replaced with NULs, and the last byte is always a
    /// NUL, even when the part number fills its entire field.
    pub fn part_number_terminated(&self) -> [u8; PART_NUMBER_LEN + 1] {
        let mut out = [0; PART_NUMBER_LEN + 1];
        let field = &self.page[VENDOR_PART];
        let len = field
            .iter()
            .rposition(|b| *b != b' ' && *b != 0)
            .map_or(0, |i| i + 1);
        out[..len].copy_from_slice(&field[..len]);
        out
    }

    pub fn vendor_revision(&self) -> String {
        ascii_to_string(&self.page[VENDOR_REVISION])
    }

    pub fn serial_number(&self) -> String {
        ascii_to_string(&self.page[VENDOR_SERIAL])
    }

    pub fn date_code(&self) -> DateCode {
        DateCode::from(&self.page[DATE_CODE])
    }

    pub fn vendor(&self) -> Vendor {
        Vendor {
            name: self.vendor_name(),
            oui: self.vendor_oui(),
            part: self.part_number(),
            revision: self.vendor_revision(),
            serial: self.serial_number(),
            date: self.date_code(),
        }
    }

    /// Return the nominal laser wavelength, in nanometers.
    pub const fn wavelength(&self) -> u16 {
        read_u16(self.page, WAVELENGTH)
    }

    /// Return the implemented option bits, bytes 64-65.
    pub const fn options(&self) -> u16 {
        read_u16(self.page, OPTIONS)
    }

    /// Return the upper bit rate margin, in percent of nominal.
    pub const fn bit_rate_max(&self) -> u8 {
        self.page[BIT_RATE_MAX]
    }

    /// Return the lower bit rate margin, in percent of nominal.
    pub const fn bit_rate_min(&self) -> u8 {
        self.page[BIT_RATE_MIN]
    }

    pub const fn diagnostic_capabilities(&self) -> DiagnosticCapabilities {
        let diag = self.page[DIAGNOSTIC_TYPE];
        DiagnosticCapabilities {
            diagnostics: extract_bit(diag, 6),
            internally_calibrated: extract_bit(diag, 5),
            externally_calibrated: extract_bit(diag, 4),
            alarms: extract_bit(self.page[ENHANCED_OPTIONS], 7),
        }
    }

    /// Return the revision of SFF-8472 the module complies with.
    pub const fn sff8472_revision(&self) -> u8 {
        self.page[SFF_8472_COMPLIANCE]
    }
}

#[cfg(test)]
mod tests {
    use super::ComplianceCodes;
    use super::Connector;
    use super::DateCode;
    use super::Encoding;
    use super::ExtendedIdentifier;
    use super::Identifier;
    use super::InterfaceIdMap;
    use super::LinkLengths;
    use super::RateIdentifier;
    use crate::Page;
    use chrono::NaiveDate;

    fn page_with(fields: &[(usize, &[u8])]) -> Page {
        let mut page = [0; 128];
        for (offset, bytes) in fields {
            page[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }
        page
    }

    #[test]
    fn test_identifier_codes() {
        assert_eq!(Identifier::from(0x03), Identifier::Sfp);
        assert_eq!(Identifier::from(0x30), Identifier::Reserved(0x30));
        assert_eq!(Identifier::from(0x90), Identifier::VendorSpecific(0x90));
        assert_eq!(Identifier::from(0x11), Identifier::Unknown(0x11));
        for x in 0..=u8::MAX {
            assert_eq!(u8::from(Identifier::from(x)), x);
        }
        assert_eq!(Identifier::Sfp.to_string(), "SFP/SFP+/SFP28");
    }

    #[test]
    fn test_byte_code_enums() {
        assert_eq!(Connector::from(0x07), Connector::Lc);
        assert_eq!(Connector::from(Connector::RJ45), Connector::Rj45);
        assert_eq!(Connector::from(0x99), Connector::Unknown(0x99));
        assert_eq!(Connector::from(0x99).to_string(), "Unknown (99)");
        assert_eq!(u8::from(Connector::Rj45), 0x22);
        assert_eq!(Encoding::from(0x01).to_string(), "8B/10B");
        assert_eq!(
            ExtendedIdentifier::from(0x04),
            ExtendedIdentifier::SerialIdOnly
        );
        assert_eq!(
            ExtendedIdentifier::from(0x08),
            ExtendedIdentifier::Unallocated(0x08)
        );
        assert_eq!(RateIdentifier::from(0x02), RateIdentifier::Sff8431RxOnly);
        assert_eq!(RateIdentifier::from(0x03), RateIdentifier::Unknown(0x03));
    }

    #[test]
    fn test_rate_identifier_from_page() {
        let page = page_with(&[(13, &[0x06])]);
        assert_eq!(
            InterfaceIdMap::new(&page).rate_identifier(),
            RateIdentifier::Sff8431Independent
        );
    }

    #[test]
    fn test_connector_serdes() {
        let s = serde_json::to_string(&Connector::Lc).unwrap();
        assert_eq!(s, "\"LC\"");
        assert_eq!(serde_json::from_str::<Connector>(&s).unwrap(), Connector::Lc);
    }

    #[test]
    fn test_part_number_padding() {
        let page = page_with(&[(40, b"ABC123          ")]);
        let map = InterfaceIdMap::new(&page);
        assert_eq!(map.part_number(), "ABC123");

        let raw = map.part_number_terminated();
        let len = raw.iter().position(|b| *b == 0).unwrap();
        assert_eq!(len, 6);
        assert_eq!(&raw[..len], b"ABC123");
        assert_eq!(raw[16], 0);
    }

    #[test]
    fn test_part_number_full_field_is_terminated() {
        let page = page_with(&[(40, b"0123456789ABCDEF")]);
        let raw = InterfaceIdMap::new(&page).part_number_terminated();
        assert_eq!(&raw[..16], b"0123456789ABCDEF");
        assert_eq!(raw[16], 0);
    }

    #[test]
    fn test_link_length_priority() {
        let lengths = LinkLengths {
            single_mode_100m: 5,
            ..Default::default()
        };
        assert_eq!(lengths.length_m(), Some(500));

        let lengths = LinkLengths {
            single_mode_km: 2,
            single_mode_100m: 5,
            copper_m: 3,
            ..Default::default()
        };
        assert_eq!(lengths.length_m(), Some(2000));

        let lengths = LinkLengths {
            om1_10m: 30,
            copper_m: 3,
            ..Default::default()
        };
        assert_eq!(lengths.length_m(), Some(300));

        assert_eq!(LinkLengths::default().length_m(), None);
    }

    #[test]
    fn test_link_lengths_from_page() {
        let page = page_with(&[(14, &[0, 5, 0, 0, 0])]);
        let lengths = InterfaceIdMap::new(&page).link_lengths();
        assert_eq!(lengths.single_mode_100m, 5);
        assert_eq!(lengths.length_m(), Some(500));
    }

    #[test]
    fn test_date_code() {
        let code = DateCode::from(&b"21031507"[..]);
        assert_eq!(
            code,
            DateCode {
                year: 2021,
                month: 3,
                day: 15,
                lot: 7,
            }
        );
        assert_eq!(code.date(), NaiveDate::from_ymd_opt(2021, 3, 15));
        assert_eq!(code.to_string(), "15 Mar 2021 (Lot 07)");

        // No lot code, and a lenient parse of the padding.
        let code = DateCode::from(&b"190101  "[..]);
        assert_eq!(code.lot, 0);
        assert_eq!(code.date(), NaiveDate::from_ymd_opt(2019, 1, 1));

        // Garbage decodes to zeros, which is not a valid date.
        let code = DateCode::from(&b"        "[..]);
        assert_eq!(code.year, 2000);
        assert_eq!(code.month, 0);
        assert!(code.date().is_none());
    }

    #[test]
    fn test_parse_vendor() {
        const VENDOR_NAME: &[u8] = b"some vendor     ";
        const OUI: [u8; 3] = [0x00, 0x90, 0x65];
        const PART: &[u8] = b"FTLF8519P2BNL   ";
        const REVISION: &[u8] = b"A   ";
        const SERIAL: &[u8] = b"PXX0ABC         ";
        const DATE: &[u8] = b"20010100";
        let page = page_with(&[
            (20, VENDOR_NAME),
            (37, &OUI),
            (40, PART),
            (56, REVISION),
            (68, SERIAL),
            (84, DATE),
        ]);
        let vendor = InterfaceIdMap::new(&page).vendor();
        assert_eq!(vendor.name, "some vendor");
        assert_eq!(vendor.oui, OUI);
        assert_eq!(vendor.format_oui(), "00-90-65");
        assert_eq!(vendor.part, "FTLF8519P2BNL");
        assert_eq!(vendor.revision, "A");
        assert_eq!(vendor.serial, "PXX0ABC");
        assert_eq!(vendor.date.date(), NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(vendor.to_string(), "some vendor FTLF8519P2BNL");
    }

    #[test]
    fn test_wavelength_is_big_endian() {
        // 1310 nm.
        let page = page_with(&[(60, &[0x05, 0x1e])]);
        assert_eq!(InterfaceIdMap::new(&page).wavelength(), 1310);
    }

    #[test]
    fn test_diagnostic_capabilities() {
        let page = page_with(&[(92, &[0x60, 0x80, 0x08])]);
        let map = InterfaceIdMap::new(&page);
        let caps = map.diagnostic_capabilities();
        assert!(caps.diagnostics);
        assert!(caps.internally_calibrated);
        assert!(!caps.externally_calibrated);
        assert!(caps.alarms);
        assert_eq!(map.sff8472_revision(), 0x08);

        let page = page_with(&[(92, &[0x50, 0x00])]);
        let caps = InterfaceIdMap::new(&page).diagnostic_capabilities();
        assert!(caps.diagnostics);
        assert!(!caps.internally_calibrated);
        assert!(caps.externally_calibrated);
        assert!(!caps.alarms);
    }

    #[test]
    fn test_compliance_names() {
        let page = page_with(&[(3, &[0x10, 0, 0x01, 0x08])]);
        let codes = InterfaceIdMap::new(&page).compliance_codes();
        assert_eq!(codes.ethernet_10g(), ComplianceCodes::ETH_10GBASE_SR);
        assert_eq!(codes.sonet(), ComplianceCodes::SONET_OC3_SHORT_REACH);
        assert_eq!(codes.ethernet(), ComplianceCodes::ETH_1000BASE_T);
        assert_eq!(
            codes.names(),
            vec!["10GBASE-SR", "OC-3 short reach", "1000BASE-T"]
        );
    }
}
