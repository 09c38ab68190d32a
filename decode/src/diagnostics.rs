// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Decoding of the diagnostic monitoring memory at `0xA2`.
//!
//! See SFF-8472 rev 12.4 Table 9-5. All values here are raw; see
//! [`crate::calibration`] for converting them to physical units.

use crate::utils::read_i16;
use crate::utils::read_u16;
use crate::utils::read_u32;
use crate::Page;
use sfp_types::ThresholdKind;
use static_assertions::const_assert;
use static_assertions::const_assert_eq;
use std::fmt;

// Each monitor has four 2-byte thresholds, in the order of `ThresholdKind`.
const THRESHOLDS_START: usize = 0;
const THRESHOLD_BLOCK_LEN: usize = 8;
const RX_POWER_COEFFICIENTS: usize = 56;
const BIAS_CALIBRATION: usize = 76;
const TX_POWER_CALIBRATION: usize = 80;
const TEMPERATURE_CALIBRATION: usize = 84;
const VOLTAGE_CALIBRATION: usize = 88;
const CHECKSUM: usize = 95;
const READINGS_START: usize = 96;

/// The offset just past the live readings.
pub const READINGS_END: usize = READINGS_START + 2 * Monitor::ALL.len();

const_assert_eq!(THRESHOLDS_START + 5 * THRESHOLD_BLOCK_LEN, 40);
const_assert_eq!(RX_POWER_COEFFICIENTS + 5 * 4, BIAS_CALIBRATION);
const_assert_eq!(VOLTAGE_CALIBRATION + 4, 92);
const_assert!(VOLTAGE_CALIBRATION + 4 < CHECKSUM);
const_assert_eq!(CHECKSUM + 1, READINGS_START);
const_assert!(READINGS_END <= 128);

/// One of the five values monitored by a module with digital diagnostics.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
#[cfg_attr(any(feature = "api-traits", test), serde(rename_all = "snake_case"))]
#[cfg_attr(test, derive(strum::EnumIter))]
pub enum Monitor {
    Temperature,
    Voltage,
    Bias,
    TxPower,
    RxPower,
}

impl Monitor {
    /// All monitors, in the order they appear in memory.
    pub const ALL: [Monitor; 5] = [
        Monitor::Temperature,
        Monitor::Voltage,
        Monitor::Bias,
        Monitor::TxPower,
        Monitor::RxPower,
    ];

    const fn index(&self) -> usize {
        *self as usize
    }

    const fn threshold_offset(&self, kind: ThresholdKind) -> usize {
        THRESHOLDS_START + self.index() * THRESHOLD_BLOCK_LEN + kind.index() * 2
    }

    const fn reading_offset(&self) -> usize {
        READINGS_START + self.index() * 2
    }

    /// Return the units of the calibrated value.
    pub const fn units(&self) -> &'static str {
        match self {
            Monitor::Temperature => "C",
            Monitor::Voltage => "mV",
            Monitor::Bias => "uA",
            Monitor::TxPower | Monitor::RxPower => "x 0.1 uW",
        }
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Monitor::Temperature => write!(f, "Temperature"),
            Monitor::Voltage => write!(f, "Supply voltage"),
            Monitor::Bias => write!(f, "Tx bias current"),
            Monitor::TxPower => write!(f, "Tx power"),
            Monitor::RxPower => write!(f, "Rx power"),
        }
    }
}

/// A linear calibration constant.
///
/// The slope is an unsigned 8.8 fixed-point number, and the offset a signed
/// integer in the units of the raw reading.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct SlopeOffset {
    pub slope: u16,
    pub offset: i16,
}

impl SlopeOffset {
    /// The identity calibration, a slope of 1.0 and no offset.
    pub const IDENTITY: Self = Self {
        slope: 0x0100,
        offset: 0,
    };

    fn from_page(page: &Page, offset: usize) -> Self {
        Self {
            slope: read_u16(page, offset),
            offset: read_i16(page, offset + 2),
        }
    }

    /// Return the slope as a float.
    pub fn slope(&self) -> f32 {
        f32::from(self.slope & 0xff) / 256.0 + f32::from(self.slope >> 8)
    }

    /// Apply the calibration to a raw value.
    pub fn apply(&self, raw: f32) -> f32 {
        raw * self.slope() + f32::from(self.offset)
    }
}

/// The external calibration constants of a module.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
pub struct CalibrationConstants {
    /// The bit patterns of the single-precision receiver power polynomial
    /// coefficients, from the 4th order term down to the constant.
    pub rx_power: [u32; 5],
    pub bias: SlopeOffset,
    pub tx_power: SlopeOffset,
    pub temperature: SlopeOffset,
    pub voltage: SlopeOffset,
}

/// A view of the diagnostic monitoring memory of one module.
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticMap<'a> {
    page: &'a Page,
}

impl<'a> DiagnosticMap<'a> {
    pub const fn new(page: &'a Page) -> Self {
        Self { page }
    }

    /// Return the raw value of one alarm or warning threshold.
    pub const fn threshold(&self, monitor: Monitor, kind: ThresholdKind) -> u16 {
        read_u16(self.page, monitor.threshold_offset(kind))
    }

    /// Return the raw live reading of a monitor.
    pub const fn reading(&self, monitor: Monitor) -> u16 {
        read_u16(self.page, monitor.reading_offset())
    }

    pub fn calibration_constants(&self) -> CalibrationConstants {
        let mut rx_power = [0; 5];
        for (i, coeff) in rx_power.iter_mut().enumerate() {
            *coeff = read_u32(self.page, RX_POWER_COEFFICIENTS + i * 4);
        }
        CalibrationConstants {
            rx_power,
            bias: SlopeOffset::from_page(self.page, BIAS_CALIBRATION),
            tx_power: SlopeOffset::from_page(self.page, TX_POWER_CALIBRATION),
            temperature: SlopeOffset::from_page(self.page, TEMPERATURE_CALIBRATION),
            voltage: SlopeOffset::from_page(self.page, VOLTAGE_CALIBRATION),
        }
    }

    /// Return the stored check code.
    pub const fn checksum(&self) -> u8 {
        self.page[CHECKSUM]
    }
}

#[cfg(test)]
mod tests {
    use super::DiagnosticMap;
    use super::Monitor;
    use super::SlopeOffset;
    use super::READINGS_END;
    use crate::Page;
    use sfp_types::ThresholdKind;
    use strum::IntoEnumIterator;

    #[test]
    fn test_threshold_layout() {
        // Number every 2-byte word by its index.
        let mut page: Page = [0; 128];
        for (i, word) in page[..40].chunks_mut(2).enumerate() {
            word.copy_from_slice(&(i as u16).to_be_bytes());
        }
        let map = DiagnosticMap::new(&page);
        for (m, monitor) in Monitor::iter().enumerate() {
            for kind in ThresholdKind::ALL {
                let expected = (m * 4 + kind as usize) as u16;
                assert_eq!(map.threshold(monitor, kind), expected);
            }
        }
        assert_eq!(map.threshold(Monitor::Voltage, ThresholdKind::LowAlarm), 5);
    }

    #[test]
    fn test_reading_layout() {
        let mut page: Page = [0; 128];
        page[96..READINGS_END].copy_from_slice(&[0x19, 0x00, 0x80, 0xe8, 0x03, 0xe8, 0, 10, 0xff, 0xff]);
        let map = DiagnosticMap::new(&page);
        assert_eq!(map.reading(Monitor::Temperature), 0x1900);
        assert_eq!(map.reading(Monitor::Voltage), 0x80e8);
        assert_eq!(map.reading(Monitor::Bias), 1000);
        assert_eq!(map.reading(Monitor::TxPower), 10);
        assert_eq!(map.reading(Monitor::RxPower), 0xffff);
    }

    #[test]
    fn test_calibration_constants() {
        let mut page: Page = [0; 128];
        // rx_pwr(1) = 1.0
        page[68..72].copy_from_slice(&1.0f32.to_be_bytes());
        // Bias slope 1.5, offset -2.
        page[76..80].copy_from_slice(&[0x01, 0x80, 0xff, 0xfe]);
        // Voltage slope 1.0, offset 100.
        page[88..92].copy_from_slice(&[0x01, 0x00, 0x00, 0x64]);
        let cal = DiagnosticMap::new(&page).calibration_constants();
        assert_eq!(cal.rx_power, [0, 0, 0, 0x3f80_0000, 0]);
        assert_eq!(
            cal.bias,
            SlopeOffset {
                slope: 0x0180,
                offset: -2
            }
        );
        assert_eq!(cal.bias.slope(), 1.5);
        assert_eq!(cal.voltage.offset, 100);
        assert_eq!(cal.tx_power, SlopeOffset::default());
    }

    #[test]
    fn test_slope_fixed_point() {
        assert_eq!(SlopeOffset::IDENTITY.slope(), 1.0);
        let s = SlopeOffset {
            slope: 0x0040,
            offset: 0,
        };
        assert_eq!(s.slope(), 0.25);
        let s = SlopeOffset {
            slope: 0x0280,
            offset: -10,
        };
        assert_eq!(s.apply(100.0), 240.0);
    }
}
