// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Convert raw diagnostic readings into physical units.
//!
//! Modules either report readings already calibrated, or report raw A/D
//! counts along with constants the host uses to calibrate them. See SFF-8472
//! rev 12.4 section 9.3 for the formulas.
//!
//! The units of the converted values are:
//!
//! - Temperature: whole degrees C.
//! - Supply voltage: mV.
//! - Bias current: uA.
//! - Transmit and receive power: 0.1 uW.

use crate::diagnostics::CalibrationConstants;
use crate::diagnostics::DiagnosticMap;
use crate::diagnostics::Monitor;
use crate::ident::InterfaceIdMap;
use sfp_types::ThresholdKind;

/// How a module's readings must be calibrated.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
#[cfg_attr(any(feature = "api-traits", test), serde(rename_all = "snake_case"))]
pub enum Calibration {
    /// The module reports calibrated values.
    Internal,
    /// The host calibrates with the module's constants.
    External(CalibrationConstants),
}

impl Calibration {
    /// Determine the calibration of a module from its current memory.
    ///
    /// The internally-calibrated flag lives in the interface ID memory, while
    /// the constants live in the diagnostics memory.
    pub fn from_maps(ident: &InterfaceIdMap<'_>, diag: &DiagnosticMap<'_>) -> Self {
        if ident.diagnostic_capabilities().internally_calibrated {
            Calibration::Internal
        } else {
            Calibration::External(diag.calibration_constants())
        }
    }

    /// Convert a raw temperature.
    pub fn temperature(&self, raw: u16) -> i16 {
        // Temperature is a signed 8.8 fixed-point value.
        let raw = raw as i16;
        match self {
            Calibration::Internal => raw / 256,
            Calibration::External(c) => (c.temperature.apply(f32::from(raw)) / 256.0) as i16,
        }
    }

    /// Convert a raw supply voltage.
    pub fn voltage(&self, raw: u16) -> u16 {
        match self {
            Calibration::Internal => raw / 10,
            Calibration::External(c) => (c.voltage.apply(f32::from(raw)) / 10.0) as u16,
        }
    }

    /// Convert a raw laser bias current.
    pub fn bias(&self, raw: u16) -> u32 {
        match self {
            Calibration::Internal => u32::from(raw) * 2,
            Calibration::External(c) => (c.bias.apply(f32::from(raw)) * 2.0) as u32,
        }
    }

    /// Convert a raw transmit power.
    pub fn tx_power(&self, raw: u16) -> u32 {
        match self {
            Calibration::Internal => u32::from(raw),
            Calibration::External(c) => c.tx_power.apply(f32::from(raw)) as u32,
        }
    }

    /// Convert a raw receive power.
    ///
    /// Externally calibrated modules provide a 4th order polynomial. A result
    /// that is negative once truncated is reported as zero.
    pub fn rx_power(&self, raw: u16) -> u32 {
        match self {
            Calibration::Internal => u32::from(raw),
            Calibration::External(c) => {
                let x = f32::from(raw);
                let power = c
                    .rx_power
                    .iter()
                    .map(|bits| decode_ieee754(*bits))
                    .fold(0.0f32, |acc, coeff| acc * x + coeff);
                let truncated = power as i64 as u32;
                if truncated & 0x8000_0000 != 0 {
                    0
                } else {
                    truncated
                }
            }
        }
    }

    /// Convert a raw value of any monitor, widened to a common type.
    pub fn convert(&self, monitor: Monitor, raw: u16) -> i64 {
        match monitor {
            Monitor::Temperature => i64::from(self.temperature(raw)),
            Monitor::Voltage => i64::from(self.voltage(raw)),
            Monitor::Bias => i64::from(self.bias(raw)),
            Monitor::TxPower => i64::from(self.tx_power(raw)),
            Monitor::RxPower => i64::from(self.rx_power(raw)),
        }
    }

    /// Convert the live reading of a monitor.
    pub fn reading(&self, diag: &DiagnosticMap<'_>, monitor: Monitor) -> i64 {
        self.convert(monitor, diag.reading(monitor))
    }

    /// Convert one alarm or warning threshold of a monitor.
    pub fn threshold(&self, diag: &DiagnosticMap<'_>, monitor: Monitor, kind: ThresholdKind) -> i64 {
        self.convert(monitor, diag.threshold(monitor, kind))
    }
}

/// Decode the bit pattern of an IEEE-754 single-precision float.
///
/// The value is assembled from its sign, biased exponent and mantissa, which
/// keeps the result independent of how the host represents floats. Zero,
/// subnormals, infinities and NaN are all handled.
pub fn decode_ieee754(bits: u32) -> f32 {
    const MANTISSA_BITS: u32 = 23;
    const MANTISSA_MASK: u32 = (1 << MANTISSA_BITS) - 1;
    const EXPONENT_MASK: u32 = 0xff;
    const BIAS: i32 = 127;

    let sign = if bits >> 31 == 0 { 1.0 } else { -1.0 };
    let exponent = ((bits >> MANTISSA_BITS) & EXPONENT_MASK) as i32;
    let mantissa = f64::from(bits & MANTISSA_MASK);
    let scale = f64::from(1u32 << MANTISSA_BITS);

    let magnitude = match exponent {
        0 => mantissa / scale * 2f64.powi(1 - BIAS),
        0xff if mantissa == 0.0 => f64::INFINITY,
        0xff => f64::NAN,
        e => (1.0 + mantissa / scale) * 2f64.powi(e - BIAS),
    };
    (sign * magnitude) as f32
}
