// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

use crate::Error;
use serde::Deserialize;
use serde::Serialize;

/// The level of a monitored alarm or warning threshold.
///
/// Each of the five diagnostic monitors carries four thresholds, stored in the
/// diagnostics region in the order of the variants here.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "std", derive(clap::ValueEnum))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ThresholdKind {
    HighAlarm = 0,
    LowAlarm = 1,
    HighWarning = 2,
    LowWarning = 3,
}

impl ThresholdKind {
    pub const ALL: [ThresholdKind; 4] = [
        ThresholdKind::HighAlarm,
        ThresholdKind::LowAlarm,
        ThresholdKind::HighWarning,
        ThresholdKind::LowWarning,
    ];

    /// Return the index of this threshold within a monitor's block.
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

impl TryFrom<u8> for ThresholdKind {
    type Error = Error;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        ThresholdKind::ALL
            .get(usize::from(x))
            .copied()
            .ok_or(Error::InvalidThresholdKind(x))
    }
}

impl core::fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let s = match self {
            ThresholdKind::HighAlarm => "High alarm",
            ThresholdKind::LowAlarm => "Low alarm",
            ThresholdKind::HighWarning => "High warning",
            ThresholdKind::LowWarning => "Low warning",
        };
        write!(f, "{s}")
    }
}
