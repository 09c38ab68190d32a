// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Link speeds and transmission media supported by a module.

use crate::Error;
use serde::Deserialize;
use serde::Serialize;

/// A link speed an SFP module may support.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[cfg_attr(feature = "std", derive(clap::ValueEnum))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[cfg_attr(test, derive(strum::EnumIter))]
#[repr(u8)]
pub enum Speed {
    #[serde(rename = "10m")]
    #[cfg_attr(feature = "std", value(name = "10m"))]
    Speed10M = 0,
    #[serde(rename = "100m")]
    #[cfg_attr(feature = "std", value(name = "100m"))]
    Speed100M = 1,
    #[serde(rename = "1g")]
    #[cfg_attr(feature = "std", value(name = "1g"))]
    Speed1G = 2,
    #[serde(rename = "10g")]
    #[cfg_attr(feature = "std", value(name = "10g"))]
    Speed10G = 3,
}

impl Speed {
    /// All speeds, slowest first.
    pub const ALL: [Speed; 4] = [
        Speed::Speed10M,
        Speed::Speed100M,
        Speed::Speed1G,
        Speed::Speed10G,
    ];

    /// Return the nominal rate in megabits per second.
    pub const fn mbps(&self) -> u32 {
        match self {
            Speed::Speed10M => 10,
            Speed::Speed100M => 100,
            Speed::Speed1G => 1_000,
            Speed::Speed10G => 10_000,
        }
    }
}

impl TryFrom<u8> for Speed {
    type Error = Error;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        Speed::ALL
            .get(usize::from(x))
            .copied()
            .ok_or(Error::InvalidSpeed(x))
    }
}

impl core::fmt::Display for Speed {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let s = match self {
            Speed::Speed10M => "10M",
            Speed::Speed100M => "100M",
            Speed::Speed1G => "1G",
            Speed::Speed10G => "10G",
        };
        write!(f, "{s}")
    }
}

bitflags::bitflags! {
    /// The set of link speeds supported by a module.
    ///
    /// Each bit position is the discriminant of the corresponding [`Speed`].
    #[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
    pub struct SpeedCapabilities: u8 {
        const SPEED_10M     = 1 << Speed::Speed10M as u8;
        const SPEED_100M    = 1 << Speed::Speed100M as u8;
        const SPEED_1G      = 1 << Speed::Speed1G as u8;
        const SPEED_10G     = 1 << Speed::Speed10G as u8;
    }
}

impl SpeedCapabilities {
    /// Return the capability bit for a single speed.
    pub const fn from_speed(speed: Speed) -> Self {
        Self::from_bits_truncate(1 << speed as u8)
    }

    /// Construct the set from one boolean per speed, slowest first.
    pub fn from_flags(flags: [bool; 4]) -> Self {
        Speed::ALL
            .into_iter()
            .zip(flags)
            .filter(|(_, set)| *set)
            .fold(Self::empty(), |acc, (speed, _)| acc | Self::from_speed(speed))
    }

    /// Return true if the given speed is supported.
    pub const fn supports(&self, speed: Speed) -> bool {
        self.contains(Self::from_speed(speed))
    }

    /// Return one boolean per speed, indexed by the [`Speed`] discriminant.
    pub fn to_flags(&self) -> [bool; 4] {
        Speed::ALL.map(|speed| self.supports(speed))
    }

    /// Return an iterator over the supported speeds, slowest first.
    pub fn speeds(&self) -> impl Iterator<Item = Speed> + '_ {
        Speed::ALL
            .into_iter()
            .filter(move |speed| self.supports(*speed))
    }
}

// The flags serialize as their names, e.g. `"SPEED_100M | SPEED_1G"`.
#[cfg(feature = "api-traits")]
impl schemars::JsonSchema for SpeedCapabilities {
    fn schema_name() -> String {
        String::from("SpeedCapabilities")
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <String as schemars::JsonSchema>::json_schema(gen)
    }
}

impl From<Speed> for SpeedCapabilities {
    fn from(speed: Speed) -> Self {
        Self::from_speed(speed)
    }
}

impl core::fmt::Display for SpeedCapabilities {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        for (i, speed) in self.speeds().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{speed}")?;
        }
        Ok(())
    }
}

/// The transmission medium of a module.
///
/// A module is classified as exactly one of these.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum Medium {
    Copper,
    #[default]
    Fiber,
}

impl core::fmt::Display for Medium {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Medium::Copper => write!(f, "Copper"),
            Medium::Fiber => write!(f, "Fiber"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Speed;
    use super::SpeedCapabilities;
    use crate::Error;
    use strum::IntoEnumIterator;

    #[test]
    fn test_speed_try_from() {
        for speed in Speed::iter() {
            assert_eq!(Speed::try_from(speed as u8).unwrap(), speed);
        }
        assert_eq!(Speed::try_from(4), Err(Error::InvalidSpeed(4)));
    }

    #[test]
    fn test_speed_capabilities_flags() {
        let caps = SpeedCapabilities::from_flags([false, true, true, false]);
        assert_eq!(caps, SpeedCapabilities::SPEED_100M | SpeedCapabilities::SPEED_1G);
        assert_eq!(caps.to_flags(), [false, true, true, false]);
        assert!(caps.supports(Speed::Speed1G));
        assert!(!caps.supports(Speed::Speed10G));
        assert_eq!(
            caps.speeds().collect::<Vec<_>>(),
            vec![Speed::Speed100M, Speed::Speed1G]
        );
    }

    #[test]
    fn test_speed_capabilities_display() {
        assert_eq!(SpeedCapabilities::empty().to_string(), "none");
        assert_eq!(SpeedCapabilities::all().to_string(), "10M/100M/1G/10G");
        assert_eq!(SpeedCapabilities::from(Speed::Speed10G).to_string(), "10G");
    }

    #[test]
    fn test_speed_serdes() {
        let s = "\"100m\"";
        assert_eq!(serde_json::to_string(&Speed::Speed100M).unwrap(), s);
        assert_eq!(serde_json::from_str::<Speed>(s).unwrap(), Speed::Speed100M);
    }
}
