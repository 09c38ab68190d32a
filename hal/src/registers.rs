// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Register maps of the SFP control logic on each supported platform.
//!
//! Every platform exposes the same three signals per cage, each one bit in a
//! 64-bit register:
//!
//! - `enable_n`, which powers the module when cleared;
//! - `tx_disable`, which disables the transmitter when set;
//! - `detect_n`, which reads as cleared when a module is seated.
//!
//! Platforms differ only in which register and bit carry each signal, so they
//! are described by data rather than code.

use crate::Error;
use crate::IoError;
use crate::PresenceAndControl;
use crate::RegisterAccess;
use sfp_types::PortMask;
use sfp_types::Speed;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

/// The hardware platform hosting the SFP cages.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
#[cfg_attr(any(feature = "api-traits", test), serde(rename_all = "snake_case"))]
pub enum Platform {
    Etchell4,
    Etchell5,
    Clipper,
    Clipper2,
}

// Etchell-4 packs three control bits per port into one register.
const E4_CONTROL: u32 = 0x01;
const E4_STATUS: u32 = 0x86;

const E5_CONTROL: u32 = 0x1_0000;
const E5_STATUS: u32 = 0x1_0001;

// Clipper splits its cages across two control / status register pairs.
const CLIPPER_CONTROL: [u32; 2] = [0x500, 0x501];
const CLIPPER_STATUS: &[u32] = &[0x502, 0x503];
const CLIPPER_PORTS_PER_REGISTER: u8 = 8;

// Time for a module's supply to settle after it's powered.
const CLIPPER_ENABLE_DELAY: Duration = Duration::from_millis(5);

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Etchell4,
        Platform::Etchell5,
        Platform::Clipper,
        Platform::Clipper2,
    ];

    /// Return the number of SFP cages.
    pub const fn port_count(&self) -> u8 {
        match self {
            Platform::Etchell4 => 4,
            Platform::Etchell5 | Platform::Clipper2 => 8,
            Platform::Clipper => 12,
        }
    }

    /// Return the valid port numbers, starting from 1.
    pub const fn ports(&self) -> RangeInclusive<u8> {
        1..=self.port_count()
    }

    /// Return true if `port` names a cage on this platform.
    pub const fn is_valid_port(&self, port: u8) -> bool {
        port >= 1 && port <= self.port_count()
    }

    /// Return the speed a port runs at unless configured otherwise.
    pub const fn default_speed(&self) -> Speed {
        Speed::Speed1G
    }

    /// Return true if the platform can't run any port at 10G, so that the
    /// capability must be removed from every module.
    pub const fn clears_10g(&self) -> bool {
        matches!(self, Platform::Etchell4 | Platform::Etchell5)
    }

    /// Return true if reads of an unpowered or unresponsive module succeed
    /// with blank data, which must be treated as failures.
    pub const fn rejects_blank_reads(&self) -> bool {
        matches!(self, Platform::Clipper | Platform::Clipper2)
    }

    /// Return the time to wait after applying power to a module, if any.
    pub const fn enable_delay(&self) -> Option<Duration> {
        match self {
            Platform::Clipper | Platform::Clipper2 => Some(CLIPPER_ENABLE_DELAY),
            _ => None,
        }
    }

    /// Return the status registers, which together cover every port.
    pub fn status_registers(&self) -> &'static [u32] {
        match self {
            Platform::Etchell4 => &[E4_STATUS],
            Platform::Etchell5 => &[E5_STATUS],
            Platform::Clipper => CLIPPER_STATUS,
            Platform::Clipper2 => &CLIPPER_STATUS[..1],
        }
    }

    /// Return the register bits controlling one port.
    pub fn port_registers(&self, port: u8) -> Result<PortRegisters, Error> {
        if !self.is_valid_port(port) {
            return Err(Error::UnsupportedPort {
                platform: *self,
                port,
            });
        }
        let index = port - 1;
        let regs = match self {
            Platform::Etchell4 => PortRegisters {
                enable_n: RegisterBit::new(E4_CONTROL, 3 * index),
                tx_disable: RegisterBit::new(E4_CONTROL, 3 * index + 2),
                detect_n: RegisterBit::new(E4_STATUS, 4 * index + 1),
            },
            Platform::Etchell5 => PortRegisters {
                enable_n: RegisterBit::new(E5_CONTROL, 4 * index),
                tx_disable: RegisterBit::new(E5_CONTROL, 4 * index + 1),
                detect_n: RegisterBit::new(E5_STATUS, 4 * index),
            },
            Platform::Clipper | Platform::Clipper2 => {
                let bank = usize::from(index / CLIPPER_PORTS_PER_REGISTER);
                let k = index % CLIPPER_PORTS_PER_REGISTER;
                PortRegisters {
                    enable_n: RegisterBit::new(CLIPPER_CONTROL[bank], 4 * k),
                    tx_disable: RegisterBit::new(CLIPPER_CONTROL[bank], 4 * k + 1),
                    detect_n: RegisterBit::new(CLIPPER_STATUS[bank], 4 * k + 1),
                }
            }
        };
        Ok(regs)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Platform::Etchell4 => write!(f, "etchell-4"),
            Platform::Etchell5 => write!(f, "etchell-5"),
            Platform::Clipper => write!(f, "clipper"),
            Platform::Clipper2 => write!(f, "clipper-2"),
        }
    }
}

/// A single bit in a platform register.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RegisterBit {
    pub offset: u32,
    pub bit: u8,
}

impl RegisterBit {
    pub const fn new(offset: u32, bit: u8) -> Self {
        Self { offset, bit }
    }

    pub const fn mask(&self) -> u64 {
        1 << self.bit
    }

    /// Return true if the bit is set in `value`.
    pub const fn is_set(&self, value: u64) -> bool {
        value & self.mask() != 0
    }

    /// Return `value` with the bit set or cleared.
    pub const fn apply(&self, value: u64, set: bool) -> u64 {
        if set {
            value | self.mask()
        } else {
            value & !self.mask()
        }
    }
}

/// The signals of one SFP cage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PortRegisters {
    pub enable_n: RegisterBit,
    pub tx_disable: RegisterBit,
    pub detect_n: RegisterBit,
}

/// Presence and control of one port, through the platform's registers.
#[derive(Debug)]
pub struct RegisterControl<R> {
    platform: Platform,
    port: u8,
    regs: PortRegisters,
    access: R,
}

impl<R: RegisterAccess> RegisterControl<R> {
    pub fn new(platform: Platform, port: u8, access: R) -> Result<Self, Error> {
        let regs = platform.port_registers(port)?;
        Ok(Self {
            platform,
            port,
            regs,
            access,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn registers(&self) -> &PortRegisters {
        &self.regs
    }

    pub fn into_inner(self) -> R {
        self.access
    }

    // Set or clear one bit, writing back only if it actually changed.
    //
    // Returns true if the register was written.
    fn update_bit(&mut self, bit: RegisterBit, set: bool) -> Result<bool, IoError> {
        let old = self.access.read(bit.offset)?;
        let new = bit.apply(old, set);
        if new == old {
            return Ok(false);
        }
        self.access.write(bit.offset, new)?;
        Ok(true)
    }
}

impl<R: RegisterAccess> PresenceAndControl for RegisterControl<R> {
    fn is_detected(&mut self) -> Result<bool, IoError> {
        let status = self.access.read(self.regs.detect_n.offset)?;
        Ok(!self.regs.detect_n.is_set(status))
    }

    fn set_enable(&mut self, enable: bool) -> Result<(), IoError> {
        self.update_bit(self.regs.enable_n, !enable).map(|_| ())
    }

    fn set_tx_enable(&mut self, enable: bool) -> Result<(), IoError> {
        self.update_bit(self.regs.tx_disable, !enable).map(|_| ())
    }
}

/// Return the set of ports with a module seated, from one read of each
/// status register.
pub fn detected_ports<R: RegisterAccess>(
    platform: Platform,
    access: &mut R,
) -> Result<PortMask, Error> {
    let mut snapshot = Vec::with_capacity(platform.status_registers().len());
    for offset in platform.status_registers() {
        snapshot.push((*offset, access.read(*offset)?));
    }
    let mut mask = PortMask::empty();
    for port in platform.ports() {
        let detect_n = platform.port_registers(port)?.detect_n;
        let present = snapshot
            .iter()
            .find(|(offset, _)| *offset == detect_n.offset)
            .is_some_and(|(_, value)| !detect_n.is_set(*value));
        if present {
            mask.set(port)?;
        }
    }
    Ok(mask)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::detected_ports;
    use super::Platform;
    use super::RegisterBit;
    use super::RegisterControl;
    use crate::Error;
    use crate::IoError;
    use crate::PresenceAndControl;
    use crate::RegisterAccess;
    use sfp_types::PortMask;
    use std::collections::BTreeMap;

    /// Registers backed by a map, recording every write.
    #[derive(Clone, Debug, Default)]
    pub struct FakeRegisters {
        pub values: BTreeMap<u32, u64>,
        pub writes: Vec<(u32, u64)>,
        pub fail: bool,
    }

    impl FakeRegisters {
        pub fn with(values: &[(u32, u64)]) -> Self {
            Self {
                values: values.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    impl RegisterAccess for FakeRegisters {
        fn read(&mut self, offset: u32) -> Result<u64, IoError> {
            if self.fail {
                return Err(IoError::Register {
                    offset,
                    reason: String::from("no response"),
                });
            }
            Ok(self.values.get(&offset).copied().unwrap_or(0))
        }

        fn write(&mut self, offset: u32, value: u64) -> Result<(), IoError> {
            if self.fail {
                return Err(IoError::Register {
                    offset,
                    reason: String::from("no response"),
                });
            }
            self.values.insert(offset, value);
            self.writes.push((offset, value));
            Ok(())
        }
    }

    #[test]
    fn test_etchell4_layout() {
        let regs = Platform::Etchell4.port_registers(3).unwrap();
        assert_eq!(regs.enable_n, RegisterBit::new(0x01, 6));
        assert_eq!(regs.tx_disable, RegisterBit::new(0x01, 8));
        assert_eq!(regs.detect_n, RegisterBit::new(0x86, 9));
        assert!(Platform::Etchell4.port_registers(5).is_err());
    }

    #[test]
    fn test_etchell5_layout() {
        let regs = Platform::Etchell5.port_registers(8).unwrap();
        assert_eq!(regs.enable_n, RegisterBit::new(0x1_0000, 28));
        assert_eq!(regs.tx_disable, RegisterBit::new(0x1_0000, 29));
        assert_eq!(regs.detect_n, RegisterBit::new(0x1_0001, 28));
    }

    #[test]
    fn test_clipper_layout() {
        let regs = Platform::Clipper.port_registers(2).unwrap();
        assert_eq!(regs.enable_n, RegisterBit::new(0x500, 4));
        assert_eq!(regs.tx_disable, RegisterBit::new(0x500, 5));
        assert_eq!(regs.detect_n, RegisterBit::new(0x502, 5));

        // Ports 9-12 move to the second register pair, starting over at bit 0.
        let regs = Platform::Clipper.port_registers(10).unwrap();
        assert_eq!(regs.enable_n, RegisterBit::new(0x501, 4));
        assert_eq!(regs.detect_n, RegisterBit::new(0x503, 5));

        assert_eq!(
            Platform::Clipper2.port_registers(9),
            Err(Error::UnsupportedPort {
                platform: Platform::Clipper2,
                port: 9
            })
        );
        assert!(Platform::Clipper.port_registers(0).is_err());

        assert_eq!(Platform::Clipper.status_registers(), &[0x502, 0x503]);
        assert_eq!(Platform::Clipper2.status_registers(), &[0x502]);
    }

    #[test]
    fn test_platform_quirks() {
        assert!(Platform::Etchell4.clears_10g());
        assert!(Platform::Etchell5.clears_10g());
        assert!(!Platform::Clipper.clears_10g());
        assert!(Platform::Clipper2.rejects_blank_reads());
        assert!(Platform::Etchell5.enable_delay().is_none());
        assert!(Platform::Clipper.enable_delay().is_some());
        for platform in Platform::ALL {
            assert_eq!(platform.default_speed(), sfp_types::Speed::Speed1G);
        }
    }

    #[test]
    fn test_platform_serialization() {
        assert_eq!(
            serde_json::to_string(&Platform::Clipper2).unwrap(),
            "\"clipper2\""
        );
        assert_eq!(Platform::Etchell4.to_string(), "etchell-4");
    }

    #[test]
    fn test_enable_is_active_low() {
        let access = FakeRegisters::with(&[(0x01, 0xfff)]);
        let mut ctl = RegisterControl::new(Platform::Etchell4, 2, access).unwrap();
        ctl.set_enable(true).unwrap();
        let access = ctl.into_inner();
        assert_eq!(access.writes, vec![(0x01, 0xfff & !(1 << 3))]);
    }

    #[test]
    fn test_unchanged_value_is_not_written() {
        // Transmitter already enabled, i.e., tx_disable cleared.
        let access = FakeRegisters::with(&[(0x500, 0)]);
        let mut ctl = RegisterControl::new(Platform::Clipper, 1, access).unwrap();
        ctl.set_tx_enable(true).unwrap();
        ctl.set_tx_enable(false).unwrap();
        let access = ctl.into_inner();
        assert_eq!(access.writes, vec![(0x500, 0b10)]);
    }

    #[test]
    fn test_is_detected_is_active_low() {
        let access = FakeRegisters::with(&[(0x1_0001, !(1 << 4))]);
        let mut ctl = RegisterControl::new(Platform::Etchell5, 2, access).unwrap();
        assert!(ctl.is_detected().unwrap());

        let access = FakeRegisters::with(&[(0x1_0001, u64::MAX)]);
        let mut ctl = RegisterControl::new(Platform::Etchell5, 2, access).unwrap();
        assert!(!ctl.is_detected().unwrap());
    }

    #[test]
    fn test_register_failure_is_reported() {
        let access = FakeRegisters {
            fail: true,
            ..Default::default()
        };
        let mut ctl = RegisterControl::new(Platform::Etchell4, 1, access).unwrap();
        assert!(matches!(
            ctl.set_enable(false),
            Err(IoError::Register { offset: 0x01, .. })
        ));
    }

    #[test]
    fn test_detected_ports() {
        // Nothing detected except ports 1 and 12.
        let mut access = FakeRegisters::with(&[
            (0x502, u64::MAX & !(1 << 1)),
            (0x503, u64::MAX & !(1 << 13)),
        ]);
        let mask = detected_ports(Platform::Clipper, &mut access).unwrap();
        assert_eq!(mask, PortMask::from_ports(&[1, 12]).unwrap());

        // Clipper-2 never looks at the second status register.
        let mask = detected_ports(Platform::Clipper2, &mut access).unwrap();
        assert_eq!(mask, PortMask::from_ports(&[1]).unwrap());
    }
}
