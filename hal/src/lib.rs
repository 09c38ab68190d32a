// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! A host-side hardware abstraction for SFP transceiver modules.
//!
//! The [`SfpDevice`] holds the memory of one module and answers queries about
//! it. It performs no I/O itself. Getting bytes off the hardware is the job of
//! the collaborators described by [`RawByteReader`] and
//! [`PresenceAndControl`], which an [`SfpPort`] ties together with a device
//! for periodic refresh by the [`Poller`].

pub mod config;
pub mod device;
pub mod poller;
pub mod port;
pub mod registers;
pub mod vendor_db;

pub use config::Config;
pub use config::ConfigBuilder;
pub use device::DeviceState;
pub use device::SfpDevice;
pub use device::SfpMode;
pub use poller::Poller;
pub use port::SfpPort;
pub use registers::Platform;
pub use registers::RegisterControl;
pub use vendor_db::VendorDatabase;

pub use sfp_decode as decode;
pub use sfp_types::PortMask;
pub use sfp_types::Region;
pub use sfp_types::Speed;
pub use sfp_types::SpeedCapabilities;
pub use sfp_types::ThresholdKind;

/// An error accessing the hardware behind a module.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum IoError {
    #[error("Failed to read {len} bytes from {region}: {reason}")]
    Read {
        region: Region,
        len: usize,
        reason: String,
    },

    #[error("Failed to access register 0x{offset:x}: {reason}")]
    Register { offset: u32, reason: String },
}

/// An error managing a transceiver module.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("Decoding error")]
    Decode(#[from] sfp_decode::Error),

    #[error("Invalid value")]
    Types(#[from] sfp_types::Error),

    #[error("I/O error")]
    Io(#[from] IoError),

    #[error("Module is not present")]
    NotPresent,

    #[error("Module is disabled")]
    Disabled,

    #[error("Module is not a copper module")]
    NotCopper,

    #[error("Read of {0} returned a blank page")]
    BlankRead(Region),

    #[error("Port {port} does not exist on platform {platform}")]
    UnsupportedPort { platform: Platform, port: u8 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// A source of raw bytes from the memory of one physical module.
pub trait RawByteReader {
    /// Read `len` bytes from the start of `region`.
    fn read_region(&mut self, region: Region, len: usize) -> Result<Vec<u8>, IoError>;
}

/// The status and control signals of one physical module.
pub trait PresenceAndControl {
    /// Return true if a module is seated in the cage.
    fn is_detected(&mut self) -> Result<bool, IoError>;

    /// Apply or remove power to the module.
    fn set_enable(&mut self, enable: bool) -> Result<(), IoError>;

    /// Enable or disable the module's transmitter.
    fn set_tx_enable(&mut self, enable: bool) -> Result<(), IoError>;
}

/// Access to the 64-bit registers of the platform's control logic.
pub trait RegisterAccess {
    fn read(&mut self, offset: u32) -> Result<u64, IoError>;
    fn write(&mut self, offset: u32, value: u64) -> Result<(), IoError>;
}

impl<T: RawByteReader + ?Sized> RawByteReader for Box<T> {
    fn read_region(&mut self, region: Region, len: usize) -> Result<Vec<u8>, IoError> {
        (**self).read_region(region, len)
    }
}

impl<T: PresenceAndControl + ?Sized> PresenceAndControl for Box<T> {
    fn is_detected(&mut self) -> Result<bool, IoError> {
        (**self).is_detected()
    }

    fn set_enable(&mut self, enable: bool) -> Result<(), IoError> {
        (**self).set_enable(enable)
    }

    fn set_tx_enable(&mut self, enable: bool) -> Result<(), IoError> {
        (**self).set_tx_enable(enable)
    }
}
