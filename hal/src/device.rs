// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The state of a single SFP module.
//!
//! An [`SfpDevice`] owns one page of each memory region of a module, and the
//! state derived from it. Pages are only ever replaced whole, and only after
//! passing their check codes, so that every getter here is a view of a page
//! which was valid when it was loaded.
//!
//! The device performs no I/O. Bytes are supplied by the owner through the
//! `load_*` methods, and hardware signals are driven by the owner before the
//! corresponding state is recorded here.

use crate::Config;
use crate::Error;
use crate::IoError;
use sfp_decode::checksum::validate_region;
use sfp_decode::classify;
use sfp_decode::ident::ComplianceCodes;
use sfp_decode::ident::Connector;
use sfp_decode::ident::DateCode;
use sfp_decode::ident::Encoding;
use sfp_decode::ident::ExtendedIdentifier;
use sfp_decode::ident::Identifier;
use sfp_decode::ident::Vendor;
use sfp_decode::ident::RateIdentifier;
use sfp_decode::ident::PART_NUMBER_LEN;
use sfp_decode::to_page;
use sfp_decode::Calibration;
use sfp_decode::Classification;
use sfp_decode::DiagnosticMap;
use sfp_decode::InterfaceIdMap;
use sfp_decode::Monitor;
use sfp_decode::Page;
use sfp_decode::VendorLookup;
use sfp_types::Medium;
use sfp_types::Region;
use sfp_types::Speed;
use sfp_types::SpeedCapabilities;
use sfp_types::ThresholdKind;
use slog::debug;
use slog::error;
use slog::info;
use slog::warn;
use slog::Logger;
use std::fmt;

/// The byte written to the output of a read of an unknown region.
pub const INVALID_MEMORY_FILL: u8 = 0xee;

/// The operating mode requested for a port.
///
/// This is recorded for the owner, and never validated against the module.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, clap::ValueEnum)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
#[cfg_attr(any(feature = "api-traits", test), serde(rename_all = "snake_case"))]
pub enum SfpMode {
    #[default]
    Undefined,
    Auto,
    Copper,
    Fiber,
}

impl fmt::Display for SfpMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SfpMode::Undefined => write!(f, "undefined"),
            SfpMode::Auto => write!(f, "auto"),
            SfpMode::Copper => write!(f, "copper"),
            SfpMode::Fiber => write!(f, "fiber"),
        }
    }
}

/// The lifecycle state of the module in a cage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    any(feature = "api-traits", test),
    derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)
)]
#[cfg_attr(any(feature = "api-traits", test), serde(rename_all = "snake_case"))]
pub enum DeviceState {
    /// No module is seated.
    NotPresent,
    /// A module is seated, but no valid interface ID data has been loaded
    /// since it was inserted.
    Present,
    /// Valid interface ID data has been loaded from the module.
    Validated,
}

/// The memory and state of one SFP module.
#[derive(Clone)]
pub struct SfpDevice {
    log: Logger,
    interface_id: Page,
    diagnostic: Page,
    copper_phy: Page,
    present: bool,
    validated: bool,
    enabled: bool,
    tx_enabled: bool,
    mode: SfpMode,
    default_speed: Speed,
    classification: Classification,
    io_error_count: u32,
    log_error_threshold: u32,
}

impl fmt::Debug for SfpDevice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SfpDevice")
            .field("state", &self.state())
            .field("enabled", &self.enabled)
            .field("tx_enabled", &self.tx_enabled)
            .field("mode", &self.mode)
            .field("classification", &self.classification)
            .field("io_error_count", &self.io_error_count)
            .finish_non_exhaustive()
    }
}

impl SfpDevice {
    /// Create a device with zeroed memory, for a port with the given default
    /// speed.
    pub fn new(log: Logger, default_speed: Speed) -> Self {
        Self {
            log,
            interface_id: [0; Region::PAGE_SIZE],
            diagnostic: [0; Region::PAGE_SIZE],
            copper_phy: [0; Region::PAGE_SIZE],
            present: false,
            validated: false,
            enabled: false,
            tx_enabled: false,
            mode: SfpMode::Undefined,
            default_speed,
            classification: Classification::default(),
            io_error_count: 0,
            log_error_threshold: crate::config::default_log_error_threshold(),
        }
    }

    /// Create a device for the port described by `config`.
    pub fn from_config(log: Logger, config: &Config) -> Self {
        let mut dev = Self::new(log, config.default_speed);
        dev.log_error_threshold = config.log_error_threshold;
        dev
    }

    pub fn state(&self) -> DeviceState {
        match (self.present, self.validated) {
            (false, _) => DeviceState::NotPresent,
            (true, false) => DeviceState::Present,
            (true, true) => DeviceState::Validated,
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Record whether a module is seated.
    ///
    /// Removing a module resets the count of consecutive I/O failures, and
    /// invalidates the data loaded from it.
    pub fn set_present(&mut self, present: bool) {
        if present != self.present {
            if present {
                info!(self.log, "module inserted");
            } else {
                info!(self.log, "module removed");
            }
        }
        self.present = present;
        if !present {
            self.validated = false;
            self.io_error_count = 0;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record that power has been applied to the module.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Record that power has been removed from the module.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_tx_enabled(&self) -> bool {
        self.tx_enabled
    }

    pub fn set_tx_enable(&mut self, enable: bool) {
        self.tx_enabled = enable;
    }

    pub fn mode(&self) -> SfpMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SfpMode) {
        self.mode = mode;
    }

    pub fn default_speed(&self) -> Speed {
        self.default_speed
    }

    /// Return an error if the module is absent or unpowered, so that its
    /// memory can't be read.
    pub fn check_loadable(&self) -> Result<(), Error> {
        if !self.present {
            return Err(Error::NotPresent);
        }
        if !self.enabled {
            return Err(Error::Disabled);
        }
        Ok(())
    }

    // Convert and validate a buffer, logging any check code failure.
    fn validated_page(&self, region: Region, buf: &[u8]) -> Result<Page, Error> {
        let page = to_page(region, buf)?;
        if let Err(e) = validate_region(region, &page) {
            debug!(self.log, "rejecting module data"; "reason" => %e);
            return Err(e.into());
        }
        Ok(page)
    }

    /// Load the interface ID memory and classify the module.
    ///
    /// The page is only replaced if both of its check codes are valid, in
    /// which case the module is classified from the new data. If neither the
    /// vendor database nor the compliance codes describe any speed, the new
    /// data is kept with an empty classification, and an error is returned.
    pub fn load_interface_data<L: VendorLookup + ?Sized>(
        &mut self,
        buf: &[u8],
        db: &L,
    ) -> Result<Classification, Error> {
        self.check_loadable()?;
        let page = self.validated_page(Region::InterfaceId, buf)?;
        self.interface_id = page;
        self.validated = true;
        match classify(&self.interface_map(), db) {
            Ok(classification) => {
                if classification != self.classification {
                    debug!(
                        self.log,
                        "classified module";
                        "part_number" => self.part_number(),
                        "speeds" => %classification.speeds,
                        "medium" => %classification.medium,
                        "database_match" => classification.matched(),
                    );
                }
                self.classification = classification;
                Ok(classification)
            }
            Err(e) => {
                error!(
                    self.log,
                    "no speed detected for module";
                    "part_number" => self.part_number(),
                    "compliance_codes" => ?self.transceiver_codes(),
                    "bit_rate" => self.nominal_bit_rate(),
                );
                self.classification = Classification::default();
                Err(e.into())
            }
        }
    }

    /// Load the diagnostic monitoring memory.
    ///
    /// The page is only replaced if its check code is valid.
    pub fn load_diagnostic_data(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.check_loadable()?;
        self.diagnostic = self.validated_page(Region::Diagnostic, buf)?;
        Ok(())
    }

    /// Load the copper PHY memory, which is taken as is.
    pub fn load_copper_phy_data(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.check_loadable()?;
        if !self.is_copper() {
            return Err(Error::NotCopper);
        }
        self.copper_phy = to_page(Region::CopperPhy, buf)?;
        Ok(())
    }

    /// Remove a speed from the module's capabilities, for platforms which
    /// cannot run it.
    pub fn remove_speed(&mut self, speed: Speed) {
        self.classification
            .speeds
            .remove(SpeedCapabilities::from_speed(speed));
    }

    pub fn interface_map(&self) -> InterfaceIdMap<'_> {
        InterfaceIdMap::new(&self.interface_id)
    }

    pub fn diagnostic_map(&self) -> DiagnosticMap<'_> {
        DiagnosticMap::new(&self.diagnostic)
    }

    /// Return the current page of a region.
    pub fn memory(&self, region: Region) -> &Page {
        match region {
            Region::InterfaceId => &self.interface_id,
            Region::Diagnostic => &self.diagnostic,
            Region::CopperPhy => &self.copper_phy,
        }
    }

    /// Copy the start of a region, named by its address, into `buf`.
    ///
    /// If the address names no region, `buf` is filled with
    /// [`INVALID_MEMORY_FILL`] and an error is returned.
    pub fn get_memory(&self, address: u8, buf: &mut [u8]) -> Result<(), Error> {
        let region = match Region::try_from(address) {
            Ok(r) => r,
            Err(e) => {
                buf.fill(INVALID_MEMORY_FILL);
                return Err(e.into());
            }
        };
        let page = self.memory(region);
        let Some(src) = page.get(..buf.len()) else {
            return Err(sfp_types::Error::InvalidMemoryAccess {
                region,
                len: buf.len(),
            }
            .into());
        };
        buf.copy_from_slice(src);
        Ok(())
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn speed_capabilities(&self) -> SpeedCapabilities {
        self.classification.speeds
    }

    pub fn supports(&self, speed: Speed) -> bool {
        self.classification.speeds.supports(speed)
    }

    pub fn medium(&self) -> Medium {
        self.classification.medium
    }

    pub fn is_copper(&self) -> bool {
        self.medium() == Medium::Copper
    }

    pub fn is_fiber(&self) -> bool {
        self.medium() == Medium::Fiber
    }

    /// Return the transmit and receive wavelengths from the vendor database
    /// entry the module matched, if any.
    pub fn database_wavelengths(&self) -> Option<(u16, u16)> {
        self.classification
            .database_match
            .map(|d| (d.tx_wavelength_nm, d.rx_wavelength_nm))
    }

    pub fn identifier(&self) -> Identifier {
        self.interface_map().identifier()
    }

    pub fn extended_identifier(&self) -> ExtendedIdentifier {
        self.interface_map().extended_identifier()
    }

    /// Return the connector type.
    ///
    /// Copper modules are always reported with an RJ45 connector.
    pub fn connector(&self) -> Connector {
        if self.is_copper() {
            Connector::from(Connector::RJ45)
        } else {
            self.interface_map().connector()
        }
    }

    pub fn transceiver_codes(&self) -> ComplianceCodes {
        self.interface_map().compliance_codes()
    }

    pub fn encoding(&self) -> Encoding {
        self.interface_map().encoding()
    }

    pub fn nominal_bit_rate(&self) -> u8 {
        self.interface_map().nominal_bit_rate()
    }

    pub fn rate_identifier(&self) -> RateIdentifier {
        self.interface_map().rate_identifier()
    }

    /// Return the nominal wavelength, in nanometers.
    pub fn wavelength(&self) -> u16 {
        self.interface_map().wavelength()
    }

    /// Return the supported link length in meters, from the first non-zero
    /// length field.
    pub fn length(&self) -> Option<u32> {
        self.interface_map().link_lengths().length_m()
    }

    pub fn vendor(&self) -> Vendor {
        self.interface_map().vendor()
    }

    pub fn vendor_name(&self) -> String {
        self.interface_map().vendor_name()
    }

    pub fn vendor_oui(&self) -> [u8; 3] {
        self.interface_map().vendor_oui()
    }

    pub fn part_number(&self) -> String {
        self.interface_map().part_number()
    }

    /// Return the part number as a NUL-terminated byte string.
    pub fn part_number_terminated(&self) -> [u8; PART_NUMBER_LEN + 1] {
        self.interface_map().part_number_terminated()
    }

    pub fn vendor_revision(&self) -> String {
        self.interface_map().vendor_revision()
    }

    pub fn serial_number(&self) -> String {
        self.interface_map().serial_number()
    }

    pub fn date_code(&self) -> DateCode {
        self.interface_map().date_code()
    }

    pub fn is_diag_capable(&self) -> bool {
        self.interface_map().diagnostic_capabilities().diagnostics
    }

    pub fn is_alarm_capable(&self) -> bool {
        self.interface_map().diagnostic_capabilities().alarms
    }

    pub fn is_internally_calibrated(&self) -> bool {
        self.interface_map()
            .diagnostic_capabilities()
            .internally_calibrated
    }

    /// Return the SFF-8472 revision the module's diagnostics comply with.
    pub fn diag_monitoring_revision(&self) -> u8 {
        self.interface_map().sff8472_revision()
    }

    /// Return the calibration for the current memory.
    ///
    /// This is derived on every call, so it always agrees with the loaded
    /// interface ID data.
    pub fn calibration(&self) -> Calibration {
        Calibration::from_maps(&self.interface_map(), &self.diagnostic_map())
    }

    /// Return the module temperature, in degrees C.
    pub fn temperature(&self) -> i16 {
        let raw = self.diagnostic_map().reading(Monitor::Temperature);
        self.calibration().temperature(raw)
    }

    /// Return the supply voltage, in millivolts.
    pub fn voltage(&self) -> u16 {
        let raw = self.diagnostic_map().reading(Monitor::Voltage);
        self.calibration().voltage(raw)
    }

    /// Return the laser bias current, in uA.
    pub fn bias(&self) -> u32 {
        let raw = self.diagnostic_map().reading(Monitor::Bias);
        self.calibration().bias(raw)
    }

    /// Return the transmit power, in units of 0.1 uW.
    pub fn tx_power(&self) -> u32 {
        let raw = self.diagnostic_map().reading(Monitor::TxPower);
        self.calibration().tx_power(raw)
    }

    /// Return the receive power, in units of 0.1 uW.
    pub fn rx_power(&self) -> u32 {
        let raw = self.diagnostic_map().reading(Monitor::RxPower);
        self.calibration().rx_power(raw)
    }

    /// Return the calibrated reading of any monitor.
    pub fn reading(&self, monitor: Monitor) -> i64 {
        self.calibration().reading(&self.diagnostic_map(), monitor)
    }

    /// Return the calibrated value of one threshold of any monitor.
    pub fn threshold(&self, monitor: Monitor, kind: ThresholdKind) -> i64 {
        self.calibration()
            .threshold(&self.diagnostic_map(), monitor, kind)
    }

    pub fn temperature_threshold(&self, kind: ThresholdKind) -> i16 {
        let raw = self.diagnostic_map().threshold(Monitor::Temperature, kind);
        self.calibration().temperature(raw)
    }

    pub fn voltage_threshold(&self, kind: ThresholdKind) -> u16 {
        let raw = self.diagnostic_map().threshold(Monitor::Voltage, kind);
        self.calibration().voltage(raw)
    }

    pub fn bias_threshold(&self, kind: ThresholdKind) -> u32 {
        let raw = self.diagnostic_map().threshold(Monitor::Bias, kind);
        self.calibration().bias(raw)
    }

    pub fn tx_power_threshold(&self, kind: ThresholdKind) -> u32 {
        let raw = self.diagnostic_map().threshold(Monitor::TxPower, kind);
        self.calibration().tx_power(raw)
    }

    pub fn rx_power_threshold(&self, kind: ThresholdKind) -> u32 {
        let raw = self.diagnostic_map().threshold(Monitor::RxPower, kind);
        self.calibration().rx_power(raw)
    }

    /// Set a threshold of a monitor.
    ///
    /// Thresholds live in module memory, which is never written. This accepts
    /// any value and changes nothing.
    pub fn set_threshold(
        &mut self,
        monitor: Monitor,
        kind: ThresholdKind,
        value: i64,
    ) -> Result<(), Error> {
        debug!(
            self.log,
            "ignoring threshold update";
            "monitor" => %monitor,
            "kind" => %kind,
            "value" => value,
        );
        Ok(())
    }

    /// Return the number of consecutive failed accesses to the module.
    pub fn io_error_count(&self) -> u32 {
        self.io_error_count
    }

    /// Record a failed access to the module.
    ///
    /// Failures are logged as warnings until the configured threshold is
    /// reached. The failure reaching it is logged as an error, and any later
    /// ones only at debug level.
    pub fn record_io_error(&mut self, err: &IoError) {
        self.io_error_count = self.io_error_count.saturating_add(1);
        let count = self.io_error_count;
        if count < self.log_error_threshold {
            warn!(self.log, "module access failed"; "reason" => %err, "count" => count);
        } else if count == self.log_error_threshold {
            error!(
                self.log,
                "module access failed, suppressing further reports";
                "reason" => %err,
                "count" => count,
            );
        } else {
            debug!(self.log, "module access failed"; "reason" => %err, "count" => count);
        }
    }

    /// Record a successful access to the module.
    pub fn record_io_success(&mut self) {
        if self.io_error_count > 0 {
            debug!(
                self.log,
                "module access recovered";
                "failures" => self.io_error_count,
            );
        }
        self.io_error_count = 0;
    }
}
