// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! A managed SFP port, tying a device model to its hardware.

use crate::Config;
use crate::Error;
use crate::IoError;
use crate::PresenceAndControl;
use crate::RawByteReader;
use crate::SfpDevice;
use crate::SfpMode;
use crate::VendorDatabase;
use sfp_types::Region;
use sfp_types::Speed;
use slog::debug;
use slog::trace;
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

/// One SFP cage, with the device model of the module it holds.
///
/// Hardware signals are driven first, and the device model only updated once
/// they have been applied successfully.
#[derive(Debug)]
pub struct SfpPort<C, R> {
    log: Logger,
    config: Config,
    device: SfpDevice,
    control: C,
    reader: R,
    db: Arc<VendorDatabase>,
    // Set while a newly powered module's supply settles.
    settle_until: Option<Instant>,
}

impl<C: PresenceAndControl, R: RawByteReader> SfpPort<C, R> {
    pub fn new(
        log: &Logger,
        config: Config,
        control: C,
        reader: R,
        db: Arc<VendorDatabase>,
    ) -> Self {
        let log = log.new(slog::o!(
            "platform" => config.platform.to_string(),
            "port" => config.port,
        ));
        let device = SfpDevice::from_config(log.clone(), &config);
        Self {
            log,
            config,
            device,
            control,
            reader,
            db,
            settle_until: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn port(&self) -> u8 {
        self.config.port
    }

    pub fn device(&self) -> &SfpDevice {
        &self.device
    }

    /// Poll the presence signal and record it in the device model.
    pub fn refresh_status(&mut self) -> Result<bool, Error> {
        let present = self.control.is_detected()?;
        self.device.set_present(present);
        Ok(present)
    }

    /// Power up the module.
    ///
    /// On platforms where a module's supply takes time to settle, returns how
    /// long to wait before its memory may be read. This never blocks, and
    /// [`SfpPort::poll`] skips the memory of a module that is still settling.
    pub fn enable(&mut self) -> Result<Option<Duration>, Error> {
        let was_enabled = self.device.is_enabled();
        self.control.set_enable(true)?;
        self.device.enable();
        if !was_enabled {
            self.settle_until = self
                .config
                .platform
                .enable_delay()
                .map(|delay| Instant::now() + delay);
        }
        Ok(self.settle_time())
    }

    /// Power down the module.
    pub fn disable(&mut self) -> Result<(), Error> {
        self.control.set_enable(false)?;
        self.device.disable();
        self.settle_until = None;
        Ok(())
    }

    /// Return the time left before a newly powered module has settled.
    pub fn settle_time(&self) -> Option<Duration> {
        self.settle_until
            .and_then(|until| until.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    pub fn set_tx_enable(&mut self, enable: bool) -> Result<(), Error> {
        self.control.set_tx_enable(enable)?;
        self.device.set_tx_enable(enable);
        Ok(())
    }

    pub fn set_mode(&mut self, mode: SfpMode) {
        self.device.set_mode(mode);
    }

    // Read a region, accounting for the result in the device's failure count.
    //
    // Some platforms return blank data rather than failing when a module
    // doesn't respond. Those reads are dropped, but don't count as failures.
    fn read(&mut self, region: Region, blank: u8) -> Result<Vec<u8>, Error> {
        let len = region.read_len();
        let buf = match self.reader.read_region(region, len) {
            Ok(buf) => buf,
            Err(e) => {
                self.device.record_io_error(&e);
                return Err(e.into());
            }
        };
        if buf.len() < len {
            let e = IoError::Read {
                region,
                len,
                reason: format!("short read of {} bytes", buf.len()),
            };
            self.device.record_io_error(&e);
            return Err(e.into());
        }
        self.device.record_io_success();
        if self.config.platform.rejects_blank_reads() && buf.iter().all(|b| *b == blank) {
            debug!(
                self.log,
                "dropping blank read";
                "region" => %region,
                "fill" => format!("0x{blank:02x}"),
            );
            return Err(Error::BlankRead(region));
        }
        Ok(buf)
    }

    /// Refresh the interface ID memory, and the copper PHY memory of copper
    /// modules.
    ///
    /// The copper PHY memory is read whenever the module is classified as
    /// copper, even if the interface ID memory could not be refreshed. Only
    /// the result of the latter is returned.
    pub fn update_data(&mut self) -> Result<(), Error> {
        self.device.check_loadable()?;
        let db = Arc::clone(&self.db);
        let result = self
            .read(Region::InterfaceId, 0x00)
            .and_then(|buf| self.device.load_interface_data(&buf, &*db));
        if self.config.platform.clears_10g() {
            self.device.remove_speed(Speed::Speed10G);
        }

        if self.device.is_copper() {
            let phy = self
                .read(Region::CopperPhy, 0xff)
                .and_then(|buf| self.device.load_copper_phy_data(&buf));
            if let Err(e) = phy {
                debug!(self.log, "failed to refresh copper PHY data"; "reason" => %e);
            }
        }
        result.map(|_| ())
    }

    /// Refresh the diagnostic monitoring memory.
    pub fn update_monitoring_data(&mut self) -> Result<(), Error> {
        self.device.check_loadable()?;
        let buf = self.read(Region::Diagnostic, 0x00)?;
        self.device.load_diagnostic_data(&buf)
    }

    /// Refresh everything about the port: presence, then the module's memory
    /// if it's present, powered and settled.
    ///
    /// Both memory regions are refreshed even if one fails, and the first
    /// error is returned.
    pub fn poll(&mut self) -> Result<(), Error> {
        self.refresh_status()?;
        if self.device.check_loadable().is_err() {
            return Ok(());
        }
        if let Some(left) = self.settle_time() {
            trace!(self.log, "module is settling"; "left" => ?left);
            return Ok(());
        }
        self.settle_until = None;
        let data = self.update_data();
        let monitoring = self.update_monitoring_data();
        data.and(monitoring)
    }
}

#[cfg(test)]
mod tests {
    use super::SfpPort;
    use crate::registers::tests::FakeRegisters;
    use crate::test_utils::diagnostic_page;
    use crate::test_utils::interface_id_page;
    use crate::test_utils::test_logger;
    use crate::test_utils::FakeReader;
    use crate::ConfigBuilder;
    use crate::Error;
    use crate::Platform;
    use crate::PresenceAndControl;
    use crate::RawByteReader;
    use crate::RegisterControl;
    use crate::VendorDatabase;
    use sfp_types::Region;
    use sfp_types::Speed;
    use sfp_types::SpeedCapabilities;
    use std::sync::Arc;
    use std::time::Duration;

    type TestPort = SfpPort<RegisterControl<FakeRegisters>, FakeReader>;

    // A port with a module present, whose status register reads as zero.
    fn test_port(platform: Platform, reader: FakeReader) -> TestPort {
        let config = ConfigBuilder::new(platform, 1).build().unwrap();
        let control = RegisterControl::new(platform, 1, FakeRegisters::default()).unwrap();
        let mut port = SfpPort::new(
            &test_logger(),
            config,
            control,
            reader,
            Arc::new(VendorDatabase::with_known_modules()),
        );
        assert!(port.refresh_status().unwrap());
        port
    }

    fn ten_gig_page() -> Vec<u8> {
        interface_id_page(|page| {
            page[3] = 0x10;
            page[6] = 0x01;
        })
    }

    #[test]
    fn test_update_requires_enabled_module() {
        let reader = FakeReader::new([(Region::InterfaceId, interface_id_page(|_| {}))]);
        let mut port = test_port(Platform::Clipper, reader);
        assert_eq!(port.update_data(), Err(Error::Disabled));
        assert!(port.reader.reads.is_empty());
    }

    #[test]
    fn test_update_data_and_monitoring() {
        let reader = FakeReader::new([
            (Region::InterfaceId, interface_id_page(|_| {})),
            (Region::Diagnostic, diagnostic_page(|_| {})),
        ]);
        let mut port = test_port(Platform::Clipper, reader);
        let delay = port.enable().unwrap().unwrap();
        std::thread::sleep(delay);
        port.poll().unwrap();
        assert_eq!(port.device().part_number(), "SX-1000");
        assert_eq!(port.device().temperature(), 25);
        assert_eq!(
            port.reader.reads,
            vec![(Region::InterfaceId, 128), (Region::Diagnostic, 128)]
        );
    }

    #[test]
    fn test_etchell_clears_10g() {
        let reader = FakeReader::new([(Region::InterfaceId, ten_gig_page())]);
        let mut port = test_port(Platform::Etchell5, reader);
        port.enable().unwrap();
        port.update_data().unwrap();
        assert_eq!(
            port.device().speed_capabilities(),
            SpeedCapabilities::SPEED_1G
        );
        assert_eq!(port.device().default_speed(), Speed::Speed1G);

        let reader = FakeReader::new([(Region::InterfaceId, ten_gig_page())]);
        let mut port = test_port(Platform::Clipper, reader);
        port.enable().unwrap();
        port.update_data().unwrap();
        assert!(port.device().supports(Speed::Speed10G));
    }

    #[test]
    fn test_blank_reads_are_dropped() {
        let reader = FakeReader::new([(Region::InterfaceId, vec![0; 128])]);
        let mut port = test_port(Platform::Clipper2, reader);
        port.enable().unwrap();
        assert_eq!(
            port.update_data(),
            Err(Error::BlankRead(Region::InterfaceId))
        );
        assert_eq!(port.device().io_error_count(), 0);
        assert_eq!(
            port.update_monitoring_data(),
            Err(Error::BlankRead(Region::Diagnostic))
        );

        // Other platforms try to validate the blank page.
        let reader = FakeReader::new([(Region::InterfaceId, vec![0; 128])]);
        let mut port = test_port(Platform::Etchell4, reader);
        port.enable().unwrap();
        assert!(matches!(port.update_data(), Err(Error::Decode(_))));
    }

    #[test]
    fn test_copper_phy_is_read_for_copper_modules() {
        let reader = FakeReader::new([
            (Region::InterfaceId, interface_id_page(|page| page[6] = 0x08)),
            (Region::CopperPhy, vec![0x5a; 64]),
        ]);
        let mut port = test_port(Platform::Clipper, reader);
        port.enable().unwrap();
        port.update_data().unwrap();
        assert!(port.device().is_copper());
        assert_eq!(port.device().memory(Region::CopperPhy)[63], 0x5a);
        assert_eq!(port.reader.reads.last(), Some(&(Region::CopperPhy, 64)));

        // An all-0xff PHY page is blank on Clipper, and leaves the old data.
        port.reader.pages.insert(Region::CopperPhy, vec![0xff; 64]);
        port.update_data().unwrap();
        assert_eq!(port.device().memory(Region::CopperPhy)[63], 0x5a);
    }

    #[test]
    fn test_io_failures_are_counted() {
        let reader = FakeReader::new([(Region::InterfaceId, interface_id_page(|_| {}))]);
        let mut port = test_port(Platform::Etchell4, reader);
        port.enable().unwrap();
        port.reader.fail = true;
        for _ in 0..3 {
            assert!(matches!(port.update_data(), Err(Error::Io(_))));
        }
        assert!(port.update_monitoring_data().is_err());
        assert_eq!(port.device().io_error_count(), 4);

        port.reader.fail = false;
        port.update_data().unwrap();
        assert_eq!(port.device().io_error_count(), 0);
    }

    #[test]
    fn test_removal_resets_error_count() {
        let mut port = test_port(Platform::Etchell4, FakeReader::default());
        port.enable().unwrap();
        port.reader.fail = true;
        assert!(port.update_data().is_err());
        assert_eq!(port.device().io_error_count(), 1);

        // detect_n set for port 1.
        port.control = RegisterControl::new(
            Platform::Etchell4,
            1,
            FakeRegisters::with(&[(0x86, 0b10)]),
        )
        .unwrap();
        assert!(!port.refresh_status().unwrap());
        assert_eq!(port.device().io_error_count(), 0);
        assert_eq!(port.update_data(), Err(Error::NotPresent));
    }

    #[test]
    fn test_boxed_collaborators() {
        let control: Box<dyn PresenceAndControl + Send> = Box::new(
            RegisterControl::new(Platform::Etchell5, 3, FakeRegisters::default()).unwrap(),
        );
        let reader: Box<dyn RawByteReader + Send> = Box::new(FakeReader::new([(
            Region::InterfaceId,
            interface_id_page(|_| {}),
        )]));
        let config = ConfigBuilder::new(Platform::Etchell5, 3).build().unwrap();
        let mut port = SfpPort::new(
            &test_logger(),
            config,
            control,
            reader,
            Arc::new(VendorDatabase::new()),
        );
        assert_eq!(port.port(), 3);
        assert!(port.refresh_status().unwrap());
        port.enable().unwrap();
        port.update_data().unwrap();
        assert_eq!(port.device().vendor_name(), "ACME CORP");
    }

    #[test]
    fn test_poll_skips_settling_module() {
        let pages = [
            (Region::InterfaceId, interface_id_page(|_| {})),
            (Region::Diagnostic, diagnostic_page(|_| {})),
        ];
        let reader = FakeReader::new(pages.clone());
        let mut port = test_port(Platform::Clipper, reader);
        let delay = port.enable().unwrap().unwrap();
        assert!(delay <= Duration::from_millis(5));
        port.poll().unwrap();
        assert!(port.reader.reads.is_empty());

        // Enabling again doesn't restart the wait, and the wait ends.
        std::thread::sleep(delay);
        assert_eq!(port.enable().unwrap(), None);
        assert_eq!(port.settle_time(), None);
        port.poll().unwrap();
        assert_eq!(port.device().part_number(), "SX-1000");

        // Platforms without a supply delay are readable immediately.
        let mut port = test_port(Platform::Etchell5, FakeReader::new(pages));
        assert_eq!(port.enable().unwrap(), None);
        port.poll().unwrap();
        assert_eq!(port.device().part_number(), "SX-1000");
    }

    #[test]
    fn test_no_capability_skips_copper_phy() {
        let reader = FakeReader::new([
            (Region::InterfaceId, interface_id_page(|page| page[6] = 0x08)),
            (Region::CopperPhy, vec![0x5a; 64]),
        ]);
        let mut port = test_port(Platform::Etchell4, reader);
        port.enable().unwrap();
        port.update_data().unwrap();
        assert!(port.device().is_copper());

        // A new module which describes no speed at all is not copper, so its
        // PHY memory isn't read.
        port.reader.pages.insert(
            Region::InterfaceId,
            interface_id_page(|page| {
                page[3..11].fill(0);
                page[11] = 0;
                page[12] = 0;
                page[40..56].copy_from_slice(b"MYSTERY         ");
            }),
        );
        port.reader.reads.clear();
        assert!(port.update_data().is_err());
        assert!(!port.device().is_copper());
        assert_eq!(port.reader.reads, vec![(Region::InterfaceId, 128)]);
    }

    #[test]
    fn test_failed_control_leaves_state() {
        let mut port = test_port(Platform::Clipper, FakeReader::default());
        port.enable().unwrap();
        port.control = RegisterControl::new(
            Platform::Clipper,
            1,
            FakeRegisters {
                fail: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(port.disable(), Err(Error::Io(_))));
        assert!(port.device().is_enabled());
        assert!(port.set_tx_enable(true).is_err());
        assert!(!port.device().is_tx_enabled());
    }
}
