//! Device registration and opening
//!
//! Maps the `-d` argument to a backend: a spidev node path, or `dummy`
//! for the in-memory emulator when that feature is compiled in.

use spibus_linux::{OpenError, SpiDevice, SpiOptions, Spidev, SpidevIo};

/// Device handle used by every command
pub type Device = SpiDevice<Box<dyn SpidevIo>>;

/// Information about a device kind
pub struct DeviceInfo {
    /// Name or pattern matched against `-d`
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Device kinds enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    devices.push(DeviceInfo {
        name: "/dev/spidevX.Y",
        description: "Linux spidev node",
    });

    #[cfg(feature = "dummy")]
    devices.push(DeviceInfo {
        name: "dummy",
        description: "In-memory spidev emulator with MOSI wired to MISO",
    });

    devices
}

/// Open the device named by `name` and apply `options`
pub fn open_device(name: &str, options: &SpiOptions) -> Result<Device, OpenError> {
    #[cfg(feature = "dummy")]
    if name == "dummy" {
        let config = spibus_dummy::DummyConfig::default().with_loopback(true);
        let io: Box<dyn SpidevIo> = Box::new(spibus_dummy::DummySpidev::new(config));
        return SpiDevice::from_io(io, options);
    }

    log::debug!("Opening spidev node {}", name);
    let io: Box<dyn SpidevIo> = Box::new(Spidev::open(name)?);
    SpiDevice::from_io(io, options)
}

/// Open a device keeping whatever configuration it already has
///
/// Used by commands that inspect or repair a node, so the current
/// registers are neither validated nor rewritten.
pub fn open_device_as_is(name: &str) -> Result<Device, OpenError> {
    #[cfg(feature = "dummy")]
    if name == "dummy" {
        let config = spibus_dummy::DummyConfig::default().with_loopback(true);
        return Ok(wrap_as_is(Box::new(spibus_dummy::DummySpidev::new(config))));
    }

    log::debug!("Opening spidev node {} as is", name);
    Ok(wrap_as_is(Box::new(Spidev::open(name)?)))
}

fn wrap_as_is(io: Box<dyn SpidevIo>) -> Device {
    SpiDevice::from_io_unconfigured(io)
}

/// Help text listing every device kind
pub fn device_help() -> String {
    let mut help = String::from("Available devices:\n");
    for d in available_devices() {
        help.push_str(&format!("  {:16} - {}\n", d.name, d.description));
    }
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_node() {
        let err = open_device("/dev/spidev-missing.9", &SpiOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, OpenError::NotFound { .. }));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        let spi = open_device("dummy", &SpiOptions::new().with_mode(2)).unwrap();
        assert_eq!(spi.mode().unwrap(), 2);
        let rx = spi.transfer_blocking([vec![0x5Au8, 0xA5]]).unwrap();
        assert_eq!(rx, vec![vec![0x5A, 0xA5]]);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_as_is_keeps_rejected_mode() {
        use spibus_dummy::{DummyConfig, DummySpidev};
        use spibus_linux::Mode;

        for mode in [Mode::LOOP, Mode::NO_CS | Mode::CS_HIGH] {
            let dev = DummySpidev::new(DummyConfig {
                mode: mode.bits(),
                ..Default::default()
            });
            let probe = dev.probe();
            let spi = wrap_as_is(Box::new(dev));

            assert_eq!(spi.mode().unwrap(), mode.bits());
            assert_eq!(probe.counts().writes(), 0);

            // The node can be put back into a usable mode
            spi.set_mode(0).unwrap();
            assert_eq!(probe.mode(), 0);
        }
    }

    #[test]
    fn test_as_is_missing_node() {
        let err = open_device_as_is("/dev/spidev-missing.9").err().unwrap();
        assert!(matches!(err, OpenError::NotFound { .. }));
    }

    #[test]
    fn test_device_help_lists_spidev() {
        assert!(device_help().contains("/dev/spidevX.Y"));
    }
}
