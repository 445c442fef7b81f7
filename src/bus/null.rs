use super::{Device, DeviceId, PagedBus};
use crate::state::{BinaryIo, expect_tag};
use std::io;

//===========================================================================//

const NAME: &str = "NullDevice";

/// A device that's not connected to anything.  All writes are ignored and
/// all reads return zero.  Every page of a [`PagedBus`] is routed here until
/// some other device claims it.
pub struct NullDevice {}

impl NullDevice {
    /// Returns a new null device.
    pub fn new() -> NullDevice {
        NullDevice {}
    }
}

impl Default for NullDevice {
    fn default() -> NullDevice {
        NullDevice::new()
    }
}

impl Device for NullDevice {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> String {
        "null device".to_string()
    }

    fn install(&mut self, _id: DeviceId, _bus: &mut PagedBus) {}

    fn peek(&mut self, _addr: u16, _bus: &mut PagedBus) -> u8 {
        0
    }

    fn poke(&mut self, _addr: u16, _value: u8, _bus: &mut PagedBus) -> bool {
        false
    }

    fn save(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        NAME.to_string().write_to(writer)
    }

    fn load(
        &mut self,
        reader: &mut dyn io::Read,
        _bus: &mut PagedBus,
    ) -> io::Result<()> {
        expect_tag(reader, NAME)
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::NullDevice;
    use crate::bus::{Device, PagedBus};

    #[test]
    fn description() {
        assert_eq!(NullDevice::new().description(), "null device");
    }

    #[test]
    fn reads_zero() {
        let mut bus = PagedBus::new();
        let mut device = NullDevice::new();
        assert_eq!(device.peek(0x1000, &mut bus), 0);
        assert!(!device.poke(0x1000, 0x55, &mut bus));
        assert_eq!(device.peek(0x1000, &mut bus), 0);
    }
}

//===========================================================================//
