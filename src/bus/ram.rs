use super::{
    AccessFlags, AccessMode, Device, DeviceId, PAGE_SIZE, PageAccess,
    PagedBus,
};
use crate::state::{BinaryIo, expect_tag};
use std::io;
use std::ops::Range;

//===========================================================================//

const NAME: &str = "RAM";

/// A simulated RAM device.  Accesses within the mapped range beyond the RAM
/// size will be mirrored.
pub struct RamDevice {
    ram: Box<[u8]>,
    code_access: Box<[AccessFlags]>,
    mapped: Range<u16>,
}

impl RamDevice {
    /// Returns a new simulated RAM device using the given byte array as the
    /// contents of RAM, claiming every page that overlaps `mapped`.  Panics
    /// if the length of the byte array is not a power of 2.
    pub fn new(ram: Box<[u8]>, mapped: Range<u16>) -> RamDevice {
        assert!(ram.len().is_power_of_two());
        let code_access = vec![AccessFlags::empty(); ram.len()].into();
        RamDevice { ram, code_access, mapped }
    }

    fn mask(&self) -> usize {
        self.ram.len() - 1
    }
}

impl Device for RamDevice {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> String {
        let size = self.ram.len();
        if size < 1024 {
            format!("{size}B RAM")
        } else {
            format!("{}kB RAM", size >> 10)
        }
    }

    fn install(&mut self, id: DeviceId, bus: &mut PagedBus) {
        if self.mapped.is_empty() {
            return;
        }
        let first = PagedBus::page_index(self.mapped.start);
        let last = PagedBus::page_index(self.mapped.end - 1);
        // RAM smaller than a page can't be indexed directly, so those pages
        // go through peek/poke and get masked there.
        let direct = self.ram.len() >= usize::from(PAGE_SIZE);
        for page in first..=last {
            let base = (page * usize::from(PAGE_SIZE)) & self.mask();
            let mut access = PageAccess::new(id, AccessMode::ReadWrite);
            if direct {
                access.direct_peek_base = Some(base);
                access.direct_poke_base = Some(base);
                access.code_access_base = Some(base);
            }
            bus.set_page_access(page, access);
        }
    }

    fn reset(&mut self, _bus: &mut PagedBus) {
        self.ram.fill(0);
    }

    fn peek(&mut self, addr: u16, _bus: &mut PagedBus) -> u8 {
        self.ram[usize::from(addr) & self.mask()]
    }

    fn poke(&mut self, addr: u16, value: u8, _bus: &mut PagedBus) -> bool {
        let mask = self.mask();
        self.ram[usize::from(addr) & mask] = value;
        false
    }

    fn direct_data(&self) -> &[u8] {
        &self.ram
    }

    fn direct_data_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    fn code_access(&self) -> &[AccessFlags] {
        &self.code_access
    }

    fn code_access_mut(&mut self) -> &mut [AccessFlags] {
        &mut self.code_access
    }

    fn save(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        NAME.to_string().write_to(writer)?;
        self.ram.write_to(writer)
    }

    fn load(
        &mut self,
        reader: &mut dyn io::Read,
        _bus: &mut PagedBus,
    ) -> io::Result<()> {
        expect_tag(reader, NAME)?;
        let ram = Box::<[u8]>::read_from(reader)?;
        if ram.len() != self.ram.len() {
            invalid_data!(
                "save state has {} bytes of RAM, expected {}",
                ram.len(),
                self.ram.len()
            );
        }
        self.ram = ram;
        Ok(())
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::RamDevice;
    use crate::bus::{Device, PagedBus};

    #[test]
    fn description() {
        let ram = RamDevice::new(Box::new([0u8; 0x10]), 0..0x10);
        assert_eq!(ram.description(), "16B RAM");
        let ram = RamDevice::new(Box::new([0u8; 0x1000]), 0..0x1000);
        assert_eq!(ram.description(), "4kB RAM");
    }

    #[test]
    fn address_mirroring() {
        let mut bus = PagedBus::new();
        let mut ram = RamDevice::new(Box::new([0u8; 0x80]), 0x80..0x100);
        ram.poke(0x0085, 0x12, &mut bus);
        assert_eq!(ram.peek(0x0005, &mut bus), 0x12);
        assert_eq!(ram.peek(0x1f85, &mut bus), 0x12);
    }

    #[test]
    fn small_ram_goes_through_device() {
        let mut bus = PagedBus::new();
        bus.attach(Box::new(RamDevice::new(Box::new([0u8; 0x10]), 0..0x40)));
        bus.poke(0x0003, 0x77);
        assert_eq!(bus.peek(0x0013), 0x77);
        assert_eq!(bus.page_access(0).direct_peek_base, None);
    }

    #[test]
    fn reset_clears_contents() {
        let mut bus = PagedBus::new();
        let ram = RamDevice::new(Box::new([0u8; 0x80]), 0x80..0x100);
        bus.attach(Box::new(ram));
        bus.poke(0x0080, 0xff);
        bus.reset();
        assert_eq!(bus.peek(0x0080), 0);
    }
}

//===========================================================================//
