use super::{CartCommon, Cartridge, ROM_START, ROM_WINDOW_SIZE};
use crate::bus::{
    AccessFlags, AccessMode, Device, DeviceId, PAGE_SIZE, PageAccess,
    PagedBus,
};
use crate::state::{BinaryIo, expect_tag};
use std::io;

//===========================================================================//

const NAME: &str = "Cartridge2K";

/// Images larger than this are truncated.
const MAX_SIZE: usize = 2048;

/// The smallest image that can be mapped by whole pages.
const MIN_SIZE: usize = PAGE_SIZE as usize;

/// Bytes past the end of a short image are filled with this opcode (JAM),
/// so that running off the end halts the CPU instead of executing garbage.
const FILL_BYTE: u8 = 0x02;

//===========================================================================//

/// A cartridge with a single fixed ROM of up to 2K, mirrored throughout the
/// ROM window.  There is no bank switching.
pub struct Cart2K {
    image: Box<[u8]>,
    code_access: Box<[AccessFlags]>,
    mask: u16,
    common: CartCommon,
}

impl Cart2K {
    /// Creates a cartridge from the given ROM image.  Images over 2K are
    /// truncated; shorter images are padded up to a power of two.  Returns
    /// an error if the image is empty.
    pub fn new(data: &[u8]) -> io::Result<Cart2K> {
        if data.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cartridge image is empty",
            ));
        }
        let data = if data.len() > MAX_SIZE {
            log::warn!(
                "truncating {}-byte image to {MAX_SIZE} bytes",
                data.len()
            );
            &data[..MAX_SIZE]
        } else {
            data
        };
        let size = data.len().max(MIN_SIZE).next_power_of_two();
        let mut image = vec![FILL_BYTE; size].into_boxed_slice();
        image[..data.len()].copy_from_slice(data);
        Ok(Cart2K {
            image,
            code_access: vec![AccessFlags::empty(); size].into(),
            mask: (size - 1) as u16,
            common: CartCommon::default(),
        })
    }
}

impl Device for Cart2K {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> String {
        format!("{NAME} ({} bytes)", self.image.len())
    }

    fn install(&mut self, id: DeviceId, bus: &mut PagedBus) {
        for addr in (ROM_START..ROM_START + ROM_WINDOW_SIZE).step_by(MIN_SIZE)
        {
            let base = Some(usize::from(addr & self.mask));
            let mut access = PageAccess::new(id, AccessMode::Read);
            access.direct_peek_base = base;
            access.code_access_base = base;
            bus.set_page_access(PagedBus::page_index(addr), access);
        }
    }

    fn reset(&mut self, _bus: &mut PagedBus) {
        self.common.bank_changed = true;
    }

    fn peek(&mut self, addr: u16, _bus: &mut PagedBus) -> u8 {
        self.image[usize::from(addr & self.mask)]
    }

    fn poke(&mut self, _addr: u16, _value: u8, _bus: &mut PagedBus) -> bool {
        false
    }

    fn direct_data(&self) -> &[u8] {
        &self.image
    }

    fn code_access(&self) -> &[AccessFlags] {
        &self.code_access
    }

    fn code_access_mut(&mut self) -> &mut [AccessFlags] {
        &mut self.code_access
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

    fn as_cartridge(&self) -> Option<&dyn Cartridge> {
        Some(self)
    }

    fn as_cartridge_mut(&mut self) -> Option<&mut dyn Cartridge> {
        Some(self)
    }
}

impl Cartridge for Cart2K {
    fn into_device(self: Box<Self>) -> Box<dyn Device> {
        self
    }

    fn common(&self) -> &CartCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CartCommon {
        &mut self.common
    }

    fn patch(&mut self, addr: u16, value: u8) -> bool {
        self.image[usize::from(addr & self.mask)] = value;
        self.common.bank_changed = true;
        true
    }

    fn image(&self) -> &[u8] {
        &self.image
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{Cart2K, FILL_BYTE};
    use crate::bus::{Device, PagedBus};
    use crate::cart::Cartridge;

    #[test]
    fn rounds_up_to_power_of_two() {
        let sizes = [
            (1, 64),
            (63, 64),
            (64, 64),
            (65, 128),
            (1000, 1024),
            (2048, 2048),
        ];
        for (size, rounded) in sizes {
            let cart = Cart2K::new(&vec![0xea; size]).unwrap();
            assert_eq!(cart.image().len(), rounded, "size={size}");
        }
    }

    #[test]
    fn truncates_oversized_image() {
        let mut data = vec![0xea; 4096];
        data[2048] = 0x00;
        let cart = Cart2K::new(&data).unwrap();
        assert_eq!(cart.image().len(), 2048);
        assert!(cart.image().iter().all(|&byte| byte == 0xea));
    }

    #[test]
    fn pads_with_fill_byte() {
        let cart = Cart2K::new(&[0xa9, 0x00, 0x60]).unwrap();
        assert_eq!(&cart.image()[..3], &[0xa9, 0x00, 0x60]);
        assert!(cart.image()[3..].iter().all(|&byte| byte == FILL_BYTE));
    }

    #[test]
    fn peek_wraps_by_mask() {
        let mut bus = PagedBus::new();
        let data: Vec<u8> = (0..100).map(|i| i as u8).collect();
        let mut cart = Cart2K::new(&data).unwrap();
        for addr in 0x1000..0x1100 {
            let expected = cart.peek(addr, &mut bus);
            assert_eq!(cart.peek(addr + 128, &mut bus), expected);
        }
        assert_eq!(cart.peek(0x1005, &mut bus), 5);
        assert_eq!(cart.peek(0x1080 + 5, &mut bus), 5);
        assert_eq!(cart.peek(0x1064, &mut bus), FILL_BYTE);
    }

    #[test]
    fn installed_pages_read_directly() {
        let mut bus = PagedBus::new();
        let data: Vec<u8> = (0..=255).collect();
        bus.attach_cartridge(Box::new(Cart2K::new(&data).unwrap()));
        assert_eq!(bus.peek(0x1000), 0x00);
        assert_eq!(bus.peek(0x10ff), 0xff);
        assert_eq!(bus.peek(0x1f42), 0x42);
        assert_eq!(bus.peek(0xf042), 0x42);
        assert!(!bus.poke(0x1042, 0x00));
        assert_eq!(bus.peek(0x1042), 0x42);
    }

    #[test]
    fn patch_is_visible_and_marks_changed() {
        let mut bus = PagedBus::new();
        bus.attach_cartridge(Box::new(Cart2K::new(&[0xea; 64]).unwrap()));
        let patched = bus.with_cartridge(|cart, _| cart.patch(0x1010, 0x4c));
        assert_eq!(patched, Some(true));
        assert_eq!(bus.peek(0x1010), 0x4c);
        assert_eq!(bus.peek(0x1050), 0x4c);
        assert_eq!(
            bus.with_cartridge(|cart, _| cart.bank_changed()),
            Some(true)
        );
        assert_eq!(
            bus.with_cartridge(|cart, _| cart.bank_changed()),
            Some(false)
        );
    }

    #[test]
    fn no_bank_switching() {
        let mut bus = PagedBus::new();
        let mut cart = Cart2K::new(&[0xea; 64]).unwrap();
        assert_eq!(cart.bank_count(), 1);
        assert_eq!(cart.current_bank(), 0);
        assert!(!cart.bank(0, &mut bus));
    }

    #[test]
    fn save_and_load() {
        let mut bus = PagedBus::new();
        let cart = Cart2K::new(&[0xea; 64]).unwrap();
        let mut data: Vec<u8> = Vec::new();
        cart.save(&mut data).unwrap();
        let mut other = Cart2K::new(&[0x00; 64]).unwrap();
        assert!(other.load(&mut data.as_slice(), &mut bus).is_ok());
        assert!(other.load(&mut [0u8; 4].as_slice(), &mut bus).is_err());
    }
}

//===========================================================================//
