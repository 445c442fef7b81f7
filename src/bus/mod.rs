//! Facilities for representing a paged memory map and simulating the
//! system's address bus.

use crate::cart::Cartridge;
use bitflags::bitflags;
use std::io;

mod null;
mod ram;

pub use null::NullDevice;
pub use ram::RamDevice;

//===========================================================================//

/// The number of address bits covered by a single page.
pub const PAGE_SHIFT: u16 = 6;

/// The size of a single page, in bytes.  This is the smallest unit of
/// address space that a device can claim.
pub const PAGE_SIZE: u16 = 1 << PAGE_SHIFT;

/// Mask for the offset of an address within its page.
pub const PAGE_MASK: u16 = PAGE_SIZE - 1;

/// The 6507 only has 13 address lines; higher address bits are ignored, so
/// memory is mirrored across the full 16-bit range.
pub const ADDRESS_MASK: u16 = 0x1fff;

/// The total number of pages in the decoded address space.
pub const NUM_PAGES: usize = (ADDRESS_MASK as usize + 1) >> PAGE_SHIFT;

//===========================================================================//

/// Identifies a device attached to a [`PagedBus`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DeviceId(usize);

impl DeviceId {
    /// The device that every page is routed to before anything else is
    /// installed.  Reads return zero and writes are ignored.
    pub const NULL: DeviceId = DeviceId(0);
}

//===========================================================================//

/// Which directions of access a page claims.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AccessMode {
    /// The page only services reads directly.
    Read,
    /// The page only services writes directly.
    Write,
    /// The page services both reads and writes directly.
    ReadWrite,
}

impl AccessMode {
    fn can_read(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    fn can_write(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

bitflags! {
    /// Flags recorded in a device's code-access shadow, one entry per byte
    /// of backing store.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct AccessFlags: u8 {
        /// The CPU has fetched an instruction from this byte.
        const CODE = 0b0000_0001;
    }
}

//===========================================================================//

/// Describes how accesses to one page of the address space are serviced.
///
/// The base fields are offsets into the owning device's backing store
/// (see [`Device::direct_data`] and [`Device::code_access`]), not pointers,
/// so a device re-points a page simply by installing new offsets.  The byte
/// for an address is found at `base + (addr & PAGE_MASK)`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PageAccess {
    /// The device responsible for this page.
    pub device: DeviceId,
    /// Which accesses may use the direct bases.
    pub mode: AccessMode,
    /// If set, reads are served straight from the device's backing store at
    /// this offset, bypassing [`Device::peek`].
    pub direct_peek_base: Option<usize>,
    /// If set, writes go straight into the device's backing store at this
    /// offset, bypassing [`Device::poke`].
    pub direct_poke_base: Option<usize>,
    /// Offset into the device's code-access shadow for this page.
    pub code_access_base: Option<usize>,
}

impl PageAccess {
    /// Returns a page access that dispatches every access to `device`.
    pub fn new(device: DeviceId, mode: AccessMode) -> PageAccess {
        PageAccess {
            device,
            mode,
            direct_peek_base: None,
            direct_poke_base: None,
            code_access_base: None,
        }
    }
}

//===========================================================================//

/// A device that can be attached to a [`PagedBus`].
///
/// Methods that might need to touch the bus (to re-map pages, or to forward
/// an access to another device) are handed the bus explicitly.  While one of
/// those methods runs, the device itself is detached from the bus; any
/// access the bus would route back to it reads as zero.
pub trait Device {
    /// Returns the name of this device.  For cartridges this is the scheme
    /// tag written into save states.
    fn name(&self) -> &str;

    /// Returns a human-readable description of this device.
    fn description(&self) -> String {
        self.name().to_string()
    }

    /// Claims this device's pages on the bus.  Installing a device again
    /// replaces its previous mapping.
    fn install(&mut self, id: DeviceId, bus: &mut PagedBus);

    /// Restores the device to its power-on state.
    fn reset(&mut self, _bus: &mut PagedBus) {}

    /// Reads a byte.  This must not panic for any address; out-of-range
    /// addresses are folded into range the way the hardware decodes them.
    ///
    /// Note that this is a `&mut self` method, since reading some addresses
    /// has side effects (e.g. bank switching).
    fn peek(&mut self, addr: u16, bus: &mut PagedBus) -> u8;

    /// Writes a byte, returning true if the write changed the device's
    /// mapping state.  Writes to read-only memory are ignored and return
    /// false.
    fn poke(&mut self, addr: u16, value: u8, bus: &mut PagedBus) -> bool;

    /// Returns the backing store that [`PageAccess::direct_peek_base`]
    /// offsets index into.
    fn direct_data(&self) -> &[u8] {
        &[]
    }

    /// Mutable access to the backing store that
    /// [`PageAccess::direct_poke_base`] offsets index into.
    fn direct_data_mut(&mut self) -> &mut [u8] {
        &mut []
    }

    /// Returns the code-access shadow that [`PageAccess::code_access_base`]
    /// offsets index into.
    fn code_access(&self) -> &[AccessFlags] {
        &[]
    }

    /// Mutable access to the code-access shadow.
    fn code_access_mut(&mut self) -> &mut [AccessFlags] {
        &mut []
    }

    /// Writes the state needed to resume this device into a save state.
    fn save(&self, writer: &mut dyn io::Write) -> io::Result<()>;

    /// Restores state written by [`Device::save`].  On failure the device is
    /// left unchanged.
    fn load(
        &mut self,
        reader: &mut dyn io::Read,
        bus: &mut PagedBus,
    ) -> io::Result<()>;

    /// Returns this device as a cartridge, if it is one.
    fn as_cartridge(&self) -> Option<&dyn Cartridge> {
        None
    }

    /// Returns this device as a mutable cartridge, if it is one.
    fn as_cartridge_mut(&mut self) -> Option<&mut dyn Cartridge> {
        None
    }
}

//===========================================================================//

/// A simulated address bus, split into fixed-size pages that are each routed
/// either directly to a device's backing store or through one of the
/// device's access methods.
pub struct PagedBus {
    pages: Vec<PageAccess>,
    devices: Vec<Option<Box<dyn Device>>>,
    cartridge: Option<DeviceId>,
}

impl PagedBus {
    /// Returns a bus with every page routed to a null device.
    pub fn new() -> PagedBus {
        let mut bus = PagedBus {
            pages: vec![
                PageAccess::new(DeviceId::NULL, AccessMode::ReadWrite);
                NUM_PAGES
            ],
            devices: Vec::new(),
            cartridge: None,
        };
        let null = bus.attach(Box::new(NullDevice::new()));
        debug_assert_eq!(null, DeviceId::NULL);
        bus
    }

    /// Returns the index of the page containing `addr`.
    pub fn page_index(addr: u16) -> usize {
        usize::from((addr & ADDRESS_MASK) >> PAGE_SHIFT)
    }

    /// Attaches a device to the bus and lets it install its pages.
    pub fn attach(&mut self, device: Box<dyn Device>) -> DeviceId {
        let id = DeviceId(self.devices.len());
        self.devices.push(Some(device));
        self.with_device(id, (), |device, bus| device.install(id, bus));
        log::debug!("attached device {} as {:?}", self.describe(id), id);
        id
    }

    /// Attaches a cartridge to the bus.  Devices whose pages the cartridge
    /// overlaps should be attached first, since a cartridge may capture the
    /// existing mappings at install time.
    pub fn attach_cartridge(&mut self, cart: Box<dyn Cartridge>) -> DeviceId {
        let id = self.attach(cart.into_device());
        self.cartridge = Some(id);
        id
    }

    fn describe(&self, id: DeviceId) -> String {
        match self.device(id) {
            Some(device) => device.description(),
            None => "<detached>".to_string(),
        }
    }

    fn device(&self, id: DeviceId) -> Option<&dyn Device> {
        self.devices.get(id.0).and_then(|slot| slot.as_deref())
    }

    /// Detaches the device with the given ID for the duration of `func`,
    /// passing it together with the rest of the bus.  Returns `default` if
    /// the device is already detached (i.e. the call is reentrant).
    fn with_device<T>(
        &mut self,
        id: DeviceId,
        default: T,
        func: impl FnOnce(&mut dyn Device, &mut PagedBus) -> T,
    ) -> T {
        let Some(mut device) =
            self.devices.get_mut(id.0).and_then(|slot| slot.take())
        else {
            return default;
        };
        let result = func(&mut *device, self);
        self.devices[id.0] = Some(device);
        result
    }

    /// Returns the access descriptor for the given page.
    pub fn page_access(&self, page: usize) -> PageAccess {
        self.pages[page % NUM_PAGES]
    }

    /// Replaces the access descriptor for the given page.
    pub fn set_page_access(&mut self, page: usize, access: PageAccess) {
        self.pages[page % NUM_PAGES] = access;
    }

    /// Reads a byte from the bus, with all the side effects a CPU read would
    /// have.
    pub fn peek(&mut self, addr: u16) -> u8 {
        let access = self.pages[PagedBus::page_index(addr)];
        self.peek_via(access, addr)
    }

    /// Reads a byte using a specific page access descriptor rather than the
    /// one currently installed for `addr`.  This is how a device forwards
    /// accesses to a mapping it displaced.
    pub fn peek_via(&mut self, access: PageAccess, addr: u16) -> u8 {
        let addr = addr & ADDRESS_MASK;
        if access.mode.can_read() {
            if let Some(base) = access.direct_peek_base {
                return match self.device(access.device) {
                    Some(device) => {
                        let index = base + usize::from(addr & PAGE_MASK);
                        device.direct_data()[index]
                    }
                    None => 0,
                };
            }
        }
        self.with_device(access.device, 0, |device, bus| {
            device.peek(addr, bus)
        })
    }

    /// Writes a byte to the bus, returning true if the write changed some
    /// device's mapping state.
    pub fn poke(&mut self, addr: u16, value: u8) -> bool {
        let access = self.pages[PagedBus::page_index(addr)];
        self.poke_via(access, addr, value)
    }

    /// Writes a byte using a specific page access descriptor.  See
    /// [`PagedBus::peek_via`].
    pub fn poke_via(
        &mut self,
        access: PageAccess,
        addr: u16,
        value: u8,
    ) -> bool {
        let addr = addr & ADDRESS_MASK;
        if access.mode.can_write() {
            if let Some(base) = access.direct_poke_base {
                let index = base + usize::from(addr & PAGE_MASK);
                if let Some(Some(device)) =
                    self.devices.get_mut(access.device.0)
                {
                    device.direct_data_mut()[index] = value;
                }
                return false;
            }
        }
        self.with_device(access.device, false, |device, bus| {
            device.poke(addr, value, bus)
        })
    }

    /// Reads an instruction byte on behalf of the CPU, marking it as code in
    /// the owning device's code-access shadow.
    pub fn fetch(&mut self, addr: u16) -> u8 {
        self.insert_access_flags(addr, AccessFlags::CODE);
        self.peek(addr)
    }

    /// Returns the code-access flags recorded for `addr`, or no flags if the
    /// page has no shadow.
    pub fn access_flags(&self, addr: u16) -> AccessFlags {
        let access = self.pages[PagedBus::page_index(addr)];
        match (access.code_access_base, self.device(access.device)) {
            (Some(base), Some(device)) => device
                .code_access()
                .get(base + usize::from(addr & PAGE_MASK))
                .copied()
                .unwrap_or_default(),
            _ => AccessFlags::empty(),
        }
    }

    /// Adds flags to the code-access shadow entry for `addr`.
    pub fn insert_access_flags(&mut self, addr: u16, flags: AccessFlags) {
        let access = self.pages[PagedBus::page_index(addr)];
        let Some(base) = access.code_access_base else { return };
        if let Some(Some(device)) = self.devices.get_mut(access.device.0) {
            let index = base + usize::from(addr & PAGE_MASK);
            if let Some(entry) = device.code_access_mut().get_mut(index) {
                entry.insert(flags);
            }
        }
    }

    /// Resets every attached device, in the order they were attached.
    pub fn reset(&mut self) {
        for index in 0..self.devices.len() {
            self.with_device(DeviceId(index), (), |device, bus| {
                device.reset(bus)
            });
        }
    }

    /// Returns the attached cartridge, if any.
    pub fn cartridge(&self) -> Option<&dyn Cartridge> {
        self.cartridge
            .and_then(|id| self.device(id))
            .and_then(|device| device.as_cartridge())
    }

    /// Runs `func` on the attached cartridge, passing it the rest of the bus
    /// so that it can re-map pages.  Returns `None` if no cartridge is
    /// attached.
    pub fn with_cartridge<T>(
        &mut self,
        func: impl FnOnce(&mut dyn Cartridge, &mut PagedBus) -> T,
    ) -> Option<T> {
        let id = self.cartridge?;
        let mut device = self.devices.get_mut(id.0)?.take()?;
        let result = device.as_cartridge_mut().map(|cart| func(cart, self));
        self.devices[id.0] = Some(device);
        result
    }

    /// Writes the state of every attached device, in attach order.
    pub fn save_state(&self, writer: &mut dyn io::Write) -> io::Result<()> {
        for device in self.devices.iter().flatten() {
            device.save(writer)?;
        }
        Ok(())
    }

    /// Restores state written by [`PagedBus::save_state`].  Each device
    /// validates its own portion.  If any device rejects its record, every
    /// device is put back the way it was before the load.
    pub fn load_state(&mut self, reader: &mut dyn io::Read) -> io::Result<()> {
        let mut snapshot: Vec<u8> = Vec::new();
        self.save_state(&mut snapshot)?;
        if let Err(error) = self.load_devices(reader) {
            if let Err(restore) = self.load_devices(&mut snapshot.as_slice())
            {
                log::error!("failed to restore bus state: {restore}");
            }
            return Err(error);
        }
        Ok(())
    }

    fn load_devices(&mut self, reader: &mut dyn io::Read) -> io::Result<()> {
        for index in 0..self.devices.len() {
            self.with_device(DeviceId(index), Ok(()), |device, bus| {
                device.load(reader, bus)
            })?;
        }
        Ok(())
    }
}

impl Default for PagedBus {
    fn default() -> PagedBus {
        PagedBus::new()
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        AccessFlags, AccessMode, DeviceId, NUM_PAGES, PageAccess, PagedBus,
        RamDevice,
    };

    fn make_ram() -> RamDevice {
        RamDevice::new(vec![0; 0x80].into(), 0x80..0x100)
    }

    #[test]
    fn page_geometry() {
        assert_eq!(NUM_PAGES, 128);
        assert_eq!(PagedBus::page_index(0x0000), 0);
        assert_eq!(PagedBus::page_index(0x0040), 1);
        assert_eq!(PagedBus::page_index(0x1fff), 127);
        assert_eq!(PagedBus::page_index(0x3fff), 127);
    }

    #[test]
    fn unmapped_pages_read_zero() {
        let mut bus = PagedBus::new();
        assert_eq!(bus.peek(0x1234), 0);
        assert!(!bus.poke(0x1234, 0xff));
        assert_eq!(bus.peek(0x1234), 0);
        assert_eq!(bus.page_access(5).device, DeviceId::NULL);
    }

    #[test]
    fn direct_ram_access_mirrors() {
        let mut bus = PagedBus::new();
        bus.attach(Box::new(make_ram()));
        bus.poke(0x0085, 0x42);
        assert_eq!(bus.peek(0x0085), 0x42);
        assert_eq!(bus.peek(0x2085), 0x42);
        assert_eq!(bus.peek(0x0185), 0);
    }

    #[test]
    fn peek_via_captured_access() {
        let mut bus = PagedBus::new();
        let ram = bus.attach(Box::new(make_ram()));
        bus.poke(0x0081, 0x17);
        let captured = bus.page_access(PagedBus::page_index(0x0081));
        assert_eq!(captured.device, ram);
        let access = PageAccess::new(DeviceId::NULL, AccessMode::Read);
        bus.set_page_access(2, access);
        assert_eq!(bus.peek(0x0081), 0);
        assert_eq!(bus.peek_via(captured, 0x0081), 0x17);
    }

    #[test]
    fn fetch_marks_code() {
        let mut bus = PagedBus::new();
        bus.attach(Box::new(make_ram()));
        assert_eq!(bus.access_flags(0x0090), AccessFlags::empty());
        bus.fetch(0x0090);
        assert_eq!(bus.access_flags(0x0090), AccessFlags::CODE);
        assert_eq!(bus.access_flags(0x0091), AccessFlags::empty());
        assert_eq!(bus.access_flags(0x1000), AccessFlags::empty());
    }

    #[test]
    fn save_and_load_state() {
        let mut bus = PagedBus::new();
        bus.attach(Box::new(make_ram()));
        bus.poke(0x00a0, 0x99);
        let mut data: Vec<u8> = Vec::new();
        bus.save_state(&mut data).unwrap();
        bus.poke(0x00a0, 0x00);
        bus.load_state(&mut data.as_slice()).unwrap();
        assert_eq!(bus.peek(0x00a0), 0x99);
    }
}

//===========================================================================//
