use super::{CartCommon, Cartridge, ROM_START, ROM_WINDOW_SIZE};
use crate::bus::{
    AccessFlags, AccessMode, Device, DeviceId, PAGE_SIZE, PageAccess,
    PagedBus,
};
use crate::state::{BinaryIo, expect_tag};
use std::io;

//===========================================================================//

const NAME: &str = "CartridgeSB";

const BANK_SHIFT: u32 = 12;
const BANK_SIZE: usize = 1 << BANK_SHIFT;

/// Images larger than this (64 banks) are truncated.
const MAX_SIZE: usize = 256 * 1024;

/// Accessing any address in this band switches banks.  The band overlaps the
/// TIA's mirrors, so accesses are also forwarded to whatever was mapped
/// there before the cartridge was installed.
const HOTSPOT_START: u16 = 0x0800;
const HOTSPOT_END: u16 = 0x1000;
const NUM_HOTSPOT_PAGES: usize =
    ((HOTSPOT_END - HOTSPOT_START) / PAGE_SIZE) as usize;

//===========================================================================//

/// A "SuperBanking" cartridge: up to 64 4K banks, switched by any read or
/// write in $0800-$0FFF.  The bank number is decoded from the low bits of
/// the hotspot address.
pub struct CartSB {
    image: Box<[u8]>,
    code_access: Box<[AccessFlags]>,
    bank_count: u16,
    start_bank: u16,
    current_bank: u16,
    id: DeviceId,
    hotspots: Vec<PageAccess>,
    common: CartCommon,
}

impl CartSB {
    /// Creates a cartridge from the given ROM image.  Images over 256K are
    /// truncated.  Returns an error if the image doesn't hold at least one
    /// full 4K bank.
    pub fn new(data: &[u8]) -> io::Result<CartSB> {
        if data.len() < BANK_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{}-byte image is too small for {NAME} \
                     (need at least {BANK_SIZE} bytes)",
                    data.len()
                ),
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
        let bank_count = (data.len() >> BANK_SHIFT) as u16;
        let start_bank = bank_count - 1;
        Ok(CartSB {
            image: data.into(),
            code_access: vec![AccessFlags::empty(); data.len()].into(),
            bank_count,
            start_bank,
            current_bank: start_bank,
            id: DeviceId::NULL,
            hotspots: Vec::new(),
            common: CartCommon::default(),
        })
    }

    /// Folds an address into the decoded window.  The mask keeps A11/A12
    /// plus as many low bits as the bank count needs.
    fn fold(&self, addr: u16) -> u16 {
        addr & (0x17ff + (self.image.len() >> BANK_SHIFT) as u16)
    }

    /// Switches banks if the folded address lands on a hotspot.  Returns
    /// true if the bank was switched.
    fn switch_on_hotspot(&mut self, addr: u16, bus: &mut PagedBus) -> bool {
        // The bank number is masked with the start bank rather than
        // `bank_count - 1`, so with a bank count that isn't a power of two
        // some banks can't be selected from a hotspot.
        (addr & 0x1800) == 0x0800 && self.bank(addr & self.start_bank, bus)
    }

    /// Returns the displaced page access that a folded address outside the
    /// ROM window should be forwarded to.
    fn forward_access(&self, addr: u16) -> Option<PageAccess> {
        if (addr & 0x1000) != 0 {
            return None;
        }
        let page = PagedBus::page_index(addr)
            .checked_sub(PagedBus::page_index(HOTSPOT_START))?;
        self.hotspots.get(page).copied()
    }

    fn map_bank(&mut self, bank: u16, bus: &mut PagedBus) {
        self.current_bank = bank;
        let offset = usize::from(bank) << BANK_SHIFT;
        for addr in
            (ROM_START..ROM_START + ROM_WINDOW_SIZE).step_by(PAGE_SIZE.into())
        {
            let base =
                Some(offset + usize::from(addr & (ROM_WINDOW_SIZE - 1)));
            let mut access = PageAccess::new(self.id, AccessMode::Read);
            access.direct_peek_base = base;
            access.code_access_base = base;
            bus.set_page_access(PagedBus::page_index(addr), access);
        }
        self.common.bank_changed = true;
    }
}

impl Device for CartSB {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> String {
        format!(
            "{NAME} ({} bytes, {} banks)",
            self.image.len(),
            self.bank_count
        )
    }

    fn install(&mut self, id: DeviceId, bus: &mut PagedBus) {
        self.id = id;
        let first = PagedBus::page_index(HOTSPOT_START);
        let mut hotspots = Vec::with_capacity(NUM_HOTSPOT_PAGES);
        for (index, page) in (first..first + NUM_HOTSPOT_PAGES).enumerate() {
            let access = bus.page_access(page);
            // Installing again must not capture our own hotspot mapping.
            if access.device == id {
                if let Some(&previous) = self.hotspots.get(index) {
                    hotspots.push(previous);
                    continue;
                }
            }
            hotspots.push(access);
        }
        self.hotspots = hotspots;
        for page in first..first + NUM_HOTSPOT_PAGES {
            bus.set_page_access(page, PageAccess::new(id, AccessMode::Read));
        }
        self.map_bank(self.start_bank, bus);
    }

    fn reset(&mut self, bus: &mut PagedBus) {
        self.bank(self.start_bank, bus);
    }

    fn peek(&mut self, addr: u16, bus: &mut PagedBus) -> u8 {
        let addr = self.fold(addr);
        self.switch_on_hotspot(addr, bus);
        match self.forward_access(addr) {
            Some(access) => bus.peek_via(access, addr),
            None => 0,
        }
    }

    fn poke(&mut self, addr: u16, value: u8, bus: &mut PagedBus) -> bool {
        let addr = self.fold(addr);
        let switched = self.switch_on_hotspot(addr, bus);
        if let Some(access) = self.forward_access(addr) {
            bus.poke_via(access, addr, value);
        }
        switched
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
        NAME.to_string().write_to(writer)?;
        self.current_bank.write_to(writer)
    }

    fn load(
        &mut self,
        reader: &mut dyn io::Read,
        bus: &mut PagedBus,
    ) -> io::Result<()> {
        expect_tag(reader, NAME)?;
        let bank = u16::read_from(reader)?;
        if bank >= self.bank_count {
            invalid_data!(
                "save state selects bank {}, but {} has {} banks",
                bank,
                NAME,
                self.bank_count
            );
        }
        self.bank(bank, bus);
        Ok(())
    }

    fn as_cartridge(&self) -> Option<&dyn Cartridge> {
        Some(self)
    }

    fn as_cartridge_mut(&mut self) -> Option<&mut dyn Cartridge> {
        Some(self)
    }
}

impl Cartridge for CartSB {
    fn into_device(self: Box<Self>) -> Box<dyn Device> {
        self
    }

    fn common(&self) -> &CartCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CartCommon {
        &mut self.common
    }

    fn bank(&mut self, bank: u16, bus: &mut PagedBus) -> bool {
        if self.common.bank_locked || bank >= self.bank_count {
            return false;
        }
        log::trace!("{NAME}: switching to bank {bank}");
        self.map_bank(bank, bus);
        true
    }

    fn current_bank(&self) -> u16 {
        self.current_bank
    }

    fn bank_count(&self) -> u16 {
        self.bank_count
    }

    /// Patches are relative to the current bank: the same address patches a
    /// different byte of the image in each bank.
    fn patch(&mut self, addr: u16, value: u8) -> bool {
        let offset = usize::from(self.current_bank) << BANK_SHIFT;
        self.image[offset + usize::from(addr & (ROM_WINDOW_SIZE - 1))] = value;
        self.common.bank_changed = true;
        true
    }

    fn image(&self) -> &[u8] {
        &self.image
    }
}

//===========================================================================//


//===========================================================================//
