//! Facilities for simulating bank-switched cartridges.

use crate::bus::{Device, PagedBus};
use std::io;

mod cart2k;
mod cartsb;

pub use cart2k::Cart2K;
pub use cartsb::CartSB;

//===========================================================================//

/// The first address of the cartridge's ROM window.
pub const ROM_START: u16 = 0x1000;

/// The size of the cartridge's ROM window, and of one full bank.
pub const ROM_WINDOW_SIZE: u16 = 0x1000;

//===========================================================================//

/// State shared by every cartridge scheme.
#[derive(Clone, Debug, Default)]
pub struct CartCommon {
    /// Set whenever a bank switch or patch changes what the bus can see.
    pub bank_changed: bool,
    /// While set, bank switching is suppressed.
    pub bank_locked: bool,
}

//===========================================================================//

/// A cartridge attached to the bus.  Each bank-switching scheme is a flat
/// implementation of this trait.
pub trait Cartridge: Device {
    /// Converts this boxed cartridge into a boxed bus device.
    fn into_device(self: Box<Self>) -> Box<dyn Device>;

    /// Returns the state shared by every scheme.
    fn common(&self) -> &CartCommon;

    /// Mutable access to the state shared by every scheme.
    fn common_mut(&mut self) -> &mut CartCommon;

    /// Switches to the given bank, re-mapping the cartridge's pages on the
    /// bus.  Returns true if the switch happened; schemes without bank
    /// switching always return false.
    fn bank(&mut self, _bank: u16, _bus: &mut PagedBus) -> bool {
        false
    }

    /// Returns the currently selected bank.
    fn current_bank(&self) -> u16 {
        0
    }

    /// Returns the number of banks in the cartridge.
    fn bank_count(&self) -> u16 {
        1
    }

    /// Overwrites a byte of the ROM image as seen at `addr`, bypassing write
    /// protection.  Always returns true, since the visible image changed.
    fn patch(&mut self, addr: u16, value: u8) -> bool;

    /// Returns the raw ROM image.
    fn image(&self) -> &[u8];

    /// Returns whether the bus mapping has changed since the last call, and
    /// clears the flag.
    fn bank_changed(&mut self) -> bool {
        std::mem::take(&mut self.common_mut().bank_changed)
    }

    /// Suppresses bank switching until [`Cartridge::unlock_bank`] is called.
    fn lock_bank(&mut self) {
        self.common_mut().bank_locked = true;
    }

    /// Allows bank switching again.
    fn unlock_bank(&mut self) {
        self.common_mut().bank_locked = false;
    }

    /// Returns true if bank switching is currently suppressed.
    fn bank_locked(&self) -> bool {
        self.common().bank_locked
    }
}

//===========================================================================//

/// The supported bank-switching schemes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
pub enum CartKind {
    /// A single fixed 2K (or smaller) ROM, mirrored across the window.
    #[value(name = "2k")]
    TwoK,
    /// "SuperBanking": 4K banks selected by accessing $0800-$0FFF.
    #[value(name = "sb")]
    Sb,
}

impl CartKind {
    /// Constructs a cartridge of this kind from a ROM image.
    pub fn build(self, image: &[u8]) -> io::Result<Box<dyn Cartridge>> {
        Ok(match self {
            CartKind::TwoK => Box::new(Cart2K::new(image)?),
            CartKind::Sb => Box::new(CartSB::new(image)?),
        })
    }

    /// Returns the scheme tag that cartridges of this kind write into save
    /// states.
    pub fn name(self) -> &'static str {
        match self {
            CartKind::TwoK => "Cartridge2K",
            CartKind::Sb => "CartridgeSB",
        }
    }
}

//===========================================================================//


//===========================================================================//
