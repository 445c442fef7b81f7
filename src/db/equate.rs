use bitflags::bitflags;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

//===========================================================================//

bitflags! {
    /// The access directions in which an equate names its address.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct EquateFlags: u8 {
        /// The label names the address when it is read.
        const READ = 0b01;
        /// The label names the address when it is written.
        const WRITE = 0b10;
        /// The label names the address in both directions.
        const RW = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// A named alias for an address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Equate {
    /// The label text.
    pub label: String,
    /// The address that the label refers to.
    pub address: u16,
    /// The access directions in which the label applies.
    pub flags: EquateFlags,
}

//===========================================================================//

/// A set of equates, indexed by label and by address (separately for reads
/// and writes, since the same address can name different registers in each
/// direction).
#[derive(Clone, Debug, Default)]
pub struct EquateTable {
    by_label: HashMap<String, Equate>,
    read_labels: BTreeMap<u16, String>,
    write_labels: BTreeMap<u16, String>,
}

impl EquateTable {
    /// Returns an empty table.
    pub fn new() -> EquateTable {
        EquateTable::default()
    }

    /// Returns the number of equates in the table.
    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// Returns true if the table has no equates.
    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    /// Adds an equate, replacing any existing equate with the same label.
    pub fn insert(&mut self, equate: Equate) {
        self.remove(&equate.label);
        if equate.flags.contains(EquateFlags::READ) {
            self.read_labels.insert(equate.address, equate.label.clone());
        }
        if equate.flags.contains(EquateFlags::WRITE) {
            self.write_labels.insert(equate.address, equate.label.clone());
        }
        self.by_label.insert(equate.label.clone(), equate);
    }

    /// Removes the equate with the given label.  Returns false if there was
    /// no such equate.
    pub fn remove(&mut self, label: &str) -> bool {
        let Some(equate) = self.by_label.remove(label) else {
            return false;
        };
        for map in [&mut self.read_labels, &mut self.write_labels] {
            if map.get(&equate.address).is_some_and(|name| name == label) {
                map.remove(&equate.address);
            }
        }
        true
    }

    /// Returns the label for `addr` in the given access direction.
    pub fn label(&self, addr: u16, is_read: bool) -> Option<&str> {
        let map = if is_read { &self.read_labels } else { &self.write_labels };
        map.get(&addr).map(String::as_str)
    }

    /// Returns the equate with the given label.
    pub fn get(&self, label: &str) -> Option<&Equate> {
        self.by_label.get(label)
    }

    /// Returns every equate in the table, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Equate> {
        self.by_label.values()
    }
}

//===========================================================================//

/// The kind of hardware that an address decodes to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AddressType {
    /// The TIA video/audio chip registers.
    Tia,
    /// The 128 bytes of RAM in the RIOT chip.
    Ram,
    /// The RIOT chip's I/O and timer registers.
    Riot,
    /// The cartridge window.
    Rom,
}

impl AddressType {
    /// Classifies an address by which chip it selects.
    pub fn of(addr: u16) -> AddressType {
        if (addr & 0x1000) != 0 {
            AddressType::Rom
        } else if (addr & 0x0080) == 0 {
            AddressType::Tia
        } else if (addr & 0x0200) == 0 {
            AddressType::Ram
        } else {
            AddressType::Riot
        }
    }

    /// Folds a chip register address onto its canonical mirror, the way
    /// the chip decodes it.  RAM and ROM addresses are returned unchanged.
    pub fn canonical(addr: u16, is_read: bool) -> u16 {
        match AddressType::of(addr) {
            AddressType::Tia if is_read => addr & 0x000f,
            AddressType::Tia => addr & 0x003f,
            AddressType::Riot => 0x0280 | (addr & 0x001f),
            AddressType::Ram | AddressType::Rom => addr,
        }
    }
}

//===========================================================================//

const R: EquateFlags = EquateFlags::READ;
const W: EquateFlags = EquateFlags::WRITE;
const RW: EquateFlags = EquateFlags::RW;

static SYSTEM_EQUATES: &[(&str, u16, EquateFlags)] = &[
    // TIA write registers.
    ("VSYNC", 0x00, W),
    ("VBLANK", 0x01, W),
    ("WSYNC", 0x02, W),
    ("RSYNC", 0x03, W),
    ("NUSIZ0", 0x04, W),
    ("NUSIZ1", 0x05, W),
    ("COLUP0", 0x06, W),
    ("COLUP1", 0x07, W),
    ("COLUPF", 0x08, W),
    ("COLUBK", 0x09, W),
    ("CTRLPF", 0x0a, W),
    ("REFP0", 0x0b, W),
    ("REFP1", 0x0c, W),
    ("PF0", 0x0d, W),
    ("PF1", 0x0e, W),
    ("PF2", 0x0f, W),
    ("RESP0", 0x10, W),
    ("RESP1", 0x11, W),
    ("RESM0", 0x12, W),
    ("RESM1", 0x13, W),
    ("RESBL", 0x14, W),
    ("AUDC0", 0x15, W),
    ("AUDC1", 0x16, W),
    ("AUDF0", 0x17, W),
    ("AUDF1", 0x18, W),
    ("AUDV0", 0x19, W),
    ("AUDV1", 0x1a, W),
    ("GRP0", 0x1b, W),
    ("GRP1", 0x1c, W),
    ("ENAM0", 0x1d, W),
    ("ENAM1", 0x1e, W),
    ("ENABL", 0x1f, W),
    ("HMP0", 0x20, W),
    ("HMP1", 0x21, W),
    ("HMM0", 0x22, W),
    ("HMM1", 0x23, W),
    ("HMBL", 0x24, W),
    ("VDELP0", 0x25, W),
    ("VDELP1", 0x26, W),
    ("VDELBL", 0x27, W),
    ("RESMP0", 0x28, W),
    ("RESMP1", 0x29, W),
    ("HMOVE", 0x2a, W),
    ("HMCLR", 0x2b, W),
    ("CXCLR", 0x2c, W),
    // TIA read registers.
    ("CXM0P", 0x00, R),
    ("CXM1P", 0x01, R),
    ("CXP0FB", 0x02, R),
    ("CXP1FB", 0x03, R),
    ("CXM0FB", 0x04, R),
    ("CXM1FB", 0x05, R),
    ("CXBLPF", 0x06, R),
    ("CXPPMM", 0x07, R),
    ("INPT0", 0x08, R),
    ("INPT1", 0x09, R),
    ("INPT2", 0x0a, R),
    ("INPT3", 0x0b, R),
    ("INPT4", 0x0c, R),
    ("INPT5", 0x0d, R),
    // RIOT I/O and timer registers.
    ("SWCHA", 0x0280, RW),
    ("SWACNT", 0x0281, RW),
    ("SWCHB", 0x0282, R),
    ("SWBCNT", 0x0283, RW),
    ("INTIM", 0x0284, R),
    ("TIMINT", 0x0285, R),
    ("TIM1T", 0x0294, W),
    ("TIM8T", 0x0295, W),
    ("TIM64T", 0x0296, W),
    ("T1024T", 0x0297, W),
];

/// Returns the built-in table of hardware register names.
pub fn system_equates() -> &'static EquateTable {
    static TABLE: OnceLock<EquateTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = EquateTable::new();
        for &(label, address, flags) in SYSTEM_EQUATES {
            table.insert(Equate { label: label.to_string(), address, flags });
        }
        table
    })
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        AddressType, Equate, EquateFlags, EquateTable, system_equates,
    };

    fn equate(label: &str, address: u16, flags: EquateFlags) -> Equate {
        Equate { label: label.to_string(), address, flags }
    }

    #[test]
    fn read_and_write_indices() {
        let mut table = EquateTable::new();
        table.insert(equate("Input", 0x0100, EquateFlags::READ));
        table.insert(equate("Output", 0x0100, EquateFlags::WRITE));
        assert_eq!(table.label(0x0100, true), Some("Input"));
        assert_eq!(table.label(0x0100, false), Some("Output"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn insert_replaces_same_label() {
        let mut table = EquateTable::new();
        table.insert(equate("Start", 0xf000, EquateFlags::RW));
        table.insert(equate("Start", 0xf800, EquateFlags::RW));
        assert_eq!(table.len(), 1);
        assert_eq!(table.label(0xf000, true), None);
        assert_eq!(table.label(0xf800, true), Some("Start"));
        assert_eq!(table.get("Start").map(|e| e.address), Some(0xf800));
    }

    #[test]
    fn remove_keeps_other_labels() {
        let mut table = EquateTable::new();
        table.insert(equate("A", 0x0080, EquateFlags::RW));
        table.insert(equate("B", 0x0080, EquateFlags::RW));
        assert!(table.remove("A"));
        assert!(!table.remove("A"));
        assert_eq!(table.label(0x0080, true), Some("B"));
        assert!(table.remove("B"));
        assert!(table.is_empty());
        assert_eq!(table.label(0x0080, true), None);
    }

    #[test]
    fn address_types() {
        assert_eq!(AddressType::of(0x0009), AddressType::Tia);
        assert_eq!(AddressType::of(0x0040), AddressType::Tia);
        assert_eq!(AddressType::of(0x0080), AddressType::Ram);
        assert_eq!(AddressType::of(0x01ff), AddressType::Ram);
        assert_eq!(AddressType::of(0x0284), AddressType::Riot);
        assert_eq!(AddressType::of(0x1000), AddressType::Rom);
        assert_eq!(AddressType::of(0xf000), AddressType::Rom);
    }

    #[test]
    fn register_mirrors() {
        assert_eq!(AddressType::canonical(0x0030, true), 0x0000);
        assert_eq!(AddressType::canonical(0x0049, false), 0x0009);
        assert_eq!(AddressType::canonical(0x0384, true), 0x0284);
        assert_eq!(AddressType::canonical(0x00f0, true), 0x00f0);
    }

    #[test]
    fn system_table() {
        let table = system_equates();
        assert_eq!(table.len(), 69);
        assert_eq!(table.label(0x00, false), Some("VSYNC"));
        assert_eq!(table.label(0x00, true), Some("CXM0P"));
        assert_eq!(table.label(0x0280, false), Some("SWCHA"));
        assert_eq!(table.get("TIM64T").map(|e| e.address), Some(0x0296));
    }
}

//===========================================================================//
