//! The cartridge debugger: symbolic names for addresses, RAM inspection,
//! and disassembly of whatever the cartridge currently has mapped in.

use crate::bus::{ADDRESS_MASK, AccessFlags, PagedBus};
use crate::dis::Labels;
use crate::dis::mos6502::Instruction;
use crate::parse::{SymbolAst, parse_symbol_line};
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

mod equate;
mod ram;

pub use equate::{
    AddressType, Equate, EquateFlags, EquateTable, system_equates,
};
pub use ram::{CartState, RamArea};

//===========================================================================//

/// One decoded instruction in a disassembly listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisassemblyTag {
    /// The address of the first byte of the instruction.
    pub address: u16,
    /// The user label at this address, or an empty string.
    pub label: String,
    /// The formatted instruction text.
    pub disasm: String,
    /// The instruction's bytes in hex, separated by spaces.
    pub bytes: String,
    /// True if the CPU has fetched this address as an instruction.
    pub code: bool,
}

/// Where a disassembly stops.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisasmBound {
    /// Stop after decoding this many instructions.
    Lines(usize),
    /// Stop once the next instruction would start past this address.
    End(u16),
}

/// The result of a tab-completion request.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Completions {
    /// The number of labels that matched.
    pub count: usize,
    /// Every matching label, separated by two spaces.
    pub candidates: String,
    /// The longest prefix shared by every matching label.
    pub prefix: String,
}

//===========================================================================//

/// Debugger support for the cartridge and its address space.
///
/// The bus is passed into each operation that needs to read it; reads made
/// by the debugger go through the same path as CPU reads, so they trigger
/// bank switching just as the running program would.
#[derive(Default)]
pub struct CartDebug {
    user_equates: EquateTable,
    ram_areas: Vec<RamArea>,
    state: CartState,
    old_state: CartState,
    rw_port_address: Option<u16>,
    disassembly: Vec<DisassemblyTag>,
}

impl CartDebug {
    /// Creates a debugger with no user labels and the given RAM areas.
    pub fn new(ram_areas: &[RamArea]) -> CartDebug {
        CartDebug { ram_areas: ram_areas.to_vec(), ..CartDebug::default() }
    }

    //-----------------------------------------------------------------------//
    // RAM

    /// Registers an area of the address space as RAM.
    pub fn add_ram_area(
        &mut self,
        start: u16,
        size: u16,
        read_offset: u16,
        write_offset: u16,
    ) {
        let area = RamArea { start, size, read_offset, write_offset };
        self.ram_areas.push(area);
    }

    /// Returns the registered RAM areas.
    pub fn ram_areas(&self) -> &[RamArea] {
        &self.ram_areas
    }

    /// Reads every registered RAM byte through its read port and returns
    /// the resulting snapshot.
    pub fn get_state(&mut self, bus: &mut PagedBus) -> &CartState {
        let mut state = CartState::default();
        for area in &self.ram_areas {
            for index in 0..area.size {
                let rport = area.read_port(index);
                state.ram.push(bus.peek(rport));
                state.rport.push(rport);
                state.wport.push(area.write_port(index));
            }
        }
        self.state = state;
        &self.state
    }

    /// Remembers the most recent snapshot, so that later snapshots can be
    /// compared against it.
    pub fn save_old_state(&mut self) {
        self.old_state = self.state.clone();
    }

    /// Returns the snapshot saved by [`CartDebug::save_old_state`].
    pub fn old_state(&self) -> &CartState {
        &self.old_state
    }

    /// Formats the most recent snapshot as a hex dump.
    pub fn ram_dump(&self) -> String {
        self.state.dump()
    }

    /// Reads a byte from the bus.  If `addr` is a write-only port of a
    /// registered RAM area, the access is recorded for
    /// [`CartDebug::read_from_write_port`].
    pub fn read(&mut self, bus: &mut PagedBus, addr: u16) -> u8 {
        let folded = addr & ADDRESS_MASK;
        let in_write_port =
            self.ram_areas.iter().any(|area| area.is_write_port(folded));
        let in_read_port =
            self.ram_areas.iter().any(|area| area.is_read_port(folded));
        if in_write_port && !in_read_port {
            self.trigger_read_from_write_port(addr);
        }
        bus.peek(addr)
    }

    /// Writes a byte to the bus.  Returns true if the write changed the bus
    /// mapping (for example, by switching banks).
    pub fn write(&mut self, bus: &mut PagedBus, addr: u16, value: u8) -> bool {
        bus.poke(addr, value)
    }

    /// Records that the CPU read from a write-only address.
    pub fn trigger_read_from_write_port(&mut self, addr: u16) {
        self.rw_port_address = Some(addr);
    }

    /// Returns the address of the last read from a write-only port, if any,
    /// and clears it.
    pub fn read_from_write_port(&mut self) -> Option<u16> {
        self.rw_port_address.take()
    }

    //-----------------------------------------------------------------------//
    // Cartridge

    /// Returns the cartridge's currently selected bank.
    pub fn bank(&self, bus: &PagedBus) -> u16 {
        bus.cartridge().map_or(0, |cart| cart.current_bank())
    }

    /// Returns the number of banks in the cartridge.
    pub fn bank_count(&self, bus: &PagedBus) -> u16 {
        bus.cartridge().map_or(0, |cart| cart.bank_count())
    }

    /// Returns the scheme name of the attached cartridge.
    pub fn cart_type<'b>(&self, bus: &'b PagedBus) -> Option<&'b str> {
        bus.cartridge().map(|cart| cart.name())
    }

    //-----------------------------------------------------------------------//
    // Labels

    /// Returns the label for `addr`, looking first in the user equates and
    /// then in the system equates.  `is_read` selects between registers
    /// that share an address.  If no label is defined and `places` is
    /// given, returns the address as a hex number with that many digits.
    pub fn get_label(
        &self,
        addr: u16,
        is_read: bool,
        places: Option<usize>,
    ) -> Option<Cow<'_, str>> {
        if let Some(label) = self.user_equates.label(addr, is_read) {
            return Some(Cow::Borrowed(label));
        }
        let canonical = AddressType::canonical(addr, is_read);
        if let Some(label) = system_equates().label(canonical, is_read) {
            return Some(Cow::Borrowed(label));
        }
        places.map(|width| Cow::Owned(format!("{addr:0width$x}")))
    }

    /// Returns the address that `label` refers to, looking first in the
    /// user equates and then in the system equates.
    pub fn get_address(&self, label: &str) -> Option<u16> {
        self.user_equates
            .get(label)
            .or_else(|| system_equates().get(label))
            .map(|equate| equate.address)
    }

    /// Defines a user label for `addr`, replacing any existing label with
    /// the same name.  Returns false (and does nothing) if `label` isn't a
    /// valid label name.
    pub fn add_label(&mut self, label: &str, addr: u16) -> bool {
        if !is_valid_label(label) {
            return false;
        }
        self.user_equates.insert(Equate {
            label: label.to_string(),
            address: addr,
            flags: EquateFlags::RW,
        });
        true
    }

    /// Removes a user label.  Returns false if there was no such label.
    pub fn remove_label(&mut self, label: &str) -> bool {
        self.user_equates.remove(label)
    }

    /// Returns the user-defined equates.
    pub fn user_equates(&self) -> &EquateTable {
        &self.user_equates
    }

    /// Reads user labels from a DASM-style symbol listing.  Lines that
    /// can't be parsed are skipped.  Returns the number of labels read.  If
    /// reading fails partway through, no labels are added.
    pub fn load_symbols<R: BufRead>(
        &mut self,
        reader: R,
    ) -> io::Result<usize> {
        let mut symbols: Vec<SymbolAst> = Vec::new();
        for (index, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            match parse_symbol_line(index + 1, &String::from_utf8_lossy(&line))
            {
                Ok(Some(symbol)) => symbols.push(symbol),
                Ok(None) => {}
                Err(error) => log::debug!("skipping symbol {error}"),
            }
        }
        let count = symbols.len();
        for symbol in symbols {
            self.user_equates.insert(Equate {
                label: symbol.label,
                address: symbol.address,
                flags: EquateFlags::RW,
            });
        }
        Ok(count)
    }

    /// Reads user labels from a symbol file.
    pub fn load_symbol_file(&mut self, path: &Path) -> io::Result<usize> {
        let count = self.load_symbols(BufReader::new(File::open(path)?))?;
        log::info!("loaded {} symbols from {}", count, path.display());
        Ok(count)
    }

    /// Writes every user label as a symbol listing, one label per line,
    /// ordered by address.
    pub fn save_symbols<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut equates: Vec<&Equate> = self.user_equates.iter().collect();
        equates.sort_by(|a, b| {
            a.address.cmp(&b.address).then_with(|| a.label.cmp(&b.label))
        });
        for equate in equates {
            writeln!(writer, "{:<24} {:04x}", equate.label, equate.address)?;
        }
        Ok(())
    }

    /// Writes every user label to a symbol file.  The file is only created
    /// once the whole listing has been formatted.
    pub fn save_symbol_file(&self, path: &Path) -> io::Result<()> {
        let mut data: Vec<u8> = Vec::new();
        self.save_symbols(&mut data)?;
        std::fs::write(path, data)?;
        log::info!(
            "saved {} symbols to {}",
            self.user_equates.len(),
            path.display()
        );
        Ok(())
    }

    /// Finds every user or system label that starts with `input`, ignoring
    /// case.
    pub fn complete(&self, input: &str) -> Completions {
        let mut names: Vec<&str> = self
            .user_equates
            .iter()
            .chain(system_equates().iter())
            .map(|equate| equate.label.as_str())
            .filter(|label| starts_with_ignore_case(label, input))
            .collect();
        names.sort_unstable();
        names.dedup();
        Completions {
            count: names.len(),
            candidates: names.join("  "),
            prefix: common_prefix(&names).to_string(),
        }
    }

    //-----------------------------------------------------------------------//
    // Disassembly

    /// Disassembles instructions starting at `start` until `bound` is
    /// reached or the address space runs out, and returns the listing.
    /// The listing is also kept for [`CartDebug::disassembly`].
    pub fn disassemble(
        &mut self,
        bus: &mut PagedBus,
        start: u16,
        bound: DisasmBound,
    ) -> &[DisassemblyTag] {
        let mut list: Vec<DisassemblyTag> = Vec::new();
        let mut pc = start;
        loop {
            match bound {
                DisasmBound::Lines(lines) if list.len() >= lines => break,
                DisasmBound::End(end) if pc > end => break,
                _ => {}
            }
            let code = bus.access_flags(pc).contains(AccessFlags::CODE);
            let instruction = Instruction::decode(bus, pc);
            let bytes: Vec<String> = instruction
                .bytes()
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .collect();
            list.push(DisassemblyTag {
                address: pc,
                label: self
                    .get_label(pc, true, None)
                    .map(Cow::into_owned)
                    .unwrap_or_default(),
                disasm: instruction.format(self, pc),
                bytes: bytes.join(" "),
                code,
            });
            match pc.checked_add(instruction.size()) {
                Some(next) => pc = next,
                None => break,
            }
        }
        self.disassembly = list;
        &self.disassembly
    }

    /// Disassembles `lines` instructions starting at `start`, formatted as
    /// text with one instruction per line.
    pub fn disassemble_lines(
        &mut self,
        bus: &mut PagedBus,
        start: u16,
        lines: usize,
    ) -> String {
        let mut out = String::new();
        for tag in self.disassemble(bus, start, DisasmBound::Lines(lines)) {
            let line = format!(
                "{:<16} {:04x}  {:<8}  {}",
                tag.label, tag.address, tag.bytes, tag.disasm
            );
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }

    /// Returns the listing from the most recent call to
    /// [`CartDebug::disassemble`].
    pub fn disassembly(&self) -> &[DisassemblyTag] {
        &self.disassembly
    }
}

impl Labels for CartDebug {
    fn label(&self, addr: u16, is_read: bool) -> Option<Cow<'_, str>> {
        self.get_label(addr, is_read, None)
    }
}

//===========================================================================//

fn is_valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) if first.is_ascii_digit() => false,
        Some(first) => chars
            .chain(Some(first))
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'),
        None => false,
    }
}

fn starts_with_ignore_case(label: &str, prefix: &str) -> bool {
    label
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn common_prefix<'a>(names: &[&'a str]) -> &'a str {
    let Some((&first, rest)) = names.split_first() else {
        return "";
    };
    let len = rest.iter().fold(first.len(), |len, name| {
        first
            .bytes()
            .zip(name.bytes())
            .take(len)
            .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
            .count()
    });
    first.get(..len).unwrap_or(first)
}

//===========================================================================//


//===========================================================================//
