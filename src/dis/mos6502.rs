//! Facilities for disassembling 6502 machine code.

use super::Labels;
use crate::bus::PagedBus;

//===========================================================================//

/// An addressing mode for a 6502 processor instruction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AddrMode {
    /// No additional arguments to the opcode.
    Implied,
    /// Operate on the A register.
    Accumulator,
    /// Operate on a constant byte immediately following the opcode.
    Immediate,
    /// Operate on an address that is offset (by the signed byte following the
    /// opcode) from the address of this instruction.
    Relative,
    /// Operate on the absolute 16-bit address following the opcode.
    Absolute,
    /// Treat the 16-bit address following the opcode as a pointer to the
    /// address to operate on.
    AbsoluteIndirect,
    /// Operate on the absolute 16-bit address following the opcode, offset
    /// by index X.
    XIndexedAbsolute,
    /// Operate on the absolute 16-bit address following the opcode, offset
    /// by index Y.
    YIndexedAbsolute,
    /// Operate on the 8-bit zero page address following the opcode.
    ZeroPage,
    /// Operate on the 8-bit zero page address following the opcode, offset by
    /// index X.
    XIndexedZeroPage,
    /// Operate on the 8-bit zero page address following the opcode, offset by
    /// index Y.
    YIndexedZeroPage,
    /// Operate on the 16-bit address that is stored in memory, at the 8-bit
    /// zero page address following the opcode offset by index X.
    XIndexedZeroPageIndirect,
    /// Operate on a address equal to the 16-bit address stored at the 8-bit
    /// zero page address following the opcode, offset by index Y.
    ZeroPageIndirectYIndexed,
    /// The opcode halts the processor; there is nothing to decode after it.
    Invalid,
}

impl AddrMode {
    /// Returns the number of operand bytes following the opcode.
    pub fn operand_size(self) -> u16 {
        match self {
            AddrMode::Implied | AddrMode::Accumulator | AddrMode::Invalid => 0,
            AddrMode::Absolute
            | AddrMode::AbsoluteIndirect
            | AddrMode::XIndexedAbsolute
            | AddrMode::YIndexedAbsolute => 2,
            _ => 1,
        }
    }
}

/// How an instruction accesses the memory its operand names.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AccessMode {
    /// The operand address is read.
    Read,
    /// The operand address is written (including read-modify-write).
    Write,
    /// The operand isn't a data address (immediate values, jumps, branches).
    None,
}

//===========================================================================//

const IMP: AddrMode = AddrMode::Implied;
const ACC: AddrMode = AddrMode::Accumulator;
const IMM: AddrMode = AddrMode::Immediate;
const REL: AddrMode = AddrMode::Relative;
const ABS: AddrMode = AddrMode::Absolute;
const IND: AddrMode = AddrMode::AbsoluteIndirect;
const ABX: AddrMode = AddrMode::XIndexedAbsolute;
const ABY: AddrMode = AddrMode::YIndexedAbsolute;
const ZPG: AddrMode = AddrMode::ZeroPage;
const ZPX: AddrMode = AddrMode::XIndexedZeroPage;
const ZPY: AddrMode = AddrMode::YIndexedZeroPage;
const IZX: AddrMode = AddrMode::XIndexedZeroPageIndirect;
const IZY: AddrMode = AddrMode::ZeroPageIndirectYIndexed;
const INV: AddrMode = AddrMode::Invalid;

const R: AccessMode = AccessMode::Read;
const W: AccessMode = AccessMode::Write;
const N: AccessMode = AccessMode::None;

// Documented opcodes are upper case, undocumented ones lower case.
static MNEMONIC_TABLE: [&str; 256] = [
    "BRK", "ORA", "jam", "slo", "nop", "ORA", "ASL", "slo", // $00
    "PHP", "ORA", "ASL", "anc", "nop", "ORA", "ASL", "slo", // $08
    "BPL", "ORA", "jam", "slo", "nop", "ORA", "ASL", "slo", // $10
    "CLC", "ORA", "nop", "slo", "nop", "ORA", "ASL", "slo", // $18
    "JSR", "AND", "jam", "rla", "BIT", "AND", "ROL", "rla", // $20
    "PLP", "AND", "ROL", "anc", "BIT", "AND", "ROL", "rla", // $28
    "BMI", "AND", "jam", "rla", "nop", "AND", "ROL", "rla", // $30
    "SEC", "AND", "nop", "rla", "nop", "AND", "ROL", "rla", // $38
    "RTI", "EOR", "jam", "sre", "nop", "EOR", "LSR", "sre", // $40
    "PHA", "EOR", "LSR", "asr", "JMP", "EOR", "LSR", "sre", // $48
    "BVC", "EOR", "jam", "sre", "nop", "EOR", "LSR", "sre", // $50
    "CLI", "EOR", "nop", "sre", "nop", "EOR", "LSR", "sre", // $58
    "RTS", "ADC", "jam", "rra", "nop", "ADC", "ROR", "rra", // $60
    "PLA", "ADC", "ROR", "arr", "JMP", "ADC", "ROR", "rra", // $68
    "BVS", "ADC", "jam", "rra", "nop", "ADC", "ROR", "rra", // $70
    "SEI", "ADC", "nop", "rra", "nop", "ADC", "ROR", "rra", // $78
    "nop", "STA", "nop", "sax", "STY", "STA", "STX", "sax", // $80
    "DEY", "nop", "TXA", "xaa", "STY", "STA", "STX", "sax", // $88
    "BCC", "STA", "jam", "sha", "STY", "STA", "STX", "sax", // $90
    "TYA", "STA", "TXS", "shs", "shy", "STA", "shx", "sha", // $98
    "LDY", "LDA", "LDX", "lax", "LDY", "LDA", "LDX", "lax", // $a0
    "TAY", "LDA", "TAX", "lax", "LDY", "LDA", "LDX", "lax", // $a8
    "BCS", "LDA", "jam", "lax", "LDY", "LDA", "LDX", "lax", // $b0
    "CLV", "LDA", "TSX", "las", "LDY", "LDA", "LDX", "lax", // $b8
    "CPY", "CMP", "nop", "dcp", "CPY", "CMP", "DEC", "dcp", // $c0
    "INY", "CMP", "DEX", "sbx", "CPY", "CMP", "DEC", "dcp", // $c8
    "BNE", "CMP", "jam", "dcp", "nop", "CMP", "DEC", "dcp", // $d0
    "CLD", "CMP", "nop", "dcp", "nop", "CMP", "DEC", "dcp", // $d8
    "CPX", "SBC", "nop", "isc", "CPX", "SBC", "INC", "isc", // $e0
    "INX", "SBC", "NOP", "sbc", "CPX", "SBC", "INC", "isc", // $e8
    "BEQ", "SBC", "jam", "isc", "nop", "SBC", "INC", "isc", // $f0
    "SED", "SBC", "nop", "isc", "nop", "SBC", "INC", "isc", // $f8
];

static ADDR_MODE_TABLE: [AddrMode; 256] = [
    IMM, IZX, INV, IZX, ZPG, ZPG, ZPG, ZPG, // $00
    IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // $08
    REL, IZY, INV, IZY, ZPX, ZPX, ZPX, ZPX, // $10
    IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // $18
    ABS, IZX, INV, IZX, ZPG, ZPG, ZPG, ZPG, // $20
    IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // $28
    REL, IZY, INV, IZY, ZPX, ZPX, ZPX, ZPX, // $30
    IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // $38
    IMP, IZX, INV, IZX, ZPG, ZPG, ZPG, ZPG, // $40
    IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // $48
    REL, IZY, INV, IZY, ZPX, ZPX, ZPX, ZPX, // $50
    IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // $58
    IMP, IZX, INV, IZX, ZPG, ZPG, ZPG, ZPG, // $60
    IMP, IMM, ACC, IMM, IND, ABS, ABS, ABS, // $68
    REL, IZY, INV, IZY, ZPX, ZPX, ZPX, ZPX, // $70
    IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // $78
    IMM, IZX, IMM, IZX, ZPG, ZPG, ZPG, ZPG, // $80
    IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // $88
    REL, IZY, INV, IZY, ZPX, ZPX, ZPY, ZPY, // $90
    IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY, // $98
    IMM, IZX, IMM, IZX, ZPG, ZPG, ZPG, ZPG, // $a0
    IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // $a8
    REL, IZY, INV, IZY, ZPX, ZPX, ZPY, ZPY, // $b0
    IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY, // $b8
    IMM, IZX, IMM, IZX, ZPG, ZPG, ZPG, ZPG, // $c0
    IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // $c8
    REL, IZY, INV, IZY, ZPX, ZPX, ZPX, ZPX, // $d0
    IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // $d8
    IMM, IZX, IMM, IZX, ZPG, ZPG, ZPG, ZPG, // $e0
    IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // $e8
    REL, IZY, INV, IZY, ZPX, ZPX, ZPX, ZPX, // $f0
    IMP, ABY, IMP, ABY, ABX, ABX, ABX, ABX, // $f8
];

static ACCESS_MODE_TABLE: [AccessMode; 256] = [
    N, R, N, W, R, R, W, W, // $00
    N, N, N, N, R, R, W, W, // $08
    N, R, N, W, R, R, W, W, // $10
    N, R, N, W, R, R, W, W, // $18
    N, R, N, W, R, R, W, W, // $20
    N, N, N, N, R, R, W, W, // $28
    N, R, N, W, R, R, W, W, // $30
    N, R, N, W, R, R, W, W, // $38
    N, R, N, W, R, R, W, W, // $40
    N, N, N, N, N, R, W, W, // $48
    N, R, N, W, R, R, W, W, // $50
    N, R, N, W, R, R, W, W, // $58
    N, R, N, W, R, R, W, W, // $60
    N, N, N, N, N, R, W, W, // $68
    N, R, N, W, R, R, W, W, // $70
    N, R, N, W, R, R, W, W, // $78
    N, W, N, W, W, W, W, W, // $80
    N, N, N, N, W, W, W, W, // $88
    N, W, N, W, W, W, W, W, // $90
    N, W, N, W, W, W, W, W, // $98
    N, R, N, R, R, R, R, R, // $a0
    N, N, N, N, R, R, R, R, // $a8
    N, R, N, R, R, R, R, R, // $b0
    N, R, N, R, R, R, R, R, // $b8
    N, R, N, W, R, R, W, W, // $c0
    N, N, N, N, R, R, W, W, // $c8
    N, R, N, W, R, R, W, W, // $d0
    N, R, N, W, R, R, W, W, // $d8
    N, R, N, W, R, R, W, W, // $e0
    N, N, N, N, R, R, W, W, // $e8
    N, R, N, W, R, R, W, W, // $f0
    N, R, N, W, R, R, W, W, // $f8
];

//===========================================================================//

/// An addressing mode and argument value for a 6502 processor instruction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operand {
    /// No additional arguments to the opcode.
    Implied,
    /// Operate on the A register.
    Accumulator,
    /// Operate on the given constant byte.
    Immediate(u8),
    /// Operate on an address that is offset (by the given signed byte) from
    /// the address of this instruction.
    Relative(i8),
    /// Operate on the given absolute address.
    Absolute(u16),
    /// Operate on the address in memory that the given absolute address
    /// points to.
    AbsoluteIndirect(u16),
    /// Operate on the given absolute address, offset by index X.
    XIndexedAbsolute(u16),
    /// Operate on the given absolute address, offset by index Y.
    YIndexedAbsolute(u16),
    /// Operate on the given zero page address.
    ZeroPage(u8),
    /// Operate on the given zero page address, offset by index X.
    XIndexedZeroPage(u8),
    /// Operate on the given zero page address, offset by index Y.
    YIndexedZeroPage(u8),
    /// Operate on the address in memory that is offset from the given zero
    /// page address by index X.
    XIndexedZeroPageIndirect(u8),
    /// Operate on an address in memory equal to the address stored at the
    /// given zero page address, offset by index Y.
    ZeroPageIndirectYIndexed(u8),
    /// The opcode halts the processor.
    Invalid,
}

impl Operand {
    /// Formats this operand.  `pc` gives the address of the start of the
    /// instruction, and `is_read` selects which register names to use for
    /// addresses.
    fn format(self, labels: &dyn Labels, pc: u16, is_read: bool) -> String {
        let abs = |addr: u16| match labels.label(addr, is_read) {
            Some(label) => label.into_owned(),
            None => format!("${addr:04x}"),
        };
        let zp = |addr: u8| match labels.label(u16::from(addr), is_read) {
            Some(label) => label.into_owned(),
            None => format!("${addr:02x}"),
        };
        match self {
            Operand::Implied | Operand::Invalid => String::new(),
            Operand::Accumulator => " A".to_string(),
            Operand::Immediate(byte) => format!(" #${byte:02x}"),
            Operand::Relative(offset) => {
                let dest = pc.wrapping_add(2).wrapping_add(offset as u16);
                format!(" {}", abs(dest))
            }
            Operand::Absolute(addr) => format!(" {}", abs(addr)),
            Operand::AbsoluteIndirect(addr) => format!(" ({})", abs(addr)),
            Operand::XIndexedAbsolute(addr) => format!(" {}, X", abs(addr)),
            Operand::YIndexedAbsolute(addr) => format!(" {}, Y", abs(addr)),
            Operand::ZeroPage(addr) => format!(" {}", zp(addr)),
            Operand::XIndexedZeroPage(addr) => format!(" {}, X", zp(addr)),
            Operand::YIndexedZeroPage(addr) => format!(" {}, Y", zp(addr)),
            Operand::XIndexedZeroPageIndirect(addr) => {
                format!(" ({}, X)", zp(addr))
            }
            Operand::ZeroPageIndirectYIndexed(addr) => {
                format!(" ({}), Y", zp(addr))
            }
        }
    }
}

//===========================================================================//

/// A complete instruction, including parameter values, for a 6502 processor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Instruction {
    /// The opcode byte.
    pub opcode: u8,
    /// The addressing mode parameter value.
    pub operand: Operand,
}

impl Instruction {
    /// Returns the assembler mnemonic for this instruction.
    pub fn mnemonic(self) -> &'static str {
        MNEMONIC_TABLE[usize::from(self.opcode)]
    }

    /// Returns the addressing mode of this instruction.
    pub fn addr_mode(self) -> AddrMode {
        ADDR_MODE_TABLE[usize::from(self.opcode)]
    }

    /// Returns how this instruction accesses its operand address.
    pub fn access_mode(self) -> AccessMode {
        ACCESS_MODE_TABLE[usize::from(self.opcode)]
    }

    /// Returns the size of this instruction, in bytes.
    pub fn size(self) -> u16 {
        1 + self.addr_mode().operand_size()
    }

    /// Returns the encoded bytes of this instruction, opcode first.
    pub fn bytes(self) -> Vec<u8> {
        let mut bytes = vec![self.opcode];
        match self.operand {
            Operand::Implied | Operand::Accumulator | Operand::Invalid => {}
            Operand::Immediate(byte)
            | Operand::ZeroPage(byte)
            | Operand::XIndexedZeroPage(byte)
            | Operand::YIndexedZeroPage(byte)
            | Operand::XIndexedZeroPageIndirect(byte)
            | Operand::ZeroPageIndirectYIndexed(byte) => bytes.push(byte),
            Operand::Relative(offset) => bytes.push(offset as u8),
            Operand::Absolute(addr)
            | Operand::AbsoluteIndirect(addr)
            | Operand::XIndexedAbsolute(addr)
            | Operand::YIndexedAbsolute(addr) => {
                bytes.extend_from_slice(&addr.to_le_bytes())
            }
        }
        bytes
    }

    /// Decodes a single 6502 instruction at the given starting address.
    ///
    /// The bytes are read with ordinary bus reads, so any side effects
    /// (such as hotspot bank switching) happen exactly as they would if the
    /// CPU read them.
    pub fn decode(bus: &mut PagedBus, pc: u16) -> Instruction {
        let opcode = bus.peek(pc);
        let operand = match ADDR_MODE_TABLE[usize::from(opcode)] {
            AddrMode::Implied => Operand::Implied,
            AddrMode::Accumulator => Operand::Accumulator,
            AddrMode::Invalid => Operand::Invalid,
            AddrMode::Immediate => Operand::Immediate(next_byte(bus, pc)),
            AddrMode::Relative => Operand::Relative(next_byte(bus, pc) as i8),
            AddrMode::Absolute => Operand::Absolute(next_word(bus, pc)),
            AddrMode::AbsoluteIndirect => {
                Operand::AbsoluteIndirect(next_word(bus, pc))
            }
            AddrMode::XIndexedAbsolute => {
                Operand::XIndexedAbsolute(next_word(bus, pc))
            }
            AddrMode::YIndexedAbsolute => {
                Operand::YIndexedAbsolute(next_word(bus, pc))
            }
            AddrMode::ZeroPage => Operand::ZeroPage(next_byte(bus, pc)),
            AddrMode::XIndexedZeroPage => {
                Operand::XIndexedZeroPage(next_byte(bus, pc))
            }
            AddrMode::YIndexedZeroPage => {
                Operand::YIndexedZeroPage(next_byte(bus, pc))
            }
            AddrMode::XIndexedZeroPageIndirect => {
                Operand::XIndexedZeroPageIndirect(next_byte(bus, pc))
            }
            AddrMode::ZeroPageIndirectYIndexed => {
                Operand::ZeroPageIndirectYIndexed(next_byte(bus, pc))
            }
        };
        Instruction { opcode, operand }
    }

    /// Formats the decoded instruction as a human-readable string.  `pc`
    /// specifies the address of the start of the instruction.  Operand
    /// addresses are shown as labels where `labels` knows one, using write
    /// register names for instructions that store to their operand.
    pub fn format(self, labels: &dyn Labels, pc: u16) -> String {
        let is_read = self.access_mode() != AccessMode::Write;
        format!(
            "{}{}",
            self.mnemonic(),
            self.operand.format(labels, pc, is_read)
        )
    }
}

fn next_byte(bus: &mut PagedBus, pc: u16) -> u8 {
    bus.peek(pc.wrapping_add(1))
}

fn next_word(bus: &mut PagedBus, pc: u16) -> u16 {
    let lo = bus.peek(pc.wrapping_add(1));
    let hi = bus.peek(pc.wrapping_add(2));
    (u16::from(hi) << 8) | u16::from(lo)
}

//===========================================================================//


//===========================================================================//
