//! Facilities for disassembling 6502 machine code.

use std::borrow::Cow;

pub mod mos6502;

//===========================================================================//

/// A source of symbolic names for addresses, used when formatting operands.
pub trait Labels {
    /// Returns the label for `addr`, if any.  `is_read` selects between
    /// names for registers that differ by access direction.
    fn label(&self, addr: u16, is_read: bool) -> Option<Cow<'_, str>>;
}

//===========================================================================//
