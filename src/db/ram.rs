use std::fmt::Write as _;

//===========================================================================//

/// A range of the address space that the debugger treats as RAM.  Reads
/// and writes may go through different mirrors of the same storage, so each
/// direction has its own offset from `start`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RamArea {
    /// The first logical address of the area.
    pub start: u16,
    /// The number of bytes in the area.
    pub size: u16,
    /// Offset from `start` to the address used when reading.
    pub read_offset: u16,
    /// Offset from `start` to the address used when writing.
    pub write_offset: u16,
}

impl RamArea {
    /// Returns the address used to read byte `index` of the area.
    pub fn read_port(&self, index: u16) -> u16 {
        self.start.wrapping_add(self.read_offset).wrapping_add(index)
    }

    /// Returns the address used to write byte `index` of the area.
    pub fn write_port(&self, index: u16) -> u16 {
        self.start.wrapping_add(self.write_offset).wrapping_add(index)
    }

    /// Returns true if `addr` is one of this area's read ports.
    pub fn is_read_port(&self, addr: u16) -> bool {
        addr.wrapping_sub(self.read_port(0)) < self.size
    }

    /// Returns true if `addr` is one of this area's write ports.
    pub fn is_write_port(&self, addr: u16) -> bool {
        addr.wrapping_sub(self.write_port(0)) < self.size
    }
}

//===========================================================================//

/// A snapshot of every registered RAM byte, along with the addresses used
/// to read and write it.  The three vectors run in parallel.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CartState {
    /// The byte values.
    pub ram: Vec<u8>,
    /// The read port of each byte.
    pub rport: Vec<u16>,
    /// The write port of each byte.
    pub wport: Vec<u16>,
}

impl CartState {
    /// Returns the number of bytes in the snapshot.
    pub fn len(&self) -> usize {
        self.ram.len()
    }

    /// Returns true if no RAM is registered.
    pub fn is_empty(&self) -> bool {
        self.ram.is_empty()
    }

    /// Formats the snapshot as a hex dump, sixteen bytes per row, each row
    /// headed by the read port of its first byte.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.ram.chunks(16).enumerate() {
            let _ = write!(out, "{:04x}:", self.rport[row * 16]);
            for byte in chunk {
                let _ = write!(out, " {byte:02x}");
            }
            out.push('\n');
        }
        out
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{CartState, RamArea};

    #[test]
    fn separate_ports() {
        let area = RamArea {
            start: 0x1000,
            size: 128,
            read_offset: 128,
            write_offset: 0,
        };
        assert_eq!(area.read_port(0), 0x1080);
        assert_eq!(area.write_port(5), 0x1005);
        assert!(area.is_read_port(0x10ff));
        assert!(!area.is_read_port(0x1100));
        assert!(!area.is_read_port(0x107f));
        assert!(area.is_write_port(0x1000));
        assert!(!area.is_write_port(0x1080));
    }

    #[test]
    fn dump_rows() {
        let state = CartState {
            ram: (0..20).collect(),
            rport: (0x80..0x94).collect(),
            wport: (0x80..0x94).collect(),
        };
        let dump = state.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0080: 00 01 02"));
        assert_eq!(lines[1], "0090: 10 11 12 13");
    }
}

//===========================================================================//
