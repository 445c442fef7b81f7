use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use vcsdb::bus::{PagedBus, RamDevice};
use vcsdb::cart::CartKind;
use vcsdb::db::{CartDebug, DisasmBound};

//===========================================================================//

#[derive(Parser)]
#[clap(author, about, long_about = None, version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prints information about a cartridge image.
    Info {
        /// The ROM image to load.
        rom: PathBuf,
        /// The cartridge's bank-switching scheme.
        #[clap(short, long, value_enum, default_value = "2k")]
        scheme: CartKind,
    },
    /// Disassembles code from a cartridge image.
    Dis {
        /// The ROM image to load.
        rom: PathBuf,
        /// The cartridge's bank-switching scheme.
        #[clap(short, long, value_enum, default_value = "2k")]
        scheme: CartKind,
        /// The bank to switch to before disassembling.
        #[clap(short, long)]
        bank: Option<u16>,
        /// The address to start at (defaults to the reset vector).
        #[clap(long, value_parser = parse_address)]
        start: Option<u16>,
        /// The number of instructions to disassemble.
        #[clap(short = 'n', long, default_value_t = 32)]
        lines: usize,
        /// Disassemble up to this address instead of a fixed line count.
        #[clap(long, value_parser = parse_address, conflicts_with = "lines")]
        end: Option<u16>,
        /// A DASM symbol file with labels to show in the listing.
        #[clap(long)]
        symbols: Option<PathBuf>,
    },
    /// Lists the labels that start with a given prefix.
    Complete {
        /// The prefix to complete.
        prefix: String,
        /// A DASM symbol file with additional labels.
        #[clap(long)]
        symbols: Option<PathBuf>,
    },
    /// Reads a DASM symbol file and writes it back out, sorted by address.
    Symbols {
        /// The symbol file to read.
        input: PathBuf,
        /// Where to write the sorted symbols.
        output: PathBuf,
    },
}

//===========================================================================//

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Info { rom, scheme } => {
            let bus = load_bus(&rom, scheme)?;
            let debug = CartDebug::new(&[]);
            if let Some(cart) = bus.cartridge() {
                println!("{}", cart.description());
            }
            println!("type: {}", debug.cart_type(&bus).unwrap_or("none"));
            println!(
                "bank: {} of {}",
                debug.bank(&bus),
                debug.bank_count(&bus)
            );
        }
        Command::Dis { rom, scheme, bank, start, lines, end, symbols } => {
            let mut bus = load_bus(&rom, scheme)?;
            let mut debug = CartDebug::new(&[]);
            if let Some(path) = symbols {
                debug.load_symbol_file(&path)?;
            }
            if let Some(bank) = bank {
                let switched =
                    bus.with_cartridge(|cart, bus| cart.bank(bank, bus));
                if switched != Some(true) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("cannot switch to bank {bank}"),
                    ));
                }
            }
            let start = match start {
                Some(start) => start,
                None => {
                    let lo = bus.peek(0xfffc);
                    let hi = bus.peek(0xfffd);
                    u16::from_le_bytes([lo, hi])
                }
            };
            let bound = match end {
                Some(end) => DisasmBound::End(end),
                None => DisasmBound::Lines(lines),
            };
            for tag in debug.disassemble(&mut bus, start, bound) {
                if !tag.label.is_empty() {
                    println!("{}:", tag.label);
                }
                println!(
                    "  {:04x}  {:<8}  {}",
                    tag.address, tag.bytes, tag.disasm
                );
            }
        }
        Command::Complete { prefix, symbols } => {
            let mut debug = CartDebug::new(&[]);
            if let Some(path) = symbols {
                debug.load_symbol_file(&path)?;
            }
            let completions = debug.complete(&prefix);
            match completions.count {
                0 => println!("no matches for {prefix:?}"),
                1 => println!("{}", completions.prefix),
                _ => {
                    println!("{}", completions.candidates);
                    println!("common prefix: {}", completions.prefix);
                }
            }
        }
        Command::Symbols { input, output } => {
            let mut debug = CartDebug::new(&[]);
            debug.load_symbol_file(&input)?;
            debug.save_symbol_file(&output)?;
        }
    }
    Ok(())
}

fn load_bus(path: &Path, scheme: CartKind) -> io::Result<PagedBus> {
    let image = std::fs::read(path)?;
    let cart = scheme.build(&image)?;
    let mut bus = PagedBus::new();
    let ram = RamDevice::new(vec![0; 0x80].into(), 0x0080..0x0100);
    bus.attach(Box::new(ram));
    bus.attach_cartridge(cart);
    bus.reset();
    Ok(bus)
}

fn parse_address(text: &str) -> Result<u16, String> {
    let digits = text
        .strip_prefix('$')
        .or_else(|| text.strip_prefix("0x"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16)
        .map_err(|error| format!("invalid address {text:?}: {error}"))
}

//===========================================================================//
