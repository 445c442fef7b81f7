use vcsdb::bus::{PagedBus, RamDevice};
use vcsdb::cart::{Cart2K, CartKind, CartSB, Cartridge};
use vcsdb::db::{CartDebug, DisasmBound};

//===========================================================================//

/// Returns an image in which every byte of bank `n` is `n`.
fn banked_image(num_banks: usize) -> Vec<u8> {
    (0..num_banks).flat_map(|bank| vec![bank as u8; 0x1000]).collect()
}

fn make_bus(cart: Box<dyn Cartridge>) -> PagedBus {
    let mut bus = PagedBus::new();
    let ram = RamDevice::new(vec![0; 0x80].into(), 0x0080..0x0100);
    bus.attach(Box::new(ram));
    bus.attach_cartridge(cart);
    bus.reset();
    bus
}

fn current_bank(bus: &PagedBus) -> u16 {
    bus.cartridge().map_or(0, |cart| cart.current_bank())
}

fn bank_changed(bus: &mut PagedBus) -> bool {
    bus.with_cartridge(|cart, _| cart.bank_changed()).unwrap_or(false)
}

fn switch_bank(bus: &mut PagedBus, bank: u16) -> bool {
    bus.with_cartridge(|cart, bus| cart.bank(bank, bus)).unwrap_or(false)
}

fn save_cart(bus: &PagedBus) -> Vec<u8> {
    let mut data: Vec<u8> = Vec::new();
    bus.cartridge().unwrap().save(&mut data).unwrap();
    data
}

fn load_cart(bus: &mut PagedBus, data: &[u8]) -> std::io::Result<()> {
    let mut reader = data;
    bus.with_cartridge(|cart, bus| cart.load(&mut reader, bus)).unwrap()
}

fn rom_window(bus: &mut PagedBus) -> Vec<u8> {
    (0x1000..0x2000).map(|addr| bus.peek(addr)).collect()
}

//===========================================================================//

#[test]
fn fixed_mapping_mirrors_rounded_image() {
    for size in [1usize, 2, 50, 63, 64, 65, 100, 511, 512, 1000, 1025, 2048] {
        let data: Vec<u8> = (0..size).map(|i| (i * 7) as u8).collect();
        let mut bus = make_bus(CartKind::TwoK.build(&data).unwrap());
        let rounded = size.max(64).next_power_of_two();
        assert_eq!(bus.cartridge().unwrap().image().len(), rounded);
        let rounded = rounded as u16;
        for addr in 0x1000..(0x2000 - rounded) {
            assert_eq!(
                bus.peek(addr),
                bus.peek(addr + rounded),
                "size={size} addr=${addr:04x}"
            );
        }
    }
}

#[test]
fn hotspot_reset_selects_last_bank() {
    for num_banks in [1, 2, 3, 4, 7, 8, 16, 64] {
        let cart = CartKind::Sb.build(&banked_image(num_banks)).unwrap();
        let mut bus = make_bus(cart);
        let last = (num_banks - 1) as u16;
        assert_eq!(current_bank(&bus), last, "num_banks={num_banks}");
        assert_eq!(bus.peek(0x1000), last as u8);
        switch_bank(&mut bus, 0);
        bus.reset();
        assert_eq!(current_bank(&bus), last, "num_banks={num_banks}");
    }
}

#[test]
fn hotspot_band_selects_bank_from_low_bits() {
    for (num_banks, mask) in [(8, 0x07), (64, 0x3f)] {
        let cart = CartSB::new(&banked_image(num_banks)).unwrap();
        let mut bus = make_bus(Box::new(cart));
        for addr in 0x0800..0x1000u16 {
            bank_changed(&mut bus);
            bus.peek(addr);
            assert_eq!(current_bank(&bus), addr & mask, "addr=${addr:04x}");
            assert!(bank_changed(&mut bus));
            assert_eq!(bus.peek(0x1800), (addr & mask) as u8);
        }
        for addr in (0x0800..0x1000u16).rev() {
            assert!(bus.poke(addr, 0));
            assert_eq!(current_bank(&bus), addr & mask, "addr=${addr:04x}");
            assert!(bank_changed(&mut bus));
        }
    }
}

#[test]
fn patches_are_bank_relative_and_persist() {
    let mut bus = make_bus(CartKind::Sb.build(&banked_image(4)).unwrap());
    assert!(switch_bank(&mut bus, 2));
    bus.with_cartridge(|cart, _| cart.patch(0x1234, 0x99));
    assert_eq!(bus.peek(0x1234), 0x99);
    assert_eq!(bus.peek(0x1235), 2);
    assert!(switch_bank(&mut bus, 3));
    assert_eq!(bus.peek(0x1234), 3);
    assert!(switch_bank(&mut bus, 2));
    assert_eq!(bus.peek(0x1234), 0x99);
    assert_eq!(bus.cartridge().unwrap().image()[0x2234], 0x99);
}

#[test]
fn save_and_load_into_fresh_device() {
    let image: Vec<u8> =
        (0..0x6000).map(|i| (i * 13 + i / 0x1000) as u8).collect();
    let mut bus = make_bus(Box::new(CartSB::new(&image).unwrap()));
    assert!(switch_bank(&mut bus, 4));
    let data = save_cart(&bus);
    let expected = rom_window(&mut bus);

    let mut fresh = make_bus(Box::new(CartSB::new(&image).unwrap()));
    assert_eq!(current_bank(&fresh), 5);
    load_cart(&mut fresh, &data).unwrap();
    assert_eq!(current_bank(&fresh), 4);
    assert_eq!(
        fresh.cartridge().unwrap().image(),
        bus.cartridge().unwrap().image()
    );
    assert_eq!(rom_window(&mut fresh), expected);

    let mut fixed = make_bus(Box::new(Cart2K::new(&image[..2048]).unwrap()));
    let before = rom_window(&mut fixed);
    let error = load_cart(&mut fixed, &data).unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
    assert_eq!(rom_window(&mut fixed), before);

    let data = save_cart(&fixed);
    let error = load_cart(&mut fresh, &data).unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
    assert_eq!(current_bank(&fresh), 4);
}

#[test]
fn whole_bus_state_round_trip() {
    let mut bus = make_bus(CartKind::Sb.build(&banked_image(3)).unwrap());
    bus.poke(0x0080, 0x12);
    bus.poke(0x00ff, 0x34);
    bus.peek(0x0800);
    let mut data: Vec<u8> = Vec::new();
    bus.save_state(&mut data).unwrap();

    let mut other = make_bus(CartKind::Sb.build(&banked_image(3)).unwrap());
    other.load_state(&mut data.as_slice()).unwrap();
    assert_eq!(other.peek(0x0080), 0x12);
    assert_eq!(other.peek(0x00ff), 0x34);
    assert_eq!(current_bank(&other), 0);
    assert_eq!(other.peek(0x1000), 0);
}

#[test]
fn failed_bus_load_leaves_every_device_untouched() {
    let mut bus = make_bus(CartKind::Sb.build(&banked_image(4)).unwrap());
    bus.poke(0x0080, 0x12);
    let mut data: Vec<u8> = Vec::new();
    bus.save_state(&mut data).unwrap();

    let mut other = make_bus(CartKind::TwoK.build(&[0xea; 2048]).unwrap());
    other.poke(0x0080, 0x77);
    other.poke(0x00c0, 0x55);
    let before = rom_window(&mut other);
    let error = other.load_state(&mut data.as_slice()).unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
    assert_eq!(other.peek(0x0080), 0x77);
    assert_eq!(other.peek(0x00c0), 0x55);
    assert_eq!(rom_window(&mut other), before);

    let mut truncated = &data[..data.len() - 1];
    let mut same = make_bus(CartKind::Sb.build(&banked_image(4)).unwrap());
    same.poke(0x0080, 0x34);
    same.peek(0x0802);
    assert!(same.load_state(&mut truncated).is_err());
    assert_eq!(same.peek(0x0080), 0x34);
    assert_eq!(current_bank(&same), 2);
}

#[test]
fn label_lookup_falls_back_to_hex() {
    let debug = CartDebug::new(&[]);
    for addr in [0x0080, 0x00ff, 0x1000, 0xf123, 0xffff] {
        let label = debug.get_label(addr, true, Some(4)).unwrap();
        assert_eq!(label.len(), 4);
        assert_eq!(u16::from_str_radix(&label, 16).unwrap(), addr);
    }
    assert_eq!(debug.get_label(0x0002, false, Some(4)).unwrap(), "WSYNC");
}

#[test]
fn symbol_file_round_trip() {
    let mut debug = CartDebug::new(&[]);
    let labels = [
        ("Start", 0xf000),
        ("Kernel.loop", 0xf0a3),
        ("_temp", 0x0080),
        ("Mirror", 0x0080),
        ("VSYNC", 0x1000),
        ("End", 0xffff),
    ];
    for (label, addr) in labels {
        assert!(debug.add_label(label, addr));
    }
    let mut data: Vec<u8> = Vec::new();
    debug.save_symbols(&mut data).unwrap();

    let mut other = CartDebug::new(&[]);
    assert_eq!(other.load_symbols(data.as_slice()).unwrap(), labels.len());
    assert_eq!(other.user_equates().len(), labels.len());
    for (label, addr) in labels {
        assert_eq!(other.get_address(label), Some(addr), "label={label}");
    }
}

#[test]
fn fill_bytes_disassemble_one_tag_per_byte() {
    let mut bus = make_bus(CartKind::TwoK.build(&[0xea, 0xea, 0xea]).unwrap());
    let mut debug = CartDebug::new(&[]);
    let list = debug.disassemble(&mut bus, 0x1003, DisasmBound::End(0x1041));
    assert_eq!(list.len(), 63);
    for (index, tag) in list.iter().enumerate() {
        assert_eq!(tag.address, 0x1003 + index as u16);
    }
    let mnemonics: Vec<&str> =
        list.iter().map(|tag| tag.disasm.as_str()).collect();
    assert!(mnemonics[..61].iter().all(|&text| text == "jam"));
    assert_eq!(&mnemonics[61..], &["NOP", "NOP"]);
    assert!(list[..61].iter().all(|tag| tag.bytes == "02"));
}

//===========================================================================//
