//! Bank-switched cartridge bus and debugger for the Atari 2600.

#![warn(missing_docs)]

macro_rules! invalid_data {
    ($e:expr) => {
        return Err(::std::io::Error::new(
            ::std::io::ErrorKind::InvalidData,
            $e,
        ))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err(::std::io::Error::new(
            ::std::io::ErrorKind::InvalidData,
            format!($fmt, $($arg)+),
        ))
    };
}

pub mod bus;
pub mod cart;
pub mod db;
pub mod dis;
pub mod parse;
pub mod state;
