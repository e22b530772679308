/// Pairing based accumulator with public tails
pub mod cks09;
