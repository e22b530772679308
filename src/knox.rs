/// Accumulator methods
pub mod accumulator;
