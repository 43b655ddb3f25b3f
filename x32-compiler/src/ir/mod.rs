pub mod ir;
pub mod ir_generator;

pub use ir::*;
