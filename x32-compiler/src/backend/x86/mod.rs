//! 32-bit x86 backend emitting MASM32 assembly text.

pub mod abi;
mod codegen;
pub mod regalloc;

pub use codegen::compile_ir_to_x86;
