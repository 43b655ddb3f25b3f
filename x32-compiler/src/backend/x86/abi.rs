//! Register names and operand widths.

use crate::ast::DataType;
use std::fmt;

/// The four general-purpose registers temporaries live in. `Eax` is also
/// the call-result register, so the pool hands it out last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Eax,
    Ebx,
    Ecx,
    Edx,
}

impl Register {
    /// 32-bit name; arithmetic always runs at this width.
    pub fn dword(&self) -> &'static str {
        match self {
            Register::Eax => "eax",
            Register::Ebx => "ebx",
            Register::Ecx => "ecx",
            Register::Edx => "edx",
        }
    }

    /// Low-byte name, used for single-byte loads and stores.
    pub fn byte(&self) -> &'static str {
        match self {
            Register::Eax => "al",
            Register::Ebx => "bl",
            Register::Ecx => "cl",
            Register::Edx => "dl",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Dword,
}

impl Width {
    /// MASM size keyword, as written in `PTR` expressions and LOCAL
    /// declarations.
    pub fn keyword(&self) -> &'static str {
        match self {
            Width::Byte => "BYTE",
            Width::Dword => "DWORD",
        }
    }
}

impl From<DataType> for Width {
    fn from(ty: DataType) -> Self {
        match ty {
            DataType::Char => Width::Byte,
            DataType::Int32 => Width::Dword,
        }
    }
}
