//! The typed AST produced by the parser.
//!
//! Names are already resolved: every variable, array, and function carries
//! its globally-unique internal name, so later passes never consult the
//! scope frames again.

/// The two scalar kinds of the language. Arrays are `DataType` plus a
/// compile-time length and only exist in symbol tables. Ordered so symbol
/// lists can be sorted for stable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DataType {
    Int32,
    Char,
}

impl DataType {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::Int32 => 4,
            DataType::Char => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int32 => "int_32",
            DataType::Char => "char",
        }
    }

    /// printf format used by `@print` for a value of this type.
    pub fn print_format(&self) -> &'static str {
        match self {
            DataType::Int32 => "%d\\n",
            DataType::Char => "%c\\n",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub functions: Vec<Function>,
    /// Internal name of the function the entry stub calls.
    pub main_name: String,
}

#[derive(Debug, Clone)]
pub struct Function {
    /// Globally-unique internal name (also the assembly proc name).
    pub name: String,
    pub source_name: String,
    pub prototype: Prototype,
    pub body: Vec<Stmt>,
    /// Every declaration made in any frame of this function, retained for
    /// IR symbol-table construction after the frames are popped.
    pub symbols: FunctionSymbols,
}

#[derive(Debug, Clone)]
pub struct Prototype {
    pub params: Vec<Param>,
    /// `None` for `void`.
    pub return_type: Option<DataType>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub data_type: DataType,
}

/// Flattened view of all frames created while parsing one function.
#[derive(Debug, Clone, Default)]
pub struct FunctionSymbols {
    /// (internal name, type) for every scalar local.
    pub vars: Vec<(String, DataType)>,
    /// (internal name, element type, element count) for every array local.
    pub arrays: Vec<(String, DataType, usize)>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// Variable declaration; an omitted initializer is a zero literal.
    Declare {
        name: String,
        data_type: DataType,
        init: Expr,
    },
    Assign {
        dest: Place,
        value: Expr,
    },
    If {
        cond: Cond,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        cond: Cond,
        body: Vec<Stmt>,
    },
    /// A call whose result (if any) is discarded.
    Call(CallExpr),
    Return {
        value: Option<Expr>,
    },
    Print {
        format: &'static str,
        value: Expr,
    },
    PrintString(String),
    PrintArray {
        array: String,
    },
    ReadLine {
        array: String,
        max_chars: i64,
    },
    Exit {
        code: Expr,
    },
}

/// Assignment destination.
#[derive(Debug, Clone)]
pub enum Place {
    Var {
        name: String,
        data_type: DataType,
    },
    ArrayCell {
        array: String,
        elem_type: DataType,
        index: Expr,
    },
}

#[derive(Debug, Clone)]
pub enum Expr {
    Int {
        value: i64,
        data_type: DataType,
    },
    Var {
        name: String,
        data_type: DataType,
    },
    ArrayCell {
        array: String,
        elem_type: DataType,
        index: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        /// Cached result type: the left operand's type.
        data_type: DataType,
    },
    Call {
        call: CallExpr,
        data_type: DataType,
    },
}

impl Expr {
    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Int { data_type, .. }
            | Expr::Var { data_type, .. }
            | Expr::Binary { data_type, .. }
            | Expr::Call { data_type, .. } => *data_type,
            Expr::ArrayCell { elem_type, .. } => *elem_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    /// Internal name of the callee.
    pub name: String,
    pub source_name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Eq,
    Ne,
}

impl CmpOp {
    /// The jump-if-true mnemonic this comparison lowers to.
    pub fn jump_mnemonic(&self) -> &'static str {
        match self {
            CmpOp::Lt => "jl",
            CmpOp::Gt => "jg",
            CmpOp::Eq => "je",
            CmpOp::Ne => "jne",
        }
    }
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        };
        f.write_str(s)
    }
}

/// Boolean condition tree for `if`/`while`. Combinators keep their
/// structure so the lowering pass can splice short-circuit blocks.
#[derive(Debug, Clone)]
pub enum Cond {
    Cmp {
        left: Expr,
        op: CmpOp,
        right: Expr,
    },
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
}
