//! The basic-block intermediate representation.
//!
//! A function is a flat list of labeled blocks; control flow between them
//! exists only in each block's terminator, which names target blocks by
//! label. Temporaries follow a strict protocol the backend relies on:
//! defined once (`DefTemp`/`DefReturnTemp`), written and read while live,
//! and freed exactly once (`FreeTemp`).

use crate::ast::{BinOp, CmpOp, DataType, FunctionSymbols, Prototype};

/// A temporary's identity within one function. Maps one-to-one onto a
/// register for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempId(pub usize);

pub type Label = String;

#[derive(Debug)]
pub struct ProgramIr {
    pub functions: Vec<FunctionIr>,
    /// Internal name of the function the entry stub calls.
    pub main_name: String,
}

#[derive(Debug)]
pub struct FunctionIr {
    /// Internal name; doubles as the assembly proc name.
    pub name: String,
    pub prototype: Prototype,
    pub symbols: FunctionSymbols,
    pub blocks: Vec<BasicBlock>,
}

#[derive(Debug)]
pub struct BasicBlock {
    pub label: Label,
    pub statements: Vec<Instr>,
    /// `None` only for a block that ends the function (its last statement
    /// is a `Return`).
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Jump(Label),
    /// Compare two temporaries and branch. Exactly one of the two targets
    /// is taken; there is no fallthrough.
    Branch {
        left: TempId,
        op: CmpOp,
        right: TempId,
        true_target: Label,
        false_target: Label,
    },
}

/// A value an instruction reads or writes.
#[derive(Debug, Clone)]
pub enum Value {
    Int {
        value: i64,
        ty: DataType,
    },
    Var {
        name: String,
        ty: DataType,
    },
    Temp(TempId),
    /// `array[index]` where the index temp already holds a byte offset.
    ArrayCell {
        array: String,
        elem_ty: DataType,
        index: TempId,
    },
}

#[derive(Debug, Clone)]
pub enum Instr {
    /// Bind a fresh temporary to a register from the pool.
    DefTemp(TempId),
    /// Capture the callee's result into a fresh temporary. Sits between
    /// `Call` and `PopState`, before the saved registers come back.
    DefReturnTemp(TempId),
    /// `temp = value`.
    AssignTemp { temp: TempId, value: Value },
    /// `dest = dest <op> src`, in place. `src` is a temp or a literal.
    Op {
        dest: TempId,
        op: BinOp,
        src: Value,
    },
    /// Store a temp into a variable or array cell.
    Store { dest: Value, src: TempId },
    FreeTemp(TempId),
    /// Save every register currently bound to a live temp.
    PushState,
    /// Restore what the matching `PushState` saved.
    PopState,
    /// Push one argument for the upcoming call.
    PushParam(TempId),
    Call { name: String },
    /// Move the value (if any) into the result register and leave the
    /// function.
    Return { value: Option<TempId> },
    Print {
        format: &'static str,
        value: TempId,
    },
    PrintString(String),
    PrintArray { array: String },
    ReadLine { array: String, max_chars: i64 },
    Exit { code: TempId },
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int { value, .. } => write!(f, "{}", value),
            Value::Var { name, .. } => write!(f, "{}", name),
            Value::Temp(t) => write!(f, "t{}", t.0),
            Value::ArrayCell { array, index, .. } => write!(f, "{}[t{}]", array, index.0),
        }
    }
}

impl ProgramIr {
    /// Human-readable dump, one instruction per line.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for func in &self.functions {
            let params: Vec<String> = func
                .prototype
                .params
                .iter()
                .map(|p| format!("{} {}", p.data_type, p.name))
                .collect();
            lines.push(format!("function {}({})", func.name, params.join(", ")));
            for block in &func.blocks {
                lines.push(format!("{}:", block.label));
                for stmt in &block.statements {
                    lines.push(format!("    {}", stmt.describe()));
                }
                match &block.terminator {
                    Some(Terminator::Jump(target)) => {
                        lines.push(format!("    goto {}", target));
                    }
                    Some(Terminator::Branch {
                        left,
                        op,
                        right,
                        true_target,
                        false_target,
                    }) => {
                        lines.push(format!(
                            "    if t{} {} t{} goto {} else goto {}",
                            left.0, op, right.0, true_target, false_target
                        ));
                    }
                    None => {}
                }
            }
            lines.push(String::new());
        }
        lines
    }
}

impl Instr {
    fn describe(&self) -> String {
        match self {
            Instr::DefTemp(t) => format!("def t{}", t.0),
            Instr::DefReturnTemp(t) => format!("def t{} = ret_val", t.0),
            Instr::AssignTemp { temp, value } => format!("t{} = {}", temp.0, value),
            Instr::Op { dest, op, src } => {
                let sym = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                    BinOp::Mod => "%",
                };
                format!("t{} = t{} {} {}", dest.0, dest.0, sym, src)
            }
            Instr::Store { dest, src } => format!("{} = t{}", dest, src.0),
            Instr::FreeTemp(t) => format!("free t{}", t.0),
            Instr::PushState => "push_state".to_string(),
            Instr::PopState => "pop_state".to_string(),
            Instr::PushParam(t) => format!("push_param t{}", t.0),
            Instr::Call { name } => format!("call {}", name),
            Instr::Return { value: Some(t) } => format!("return t{}", t.0),
            Instr::Return { value: None } => "return".to_string(),
            Instr::Print { format, value } => format!("print \"{}\", t{}", format, value.0),
            Instr::PrintString(s) => format!("print \"{}\"", s),
            Instr::PrintArray { array } => format!("print_array {}", array),
            Instr::ReadLine { array, max_chars } => {
                format!("read_line {}, {}", array, max_chars)
            }
            Instr::Exit { code } => format!("exit t{}", code.0),
        }
    }
}
