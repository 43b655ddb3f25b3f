//! IR to MASM32 text emission.
//!
//! Each function becomes a `proc` whose locals are declared up front with
//! `LOCAL`; the default prologue handles the frame, so `ret` is enough to
//! leave. Temporaries are bound to registers on `DefTemp` and the binding
//! outlives the free, which lets a block's terminator compare two temps
//! that were already released back to the pool.

use super::abi::{Register, Width};
use super::regalloc::RegisterPool;
use crate::ast::BinOp;
use crate::ir::{FunctionIr, Instr, ProgramIr, TempId, Terminator, Value};
use crate::CompileError;
use std::collections::HashMap;

pub fn compile_ir_to_x86(program: &ProgramIr) -> Result<String, CompileError> {
    let mut lines = Vec::new();

    lines.push(".386".to_string());
    lines.push(".model flat, stdcall".to_string());
    lines.push("option casemap :none".to_string());
    lines.push(String::new());
    lines.push("include \\masm32\\include\\masm32rt.inc".to_string());
    lines.push(String::new());
    lines.push(".code".to_string());
    lines.push(String::new());

    for func in &program.functions {
        FuncEmitter::new(func, &mut lines).emit()?;
        lines.push(String::new());
    }

    lines.push("start:".to_string());
    lines.push(format!("    call {}", program.main_name));
    lines.push("    invoke ExitProcess, 0".to_string());
    lines.push(String::new());
    lines.push("end start".to_string());

    Ok(lines.join("\n"))
}

struct FuncEmitter<'a> {
    func: &'a FunctionIr,
    lines: &'a mut Vec<String>,
    pool: RegisterPool,
    /// Temp-to-register bindings; never removed, so freed temps remain
    /// readable by terminators.
    temps: HashMap<TempId, Register>,
    /// Register sets saved by `PushState`, innermost last.
    saved: Vec<Vec<Register>>,
}

impl<'a> FuncEmitter<'a> {
    fn new(func: &'a FunctionIr, lines: &'a mut Vec<String>) -> Self {
        Self {
            func,
            lines,
            pool: RegisterPool::new(),
            temps: HashMap::new(),
            saved: Vec::new(),
        }
    }

    fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    fn instr(&mut self, text: impl Into<String>) {
        self.lines.push(format!("    {}", text.into()));
    }

    fn reg(&self, temp: TempId) -> Result<Register, CompileError> {
        self.temps
            .get(&temp)
            .copied()
            .ok_or_else(|| CompileError::Internal(format!("use of undefined temporary t{}", temp.0)))
    }

    fn uses_division(&self) -> bool {
        self.func.blocks.iter().any(|block| {
            block.statements.iter().any(|instr| {
                matches!(
                    instr,
                    Instr::Op {
                        op: BinOp::Div | BinOp::Mod,
                        ..
                    }
                )
            })
        })
    }

    fn emit(mut self) -> Result<(), CompileError> {
        // Parameters are always pushed as 32-bit words; char parameters
        // are read back through their low byte.
        if self.func.prototype.params.is_empty() {
            self.line(format!("{} proc", self.func.name));
        } else {
            let params: Vec<String> = self
                .func
                .prototype
                .params
                .iter()
                .map(|p| format!("{}:DWORD", p.name))
                .collect();
            self.line(format!("{} proc {}", self.func.name, params.join(", ")));
        }

        for (name, ty) in &self.func.symbols.vars {
            let kw = Width::from(*ty).keyword();
            self.instr(format!("LOCAL {}:{}", name, kw));
        }
        for (name, elem_ty, size) in &self.func.symbols.arrays {
            let kw = Width::from(*elem_ty).keyword();
            self.instr(format!("LOCAL {}[{}]:{}", name, size, kw));
        }
        if self.uses_division() {
            self.instr("LOCAL div_temp_1:DWORD");
            self.instr("LOCAL div_temp_2:DWORD");
            self.instr("LOCAL div_temp_3:DWORD");
            self.instr("LOCAL div_temp_res:DWORD");
        }
        self.line(String::new());

        for i in 0..self.func.blocks.len() {
            let label = self.func.blocks[i].label.clone();
            self.line(format!("{}:", label));
            for j in 0..self.func.blocks[i].statements.len() {
                let instr = self.func.blocks[i].statements[j].clone();
                self.emit_instr(&instr)?;
            }
            if let Some(term) = self.func.blocks[i].terminator.clone() {
                self.emit_terminator(&term)?;
            }
        }

        self.line(format!("{} endp", self.func.name));
        Ok(())
    }

    fn emit_instr(&mut self, instr: &Instr) -> Result<(), CompileError> {
        match instr {
            Instr::DefTemp(temp) => {
                let reg = self.pool.acquire()?;
                self.temps.insert(*temp, reg);
            }
            Instr::DefReturnTemp(temp) => {
                // Runs between the call and the restores. Registers saved
                // at PushState are still marked in use, so the acquired
                // register cannot be clobbered by the upcoming pops.
                let reg = self.pool.acquire()?;
                self.temps.insert(*temp, reg);
                if reg != Register::Eax {
                    self.instr(format!("mov {}, eax", reg));
                }
            }
            Instr::AssignTemp { temp, value } => {
                let reg = self.reg(*temp)?;
                self.emit_load(reg, value)?;
            }
            Instr::Op { dest, op, src } => {
                let reg = self.reg(*dest)?;
                let src_text = self.scalar_operand(src)?;
                match op {
                    BinOp::Add => self.instr(format!("add {}, {}", reg, src_text)),
                    BinOp::Sub => self.instr(format!("sub {}, {}", reg, src_text)),
                    BinOp::Mul => self.instr(format!("imul {}, {}", reg, src_text)),
                    BinOp::Div => self.emit_division(reg, &src_text, Register::Eax),
                    BinOp::Mod => self.emit_division(reg, &src_text, Register::Edx),
                }
            }
            Instr::Store { dest, src } => {
                let reg = self.reg(*src)?;
                self.emit_store(dest, reg)?;
            }
            Instr::FreeTemp(temp) => {
                let reg = self.reg(*temp)?;
                self.pool.release(reg);
            }
            Instr::PushState => {
                let live: Vec<Register> = self.pool.in_use().to_vec();
                for reg in live.iter().rev() {
                    self.instr(format!("push {}", reg));
                }
                self.saved.push(live);
            }
            Instr::PopState => {
                let live = self.saved.pop().ok_or_else(|| {
                    CompileError::Internal("pop_state without a matching push_state".to_string())
                })?;
                for reg in live {
                    self.instr(format!("pop {}", reg));
                }
            }
            Instr::PushParam(temp) => {
                let reg = self.reg(*temp)?;
                self.instr(format!("push {}", reg));
            }
            Instr::Call { name } => {
                self.instr(format!("call {}", name));
            }
            Instr::Return { value } => {
                if let Some(temp) = value {
                    let reg = self.reg(*temp)?;
                    if reg != Register::Eax {
                        self.instr(format!("mov eax, {}", reg));
                    }
                }
                self.instr("ret");
            }
            Instr::Print { format, value } => {
                let reg = self.reg(*value)?;
                self.instr(format!("printf(\"{}\", {})", format, reg));
            }
            Instr::PrintString(text) => {
                self.instr(format!("printf(\"{}\\n\")", text));
            }
            Instr::PrintArray { array } => {
                self.instr(format!("printf(\"%s\\n\", ADDR {})", array));
            }
            Instr::ReadLine { array, max_chars } => {
                self.instr(format!("invoke StdIn, ADDR {}, {}", array, max_chars));
            }
            Instr::Exit { code } => {
                let reg = self.reg(*code)?;
                self.instr(format!("invoke ExitProcess, {}", reg));
            }
        }
        Ok(())
    }

    fn emit_terminator(&mut self, term: &Terminator) -> Result<(), CompileError> {
        match term {
            Terminator::Jump(target) => {
                self.instr(format!("jmp {}", target));
            }
            Terminator::Branch {
                left,
                op,
                right,
                true_target,
                false_target,
            } => {
                let left_reg = self.reg(*left)?;
                let right_reg = self.reg(*right)?;
                self.instr(format!("cmp {}, {}", left_reg, right_reg));
                self.instr(format!("{} {}", op.jump_mnemonic(), true_target));
                self.instr(format!("jmp {}", false_target));
            }
        }
        Ok(())
    }

    /// `mov` a value into a register. Byte-wide memory operands load
    /// through the register's low byte after clearing it, so the full
    /// 32-bit register always holds the value.
    fn emit_load(&mut self, reg: Register, value: &Value) -> Result<(), CompileError> {
        match value {
            Value::Int { value, .. } => {
                self.instr(format!("mov {}, {}", reg, value));
            }
            Value::Var { name, ty } => match Width::from(*ty) {
                Width::Byte => {
                    self.instr(format!("xor {}, {}", reg, reg));
                    self.instr(format!("mov {}, BYTE PTR {}", reg.byte(), name));
                }
                Width::Dword => {
                    self.instr(format!("mov {}, {}", reg, name));
                }
            },
            Value::Temp(other) => {
                let src = self.reg(*other)?;
                if src != reg {
                    self.instr(format!("mov {}, {}", reg, src));
                }
            }
            Value::ArrayCell {
                array,
                elem_ty,
                index,
            } => {
                let idx = self.reg(*index)?;
                match Width::from(*elem_ty) {
                    Width::Byte => {
                        self.instr(format!("xor {}, {}", reg, reg));
                        self.instr(format!("mov {}, BYTE PTR {}[{}]", reg.byte(), array, idx));
                    }
                    Width::Dword => {
                        self.instr(format!("mov {}, DWORD PTR {}[{}]", reg, array, idx));
                    }
                }
            }
        }
        Ok(())
    }

    fn emit_store(&mut self, dest: &Value, src: Register) -> Result<(), CompileError> {
        match dest {
            Value::Var { name, ty } => match Width::from(*ty) {
                Width::Byte => self.instr(format!("mov BYTE PTR {}, {}", name, src.byte())),
                Width::Dword => self.instr(format!("mov {}, {}", name, src)),
            },
            Value::ArrayCell {
                array,
                elem_ty,
                index,
            } => {
                let idx = self.reg(*index)?;
                match Width::from(*elem_ty) {
                    Width::Byte => {
                        self.instr(format!("mov BYTE PTR {}[{}], {}", array, idx, src.byte()))
                    }
                    Width::Dword => {
                        self.instr(format!("mov DWORD PTR {}[{}], {}", array, idx, src))
                    }
                }
            }
            other => {
                return Err(CompileError::Internal(format!(
                    "store into a non-memory destination: {}",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Render an `Op` source, which lowering restricts to a temp or a
    /// literal.
    fn scalar_operand(&self, value: &Value) -> Result<String, CompileError> {
        match value {
            Value::Int { value, .. } => Ok(value.to_string()),
            Value::Temp(temp) => Ok(self.reg(*temp)?.dword().to_string()),
            other => Err(CompileError::Internal(format!(
                "arithmetic source is neither temp nor literal: {}",
                other
            ))),
        }
    }

    /// `idiv` clobbers eax and edx and takes its divisor in a register, so
    /// all three scratch registers are spilled to locals around it. The
    /// divisor is stashed first, before any register is repurposed.
    fn emit_division(&mut self, dest: Register, src_text: &str, result: Register) {
        self.instr(format!("mov div_temp_res, {}", src_text));
        self.instr("mov div_temp_1, eax");
        self.instr("mov div_temp_2, ecx");
        self.instr("mov div_temp_3, edx");
        self.instr(format!("mov eax, {}", dest));
        self.instr("mov ecx, div_temp_res");
        self.instr("cdq");
        self.instr("idiv ecx");
        self.instr(format!("mov div_temp_res, {}", result));
        self.instr("mov eax, div_temp_1");
        self.instr("mov ecx, div_temp_2");
        self.instr("mov edx, div_temp_3");
        self.instr(format!("mov {}, div_temp_res", dest));
    }
}
