//! AST to basic-block IR lowering.
//!
//! Labels are unique program-wide, temporaries per function. The lowering
//! never needs the scope frames: the AST already carries resolved names
//! and types.

mod context;
mod expr;
mod stmt;

use crate::ast::Program;
use crate::ir::{FunctionIr, Instr, ProgramIr};
use context::Gen;

pub fn lower(program: &Program) -> ProgramIr {
    let mut gen = Gen::new();
    let mut functions = Vec::new();

    for func in &program.functions {
        gen.begin_function();
        stmt::lower_stmts(&mut gen, &func.body);

        // A body that falls off its end still leaves the proc.
        if !gen.current_ends_with_return() {
            gen.emit(Instr::Return { value: None });
        }

        functions.push(FunctionIr {
            name: func.name.clone(),
            prototype: func.prototype.clone(),
            symbols: func.symbols.clone(),
            blocks: gen.finish_function(),
        });
    }

    ProgramIr {
        functions,
        main_name: program.main_name.clone(),
    }
}
