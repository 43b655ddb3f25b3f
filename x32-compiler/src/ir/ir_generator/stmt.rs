//! Statement and condition lowering.

use super::context::Gen;
use super::expr::{lower_call, lower_expr, lower_index};
use crate::ast::{Cond, Place, Stmt};
use crate::ir::{Instr, Label, Terminator, Value};

pub(super) fn lower_stmts(gen: &mut Gen, stmts: &[Stmt]) {
    for stmt in stmts {
        lower_stmt(gen, stmt);
    }
}

fn lower_stmt(gen: &mut Gen, stmt: &Stmt) {
    match stmt {
        Stmt::Declare {
            name,
            data_type,
            init,
        } => {
            let value = lower_expr(gen, init);
            gen.emit(Instr::Store {
                dest: Value::Var {
                    name: name.clone(),
                    ty: *data_type,
                },
                src: value,
            });
            gen.emit(Instr::FreeTemp(value));
        }
        Stmt::Assign { dest, value } => {
            let src = lower_expr(gen, value);
            match dest {
                Place::Var { name, data_type } => {
                    gen.emit(Instr::Store {
                        dest: Value::Var {
                            name: name.clone(),
                            ty: *data_type,
                        },
                        src,
                    });
                }
                Place::ArrayCell {
                    array,
                    elem_type,
                    index,
                } => {
                    let index_temp = lower_index(gen, index, *elem_type);
                    gen.emit(Instr::Store {
                        dest: Value::ArrayCell {
                            array: array.clone(),
                            elem_ty: *elem_type,
                            index: index_temp,
                        },
                        src,
                    });
                    gen.emit(Instr::FreeTemp(index_temp));
                }
            }
            gen.emit(Instr::FreeTemp(src));
        }
        Stmt::If {
            cond,
            then_body,
            else_body,
        } => {
            let then_label = gen.fresh_label();
            let merge_label = gen.fresh_label();
            // Without an else branch the merge block doubles as the
            // false target.
            let else_label = match else_body {
                Some(_) => gen.fresh_label(),
                None => merge_label.clone(),
            };

            lower_cond(gen, cond, &then_label, &else_label);

            gen.start_block(then_label);
            lower_stmts(gen, then_body);
            gen.terminate(Terminator::Jump(merge_label.clone()));

            if let Some(else_body) = else_body {
                gen.start_block(else_label);
                lower_stmts(gen, else_body);
                gen.terminate(Terminator::Jump(merge_label.clone()));
            }

            gen.start_block(merge_label);
        }
        Stmt::While { cond, body } => {
            let cmp_label = gen.fresh_label();
            let body_label = gen.fresh_label();
            let exit_label = gen.fresh_label();

            gen.terminate(Terminator::Jump(cmp_label.clone()));
            gen.start_block(cmp_label.clone());
            lower_cond(gen, cond, &body_label, &exit_label);

            gen.start_block(body_label);
            lower_stmts(gen, body);
            gen.terminate(Terminator::Jump(cmp_label));

            gen.start_block(exit_label);
        }
        Stmt::Call(call) => {
            lower_call(gen, call, false);
        }
        Stmt::Return { value } => {
            let temp = value.as_ref().map(|v| lower_expr(gen, v));
            gen.emit(Instr::Return { value: temp });
            if let Some(temp) = temp {
                gen.emit(Instr::FreeTemp(temp));
            }
        }
        Stmt::Print { format, value } => {
            let temp = lower_expr(gen, value);
            gen.emit(Instr::Print {
                format,
                value: temp,
            });
            gen.emit(Instr::FreeTemp(temp));
        }
        Stmt::PrintString(text) => {
            gen.emit(Instr::PrintString(text.clone()));
        }
        Stmt::PrintArray { array } => {
            gen.emit(Instr::PrintArray {
                array: array.clone(),
            });
        }
        Stmt::ReadLine { array, max_chars } => {
            gen.emit(Instr::ReadLine {
                array: array.clone(),
                max_chars: *max_chars,
            });
        }
        Stmt::Exit { code } => {
            let temp = lower_expr(gen, code);
            gen.emit(Instr::Exit { code: temp });
            gen.emit(Instr::FreeTemp(temp));
        }
    }
}

/// Lower a condition tree so that control reaches `true_label` exactly when
/// it holds and `false_label` otherwise. Combinators splice an intermediate
/// block for their right side, which gives `&&` and `||` short-circuit
/// evaluation for free.
fn lower_cond(gen: &mut Gen, cond: &Cond, true_label: &Label, false_label: &Label) {
    match cond {
        Cond::Cmp { left, op, right } => {
            let left_temp = lower_expr(gen, left);
            let right_temp = lower_expr(gen, right);
            // Freeing is pure bookkeeping; the registers stay mapped for
            // the terminator's compare.
            gen.emit(Instr::FreeTemp(left_temp));
            gen.emit(Instr::FreeTemp(right_temp));
            gen.terminate(Terminator::Branch {
                left: left_temp,
                op: *op,
                right: right_temp,
                true_target: true_label.clone(),
                false_target: false_label.clone(),
            });
        }
        Cond::And(first, second) => {
            let mid_label = gen.fresh_label();
            lower_cond(gen, first, &mid_label, false_label);
            gen.start_block(mid_label);
            lower_cond(gen, second, true_label, false_label);
        }
        Cond::Or(first, second) => {
            let mid_label = gen.fresh_label();
            lower_cond(gen, first, true_label, &mid_label);
            gen.start_block(mid_label);
            lower_cond(gen, second, true_label, false_label);
        }
    }
}
