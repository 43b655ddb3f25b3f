//! Expression lowering.
//!
//! Every expression evaluates into a freshly defined temporary that the
//! caller owns and must free. Binary operations reuse the left operand's
//! temp as the destination and free the right operand's immediately, so
//! an expression tree never holds more temps than its depth.

use super::context::Gen;
use crate::ast::{BinOp, CallExpr, DataType, Expr};
use crate::ir::{Instr, TempId, Value};

pub(super) fn lower_expr(gen: &mut Gen, expr: &Expr) -> TempId {
    match expr {
        Expr::Int { value, data_type } => {
            let temp = gen.fresh_temp();
            gen.emit(Instr::DefTemp(temp));
            gen.emit(Instr::AssignTemp {
                temp,
                value: Value::Int {
                    value: *value,
                    ty: *data_type,
                },
            });
            temp
        }
        Expr::Var { name, data_type } => {
            let temp = gen.fresh_temp();
            gen.emit(Instr::DefTemp(temp));
            gen.emit(Instr::AssignTemp {
                temp,
                value: Value::Var {
                    name: name.clone(),
                    ty: *data_type,
                },
            });
            temp
        }
        Expr::ArrayCell {
            array,
            elem_type,
            index,
        } => {
            let index_temp = lower_index(gen, index, *elem_type);
            let temp = gen.fresh_temp();
            gen.emit(Instr::DefTemp(temp));
            gen.emit(Instr::AssignTemp {
                temp,
                value: Value::ArrayCell {
                    array: array.clone(),
                    elem_ty: *elem_type,
                    index: index_temp,
                },
            });
            gen.emit(Instr::FreeTemp(index_temp));
            temp
        }
        Expr::Binary {
            op, left, right, ..
        } => {
            let dest = lower_expr(gen, left);
            let src = lower_expr(gen, right);
            gen.emit(Instr::Op {
                dest,
                op: *op,
                src: Value::Temp(src),
            });
            gen.emit(Instr::FreeTemp(src));
            dest
        }
        Expr::Call { call, .. } => {
            lower_call(gen, call, true).expect("value call always yields a result temp")
        }
    }
}

/// Evaluate an array index and scale it to a byte offset in place.
pub(super) fn lower_index(gen: &mut Gen, index: &Expr, elem_type: DataType) -> TempId {
    let temp = lower_expr(gen, index);
    if elem_type.size_in_bytes() > 1 {
        gen.emit(Instr::Op {
            dest: temp,
            op: BinOp::Mul,
            src: Value::Int {
                value: elem_type.size_in_bytes() as i64,
                ty: DataType::Int32,
            },
        });
    }
    temp
}

/// Lower a call. Live registers are saved across it; arguments go on the
/// stack right to left, each one evaluated, pushed, and released before
/// the next, so a call never holds more than one argument temp at a time.
/// A wanted result is captured into a fresh temporary (returned here,
/// freed by the caller) before the saved registers are restored.
pub(super) fn lower_call(gen: &mut Gen, call: &CallExpr, want_result: bool) -> Option<TempId> {
    gen.emit(Instr::PushState);

    for arg in call.args.iter().rev() {
        let temp = lower_expr(gen, arg);
        gen.emit(Instr::PushParam(temp));
        gen.emit(Instr::FreeTemp(temp));
    }

    gen.emit(Instr::Call {
        name: call.name.clone(),
    });

    let result = if want_result {
        let temp = gen.fresh_temp();
        gen.emit(Instr::DefReturnTemp(temp));
        Some(temp)
    } else {
        None
    };
    gen.emit(Instr::PopState);
    result
}
