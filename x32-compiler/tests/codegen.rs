//! Properties of the emitted assembly text.

use x32_compiler::ast::{FunctionSymbols, Prototype};
use x32_compiler::backend::x86::compile_ir_to_x86;
use x32_compiler::compile_to_x86;
use x32_compiler::ir::{BasicBlock, FunctionIr, Instr, ProgramIr, TempId};
use x32_compiler::CompileError;

fn compile(source: &str) -> String {
    compile_to_x86(source).expect("program should compile")
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn output_has_the_module_skeleton() {
    let asm = compile("void main() { }");
    assert!(asm.contains(".model flat, stdcall"));
    assert!(asm.contains("include \\masm32\\include\\masm32rt.inc"));
    assert!(asm.contains("start:"));
    assert!(asm.contains("invoke ExitProcess, 0"));
    assert!(asm.trim_end().ends_with("end start"));

    // The entry stub calls main by its internal name.
    let main_line = asm
        .lines()
        .find(|l| l.trim().starts_with("call main_"))
        .expect("start stub calls main");
    assert!(main_line.contains("call main_"));
}

#[test]
fn every_proc_is_closed() {
    let asm = compile("void f() { } void main() { f(); }");
    assert_eq!(count(&asm, " proc"), count(&asm, " endp"));
    assert_eq!(count(&asm, " proc"), 2);
}

#[test]
fn scalars_become_sized_locals() {
    let asm = compile("void main() { int_32 x = 5; char c = 'a'; }");
    let locals: Vec<&str> = asm
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("LOCAL"))
        .collect();
    assert!(locals.iter().any(|l| l.starts_with("LOCAL x_") && l.ends_with(":DWORD")));
    assert!(locals.iter().any(|l| l.starts_with("LOCAL c_") && l.ends_with(":BYTE")));
}

#[test]
fn arrays_become_dimensioned_locals() {
    let asm = compile("void main() { char buf[16]; @read_line buf, 15; }");
    assert!(asm
        .lines()
        .map(str::trim)
        .any(|l| l.starts_with("LOCAL buf_") && l.contains("[16]:BYTE")));
    assert!(asm.contains("invoke StdIn, ADDR buf_"));
}

#[test]
fn char_stores_go_through_the_low_byte() {
    let asm = compile("void main() { char c = 'a'; }");
    let store = asm
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("mov BYTE PTR c_"))
        .expect("char store is byte wide");
    // Low-byte register name, not the 32-bit one.
    assert!(store.ends_with("l"), "store was: {}", store);
}

#[test]
fn char_loads_clear_the_register_first() {
    let asm = compile("void main() { char c = 'a'; @print c; }");
    let lines: Vec<&str> = asm.lines().map(str::trim).collect();
    let load = lines
        .iter()
        .position(|l| l.starts_with("mov") && l.contains("BYTE PTR c_") && !l.starts_with("mov BYTE"))
        .expect("char load exists");
    assert!(lines[load - 1].starts_with("xor"), "no xor before: {}", lines[load]);
}

#[test]
fn print_formats_follow_the_value_type() {
    let asm = compile("void main() { int_32 x = 1; char c = 'a'; @print x; @print c; }");
    assert!(asm.contains("printf(\"%d\\n\","));
    assert!(asm.contains("printf(\"%c\\n\","));
}

#[test]
fn print_array_prints_as_string() {
    let asm = compile("void main() { char s[8]; @print_array s; }");
    assert!(asm.contains("printf(\"%s\\n\", ADDR s_"));
}

#[test]
fn division_spills_and_restores_the_scratch_registers() {
    let asm = compile("void main() { int_32 x = 7; @print x / 2; }");
    assert_eq!(count(&asm, "idiv ecx"), 1);
    assert_eq!(count(&asm, "cdq"), 1);

    // One save and one restore for each of eax, ecx, edx.
    assert_eq!(count(&asm, "mov div_temp_1, eax"), 1);
    assert_eq!(count(&asm, "mov div_temp_2, ecx"), 1);
    assert_eq!(count(&asm, "mov div_temp_3, edx"), 1);
    assert_eq!(count(&asm, "mov eax, div_temp_1"), 1);
    assert_eq!(count(&asm, "mov ecx, div_temp_2"), 1);
    assert_eq!(count(&asm, "mov edx, div_temp_3"), 1);

    // Division takes its result from eax.
    assert!(asm.contains("mov div_temp_res, eax"));
    assert!(asm.contains("LOCAL div_temp_res:DWORD"));
}

#[test]
fn modulo_takes_its_result_from_edx() {
    let asm = compile("void main() { int_32 x = 7; @print x % 2; }");
    let lines: Vec<&str> = asm.lines().map(str::trim).collect();
    let idiv = lines.iter().position(|l| *l == "idiv ecx").unwrap();
    assert_eq!(lines[idiv + 1], "mov div_temp_res, edx");
}

#[test]
fn division_locals_only_appear_when_needed() {
    let asm = compile("void main() { int_32 x = 1 + 2; }");
    assert!(!asm.contains("div_temp"));
}

#[test]
fn exit_sums_then_leaves() {
    let asm = compile("void main() { @exit 2 + 3; }");
    let lines: Vec<&str> = asm.lines().map(str::trim).collect();
    let add = lines
        .iter()
        .position(|l| l.starts_with("add "))
        .expect("sum is computed");
    let exit = lines
        .iter()
        .position(|l| l.starts_with("invoke ExitProcess, e"))
        .expect("exit takes a register");
    assert!(add < exit);
}

#[test]
fn live_registers_are_saved_across_a_call() {
    // The left operand of `1 + f()` is live when the call happens, so
    // exactly its register is pushed before the call; the result is
    // captured out of eax before that register comes back.
    let source = r#"
        int_32 f() { return 2; }
        void main() { @print 1 + f(); }
    "#;
    let asm = compile(source);
    let lines: Vec<&str> = asm.lines().map(str::trim).collect();
    let call = lines
        .iter()
        .position(|l| l.starts_with("call f_"))
        .expect("call emitted");
    assert!(lines[call - 1].starts_with("push "));
    assert!(lines[call + 1].starts_with("mov ") && lines[call + 1].ends_with(", eax"));
    assert!(lines[call + 2].starts_with("pop "));

    // Saved and restored register names match.
    let pushed = lines[call - 1].trim_start_matches("push ");
    let popped = lines[call + 2].trim_start_matches("pop ");
    assert_eq!(pushed, popped);
}

#[test]
fn call_results_survive_the_register_restores() {
    let source = r#"
        int_32 f() { return 100; }
        void main() { @exit 1 + (2 + f()); }
    "#;
    let asm = compile(source);
    let lines: Vec<&str> = asm.lines().map(str::trim).collect();
    let call = lines
        .iter()
        .position(|l| l.starts_with("call f_"))
        .expect("call emitted");

    // The result leaves eax before any saved register is popped back.
    let capture = lines[call + 1];
    assert!(
        capture.starts_with("mov ") && capture.ends_with(", eax"),
        "no capture after call: {}",
        capture
    );
    let result_reg = capture
        .trim_start_matches("mov ")
        .trim_end_matches(", eax");

    let mut restores = 0;
    let mut i = call + 2;
    while lines[i].starts_with("pop ") {
        assert_ne!(
            lines[i],
            format!("pop {}", result_reg),
            "restore clobbers the call result"
        );
        restores += 1;
        i += 1;
    }
    assert_eq!(restores, 2);
}

#[test]
fn five_argument_calls_fit_in_the_pool() {
    let source = r#"
        int_32 f(int_32 a, int_32 b, int_32 c, int_32 d, int_32 e) {
            return a + e;
        }
        void main() {
            @print f(1, 2, 3, 4, 5);
        }
    "#;
    let asm = compile(source);
    let pushes = asm
        .lines()
        .map(str::trim)
        .skip_while(|l| !l.starts_with("main_"))
        .filter(|l| l.starts_with("push "))
        .count();
    assert_eq!(pushes, 5);
}

#[test]
fn call_with_no_register_for_its_result_is_reported() {
    // All four registers hold live operands across the call, so there is
    // nowhere to capture the result: a diagnostic, never silent
    // corruption.
    let source = r#"
        int_32 f() { return 100; }
        void main() { @exit 1 + (2 + (3 + (4 + f()))); }
    "#;
    assert!(matches!(
        compile_to_x86(source),
        Err(CompileError::Internal(_))
    ));
}

#[test]
fn return_value_lands_in_eax() {
    let asm = compile("int_32 f() { int_32 x = 3; return x; } void main() { @print f(); }");
    let lines: Vec<&str> = asm.lines().map(str::trim).collect();
    let ret = lines.iter().position(|l| *l == "ret").unwrap();
    assert!(lines[ret - 1].starts_with("mov eax,"));
}

#[test]
fn branch_compares_and_jumps_both_ways() {
    let asm = compile(
        r#"
        void main() {
            int_32 x = 1;
            if (x == 2) {
                @print x;
            }
        }
    "#,
    );
    let lines: Vec<&str> = asm.lines().map(str::trim).collect();
    let cmp = lines.iter().position(|l| l.starts_with("cmp ")).unwrap();
    assert!(lines[cmp + 1].starts_with("je L"));
    assert!(lines[cmp + 2].starts_with("jmp L"));
}

#[test]
fn comparison_operators_map_to_their_jumps() {
    for (op, jump) in [("<", "jl "), (">", "jg "), ("==", "je "), ("!=", "jne ")] {
        let source = format!(
            "void main() {{ int_32 x = 1; if (x {} 2) {{ @print x; }} }}",
            op
        );
        let asm = compile(&source);
        assert!(asm.contains(jump), "{} should lower to {}", op, jump.trim());
    }
}

#[test]
fn too_many_live_temps_is_an_internal_error() {
    // Each right-nested operand stays live while the next is evaluated,
    // so five live values exceed the four-register pool.
    let err = compile_to_x86("void main() { @exit 1 + (2 + (3 + (4 + 5))); }")
        .expect_err("five live temps cannot be allocated");
    assert!(matches!(err, CompileError::Internal(_)));

    // One level less fits exactly.
    assert!(compile_to_x86("void main() { @exit 1 + (2 + (3 + 4)); }").is_ok());
}

#[test]
fn register_exhaustion_reports_instead_of_panicking() {
    let blocks = vec![BasicBlock {
        label: "L0".to_string(),
        statements: (0..5)
            .map(|i| Instr::DefTemp(TempId(i)))
            .chain([Instr::Return { value: None }])
            .collect(),
        terminator: None,
    }];
    let ir = ProgramIr {
        functions: vec![FunctionIr {
            name: "f_0".to_string(),
            prototype: Prototype {
                params: Vec::new(),
                return_type: None,
            },
            symbols: FunctionSymbols::default(),
            blocks,
        }],
        main_name: "f_0".to_string(),
    };
    assert!(matches!(
        compile_ir_to_x86(&ir),
        Err(CompileError::Internal(_))
    ));
}

#[test]
fn string_literal_prints_directly() {
    let asm = compile("void main() { @print \"hello\"; }");
    assert!(asm.contains("printf(\"hello\\n\")"));
}
