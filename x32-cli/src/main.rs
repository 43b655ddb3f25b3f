use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

#[derive(Parser, Debug)]
#[command(
    name = "x32c",
    about = "Compile source files to 32-bit x86 (MASM) assembly"
)]
struct Args {
    /// Source file to compile
    file: PathBuf,

    /// Dump the parsed AST instead of compiling
    #[arg(long)]
    ast: bool,

    /// Dump the intermediate representation instead of compiling
    #[arg(long)]
    ir: bool,

    /// Output path for the generated assembly (defaults to the input
    /// path with an .asm extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Assemble and link the output with ml (requires MASM32 installed)
    #[arg(long)]
    assemble: bool,
}

fn main() {
    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {}", args.file.display(), err);
            exit(1);
        }
    };

    if args.ast {
        match x32_compiler::compile_to_ast(&source) {
            Ok(program) => println!("{:#?}", program),
            Err(err) => {
                eprintln!("{}", err);
                exit(1);
            }
        }
        return;
    }

    if args.ir {
        match x32_compiler::compile_to_ir(&source) {
            Ok(ir) => {
                for line in ir.to_lines() {
                    println!("{}", line);
                }
            }
            Err(err) => {
                eprintln!("{}", err);
                exit(1);
            }
        }
        return;
    }

    let asm = match x32_compiler::compile_to_x86(&source) {
        Ok(asm) => asm,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    let output = args
        .output
        .unwrap_or_else(|| args.file.with_extension("asm"));
    if let Err(err) = std::fs::write(&output, asm) {
        eprintln!("error: cannot write {}: {}", output.display(), err);
        exit(1);
    }
    println!("wrote {}", output.display());

    if args.assemble {
        if let Err(err) = assemble(&output) {
            eprintln!("{}", err);
            exit(1);
        }
    }
}

/// Run the MASM32 assembler and linker over the generated file.
fn assemble(asm_path: &Path) -> Result<(), String> {
    let status = Command::new("ml")
        .arg("/c")
        .arg("/coff")
        .arg(asm_path)
        .status()
        .map_err(|err| format!("error: cannot run ml: {}", err))?;
    if !status.success() {
        return Err("error: ml failed".to_string());
    }

    let obj = asm_path.with_extension("obj");
    let status = Command::new("link")
        .arg("/subsystem:console")
        .arg(&obj)
        .status()
        .map_err(|err| format!("error: cannot run link: {}", err))?;
    if !status.success() {
        return Err("error: link failed".to_string());
    }
    Ok(())
}
