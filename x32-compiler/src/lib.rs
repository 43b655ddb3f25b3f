pub mod ast;
pub mod backend;
pub mod frontend;
pub mod ir;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lexical(#[from] frontend::lexer::LexicalError),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("SemanticError:{kind} (line {line}) - {message}")]
    Semantic {
        kind: SemanticErrorKind,
        line: usize,
        message: String,
    },

    /// A compiler-invariant violation: unlabeled basic block, empty register
    /// pool, unmapped operand width. Always a bug or a capacity limit, never
    /// a user error.
    #[error("Compiler internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    DuplicateDeclaration,
    UndeclaredIdentifier,
    NotAnArray,
    NotAScalar,
    DuplicateFunction,
    UndefinedFunction,
    ArgumentCountMismatch,
    ArgumentTypeMismatch,
    ValueTypeMismatch,
    ArrayTooLarge,
    MissingMain,
    VoidValueUsed,
}

impl std::fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SemanticErrorKind::DuplicateDeclaration => "DuplicateDeclaration",
            SemanticErrorKind::UndeclaredIdentifier => "UndeclaredIdentifier",
            SemanticErrorKind::NotAnArray => "NotAnArray",
            SemanticErrorKind::NotAScalar => "NotAScalar",
            SemanticErrorKind::DuplicateFunction => "DuplicateFunction",
            SemanticErrorKind::UndefinedFunction => "UndefinedFunction",
            SemanticErrorKind::ArgumentCountMismatch => "ArgumentCountMismatch",
            SemanticErrorKind::ArgumentTypeMismatch => "ArgumentTypeMismatch",
            SemanticErrorKind::ValueTypeMismatch => "ValueTypeMismatch",
            SemanticErrorKind::ArrayTooLarge => "ArrayTooLarge",
            SemanticErrorKind::MissingMain => "MissingMain",
            SemanticErrorKind::VoidValueUsed => "VoidValueUsed",
        };
        f.write_str(s)
    }
}

/// Parse source text into a scope-resolved, type-checked AST.
pub fn compile_to_ast(source: &str) -> Result<ast::Program, CompileError> {
    frontend::parser::parse(source)
}

/// Parse and lower to the basic-block IR.
pub fn compile_to_ir(source: &str) -> Result<ir::ProgramIr, CompileError> {
    let program = compile_to_ast(source)?;
    Ok(ir::ir_generator::lower(&program))
}

/// Compile source text all the way to x86 assembly text.
pub fn compile_to_x86(source: &str) -> Result<String, CompileError> {
    let ir = compile_to_ir(source)?;
    backend::x86::compile_ir_to_x86(&ir)
}
