//! Recursive-descent parser.
//!
//! Scope resolution happens during the parse, exactly as in the grammar
//! actions this replaces: every identifier in the produced AST already
//! carries its globally-unique internal name and its type, and every
//! call node has passed an arity/type check against the callee's
//! prototype. The first error of any kind aborts the compilation.

use crate::ast::*;
use crate::frontend::lexer::{self, SpannedToken, Token};
use crate::frontend::symbol_table::{
    FunctionInfo, FunctionTable, NameGen, ParamEntry, ScopeError, Scopes, MAX_ARRAY_SIZE,
};
use crate::{CompileError, SemanticErrorKind};

pub fn parse(source: &str) -> Result<Program, CompileError> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(source, tokens).parse_program()
}

/// Per-function parsing state: the scope frames plus what `return` must
/// agree with.
struct FnCtx {
    scopes: Scopes,
    return_type: Option<DataType>,
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<SpannedToken>,
    pos: usize,
    names: NameGen,
    functions: FunctionTable,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<SpannedToken>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            names: NameGen::new(),
            functions: FunctionTable::new(),
        }
    }

    // --- Token cursor ---

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Line number of the token at the cursor (or the last line for EOF).
    fn line(&self) -> usize {
        let offset = self
            .tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|(_, o)| *o)
            .unwrap_or(self.source.len());
        lexer::position_to_line_col(self.source, offset).0
    }

    fn parse_error<T>(&self, message: impl Into<String>) -> Result<T, CompileError> {
        Err(CompileError::Parse {
            line: self.line(),
            message: message.into(),
        })
    }

    fn semantic_error<T>(
        &self,
        kind: SemanticErrorKind,
        message: impl Into<String>,
    ) -> Result<T, CompileError> {
        Err(CompileError::Semantic {
            kind,
            line: self.line(),
            message: message.into(),
        })
    }

    fn scope_error(&self, err: ScopeError) -> CompileError {
        CompileError::Semantic {
            kind: err.kind,
            line: self.line(),
            message: err.message,
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), CompileError> {
        match self.advance() {
            Some(ref tok) if tok == expected => Ok(()),
            Some(tok) => self.parse_error(format!("expected {}, found {}", what, tok)),
            None => self.parse_error(format!("expected {}, found end of input", what)),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, CompileError> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            Some(tok) => self.parse_error(format!("expected {}, found {}", what, tok)),
            None => self.parse_error(format!("expected {}, found end of input", what)),
        }
    }

    // --- Program and functions ---

    fn parse_program(mut self) -> Result<Program, CompileError> {
        let mut functions = Vec::new();
        while self.peek().is_some() {
            functions.push(self.parse_function()?);
        }

        let main = match self.functions.lookup("main") {
            Some(info) => info.internal_name.clone(),
            None => {
                return self.semantic_error(
                    SemanticErrorKind::MissingMain,
                    "program does not define a 'main' function",
                )
            }
        };

        Ok(Program {
            functions,
            main_name: main,
        })
    }

    fn parse_data_type(&mut self) -> Result<DataType, CompileError> {
        match self.advance() {
            Some(Token::Int32Keyword) => Ok(DataType::Int32),
            Some(Token::CharKeyword) => Ok(DataType::Char),
            Some(tok) => self.parse_error(format!("expected a data type, found {}", tok)),
            None => self.parse_error("expected a data type, found end of input"),
        }
    }

    fn parse_function(&mut self) -> Result<Function, CompileError> {
        let return_type = match self.peek() {
            Some(Token::Void) => {
                self.advance();
                None
            }
            _ => Some(self.parse_data_type()?),
        };

        let source_name = self.expect_ident("a function name")?;
        self.expect(&Token::LParen, "'('")?;

        let mut params = Vec::new();
        let mut param_entries: Vec<ParamEntry> = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                let data_type = self.parse_data_type()?;
                let p_source = self.expect_ident("a parameter name")?;
                if param_entries.iter().any(|p| p.source_name == p_source) {
                    return self.semantic_error(
                        SemanticErrorKind::DuplicateDeclaration,
                        format!("parameter '{}' is declared twice", p_source),
                    );
                }
                let internal = self.names.fresh(&p_source);
                params.push(Param {
                    name: internal.clone(),
                    data_type,
                });
                param_entries.push(ParamEntry {
                    source_name: p_source,
                    internal_name: internal,
                    data_type,
                });
                match self.peek() {
                    Some(Token::Comma) => {
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        self.expect(&Token::RParen, "')'")?;

        let prototype = Prototype {
            params,
            return_type,
        };
        let internal_name = self.names.fresh(&source_name);

        // Registered before the body so the prototype is visible inside it
        // (direct recursion works); calls to later functions do not.
        self.functions
            .declare(
                &source_name,
                FunctionInfo {
                    internal_name: internal_name.clone(),
                    prototype: prototype.clone(),
                },
            )
            .map_err(|e| self.scope_error(e))?;

        let mut ctx = FnCtx {
            scopes: Scopes::new(param_entries),
            return_type,
        };

        self.expect(&Token::LBrace, "'{'")?;
        let body = self.parse_stmts_until_rbrace(&mut ctx)?;
        self.expect(&Token::RBrace, "'}'")?;

        Ok(Function {
            name: internal_name,
            source_name,
            prototype,
            body,
            symbols: ctx.scopes.into_symbols(),
        })
    }

    // --- Statements ---

    fn parse_stmts_until_rbrace(&mut self, ctx: &mut FnCtx) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() && self.peek() != Some(&Token::RBrace) {
            if let Some(stmt) = self.parse_stmt(ctx)? {
                stmts.push(stmt);
            }
        }
        Ok(stmts)
    }

    /// A braced block opens (and later closes) one scope frame.
    fn parse_block(&mut self, ctx: &mut FnCtx) -> Result<Vec<Stmt>, CompileError> {
        self.expect(&Token::LBrace, "'{'")?;
        ctx.scopes.push_frame();
        let stmts = self.parse_stmts_until_rbrace(ctx)?;
        ctx.scopes.pop_frame();
        self.expect(&Token::RBrace, "'}'")?;
        Ok(stmts)
    }

    /// Array declarations only register a stack local; they produce no
    /// statement, hence the `Option`.
    fn parse_stmt(&mut self, ctx: &mut FnCtx) -> Result<Option<Stmt>, CompileError> {
        match self.peek() {
            Some(Token::Int32Keyword) | Some(Token::CharKeyword) => self.parse_declaration(ctx),
            Some(Token::If) => self.parse_if(ctx).map(Some),
            Some(Token::While) => self.parse_while(ctx).map(Some),
            Some(Token::Return) => self.parse_return(ctx).map(Some),
            Some(Token::Print) => self.parse_print(ctx).map(Some),
            Some(Token::PrintArray) => self.parse_print_array(ctx).map(Some),
            Some(Token::ReadLine) => self.parse_read_line(ctx).map(Some),
            Some(Token::Exit) => self.parse_exit(ctx).map(Some),
            Some(Token::Ident(_)) => self.parse_assign_or_call(ctx).map(Some),
            Some(tok) => {
                let tok = tok.clone();
                self.parse_error(format!("unexpected token {}", tok))
            }
            None => self.parse_error("unexpected end of input"),
        }
    }

    fn parse_declaration(&mut self, ctx: &mut FnCtx) -> Result<Option<Stmt>, CompileError> {
        let data_type = self.parse_data_type()?;
        let source_name = self.expect_ident("a variable name")?;

        if self.peek() == Some(&Token::LBracket) {
            // Array declaration: `type name[N];`
            self.advance();
            let size = match self.advance() {
                Some(Token::Number(n)) if n >= 0 => n as usize,
                Some(Token::CharValue(c)) => c as usize,
                Some(tok) => {
                    return self
                        .parse_error(format!("expected a constant array size, found {}", tok))
                }
                None => return self.parse_error("expected a constant array size"),
            };
            if size > MAX_ARRAY_SIZE {
                return self.semantic_error(
                    SemanticErrorKind::ArrayTooLarge,
                    format!(
                        "array '{}' of size {} exceeds the maximum of {}",
                        source_name, size, MAX_ARRAY_SIZE
                    ),
                );
            }
            self.expect(&Token::RBracket, "']'")?;
            self.expect(&Token::Semicolon, "';'")?;

            ctx.scopes
                .declare_array(&source_name, data_type, size, &mut self.names)
                .map_err(|e| self.scope_error(e))?;

            return Ok(None);
        }

        // Scalar declaration, with an implicit `= 0` when no initializer
        // is given. The initializer is resolved *before* the new name is
        // declared, so `int_32 x = x + 1;` reads the outer `x`.
        let init = if self.peek() == Some(&Token::Assign) {
            self.advance();
            self.parse_expr(ctx)?
        } else {
            Expr::Int {
                value: 0,
                data_type,
            }
        };
        self.expect(&Token::Semicolon, "';'")?;

        let internal = ctx
            .scopes
            .declare_var(&source_name, data_type, &mut self.names)
            .map_err(|e| self.scope_error(e))?;

        Ok(Some(Stmt::Declare {
            name: internal,
            data_type,
            init,
        }))
    }

    fn parse_assign_or_call(&mut self, ctx: &mut FnCtx) -> Result<Stmt, CompileError> {
        if self.peek_at(1) == Some(&Token::LParen) {
            let call = self.parse_call(ctx)?;
            self.expect(&Token::Semicolon, "';'")?;
            return Ok(Stmt::Call(call));
        }

        let source_name = self.expect_ident("a variable name")?;
        let dest = if self.peek() == Some(&Token::LBracket) {
            let entry = ctx
                .scopes
                .resolve_array(&source_name)
                .map_err(|e| self.scope_error(e))?;
            self.advance();
            let index = self.parse_expr(ctx)?;
            self.expect(&Token::RBracket, "']'")?;
            Place::ArrayCell {
                array: entry.internal_name,
                elem_type: entry.elem_type,
                index,
            }
        } else {
            let entry = ctx
                .scopes
                .resolve_var(&source_name)
                .map_err(|e| self.scope_error(e))?;
            Place::Var {
                name: entry.internal_name,
                data_type: entry.data_type,
            }
        };

        self.expect(&Token::Assign, "'='")?;
        let value = self.parse_expr(ctx)?;
        self.expect(&Token::Semicolon, "';'")?;

        Ok(Stmt::Assign { dest, value })
    }

    fn parse_if(&mut self, ctx: &mut FnCtx) -> Result<Stmt, CompileError> {
        self.expect(&Token::If, "'if'")?;
        self.expect(&Token::LParen, "'('")?;
        let cond = self.parse_cond(ctx)?;
        self.expect(&Token::RParen, "')'")?;
        let then_body = self.parse_block(ctx)?;
        let else_body = if self.peek() == Some(&Token::Else) {
            self.advance();
            Some(self.parse_block(ctx)?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self, ctx: &mut FnCtx) -> Result<Stmt, CompileError> {
        self.expect(&Token::While, "'while'")?;
        self.expect(&Token::LParen, "'('")?;
        let cond = self.parse_cond(ctx)?;
        self.expect(&Token::RParen, "')'")?;
        let body = self.parse_block(ctx)?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_return(&mut self, ctx: &mut FnCtx) -> Result<Stmt, CompileError> {
        self.expect(&Token::Return, "'return'")?;
        if self.peek() == Some(&Token::Semicolon) {
            self.advance();
            if ctx.return_type.is_some() {
                return self.semantic_error(
                    SemanticErrorKind::ValueTypeMismatch,
                    "non-void function returns without a value",
                );
            }
            return Ok(Stmt::Return { value: None });
        }

        let value = self.parse_expr(ctx)?;
        self.expect(&Token::Semicolon, "';'")?;
        match ctx.return_type {
            Some(_) => Ok(Stmt::Return { value: Some(value) }),
            None => self.semantic_error(
                SemanticErrorKind::ValueTypeMismatch,
                "void function returns a value",
            ),
        }
    }

    fn parse_print(&mut self, ctx: &mut FnCtx) -> Result<Stmt, CompileError> {
        self.expect(&Token::Print, "'@print'")?;
        if let Some(Token::String(_)) = self.peek() {
            let text = match self.advance() {
                Some(Token::String(s)) => s,
                _ => unreachable!(),
            };
            self.expect(&Token::Semicolon, "';'")?;
            return Ok(Stmt::PrintString(text));
        }

        let value = self.parse_expr(ctx)?;
        self.expect(&Token::Semicolon, "';'")?;
        Ok(Stmt::Print {
            format: value.data_type().print_format(),
            value,
        })
    }

    fn parse_print_array(&mut self, ctx: &mut FnCtx) -> Result<Stmt, CompileError> {
        self.expect(&Token::PrintArray, "'@print_array'")?;
        let source_name = self.expect_ident("an array name")?;
        let entry = ctx
            .scopes
            .resolve_array(&source_name)
            .map_err(|e| self.scope_error(e))?;
        self.expect(&Token::Semicolon, "';'")?;
        Ok(Stmt::PrintArray {
            array: entry.internal_name,
        })
    }

    fn parse_read_line(&mut self, ctx: &mut FnCtx) -> Result<Stmt, CompileError> {
        self.expect(&Token::ReadLine, "'@read_line'")?;
        let source_name = self.expect_ident("an array name")?;
        let entry = ctx
            .scopes
            .resolve_array(&source_name)
            .map_err(|e| self.scope_error(e))?;
        self.expect(&Token::Comma, "','")?;
        let max_chars = match self.advance() {
            Some(Token::Number(n)) => n,
            Some(tok) => {
                return self.parse_error(format!("expected a character count, found {}", tok))
            }
            None => return self.parse_error("expected a character count"),
        };
        self.expect(&Token::Semicolon, "';'")?;
        Ok(Stmt::ReadLine {
            array: entry.internal_name,
            max_chars,
        })
    }

    fn parse_exit(&mut self, ctx: &mut FnCtx) -> Result<Stmt, CompileError> {
        self.expect(&Token::Exit, "'@exit'")?;
        let code = self.parse_expr(ctx)?;
        self.expect(&Token::Semicolon, "';'")?;
        Ok(Stmt::Exit { code })
    }

    // --- Conditions ---

    /// `cond := simple (('&&' | '||') simple)*`, left-associative.
    fn parse_cond(&mut self, ctx: &mut FnCtx) -> Result<Cond, CompileError> {
        let mut cond = self.parse_simple_cond(ctx)?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.advance();
                    let rhs = self.parse_simple_cond(ctx)?;
                    cond = Cond::And(Box::new(cond), Box::new(rhs));
                }
                Some(Token::Or) => {
                    self.advance();
                    let rhs = self.parse_simple_cond(ctx)?;
                    cond = Cond::Or(Box::new(cond), Box::new(rhs));
                }
                _ => return Ok(cond),
            }
        }
    }

    /// Either a parenthesized condition or a single comparison. A leading
    /// `(` is ambiguous (it may open a grouped condition or a grouped
    /// arithmetic operand), so the grouped-condition reading is tried first
    /// and rolled back when its shape does not fit. Only parse failures
    /// trigger the rollback: a semantic error names a real fault in the
    /// source and would resurface garbled under the expression reading.
    fn parse_simple_cond(&mut self, ctx: &mut FnCtx) -> Result<Cond, CompileError> {
        if self.peek() == Some(&Token::LParen) {
            let start = self.pos;
            self.advance();
            match self.parse_cond(ctx) {
                Ok(cond) if self.peek() == Some(&Token::RParen) => {
                    self.advance();
                    return Ok(cond);
                }
                Ok(_) | Err(CompileError::Parse { .. }) => {
                    self.pos = start;
                }
                Err(err) => return Err(err),
            }
        }

        let left = self.parse_expr(ctx)?;
        let op = match self.advance() {
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Neq) => CmpOp::Ne,
            Some(tok) => {
                return self.parse_error(format!("expected a comparison operator, found {}", tok))
            }
            None => return self.parse_error("expected a comparison operator"),
        };
        let right = self.parse_expr(ctx)?;
        Ok(Cond::Cmp { left, op, right })
    }

    // --- Expressions ---

    /// `expr := term (('+' | '-') term)*`
    fn parse_expr(&mut self, ctx: &mut FnCtx) -> Result<Expr, CompileError> {
        let mut left = self.parse_term(ctx)?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term(ctx)?;
            let data_type = left.data_type();
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                data_type,
            };
        }
    }

    /// `term := factor (('*' | '/' | '%') factor)*`
    fn parse_term(&mut self, ctx: &mut FnCtx) -> Result<Expr, CompileError> {
        let mut left = self.parse_factor(ctx)?;
        loop {
            let op = match self.peek() {
                Some(Token::Mul) => BinOp::Mul,
                Some(Token::Div) => BinOp::Div,
                Some(Token::Mod) => BinOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_factor(ctx)?;
            let data_type = left.data_type();
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                data_type,
            };
        }
    }

    fn parse_factor(&mut self, ctx: &mut FnCtx) -> Result<Expr, CompileError> {
        match self.peek() {
            Some(Token::Number(_)) => {
                let value = match self.advance() {
                    Some(Token::Number(n)) => n,
                    _ => unreachable!(),
                };
                Ok(Expr::Int {
                    value,
                    data_type: DataType::Int32,
                })
            }
            Some(Token::CharValue(_)) => {
                let value = match self.advance() {
                    Some(Token::CharValue(c)) => c,
                    _ => unreachable!(),
                };
                Ok(Expr::Int {
                    value,
                    data_type: DataType::Char,
                })
            }
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr(ctx)?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Ident(_)) => {
                if self.peek_at(1) == Some(&Token::LParen) {
                    let call = self.parse_call(ctx)?;
                    let data_type = match self
                        .functions
                        .lookup(&call.source_name)
                        .and_then(|info| info.prototype.return_type)
                    {
                        Some(ty) => ty,
                        None => {
                            return self.semantic_error(
                                SemanticErrorKind::VoidValueUsed,
                                format!(
                                    "void function '{}' used where a value is required",
                                    call.source_name
                                ),
                            )
                        }
                    };
                    return Ok(Expr::Call { call, data_type });
                }

                let source_name = self.expect_ident("a variable name")?;
                if self.peek() == Some(&Token::LBracket) {
                    let entry = ctx
                        .scopes
                        .resolve_array(&source_name)
                        .map_err(|e| self.scope_error(e))?;
                    self.advance();
                    let index = self.parse_expr(ctx)?;
                    self.expect(&Token::RBracket, "']'")?;
                    Ok(Expr::ArrayCell {
                        array: entry.internal_name,
                        elem_type: entry.elem_type,
                        index: Box::new(index),
                    })
                } else {
                    let entry = ctx
                        .scopes
                        .resolve_var(&source_name)
                        .map_err(|e| self.scope_error(e))?;
                    Ok(Expr::Var {
                        name: entry.internal_name,
                        data_type: entry.data_type,
                    })
                }
            }
            Some(tok) => {
                let tok = tok.clone();
                self.parse_error(format!("expected a value, found {}", tok))
            }
            None => self.parse_error("expected a value, found end of input"),
        }
    }

    /// Parse `name(args)` and check it against the callee's prototype.
    /// The check runs before the call node is built, so no ill-typed call
    /// ever reaches the lowering pass.
    fn parse_call(&mut self, ctx: &mut FnCtx) -> Result<CallExpr, CompileError> {
        let source_name = self.expect_ident("a function name")?;
        let info = match self.functions.lookup(&source_name) {
            Some(info) => info.clone(),
            None => {
                return self.semantic_error(
                    SemanticErrorKind::UndefinedFunction,
                    format!("function '{}' is not defined", source_name),
                )
            }
        };

        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_expr(ctx)?);
                match self.peek() {
                    Some(Token::Comma) => {
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        self.expect(&Token::RParen, "')'")?;

        if args.len() != info.prototype.params.len() {
            return self.semantic_error(
                SemanticErrorKind::ArgumentCountMismatch,
                format!(
                    "'{}' takes {} argument(s), {} given",
                    source_name,
                    info.prototype.params.len(),
                    args.len()
                ),
            );
        }
        for (arg, param) in args.iter().zip(&info.prototype.params) {
            if arg.data_type() != param.data_type {
                return self.semantic_error(
                    SemanticErrorKind::ArgumentTypeMismatch,
                    format!(
                        "'{}' expects {} for parameter '{}', got {}",
                        source_name,
                        param.data_type,
                        param.name,
                        arg.data_type()
                    ),
                );
            }
        }

        Ok(CallExpr {
            name: info.internal_name,
            source_name,
            args,
        })
    }
}
