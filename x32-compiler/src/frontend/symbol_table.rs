//! Scope frames and the function table.
//!
//! One `Scopes` instance lives for the duration of a single function's
//! parse. Frames are pushed on `{` and popped on `}`, but every frame is
//! retained so the IR symbol table (and the backend's LOCAL declarations)
//! can be built after the parse finishes.

use crate::ast::{DataType, FunctionSymbols, Prototype};
use crate::SemanticErrorKind;
use std::collections::HashMap;

/// Largest allowed compile-time array length.
pub const MAX_ARRAY_SIZE: usize = 1024;

/// A declaration-level failure; the parser attaches the source line.
#[derive(Debug)]
pub struct ScopeError {
    pub kind: SemanticErrorKind,
    pub message: String,
}

impl ScopeError {
    fn new(kind: SemanticErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

/// Generator of globally-unique internal names. One instance is owned by
/// the parser for the whole program, so no two declarations anywhere can
/// collide.
#[derive(Debug, Default)]
pub struct NameGen {
    count: usize,
}

impl NameGen {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    pub fn fresh(&mut self, source_name: &str) -> String {
        let name = format!("{}_{}", source_name, self.count);
        self.count += 1;
        name
    }
}

#[derive(Debug, Clone)]
pub struct VarEntry {
    pub internal_name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone)]
pub struct ArrayEntry {
    pub internal_name: String,
    pub elem_type: DataType,
    pub size: usize,
}

/// A function parameter as seen by name resolution.
#[derive(Debug, Clone)]
pub struct ParamEntry {
    pub source_name: String,
    pub internal_name: String,
    pub data_type: DataType,
}

/// One lexical block's declarations. Scalars and arrays share the
/// namespace for shadow detection but are looked up through parallel
/// tables.
#[derive(Debug, Default)]
struct Frame {
    vars: HashMap<String, VarEntry>,
    arrays: HashMap<String, ArrayEntry>,
}

impl Frame {
    fn declares(&self, source_name: &str) -> bool {
        self.vars.contains_key(source_name) || self.arrays.contains_key(source_name)
    }
}

/// The scope-frame stack for one function under compilation.
pub struct Scopes {
    /// Every frame ever created, in creation order; popped frames stay here.
    frames: Vec<Frame>,
    /// Indices into `frames` forming the live stack, innermost last.
    stack: Vec<usize>,
    /// Fallback resolution target when no frame declares a name.
    params: Vec<ParamEntry>,
}

impl Scopes {
    /// A function starts with one root frame already pushed.
    pub fn new(params: Vec<ParamEntry>) -> Self {
        Self {
            frames: vec![Frame::default()],
            stack: vec![0],
            params,
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
        self.stack.push(self.frames.len() - 1);
    }

    pub fn pop_frame(&mut self) {
        self.stack.pop();
    }

    fn current(&mut self) -> &mut Frame {
        let idx = *self.stack.last().expect("scope stack is never empty");
        &mut self.frames[idx]
    }

    fn shadow_check(&mut self, source_name: &str) -> Result<(), ScopeError> {
        if self.current().declares(source_name) {
            return Err(ScopeError::new(
                SemanticErrorKind::DuplicateDeclaration,
                format!("'{}' is already declared in this scope", source_name),
            ));
        }
        Ok(())
    }

    /// Declare a scalar in the innermost frame. Shadowing an outer frame's
    /// name is legal and produces a fresh internal name.
    pub fn declare_var(
        &mut self,
        source_name: &str,
        data_type: DataType,
        names: &mut NameGen,
    ) -> Result<String, ScopeError> {
        self.shadow_check(source_name)?;
        let internal_name = names.fresh(source_name);
        self.current().vars.insert(
            source_name.to_string(),
            VarEntry {
                internal_name: internal_name.clone(),
                data_type,
            },
        );
        Ok(internal_name)
    }

    pub fn declare_array(
        &mut self,
        source_name: &str,
        elem_type: DataType,
        size: usize,
        names: &mut NameGen,
    ) -> Result<String, ScopeError> {
        self.shadow_check(source_name)?;
        let internal_name = names.fresh(source_name);
        self.current().arrays.insert(
            source_name.to_string(),
            ArrayEntry {
                internal_name: internal_name.clone(),
                elem_type,
                size,
            },
        );
        Ok(internal_name)
    }

    /// Resolve a scalar reference, walking innermost to outermost, then the
    /// parameter list. A name whose innermost declaration is an array is a
    /// distinct error from one that is not declared at all.
    pub fn resolve_var(&self, source_name: &str) -> Result<VarEntry, ScopeError> {
        for &idx in self.stack.iter().rev() {
            let frame = &self.frames[idx];
            if let Some(entry) = frame.vars.get(source_name) {
                return Ok(entry.clone());
            }
            if frame.arrays.contains_key(source_name) {
                return Err(ScopeError::new(
                    SemanticErrorKind::NotAScalar,
                    format!("'{}' is an array, not a variable", source_name),
                ));
            }
        }
        if let Some(p) = self.params.iter().find(|p| p.source_name == source_name) {
            return Ok(VarEntry {
                internal_name: p.internal_name.clone(),
                data_type: p.data_type,
            });
        }
        Err(ScopeError::new(
            SemanticErrorKind::UndeclaredIdentifier,
            format!("'{}' does not exist in the current scope", source_name),
        ))
    }

    pub fn resolve_array(&self, source_name: &str) -> Result<ArrayEntry, ScopeError> {
        for &idx in self.stack.iter().rev() {
            let frame = &self.frames[idx];
            if let Some(entry) = frame.arrays.get(source_name) {
                return Ok(entry.clone());
            }
            if frame.vars.contains_key(source_name) {
                return Err(ScopeError::new(
                    SemanticErrorKind::NotAnArray,
                    format!("'{}' is a variable, not an array", source_name),
                ));
            }
        }
        if self.params.iter().any(|p| p.source_name == source_name) {
            return Err(ScopeError::new(
                SemanticErrorKind::NotAnArray,
                format!("'{}' is a parameter, not an array", source_name),
            ));
        }
        Err(ScopeError::new(
            SemanticErrorKind::UndeclaredIdentifier,
            format!("array '{}' does not exist in the current scope", source_name),
        ))
    }

    /// Flatten every retained frame's declarations for the IR symbol table.
    pub fn into_symbols(self) -> FunctionSymbols {
        let mut symbols = FunctionSymbols::default();
        for frame in self.frames {
            for entry in frame.vars.into_values() {
                symbols.vars.push((entry.internal_name, entry.data_type));
            }
            for entry in frame.arrays.into_values() {
                symbols
                    .arrays
                    .push((entry.internal_name, entry.elem_type, entry.size));
            }
        }
        // HashMap iteration order is arbitrary; keep LOCAL declarations
        // stable across runs.
        symbols.vars.sort();
        symbols.arrays.sort();
        symbols
    }
}

/// Global table of parsed function definitions.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub internal_name: String,
    pub prototype: Prototype,
}

#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: HashMap<String, FunctionInfo>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(
        &mut self,
        source_name: &str,
        info: FunctionInfo,
    ) -> Result<(), ScopeError> {
        if self.functions.contains_key(source_name) {
            return Err(ScopeError::new(
                SemanticErrorKind::DuplicateFunction,
                format!("function '{}' is already defined", source_name),
            ));
        }
        self.functions.insert(source_name.to_string(), info);
        Ok(())
    }

    pub fn lookup(&self, source_name: &str) -> Option<&FunctionInfo> {
        self.functions.get(source_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_produces_distinct_internal_names() {
        let mut names = NameGen::new();
        let mut scopes = Scopes::new(Vec::new());

        let outer = scopes
            .declare_var("x", DataType::Int32, &mut names)
            .unwrap();
        scopes.push_frame();
        let inner = scopes
            .declare_var("x", DataType::Char, &mut names)
            .unwrap();

        assert_ne!(outer, inner);
        assert_eq!(scopes.resolve_var("x").unwrap().internal_name, inner);

        scopes.pop_frame();
        assert_eq!(scopes.resolve_var("x").unwrap().internal_name, outer);
    }

    #[test]
    fn outer_name_visible_before_inner_declaration() {
        let mut names = NameGen::new();
        let mut scopes = Scopes::new(Vec::new());

        let outer = scopes
            .declare_var("x", DataType::Int32, &mut names)
            .unwrap();
        scopes.push_frame();
        // Inside the nested block but before its own declaration of `x`.
        assert_eq!(scopes.resolve_var("x").unwrap().internal_name, outer);
    }

    #[test]
    fn redeclaration_in_same_frame_fails() {
        let mut names = NameGen::new();
        let mut scopes = Scopes::new(Vec::new());

        scopes
            .declare_var("x", DataType::Int32, &mut names)
            .unwrap();
        let err = scopes
            .declare_var("x", DataType::Int32, &mut names)
            .unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::DuplicateDeclaration);
    }

    #[test]
    fn scalar_looked_up_as_array_is_distinct_from_undeclared() {
        let mut names = NameGen::new();
        let mut scopes = Scopes::new(Vec::new());

        scopes
            .declare_var("x", DataType::Int32, &mut names)
            .unwrap();

        let err = scopes.resolve_array("x").unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::NotAnArray);

        let err = scopes.resolve_array("y").unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::UndeclaredIdentifier);
    }

    #[test]
    fn flattened_symbols_are_sorted_for_stable_output() {
        let mut names = NameGen::new();
        let mut scopes = Scopes::new(Vec::new());

        scopes
            .declare_var("z", DataType::Int32, &mut names)
            .unwrap();
        scopes.declare_var("a", DataType::Char, &mut names).unwrap();
        scopes
            .declare_array("m", DataType::Int32, 8, &mut names)
            .unwrap();

        let symbols = scopes.into_symbols();
        assert_eq!(symbols.vars[0], ("a_1".to_string(), DataType::Char));
        assert_eq!(symbols.vars[1], ("z_0".to_string(), DataType::Int32));
        assert_eq!(symbols.arrays[0].0, "m_2");
    }

    #[test]
    fn unresolved_name_falls_back_to_parameters() {
        let scopes = Scopes::new(vec![ParamEntry {
            source_name: "a".to_string(),
            internal_name: "a_7".to_string(),
            data_type: DataType::Int32,
        }]);

        let entry = scopes.resolve_var("a").unwrap();
        assert_eq!(entry.internal_name, "a_7");
    }
}
