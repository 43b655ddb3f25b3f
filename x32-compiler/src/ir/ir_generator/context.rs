//! Shared lowering state: the block under construction plus the label and
//! temporary counters.

use crate::ir::{BasicBlock, Instr, Label, TempId, Terminator};

pub(super) struct Gen {
    /// Program-wide, so every label in the emitted assembly is unique.
    label_count: usize,
    /// Per-function; reset by `begin_function`.
    temp_count: usize,
    blocks: Vec<BasicBlock>,
}

impl Gen {
    pub(super) fn new() -> Self {
        Self {
            label_count: 0,
            temp_count: 0,
            blocks: Vec::new(),
        }
    }

    pub(super) fn begin_function(&mut self) {
        self.temp_count = 0;
        self.blocks.clear();
        let entry = self.fresh_label();
        self.start_block(entry);
    }

    pub(super) fn finish_function(&mut self) -> Vec<BasicBlock> {
        std::mem::take(&mut self.blocks)
    }

    pub(super) fn fresh_label(&mut self) -> Label {
        let label = format!("L{}", self.label_count);
        self.label_count += 1;
        label
    }

    pub(super) fn fresh_temp(&mut self) -> TempId {
        let temp = TempId(self.temp_count);
        self.temp_count += 1;
        temp
    }

    /// Open a new block; it becomes the emission target. Construction is
    /// strictly linear, so the current block is always the newest one.
    pub(super) fn start_block(&mut self, label: Label) {
        self.blocks.push(BasicBlock {
            label,
            statements: Vec::new(),
            terminator: None,
        });
    }

    fn current(&mut self) -> &mut BasicBlock {
        self.blocks.last_mut().expect("a block is always open")
    }

    pub(super) fn emit(&mut self, instr: Instr) {
        self.current().statements.push(instr);
    }

    pub(super) fn terminate(&mut self, terminator: Terminator) {
        let block = self.current();
        if block.terminator.is_none() {
            block.terminator = Some(terminator);
        }
    }

    pub(super) fn current_ends_with_return(&self) -> bool {
        self.blocks
            .last()
            .and_then(|b| b.statements.last())
            .map(|instr| matches!(instr, Instr::Return { .. }))
            .unwrap_or(false)
    }
}
