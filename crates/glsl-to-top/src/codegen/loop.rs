//! Loop tracking for TopIR codegen.
//!
//! Each open loop records where `break` and `continue` go.

use alloc::vec::Vec;

use topir::Block;

/// Information about a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopInfo {
    /// Loop header block (target of the back edge)
    header: Block,
    /// Loop exit block (where `break` goes)
    exit: Block,
    /// End-test block of a test-last loop
    test: Option<Block>,
}

impl LoopInfo {
    /// Create a new loop info.
    pub fn new(header: Block, exit: Block) -> Self {
        Self {
            header,
            exit,
            test: None,
        }
    }

    /// Loop whose condition is checked after the body.
    pub fn with_test(header: Block, exit: Block, test: Block) -> Self {
        Self {
            header,
            exit,
            test: Some(test),
        }
    }

    pub fn header(&self) -> Block {
        self.header
    }

    pub fn exit(&self) -> Block {
        self.exit
    }

    /// End-test block, if the test runs after the body.
    pub fn test(&self) -> Option<Block> {
        self.test
    }

    /// Block a `continue` branches to.
    pub fn continue_target(&self) -> Block {
        self.test.unwrap_or(self.header)
    }
}

/// Stack of nested loops.
#[derive(Debug, Clone, Default)]
pub struct LoopStack {
    loops: Vec<LoopInfo>,
}

impl LoopStack {
    pub fn new() -> Self {
        Self { loops: Vec::new() }
    }

    pub fn push(&mut self, info: LoopInfo) {
        self.loops.push(info);
    }

    pub fn pop(&mut self) -> Option<LoopInfo> {
        self.loops.pop()
    }

    /// Innermost open loop.
    pub fn current(&self) -> Option<&LoopInfo> {
        self.loops.last()
    }

    /// Exit block of the innermost loop.
    pub fn find_break_target(&self) -> Option<Block> {
        self.loops.last().map(|info| info.exit())
    }

    /// Continue target of the innermost loop: the end test for test-last
    /// loops, the header otherwise.
    pub fn find_continue_target(&self) -> Option<Block> {
        self.loops.last().map(|info| info.continue_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_and_continue_targets() {
        let mut stack = LoopStack::new();
        assert_eq!(stack.find_break_target(), None);
        assert!(stack.current().is_none());

        let (h, e, t) = (Block::new(1), Block::new(2), Block::new(3));
        stack.push(LoopInfo::new(h, e));
        assert_eq!(stack.find_break_target(), Some(e));
        assert_eq!(stack.find_continue_target(), Some(h));

        stack.push(LoopInfo::with_test(Block::new(4), Block::new(5), t));
        assert_eq!(stack.find_continue_target(), Some(t));
        stack.pop();
        assert_eq!(stack.current().map(|l| l.header()), Some(h));
    }
}
