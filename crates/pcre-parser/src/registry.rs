//! Capture group registry.
//!
//! Assigns capture numbers during the descent (branch-reset aware) and
//! records declared names. References are not resolved here: forward
//! references into `(?(DEFINE)…)` are legal, so the validator re-walks the
//! finished tree instead.

use rustc_hash::FxHashMap;

/// Tracks capture numbering while the parser descends.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    next_index: u32,
    highest: u32,
    names: FxHashMap<String, u32>,
}

impl GroupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        GroupRegistry::default()
    }

    /// Allocate the next capture number.
    pub fn allocate(&mut self) -> u32 {
        self.next_index += 1;
        self.highest = self.highest.max(self.next_index);
        self.next_index
    }

    /// Record a declared group name. Duplicates are allowed here; the
    /// validator rejects them unless the `J` flag is set.
    pub fn declare_name(&mut self, name: &str, index: u32) {
        self.names.entry(name.to_string()).or_insert(index);
    }

    /// Number of captures allocated so far.
    pub fn capture_count(&self) -> u32 {
        self.highest
    }

    /// Begin a `(?|…)` branch-reset scope; returns the saved counter.
    pub fn enter_branch_reset(&self) -> u32 {
        self.next_index
    }

    /// Rewind the counter at the start of each branch-reset alternative.
    pub fn restart_branch(&mut self, saved: u32) {
        self.next_index = saved;
    }

    /// Close the scope: numbering continues after the widest branch.
    pub fn leave_branch_reset(&mut self) {
        self.next_index = self.highest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_allocation() {
        let mut reg = GroupRegistry::new();
        assert_eq!(reg.allocate(), 1);
        assert_eq!(reg.allocate(), 2);
        assert_eq!(reg.capture_count(), 2);
    }

    #[test]
    fn branch_reset_reuses_numbers() {
        let mut reg = GroupRegistry::new();
        reg.allocate(); // group 1 before the reset group
        let saved = reg.enter_branch_reset();
        reg.restart_branch(saved);
        assert_eq!(reg.allocate(), 2); // first branch: (a)
        reg.restart_branch(saved);
        assert_eq!(reg.allocate(), 2); // second branch: (b) reuses 2
        assert_eq!(reg.allocate(), 3); // second branch: (c)
        reg.leave_branch_reset();
        assert_eq!(reg.allocate(), 4);
    }
}
