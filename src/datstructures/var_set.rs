const BLOCK_BITS: usize = u64::BITS as usize;

/// An immutable set of environment entries, used by the initialization
/// analysis to track which variables are definitely assigned at a program
/// point. Entries are arena indices, so the set is a plain bitset and all
/// operations are cheap. Operators return new sets; a constructed set is
/// never mutated.
///
/// Invariant: the block vector carries no trailing zero blocks, so derived
/// equality is equality of contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarSet {
    blocks: Vec<u64>,
}

impl VarSet {
    pub fn new() -> VarSet {
        VarSet { blocks: Vec::new() }
    }

    pub fn contains(&self, id: usize) -> bool {
        match self.blocks.get(id / BLOCK_BITS) {
            Some(block) => block & (1 << (id % BLOCK_BITS)) != 0,
            None => false,
        }
    }

    /// Returns a copy of this set with `id` added.
    pub fn add(&self, id: usize) -> VarSet {
        let mut blocks = self.blocks.clone();
        if blocks.len() <= id / BLOCK_BITS {
            blocks.resize(id / BLOCK_BITS + 1, 0);
        }
        blocks[id / BLOCK_BITS] |= 1 << (id % BLOCK_BITS);

        VarSet { blocks }
    }

    pub fn union(&self, other: &VarSet) -> VarSet {
        let (longer, shorter) = if self.blocks.len() >= other.blocks.len() {
            (self, other)
        } else {
            (other, self)
        };

        let mut blocks = longer.blocks.clone();
        for (block, extra) in blocks.iter_mut().zip(shorter.blocks.iter()) {
            *block |= extra;
        }

        VarSet { blocks }
    }

    pub fn intersect(&self, other: &VarSet) -> VarSet {
        let blocks = self
            .blocks
            .iter()
            .zip(other.blocks.iter())
            .map(|(a, b)| a & b)
            .collect();

        VarSet::normalized(blocks)
    }

    /// Removes every entry that is also in `baseline`.
    pub fn trim(&self, baseline: &VarSet) -> VarSet {
        let mut blocks = self.blocks.clone();
        for (block, masked) in blocks.iter_mut().zip(baseline.blocks.iter()) {
            *block &= !masked;
        }

        VarSet::normalized(blocks)
    }

    fn normalized(mut blocks: Vec<u64>) -> VarSet {
        while blocks.last() == Some(&0) {
            blocks.pop();
        }

        VarSet { blocks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_contains() {
        let set = VarSet::new().add(3).add(100);

        assert!(set.contains(3));
        assert!(set.contains(100));
        assert!(!set.contains(4));
        assert!(!set.contains(164));
    }

    #[test]
    fn union_combines_both_sides() {
        let a = VarSet::new().add(1);
        let b = VarSet::new().add(70);

        let both = a.union(&b);
        assert!(both.contains(1));
        assert!(both.contains(70));
    }

    #[test]
    fn intersect_keeps_common_entries_only() {
        let a = VarSet::new().add(1).add(2).add(70);
        let b = VarSet::new().add(2);

        assert_eq!(VarSet::new().add(2), a.intersect(&b));
    }

    #[test]
    fn trim_subtracts_the_baseline() {
        let set = VarSet::new().add(1).add(2);
        let baseline = VarSet::new().add(2).add(3);

        assert_eq!(VarSet::new().add(1), set.trim(&baseline));
    }

    #[test]
    fn equality_ignores_block_capacity() {
        let wide = VarSet::new().add(1).add(200).trim(&VarSet::new().add(200));

        assert_eq!(VarSet::new().add(1), wide);
    }
}
