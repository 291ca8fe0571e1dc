use crate::compile::ast::{EntryId, Type};

/// A resolved variable binding: the declared type plus the frame slot that
/// code generation assigns later. Synthetic entries are minted as recovery
/// bindings for undeclared or conflicting names so that the remaining
/// analyses can keep walking the tree.
#[derive(Debug, Clone)]
pub struct VarEntry {
    pub name: String,
    pub ty: Type,
    pub slot: Option<i32>,
    pub synthetic: bool,
}

/// Arena of variable entries. Entries are allocated once during scope
/// analysis and live as long as the tree; identifiers hold their index.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<VarEntry>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn declare(&mut self, name: &str, ty: Type) -> EntryId {
        self.insert(name, ty, false)
    }

    pub fn declare_synthetic(&mut self, name: &str) -> EntryId {
        self.insert(name, Type::Int, true)
    }

    fn insert(&mut self, name: &str, ty: Type, synthetic: bool) -> EntryId {
        let id = self.entries.len();
        self.entries.push(VarEntry {
            name: name.to_string(),
            ty,
            slot: None,
            synthetic,
        });

        id
    }

    pub fn entry(&self, id: EntryId) -> &VarEntry {
        &self.entries[id]
    }

    pub fn entry_mut(&mut self, id: EntryId) -> &mut VarEntry {
        &mut self.entries[id]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
