use std::collections::HashMap;

use crate::symbol::SymbolId;

/// Lexical environments consulted during parsing
///
/// Variables live in a stack of layers: entering an `if`/`while` body
/// pushes a layer, leaving it pops the layer and drops its names. A name
/// lookup walks the layers innermost-first, so an inner declaration
/// shadows an outer one. Functions live in a single flat table for the
/// whole compilation unit; kat has no nested functions.
#[derive(Debug, Clone)]
pub struct Scopes<'src> {
    vars: Vec<HashMap<&'src str, SymbolId>>,
    funcs: HashMap<&'src str, SymbolId>,
}

impl Default for Scopes<'_> {
    /// A scope stack with a single empty root layer
    fn default() -> Self {
        Self {
            vars: vec![HashMap::new()],
            funcs: HashMap::new(),
        }
    }
}

impl<'src> Scopes<'src> {
    /// Push a fresh variable layer
    pub fn enter_block(&mut self) {
        self.vars.push(HashMap::new());
    }

    /// Pop the innermost variable layer, discarding its names
    pub fn leave_block(&mut self) {
        self.vars.pop();
    }

    /// Insert a variable into the innermost layer
    ///
    /// The caller is expected to have rejected a duplicate in that layer
    /// beforehand (`declared_in_current`); an equal name in an outer layer
    /// is shadowed, not rejected
    pub fn declare_var(&mut self, name: &'src str, id: SymbolId) {
        let layer = self
            .vars
            .last_mut()
            .expect("scope stack always has a root layer");
        layer.insert(name, id);
    }

    /// Look a name up in the innermost layer only, for redeclaration checks
    pub fn declared_in_current(&self, name: &str) -> Option<SymbolId> {
        self.vars
            .last()
            .expect("scope stack always has a root layer")
            .get(name)
            .copied()
    }

    /// Resolve a variable name, innermost layer first
    pub fn lookup_var(&self, name: &str) -> Option<SymbolId> {
        self.vars
            .iter()
            .rev()
            .find_map(|layer| layer.get(name))
            .copied()
    }

    /// Insert a function into the flat function table
    ///
    /// The caller is expected to have rejected a duplicate beforehand
    /// (`lookup_func`)
    pub fn declare_func(&mut self, name: &'src str, id: SymbolId) {
        self.funcs.insert(name, id);
    }

    /// Resolve a function name
    pub fn lookup_func(&self, name: &str) -> Option<SymbolId> {
        self.funcs.get(name).copied()
    }
}
