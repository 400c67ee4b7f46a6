use bitflags::bitflags;
use indexmap::IndexMap;
use inklet_foundation::span::Span;
use inklet_syntax::ast::VarKind;

use crate::types::Type;

bitflags! {
    /// Which semantic levels a declaration occupies. The carry-forward
    /// resolver compares these sets to decide what survives shadowing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const VALUE = 1 << 0;
        const TYPE = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    Var { kind: VarKind },
    Function,
    Class,
    Interface,
    TypeAlias,
    Enum,
    ImportedName { module: String, imported: String },
    ImportedNamespace { module: String },
}

impl BindingKind {
    pub fn describe(&self) -> &'static str {
        match self {
            BindingKind::Var { kind: VarKind::Let } => "let",
            BindingKind::Var {
                kind: VarKind::Const,
            } => "const",
            BindingKind::Function => "function",
            BindingKind::Class => "class",
            BindingKind::Interface => "interface",
            BindingKind::TypeAlias => "type alias",
            BindingKind::Enum => "enum",
            BindingKind::ImportedName { .. } | BindingKind::ImportedNamespace { .. } => "import",
        }
    }
}

/// One module-scope name.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub caps: Capabilities,
    pub kind: BindingKind,
    pub ty: Type,
    pub span: Span,
    /// Index of the declaring statement within the module.
    pub stmt_index: usize,
}

/// The lexical scope table of one module. Iteration order is declaration
/// order.
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    bindings: IndexMap<String, Binding>,
}

impl ModuleScope {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts a binding; returns the previous binding with the same name if
    /// one existed (a duplicate declaration).
    pub fn insert(&mut self, binding: Binding) -> Option<Binding> {
        self.bindings.insert(binding.name.clone(), binding)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.bindings.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
