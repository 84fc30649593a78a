pub mod parser;

use index_vec::IndexVec;

use crate::error::location::Traced;
use crate::symbol::SymbolId;

/// Stable handle of a node inside an `Ast` pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(usize);

impl index_vec::Idx for NodeRef {
    fn from_usize(idx: usize) -> Self {
        Self(idx)
    }
    fn index(self) -> usize {
        self.0
    }
}

/// All AST nodes are stored inside a pool; nodes refer to each other with
/// `NodeRef` handles
#[derive(Debug, Clone, Default)]
pub struct Ast {
    node_pool: IndexVec<NodeRef, Traced<AstNode>>,
    /// Function definitions in program order
    pub root_nodes: Vec<NodeRef>,
}

impl Ast {
    /// Add a new node to the pool and return its handle
    #[must_use]
    pub fn add_node(&mut self, new_node: Traced<AstNode>) -> NodeRef {
        self.node_pool.push(new_node)
    }

    pub fn node(&self, node_ref: NodeRef) -> &Traced<AstNode> {
        &self.node_pool[node_ref]
    }
}

/// A node inside an AST
///
/// Symbol references are `SymbolId` handles into the `Symbols` pool built
/// alongside the tree; the tree does not own the symbols
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// Integer literal; kat expressions only support integer values so far
    Num(i64),
    /// Reference to a resolved variable
    Var(SymbolId),
    /// Recognized by the operator classifier but never produced by the
    /// current grammar: expression reduction is strictly binary
    Unary(UnaryOp, NodeRef),
    Binary(BinOp, NodeRef, NodeRef),
    /// Call of a resolved function
    Call(SymbolId, Vec<NodeRef>),

    /// `let name: type [= init];`
    Let {
        var: SymbolId,
        init: Option<NodeRef>,
    },
    /// `name = value;`
    Assign {
        target: SymbolId,
        value: NodeRef,
    },
    /// An expression evaluated for its effect
    ExprStmt(NodeRef),
    If {
        cond: NodeRef,
        then_block: Vec<NodeRef>,
        else_block: Option<Vec<NodeRef>>,
    },
    While {
        cond: NodeRef,
        body: Vec<NodeRef>,
    },
    Return(NodeRef),

    FnDef {
        func: SymbolId,
        params: Vec<SymbolId>,
        body: Vec<NodeRef>,
    },
}

/// Binary operators of kat expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    LogAnd,
    LogOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    /// Binding strength, 1 is the weakest; equal precedence reduces
    /// left-to-right
    ///
    /// The full table also ranks function calls (5), unary sign operators
    /// (6) and parentheses (7), but those never meet a binary operator on
    /// the operator stack: calls and parenthesized groups are complete
    /// operands by the time they are pushed
    pub fn precedence(self) -> u8 {
        match self {
            Self::LogAnd | Self::LogOr => 1,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => 2,
            Self::Add | Self::Sub => 3,
            Self::Mul | Self::Div => 4,
        }
    }

    /// The operator's surface syntax, for diagnostics
    pub fn text(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Unary sign operators; part of the operator vocabulary but unreachable
/// through the current grammar (see `BinOp::precedence`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
}
