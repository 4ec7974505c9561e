//! Arena-backed parse trees.
//!
//!     Nodes live in one flat vector and reference each other by index:
//!     rule nodes own their children in parse order, token leaves point into
//!     the token sequence, and error leaves record either the offending
//!     token or the token type an insertion repair invented. Spans are byte
//!     ranges over the original input and fold upward as rules close.

pub mod walker;

use crate::grammar::{Grammar, RuleId};
use crate::token::{Token, TokenType};
use serde::Serialize;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub u32);

/// Byte range over the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Interior node for one rule invocation.
    Rule(RuleId),
    /// Leaf for a consumed token; the index is into [`ParseTree::tokens`].
    Token { token: usize },
    /// Leaf marking a repair: a deleted or unexpected token, or a token type
    /// the parser inserted to continue.
    Error {
        token: Option<usize>,
        missing: Option<TokenType>,
    },
}

#[derive(Debug, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub span: Span,
}

/// A finished parse tree plus the full token sequence it indexes into
/// (hidden-channel tokens included).
#[derive(Debug, Serialize)]
pub struct ParseTree {
    nodes: Vec<Node>,
    root: NodeId,
    tokens: Vec<Token>,
}

impl ParseTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Full token sequence, hidden tokens included.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token_of(&self, id: NodeId) -> Option<&Token> {
        match self.node(id).kind {
            NodeKind::Token { token } => self.tokens.get(token),
            NodeKind::Error {
                token: Some(token), ..
            } => self.tokens.get(token),
            _ => None,
        }
    }

    /// Child rule nodes of `id` that invoke `rule`, in parse order.
    pub fn children_of_rule(&self, id: NodeId, rule: RuleId) -> Vec<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| matches!(self.node(c).kind, NodeKind::Rule(r) if r == rule))
            .collect()
    }

    /// First child token leaf of `id` with the given type.
    pub fn child_token(&self, id: NodeId, ty: TokenType) -> Option<&Token> {
        self.node(id).children.iter().copied().find_map(|c| {
            self.token_of(c)
                .filter(|t| t.ty == ty && matches!(self.node(c).kind, NodeKind::Token { .. }))
        })
    }

    /// Source text covered by a node's span.
    pub fn text_of<'a>(&self, id: NodeId, source: &'a str) -> &'a str {
        let span = self.node(id).span;
        &source[span.start..span.end]
    }

    /// Compact s-expression rendering, for tests and tooling.
    pub fn to_sexpr(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        self.write_sexpr(grammar, self.root, &mut out);
        out
    }

    fn write_sexpr(&self, grammar: &Grammar, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Rule(rule) => {
                out.push('(');
                out.push_str(grammar.rule_name(*rule));
                for &child in &node.children {
                    out.push(' ');
                    self.write_sexpr(grammar, child, out);
                }
                out.push(')');
            }
            NodeKind::Token { token } => {
                out.push_str(&self.tokens[*token].text);
            }
            NodeKind::Error { token, missing } => {
                out.push_str("(error");
                if let Some(token) = token {
                    out.push(' ');
                    out.push_str(&self.tokens[*token].text);
                }
                if let Some(missing) = missing {
                    out.push_str(" missing:");
                    out.push_str(grammar.token_name(*missing));
                }
                out.push(')');
            }
        }
    }
}

/// Incremental tree construction during the parse. Rules open and close in
/// stack discipline; closing folds the child's span into its parent.
pub(crate) struct TreeBuilder {
    nodes: Vec<Node>,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            nodes: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn push_node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.stack.last().copied();
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
            span,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0 as usize].children.push(id);
        }
        id
    }

    pub fn open_rule(&mut self, rule: RuleId, at_offset: usize) -> NodeId {
        let id = self.push_node(
            NodeKind::Rule(rule),
            Span {
                start: at_offset,
                end: at_offset,
            },
        );
        self.stack.push(id);
        id
    }

    pub fn close_rule(&mut self) {
        let id = self.stack.pop().expect("close without a matching open");
        let span = self.nodes[id.0 as usize].span;
        if let Some(&parent) = self.stack.last() {
            let parent = &mut self.nodes[parent.0 as usize];
            parent.span.end = parent.span.end.max(span.end);
        }
    }

    pub fn add_token(&mut self, global_idx: usize, token: &Token) {
        self.attach_leaf(NodeKind::Token { token: global_idx }, token.start, token.stop);
    }

    /// Error leaf for an offending (deleted or unexpected) token.
    pub fn add_error_token(&mut self, global_idx: usize, token: &Token) {
        self.attach_leaf(
            NodeKind::Error {
                token: Some(global_idx),
                missing: None,
            },
            token.start,
            token.stop,
        );
    }

    /// Error leaf standing in for a token the parser inserted.
    pub fn add_missing_token(&mut self, ty: TokenType, at_offset: usize) {
        self.attach_leaf(
            NodeKind::Error {
                token: None,
                missing: Some(ty),
            },
            at_offset,
            at_offset,
        );
    }

    fn attach_leaf(&mut self, kind: NodeKind, start: usize, stop: usize) {
        let id = self.push_node(kind, Span { start, end: stop });
        let parent = self.nodes[id.0 as usize]
            .parent
            .expect("leaves attach under an open rule");
        let parent = &mut self.nodes[parent.0 as usize];
        parent.span.end = parent.span.end.max(stop);
    }

    pub fn finish(mut self, tokens: Vec<Token>) -> ParseTree {
        debug_assert!(self.stack.is_empty(), "unclosed rule at finish");
        if self.nodes.is_empty() {
            // Degenerate input: synthesize an empty root so callers always
            // get a tree.
            self.nodes.push(Node {
                kind: NodeKind::Error {
                    token: None,
                    missing: None,
                },
                parent: None,
                children: Vec::new(),
                span: Span { start: 0, end: 0 },
            });
        }
        ParseTree {
            nodes: self.nodes,
            root: NodeId(0),
            tokens,
        }
    }
}
