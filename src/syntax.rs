//! Closed view over the expression shapes the rewriter cares about.
//!
//! swc's `Expr` has dozens of variants. The rewrite rule only distinguishes
//! five of them, so [`SyntaxNode::of`] folds everything else into
//! [`SyntaxNode::Opaque`] and the transformer matches exhaustively over the
//! result.

use swc_core::ecma::ast::{BinExpr, CallExpr, Expr, Ident, Lit, MemberExpr, MemberProp};

pub enum SyntaxNode<'a> {
    Identifier(&'a Ident),
    Literal(&'a Lit),
    /// Both bracket (`a[b]`) and dot (`a.b`) form; see [`is_computed`].
    MemberAccess(&'a mut MemberExpr),
    BinaryOp(&'a mut BinExpr),
    Call(&'a mut CallExpr),
    Opaque(&'a mut Expr),
}

impl<'a> SyntaxNode<'a> {
    /// Classifies `expr`, looking through parentheses.
    pub fn of(expr: &'a mut Expr) -> Self {
        match expr {
            Expr::Paren(p) => SyntaxNode::of(&mut p.expr),
            Expr::Ident(i) => SyntaxNode::Identifier(i),
            Expr::Lit(l) => SyntaxNode::Literal(l),
            Expr::Member(m) => SyntaxNode::MemberAccess(m),
            Expr::Bin(b) => SyntaxNode::BinaryOp(b),
            Expr::Call(c) => SyntaxNode::Call(c),
            other => SyntaxNode::Opaque(other),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyntaxNode::Identifier(_) => "identifier",
            SyntaxNode::Literal(_) => "literal",
            SyntaxNode::MemberAccess(_) => "member",
            SyntaxNode::BinaryOp(_) => "binary",
            SyntaxNode::Call(_) => "call",
            SyntaxNode::Opaque(_) => "opaque",
        }
    }
}

/// `true` for bracket form. Private names (`this.#x`) are never computed.
pub fn is_computed(member: &MemberExpr) -> bool {
    matches!(member.prop, MemberProp::Computed(_))
}

/// Where a region's text came from. Only used to put results back together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    WholeBody,
    /// n-th inline `<script>` in document order, counting only JavaScript
    /// scripts without a `src` attribute.
    InlineScript { index: usize },
}

/// One independently rewritable unit of text.
#[derive(Debug, Clone, Copy)]
pub struct SourceRegion<'a> {
    pub text: &'a str,
    pub content_type: &'a str,
    pub origin: Origin,
}

impl<'a> SourceRegion<'a> {
    pub fn whole_body(text: &'a str, content_type: &'a str) -> Self {
        Self { text, content_type, origin: Origin::WholeBody }
    }

    pub fn inline_script(text: &'a str, content_type: &'a str, index: usize) -> Self {
        Self { text, content_type, origin: Origin::InlineScript { index } }
    }
}
