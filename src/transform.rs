use swc_core::{
    common::{util::take::Take, SyntaxContext, DUMMY_SP},
    ecma::{
        ast::*,
        utils::ExprFactory,
        visit::{VisitMut, VisitMutWith},
    },
};

use crate::hook::HookIdentifier;
use crate::syntax::{is_computed, SyntaxNode};

/// Rewrites every computed member access in `program` so its key is passed
/// through `hook` first: `a[k]` becomes `a[hook(k)]`.
pub fn rewrite(mut program: Program, hook: &HookIdentifier) -> Program {
    program.visit_mut_with(&mut ComputedAccessRewriter::new(hook));
    program
}

/// Same as [`rewrite`] for a single expression.
pub fn rewrite_expr(mut expr: Expr, hook: &HookIdentifier) -> Expr {
    expr.visit_mut_with(&mut ComputedAccessRewriter::new(hook));
    expr
}

// -----------------------------------------------------------------------------
// Transform state
// -----------------------------------------------------------------------------

pub struct ComputedAccessRewriter {
    hook: String,
}

impl ComputedAccessRewriter {
    pub fn new(hook: &HookIdentifier) -> Self {
        Self { hook: hook.as_str().to_string() }
    }

    fn hook_call(&self, key: Box<Expr>) -> Box<Expr> {
        // `a[x, y]` must stay one argument
        let key = match *key {
            seq @ Expr::Seq(_) => Box::new(seq.wrap_with_paren()),
            other => Box::new(other),
        };
        Box::new(Expr::Call(CallExpr {
            span: DUMMY_SP,
            callee: Callee::Expr(Box::new(Expr::Ident(Ident::new(
                self.hook.as_str().into(),
                DUMMY_SP,
                SyntaxContext::empty(),
            )))),
            args: vec![key.as_arg()],
            type_args: None,
            ctxt: SyntaxContext::empty(),
        }))
    }

    /// Handles one member access and everything beneath it. Nested accesses
    /// reached from here are rewritten by this call, never by the visitor,
    /// so each one is wrapped exactly once.
    fn rewrite_member(&mut self, node: &mut MemberExpr) {
        // `a[x][y]`: inner access first
        match SyntaxNode::of(&mut node.obj) {
            SyntaxNode::MemberAccess(inner) => self.rewrite_member(inner),
            SyntaxNode::Identifier(_) | SyntaxNode::Literal(_) => {}
            SyntaxNode::BinaryOp(b) => b.visit_mut_with(self),
            SyntaxNode::Call(c) => c.visit_mut_with(self),
            SyntaxNode::Opaque(e) => e.visit_mut_with(self),
        }

        if let MemberProp::Computed(prop) = &mut node.prop {
            self.rewrite_key(prop);
        }
    }

    /// Rewrites accesses inside a bracketed key, then wraps the key itself.
    fn rewrite_key(&mut self, prop: &mut ComputedPropName) {
        match SyntaxNode::of(&mut prop.expr) {
            // `a[b[c]]`
            SyntaxNode::MemberAccess(inner) => self.rewrite_member(inner),
            // `a[b + c[d]]`
            SyntaxNode::BinaryOp(bin) => self.rewrite_binary_operands(bin),
            SyntaxNode::Identifier(_) | SyntaxNode::Literal(_) => {}
            SyntaxNode::Call(c) => c.visit_mut_with(self),
            SyntaxNode::Opaque(e) => e.visit_mut_with(self),
        }

        let key = prop.expr.take();
        prop.expr = self.hook_call(key);
    }

    /// Only operands that are themselves member accesses are rewritten.
    /// An operand that is another binary expression is left alone, so in
    /// `a[b + c + d[e]]` the inner `d[e]` is not instrumented.
    fn rewrite_binary_operands(&mut self, bin: &mut BinExpr) {
        for operand in [&mut bin.left, &mut bin.right] {
            match SyntaxNode::of(operand) {
                SyntaxNode::MemberAccess(inner) => self.rewrite_member(inner),
                SyntaxNode::BinaryOp(_) => {}
                SyntaxNode::Identifier(_) | SyntaxNode::Literal(_) => {}
                SyntaxNode::Call(c) => c.visit_mut_with(self),
                SyntaxNode::Opaque(e) => e.visit_mut_with(self),
            }
        }
    }
}

impl VisitMut for ComputedAccessRewriter {
    fn visit_mut_member_expr(&mut self, node: &mut MemberExpr) {
        if is_computed(node) {
            self.rewrite_member(node);
        } else {
            // dot form: look for accesses further down the object chain
            node.visit_mut_children_with(self);
        }
    }

    // `super[k]` is its own node, not a `MemberExpr`
    fn visit_mut_super_prop_expr(&mut self, node: &mut SuperPropExpr) {
        if let SuperProp::Computed(prop) = &mut node.prop {
            self.rewrite_key(prop);
        }
    }
}
