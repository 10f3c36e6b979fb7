//! Common-subexpression elimination.
//!
//! Every non-atomic subexpression reached more than once across all output
//! terms is hoisted into an intermediate `_tmp{i}`. Intermediates are listed
//! in dependency order: each one only refers to inputs and earlier
//! intermediates.

use rustc_hash::FxHashMap;
use symc_ir::{Expr, ExprKind};

use super::writer::SourceWriter;

/// Output terms rewritten over intermediates.
#[derive(Debug, Default)]
pub(crate) struct Eliminated {
    pub temps: Vec<(String, Expr)>,
    pub terms: Vec<Expr>,
}

pub(crate) fn eliminate(terms: &[Expr], writer: &mut SourceWriter) -> Eliminated {
    let mut counts: FxHashMap<Expr, usize> = FxHashMap::default();
    for term in terms {
        count(term, &mut counts);
    }

    let mut rewriter = Rewriter {
        counts: &counts,
        memo: FxHashMap::default(),
        temps: Vec::new(),
        writer,
    };
    let terms = terms.iter().map(|t| rewriter.rewrite(t)).collect();
    Eliminated {
        temps: rewriter.temps,
        terms,
    }
}

/// Count references; children of an already-seen node are not revisited.
fn count(expr: &Expr, counts: &mut FxHashMap<Expr, usize>) {
    if expr.is_atom() {
        return;
    }
    let seen = counts.entry(expr.clone()).or_insert(0);
    *seen += 1;
    if *seen == 1 {
        for child in expr.children() {
            count(child, counts);
        }
    }
}

struct Rewriter<'a> {
    counts: &'a FxHashMap<Expr, usize>,
    memo: FxHashMap<Expr, Expr>,
    temps: Vec<(String, Expr)>,
    writer: &'a mut SourceWriter,
}

impl Rewriter<'_> {
    fn rewrite(&mut self, expr: &Expr) -> Expr {
        if expr.is_atom() {
            return expr.clone();
        }
        if let Some(done) = self.memo.get(expr) {
            return done.clone();
        }
        let rebuilt = match expr.kind() {
            ExprKind::Number(_) | ExprKind::Symbol(_) => expr.clone(),
            ExprKind::Add(items) => Expr::add_all(items.iter().map(|e| self.rewrite(e))),
            ExprKind::Mul(items) => Expr::mul_all(items.iter().map(|e| self.rewrite(e))),
            ExprKind::Pow(base, exp) => {
                let base = self.rewrite(base);
                let exp = self.rewrite(exp);
                Expr::pow(&base, &exp)
            }
            ExprKind::Call(func, arg) => Expr::call(*func, &self.rewrite(arg)),
        };
        let result = if self.counts.get(expr).copied().unwrap_or(0) > 1 {
            let name = self.writer.fresh_temp();
            self.temps.push((name.clone(), rebuilt));
            Expr::symbol(name)
        } else {
            rebuilt
        };
        self.memo.insert(expr.clone(), result.clone());
        result
    }
}
