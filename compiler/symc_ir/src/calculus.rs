//! Free symbols, substitution, differentiation and numeric evaluation.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::expr::{Expr, ExprKind, Func};
use crate::symbol::Symbol;

impl Expr {
    /// Whether `symbol` occurs anywhere in this expression.
    pub fn contains(&self, symbol: &Symbol) -> bool {
        match self.kind() {
            ExprKind::Number(_) => false,
            ExprKind::Symbol(s) => s == symbol,
            ExprKind::Add(items) | ExprKind::Mul(items) => items.iter().any(|e| e.contains(symbol)),
            ExprKind::Pow(base, exp) => base.contains(symbol) || exp.contains(symbol),
            ExprKind::Call(_, arg) => arg.contains(symbol),
        }
    }

    /// All symbols this expression depends on.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_free_symbols(&mut out);
        out
    }

    pub(crate) fn collect_free_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self.kind() {
            ExprKind::Number(_) => {}
            ExprKind::Symbol(s) => {
                out.insert(s.clone());
            }
            ExprKind::Add(items) | ExprKind::Mul(items) => {
                for item in items {
                    item.collect_free_symbols(out);
                }
            }
            ExprKind::Pow(base, exp) => {
                base.collect_free_symbols(out);
                exp.collect_free_symbols(out);
            }
            ExprKind::Call(_, arg) => arg.collect_free_symbols(out),
        }
    }

    /// Replace symbols according to `map`, re-canonicalizing on the way up.
    pub fn subs(&self, map: &FxHashMap<Symbol, Expr>) -> Expr {
        match self.kind() {
            ExprKind::Number(_) => self.clone(),
            ExprKind::Symbol(s) => map.get(s).cloned().unwrap_or_else(|| self.clone()),
            ExprKind::Add(items) => Expr::add_all(items.iter().map(|e| e.subs(map))),
            ExprKind::Mul(items) => Expr::mul_all(items.iter().map(|e| e.subs(map))),
            ExprKind::Pow(base, exp) => Expr::pow(&base.subs(map), &exp.subs(map)),
            ExprKind::Call(func, arg) => Expr::call(*func, &arg.subs(map)),
        }
    }

    /// Partial derivative with respect to `symbol`.
    pub fn diff(&self, symbol: &Symbol) -> Expr {
        if !self.contains(symbol) {
            return Expr::zero();
        }
        match self.kind() {
            ExprKind::Number(_) => Expr::zero(),
            ExprKind::Symbol(s) => {
                if s == symbol {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            ExprKind::Add(terms) => Expr::add_all(terms.iter().map(|t| t.diff(symbol))),
            ExprKind::Mul(factors) => {
                // Product rule, skipping factors that do not depend on the symbol.
                let mut terms = Vec::with_capacity(factors.len());
                for (i, factor) in factors.iter().enumerate() {
                    let d = factor.diff(symbol);
                    if d.is_zero() {
                        continue;
                    }
                    terms.push(Expr::mul_all(factors.iter().enumerate().map(|(j, f)| {
                        if i == j {
                            d.clone()
                        } else {
                            f.clone()
                        }
                    })));
                }
                Expr::add_all(terms)
            }
            ExprKind::Pow(base, exp) => {
                let d_base = base.diff(symbol);
                if exp.contains(symbol) {
                    // d(b^e) = b^e * (e' * log(b) + e * b' / b)
                    let d_exp = exp.diff(symbol);
                    Expr::mul_all([
                        self.clone(),
                        Expr::add_all([
                            Expr::mul_all([d_exp, base.log()]),
                            Expr::mul_all([exp.clone(), d_base, base.recip()]),
                        ]),
                    ])
                } else {
                    let lowered = Expr::add_all([exp.clone(), Expr::int(-1)]);
                    Expr::mul_all([exp.clone(), Expr::pow(base, &lowered), d_base])
                }
            }
            ExprKind::Call(func, arg) => {
                let d_arg = arg.diff(symbol);
                let outer = match func {
                    Func::Sin => arg.cos(),
                    Func::Cos => -arg.sin(),
                    Func::Tan => Expr::add_all([Expr::one(), arg.tan().powi(2)]),
                    Func::Exp => arg.exp(),
                    Func::Log => arg.recip(),
                    Func::Abs => Expr::mul_all([arg.clone(), arg.abs().recip()]),
                };
                Expr::mul_all([outer, d_arg])
            }
        }
    }

    /// Evaluate numerically. `None` if a symbol is unbound.
    pub fn eval(&self, env: &FxHashMap<Symbol, f64>) -> Option<f64> {
        Some(match self.kind() {
            ExprKind::Number(r) => r.to_f64(),
            ExprKind::Symbol(s) => *env.get(s)?,
            ExprKind::Add(items) => {
                let mut acc = 0.0;
                for item in items {
                    acc += item.eval(env)?;
                }
                acc
            }
            ExprKind::Mul(items) => {
                let mut acc = 1.0;
                for item in items {
                    acc *= item.eval(env)?;
                }
                acc
            }
            ExprKind::Pow(base, exp) => base.eval(env)?.powf(exp.eval(env)?),
            ExprKind::Call(func, arg) => {
                let x = arg.eval(env)?;
                match func {
                    Func::Sin => x.sin(),
                    Func::Cos => x.cos(),
                    Func::Tan => x.tan(),
                    Func::Exp => x.exp(),
                    Func::Log => x.ln(),
                    Func::Abs => x.abs(),
                }
            }
        })
    }
}
