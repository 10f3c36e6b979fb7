//! Expression printing for the generated languages.
//!
//! Symbols are printed through an access map built from the function's
//! inputs (`pose` → `_pose[3]`); symbols missing from the map are
//! intermediates and print under their own name.

use rustc_hash::FxHashMap;
use symc_ir::{Expr, ExprKind, Func, Rational, Symbol};

/// Target language of a printed expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dialect {
    Cpp,
    Python,
}

/// Binding strength of a printed expression, weakest first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Sum,
    Product,
    Power,
    Atom,
}

pub(crate) struct Printer<'a> {
    dialect: Dialect,
    accesses: &'a FxHashMap<Symbol, String>,
}

impl<'a> Printer<'a> {
    pub(crate) fn new(dialect: Dialect, accesses: &'a FxHashMap<Symbol, String>) -> Self {
        Printer { dialect, accesses }
    }

    /// Source text of `expr`.
    pub(crate) fn print(&self, expr: &Expr) -> String {
        self.emit(expr).0
    }

    fn wrapped(&self, expr: &Expr, min: Prec) -> String {
        let (text, prec) = self.emit(expr);
        if prec < min {
            format!("({text})")
        } else {
            text
        }
    }

    fn emit(&self, expr: &Expr) -> (String, Prec) {
        match expr.kind() {
            ExprKind::Number(r) => self.number(*r),
            ExprKind::Symbol(s) => {
                let text = self
                    .accesses
                    .get(s)
                    .cloned()
                    .unwrap_or_else(|| s.name().to_owned());
                (text, Prec::Atom)
            }
            ExprKind::Add(terms) => (self.sum(terms), Prec::Sum),
            ExprKind::Mul(factors) => self.product(factors),
            ExprKind::Pow(base, exp) => self.power(base, exp),
            ExprKind::Call(func, arg) => (self.call(*func, arg), Prec::Atom),
        }
    }

    fn number(&self, r: Rational) -> (String, Prec) {
        let text = match (r.as_integer(), self.dialect) {
            (Some(n), _) => n.to_string(),
            (None, Dialect::Cpp) => format!("Scalar({:?})", r.to_f64()),
            (None, Dialect::Python) => format!("{:?}", r.to_f64()),
        };
        let prec = if r.is_negative() { Prec::Sum } else { Prec::Atom };
        (text, prec)
    }

    fn sum(&self, terms: &[Expr]) -> String {
        let mut out = String::new();
        for (i, term) in terms.iter().enumerate() {
            let negative = is_negative(term);
            let shown = if negative { -term } else { term.clone() };
            match (i, negative) {
                (0, true) => out.push('-'),
                (0, false) => {}
                (_, true) => out.push_str(" - "),
                (_, false) => out.push_str(" + "),
            }
            let min = if negative { Prec::Product } else { Prec::Sum };
            out.push_str(&self.wrapped(&shown, min));
        }
        out
    }

    fn product(&self, factors: &[Expr]) -> (String, Prec) {
        let mut rest = factors;
        let mut negative = false;
        let mut numerator = Vec::new();
        if let Some(coeff) = factors.first().and_then(Expr::as_number) {
            rest = &factors[1..];
            negative = coeff.is_negative();
            let magnitude = if negative { -coeff } else { coeff };
            if !magnitude.is_one() {
                numerator.push(self.number(magnitude).0);
            }
        }

        let mut denominator = Vec::new();
        for factor in rest {
            match reciprocal(factor) {
                Some(flipped) => denominator.push(flipped),
                None => numerator.push(self.wrapped(factor, Prec::Product)),
            }
        }

        let mut text = if numerator.is_empty() {
            "1".to_owned()
        } else {
            numerator.join("*")
        };
        match denominator.as_slice() {
            [] => {}
            [single] => {
                text.push_str(" / ");
                text.push_str(&self.wrapped(single, Prec::Power));
            }
            several => {
                let parts: Vec<String> =
                    several.iter().map(|f| self.wrapped(f, Prec::Product)).collect();
                text.push_str(&format!(" / ({})", parts.join("*")));
            }
        }

        if negative {
            (format!("-{text}"), Prec::Sum)
        } else {
            (text, Prec::Product)
        }
    }

    fn power(&self, base: &Expr, exp: &Expr) -> (String, Prec) {
        if let Some(flipped) = reciprocal(&Expr::pow(base, exp)) {
            return (format!("1 / {}", self.wrapped(&flipped, Prec::Power)), Prec::Product);
        }
        if exp.as_number() == Some(Rational::HALF) {
            let sqrt = match self.dialect {
                Dialect::Cpp => "std::sqrt",
                Dialect::Python => "math.sqrt",
            };
            return (format!("{sqrt}({})", self.print(base)), Prec::Atom);
        }
        match self.dialect {
            Dialect::Cpp => {
                let exponent = match exp.as_number() {
                    Some(r) => match r.as_integer() {
                        Some(n) => format!("Scalar({n})"),
                        None => self.number(r).0,
                    },
                    None => self.print(exp),
                };
                (format!("std::pow({}, {exponent})", self.print(base)), Prec::Atom)
            }
            Dialect::Python => (
                format!(
                    "{}**{}",
                    self.wrapped(base, Prec::Atom),
                    self.wrapped(exp, Prec::Atom)
                ),
                Prec::Power,
            ),
        }
    }

    fn call(&self, func: Func, arg: &Expr) -> String {
        let arg = self.print(arg);
        match (self.dialect, func) {
            (Dialect::Python, Func::Abs) => format!("abs({arg})"),
            (Dialect::Python, _) => format!("math.{}({arg})", func.name()),
            (Dialect::Cpp, _) => format!("std::{}({arg})", func.name()),
        }
    }
}

fn is_negative(term: &Expr) -> bool {
    match term.kind() {
        ExprKind::Number(r) => r.is_negative(),
        ExprKind::Mul(factors) => factors
            .first()
            .and_then(Expr::as_number)
            .is_some_and(Rational::is_negative),
        _ => false,
    }
}

/// `b^-e` for a power with a negative numeric exponent, `None` otherwise.
fn reciprocal(factor: &Expr) -> Option<Expr> {
    let ExprKind::Pow(base, exp) = factor.kind() else {
        return None;
    };
    let e = exp.as_number().filter(|e| e.is_negative())?;
    Some(Expr::pow(base, &Expr::number(-e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn both(expr: &Expr) -> (String, String) {
        let accesses = FxHashMap::default();
        (
            Printer::new(Dialect::Cpp, &accesses).print(expr),
            Printer::new(Dialect::Python, &accesses).print(expr),
        )
    }

    #[test]
    fn sums_and_products() {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        assert_eq!(both(&(&x - &y)).0, "x - y");
        assert_eq!(both(&(Expr::int(2) * &x * &y)).0, "2*x*y");
        assert_eq!(both(&(&(&x + &y) * &x)).0, "x*(x + y)");
        assert_eq!(both(&-(&x * &y)).0, "-x*y");
    }

    #[test]
    fn rationals_are_typed_in_cpp() {
        let x = Expr::symbol("x");
        let half = Expr::ratio(1, 2).unwrap_or_else(Expr::zero);
        assert_eq!(both(&(&half * &x)), ("Scalar(0.5)*x".to_owned(), "0.5*x".to_owned()));
    }

    #[test]
    fn quotients_and_powers() {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        assert_eq!(both(&(&x / &y)).0, "x / y");
        assert_eq!(both(&(Expr::one() / (&x + &y))).0, "1 / (x + y)");
        assert_eq!(both(&x.sqrt()), ("std::sqrt(x)".to_owned(), "math.sqrt(x)".to_owned()));
        assert_eq!(both(&x.powi(3)), ("std::pow(x, Scalar(3))".to_owned(), "x**3".to_owned()));
        assert_eq!(both(&(&x / (&x + &y).sqrt())).1, "x / math.sqrt(x + y)");
    }

    #[test]
    fn calls_and_accesses() {
        let x = Expr::symbol("x");
        let mut accesses = FxHashMap::default();
        accesses.insert(Symbol::new("x"), "_pose[0]".to_owned());
        let printer = Printer::new(Dialect::Cpp, &accesses);
        assert_eq!(printer.print(&(x.sin() + Expr::symbol("_tmp0"))), "_tmp0 + std::sin(_pose[0])");
        assert_eq!(both(&x.abs()).1, "abs(x)");
    }
}
