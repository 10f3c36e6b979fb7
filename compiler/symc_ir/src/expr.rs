//! Canonical symbolic expressions.
//!
//! Expressions are immutable, reference-counted trees. Every constructor
//! returns a canonical form, which is what makes structural equality usable as
//! symbolic equality for the transformations in this workspace:
//!
//! - `Add` has at least two terms, holds at most one number (its constant),
//!   never nests another `Add`, and like terms are merged (`2*x + 3*x → 5*x`).
//! - `Mul` has at least two factors, holds at most one number (its leading
//!   coefficient, never `1`), never nests another `Mul`, and equal bases are
//!   merged by adding exponents (`x * x^2 → x^3`).
//! - `Pow` never has exponent `0` or `1` and never has two numeric operands
//!   with an integer exponent.
//! - Children are sorted by the derived `Ord`, so argument order never leaks
//!   into the result.
//!
//! Nothing beyond that is attempted: there is no expansion, factoring or
//! trigonometric rewriting.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::rational::Rational;
use crate::symbol::Symbol;

/// Elementary functions supported by the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Abs,
}

impl Func {
    /// Lowercase mathematical name (`sin`, `log`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Abs => "abs",
        }
    }
}

/// Expression node.
///
/// Variant order matters: the derived `Ord` sorts numbers before everything
/// else, which the constructors rely on when placing a `Mul` coefficient.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExprKind {
    Number(Rational),
    Symbol(Symbol),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Expr, Expr),
    Call(Func, Expr),
}

/// A canonical symbolic expression.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expr(Arc<ExprKind>);

impl Expr {
    #[inline]
    fn raw(kind: ExprKind) -> Self {
        Expr(Arc::new(kind))
    }

    /// The node kind.
    #[inline]
    pub fn kind(&self) -> &ExprKind {
        &self.0
    }

    pub fn number(value: Rational) -> Self {
        Expr::raw(ExprKind::Number(value))
    }

    pub fn int(value: i64) -> Self {
        Expr::number(Rational::from(value))
    }

    /// `num / den`, or `None` if `den` is zero.
    pub fn ratio(num: i64, den: i64) -> Option<Self> {
        Rational::new(i128::from(num), i128::from(den)).map(Expr::number)
    }

    pub fn zero() -> Self {
        Expr::number(Rational::ZERO)
    }

    pub fn one() -> Self {
        Expr::number(Rational::ONE)
    }

    /// A fresh symbol expression.
    pub fn symbol(name: impl AsRef<str>) -> Self {
        Expr::raw(ExprKind::Symbol(Symbol::new(name)))
    }

    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<Rational> {
        match self.kind() {
            ExprKind::Number(r) => Some(*r),
            _ => None,
        }
    }

    /// The symbol, if this is a bare symbol.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self.kind() {
            ExprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        matches!(self.kind(), ExprKind::Number(r) if r.is_zero())
    }

    #[inline]
    pub fn is_one(&self) -> bool {
        matches!(self.kind(), ExprKind::Number(r) if r.is_one())
    }

    /// Numbers and symbols.
    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self.kind(), ExprKind::Number(_) | ExprKind::Symbol(_))
    }

    /// Direct children, in canonical order.
    pub fn children(&self) -> Vec<&Expr> {
        match self.kind() {
            ExprKind::Number(_) | ExprKind::Symbol(_) => Vec::new(),
            ExprKind::Add(items) | ExprKind::Mul(items) => items.iter().collect(),
            ExprKind::Pow(base, exp) => vec![base, exp],
            ExprKind::Call(_, arg) => vec![arg],
        }
    }

    /// Canonical sum.
    pub fn add_all<I: IntoIterator<Item = Expr>>(terms: I) -> Expr {
        let mut constant = Rational::ZERO;
        let mut collected: BTreeMap<Expr, Rational> = BTreeMap::new();
        let mut pending: Vec<Expr> = terms.into_iter().collect();

        while let Some(term) = pending.pop() {
            match term.kind() {
                ExprKind::Number(r) => constant = constant + *r,
                ExprKind::Add(inner) => pending.extend(inner.iter().cloned()),
                _ => {
                    let (coeff, rest) = split_coefficient(&term);
                    let slot = collected.entry(rest).or_insert(Rational::ZERO);
                    *slot = *slot + coeff;
                }
            }
        }

        let mut out: Vec<Expr> = collected
            .into_iter()
            .filter(|(_, coeff)| !coeff.is_zero())
            .map(|(rest, coeff)| with_coefficient(coeff, rest))
            .collect();
        out.sort();
        if !constant.is_zero() {
            out.push(Expr::number(constant));
        }

        match out.len() {
            0 => Expr::zero(),
            1 => out.swap_remove(0),
            _ => Expr::raw(ExprKind::Add(out)),
        }
    }

    /// Canonical product.
    pub fn mul_all<I: IntoIterator<Item = Expr>>(factors: I) -> Expr {
        let mut coeff = Rational::ONE;
        let mut powers: BTreeMap<Expr, Vec<Expr>> = BTreeMap::new();
        let mut pending: Vec<Expr> = factors.into_iter().collect();

        while let Some(factor) = pending.pop() {
            match factor.kind() {
                ExprKind::Number(r) => {
                    if r.is_zero() {
                        return Expr::zero();
                    }
                    coeff = coeff * *r;
                }
                ExprKind::Mul(inner) => pending.extend(inner.iter().cloned()),
                ExprKind::Pow(base, exp) => powers.entry(base.clone()).or_default().push(exp.clone()),
                _ => powers.entry(factor.clone()).or_default().push(Expr::one()),
            }
        }

        let mut out = Vec::with_capacity(powers.len() + 1);
        for (base, exps) in powers {
            let merged = Expr::pow(&base, &Expr::add_all(exps));
            match merged.kind() {
                ExprKind::Number(r) => {
                    if r.is_zero() {
                        return Expr::zero();
                    }
                    coeff = coeff * *r;
                }
                ExprKind::Mul(inner) => {
                    for f in inner {
                        match f.kind() {
                            ExprKind::Number(r) => coeff = coeff * *r,
                            _ => out.push(f.clone()),
                        }
                    }
                }
                _ => out.push(merged),
            }
        }

        if coeff.is_zero() {
            return Expr::zero();
        }
        out.sort();
        if out.is_empty() {
            return Expr::number(coeff);
        }
        if coeff.is_one() {
            if out.len() == 1 {
                return out.swap_remove(0);
            }
        } else {
            out.insert(0, Expr::number(coeff));
        }
        Expr::raw(ExprKind::Mul(out))
    }

    /// Canonical power `base ^ exp`.
    pub fn pow(base: &Expr, exp: &Expr) -> Expr {
        if let Some(e) = exp.as_number() {
            if e.is_zero() {
                return Expr::one();
            }
            if e.is_one() {
                return base.clone();
            }
            if let Some(b) = base.as_number() {
                if b.is_one() {
                    return Expr::one();
                }
                if b.is_zero() && !e.is_negative() {
                    return Expr::zero();
                }
                if let Some(folded) = e.as_integer().and_then(|n| b.pow(n)) {
                    return Expr::number(folded);
                }
            }
            if e.is_integer() {
                if let ExprKind::Pow(inner_base, inner_exp) = base.kind() {
                    return Expr::pow(inner_base, &Expr::mul_all([inner_exp.clone(), exp.clone()]));
                }
            }
        }
        Expr::raw(ExprKind::Pow(base.clone(), exp.clone()))
    }

    /// Canonical function application.
    pub fn call(func: Func, arg: &Expr) -> Expr {
        if let Some(value) = arg.as_number() {
            match func {
                Func::Sin | Func::Tan if value.is_zero() => return Expr::zero(),
                Func::Cos | Func::Exp if value.is_zero() => return Expr::one(),
                Func::Log if value.is_one() => return Expr::zero(),
                Func::Abs => {
                    return Expr::number(if value.is_negative() { -value } else { value });
                }
                _ => {}
            }
        }
        Expr::raw(ExprKind::Call(func, arg.clone()))
    }

    /// `self ^ n` for an integer exponent.
    pub fn powi(&self, n: i64) -> Expr {
        Expr::pow(self, &Expr::int(n))
    }

    /// `1 / self`.
    pub fn recip(&self) -> Expr {
        self.powi(-1)
    }

    pub fn sqrt(&self) -> Expr {
        Expr::pow(self, &Expr::number(Rational::HALF))
    }

    pub fn sin(&self) -> Expr {
        Expr::call(Func::Sin, self)
    }

    pub fn cos(&self) -> Expr {
        Expr::call(Func::Cos, self)
    }

    pub fn tan(&self) -> Expr {
        Expr::call(Func::Tan, self)
    }

    pub fn exp(&self) -> Expr {
        Expr::call(Func::Exp, self)
    }

    pub fn log(&self) -> Expr {
        Expr::call(Func::Log, self)
    }

    pub fn abs(&self) -> Expr {
        Expr::call(Func::Abs, self)
    }

    /// Number of operation nodes, a rough cost measure for generated code.
    pub fn count_ops(&self) -> usize {
        match self.kind() {
            ExprKind::Number(_) | ExprKind::Symbol(_) => 0,
            ExprKind::Add(items) | ExprKind::Mul(items) => {
                items.len() - 1 + items.iter().map(Expr::count_ops).sum::<usize>()
            }
            ExprKind::Pow(base, exp) => 1 + base.count_ops() + exp.count_ops(),
            ExprKind::Call(_, arg) => 1 + arg.count_ops(),
        }
    }
}

/// Split a non-numeric term into its numeric coefficient and the rest.
fn split_coefficient(term: &Expr) -> (Rational, Expr) {
    if let ExprKind::Mul(factors) = term.kind() {
        if let Some(coeff) = factors[0].as_number() {
            let rest = if factors.len() == 2 {
                factors[1].clone()
            } else {
                Expr::raw(ExprKind::Mul(factors[1..].to_vec()))
            };
            return (coeff, rest);
        }
    }
    (Rational::ONE, term.clone())
}

/// Inverse of [`split_coefficient`]; `rest` is already canonical.
fn with_coefficient(coeff: Rational, rest: Expr) -> Expr {
    if coeff.is_one() {
        return rest;
    }
    let factors = match rest.kind() {
        ExprKind::Mul(inner) => {
            let mut factors = Vec::with_capacity(inner.len() + 1);
            factors.push(Expr::number(coeff));
            factors.extend(inner.iter().cloned());
            factors
        }
        _ => vec![Expr::number(coeff), rest],
    };
    Expr::raw(ExprKind::Mul(factors))
}

fn add_pair(a: &Expr, b: &Expr) -> Expr {
    Expr::add_all([a.clone(), b.clone()])
}

fn sub_pair(a: &Expr, b: &Expr) -> Expr {
    Expr::add_all([a.clone(), Expr::mul_all([Expr::int(-1), b.clone()])])
}

fn mul_pair(a: &Expr, b: &Expr) -> Expr {
    Expr::mul_all([a.clone(), b.clone()])
}

fn div_pair(a: &Expr, b: &Expr) -> Expr {
    Expr::mul_all([a.clone(), b.recip()])
}

macro_rules! impl_binary_op {
    ($op:ident, $method:ident, $build:ident) => {
        impl std::ops::$op<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $build(&self, &rhs)
            }
        }

        impl std::ops::$op<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $build(&self, rhs)
            }
        }

        impl std::ops::$op<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $build(self, &rhs)
            }
        }

        impl std::ops::$op<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $build(self, rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, add_pair);
impl_binary_op!(Sub, sub, sub_pair);
impl_binary_op!(Mul, mul, mul_pair);
impl_binary_op!(Div, div, div_pair);

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::mul_all([Expr::int(-1), self])
    }
}

impl std::ops::Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::mul_all([Expr::int(-1), self.clone()])
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::int(value)
    }
}

impl From<Rational> for Expr {
    fn from(value: Rational) -> Self {
        Expr::number(value)
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::raw(ExprKind::Symbol(symbol))
    }
}

impl std::iter::Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        Expr::add_all(iter)
    }
}

impl std::iter::Product for Expr {
    fn product<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        Expr::mul_all(iter)
    }
}

// Display: sympy-like infix text, used for docs, logs and test assertions.

fn is_negative_term(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::Number(r) => r.is_negative(),
        ExprKind::Mul(factors) => factors[0].as_number().is_some_and(Rational::is_negative),
        _ => false,
    }
}

fn needs_parens_in_product(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::Add(_) => true,
        ExprKind::Number(r) => !r.is_integer() || r.is_negative(),
        _ => false,
    }
}

fn needs_parens_as_power_operand(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::Symbol(_) | ExprKind::Call(..) => false,
        ExprKind::Number(r) => !r.is_integer() || r.is_negative(),
        _ => true,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Number(r) => write!(f, "{r}"),
            ExprKind::Symbol(s) => write!(f, "{s}"),
            ExprKind::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    let negative = is_negative_term(term);
                    match (i, negative) {
                        (0, true) => f.write_str("-")?,
                        (0, false) => {}
                        (_, true) => f.write_str(" - ")?,
                        (_, false) => f.write_str(" + ")?,
                    }
                    if negative {
                        write!(f, "{}", -term)?;
                    } else {
                        write!(f, "{term}")?;
                    }
                }
                Ok(())
            }
            ExprKind::Mul(factors) => {
                let mut rest = factors.as_slice();
                if let Some(coeff) = factors[0].as_number() {
                    rest = &factors[1..];
                    if coeff == Rational::MINUS_ONE {
                        f.write_str("-")?;
                    } else if coeff.is_negative() && coeff.is_integer() {
                        write!(f, "{coeff}*")?;
                    } else {
                        write!(f, "{}*", ParenIf(&factors[0], needs_parens_in_product(&factors[0])))?;
                    }
                }
                for (i, factor) in rest.iter().enumerate() {
                    if i > 0 {
                        f.write_str("*")?;
                    }
                    write!(f, "{}", ParenIf(factor, needs_parens_in_product(factor)))?;
                }
                Ok(())
            }
            ExprKind::Pow(base, exp) => write!(
                f,
                "{}**{}",
                ParenIf(base, needs_parens_as_power_operand(base)),
                ParenIf(exp, needs_parens_as_power_operand(exp))
            ),
            ExprKind::Call(func, arg) => write!(f, "{}({arg})", func.name()),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

struct ParenIf<'a>(&'a Expr, bool);

impl fmt::Display for ParenIf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.1 {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}
