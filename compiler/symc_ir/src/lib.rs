//! Symc IR - symbolic values for code generation
//!
//! This crate holds everything the code generator consumes:
//! - `Expr`: canonical symbolic expressions with exact rational constants
//! - `Matrix`: fixed-shape matrices of expressions
//! - Geometric values (`Quaternion`, `DualQuaternion`, `Rot3`, `Pose3`)
//! - `Value` / `Values`: typed values and ordered named aggregates
//! - `ValuesIndex`: structural layout descriptions
//! - `ops`: tangent-space operations used for differentiation
//!
//! # Canonical Forms
//!
//! Expressions are canonicalized on construction, so structural equality is
//! the equality used everywhere else (deduplication, validation, tests).

mod calculus;
mod expr;
mod geo;
mod index;
mod matrix;
pub mod ops;
mod rational;
mod symbol;
mod value;

pub use expr::{Expr, ExprKind, Func};
pub use geo::{DualQuaternion, Pose3, Quaternion, Rot3};
pub use index::{IndexEntry, Shape, ValuesIndex};
pub use matrix::{jacobian_of, Matrix, ShapeError};
pub use ops::{LieGroupOps, MissingCapability};
pub use rational::Rational;
pub use symbol::Symbol;
pub use value::{Value, Values};
