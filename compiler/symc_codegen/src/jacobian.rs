//! Tangent-space jacobians.
//!
//! For a result `f` and an argument `x`, the jacobian in tangent space is
//!
//! ```text
//! J = f.tangent_D_storage · ∂storage(f)/∂storage(x) · x.storage_D_tangent
//! ```
//!
//! The outer factors are identities on vector spaces and are skipped there.

use symc_ir::{jacobian_of, Matrix, Symbol, Value};

use crate::error::{ContractViolation, Result};

/// Jacobians of `result` with respect to each `(name, value)` argument, in
/// argument order. Each block is `tangent_dim(result) x tangent_dim(arg)`.
pub fn tangent_jacobians(result: &Value, args: &[(&str, &Value)]) -> Result<Vec<Matrix>> {
    // Resolve every capability first so nothing is differentiated on failure.
    let result_d_storage = if result.is_vector_space() {
        None
    } else {
        Some(result.tangent_d_storage()?)
    };
    let mut arg_blocks = Vec::with_capacity(args.len());
    for (name, arg) in args {
        let symbols = storage_symbols(name, arg)?;
        let storage_d_tangent = if arg.is_vector_space() {
            None
        } else {
            Some(arg.storage_d_tangent()?)
        };
        arg_blocks.push((symbols, storage_d_tangent));
    }

    let result_storage = result.to_storage();
    let mut jacobians = Vec::with_capacity(args.len());
    for (symbols, storage_d_tangent) in arg_blocks {
        let mut jacobian = jacobian_of(&result_storage, &symbols);
        if let Some(left) = &result_d_storage {
            jacobian = left.matmul(&jacobian)?;
        }
        if let Some(right) = &storage_d_tangent {
            jacobian = jacobian.matmul(right)?;
        }
        jacobians.push(jacobian);
    }
    Ok(jacobians)
}

/// The symbols making up an argument's storage.
pub(crate) fn storage_symbols(name: &str, arg: &Value) -> Result<Vec<Symbol>> {
    arg.to_storage()
        .into_iter()
        .map(|slot| {
            slot.as_symbol().cloned().ok_or_else(|| {
                ContractViolation::NonSymbolInput {
                    key: name.to_owned(),
                    expr: slot.to_string(),
                }
                .into()
            })
        })
        .collect()
}
