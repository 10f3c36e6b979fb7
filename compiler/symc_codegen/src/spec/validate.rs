//! Contract checks run when a specification is built.
//!
//! Checks run in a fixed order so that the reported violation is
//! deterministic when several invariants are broken at once.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use symc_ir::{Symbol, Value, Values};

use crate::docstring::is_identifier;
use crate::error::{ContractViolation, Result};
use crate::jacobian::storage_symbols;

pub(crate) fn check_contract(inputs: &Values, outputs: &Values) -> Result<()> {
    check_identifiers(inputs)?;
    check_identifiers(outputs)?;
    for (key, value) in inputs.iter().chain(outputs.iter()) {
        check_sequences(key, value)?;
    }
    let declared = check_input_symbols(inputs)?;
    check_disjoint_keys(inputs, outputs)?;
    check_declared(outputs, &declared)?;
    Ok(())
}

/// Keys must be identifiers at every nesting level, including aggregates
/// held inside sequences.
fn check_identifiers(values: &Values) -> Result<()> {
    for (key, value) in values.iter() {
        if !is_identifier(key) {
            return Err(ContractViolation::InvalidIdentifier { key: key.to_owned() }.into());
        }
        check_nested_identifiers(value)?;
    }
    Ok(())
}

fn check_nested_identifiers(value: &Value) -> Result<()> {
    match value {
        Value::Values(nested) => check_identifiers(nested),
        Value::Sequence(items) => items.iter().try_for_each(check_nested_identifiers),
        _ => Ok(()),
    }
}

fn check_sequences(key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Sequence(items) => {
            let Some(first) = items.first() else {
                return Err(ContractViolation::EmptySequence { key: key.to_owned() }.into());
            };
            let shape = first.shape();
            if items.iter().any(|item| item.shape() != shape) {
                return Err(ContractViolation::HeterogeneousSequence { key: key.to_owned() }.into());
            }
            items.iter().try_for_each(|item| check_sequences(key, item))
        }
        Value::Values(nested) => nested
            .iter()
            .try_for_each(|(inner, v)| check_sequences(&format!("{key}.{inner}"), v)),
        _ => Ok(()),
    }
}

/// Every input slot is a bare symbol and no symbol is used twice. Returns
/// the declared symbol set.
fn check_input_symbols(inputs: &Values) -> Result<FxHashSet<Symbol>> {
    let mut declared = FxHashSet::default();
    let mut duplicated = BTreeSet::new();
    for (key, value) in inputs.iter() {
        for symbol in storage_symbols(key, value)? {
            if !declared.insert(symbol.clone()) {
                duplicated.insert(symbol.name().to_owned());
            }
        }
    }
    if !duplicated.is_empty() {
        return Err(ContractViolation::DuplicateInputSymbols {
            symbols: duplicated.into_iter().collect(),
        }
        .into());
    }
    Ok(declared)
}

fn check_disjoint_keys(inputs: &Values, outputs: &Values) -> Result<()> {
    let keys: Vec<String> = outputs
        .keys()
        .filter(|key| inputs.contains_key(key))
        .map(str::to_owned)
        .collect();
    if keys.is_empty() {
        Ok(())
    } else {
        Err(ContractViolation::OverlappingKeys { keys }.into())
    }
}

fn check_declared(outputs: &Values, declared: &FxHashSet<Symbol>) -> Result<()> {
    let symbols: Vec<String> = outputs
        .free_symbols()
        .into_iter()
        .filter(|s| !declared.contains(s))
        .map(|s| s.name().to_owned())
        .collect();
    if symbols.is_empty() {
        Ok(())
    } else {
        Err(ContractViolation::UndeclaredSymbols { symbols }.into())
    }
}
