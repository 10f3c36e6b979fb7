//! Manifold operations keyed by value type.
//!
//! Differentiation needs, for every value it touches, the tangent dimension
//! and the two storage/tangent jacobians at the value's current point. Vector
//! spaces (scalars, matrices and aggregates of them) have identity
//! jacobians. Group-only types (`Quaternion`, `DualQuaternion`) have no
//! tangent space and report [`MissingCapability`].

use std::fmt;

use crate::geo::{Pose3, Rot3};
use crate::matrix::Matrix;
use crate::value::Value;

/// A value's type lacks an operation the caller needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCapability {
    pub type_name: String,
    pub operation: &'static str,
}

impl fmt::Display for MissingCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type `{}` does not support `{}`", self.type_name, self.operation)
    }
}

impl std::error::Error for MissingCapability {}

/// Tangent-space operations of a Lie group.
pub trait LieGroupOps {
    fn tangent_dim(&self) -> usize;

    /// `∂storage/∂tangent` at this element, `storage_dim x tangent_dim`.
    fn storage_d_tangent(&self) -> Matrix;

    /// `∂tangent/∂storage` at this element, `tangent_dim x storage_dim`.
    fn tangent_d_storage(&self) -> Matrix;
}

impl LieGroupOps for Rot3 {
    fn tangent_dim(&self) -> usize {
        Rot3::TANGENT_DIM
    }

    fn storage_d_tangent(&self) -> Matrix {
        Rot3::storage_d_tangent(self)
    }

    fn tangent_d_storage(&self) -> Matrix {
        Rot3::tangent_d_storage(self)
    }
}

impl LieGroupOps for Pose3 {
    fn tangent_dim(&self) -> usize {
        Pose3::TANGENT_DIM
    }

    fn storage_d_tangent(&self) -> Matrix {
        Pose3::storage_d_tangent(self)
    }

    fn tangent_d_storage(&self) -> Matrix {
        Pose3::tangent_d_storage(self)
    }
}

fn missing(value: &Value, operation: &'static str) -> MissingCapability {
    MissingCapability {
        type_name: value.type_name(),
        operation,
    }
}

impl Value {
    /// Whether storage and tangent coordinates coincide.
    pub fn is_vector_space(&self) -> bool {
        match self {
            Value::Scalar(_) | Value::Matrix(_) => true,
            Value::Quaternion(_) | Value::DualQuaternion(_) | Value::Rot3(_) | Value::Pose3(_) => false,
            Value::Sequence(items) => items.iter().all(Value::is_vector_space),
            Value::Values(values) => values.values().all(Value::is_vector_space),
        }
    }

    pub fn tangent_dim(&self) -> Result<usize, MissingCapability> {
        match self {
            Value::Scalar(_) | Value::Matrix(_) => Ok(self.storage_dim()),
            Value::Rot3(r) => Ok(r.tangent_dim()),
            Value::Pose3(p) => Ok(p.tangent_dim()),
            Value::Quaternion(_) | Value::DualQuaternion(_) => Err(missing(self, "tangent_dim")),
            Value::Sequence(items) => items.iter().map(Value::tangent_dim).sum(),
            Value::Values(values) => values.values().map(Value::tangent_dim).sum(),
        }
    }

    pub fn storage_d_tangent(&self) -> Result<Matrix, MissingCapability> {
        self.tangent_block(|v: &dyn LieGroupOps| v.storage_d_tangent(), "storage_D_tangent")
    }

    pub fn tangent_d_storage(&self) -> Result<Matrix, MissingCapability> {
        self.tangent_block(|v: &dyn LieGroupOps| v.tangent_d_storage(), "tangent_D_storage")
    }

    /// Shared dispatch for the two jacobians: identity on vector spaces,
    /// the group's own block on `Rot3`/`Pose3`, block-diagonal assembly on
    /// containers.
    fn tangent_block(
        &self,
        group: fn(&dyn LieGroupOps) -> Matrix,
        operation: &'static str,
    ) -> Result<Matrix, MissingCapability> {
        match self {
            Value::Scalar(_) | Value::Matrix(_) => Ok(Matrix::identity(self.storage_dim())),
            Value::Rot3(r) => Ok(group(r)),
            Value::Pose3(p) => Ok(group(p)),
            Value::Quaternion(_) | Value::DualQuaternion(_) => Err(missing(self, operation)),
            Value::Sequence(items) => {
                let blocks = items
                    .iter()
                    .map(|v| v.tangent_block(group, operation))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Matrix::block_diag(&blocks))
            }
            Value::Values(values) => {
                let blocks = values
                    .values()
                    .map(|v| v.tangent_block(group, operation))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Matrix::block_diag(&blocks))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::geo::{DualQuaternion, Quaternion};
    use crate::value::Values;
    use pretty_assertions::assert_eq;

    #[test]
    fn vector_spaces_are_identity() {
        let v = Value::Matrix(Matrix::symbolic("v", 3, 1));
        assert!(v.is_vector_space());
        assert_eq!(v.tangent_dim(), Ok(3));
        assert_eq!(v.storage_d_tangent(), Ok(Matrix::identity(3)));
    }

    #[test]
    fn group_only_types_lack_tangent_ops() {
        let q = Value::Quaternion(Quaternion::symbolic("q"));
        let err = q.tangent_dim();
        assert_eq!(
            err,
            Err(MissingCapability {
                type_name: "Quaternion".to_owned(),
                operation: "tangent_dim",
            })
        );
        let d = Value::DualQuaternion(DualQuaternion::symbolic("d"));
        assert!(d.tangent_d_storage().is_err());
    }

    #[test]
    fn aggregates_assemble_block_diagonal() {
        let values = Values::new()
            .with("a", Expr::symbol("a"))
            .with("pose", Pose3::symbolic("pose"));
        let v = Value::Values(values);
        assert_eq!(v.tangent_dim(), Ok(7));
        let sdt = v.storage_d_tangent();
        assert_eq!(sdt.as_ref().map(Matrix::shape), Ok((8, 7)));
        assert!(!v.is_vector_space());
    }

    #[test]
    fn missing_capability_propagates_from_nested_values() {
        let values = Values::new().with("q", Quaternion::symbolic("q"));
        let seq = Value::Sequence(vec![Value::Values(values)]);
        assert!(seq.storage_d_tangent().is_err());
    }
}
