//! Geometric values: quaternions, rotations, poses.
//!
//! All types store plain expressions and expose their flattened storage in a
//! fixed order. `Rot3` and `Pose3` additionally carry a tangent space (see
//! [`crate::ops::LieGroupOps`]); `Quaternion` and `DualQuaternion` are group
//! values only.

use crate::expr::Expr;
use crate::matrix::{Matrix, ShapeError};
use crate::rational::Rational;

/// Hamilton quaternion, storage `[x, y, z, w]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quaternion {
    pub x: Expr,
    pub y: Expr,
    pub z: Expr,
    pub w: Expr,
}

impl Quaternion {
    pub const STORAGE_DIM: usize = 4;

    pub fn new(x: Expr, y: Expr, z: Expr, w: Expr) -> Self {
        Quaternion { x, y, z, w }
    }

    /// Quaternion of symbols `name.x`, `name.y`, `name.z`, `name.w`.
    pub fn symbolic(name: &str) -> Self {
        Quaternion {
            x: Expr::symbol(format!("{name}.x")),
            y: Expr::symbol(format!("{name}.y")),
            z: Expr::symbol(format!("{name}.z")),
            w: Expr::symbol(format!("{name}.w")),
        }
    }

    pub fn identity() -> Self {
        Quaternion::new(Expr::zero(), Expr::zero(), Expr::zero(), Expr::one())
    }

    /// Hamilton product `self ⊗ other`.
    pub fn compose(&self, other: &Quaternion) -> Quaternion {
        let (a, b) = (self, other);
        Quaternion {
            x: &a.w * &b.x + &a.x * &b.w + &a.y * &b.z - &a.z * &b.y,
            y: &a.w * &b.y - &a.x * &b.z + &a.y * &b.w + &a.z * &b.x,
            z: &a.w * &b.z + &a.x * &b.y - &a.y * &b.x + &a.z * &b.w,
            w: &a.w * &b.w - &a.x * &b.x - &a.y * &b.y - &a.z * &b.z,
        }
    }

    /// Conjugate; the inverse for unit quaternions.
    pub fn conj(&self) -> Quaternion {
        Quaternion {
            x: -&self.x,
            y: -&self.y,
            z: -&self.z,
            w: self.w.clone(),
        }
    }

    pub fn squared_norm(&self) -> Expr {
        Expr::add_all([self.x.powi(2), self.y.powi(2), self.z.powi(2), self.w.powi(2)])
    }

    pub fn to_storage(&self) -> Vec<Expr> {
        vec![self.x.clone(), self.y.clone(), self.z.clone(), self.w.clone()]
    }

    /// Rebuild from `[x, y, z, w]`. `None` on a length mismatch.
    pub fn from_storage(storage: &[Expr]) -> Option<Self> {
        match storage {
            [x, y, z, w] => Some(Quaternion::new(x.clone(), y.clone(), z.clone(), w.clone())),
            _ => None,
        }
    }
}

/// Dual quaternion `real + ε·inf`, storage `[real, inf]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DualQuaternion {
    pub real: Quaternion,
    pub inf: Quaternion,
}

impl DualQuaternion {
    pub const STORAGE_DIM: usize = 8;

    pub fn symbolic(name: &str) -> Self {
        DualQuaternion {
            real: Quaternion::symbolic(&format!("{name}.real_q")),
            inf: Quaternion::symbolic(&format!("{name}.inf_q")),
        }
    }

    pub fn compose(&self, other: &DualQuaternion) -> DualQuaternion {
        let a = self.real.compose(&other.inf);
        let b = self.inf.compose(&other.real);
        DualQuaternion {
            real: self.real.compose(&other.real),
            inf: Quaternion {
                x: a.x + b.x,
                y: a.y + b.y,
                z: a.z + b.z,
                w: a.w + b.w,
            },
        }
    }

    pub fn to_storage(&self) -> Vec<Expr> {
        let mut out = self.real.to_storage();
        out.extend(self.inf.to_storage());
        out
    }
}

/// 3D rotation, stored as a unit quaternion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rot3 {
    pub q: Quaternion,
}

impl Rot3 {
    pub const STORAGE_DIM: usize = 4;
    pub const TANGENT_DIM: usize = 3;

    pub fn from_quaternion(q: Quaternion) -> Self {
        Rot3 { q }
    }

    pub fn symbolic(name: &str) -> Self {
        Rot3 {
            q: Quaternion::symbolic(name),
        }
    }

    pub fn identity() -> Self {
        Rot3 {
            q: Quaternion::identity(),
        }
    }

    pub fn compose(&self, other: &Rot3) -> Rot3 {
        Rot3 {
            q: self.q.compose(&other.q),
        }
    }

    pub fn inverse(&self) -> Rot3 {
        Rot3 { q: self.q.conj() }
    }

    /// Rotation matrix of the (assumed unit) quaternion.
    pub fn to_rotation_matrix(&self) -> Matrix {
        let Quaternion { x, y, z, w } = &self.q;
        let two = Expr::int(2);
        let one = Expr::one();
        let entries = [
            [
                &one - &two * (y.powi(2) + z.powi(2)),
                &two * (x * y - z * w),
                &two * (x * z + y * w),
            ],
            [
                &two * (x * y + z * w),
                &one - &two * (x.powi(2) + z.powi(2)),
                &two * (y * z - x * w),
            ],
            [
                &two * (x * z - y * w),
                &two * (y * z + x * w),
                &one - &two * (x.powi(2) + y.powi(2)),
            ],
        ];
        Matrix::from_fn(3, 3, |i, j| entries[i][j].clone())
    }

    /// Rotate a 3-vector.
    pub fn rotate(&self, point: &Matrix) -> Result<Matrix, ShapeError> {
        self.to_rotation_matrix().matmul(point)
    }

    pub fn to_storage(&self) -> Vec<Expr> {
        self.q.to_storage()
    }

    /// `∂storage/∂tangent` at this rotation for the right retraction
    /// `q ⊗ exp(v)`, a 4x3 matrix.
    pub fn storage_d_tangent(&self) -> Matrix {
        let Quaternion { x, y, z, w } = &self.q;
        let rows = [
            [w.clone(), -z, y.clone()],
            [z.clone(), w.clone(), -x],
            [-y, x.clone(), w.clone()],
            [-x, -y, -z],
        ];
        let half = Expr::number(Rational::HALF);
        Matrix::from_fn(4, 3, |i, j| &rows[i][j] * &half)
    }

    /// `∂tangent/∂storage`, the 3x4 pseudo-inverse of
    /// [`Rot3::storage_d_tangent`] for unit quaternions.
    pub fn tangent_d_storage(&self) -> Matrix {
        self.storage_d_tangent().transpose().scale(&Expr::int(4))
    }
}

/// Rigid transform in 3D, storage `[qx, qy, qz, qw, tx, ty, tz]`.
///
/// Tangent vectors are `[ω, δt]`; retraction perturbs the rotation on the
/// right and adds `δt` to the translation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pose3 {
    pub rotation: Rot3,
    pub position: Matrix,
}

impl Pose3 {
    pub const STORAGE_DIM: usize = 7;
    pub const TANGENT_DIM: usize = 6;

    pub fn new(rotation: Rot3, position: Matrix) -> Result<Self, ShapeError> {
        if position.shape() != (3, 1) {
            return Err(ShapeError {
                operation: "pose3",
                left: (3, 1),
                right: position.shape(),
            });
        }
        Ok(Pose3 { rotation, position })
    }

    /// Rotation symbols `name.R.{x,y,z,w}`, translation `name.t0..t2`.
    pub fn symbolic(name: &str) -> Self {
        Pose3 {
            rotation: Rot3::symbolic(&format!("{name}.R")),
            position: Matrix::symbolic(&format!("{name}.t"), 3, 1),
        }
    }

    pub fn identity() -> Self {
        Pose3 {
            rotation: Rot3::identity(),
            position: Matrix::zeros(3, 1),
        }
    }

    pub fn compose(&self, other: &Pose3) -> Result<Pose3, ShapeError> {
        let moved = self.rotation.rotate(&other.position)?;
        Ok(Pose3 {
            rotation: self.rotation.compose(&other.rotation),
            position: self.position.add(&moved)?,
        })
    }

    pub fn inverse(&self) -> Result<Pose3, ShapeError> {
        let rotation = self.rotation.inverse();
        let position = rotation.rotate(&self.position)?.scale(&Expr::int(-1));
        Ok(Pose3 { rotation, position })
    }

    /// Map a point from this pose's frame into the parent frame.
    pub fn transform_point(&self, point: &Matrix) -> Result<Matrix, ShapeError> {
        self.rotation.rotate(point)?.add(&self.position)
    }

    pub fn to_storage(&self) -> Vec<Expr> {
        let mut out = self.rotation.to_storage();
        out.extend(self.position.to_storage());
        out
    }

    pub fn storage_d_tangent(&self) -> Matrix {
        Matrix::block_diag(&[self.rotation.storage_d_tangent(), Matrix::identity(3)])
    }

    pub fn tangent_d_storage(&self) -> Matrix {
        Matrix::block_diag(&[self.rotation.tangent_d_storage(), Matrix::identity(3)])
    }
}
