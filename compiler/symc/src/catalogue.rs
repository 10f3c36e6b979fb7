//! Built-in functions generated by `symc generate`.
//!
//! Each entry builds its specification for a given backend. The entries
//! cover a plain scalar function, a linearized residual, a function with
//! jacobians, and two functions sharing the `state_t` composite type.

use symc_codegen::{
    BackendConfig, Codegen, FunctionOutput, InputType, JacobianOptions, LinearizationOptions,
    Result,
};
use symc_ir::{Expr, Matrix, Values};

/// One catalogue function.
pub struct Entry {
    pub name: &'static str,
    pub summary: &'static str,
    builder: fn(&BackendConfig) -> Result<Codegen>,
}

impl Entry {
    pub fn build(&self, config: &BackendConfig) -> Result<Codegen> {
        (self.builder)(config)
    }
}

pub const CATALOGUE: &[Entry] = &[
    Entry {
        name: "product",
        summary: "z = x * y",
        builder: product,
    },
    Entry {
        name: "pose_prior_factor",
        summary: "Gauss-Newton linearization of a weighted pose prior",
        builder: pose_prior_factor,
    },
    Entry {
        name: "between_factor_with_jacobians",
        summary: "relative pose a^-1 * b with jacobians wrt both poses",
        builder: between_factor,
    },
    Entry {
        name: "predict_position",
        summary: "position advanced by the state velocity",
        builder: predict_position,
    },
    Entry {
        name: "state_speed",
        summary: "norm of the state velocity",
        builder: state_speed,
    },
];

pub fn find(name: &str) -> Option<&'static Entry> {
    CATALOGUE.iter().find(|entry| entry.name == name)
}

fn product(config: &BackendConfig) -> Result<Codegen> {
    let x = Expr::symbol("x");
    let y = Expr::symbol("y");
    let inputs = Values::new().with("x", x.clone()).with("y", y.clone());
    Codegen::builder(inputs, Values::new().with("z", &x * &y), config.clone())
        .name("product")
        .return_key("z")
        .build()
}

/// Rotation error `2 * vec(prior.R^-1 * pose.R)` stacked over the
/// translation error, both divided by `sigma`.
fn pose_prior_factor(config: &BackendConfig) -> Result<Codegen> {
    let residual = Codegen::function("pose_prior_residual", config.clone())
        .arg("pose", InputType::Pose3)
        .arg("prior", InputType::Pose3)
        .arg("sigma", InputType::Scalar)
        .build(|args| {
            let pose = args.pose3("pose")?;
            let prior = args.pose3("prior")?;
            let weight = args.scalar("sigma")?.recip();

            let error = prior.rotation.inverse().compose(&pose.rotation);
            let two = Expr::int(2);
            let mut residual = vec![&error.q.x * &two, &error.q.y * &two, &error.q.z * &two];
            residual.extend(pose.position.sub(&prior.position)?.to_storage());
            Ok(FunctionOutput::Sequence(
                residual.iter().map(|r| r * &weight).collect(),
            ))
        })?;
    residual.with_linearization(LinearizationOptions {
        which_args: Some(vec!["pose".to_owned()]),
        ..LinearizationOptions::default()
    })
}

fn between_factor(config: &BackendConfig) -> Result<Codegen> {
    let between = Codegen::function("between_factor", config.clone())
        .arg("a", InputType::Pose3)
        .arg("b", InputType::Pose3)
        .build(|args| {
            let a = args.pose3("a")?;
            let b = args.pose3("b")?;
            Ok(FunctionOutput::Single(a.inverse()?.compose(b)?.into()))
        })?;
    between.with_jacobians(JacobianOptions::default())
}

/// Symbolic `state` aggregate: time `t` and velocity `v`.
fn state() -> Values {
    Values::new()
        .with("t", Expr::symbol("state.t"))
        .with("v", Matrix::symbolic("state.v", 3, 1))
}

fn predict_position(config: &BackendConfig) -> Result<Codegen> {
    let dt = Expr::symbol("dt");
    let position = Matrix::symbolic("position", 3, 1);
    let velocity = Matrix::symbolic("state.v", 3, 1);
    let predicted = position.add(&velocity.scale(&dt))?;
    let inputs = Values::new()
        .with("state", state())
        .with("position", position)
        .with("dt", dt);
    Codegen::builder(inputs, Values::new().with("predicted", predicted), config.clone())
        .name("predict_position")
        .return_key("predicted")
        .build()
}

fn state_speed(config: &BackendConfig) -> Result<Codegen> {
    let velocity = Matrix::symbolic("state.v", 3, 1);
    let speed = Expr::add_all(velocity.to_storage().iter().map(|v| v.powi(2))).sqrt();
    Codegen::builder(
        Values::new().with("state", state()),
        Values::new().with("speed", speed),
        config.clone(),
    )
    .name("state_speed")
    .return_key("speed")
    .docstring("Euclidean norm of the state velocity.")
    .build()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use symc_ir::Value;

    #[test]
    fn entries_build_under_their_catalogue_name() {
        for kind in BackendConfig::KINDS {
            let config = BackendConfig::from_kind(kind).unwrap();
            for entry in CATALOGUE {
                let spec = entry.build(&config).unwrap();
                assert_eq!(spec.name(), Some(entry.name));
                assert_eq!(spec.config(), &config);
            }
        }
    }

    #[test]
    fn pose_prior_is_fully_linearized() {
        let spec = find("pose_prior_factor")
            .unwrap()
            .build(&BackendConfig::default())
            .unwrap();
        let keys: Vec<&str> = spec.outputs().keys().collect();
        assert_eq!(keys, ["res", "jacobian", "hessian", "rhs"]);
        let shape = |key| spec.outputs().get(key).and_then(Value::as_matrix).map(Matrix::shape);
        assert_eq!(shape("jacobian"), Some((6, 6)));
        assert_eq!(shape("hessian"), Some((6, 6)));
        assert_eq!(shape("rhs"), Some((6, 1)));
    }

    #[test]
    fn between_factor_has_one_jacobian_per_pose() {
        let spec = find("between_factor_with_jacobians")
            .unwrap()
            .build(&BackendConfig::default())
            .unwrap();
        let keys: Vec<&str> = spec.outputs().keys().collect();
        assert_eq!(keys, ["res", "res_D_a", "res_D_b"]);
        assert_eq!(spec.return_key(), Some("res"));
    }

    #[test]
    fn unknown_names_are_not_found() {
        assert!(find("missing").is_none());
        assert_eq!(find("product").map(|e| e.summary), Some("z = x * y"));
    }
}
