use super::*;
use crate::config::{BackendConfig, CppConfig};
use crate::error::CodegenError;
use pretty_assertions::assert_eq;
use symc_ir::{Expr, Pose3, Quaternion};

fn xyz() -> Values {
    Values::new()
        .with("x", Expr::symbol("x"))
        .with("y", Expr::symbol("y"))
        .with("z", Expr::symbol("z"))
}

fn product_spec(name: &str) -> Codegen {
    let outputs = Values::new().with(
        "res",
        Expr::symbol("x") * Expr::symbol("y") * Expr::symbol("z"),
    );
    Codegen::builder(xyz(), outputs, BackendConfig::default())
        .name(name)
        .build()
        .unwrap()
}

fn residual_spec(name: &str) -> Codegen {
    let pose = Pose3::symbolic("pose");
    let point = Matrix::column(vec![Expr::int(1), Expr::int(2), Expr::int(3)]);
    let r = pose.transform_point(&point).unwrap();
    Codegen::builder(
        Values::new().with("pose", pose),
        Values::new().with("r", r),
        BackendConfig::default(),
    )
    .name(name)
    .build()
    .unwrap()
}

fn two_output_spec() -> Codegen {
    let x = Expr::symbol("x");
    let y = Expr::symbol("y");
    let inputs = Values::new().with("x", x.clone()).with("y", y.clone());
    let outputs = Values::new().with("a", &x * &y).with("b", x.sin());
    Codegen::builder(inputs, outputs, BackendConfig::default())
        .name("f")
        .return_key("a")
        .build()
        .unwrap()
}

fn violation(result: Result<Codegen>) -> ContractViolation {
    match result {
        Err(CodegenError::ContractViolation(v)) => v,
        other => panic!("expected a contract violation, got {other:?}"),
    }
}

fn matrix_output<'a>(spec: &'a Codegen, key: &str) -> &'a Matrix {
    spec.outputs().get(key).and_then(Value::as_matrix).unwrap()
}

#[test]
fn full_linearization_of_pose_residual() {
    let spec = residual_spec("pose_prior_residual");
    let lin = spec
        .with_linearization(LinearizationOptions {
            which_args: Some(vec!["pose".to_owned()]),
            ..LinearizationOptions::default()
        })
        .unwrap();

    assert_eq!(lin.name(), Some("pose_prior_factor"));
    assert_eq!(lin.outputs().keys().collect::<Vec<_>>(), ["r", "jacobian", "hessian", "rhs"]);
    assert_eq!(lin.return_key(), None);

    let jacobian = matrix_output(&lin, "jacobian");
    let hessian = matrix_output(&lin, "hessian");
    let rhs = matrix_output(&lin, "rhs");
    assert_eq!(jacobian.shape(), (3, 6));
    assert_eq!(hessian.shape(), (6, 6));
    assert_eq!(rhs.shape(), (6, 1));

    let gram = jacobian.transpose().matmul(jacobian).unwrap();
    for i in 0..6 {
        for j in 0..6 {
            if j > i {
                assert!(hessian.get(i, j).is_zero(), "upper entry ({i}, {j}) was computed");
            } else {
                assert_eq!(hessian.get(i, j), gram.get(i, j));
            }
        }
    }
    let residual = matrix_output(&lin, "r");
    assert_eq!(rhs, &jacobian.transpose().matmul(residual).unwrap());

    assert_eq!(
        lin.docstring().entry("jacobian").map(|e| e.lines.clone()),
        Some(vec!["    jacobian: (3x6) jacobian of r wrt arg pose (6)".to_owned()])
    );
    assert_eq!(
        lin.docstring().entry("hessian").map(|e| e.lines.clone()),
        Some(vec!["    hessian: (6x6) Gauss-Newton hessian for arg pose (6)".to_owned()])
    );
}

#[test]
fn stacked_jacobian_without_result() {
    let spec = product_spec("f");
    let lin = spec
        .with_linearization(LinearizationOptions {
            which_args: Some(vec!["y".to_owned()]),
            include_result: false,
            mode: LinearizationMode::StackedJacobian,
            ..LinearizationOptions::default()
        })
        .unwrap();

    assert_eq!(lin.name(), Some("f_jacobian1"));
    assert_eq!(lin.outputs().keys().collect::<Vec<_>>(), ["jacobian"]);
    assert_eq!(lin.return_key(), Some("jacobian"));
    assert_eq!(
        matrix_output(&lin, "jacobian").get(0, 0),
        &(Expr::symbol("x") * Expr::symbol("z"))
    );
    assert!(lin.docstring().entry("res").is_none());
}

#[test]
fn stacked_names() {
    let spec = product_spec("f");
    let stacked = |args: Option<Vec<&str>>, include_result: bool| {
        spec.with_linearization(LinearizationOptions {
            which_args: args.map(|a| a.into_iter().map(str::to_owned).collect()),
            include_result,
            mode: LinearizationMode::StackedJacobian,
            ..LinearizationOptions::default()
        })
        .unwrap()
        .name()
        .map(str::to_owned)
    };
    assert_eq!(stacked(None, true).as_deref(), Some("f_with_jacobians"));
    assert_eq!(stacked(Some(vec!["z", "x"]), true).as_deref(), Some("f_with_jacobians20"));
    assert_eq!(stacked(Some(vec!["x"]), false).as_deref(), Some("f_jacobian0"));
}

#[test]
fn factor_naming_is_idempotent() {
    let options = || LinearizationOptions {
        which_args: Some(vec!["pose".to_owned()]),
        ..LinearizationOptions::default()
    };
    let once = residual_spec("prior_residual").with_linearization(options()).unwrap();
    assert_eq!(once.name(), Some("prior_factor"));
    let again = residual_spec("prior_factor").with_linearization(options()).unwrap();
    assert_eq!(again.name(), Some("prior_factor"));
    let plain = residual_spec("prior").with_linearization(options()).unwrap();
    assert_eq!(plain.name(), Some("prior_factor"));
}

#[test]
fn explicit_name_wins() {
    let lin = residual_spec("prior_residual")
        .with_linearization(LinearizationOptions {
            name: Some("custom".to_owned()),
            ..LinearizationOptions::default()
        })
        .unwrap();
    assert_eq!(lin.name(), Some("custom"));
}

#[test]
fn linearization_preconditions() {
    assert_eq!(
        violation(two_output_spec().with_linearization(LinearizationOptions::default())),
        ContractViolation::NotSingleOutput { count: 2 }
    );
    assert_eq!(
        violation(product_spec("f").with_linearization(LinearizationOptions {
            which_args: Some(Vec::new()),
            ..LinearizationOptions::default()
        })),
        ContractViolation::NoArguments
    );
    assert_eq!(
        violation(product_spec("f").with_linearization(LinearizationOptions {
            which_args: Some(vec!["w".to_owned()]),
            ..LinearizationOptions::default()
        })),
        ContractViolation::UnknownArgument { name: "w".to_owned() }
    );
    assert_eq!(
        violation(product_spec("f").with_linearization(LinearizationOptions::default())),
        ContractViolation::ResultNotVector { key: "res".to_owned() }
    );
    assert_eq!(
        violation(residual_spec("r").with_linearization(LinearizationOptions {
            custom_jacobian: Some(Matrix::zeros(3, 3)),
            ..LinearizationOptions::default()
        })),
        ContractViolation::CustomJacobianShape {
            expected: (3, 6),
            actual: (3, 3),
        }
    );
}

#[test]
fn unnamed_specification_needs_a_name() {
    let spec = Codegen::builder(
        xyz(),
        Values::new().with("res", Expr::symbol("x")),
        BackendConfig::default(),
    )
    .build()
    .unwrap();
    assert_eq!(
        violation(spec.with_jacobians(JacobianOptions::default())),
        ContractViolation::MissingName
    );
    let named = spec
        .with_jacobians(JacobianOptions {
            name: Some("g".to_owned()),
            ..JacobianOptions::default()
        })
        .unwrap();
    assert_eq!(named.name(), Some("g"));
}

#[test]
fn group_only_argument_is_missing_capability() {
    let q = Quaternion::symbolic("q");
    let spec = Codegen::builder(
        Values::new().with("q", q.clone()),
        Values::new().with("n", Matrix::column(vec![q.squared_norm()])),
        BackendConfig::default(),
    )
    .name("norm")
    .build()
    .unwrap();
    let err = spec.with_linearization(LinearizationOptions::default());
    assert!(matches!(
        err,
        Err(CodegenError::CapabilityMissing { ref type_name, .. }) if type_name == "Quaternion"
    ));
}

#[test]
fn custom_jacobian_is_used_verbatim() {
    let custom = Matrix::from_fn(3, 6, |i, j| if i == j { Expr::int(2) } else { Expr::zero() });
    let lin = residual_spec("r_residual")
        .with_linearization(LinearizationOptions {
            custom_jacobian: Some(custom.clone()),
            ..LinearizationOptions::default()
        })
        .unwrap();
    assert_eq!(matrix_output(&lin, "jacobian"), &custom);
    assert_eq!(matrix_output(&lin, "hessian").get(0, 0), &Expr::int(4));
}

#[test]
fn sparse_linearization_marks_jacobian_and_hessian() {
    let lin = residual_spec("r_residual")
        .with_linearization(LinearizationOptions {
            sparse_linearization: true,
            ..LinearizationOptions::default()
        })
        .unwrap();
    assert!(lin.is_sparse("jacobian"));
    assert!(lin.is_sparse("hessian"));
    assert!(!lin.is_sparse("rhs"));
    let layout = lin.sparse_layout("hessian").unwrap();
    assert_eq!(layout.to_dense(), *matrix_output(&lin, "hessian"));
}

#[test]
fn narrow_lines_wrap_the_jacobian_doc() {
    let config = BackendConfig::Cpp(CppConfig {
        render: crate::config::RenderOptions {
            line_length: 40,
            ..CppConfig::default().render
        },
        ..CppConfig::default()
    });
    let spec = residual_spec("r_residual").with_config(config);
    let lin = spec.with_linearization(LinearizationOptions::default()).unwrap();
    let lines = &lin.docstring().entry("jacobian").unwrap().lines;
    assert!(lines.len() > 1);
    assert!(lines.iter().all(|l| l.chars().count() <= 37));
    assert!(lines[1].starts_with("              "));
}

#[test]
fn jacobians_of_second_result_without_results() {
    let spec = two_output_spec();
    let jac = spec
        .with_jacobians(JacobianOptions {
            which_results: vec![1],
            include_results: false,
            ..JacobianOptions::default()
        })
        .unwrap();

    assert_eq!(jac.name(), Some("f_jacobians"));
    assert_eq!(jac.outputs().keys().collect::<Vec<_>>(), ["a", "b_D_x", "b_D_y"]);
    assert_eq!(matrix_output(&jac, "b_D_x").get(0, 0), &Expr::symbol("x").cos());
    assert!(matrix_output(&jac, "b_D_y").get(0, 0).is_zero());
    assert_eq!(jac.return_key(), Some("a"));
    assert!(jac.docstring().entry("b").is_none());
    assert_eq!(
        jac.docstring().entry("b_D_x").map(|e| e.lines.clone()),
        Some(vec!["    b_D_x: (1x1) jacobian of b (1) wrt arg x (1)".to_owned()])
    );
}

#[test]
fn jacobians_keep_results_and_return_key() {
    let jac = two_output_spec()
        .with_jacobians(JacobianOptions {
            which_args: Some(vec!["y".to_owned()]),
            ..JacobianOptions::default()
        })
        .unwrap();
    assert_eq!(jac.name(), Some("f_with_jacobian1"));
    assert_eq!(jac.outputs().keys().collect::<Vec<_>>(), ["a", "b", "a_D_y"]);
    assert_eq!(jac.return_key(), Some("a"));
}

#[test]
fn single_remaining_output_becomes_return_key() {
    let jac = product_spec("f")
        .with_jacobians(JacobianOptions {
            which_args: Some(vec!["x".to_owned()]),
            include_results: false,
            ..JacobianOptions::default()
        })
        .unwrap();
    assert_eq!(jac.outputs().keys().collect::<Vec<_>>(), ["res_D_x"]);
    assert_eq!(jac.return_key(), Some("res_D_x"));
}

#[test]
fn result_index_checks() {
    let spec = two_output_spec();
    let with_results = |which_results: Vec<usize>| {
        spec.with_jacobians(JacobianOptions {
            which_results,
            ..JacobianOptions::default()
        })
    };
    assert_eq!(
        violation(with_results(vec![1, 0])),
        ContractViolation::UnsortedResults { indices: vec![1, 0] }
    );
    assert_eq!(
        violation(with_results(vec![0, 0])),
        ContractViolation::UnsortedResults { indices: vec![0, 0] }
    );
    assert_eq!(
        violation(with_results(vec![0, 2])),
        ContractViolation::ResultIndexOutOfRange { index: 2, count: 2 }
    );
}

#[test]
fn sparse_jacobian_selection() {
    let spec = two_output_spec();
    let all = spec
        .with_jacobians(JacobianOptions {
            sparse_jacobians: SparseSelection::All,
            ..JacobianOptions::default()
        })
        .unwrap();
    assert!(all.is_sparse("a_D_x") && all.is_sparse("a_D_y"));
    assert!(!all.is_sparse("a"));

    let only = spec
        .with_jacobians(JacobianOptions {
            sparse_jacobians: SparseSelection::Only(vec!["a_D_y".to_owned()]),
            ..JacobianOptions::default()
        })
        .unwrap();
    assert_eq!(only.sparse_outputs().keys().collect::<Vec<_>>(), ["a_D_y"]);

    assert_eq!(
        violation(spec.with_jacobians(JacobianOptions {
            sparse_jacobians: SparseSelection::Only(vec!["a".to_owned()]),
            ..JacobianOptions::default()
        })),
        ContractViolation::UnknownSparseKey { key: "a".to_owned() }
    );
}

#[test]
fn multi_line_result_docs_are_removed_whole() {
    let x = Expr::symbol("x");
    let spec = Codegen::builder(
        Values::new().with("x", x.clone()),
        Values::new().with("a", x.clone()).with("b", x.exp()),
        BackendConfig::default(),
    )
    .name("g")
    .docstring(
        "
        Two outputs.

        Outputs:
            a: the identity
            b: the exponential,
                documented over
                several lines
        ",
    )
    .build()
    .unwrap();

    let jac = spec
        .with_jacobians(JacobianOptions {
            which_results: vec![1],
            include_results: false,
            ..JacobianOptions::default()
        })
        .unwrap();
    let text = jac.docstring().to_string();
    assert!(!text.contains("exponential"));
    assert!(!text.contains("several lines"));
    assert!(text.contains("a: the identity"));
    assert!(text.ends_with("    b_D_x: (1x1) jacobian of b (1) wrt arg x (1)"));
}

#[test]
fn arg_lists_pluralize() {
    assert_eq!(format_arg_list(&["a".to_owned()], &[3]), "arg a (3)");
    assert_eq!(
        format_arg_list(&["a".to_owned(), "b".to_owned()], &[3, 6]),
        "args a (3), b (6)"
    );
}
