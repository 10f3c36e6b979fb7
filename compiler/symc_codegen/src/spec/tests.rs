use super::*;
use crate::error::CodegenError;
use pretty_assertions::assert_eq;
use symc_ir::{Expr, Matrix, Pose3};

fn xy() -> Values {
    Values::new().with("x", Expr::symbol("x")).with("y", Expr::symbol("y"))
}

fn violation(result: Result<Codegen>) -> ContractViolation {
    match result {
        Err(CodegenError::ContractViolation(v)) => v,
        other => panic!("expected a contract violation, got {other:?}"),
    }
}

fn build(inputs: Values, outputs: Values) -> Result<Codegen> {
    Codegen::builder(inputs, outputs, BackendConfig::default()).build()
}

#[test]
fn scalar_product_validates() {
    let outputs = Values::new().with("z", Expr::symbol("x") * Expr::symbol("y"));
    let spec = Codegen::builder(xy(), outputs, BackendConfig::default())
        .name("product")
        .return_key("z")
        .build()
        .unwrap();
    assert_eq!(spec.name(), Some("product"));
    assert_eq!(spec.return_key(), Some("z"));
    assert_eq!(spec.docstring().entry("z").map(|e| e.lines.len()), Some(1));
}

#[test]
fn specifications_cross_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Codegen>();
}

#[test]
fn undeclared_symbols_are_rejected() {
    let outputs = Values::new().with("z", Expr::symbol("x") * Expr::symbol("w"));
    assert_eq!(
        violation(build(xy(), outputs)),
        ContractViolation::UndeclaredSymbols {
            symbols: vec!["w".to_owned()]
        }
    );
}

#[test]
fn identifiers_are_checked_recursively() {
    let outputs = Values::new().with("z", Expr::symbol("x"));
    assert_eq!(
        violation(build(xy().with("1x", Expr::symbol("a")), outputs.clone())),
        ContractViolation::InvalidIdentifier { key: "1x".to_owned() }
    );

    let nested = Values::new().with("bad key", Expr::symbol("n"));
    assert_eq!(
        violation(build(xy().with("state", nested.clone()), outputs.clone())),
        ContractViolation::InvalidIdentifier {
            key: "bad key".to_owned()
        }
    );

    let in_sequence = Value::Sequence(vec![Value::Values(nested)]);
    assert_eq!(
        violation(build(xy().with("items", in_sequence), outputs)),
        ContractViolation::InvalidIdentifier {
            key: "bad key".to_owned()
        }
    );
}

#[test]
fn inputs_must_be_distinct_symbols() {
    let outputs = Values::new().with("z", Expr::symbol("x"));
    assert_eq!(
        violation(build(xy().with("c", Expr::int(2)), outputs.clone())),
        ContractViolation::NonSymbolInput {
            key: "c".to_owned(),
            expr: "2".to_owned()
        }
    );
    assert_eq!(
        violation(build(xy().with("again", Expr::symbol("x")), outputs)),
        ContractViolation::DuplicateInputSymbols {
            symbols: vec!["x".to_owned()]
        }
    );
}

#[test]
fn input_and_output_keys_are_disjoint() {
    let outputs = Values::new().with("x", Expr::symbol("y"));
    assert_eq!(
        violation(build(xy(), outputs)),
        ContractViolation::OverlappingKeys {
            keys: vec!["x".to_owned()]
        }
    );
}

#[test]
fn sequences_are_non_empty_and_homogeneous() {
    let outputs = Values::new().with("z", Expr::symbol("x"));
    assert_eq!(
        violation(build(xy().with("seq", Value::Sequence(Vec::new())), outputs.clone())),
        ContractViolation::EmptySequence { key: "seq".to_owned() }
    );

    let mixed = Value::Sequence(vec![
        Value::Scalar(Expr::symbol("s0")),
        Value::Matrix(Matrix::symbolic("s1", 2, 1)),
    ]);
    assert_eq!(
        violation(build(xy().with("seq", mixed), outputs)),
        ContractViolation::HeterogeneousSequence { key: "seq".to_owned() }
    );
}

#[test]
fn return_and_sparse_keys_must_be_outputs() {
    let outputs = || {
        Values::new()
            .with("z", Expr::symbol("x"))
            .with("m", Matrix::identity(2).scale(&Expr::symbol("y")))
    };
    let builder = || Codegen::builder(xy(), outputs(), BackendConfig::default());

    assert_eq!(
        violation(builder().return_key("w").build()),
        ContractViolation::UnknownReturnKey { key: "w".to_owned() }
    );
    assert_eq!(
        violation(builder().sparse_outputs(["w"]).build()),
        ContractViolation::UnknownSparseKey { key: "w".to_owned() }
    );
    assert_eq!(
        violation(builder().sparse_outputs(["z"]).build()),
        ContractViolation::SparseOutputNotMatrix { key: "z".to_owned() }
    );

    let spec = builder().sparse_outputs(["m"]).build().unwrap();
    let layout = spec.sparse_layout("m").unwrap();
    assert_eq!(layout.nnz(), 2);
    assert_eq!(layout.col_ptrs, vec![0, 1, 2]);
}

#[test]
fn user_docstring_is_parsed_into_entries() {
    let outputs = Values::new()
        .with("z", Expr::symbol("x"))
        .with("w", Expr::symbol("y"));
    let spec = Codegen::builder(xy(), outputs, BackendConfig::default())
        .docstring(
            "
            Copies its inputs.

            Outputs:
                z: copy of x
                w: copy of y
            ",
        )
        .build()
        .unwrap();
    assert_eq!(spec.docstring().head(), ["Copies its inputs.", "", "Outputs:"]);
    assert_eq!(
        spec.docstring().entry("w").map(|e| e.lines.clone()),
        Some(vec!["    w: copy of y".to_owned()])
    );
}

#[test]
fn function_with_single_output_returns_res() {
    let spec = Codegen::function("scale", BackendConfig::default())
        .arg("s", InputType::Scalar)
        .arg("v", InputType::vector(3))
        .build(|args| {
            let s = args.scalar("s")?;
            Ok(FunctionOutput::Single(args.matrix("v")?.scale(s).into()))
        })
        .unwrap();

    assert_eq!(spec.name(), Some("scale"));
    assert_eq!(spec.return_key(), Some("res"));
    assert_eq!(spec.outputs().keys().collect::<Vec<_>>(), ["res"]);
    let v = spec.inputs().get("v").unwrap().to_storage();
    assert_eq!(v, vec![Expr::symbol("v0"), Expr::symbol("v1"), Expr::symbol("v2")]);
    assert!(spec.docstring().to_string().contains("Symbolic function: scale"));
}

#[test]
fn function_with_named_tuple() {
    let spec = Codegen::function("split", BackendConfig::default())
        .arg("pose", InputType::Pose3)
        .output_names(["rotation", "t"])
        .return_key("t")
        .build(|args| {
            let pose = args.pose3("pose")?;
            Ok(FunctionOutput::Tuple(vec![
                pose.rotation.clone().into(),
                pose.position.clone().into(),
            ]))
        })
        .unwrap();
    assert_eq!(spec.outputs().keys().collect::<Vec<_>>(), ["rotation", "t"]);
    assert_eq!(spec.return_key(), Some("t"));
    assert_eq!(
        spec.inputs().get("pose"),
        Some(&Value::Pose3(Pose3::symbolic("pose")))
    );
}

#[test]
fn function_output_sequences_become_columns() {
    let spec = Codegen::function("pair", BackendConfig::default())
        .arg("a", InputType::Scalar)
        .build(|args| {
            let a = args.scalar("a")?;
            Ok(FunctionOutput::Sequence(vec![a.clone(), a * a]))
        })
        .unwrap();
    let res = spec.outputs().get("res").and_then(Value::as_matrix).unwrap();
    assert_eq!(res.shape(), (2, 1));
}

#[test]
fn function_output_naming_errors() {
    let tuple = || {
        Codegen::function("t", BackendConfig::default()).arg("a", InputType::Scalar)
    };
    let two = |args: &Args<'_>| -> Result<FunctionOutput> {
        let a = args.scalar("a")?;
        Ok(FunctionOutput::Tuple(vec![a.clone().into(), a.sin().into()]))
    };
    assert_eq!(violation(tuple().build(two)), ContractViolation::MissingOutputNames);
    assert_eq!(
        violation(tuple().output_names(["only"]).build(two)),
        ContractViolation::OutputNameCount { names: 1, values: 2 }
    );
    assert_eq!(
        violation(tuple().output_names(["p", "q"]).return_key("r").build(two)),
        ContractViolation::UnknownReturnKey { key: "r".to_owned() }
    );
    assert_eq!(
        violation(tuple().build(|args| {
            args.pose3("a")?;
            Ok(FunctionOutput::Sequence(Vec::new()))
        })),
        ContractViolation::UnknownArgument { name: "a".to_owned() }
    );
}

#[test]
fn function_with_aggregate_and_rotation_args() {
    let state = Values::new()
        .with("t", Expr::symbol("state.t"))
        .with("v", Matrix::symbolic("state.v", 3, 1));
    let spec = Codegen::function("rotate_velocity", BackendConfig::default())
        .arg("rot", InputType::Rot3)
        .arg_value("state", state)
        .build(|args| {
            let velocity = args
                .get("state")?
                .as_values()
                .and_then(|s| s.get("v"))
                .and_then(Value::as_matrix)
                .ok_or_else(|| CodegenError::from(ContractViolation::NoArguments))?;
            Ok(FunctionOutput::Single(args.rot3("rot")?.rotate(velocity)?.into()))
        })
        .unwrap();

    assert_eq!(spec.inputs().keys().collect::<Vec<_>>(), ["rot", "state"]);
    let res = spec.outputs().get("res").and_then(Value::as_matrix).unwrap();
    assert_eq!(res.shape(), (3, 1));
    assert!(spec
        .inputs()
        .free_symbols()
        .contains(&symc_ir::Symbol::new("rot.x")));

    let doc = Codegen::default_docstring(spec.inputs(), spec.outputs()).to_string();
    assert!(doc.contains("    rot: Rot3\n    state: Values\n"));
    assert!(doc.ends_with("Outputs:\n    res: Matrix31"));
}

#[test]
fn unnamed_single_output_is_returned_as_res() {
    let spec = Codegen::function("double", BackendConfig::default())
        .arg("a", InputType::Scalar)
        .return_key("out")
        .build(|args| {
            let a = args.scalar("a")?;
            Ok(FunctionOutput::Single((a + a).into()))
        })
        .unwrap();
    assert_eq!(spec.outputs().keys().collect::<Vec<_>>(), ["res"]);
    assert_eq!(spec.return_key(), Some("res"));
}
