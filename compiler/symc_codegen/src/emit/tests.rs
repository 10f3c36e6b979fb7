use std::fs;

use pretty_assertions::assert_eq;
use symc_ir::{Expr, Matrix, Pose3, Values};
use tempfile::TempDir;

use super::*;
use crate::config::PythonConfig;

fn product(config: BackendConfig) -> Codegen {
    let x = Expr::symbol("x");
    let y = Expr::symbol("y");
    let inputs = Values::new().with("x", x.clone()).with("y", y.clone());
    let outputs = Values::new().with("z", &x * &y);
    Codegen::builder(inputs, outputs, config)
        .name("product")
        .return_key("z")
        .build()
        .unwrap()
}

fn state(prefix: &str) -> Values {
    Values::new()
        .with("t", Expr::symbol(format!("{prefix}.t")))
        .with("v", Matrix::symbolic(&format!("{prefix}.v"), 3, 1))
}

fn with_state(name: &str, prefix: &str, state: Values) -> Codegen {
    let x = Expr::symbol("x");
    let t = Expr::symbol(format!("{prefix}.t"));
    let inputs = Values::new().with("x", x.clone()).with("state", state);
    let outputs = Values::new().with("z", &t * &x);
    Codegen::builder(inputs, outputs, BackendConfig::default())
        .name(name)
        .return_key("z")
        .build()
        .unwrap()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn scalar_product_header() {
    let out = TempDir::new().unwrap();
    let mut shared = SharedTypes::new();
    let report = product(BackendConfig::default())
        .generate(&GenerateOptions::in_dir(out.path()), &mut shared)
        .unwrap();

    let header = out.path().join("cpp").join("symc").join("sym").join("product.h");
    assert_eq!(report.generated_files, vec![header.clone()]);
    assert_eq!(report.function_dir, out.path().join("cpp").join("symc").join("sym"));
    assert_eq!(report.schema_dir, out.path().join("lcmtypes"));
    assert!(report.schema_files.is_empty());
    assert!(report.reused_types.is_empty());
    assert!(shared.is_empty());

    let text = read(&header);
    assert!(text.starts_with("// ----"));
    assert!(text.contains("#pragma once\n"));
    assert!(text.contains(
        "template <typename Scalar>\nScalar Product(const Scalar& x, const Scalar& y) {\n"
    ));
    assert!(text.contains(" *     z: Scalar\n */\n"));
    assert!(text.contains("  // Total ops: 1\n"));
    assert!(text.contains("  Scalar _z;\n  _z = x*y;\n"));
    assert!(text.ends_with("  return _z;\n}\n\n}  // namespace sym\n"));
}

#[test]
fn scalar_product_module() {
    let out = TempDir::new().unwrap();
    let spec = product(BackendConfig::Python(PythonConfig::default()));
    let report = spec
        .generate(&GenerateOptions::in_dir(out.path()), &mut SharedTypes::new())
        .unwrap();

    let package = out.path().join("python").join("symc").join("sym");
    assert_eq!(
        report.generated_files,
        vec![package.join("product.py"), package.join("__init__.py")]
    );
    let text = read(&package.join("product.py"));
    assert!(text.contains("\n\n\ndef product(x, y):\n    \"\"\"\n"));
    assert!(text.contains("    # Output terms (1)\n    _z = x*y\n    return _z\n"));
    assert!(read(&package.join("__init__.py")).contains("from .product import product\n"));
}

#[test]
fn shared_types_are_generated_once() {
    let out = TempDir::new().unwrap();
    let options = GenerateOptions::in_dir(out.path());
    let mut shared = SharedTypes::new();

    let first = with_state("first", "a", state("a"))
        .generate(&options, &mut shared)
        .unwrap();
    let type_header = first.types_dir.join("state_t.h");
    assert_eq!(first.generated_files[1], type_header);
    assert_eq!(first.schema_files, vec![out.path().join("lcmtypes").join("first.lcm")]);
    assert_eq!(
        first.emission.typenames.get("state"),
        Some(&"state_t".to_owned())
    );
    assert_eq!(shared.get("state_t").map(|t| t.handle.as_str()), Some("sym.state_t"));

    let header = read(&first.generated_files[0]);
    assert!(header.contains("#include <symc/sym/types/state_t.h>\n"));
    assert!(header.contains("Scalar First(const Scalar& x, const sym::state_t& state) {"));
    assert!(header.contains("  _z = state.t*x;\n"));
    assert!(read(&type_header).contains(
        "struct state_t {\n  double t;\n  Eigen::Matrix<double, 3, 1> v;\n};\n"
    ));
    assert!(read(&first.schema_files[0]).contains("struct state_t {\n    double t;\n    double v[3];\n}\n"));

    let second = with_state("second", "b", state("b"))
        .generate(&options, &mut shared)
        .unwrap();
    assert_eq!(second.reused_types, ["state_t"]);
    assert_eq!(second.generated_files.len(), 1);
    assert!(second.schema_files.is_empty());
    assert_eq!(shared.len(), 1);

    let narrow = Values::new().with("t", Expr::symbol("c.t"));
    let err = with_state("third", "c", narrow).generate(&options, &mut shared);
    assert!(matches!(
        err,
        Err(CodegenError::TypeConflict { ref type_name, ref namespace })
            if type_name == "state_t" && namespace == "sym"
    ));
    assert!(!first.function_dir.join("third.h").exists());
}

#[test]
fn sparse_outputs_use_csc_arrays() {
    let out = TempDir::new().unwrap();
    let y = Expr::symbol("y");
    let spec = Codegen::builder(
        Values::new().with("y", y.clone()),
        Values::new().with("m", Matrix::identity(2).scale(&y)),
        BackendConfig::default(),
    )
    .name("diag")
    .sparse_outputs(["m"])
    .build()
    .unwrap();
    let report = spec
        .generate(&GenerateOptions::in_dir(out.path()), &mut SharedTypes::new())
        .unwrap();

    let text = read(&report.generated_files[0]);
    assert!(text.contains("#include <Eigen/SparseCore>\n"));
    assert!(text.contains(
        "void Diag(const Scalar& y, Eigen::SparseMatrix<Scalar>* const m = nullptr) {"
    ));
    assert!(text.contains("    if (_m.nonZeros() != 2) {\n"));
    assert!(text.contains("static constexpr int kColPtrs[] = {0, 1, 2};\n"));
    assert!(text.contains("static constexpr int kRowIndices[] = {0, 1};\n"));
    assert!(text.contains("    _m_value_ptr[0] = y;\n    _m_value_ptr[1] = y;\n"));
}

#[test]
fn geometric_inputs_and_zero_filled_outputs() {
    let out = TempDir::new().unwrap();
    let pose = Pose3::symbolic("pose");
    let tx = pose.position.get(0, 0).clone();
    let spec = Codegen::builder(
        Values::new().with("pose", pose),
        Values::new().with("b", Matrix::column(vec![tx, Expr::zero(), Expr::zero()])),
        BackendConfig::default(),
    )
    .name("pick_x")
    .build()
    .unwrap();
    let report = spec
        .generate(&GenerateOptions::in_dir(out.path()), &mut SharedTypes::new())
        .unwrap();

    let text = read(&report.generated_files[0]);
    assert!(text.contains("#include <sym/pose3.h>\n"));
    assert!(text.contains("  const Eigen::Matrix<Scalar, 7, 1>& _pose = pose.Data();\n"));
    assert!(text.contains("  if (b != nullptr) {\n"));
    assert!(text.contains("    _b.setZero();\n    _b(0, 0) = _pose[4];\n  }\n"));
    assert!(!text.contains("_b(1, 0)"));
}

#[test]
fn python_composite_and_geometric_outputs() {
    let out = TempDir::new().unwrap();
    let pose = Pose3::symbolic("pose");
    let tx = pose.position.get(0, 0).clone();
    let spec = Codegen::builder(
        Values::new().with("pose", pose.clone()),
        Values::new()
            .with("moved", pose)
            .with("summary", Values::new().with("t", tx)),
        BackendConfig::Python(PythonConfig::default()),
    )
    .name("summarize")
    .build()
    .unwrap();
    let report = spec
        .generate(&GenerateOptions::in_dir(out.path()), &mut SharedTypes::new())
        .unwrap();

    assert_eq!(report.generated_files.len(), 4);
    let text = read(&report.generated_files[0]);
    assert!(text.contains("from symc.sym.types.summary_t import summary_t\n"));
    assert!(text.contains("    _pose = pose.to_storage()\n"));
    assert!(text.contains(
        "    _moved = sym.Pose3.from_storage([_pose[0], _pose[1], _pose[2], _pose[3], _pose[4], _pose[5], _pose[6]])\n"
    ));
    assert!(text.contains("    _summary = summary_t()\n    _summary.t = _pose[4]\n"));
    assert!(text.ends_with("    return _moved, _summary\n"));

    let class = read(&report.types_dir.join("summary_t.py"));
    assert!(class.contains("class summary_t:\n"));
    assert!(class.contains("    __slots__ = (\"t\",)\n"));
    assert!(class.contains("        self.t = 0.0\n"));
    assert!(read(&report.types_dir.join("__init__.py")).contains("from .summary_t import summary_t\n"));
}

#[test]
fn flat_layout_and_custom_locations() {
    let out = TempDir::new().unwrap();
    let schema = TempDir::new().unwrap();
    let options = GenerateOptions {
        output_dir: Some(out.path().to_path_buf()),
        schema_output_dir: Some(schema.path().to_path_buf()),
        namespace: "geo".to_owned(),
        generated_file_name: Some("custom".to_owned()),
        flat_layout: true,
    };
    let mut shared = SharedTypes::new();
    let report = with_state("first", "a", state("a"))
        .generate(&options, &mut shared)
        .unwrap();

    assert_eq!(report.function_dir, out.path());
    assert_eq!(
        report.generated_files,
        vec![out.path().join("custom.h"), out.path().join("types").join("state_t.h")]
    );
    let schema_file = schema.path().join("lcmtypes").join("custom.lcm");
    assert_eq!(report.schema_files, vec![schema_file.clone()]);
    assert!(read(&schema_file).contains("package geo;\n"));
    assert_eq!(report.emission.namespace, "geo");
    assert!(read(&report.generated_files[0]).contains("namespace geo {\n"));
    assert_eq!(shared.get("state_t").map(|t| t.namespace.as_str()), Some("geo"));
}

#[test]
fn temporary_output_directory() {
    let report = product(BackendConfig::default())
        .generate(&GenerateOptions::default(), &mut SharedTypes::new())
        .unwrap();
    let dir_name = report
        .output_dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .unwrap();
    assert!(dir_name.starts_with("symc_product_"));
    assert!(report.generated_files[0].exists());
    fs::remove_dir_all(&report.output_dir).unwrap();
}

#[test]
fn unnamed_specifications_cannot_be_generated() {
    let x = Expr::symbol("x");
    let spec = Codegen::builder(
        Values::new().with("x", x.clone()),
        Values::new().with("y", x.sin()),
        BackendConfig::default(),
    )
    .build()
    .unwrap();
    let out = TempDir::new().unwrap();
    let err = spec.generate(&GenerateOptions::in_dir(out.path()), &mut SharedTypes::new());
    assert!(matches!(
        err,
        Err(CodegenError::ContractViolation(ContractViolation::MissingName))
    ));
}

#[test]
fn intermediates_never_shadow_inputs() {
    let out = TempDir::new().unwrap();
    let t = Expr::symbol("_tmp0");
    let y = Expr::symbol("y");
    let s = (&t + &y).sin();
    let spec = Codegen::builder(
        Values::new().with("_tmp0", t.clone()).with("y", y.clone()),
        Values::new().with("a", &s * &t).with("b", &s * &y),
        BackendConfig::Python(PythonConfig::default()),
    )
    .name("shadowed")
    .build()
    .unwrap();
    let report = spec
        .generate(&GenerateOptions::in_dir(out.path()), &mut SharedTypes::new())
        .unwrap();

    let module = report
        .generated_files
        .iter()
        .find(|path| path.ends_with("shadowed.py"))
        .unwrap();
    let text = read(module);
    assert!(text.contains("    _tmp1 = math.sin(_tmp0 + y)\n"));
    assert!(!text.contains("_tmp0 = "));
    let line = |local: &str| {
        text.lines()
            .find(|l| l.trim_start().starts_with(local))
            .unwrap()
            .to_owned()
    };
    let a = line("_a = ");
    assert!(a.contains("_tmp0") && a.contains("_tmp1"), "{a}");
    let b = line("_b = ");
    assert!(b.contains('y') && b.contains("_tmp1"), "{b}");
}

#[test]
fn locals_avoid_argument_names() {
    let out = TempDir::new().unwrap();
    let pose = Pose3::symbolic("pose");
    let tx = pose.position.get(0, 0).clone();
    let scale = Expr::symbol("_pose");
    let offset = Expr::symbol("_b");
    let spec = Codegen::builder(
        Values::new()
            .with("pose", pose)
            .with("_pose", scale.clone())
            .with("_b", offset.clone()),
        Values::new().with(
            "b",
            Matrix::column(vec![&(&tx * &scale) + &offset, Expr::zero(), Expr::zero()]),
        ),
        BackendConfig::default(),
    )
    .name("scaled_x")
    .build()
    .unwrap();
    let report = spec
        .generate(&GenerateOptions::in_dir(out.path()), &mut SharedTypes::new())
        .unwrap();

    let text = read(&report.generated_files[0]);
    assert!(text.contains("const Scalar& _pose,"));
    assert!(text.contains("const Scalar& _b,"));
    assert!(text.contains("  const Eigen::Matrix<Scalar, 7, 1>& __pose = pose.Data();\n"));
    assert!(text.contains("& __b = (*b);\n    __b.setZero();\n    __b(0, 0) = "));
    assert!(text.contains("__pose[4]"));
    assert!(!text.contains("& _pose = pose.Data()"));
    assert!(!text.contains(" _b(0, 0)"));
}
