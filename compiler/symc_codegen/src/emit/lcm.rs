//! Message schema for newly generated composite types.

use super::writer::SourceWriter;
use crate::types::{CompositeType, EmissionContext, FieldKind};

/// Element type and array dimensions of a schema field.
fn field_type(kind: &FieldKind, context: &EmissionContext) -> (String, Vec<usize>) {
    match kind {
        FieldKind::Scalar => ("double".to_owned(), Vec::new()),
        FieldKind::Matrix { rows, cols: 1 } => ("double".to_owned(), vec![*rows]),
        FieldKind::Matrix { rows, cols } => ("double".to_owned(), vec![*rows, *cols]),
        FieldKind::Geo { storage_dim, .. } => ("double".to_owned(), vec![*storage_dim]),
        FieldKind::Composite(type_name) => {
            let name = match context.namespaces.get(type_name) {
                Some(namespace) if *namespace != context.namespace => {
                    context.qualified(type_name, ".")
                }
                _ => type_name.clone(),
            };
            (name, Vec::new())
        }
        FieldKind::Sequence { len, element } => {
            let (name, inner) = field_type(element, context);
            let mut dims = vec![*len];
            dims.extend(inner);
            (name, dims)
        }
    }
}

/// One `.lcm` file declaring every type in `types`, in order.
pub(crate) struct SchemaFile<'a> {
    pub types: &'a [CompositeType],
    pub context: &'a EmissionContext,
}

impl SchemaFile<'_> {
    pub(crate) fn render(&self) -> String {
        let mut w = SourceWriter::new("    ");
        w.writeln("// This file was autogenerated by symc. Do not modify by hand.");
        w.newline();
        w.writeln(&format!("package {};", self.context.namespace));
        for ty in self.types {
            w.newline();
            w.writeln(&format!("struct {} {{", ty.name));
            w.indent();
            for field in &ty.fields {
                let (name, dims) = field_type(&field.kind, self.context);
                let dims: String = dims.iter().map(|d| format!("[{d}]")).collect();
                w.writeln(&format!("{name} {}{dims};", field.name));
            }
            w.dedent();
            w.writeln("}");
        }
        w.take_output()
    }
}
