use crate::{
    layout::Layout,
    method_body_generator::{LabelCounters, MethodBodyGenerator},
    runtime, CodegenError,
};
use ast::Program;
use std::io::Write;
use type_checking::{ClassId, ClassModel, TypeAnalysis};

/// Writes a whole module: the runtime prelude, one vtable per class, the
/// `main` function and one function per method.
pub struct ProgramGenerator<'ir, 'src, 'ast> {
    program: &'ast Program<'src>,
    model: &'ir ClassModel<'src>,
    layout: &'ir Layout<'src>,
    type_analysis: &'ir TypeAnalysis<'src, 'ast>,
}

impl<'ir, 'src, 'ast> ProgramGenerator<'ir, 'src, 'ast> {
    pub fn new(
        program: &'ast Program<'src>,
        model: &'ir ClassModel<'src>,
        layout: &'ir Layout<'src>,
        type_analysis: &'ir TypeAnalysis<'src, 'ast>,
    ) -> Self {
        Self {
            program,
            model,
            layout,
            type_analysis,
        }
    }

    pub fn generate(&self, out: &mut dyn Write) -> Result<(), failure::Error> {
        let mut labels = LabelCounters::default();

        runtime::write_prelude(out)?;
        self.layout.write_vtables(out)?;

        let main_class = &self.program.main_class;
        log::debug!("generate method body for {}.main", main_class.name.data);
        let main_locals = self
            .model
            .class(ClassId::main())
            .main_method
            .as_ref()
            .map(|main| &main.locals[..])
            .unwrap_or(&[]);
        MethodBodyGenerator::new(
            self.model,
            self.layout,
            self.type_analysis,
            &mut labels,
            out,
            main_class.name.data,
            "main",
            main_locals,
        )
        .gen_main(&main_class.statements)?;

        for class_decl in &self.program.classes {
            let class_id = self
                .type_analysis
                .decl_get_class_id(class_decl)
                .ok_or_else(|| CodegenError::MissingClass {
                    name: class_decl.name.data.to_string(),
                })?;
            let class_name = self.model.class(class_id).name;

            for method_decl in &class_decl.methods {
                let method_ref = self
                    .type_analysis
                    .decl_get_method_ref(method_decl)
                    .ok_or_else(|| CodegenError::MissingMethod {
                        name: method_decl.name.data.to_string(),
                    })?;
                let method = self.model.method(method_ref);
                log::debug!("generate method body for {}.{}", class_name, method.name);

                MethodBodyGenerator::new(
                    self.model,
                    self.layout,
                    self.type_analysis,
                    &mut labels,
                    out,
                    class_name,
                    method.name.as_str(),
                    &method.locals,
                )
                .gen_method(method, &method_decl.statements, &method_decl.return_expr)?;
            }
        }

        Ok(())
    }
}
