//! Builds the class model from the syntax tree.
//!
//! Classes are registered in declaration order. A superclass has to be
//! declared before the classes extending it, which keeps the hierarchy a
//! forest: the only possible cycle is a class extending itself.

use crate::{
    checker::SemanticContext,
    semantic_error::SemanticError,
    type_analysis::TypeAnalysis,
    type_system::*,
};
use ast::{ClassDeclaration, Program, Spanned};
use std::collections::HashMap;

pub fn resolve<'src, 'ast>(
    program: &'ast Program<'src>,
    type_analysis: &mut TypeAnalysis<'src, 'ast>,
    context: &SemanticContext<'_>,
) -> ClassModel<'src> {
    let mut model = ClassModel::new();

    let main_class = &program.main_class;
    let mut main_def = ClassDef::new(main_class.name.data, main_class.line);
    main_def.main_method = Some(MainMethodDef {
        param_name: main_class.param_name.data,
        locals: Vec::new(),
    });
    model
        .add_class(main_def)
        .unwrap_or_else(|_| unreachable!("the model starts out empty"));

    for class_decl in &program.classes {
        if context.limit_reached() {
            break;
        }
        register_class(&mut model, type_analysis, context, class_decl);
    }

    compute_inherited_methods(&mut model);

    model
}

fn register_class<'src, 'ast>(
    model: &mut ClassModel<'src>,
    type_analysis: &mut TypeAnalysis<'src, 'ast>,
    context: &SemanticContext<'_>,
    class_decl: &'ast Spanned<ClassDeclaration<'src>>,
) {
    let name = class_decl.name.data;
    if model.lookup(name).is_some() {
        context.report_error(
            class_decl.line,
            SemanticError::DuplicateClass {
                name: name.to_string(),
            },
        );
        return;
    }

    let mut class_def = ClassDef::new(name, class_decl.line);

    for field in &class_decl.fields {
        if class_def.field_index(field.name.data).is_some() {
            context.report_error(
                field.line,
                SemanticError::DuplicateField {
                    name: field.name.data.to_string(),
                    class: name.to_string(),
                },
            );
            continue;
        }
        class_def.fields.push(FieldDef::new(
            field.name.data,
            CheckedType::from_ast(&field.ty.data),
            field.line,
        ));
    }

    if let Some(superclass) = &class_decl.superclass {
        if superclass.data == name {
            context.report_error(
                class_decl.line,
                SemanticError::CyclicInheritance {
                    class: name.to_string(),
                },
            );
        } else {
            match model.lookup(superclass.data) {
                None => context.report_error(
                    class_decl.line,
                    SemanticError::UnknownSuperclass {
                        class: name.to_string(),
                        parent: superclass.data.to_string(),
                    },
                ),
                Some(parent) if model.class(parent).is_main() => context.report_error(
                    class_decl.line,
                    SemanticError::CannotExtendMainClass {
                        class: name.to_string(),
                        parent: superclass.data.to_string(),
                    },
                ),
                Some(parent) => class_def.parent = Some(parent),
            }
        }
    }

    let id = match model.add_class(class_def) {
        Ok(id) => id,
        Err(ClassAlreadyDeclared) => unreachable!("checked above"),
    };
    type_analysis.decl_set_class_id(class_decl, id);

    for method in &class_decl.methods {
        let method_name = method.name.data;
        let class_def = model.class(id);

        let collision = if class_def.method_index(method_name).is_some() {
            Some(SemanticError::DuplicateMethod {
                name: method_name.to_string(),
                class: name.to_string(),
            })
        } else if method_name == name {
            Some(SemanticError::MethodNamedLikeClass {
                name: method_name.to_string(),
            })
        } else if class_def.field_index(method_name).is_some() {
            Some(SemanticError::MethodNamedLikeField {
                name: method_name.to_string(),
                class: name.to_string(),
            })
        } else {
            None
        };

        if let Some(error) = collision {
            context.report_error(method.line, error);
            continue;
        }

        let class_def = model.class_mut(id);
        let index = class_def.methods.len();
        class_def.methods.push(MethodDef::new(
            method_name,
            method.line,
            id,
            CheckedType::from_ast(&method.return_ty.data),
        ));
        type_analysis.decl_set_method_ref(method, MethodRef { class: id, index });
    }

    log::debug!(
        "registered class {} with {} field(s) and {} method(s)",
        name,
        model.class(id).fields.len(),
        model.class(id).methods.len()
    );
}

/// Walks every ancestor chain from the top down and records each ancestor
/// method the class does not declare itself. Later (nearer) ancestors
/// overwrite earlier ones in place.
fn compute_inherited_methods(model: &mut ClassModel<'_>) {
    for id in model.ids().collect::<Vec<_>>() {
        let mut ancestors: Vec<ClassId> = model.ancestors(id).collect();
        ancestors.reverse();

        let class_def = model.class(id);
        let mut inherited: Vec<InheritedMethod<'_>> = Vec::new();
        let mut positions = HashMap::new();

        for ancestor in ancestors {
            for (index, method) in model.class(ancestor).methods.iter().enumerate() {
                if class_def.method_index(method.name).is_some() {
                    continue;
                }
                let entry = InheritedMethod {
                    name: method.name,
                    method: MethodRef {
                        class: ancestor,
                        index,
                    },
                };
                match positions.get(&method.name) {
                    Some(&position) => inherited[position] = entry,
                    None => {
                        positions.insert(method.name, inherited.len());
                        inherited.push(entry);
                    }
                }
            }
        }

        log::trace!(
            "class {} inherits {} method(s)",
            class_def.name,
            inherited.len()
        );
        model.class_mut(id).inherited_methods = inherited;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{build::*, Type};
    use compiler_shared::context::Context;
    use strtab::StringTable;

    #[test]
    fn nearest_ancestor_wins_in_inherited_closure() {
        let mut strtab = StringTable::new();
        let (main, args) = (strtab.intern("Main"), strtab.intern("args"));
        let (a, b, c) = (strtab.intern("A"), strtab.intern("B"), strtab.intern("C"));
        let (m, n) = (strtab.intern("m"), strtab.intern("n"));

        let program = program(
            main_class(main, args, vec![], vec![]),
            vec![
                class(
                    a,
                    None,
                    vec![],
                    vec![
                        method(Type::Int, m, vec![], vec![], vec![], int(0)),
                        method(Type::Int, n, vec![], vec![], vec![], int(0)),
                    ],
                ),
                class(
                    b,
                    Some(a),
                    vec![],
                    vec![method(Type::Int, m, vec![], vec![], vec![], int(1))],
                ),
                class(c, Some(b), vec![], vec![]),
            ],
        );

        let context = Context::dummy();
        let sem_context = SemanticContext::new(&context, None);
        let mut analysis = TypeAnalysis::new();
        let model = resolve(&program, &mut analysis, &sem_context);

        assert!(!context.diagnostics.errored());
        let c_id = model.lookup(c).unwrap();
        let inherited = &model.class(c_id).inherited_methods;
        let owners: Vec<(&str, &str)> = inherited
            .iter()
            .map(|i| (i.name.as_str(), model.class(i.method.class).name.as_str()))
            .collect();
        // m keeps the position it had in A but now refers to B's override
        assert_eq!(owners, vec![("m", "B"), ("n", "A")]);

        let b_id = model.lookup(b).unwrap();
        let b_inherited: Vec<&str> = model
            .class(b_id)
            .inherited_methods
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(b_inherited, vec!["n"]);
    }

    #[test]
    fn superclass_must_be_declared_first() {
        let mut strtab = StringTable::new();
        let (main, args) = (strtab.intern("Main"), strtab.intern("args"));
        let (a, b) = (strtab.intern("A"), strtab.intern("B"));

        let program = program(
            main_class(main, args, vec![], vec![]),
            vec![
                class(b, Some(a), vec![], vec![]).at(2),
                class(a, None, vec![], vec![]).at(3),
            ],
        );

        let context = Context::dummy();
        let sem_context = SemanticContext::new(&context, None);
        let model = resolve(&program, &mut TypeAnalysis::new(), &sem_context);

        assert_eq!(model.len(), 3);
        let messages = context.diagnostics.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "class B cannot extend undeclared class A");
    }
}
