//! Field offsets, object sizes and vtable slots.
//!
//! Offsets are handed out by a per-pass accumulator and written once into
//! the class model. With [`FieldLayout::SharedRootCounter`] every class of an
//! inheritance tree draws field offsets and method slots from one counter
//! owned by the topmost ancestor, so sibling subclasses keep extending the
//! same counter. [`FieldLayout::ParentPrefix`] instead starts every class
//! where its parent ended.
//!
//! An overriding method never gets a new slot, it reuses the slot of the
//! method it overrides.

use crate::{type_translation::size_of, vtable::VTable, CodegenError};
use std::{
    cmp,
    collections::HashMap,
    io::{self, Write},
};
use strtab::Symbol;
use strum_macros::Display;
use type_checking::{ClassId, ClassModel, FieldRef, MethodRef};

/// Size of the object header holding the vtable pointer.
pub const HEADER_SIZE: usize = 8;
/// Size of one vtable slot.
pub const SLOT_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FieldLayout {
    #[strum(serialize = "shared root counter")]
    SharedRootCounter,
    #[strum(serialize = "parent prefix")]
    ParentPrefix,
}

impl Default for FieldLayout {
    fn default() -> Self {
        FieldLayout::SharedRootCounter
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    field_offset: usize,
    slot_offset: usize,
}

#[derive(Debug, Clone)]
pub struct ClassLayout<'src> {
    pub class: ClassId,
    pub name: Symbol<'src>,
    /// Header plus the fields of the class and all its ancestors.
    pub object_size: usize,
    /// Bytes requested from `calloc` by `new`.
    pub alloc_size: usize,
    pub vtable: VTable<'src>,
}

impl<'src> ClassLayout<'src> {
    fn new(model: &ClassModel<'src>, id: ClassId) -> Result<ClassLayout<'src>, CodegenError> {
        let fields_size: usize = model.visible_fields(id).map(|f| size_of(&f.ty)).sum();
        let object_size = HEADER_SIZE + fields_size;

        let mut field_region_end = 0;
        for field in model.visible_fields(id) {
            let offset = field.offset.ok_or_else(|| CodegenError::MissingFieldOffset {
                name: field.name.to_string(),
            })?;
            field_region_end = cmp::max(field_region_end, offset + size_of(&field.ty));
        }
        // shared counters can place a field past the object size
        let alloc_size = cmp::max(object_size, HEADER_SIZE + field_region_end) + HEADER_SIZE;

        Ok(ClassLayout {
            class: id,
            name: model.class(id).name,
            object_size,
            alloc_size,
            vtable: VTable::build(model, id)?,
        })
    }
}

/// The frozen layout of every class, indexed like the class model.
#[derive(Debug)]
pub struct Layout<'src> {
    classes: Vec<ClassLayout<'src>>,
}

impl<'src> Layout<'src> {
    /// Assigns field offsets and method slots in `model`, then computes
    /// sizes and vtables from them.
    pub fn compute(
        model: &mut ClassModel<'src>,
        strategy: FieldLayout,
    ) -> Result<Layout<'src>, CodegenError> {
        log::debug!("computing class layouts using the {} layout", strategy);
        assign_offsets(model, strategy);

        let classes = model
            .ids()
            .map(|id| ClassLayout::new(model, id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Layout { classes })
    }

    pub fn class(&self, id: ClassId) -> &ClassLayout<'src> {
        &self.classes[id.index()]
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassLayout<'src>> {
        self.classes.iter()
    }

    pub fn write_vtables(&self, out: &mut dyn Write) -> io::Result<()> {
        for class in &self.classes {
            class.vtable.write_declaration(out)?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Human readable table of sizes, field offsets and vtable slots.
    pub fn dump(&self, model: &ClassModel<'src>, out: &mut dyn Write) -> io::Result<()> {
        for class in &self.classes {
            let class_def = model.class(class.class);
            if class_def.is_main() {
                continue;
            }
            writeln!(
                out,
                "class {}: object size {}, allocation size {}",
                class.name, class.object_size, class.alloc_size
            )?;
            for ancestor in model.chain(class.class).collect::<Vec<_>>().into_iter().rev() {
                for field in &model.class(ancestor).fields {
                    let offset = field.offset.unwrap_or_default();
                    writeln!(
                        out,
                        "  field {}.{}: {} at this + {}",
                        model.class(ancestor).name,
                        field.name,
                        field.ty,
                        HEADER_SIZE + offset
                    )?;
                }
            }
            for (slot, entry) in class.vtable.entries() {
                writeln!(out, "  slot {}: {}.{}", slot, entry.owner, entry.name)?;
            }
        }
        Ok(())
    }
}

fn assign_offsets(model: &mut ClassModel<'_>, strategy: FieldLayout) {
    let mut counters: HashMap<ClassId, Counters> = HashMap::new();

    for id in model.ids().collect::<Vec<_>>() {
        if model.class(id).is_main() {
            continue;
        }
        let parent = model.class(id).parent;
        let owner = match strategy {
            FieldLayout::SharedRootCounter => model.chain_root(id),
            FieldLayout::ParentPrefix => id,
        };
        let start_from = match (strategy, parent) {
            (FieldLayout::ParentPrefix, Some(parent)) => parent,
            _ => owner,
        };
        let mut counter = counters.get(&start_from).cloned().unwrap_or_default();

        for index in 0..model.class(id).fields.len() {
            let field = model.field_mut(FieldRef { class: id, index });
            field.offset = Some(counter.field_offset);
            log::trace!("field {} at offset {}", field.name, counter.field_offset);
            counter.field_offset += size_of(&field.ty);
        }

        for index in 0..model.class(id).methods.len() {
            let method_ref = MethodRef { class: id, index };
            let name = model.method(method_ref).name;
            let overridden = parent
                .and_then(|parent| model.find_method(parent, name))
                .and_then(|ancestor| model.method(ancestor).slot_offset);

            let slot_offset = match overridden {
                Some(slot_offset) => slot_offset,
                None => {
                    let slot_offset = counter.slot_offset;
                    counter.slot_offset += SLOT_SIZE;
                    slot_offset
                }
            };
            log::trace!(
                "method {}.{} in slot {}",
                model.class(id).name,
                name,
                slot_offset / SLOT_SIZE
            );
            model.method_mut(method_ref).slot_offset = Some(slot_offset);
        }

        counters.insert(owner, counter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{build::*, Program, Type};
    use compiler_shared::context::Context;
    use strtab::StringTable;
    use type_checking::{check, CheckerOptions};

    fn layout_of<'src>(
        program: &Program<'src>,
        strategy: FieldLayout,
    ) -> (ClassModel<'src>, Layout<'src>) {
        let context = Context::dummy();
        let (mut model, _) =
            check(program, &context, &CheckerOptions::default()).expect("program is valid");
        let layout = Layout::compute(&mut model, strategy).unwrap();
        (model, layout)
    }

    fn class_layout<'a, 'src>(
        model: &ClassModel<'src>,
        layout: &'a Layout<'src>,
        name: Symbol<'src>,
    ) -> &'a ClassLayout<'src> {
        layout.class(model.lookup(name).unwrap())
    }

    fn offsets(model: &ClassModel<'_>, name: Symbol<'_>) -> Vec<usize> {
        let id = model.lookup(name).unwrap();
        model
            .class(id)
            .fields
            .iter()
            .map(|field| field.offset.unwrap())
            .collect()
    }

    #[test]
    fn single_class_size_is_header_plus_fields() {
        let mut strtab = StringTable::new();
        let (main, args, a) = (strtab.intern("Main"), strtab.intern("args"), strtab.intern("A"));
        let (x, flag, arr, other) = (
            strtab.intern("x"),
            strtab.intern("flag"),
            strtab.intern("arr"),
            strtab.intern("other"),
        );
        let program = program(
            main_class(main, args, vec![], vec![]),
            vec![class(
                a,
                None,
                vec![
                    var(Type::Int, x),
                    var(Type::Boolean, flag),
                    var(Type::IntArray, arr),
                    var(Type::Class(a), other),
                ],
                vec![],
            )],
        );

        let (model, layout) = layout_of(&program, FieldLayout::default());
        let class = class_layout(&model, &layout, a);
        assert_eq!(class.object_size, 8 + 4 + 1 + 8 + 8);
        assert_eq!(class.alloc_size, class.object_size + 8);
        assert_eq!(offsets(&model, a), vec![0, 4, 5, 13]);
        assert!(class.vtable.is_empty());
    }

    #[test]
    fn inherited_fields_come_first() {
        let mut strtab = StringTable::new();
        let (main, args) = (strtab.intern("Main"), strtab.intern("args"));
        let (a, b, x, y) = (
            strtab.intern("A"),
            strtab.intern("B"),
            strtab.intern("a"),
            strtab.intern("b"),
        );
        let program = program(
            main_class(main, args, vec![], vec![]),
            vec![
                class(a, None, vec![var(Type::Int, x)], vec![]),
                class(b, Some(a), vec![var(Type::Int, y)], vec![]),
            ],
        );

        for strategy in &[FieldLayout::SharedRootCounter, FieldLayout::ParentPrefix] {
            let (model, layout) = layout_of(&program, *strategy);
            assert_eq!(offsets(&model, a), vec![0]);
            assert_eq!(offsets(&model, b), vec![4]);
            assert_eq!(class_layout(&model, &layout, b).object_size, 16);
            assert_eq!(class_layout(&model, &layout, b).alloc_size, 24);
        }
    }

    #[test]
    fn override_reuses_slot_and_new_method_appends() {
        let mut strtab = StringTable::new();
        let (main, args) = (strtab.intern("Main"), strtab.intern("args"));
        let (a, b) = (strtab.intern("A"), strtab.intern("B"));
        let (m, n, k) = (strtab.intern("m"), strtab.intern("n"), strtab.intern("k"));
        let int_method = |name| method(Type::Int, name, vec![], vec![], vec![], int(0));
        let program = program(
            main_class(main, args, vec![], vec![]),
            vec![
                class(a, None, vec![], vec![int_method(m), int_method(n)]),
                class(b, Some(a), vec![], vec![int_method(k), int_method(m)]),
            ],
        );

        let (model, layout) = layout_of(&program, FieldLayout::default());
        let a_table = &class_layout(&model, &layout, a).vtable;
        let b_table = &class_layout(&model, &layout, b).vtable;

        assert_eq!(a_table.slot_of("m"), Some(0));
        assert_eq!(a_table.slot_of("n"), Some(1));
        assert_eq!(b_table.slot_of("m"), Some(0));
        assert_eq!(b_table.slot_of("n"), Some(1));
        assert_eq!(b_table.slot_of("k"), Some(2));

        let functions: Vec<String> = b_table.entries().map(|(_, e)| e.function_name()).collect();
        assert_eq!(functions, vec!["@B.m", "@A.n", "@B.k"]);
    }

    #[test]
    fn siblings_share_the_root_counter() {
        let mut strtab = StringTable::new();
        let (main, args) = (strtab.intern("Main"), strtab.intern("args"));
        let (a, b, c) = (strtab.intern("A"), strtab.intern("B"), strtab.intern("C"));
        let (x, y, z) = (strtab.intern("x"), strtab.intern("y"), strtab.intern("z"));
        let (p, q) = (strtab.intern("p"), strtab.intern("q"));
        let int_method = |name| method(Type::Int, name, vec![], vec![], vec![], int(0));
        let program = program(
            main_class(main, args, vec![], vec![]),
            vec![
                class(a, None, vec![var(Type::Int, x)], vec![]),
                class(b, Some(a), vec![var(Type::Int, y)], vec![int_method(p)]),
                class(c, Some(a), vec![var(Type::Int, z)], vec![int_method(q)]),
            ],
        );

        let (model, layout) = layout_of(&program, FieldLayout::SharedRootCounter);
        assert_eq!(offsets(&model, c), vec![8]);
        let c_layout = class_layout(&model, &layout, c);
        assert_eq!(c_layout.object_size, 16);
        // z ends at this + 20, four bytes past the object size
        assert_eq!(c_layout.alloc_size, 20 + 8);
        assert_eq!(c_layout.vtable.len(), 2);
        assert_eq!(c_layout.vtable.slot_of("q"), Some(1));
        assert!(c_layout.vtable.slots[0].is_none());

        let (model, layout) = layout_of(&program, FieldLayout::ParentPrefix);
        assert_eq!(offsets(&model, c), vec![4]);
        let c_layout = class_layout(&model, &layout, c);
        assert_eq!(c_layout.alloc_size, 24);
        assert_eq!(c_layout.vtable.slot_of("q"), Some(0));
    }

    #[test]
    fn vtable_declarations() {
        let mut strtab = StringTable::new();
        let (main, args) = (strtab.intern("Main"), strtab.intern("args"));
        let (a, b, m, v) = (
            strtab.intern("A"),
            strtab.intern("B"),
            strtab.intern("m"),
            strtab.intern("v"),
        );
        let program = program(
            main_class(main, args, vec![], vec![]),
            vec![
                class(
                    a,
                    None,
                    vec![],
                    vec![method(Type::Boolean, m, vec![var(Type::Int, v)], vec![], vec![], tru())],
                ),
                class(b, None, vec![], vec![]),
            ],
        );

        let (_, layout) = layout_of(&program, FieldLayout::default());
        let mut out = Vec::new();
        layout.write_vtables(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "@.Main_vtable = global [0 x i8*] []\n\n\
             @.A_vtable = global [1 x i8*] [\n\
             \ti8* bitcast (i1 (i8*, i32)* @A.m to i8*)\n\
             ]\n\n\
             @.B_vtable = global [0 x i8*] []\n\n"
        );
    }

    #[test]
    fn dump_lists_fields_and_slots() {
        let mut strtab = StringTable::new();
        let (main, args) = (strtab.intern("Main"), strtab.intern("args"));
        let (a, b, x, y, m) = (
            strtab.intern("A"),
            strtab.intern("B"),
            strtab.intern("x"),
            strtab.intern("y"),
            strtab.intern("m"),
        );
        let program = program(
            main_class(main, args, vec![], vec![]),
            vec![
                class(
                    a,
                    None,
                    vec![var(Type::Int, x)],
                    vec![method(Type::Int, m, vec![], vec![], vec![], int(0))],
                ),
                class(b, Some(a), vec![var(Type::Boolean, y)], vec![]),
            ],
        );

        let (model, layout) = layout_of(&program, FieldLayout::default());
        let mut out = Vec::new();
        layout.dump(&model, &mut out).unwrap();
        let dump = String::from_utf8(out).unwrap();
        assert!(dump.contains("class B: object size 13, allocation size 21\n"));
        assert!(dump.contains("  field A.x: int at this + 8\n  field B.y: boolean at this + 12\n"));
        assert!(dump.contains("  slot 0: A.m\n"));
    }
}
