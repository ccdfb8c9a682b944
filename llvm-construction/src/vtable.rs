use crate::{type_translation::method_signature, CodegenError};
use itertools::Itertools;
use std::io::{self, Write};
use strtab::Symbol;
use type_checking::{ClassId, ClassModel, MethodRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VTableEntry<'src> {
    pub method: MethodRef,
    pub name: Symbol<'src>,
    /// The class declaring the method, not necessarily the class owning the
    /// vtable.
    pub owner: Symbol<'src>,
    pub signature: String,
}

impl VTableEntry<'_> {
    pub fn function_name(&self) -> String {
        format!("@{}.{}", self.owner, self.name)
    }
}

/// The dispatch table of one class, indexed by slot. Slots no method of the
/// class occupies (which happens when sibling classes share a slot counter)
/// are `None` and emitted as null pointers.
#[derive(Debug, Clone)]
pub struct VTable<'src> {
    pub class: Symbol<'src>,
    pub slots: Vec<Option<VTableEntry<'src>>>,
}

impl<'src> VTable<'src> {
    /// Merges the inherited methods and the own methods of `id` into one
    /// table ordered by slot. The main class always gets an empty table.
    pub fn build(model: &ClassModel<'src>, id: ClassId) -> Result<VTable<'src>, CodegenError> {
        let class_def = model.class(id);
        let mut vtable = VTable {
            class: class_def.name,
            slots: Vec::new(),
        };
        if class_def.is_main() {
            return Ok(vtable);
        }

        let inherited = class_def.inherited_methods.iter().map(|i| i.method);
        let own = (0..class_def.methods.len()).map(|index| MethodRef { class: id, index });

        let mut entries = inherited
            .chain(own)
            .map(|method_ref| {
                let method = model.method(method_ref);
                let slot = method.slot().ok_or_else(|| CodegenError::MissingSlot {
                    name: method.name.to_string(),
                })?;
                Ok((
                    slot,
                    VTableEntry {
                        method: method_ref,
                        name: method.name,
                        owner: model.class(method_ref.class).name,
                        signature: method_signature(method),
                    },
                ))
            })
            .collect::<Result<Vec<_>, CodegenError>>()?;
        entries.sort_by_key(|(slot, _)| *slot);

        let len = entries.last().map_or(0, |(slot, _)| slot + 1);
        vtable.slots = vec![None; len];
        for (slot, entry) in entries {
            log::trace!("{} slot {}: {}", vtable.class, slot, entry.function_name());
            vtable.slots[slot] = Some(entry);
        }

        Ok(vtable)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn global_name(&self) -> String {
        format!("@.{}_vtable", self.class)
    }

    pub fn array_type(&self) -> String {
        format!("[{} x i8*]", self.len())
    }

    /// Slot index of the method called `name`, if the class has one.
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|entry| entry.as_ref().map_or(false, |e| e.name == *name))
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, &VTableEntry<'src>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|e| (slot, e)))
    }

    pub fn write_declaration(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "{} = global {} [", self.global_name(), self.array_type())?;
        if !self.is_empty() {
            let entries = self
                .slots
                .iter()
                .map(|entry| match entry {
                    Some(entry) => format!(
                        "\ti8* bitcast ({}* {} to i8*)",
                        entry.signature,
                        entry.function_name()
                    ),
                    None => "\ti8* null".to_owned(),
                })
                .join(",\n");
            write!(out, "\n{}\n", entries)?;
        }
        writeln!(out, "]")
    }
}
