//! The class model: every declared class with its fields, methods and
//! inheritance edge.
//!
//! Classes live in an arena and refer to each other (parent links, method
//! owners) by [`ClassId`]. The model is filled by the hierarchy resolver,
//! annotated by the checker (types, initialization flags) and by the layout
//! builder (offsets, slots), and read by code generation.

use ast::Type;
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
};
use strtab::Symbol;

#[derive(Debug)]
pub struct ClassAlreadyDeclared;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(usize);

impl ClassId {
    /// The main class is always registered first.
    pub fn main() -> ClassId {
        ClassId(0)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Refers to method `index` in the declaration-ordered method list of
/// `class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: ClassId,
    pub index: usize,
}

/// Refers to field `index` in the declaration-ordered field list of `class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: ClassId,
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct ClassModel<'src> {
    classes: Vec<ClassDef<'src>>,
    by_name: HashMap<Symbol<'src>, ClassId>,
}

impl<'src> ClassModel<'src> {
    pub fn new() -> Self {
        ClassModel::default()
    }

    pub fn add_class(&mut self, class_def: ClassDef<'src>) -> Result<ClassId, ClassAlreadyDeclared> {
        let id = ClassId(self.classes.len());
        if let Some(parent) = class_def.parent {
            debug_assert!(parent < id, "parents are declared before their children");
        }
        match self.by_name.entry(class_def.name) {
            Entry::Occupied(_) => Err(ClassAlreadyDeclared),
            Entry::Vacant(e) => {
                e.insert(id);
                self.classes.push(class_def);
                Ok(id)
            }
        }
    }

    pub fn lookup(&self, name: Symbol<'src>) -> Option<ClassId> {
        self.by_name.get(&name).cloned()
    }

    pub fn class(&self, id: ClassId) -> &ClassDef<'src> {
        &self.classes[id.0]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDef<'src> {
        &mut self.classes[id.0]
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All classes in declaration order, the main class first.
    pub fn ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len()).map(ClassId)
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassDef<'src>)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, class)| (ClassId(i), class))
    }

    /// Parent, grandparent, ... of `id`, nearest first.
    pub fn ancestors(&self, id: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        let mut next = self.class(id).parent;
        std::iter::from_fn(move || {
            let current = next?;
            next = self.class(current).parent;
            Some(current)
        })
    }

    /// `id` followed by its ancestors.
    pub fn chain(&self, id: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::once(id).chain(self.ancestors(id))
    }

    /// The topmost ancestor of `id`, or `id` itself if it has no parent.
    pub fn chain_root(&self, id: ClassId) -> ClassId {
        self.ancestors(id).last().unwrap_or(id)
    }

    pub fn is_subclass_of(&self, sub: ClassId, sup: ClassId) -> bool {
        self.chain(sub).any(|id| id == sup)
    }

    pub fn is_valid_type(&self, ty: &CheckedType<'src>) -> bool {
        match ty {
            CheckedType::Class(name) => self.by_name.contains_key(name),
            _ => true,
        }
    }

    /// Whether a value of type `from` may be stored in a location of type
    /// `to`. Class types widen to any of their ancestors.
    pub fn is_assignable(&self, to: &CheckedType<'src>, from: &CheckedType<'src>) -> bool {
        match (to, from) {
            (CheckedType::Class(to_name), CheckedType::Class(from_name)) => {
                match (self.lookup(*to_name), self.lookup(*from_name)) {
                    (Some(to_id), Some(from_id)) => self.is_subclass_of(from_id, to_id),
                    _ => to_name == from_name,
                }
            }
            _ => to == from,
        }
    }

    /// Field lookup through the own class first, then the nearest ancestor.
    pub fn find_field(&self, class: ClassId, name: Symbol<'src>) -> Option<FieldRef> {
        self.chain(class).find_map(|id| {
            self.class(id)
                .fields
                .iter()
                .position(|field| field.name == name)
                .map(|index| FieldRef { class: id, index })
        })
    }

    /// Method lookup through the own class first, then the nearest ancestor.
    /// The static main method is never found.
    pub fn find_method(&self, class: ClassId, name: Symbol<'src>) -> Option<MethodRef> {
        self.chain(class).find_map(|id| {
            self.class(id)
                .methods
                .iter()
                .position(|method| method.name == name)
                .map(|index| MethodRef { class: id, index })
        })
    }

    pub fn field(&self, field: FieldRef) -> &FieldDef<'src> {
        &self.class(field.class).fields[field.index]
    }

    pub fn field_mut(&mut self, field: FieldRef) -> &mut FieldDef<'src> {
        &mut self.class_mut(field.class).fields[field.index]
    }

    pub fn method(&self, method: MethodRef) -> &MethodDef<'src> {
        &self.class(method.class).methods[method.index]
    }

    pub fn method_mut(&mut self, method: MethodRef) -> &mut MethodDef<'src> {
        &mut self.class_mut(method.class).methods[method.index]
    }

    /// Every field visible in `class`, own fields first.
    pub fn visible_fields(&self, class: ClassId) -> impl Iterator<Item = &FieldDef<'src>> + '_ {
        self.chain(class)
            .flat_map(move |id| self.class(id).fields.iter())
    }

    /// Every method callable on `class`, own methods first.
    pub fn visible_methods(&self, class: ClassId) -> impl Iterator<Item = &MethodDef<'src>> + '_ {
        self.chain(class)
            .flat_map(move |id| self.class(id).methods.iter())
    }
}

#[derive(Debug)]
pub struct ClassDef<'src> {
    pub name: Symbol<'src>,
    pub line: usize,
    pub parent: Option<ClassId>,
    pub fields: Vec<FieldDef<'src>>,
    pub methods: Vec<MethodDef<'src>>,
    /// Closure over all ancestors of the methods this class does not declare
    /// itself, in ancestor declaration order. A name declared by several
    /// ancestors refers to the nearest one.
    pub inherited_methods: Vec<InheritedMethod<'src>>,
    pub main_method: Option<MainMethodDef<'src>>,
}

impl<'src> ClassDef<'src> {
    pub fn new(name: Symbol<'src>, line: usize) -> Self {
        ClassDef {
            name,
            line,
            parent: None,
            fields: Vec::new(),
            methods: Vec::new(),
            inherited_methods: Vec::new(),
            main_method: None,
        }
    }

    pub fn is_main(&self) -> bool {
        self.main_method.is_some()
    }

    pub fn field_index(&self, name: Symbol<'src>) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn method_index(&self, name: Symbol<'src>) -> Option<usize> {
        self.methods.iter().position(|method| method.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InheritedMethod<'src> {
    pub name: Symbol<'src>,
    pub method: MethodRef,
}

#[derive(Debug, Clone)]
pub struct FieldDef<'src> {
    pub name: Symbol<'src>,
    pub ty: CheckedType<'src>,
    pub line: usize,
    /// Byte offset inside the field region (after the vtable pointer),
    /// assigned by the layout builder.
    pub offset: Option<usize>,
    pub initialized: bool,
}

impl<'src> FieldDef<'src> {
    pub fn new(name: Symbol<'src>, ty: CheckedType<'src>, line: usize) -> Self {
        FieldDef {
            name,
            ty,
            line,
            offset: None,
            initialized: false,
        }
    }
}

/// A parameter or local variable.
#[derive(Debug, Clone)]
pub struct VarDef<'src> {
    pub name: Symbol<'src>,
    pub ty: CheckedType<'src>,
    pub line: usize,
    pub initialized: bool,
}

#[derive(Debug, Clone)]
pub struct MethodDef<'src> {
    pub name: Symbol<'src>,
    pub line: usize,
    /// The declaring class.
    pub owner: ClassId,
    pub return_ty: CheckedType<'src>,
    pub param_count: usize,
    /// Parameters first, then the local variables, in declaration order.
    pub locals: Vec<VarDef<'src>>,
    /// Byte offset of the vtable slot, assigned by the layout builder.
    pub slot_offset: Option<usize>,
}

impl<'src> MethodDef<'src> {
    pub fn new(
        name: Symbol<'src>,
        line: usize,
        owner: ClassId,
        return_ty: CheckedType<'src>,
    ) -> Self {
        MethodDef {
            name,
            line,
            owner,
            return_ty,
            param_count: 0,
            locals: Vec::new(),
            slot_offset: None,
        }
    }

    pub fn params(&self) -> &[VarDef<'src>] {
        &self.locals[..self.param_count]
    }

    pub fn param_types(&self) -> impl Iterator<Item = &CheckedType<'src>> + '_ {
        self.params().iter().map(|param| &param.ty)
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot_offset.map(|offset| offset / 8)
    }
}

/// `public static void main(String[] param)`: not virtual, not inherited.
#[derive(Debug, Clone)]
pub struct MainMethodDef<'src> {
    pub param_name: Symbol<'src>,
    pub locals: Vec<VarDef<'src>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckedType<'src> {
    Int,
    Boolean,
    IntArray,
    BooleanArray,
    Class(Symbol<'src>),
}

impl<'src> CheckedType<'src> {
    pub fn from_ast(ty: &Type<'src>) -> Self {
        match ty {
            Type::Int => CheckedType::Int,
            Type::Boolean => CheckedType::Boolean,
            Type::IntArray => CheckedType::IntArray,
            Type::BooleanArray => CheckedType::BooleanArray,
            Type::Class(name) => CheckedType::Class(*name),
        }
    }

    /// Element type of an array type.
    pub fn element_type(&self) -> Option<CheckedType<'src>> {
        match self {
            CheckedType::IntArray => Some(CheckedType::Int),
            CheckedType::BooleanArray => Some(CheckedType::Boolean),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.element_type().is_some()
    }

    pub fn class_name(&self) -> Option<Symbol<'src>> {
        match self {
            CheckedType::Class(name) => Some(*name),
            _ => None,
        }
    }
}

impl<'src> fmt::Display for CheckedType<'src> {
    fn fmt(&self, f: &'_ mut fmt::Formatter<'_>) -> fmt::Result {
        use self::CheckedType::*;
        match self {
            Int => write!(f, "int"),
            Boolean => write!(f, "boolean"),
            IntArray => write!(f, "int[]"),
            BooleanArray => write!(f, "boolean[]"),
            Class(name) => write!(f, "{}", name),
        }
    }
}
