use itertools::Itertools;
use std::iter;
use type_checking::{CheckedType, MethodDef};

/// `int[]` is a pointer to the `i32` count followed by the elements.
/// `boolean[]` is a byte pointer to an `i32` count followed by one byte per
/// element, so booleans are widened to `i8` in memory and truncated back to
/// `i1` on load.
pub fn llvm_type(ty: &CheckedType<'_>) -> &'static str {
    match ty {
        CheckedType::Int => "i32",
        CheckedType::Boolean => "i1",
        CheckedType::IntArray => "i32*",
        CheckedType::BooleanArray | CheckedType::Class(_) => "i8*",
    }
}

/// Size of a value of type `ty` inside an object.
pub fn size_of(ty: &CheckedType<'_>) -> usize {
    match ty {
        CheckedType::Int => 4,
        CheckedType::Boolean => 1,
        CheckedType::IntArray | CheckedType::BooleanArray | CheckedType::Class(_) => 8,
    }
}

/// The function type of `method`, e.g. `i32 (i8*, i32, i1)`. The first
/// parameter is always `this`.
pub fn method_signature(method: &MethodDef<'_>) -> String {
    format!(
        "{} ({})",
        llvm_type(&method.return_ty),
        iter::once("i8*")
            .chain(method.param_types().map(llvm_type))
            .join(", ")
    )
}
