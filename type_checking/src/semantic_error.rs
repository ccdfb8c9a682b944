use failure::Fail;
use strtab::Symbol;

/// Errors found while resolving the class hierarchy and checking method
/// declarations and bodies.
#[derive(Debug, Fail)]
pub enum SemanticError {
    #[fail(display = "class {} has already been declared", name)]
    DuplicateClass { name: String },

    #[fail(display = "class {} cannot extend undeclared class {}", class, parent)]
    UnknownSuperclass { class: String, parent: String },

    #[fail(display = "cyclic inheritance involving class {}", class)]
    CyclicInheritance { class: String },

    #[fail(display = "class {} cannot extend the main class {}", class, parent)]
    CannotExtendMainClass { class: String, parent: String },

    #[fail(display = "field {} is already declared in class {}", name, class)]
    DuplicateField { name: String, class: String },

    #[fail(display = "method {}() is already declared in class {}", name, class)]
    DuplicateMethod { name: String, class: String },

    #[fail(display = "method {}() cannot have the same name as its class", name)]
    MethodNamedLikeClass { name: String },

    #[fail(
        display = "method {}() cannot have the same name as a field of class {}",
        name, class
    )]
    MethodNamedLikeField { name: String, class: String },

    #[fail(display = "cannot find class {}{}", name, hint)]
    UnknownType { name: String, hint: String },

    #[fail(display = "the name {} is already being used in method {}()", name, method)]
    NameAlreadyUsed { name: String, method: String },

    #[fail(display = "the parameter {} of main cannot be used", name)]
    MainMethodParamUsed { name: String },

    #[fail(display = "this cannot be used in the static main method")]
    ThisInMainMethod,

    #[fail(
        display = "method {}() overrides {}.{}() with return type {} instead of {}",
        method, ancestor, method, actual, expected
    )]
    OverrideReturnType {
        method: String,
        ancestor: String,
        expected: String,
        actual: String,
    },

    #[fail(
        display = "method {}() overrides {}.{}() with {} parameter(s) instead of {}",
        method, ancestor, method, actual, expected
    )]
    OverrideParamCount {
        method: String,
        ancestor: String,
        expected: usize,
        actual: usize,
    },

    #[fail(
        display = "method {}() overrides {}.{}() with parameter {} of type {} instead of {}",
        method, ancestor, method, position, actual, expected
    )]
    OverrideParamType {
        method: String,
        ancestor: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[fail(
        display = "bad operand types for binary operator '{}': {} and {}",
        op, lhs, rhs
    )]
    InvalidOperands { op: String, lhs: String, rhs: String },

    #[fail(display = "bad operand type {} for unary operator '!'", ty)]
    InvalidNotOperand { ty: String },

    #[fail(display = "incompatible types: {} cannot be converted to {}", actual, expected)]
    IncompatibleTypes { expected: String, actual: String },

    #[fail(display = "cannot find symbol {}{}", name, hint)]
    UnknownIdentifier { name: String, hint: String },

    #[fail(display = "variable {} might not have been initialized", name)]
    Uninitialized { name: String },

    #[fail(display = "condition must be boolean, found {}", ty)]
    ConditionMustBeBoolean { ty: String },

    #[fail(display = "System.out.println expects int, found {}", ty)]
    PrintRequiresInt { ty: String },

    #[fail(display = "array index must be int, found {}", ty)]
    IndexMustBeInt { ty: String },

    #[fail(display = "array size must be int, found {}", ty)]
    ArraySizeMustBeInt { ty: String },

    #[fail(display = "array required, but {} found", ty)]
    NotAnArray { ty: String },

    #[fail(display = "{} cannot be dereferenced", ty)]
    CannotDereference { ty: String },

    #[fail(display = "the main class {} cannot be instantiated", name)]
    CannotInstantiateMainClass { name: String },

    #[fail(display = "method {}() does not exist on type {}{}", method, ty, hint)]
    MethodDoesNotExistOnType {
        method: String,
        ty: String,
        hint: String,
    },

    #[fail(
        display = "method {}() expects {} argument(s), but {} were given",
        method, expected, actual
    )]
    ArgCountMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[fail(
        display = "argument {} of {}() must be {}, found {}",
        position, method, expected, actual
    )]
    ArgTypeMismatch {
        method: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[fail(
        display = "method {}() must return {}, found {}",
        method, expected, actual
    )]
    ReturnTypeMismatch {
        method: String,
        expected: String,
        actual: String,
    },
}

/// Renders the "did you mean" suffix of unresolved-name errors.
pub fn did_you_mean(suggestion: Option<Symbol<'_>>) -> String {
    match suggestion {
        Some(name) => format!("; did you mean {}?", name),
        None => String::new(),
    }
}
