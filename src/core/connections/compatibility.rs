use crate::core::pins::Pin;

/// Decides whether two pins carry the same element type.
///
/// Implementations work on runtime [`TypeTag`](crate::core::values::TypeTag)s
/// because node kinds are loaded as opaque plugins.
pub trait TypeCompatibility: Send + Sync {
    fn is_same_type(&self, a: &Pin, b: &Pin) -> bool;
}

/// Pins are compatible only when their type tags are identical
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactTypeMatch;

impl TypeCompatibility for ExactTypeMatch {
    fn is_same_type(&self, a: &Pin, b: &Pin) -> bool {
        a.value_type() == b.value_type()
    }
}
