use std::any::{Any, TypeId};

/// Helper trait for types that can flow through a pin
pub trait PinData: Send + Sync + Clone + PartialEq + Default + std::fmt::Debug + 'static {}

impl<T> PinData for T where T: Send + Sync + Clone + PartialEq + Default + std::fmt::Debug + 'static {}

/// Runtime descriptor of a pin's element type.
///
/// Node kinds are plugins, so pin compatibility is decided on these tags at
/// runtime instead of through generics. Two tags are equal iff they describe
/// the same concrete type.
#[derive(Clone, Copy)]
pub struct TypeTag {
    type_id: TypeId,
    type_name: &'static str,
    default_fn: fn() -> TypedValue,
}

impl TypeTag {
    /// Create the tag for type `T`
    pub fn of<T: PinData>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            default_fn: || TypedValue::new(T::default()),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Build a fresh default value of this type
    pub fn default_value(&self) -> TypedValue {
        (self.default_fn)()
    }

    /// Check if this tag describes type `T`
    pub fn is<T: 'static>(&self) -> bool {
        TypeId::of::<T>() == self.type_id
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeTag {}

impl std::hash::Hash for TypeTag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl std::fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypeTag").field(&self.type_name).finish()
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

/// Type-erased but type-safe container for the current value of a pin
pub struct TypedValue {
    data: Box<dyn Any + Send + Sync>,
    clone_fn: fn(&dyn Any) -> Box<dyn Any + Send + Sync>,
    eq_fn: fn(&dyn Any, &dyn Any) -> bool,
    debug_fn: fn(&dyn Any, &mut std::fmt::Formatter<'_>) -> std::fmt::Result,
    tag: TypeTag,
}

impl TypedValue {
    /// Create a new typed value
    pub fn new<T: PinData>(value: T) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            data: Box::new(value),
            clone_fn: |any| match any.downcast_ref::<T>() {
                Some(typed) => Box::new(typed.clone()),
                None => Box::new(T::default()),
            },
            eq_fn: |a, b| match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            debug_fn: |any, f| match any.downcast_ref::<T>() {
                Some(typed) => write!(f, "{:?}", typed),
                None => write!(f, "<{}>", std::any::type_name::<T>()),
            },
        }
    }

    /// Get a reference to the contained value
    pub fn get<T: 'static>(&self) -> Result<&T, String> {
        if !self.tag.is::<T>() {
            return Err(format!(
                "Type mismatch: expected {}, found {}",
                std::any::type_name::<T>(),
                self.tag.type_name()
            ));
        }

        self.data
            .downcast_ref::<T>()
            .ok_or_else(|| format!("Failed to downcast to {}", std::any::type_name::<T>()))
    }

    /// Consume the typed value and return the contained value
    pub fn into_inner<T: 'static>(self) -> Result<T, String> {
        if !self.tag.is::<T>() {
            return Err(format!(
                "Type mismatch: expected {}, found {}",
                std::any::type_name::<T>(),
                self.tag.type_name()
            ));
        }

        self.data
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| format!("Failed to downcast to {}", std::any::type_name::<T>()))
    }

    /// Get the runtime type tag of the contained value
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Get the type name of the contained value
    pub fn type_name(&self) -> &'static str {
        self.tag.type_name()
    }

    /// Check if the contained value is of type T
    pub fn is_type<T: 'static>(&self) -> bool {
        self.tag.is::<T>()
    }
}

impl Clone for TypedValue {
    fn clone(&self) -> Self {
        Self {
            data: (self.clone_fn)(self.data.as_ref()),
            clone_fn: self.clone_fn,
            eq_fn: self.eq_fn,
            debug_fn: self.debug_fn,
            tag: self.tag,
        }
    }
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && (self.eq_fn)(self.data.as_ref(), other.data.as_ref())
    }
}

impl std::fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        (self.debug_fn)(self.data.as_ref(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_value_basic() {
        let value = TypedValue::new(42i64);
        assert_eq!(value.get::<i64>().unwrap(), &42);
        assert!(value.is_type::<i64>());
        assert!(!value.is_type::<String>());
    }

    #[test]
    fn test_typed_value_type_mismatch() {
        let value = TypedValue::new(42i64);
        let result = value.get::<String>();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Type mismatch"));
    }

    #[test]
    fn test_typed_value_equality_and_clone() {
        let a = TypedValue::new(true);
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, TypedValue::new(false));
        // Same payload bits, different type
        assert_ne!(TypedValue::new(1i32), TypedValue::new(1u32));
    }

    #[test]
    fn test_type_tag_identity_not_convertibility() {
        assert_eq!(TypeTag::of::<i32>(), TypeTag::of::<i32>());
        assert_ne!(TypeTag::of::<i32>(), TypeTag::of::<i64>());
        assert_eq!(TypeTag::of::<u8>().default_value().into_inner::<u8>().unwrap(), 0);
    }
}
