//! Typed attribute storage.
//!
//! [`Attributes`] is the property bag behind the per-call [`Context`](crate::Context)
//! and the signing property set handed to signers. Values are stored under an
//! [`AttributeKey<T>`], which carries the value type. Storage is keyed by the key
//! name *and* `TypeId::of::<T>()`, so a lookup can only ever find a value of the
//! type the key promises.
//!
//! # Example
//!
//! ```
//! use hermes_core::{AttributeKey, Attributes};
//!
//! const REGION: AttributeKey<String> = AttributeKey::new("region");
//!
//! let mut attrs = Attributes::new();
//! attrs.set(&REGION, "eu-west-1".to_string());
//! assert_eq!(attrs.get(&REGION).map(String::as_str), Some("eu-west-1"));
//! ```

use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// A typed key into an [`Attributes`] bag.
///
/// Keys are usually declared as constants next to the code that owns them.
pub struct AttributeKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
    /// Creates a key with the given diagnostic name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the key name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for AttributeKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttributeKey<T> {}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeKey({})", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Slot {
    name: &'static str,
    type_id: TypeId,
}

impl Slot {
    fn of<T: 'static>(key: &AttributeKey<T>) -> Self {
        Self {
            name: key.name,
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Type-safe, insertion-ordered attribute bag.
#[derive(Default)]
pub struct Attributes {
    values: IndexMap<Slot, Box<dyn Any + Send + Sync>>,
}

impl Attributes {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &AttributeKey<T>) -> Option<&T> {
        self.values
            .get(&Slot::of(key))
            .and_then(|value| value.downcast_ref())
    }

    /// Returns a mutable reference to the value stored under `key`, if any.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self, key: &AttributeKey<T>) -> Option<&mut T> {
        self.values
            .get_mut(&Slot::of(key))
            .and_then(|value| value.downcast_mut())
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &AttributeKey<T>, value: T) -> Option<T> {
        self.values
            .insert(Slot::of(key), Box::new(value))
            .and_then(|previous| previous.downcast().ok())
            .map(|boxed| *boxed)
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Remaining entries keep their relative order.
    pub fn remove<T: Send + Sync + 'static>(&mut self, key: &AttributeKey<T>) -> Option<T> {
        self.values
            .shift_remove(&Slot::of(key))
            .and_then(|value| value.downcast().ok())
            .map(|boxed| *boxed)
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self, key: &AttributeKey<T>) -> bool {
        self.values.contains_key(&Slot::of(key))
    }

    /// Returns the key names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().map(|slot| slot.name)
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
