//! Type-safe identifiers for directory entities
//!
//! The directory service hands out opaque string ids. Wrapping them in a typed
//! `Id<T>` keeps a position id from being passed where a department id is
//! expected, while still serializing as the bare string the service uses.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt::{self, Display};
use std::marker::PhantomData;

/// A typed identifier of a directory entity
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    /// The raw id as issued by the directory service
    raw: String,
    /// Phantom data to make each ID type unique
    _phantom: PhantomData<T>,
}

impl<T: IdType> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", T::KIND, self.raw)
    }
}

/// Trait for types that can be used as ID markers
pub trait IdType: Send + Sync + 'static {
    /// Human-readable entity kind (e.g., "position", "department")
    const KIND: &'static str;
}

impl<T: IdType> Id<T> {
    /// Wrap a raw id string
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _phantom: PhantomData,
        }
    }

    /// Get the raw id string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Get the entity kind for this ID type
    pub fn kind(&self) -> &'static str {
        T::KIND
    }

    /// Blank ids show up in remote payloads and are never looked up
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl<T: IdType> Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<T: IdType> From<&str> for Id<T> {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<T: IdType> From<String> for Id<T> {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<T: IdType> From<Id<T>> for String {
    fn from(id: Id<T>) -> Self {
        id.raw
    }
}

impl<T: IdType> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl<T: IdType> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl<T: IdType> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de, T: IdType> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(IdVisitor::<T>(PhantomData))
    }
}

struct IdVisitor<T>(PhantomData<T>);

impl<'de, T: IdType> Visitor<'de> for IdVisitor<T> {
    type Value = Id<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a {} id as a string or integer", T::KIND)
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Id::new(s))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Id::new(s))
    }

    // Some legacy endpoints still emit numeric ids
    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Id::new(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Id::new(v.to_string()))
    }
}

/// Macro to define new ID types with minimal boilerplate
#[macro_export]
macro_rules! define_id_type {
    ($type_name:ident, $kind:expr) => {
        /// Marker type for the ID
        #[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
        pub struct $type_name;

        impl $crate::id::IdType for $type_name {
            const KIND: &'static str = $kind;
        }
    };
}

define_id_type!(PositionIdType, "position");
define_id_type!(PersonnelIdType, "personnel");
define_id_type!(DepartmentIdType, "department");

/// Type alias for Position IDs
pub type PositionId = Id<PositionIdType>;

/// Type alias for PersonnelNumber (user) IDs
pub type PersonnelId = Id<PersonnelIdType>;

/// Type alias for Department IDs
pub type DepartmentId = Id<DepartmentIdType>;

/// Render a batch of ids for log fields and error messages
pub fn join_ids<T: IdType>(ids: &[Id<T>]) -> String {
    ids.iter()
        .map(Id::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
