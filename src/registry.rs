//! Capabilities for types the writer has no built-in encoding for, and the
//! registry that resolves them by name.
//!
//! A value that is not one of the built-in [`Value`](crate::Value) shapes reaches
//! the stream as an [`Object`](crate::Object) in one of two ways:
//!
//! - a [`TypeSurrogate`] registered in the [`TypeRegistry`] claims its type name and
//!   writes it on the type's behalf, or
//! - the type implements [`OwnedDataSerializable`] and writes its own fields.
//!
//! Surrogates are consulted first, in registration order. On the read side the
//! type name from the stream is looked up in the same registry: surrogates again
//! come first, then the constructors registered for [`Recreatable`] types.
//!
//! ## Examples
//!
//! ```rust
//! use std::any::Any;
//! use fast_serializer::{
//!     OwnedDataSerializable, Result, SerializationReader, SerializationWriter, TypeRegistry,
//! };
//!
//! #[derive(Default)]
//! struct Point { x: i32, y: i32 }
//!
//! impl OwnedDataSerializable for Point {
//!     fn serialize_owned_data(
//!         &self,
//!         writer: &mut SerializationWriter<'_>,
//!         _context: Option<&dyn Any>,
//!     ) -> Result<()> {
//!         writer.write_optimized_i32(self.x)?;
//!         writer.write_optimized_i32(self.y)
//!     }
//!
//!     fn deserialize_owned_data(
//!         &mut self,
//!         reader: &mut SerializationReader<'_>,
//!         _context: Option<&dyn Any>,
//!     ) -> Result<()> {
//!         self.x = reader.read_optimized_i32()?;
//!         self.y = reader.read_optimized_i32()?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Point>();
//! assert!(registry.is_recreatable(std::any::type_name::<Point>()));
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::reader::SerializationReader;
use crate::value::Object;
use crate::writer::SerializationWriter;

/// Access to a value as [`Any`], implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A type that writes and reads its own fields directly against the stream.
///
/// The reader has to build an instance before it can call
/// [`deserialize_owned_data`](Self::deserialize_owned_data). When the value is read
/// through [`SerializationReader::read_object`] that instance comes from the
/// registry, so the type must also be registered as [`Recreatable`]. Callers that
/// already hold an instance can use
/// [`SerializationReader::read_owned_data`] instead.
///
/// A type that extends another owned-data type embeds it as a field and calls
/// its methods first, then writes its own fields.
pub trait OwnedDataSerializable: AsAny {
    fn serialize_owned_data(
        &self,
        writer: &mut SerializationWriter<'_>,
        context: Option<&dyn Any>,
    ) -> Result<()>;

    fn deserialize_owned_data(
        &mut self,
        reader: &mut SerializationReader<'_>,
        context: Option<&dyn Any>,
    ) -> Result<()>;
}

/// An owned-data type the reader can instantiate on its own.
pub trait Recreatable: OwnedDataSerializable + Default {}

impl<T: OwnedDataSerializable + Default> Recreatable for T {}

/// An external encoder for types that cannot implement [`OwnedDataSerializable`]
/// themselves.
pub trait TypeSurrogate: Send + Sync {
    /// True when this surrogate handles the type with the given name.
    fn supports_type(&self, type_name: &str) -> bool;

    /// Writes `value`, whose type this surrogate claimed.
    fn serialize(&self, writer: &mut SerializationWriter<'_>, value: &dyn Any) -> Result<()>;

    /// Reads back a value of the named type.
    fn deserialize(&self, reader: &mut SerializationReader<'_>, type_name: &str) -> Result<Object>;
}

type Factory = fn() -> Box<dyn OwnedDataSerializable>;

/// Ordered surrogates plus the owned-data types known by name.
///
/// The registry is an explicit value shared through [`Arc`] by the writer and
/// reader options, so independent streams can use different registries. Build it
/// before serializing; it is not mutated while streams use it.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    surrogates: Vec<Arc<dyn TypeSurrogate>>,
    types: IndexMap<String, Option<Factory>>,
    names: HashMap<TypeId, String>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a surrogate. Earlier surrogates win when several support a type.
    pub fn add_surrogate<S: TypeSurrogate + 'static>(&mut self, surrogate: S) -> &mut Self {
        self.surrogates.push(Arc::new(surrogate));
        self
    }

    /// Builder form of [`add_surrogate`](Self::add_surrogate).
    #[must_use]
    pub fn with_surrogate<S: TypeSurrogate + 'static>(mut self, surrogate: S) -> Self {
        self.add_surrogate(surrogate);
        self
    }

    /// Registers a recreatable type under its Rust type name.
    pub fn register<T: Recreatable>(&mut self) -> &mut Self {
        self.register_as::<T>(type_name::<T>())
    }

    /// Registers a recreatable type under a custom name. Values of `T` are written
    /// with this name, which keeps streams readable when the Rust path changes.
    pub fn register_as<T: Recreatable>(&mut self, name: &str) -> &mut Self {
        let factory: Factory = || Box::new(T::default());
        self.types.insert(name.to_string(), Some(factory));
        self.names.insert(TypeId::of::<T>(), name.to_string());
        self
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_type<T: Recreatable>(mut self) -> Self {
        self.register::<T>();
        self
    }

    /// Records an owned-data type that has no zero-argument constructor. Reading
    /// it back through [`SerializationReader::read_object`] fails with
    /// [`Error::Recreation`] rather than [`Error::UnknownType`].
    pub fn register_known<T: OwnedDataSerializable>(&mut self) -> &mut Self {
        self.types.entry(type_name::<T>().to_string()).or_insert(None);
        self
    }

    /// The name written to the stream for `object`.
    #[must_use]
    pub fn name_of(&self, object: &Object) -> String {
        self.names
            .get(&object.type_id())
            .cloned()
            .unwrap_or_else(|| object.type_name().to_string())
    }

    /// The first surrogate that supports `type_name`.
    #[must_use]
    pub fn surrogate_for(&self, type_name: &str) -> Option<Arc<dyn TypeSurrogate>> {
        self.surrogates
            .iter()
            .find(|surrogate| surrogate.supports_type(type_name))
            .cloned()
    }

    #[must_use]
    pub fn is_recreatable(&self, type_name: &str) -> bool {
        matches!(self.types.get(type_name), Some(Some(_)))
    }

    /// Builds a default instance of the named type.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownType`] when the name was never registered,
    /// [`Error::Recreation`] when it was registered without a constructor.
    pub fn create(&self, type_name: &str) -> Result<Box<dyn OwnedDataSerializable>> {
        match self.types.get(type_name) {
            Some(Some(factory)) => Ok(factory()),
            Some(None) => Err(Error::recreation(type_name)),
            None => Err(Error::unknown_type(type_name)),
        }
    }

    #[must_use]
    pub fn surrogate_count(&self) -> usize {
        self.surrogates.len()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("surrogates", &self.surrogates.len())
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}
