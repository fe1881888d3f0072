//! Configuration options for writers and readers.
//!
//! This module provides the types that configure a stream:
//!
//! - [`WriterOptions`]: decimal scale handling, header kind, buffer capacity, registry
//! - [`ReaderOptions`]: expected header kind, explicit table sizes, registry
//! - [`HeaderKind`]: full (12-byte) or minimal (4-byte) header
//!
//! ## Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use fast_serializer::{HeaderKind, ReaderOptions, TypeRegistry, WriterOptions};
//!
//! let registry = Arc::new(TypeRegistry::new());
//!
//! // Keep "2.00" as "2.00" instead of "2"
//! let writer_options = WriterOptions::new()
//!     .with_preserve_decimal_scale(true)
//!     .with_registry(Arc::clone(&registry));
//!
//! // Data produced for a sink that could not be rewound
//! let reader_options = ReaderOptions::new()
//!     .with_header(HeaderKind::Minimal)
//!     .with_registry(registry);
//! # let _ = (writer_options, reader_options);
//! ```

use std::sync::Arc;

use crate::registry::TypeRegistry;

/// Layout of the header at the start of a stream.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::HeaderKind;
///
/// assert_eq!(HeaderKind::Full.size(), 12);
/// assert_eq!(HeaderKind::Minimal.size(), 4);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HeaderKind {
    /// Total length plus both table sizes, three little-endian `i32`.
    #[default]
    Full,
    /// Both table sizes only, two little-endian `u16`.
    Minimal,
}

impl HeaderKind {
    /// Size of the header in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            HeaderKind::Full => 12,
            HeaderKind::Minimal => 4,
        }
    }
}

/// Configuration for a [`SerializationWriter`](crate::SerializationWriter).
///
/// # Examples
///
/// ```rust
/// use fast_serializer::WriterOptions;
///
/// let options = WriterOptions::new();
/// assert!(!options.preserve_decimal_scale);
/// assert!(options.allow_update_header);
/// ```
#[derive(Clone, Debug)]
pub struct WriterOptions {
    /// Keep trailing zero digits of decimals ("2.00" stays "2.00").
    pub preserve_decimal_scale: bool,
    /// When false the writer reserves the minimal header and never records the total length.
    pub allow_update_header: bool,
    /// Initial capacity of the in-memory buffer.
    pub capacity: usize,
    pub registry: Arc<TypeRegistry>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            preserve_decimal_scale: false,
            allow_update_header: true,
            capacity: 1024,
            registry: Arc::new(TypeRegistry::default()),
        }
    }
}

impl WriterOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether decimals keep their scale when written optimized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fast_serializer::WriterOptions;
    ///
    /// let options = WriterOptions::new().with_preserve_decimal_scale(true);
    /// assert!(options.preserve_decimal_scale);
    /// ```
    #[must_use]
    pub fn with_preserve_decimal_scale(mut self, preserve: bool) -> Self {
        self.preserve_decimal_scale = preserve;
        self
    }

    #[must_use]
    pub fn with_allow_update_header(mut self, allow: bool) -> Self {
        self.allow_update_header = allow;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Header reserved by an in-memory or seekable writer with these options.
    #[must_use]
    pub const fn header_kind(&self) -> HeaderKind {
        if self.allow_update_header {
            HeaderKind::Full
        } else {
            HeaderKind::Minimal
        }
    }
}

/// Configuration for a [`SerializationReader`](crate::SerializationReader).
#[derive(Clone, Debug, Default)]
pub struct ReaderOptions {
    pub header: HeaderKind,
    /// String and object table sizes supplied out of band. When set they replace the
    /// sizes found in the header, which is still consumed.
    pub table_sizes: Option<(usize, usize)>,
    pub registry: Arc<TypeRegistry>,
}

impl ReaderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, header: HeaderKind) -> Self {
        self.header = header;
        self
    }

    /// Supplies the token table sizes, as needed for streams whose header was
    /// never patched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fast_serializer::ReaderOptions;
    ///
    /// let options = ReaderOptions::new().with_table_sizes(3, 1);
    /// assert_eq!(options.table_sizes, Some((3, 1)));
    /// ```
    #[must_use]
    pub fn with_table_sizes(mut self, strings: usize, objects: usize) -> Self {
        self.table_sizes = Some((strings, objects));
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }
}
