//! Append-only token tables used by the writer to emit back-references.
//!
//! A token is the position of an item in first-seen order. The writer looks an
//! item up before encoding it; a hit becomes a short "duplicate" reference, a miss
//! is written in full and then registered. The reader mirrors this with plain
//! vectors, appending in the same order.

use indexmap::{IndexMap, IndexSet};

use crate::value::Object;

/// Strings written so far, compared by value.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::tokens::StringTokenTable;
///
/// let mut table = StringTokenTable::new();
/// assert_eq!(table.register("a"), 0);
/// assert_eq!(table.register("b"), 1);
/// assert_eq!(table.lookup("a"), Some(0));
/// assert_eq!(table.lookup("c"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StringTokenTable {
    strings: IndexSet<String>,
}

impl StringTokenTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        StringTokenTable {
            strings: IndexSet::with_capacity(capacity),
        }
    }

    #[inline]
    #[must_use]
    pub fn lookup(&self, value: &str) -> Option<usize> {
        self.strings.get_index_of(value)
    }

    /// Appends `value` and returns its token. Registering a string that is already
    /// present returns the existing token.
    pub fn register(&mut self, value: &str) -> usize {
        if let Some(index) = self.lookup(value) {
            return index;
        }
        self.strings.insert(value.to_string());
        self.strings.len() - 1
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get_index(index).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Objects written so far, compared by identity.
///
/// The table keeps a handle to every registered object, so an address can never be
/// reused by a different instance while the table is alive.
#[derive(Debug, Clone, Default)]
pub struct ObjectTokenTable {
    objects: IndexMap<usize, Object>,
}

impl ObjectTokenTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn lookup(&self, object: &Object) -> Option<usize> {
        self.objects.get_index_of(&object.handle())
    }

    /// Appends `object` and returns its token, or the existing token for the same
    /// instance.
    pub fn register(&mut self, object: &Object) -> usize {
        let (index, _) = self.objects.insert_full(object.handle(), object.clone());
        index
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Object> {
        self.objects.get_index(index).map(|(_, object)| object)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
