//! Item: Named, typed values stored inside a message.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared opaque object that can ride along in a message.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Maximum number of items a single message can hold.
pub const MAX_ITEMS: usize = 64;

/// Type tag of an item value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Owned UTF-8 string.
    String,
    /// Shared opaque object.
    Object,
}

/// The value half of an item.
#[derive(Clone)]
pub enum ItemValue {
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Owned UTF-8 string.
    String(String),
    /// Shared opaque object.
    Object(Object),
}

impl ItemValue {
    /// The type tag of this value.
    pub const fn item_type(&self) -> ItemType {
        match self {
            Self::Int32(_) => ItemType::Int32,
            Self::Int64(_) => ItemType::Int64,
            Self::String(_) => ItemType::String,
            Self::Object(_) => ItemType::Object,
        }
    }
}

impl fmt::Debug for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32(v) => write!(f, "Int32({v})"),
            Self::Int64(v) => write!(f, "Int64({v})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Object(obj) => write!(f, "Object({:p})", Arc::as_ptr(obj)),
        }
    }
}

/// A single named entry.
#[derive(Debug, Clone)]
pub struct Item {
    name: Box<str>,
    value: ItemValue,
}

impl Item {
    /// Item name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Item value.
    #[inline]
    pub const fn value(&self) -> &ItemValue {
        &self.value
    }
}

/// Insertion-ordered item table with unique names.
///
/// Lookups are a linear scan over at most [`MAX_ITEMS`] entries, which beats
/// hashing at this size.
#[derive(Debug, Clone, Default)]
pub(crate) struct Items {
    items: Vec<Item>,
}

impl Items {
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| *item.name == *name)
    }

    /// Insert or overwrite `name`. The previous value, if any, is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `name` is new and the table already holds [`MAX_ITEMS`] entries.
    pub(crate) fn upsert(&mut self, name: &str, value: ItemValue) {
        if let Some(i) = self.index_of(name) {
            self.items[i].value = value;
            return;
        }
        assert!(
            self.items.len() < MAX_ITEMS,
            "message item capacity ({MAX_ITEMS}) exceeded while adding {name:?}"
        );
        self.items.push(Item {
            name: name.into(),
            value,
        });
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ItemValue> {
        self.index_of(name).map(|i| &self.items[i].value)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<ItemValue> {
        self.index_of(name).map(|i| self.items.remove(i).value)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}
