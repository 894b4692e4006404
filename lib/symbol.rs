//! Interned strings.
//!
//! Names of fields, indices, kinds and methods are compared very often by the
//! analysis. A `Symbol` is a handle to a canonical allocation, so equality and
//! hashing never look at the characters.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

static INTERNER: Lazy<Mutex<FxHashMap<Box<str>, Symbol>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

/// A canonical handle for a string.
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Get or create the canonical handle for `value`.
    pub fn intern(value: &str) -> Symbol {
        let mut interner = INTERNER.lock();
        if let Some(symbol) = interner.get(value) {
            return symbol.clone();
        }
        let symbol = Symbol(Arc::from(value));
        interner.insert(Box::from(value), symbol.clone());
        symbol
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const u8 as usize).hash(state)
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Deref for Symbol {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Symbol {
        Symbol::intern(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Symbol {
        Symbol::intern(&value)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Symbol::intern(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn interned_symbols_share_allocation() {
        let a = Symbol::intern("field");
        let b = Symbol::from(String::from("field"));
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_ne!(a, Symbol::intern("other"));
    }

    #[test]
    fn symbols_order_by_content() {
        let set: BTreeSet<Symbol> = vec!["b", "c", "a"].into_iter().map(Symbol::intern).collect();
        let names: Vec<&str> = set.iter().map(|symbol| symbol.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn interning_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| Symbol::intern("shared")))
            .collect();
        let symbols: Vec<Symbol> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for symbol in &symbols {
            assert_eq!(*symbol, Symbol::intern("shared"));
        }
    }
}
