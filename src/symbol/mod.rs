//==================================================
// File: symbol.rs
//==================================================
// Author: Vesper Contributors
// License: MIT License
// Goal: Interned identifier names
// Objective: Provide the Symbol handle and the per-thread intern pool
//==================================================

use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// An interned identifier. Cloning is a pointer copy; two symbols with
/// the same spelling interned on the same thread share storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Symbol(Arc<str>);

thread_local! {
    static POOL: RefCell<HashSet<Arc<str>>> = RefCell::new(HashSet::new());
}

pub fn intern(name: &str) -> Symbol {
    POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        if let Some(existing) = pool.get(name) {
            Symbol(existing.clone())
        } else {
            let entry: Arc<str> = Arc::from(name);
            pool.insert(entry.clone());
            Symbol(entry)
        }
    })
}

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        intern(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        intern(&value)
    }
}

impl Deref for Symbol {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_shares_storage() {
        let a = intern("counter");
        let b = intern("counter");
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn distinct_names_stay_distinct() {
        assert_ne!(intern("alpha"), intern("beta"));
    }
}

//==================================================
// End of file
//==================================================
