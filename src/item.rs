//! Identifiers for collected items and the workers that run them.

use std::{
    borrow::{Borrow, Cow},
    fmt::{self, Display},
    ops::Deref,
    sync::Arc,
};

/// An opaque identifier naming one collected item.
///
/// Item ids look like `path/to/test_mod.py::Class::test_fn`, optionally with a
/// bracketed parameter segment and a trailing `@group` tag. Once collected
/// they never change, so they are stored behind an [`Arc`] and cloned freely
/// between the registry, the work units and the worker records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(Arc<str>);

impl ItemId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ItemId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

/// The identity of a worker node, for example `gw0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(Cow<'static, str>);

impl WorkerId {
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for WorkerId {
    fn from(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }
}

impl From<String> for WorkerId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}
