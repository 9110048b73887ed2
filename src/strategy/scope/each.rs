use std::borrow::Cow;

use crate::scope::ScopeResolver;

/// A [`ScopeResolver`] that puts every item in a scope of its own.
///
/// This turns off co-location entirely, every work unit holds exactly one item.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EachScope;

impl ScopeResolver for EachScope {
    fn resolve<'i>(&self, item: &'i str) -> Option<Cow<'i, str>> {
        Some(Cow::Borrowed(item))
    }
}
