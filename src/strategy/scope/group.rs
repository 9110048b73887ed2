use std::borrow::Cow;

use crate::scope::ScopeResolver;

/// Return the scope key of an item id, honoring `@group` tags.
///
/// If the id ends in a group tag, that is, its last `@` comes after its last
/// `]`, the text after the last `@` is the key. Otherwise the whole id is its
/// own key. The `]` check keeps parameter values like `test[user@host]` from
/// being read as a group tag.
///
/// ```
/// use kidist::scope::resolve_scope;
///
/// assert_eq!(resolve_scope("mod.py::test[x]@grp"), "grp");
/// assert_eq!(resolve_scope("mod.py::test[x@y]"), "mod.py::test[x@y]");
/// ```
pub fn resolve_scope(item: &str) -> &str {
    match item.rsplit_once('@') {
        Some((_, group)) if !group.contains(']') => group,
        _ => item,
    }
}

/// A [`ScopeResolver`] that groups items by their trailing `@group` tag.
///
/// Items without a tag form a scope of their own. See [`resolve_scope`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupScope;

impl ScopeResolver for GroupScope {
    fn resolve<'i>(&self, item: &'i str) -> Option<Cow<'i, str>> {
        Some(Cow::Borrowed(resolve_scope(item)))
    }
}
