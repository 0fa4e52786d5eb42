//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}

/// Find an entity by id in an insertion-ordered table.
pub fn find_by_id<'a, T: Entity>(rows: &'a [T], id: T::Id) -> Option<&'a T> {
    rows.iter().find(|row| row.id() == id)
}

/// Mutable variant of [`find_by_id`].
pub fn find_by_id_mut<'a, T: Entity>(rows: &'a mut [T], id: T::Id) -> Option<&'a mut T> {
    rows.iter_mut().find(|row| row.id() == id)
}
