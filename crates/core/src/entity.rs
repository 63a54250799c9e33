//! Entity trait: things tracked by identity (drafts, order items, carriers).

/// An object whose identity survives changes to its data.
///
/// Two drafts with identical lines are still different shipments.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
