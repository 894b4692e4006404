//! The interface shared by abstract domains the fixed-point solver combines.

/// An element of a join semi-lattice with a bottom element.
///
/// `widen_with` and `narrow_with` default to `join_with` and `meet_with`,
/// which is correct for domains of finite height.
pub trait AbstractDomain: Clone {
    /// The least element.
    fn bottom() -> Self;

    fn is_bottom(&self) -> bool;

    /// Partial order of the lattice.
    fn leq(&self, other: &Self) -> bool;

    fn equals(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }

    /// Set `self` to the least upper bound of `self` and `other`.
    fn join_with(&mut self, other: &Self);

    fn widen_with(&mut self, other: &Self) {
        self.join_with(other);
    }

    /// Set `self` to the greatest lower bound of `self` and `other`.
    fn meet_with(&mut self, other: &Self);

    fn narrow_with(&mut self, other: &Self) {
        self.meet_with(other);
    }

    fn join(mut self, other: &Self) -> Self
    where
        Self: Sized,
    {
        self.join_with(other);
        self
    }
}
