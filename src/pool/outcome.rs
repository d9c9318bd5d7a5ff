/// What `checkin` did with a returned connection.
///
/// A connection whose entry was reclaimed while it was checked out is no longer tracked; it
/// is closed instead of being returned, and that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinOutcome {
    /// Marked idle in its entry, ready for the next checkout.
    Returned,
    /// Not found in the registry and closed directly.
    ClosedOrphan,
}

impl CheckinOutcome {
    #[must_use]
    pub fn was_returned(self) -> bool {
        matches!(self, CheckinOutcome::Returned)
    }
}
