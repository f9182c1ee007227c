//! Outcome of an insert-or-update against the table.

/// What [`RoutingTable::insert_or_update`](super::RoutingTable::insert_or_update)
/// did with the record it was given.
///
/// A full bucket is an ordinary outcome and is reported here, never as an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertResult {
    /// The entry has been successfully inserted
    Inserted,
    /// The bucket is full; the entry waits in the pending slot for the
    /// least-recently connected (and disconnected) entry to time out.
    Pending,
    /// The entry already exists
    NodeExists,
    /// The bucket is full and cannot take a challenger
    FailedBucketFull,
    /// The local node cannot be stored in its own table
    FailedInvalidSelfUpdate,
    /// The status changed
    StatusUpdated,
    /// The status changed and the entry moved to the connected tail
    StatusUpdatedAndPromoted,
    /// A newer record replaced the stored one
    ValueUpdated,
    /// Both the status and the record changed
    Updated,
    /// Both changed and the entry moved to the connected tail
    UpdatedAndPromoted,
    /// The pending slot was overwritten
    UpdatedPending,
    /// Nothing changed
    NotModified,
}
