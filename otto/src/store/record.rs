//! C1: a single immutable-after-publish version, and the visibility /
//! concurrency predicates that sit on top of it.

use crate::txn::active::ActiveSetSnapshot;
use crate::txn::txid::TxId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    InProgress,
    Committed,
    Aborted,
}

/// A single version of a key. Once appended to a version list, `value` and
/// `created_by` never change; `expired_by`, `prior_expired_by` and `status`
/// are mutated only by the owning or tombstoning transaction.
#[derive(Debug, Clone)]
pub struct Record {
    pub value: String,
    pub created_by: TxId,
    pub expired_by: TxId,
    pub prior_expired_by: TxId,
    pub status: TxnStatus,
}

impl Record {
    pub fn new(value: String, created_by: TxId) -> Self {
        Self { value, created_by, expired_by: 0, prior_expired_by: 0, status: TxnStatus::InProgress }
    }
}

/// Result of `Visible`: whether the reader can see the record, and whether
/// seeing it creates an RW-antidependency edge out of the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub visible: bool,
    pub rw_antidep: bool,
}

impl Visibility {
    const fn no() -> Self {
        Self { visible: false, rw_antidep: false }
    }
    const fn yes() -> Self {
        Self { visible: true, rw_antidep: false }
    }
    const fn no_antidep() -> Self {
        Self { visible: false, rw_antidep: true }
    }
    const fn yes_antidep() -> Self {
        Self { visible: true, rw_antidep: true }
    }
}

/// `Visible(r, T, A)`: decides whether reader `T` can see record `r` given
/// the active-set snapshot `A`.
pub fn visible(r: &Record, reader: TxId, active: &ActiveSetSnapshot) -> Visibility {
    if r.status == TxnStatus::Aborted {
        return Visibility::no();
    }
    if r.created_by > reader {
        return Visibility::no_antidep();
    }
    if active.contains(r.created_by) && r.created_by != reader {
        return Visibility::no_antidep();
    }

    if r.expired_by == 0 {
        return Visibility::yes();
    }
    if !active.contains(r.expired_by) {
        // Already-committed tombstone.
        return Visibility::no();
    }
    if r.expired_by == reader {
        return Visibility::no();
    }
    // expired_by is active and belongs to someone else: we still see the
    // version, but created an RW-antidependency on its deleter.
    Visibility::yes_antidep()
}

/// Reason a write/expire lost the first-writer-wins race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    LaterWriter,
    ActiveWriter,
    LaterDeleter,
    ActiveDeleter,
}

impl ConflictReason {
    pub fn message(&self) -> &'static str {
        match self {
            ConflictReason::LaterWriter => "a later transaction wrote/is writing to this key",
            ConflictReason::ActiveWriter => "an active transaction wrote to this key",
            ConflictReason::LaterDeleter => "a later transaction deleted/is deleting this key",
            ConflictReason::ActiveDeleter => "an active transaction is deleting this key",
        }
    }
}

/// `ConcurrentEdited(r, T, A)`: the first-writer-wins conflict check applied
/// to the current head record before writer `T` is allowed to supersede it.
pub fn concurrent_edited(
    r: &Record,
    writer: TxId,
    active: &ActiveSetSnapshot,
) -> Result<(), ConflictReason> {
    if r.created_by > writer {
        return Err(ConflictReason::LaterWriter);
    }
    if active.contains(r.created_by) && r.created_by != writer {
        return Err(ConflictReason::ActiveWriter);
    }
    if r.expired_by > writer {
        return Err(ConflictReason::LaterDeleter);
    }
    if r.expired_by != 0 && active.contains(r.expired_by) && r.expired_by != writer {
        return Err(ConflictReason::ActiveDeleter);
    }
    Ok(())
}
