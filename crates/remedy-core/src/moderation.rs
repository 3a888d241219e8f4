//! Moderation state machine for reviews and comments.
//!
//! | from \ by       | author edit | moderator edit / status update |
//! |----------------|-------------|--------------------------------|
//! | pending        | pending     | supplied status (or keep)      |
//! | approved       | pending     | supplied status (or keep)      |
//! | flagged        | pending     | supplied status (or keep)      |
//!
//! Pending and flagged records are hidden from the public read path.
//! Deletion is allowed from every state by the author or a moderator.

use remedy_state::{ModerationStatus, UserId};
use serde::Serialize;

use crate::domain::{Actor, RemedyError, Result};

/// Status a record takes after an edit.
///
/// A non-privileged author always sends the record back to `pending`,
/// whatever they asked for. Moderators get the status they supply, or keep
/// the current one when they supply none.
pub fn status_after_edit(
    actor: &Actor,
    current: ModerationStatus,
    requested: Option<ModerationStatus>,
) -> ModerationStatus {
    if actor.is_privileged() {
        requested.unwrap_or(current)
    } else {
        ModerationStatus::Pending
    }
}

/// Allow the record's author or any moderator/admin.
pub fn authorize_owner_or_privileged(actor: &Actor, owner: &UserId, action: &str) -> Result<()> {
    if actor.is(owner) || actor.is_privileged() {
        Ok(())
    } else {
        Err(RemedyError::unauthorized(format!(
            "only the author or a moderator may {action}"
        )))
    }
}

/// Allow moderators/admins only.
pub fn authorize_privileged(actor: &Actor, action: &str) -> Result<()> {
    if actor.is_privileged() {
        Ok(())
    } else {
        Err(RemedyError::unauthorized(format!(
            "only a moderator may {action}"
        )))
    }
}

/// Whether `viewer` may see a record with this author and status.
///
/// Approved records are public. Authors always see their own records and
/// moderators see everything.
pub fn is_visible_to(viewer: Option<&Actor>, owner: &UserId, status: ModerationStatus) -> bool {
    if status.is_approved() {
        return true;
    }
    match viewer {
        Some(actor) => actor.is_privileged() || actor.is(owner),
        None => false,
    }
}

/// How a status change moves a record relative to the approved set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTransition {
    /// The record just became publicly visible.
    Entered,
    /// The record was visible and no longer is.
    Left,
    Unchanged,
}

impl ApprovalTransition {
    pub fn between(before: ModerationStatus, after: ModerationStatus) -> Self {
        match (before.is_approved(), after.is_approved()) {
            (false, true) => ApprovalTransition::Entered,
            (true, false) => ApprovalTransition::Left,
            _ => ApprovalTransition::Unchanged,
        }
    }

    pub fn changes_approved_set(&self) -> bool {
        !matches!(self, ApprovalTransition::Unchanged)
    }
}
