//! Visibility resolution.
//!
//! Decides which serialization view an actor gets for accounts and posts,
//! and whether an inactive object must be redacted to the minimal
//! `{id, is_active: false}` body.
//!
//! View selection and redaction are separate decisions: a view is resolved
//! once per request, while redaction is applied after projection so single
//! objects and list members go through the same transform.

use super::Actor;

/// Read view for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Public field set (no email, no active flag).
    Public,
    /// Full field set, visible to privileged actors and to the account
    /// itself.
    Privileged,
}

/// Write schema for account create/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSchema {
    /// Cannot touch capability flags.
    Restricted,
    /// May set `is_staff`.
    Privileged,
}

/// Minimal shape of an account as seen by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct AccountRef {
    pub id: i64,
    pub is_active: bool,
}

/// Minimal shape of a post as seen by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct PostRef {
    pub author_id: i64,
    pub is_active: bool,
}

/// Select the read view for an account.
///
/// `target` is `None` for list responses, where the view is decided once
/// for the whole page.
#[must_use]
pub fn account_view(actor: &Actor, target: Option<AccountRef>) -> ViewKind {
    if actor.is_privileged() {
        return ViewKind::Privileged;
    }

    if target.is_some_and(|t| actor.is_account(t.id)) {
        return ViewKind::Privileged;
    }

    ViewKind::Public
}

/// Select the write schema for account create/update.
#[must_use]
pub fn account_write_schema(actor: &Actor) -> WriteSchema {
    if actor.is_privileged() {
        WriteSchema::Privileged
    } else {
        WriteSchema::Restricted
    }
}

/// Whether an account body must be redacted for this reader.
///
/// Inactive accounts present only `{id, is_active: false}` unless the
/// reader is privileged or the account itself.
#[must_use]
pub fn redact_account(actor: &Actor, target: AccountRef) -> bool {
    if target.is_active {
        return false;
    }

    !(actor.is_privileged() || actor.is_account(target.id))
}

/// Whether a post body must be redacted for this reader.
///
/// Inactive posts present only `{id, is_active: false}` unless the reader
/// is privileged or the post's author.
#[must_use]
pub fn redact_post(actor: &Actor, target: PostRef) -> bool {
    if target.is_active {
        return false;
    }

    !(actor.is_privileged() || actor.is_account(target.author_id))
}
