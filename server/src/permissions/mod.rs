//! Access control
//!
//! Two pure leaves consulted by every resource handler:
//! - [`gate`] decides allow/deny for (actor, verb, resource kind, target).
//! - [`visibility`] decides which serialization view an actor gets, and
//!   whether an inactive object must be redacted.
//!
//! Neither module performs I/O; the acting identity is always passed in
//! explicitly as an [`Actor`] value.

pub mod gate;
pub mod visibility;

pub use gate::{allow, ResourceKind, Target, Verb};
pub use visibility::{AccountRef, PostRef, ViewKind, WriteSchema};

/// The identity a request acts as.
#[derive(Debug, Clone)]
pub enum Actor {
    /// No valid session presented.
    Anonymous,
    /// Authenticated account.
    Account(ActorAccount),
}

/// Capability flags of an authenticated account, detached from the full
/// database row so permission checks stay free of storage concerns.
#[derive(Debug, Clone)]
pub struct ActorAccount {
    /// Account ID.
    pub id: i64,
    /// Unique username.
    pub username: String,
    /// Staff capability flag.
    pub is_staff: bool,
    /// Admin capability flag.
    pub is_admin: bool,
    /// Blog-owner capability flag.
    pub is_owner: bool,
    /// Active status.
    pub is_active: bool,
}

impl Actor {
    /// The authenticated account, if any.
    #[must_use]
    pub const fn account(&self) -> Option<&ActorAccount> {
        match self {
            Self::Anonymous => None,
            Self::Account(account) => Some(account),
        }
    }

    /// Account ID of the authenticated actor.
    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        match self {
            Self::Anonymous => None,
            Self::Account(account) => Some(account.id),
        }
    }

    /// Whether no authenticated account is attached.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Staff flag of the authenticated actor.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        match self {
            Self::Anonymous => false,
            Self::Account(account) => account.is_staff,
        }
    }

    /// Privileged readers get the unredacted serializations: any of the
    /// staff/admin/owner flags qualifies.
    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        match self {
            Self::Anonymous => false,
            Self::Account(account) => {
                account.is_staff || account.is_admin || account.is_owner
            }
        }
    }

    /// Whether the actor is exactly the account with the given ID.
    #[must_use]
    pub const fn is_account(&self, account_id: i64) -> bool {
        match self {
            Self::Anonymous => false,
            Self::Account(account) => account.id == account_id,
        }
    }
}
