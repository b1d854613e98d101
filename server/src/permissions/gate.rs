//! Permission gate.
//!
//! Pure allow/deny decisions for (actor, verb, resource kind, target).
//!
//! Each resource kind carries an explicit ordered list of predicate
//! functions combined with logical OR and evaluated short-circuit: the
//! first predicate that grants access wins. Object-level rules receive the
//! target's owning account through [`Target`].

use super::Actor;

/// HTTP-like verb of the requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    /// Safe verbs never mutate state.
    #[must_use]
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Get)
    }

    /// Object-mutating verbs (everything except `GET` and `POST`).
    #[must_use]
    pub const fn is_object_write(self) -> bool {
        matches!(self, Self::Put | Self::Patch | Self::Delete)
    }
}

/// Resource kinds the gate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Account,
    Post,
    Category,
    Comment,
    Reaction,
}

/// Object-level context: the account that owns the target object.
///
/// For an `Account` target this is the account itself; for posts, comments
/// and reactions it is the author.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    /// Owning account ID.
    pub owner_id: i64,
}

impl Target {
    #[must_use]
    pub const fn owned_by(owner_id: i64) -> Self {
        Self { owner_id }
    }
}

type Predicate = fn(&Actor, Verb, Option<Target>) -> bool;

/// Decide whether `actor` may perform `verb` against `kind`.
///
/// `target` must be provided for object-level operations (update/delete of
/// an existing object); collection-level checks pass `None`.
#[must_use]
pub fn allow(actor: &Actor, verb: Verb, kind: ResourceKind, target: Option<Target>) -> bool {
    let predicates: &[Predicate] = match kind {
        ResourceKind::Account => &[read_any, create_any, staff_writes, owner_modifies_own],
        ResourceKind::Post => &[read_any, staff_writes, owner_updates_own],
        ResourceKind::Category => &[read_any, staff_writes],
        ResourceKind::Comment => &[
            read_any,
            authenticated_creates,
            staff_writes,
            owner_modifies_own,
        ],
        ResourceKind::Reaction => &[read_any, authenticated_creates, owner_modifies_own],
    };

    predicates
        .iter()
        .any(|predicate| predicate(actor, verb, target))
}

/// Reads are open to everyone, including anonymous actors.
fn read_any(_actor: &Actor, verb: Verb, _target: Option<Target>) -> bool {
    verb.is_safe()
}

/// Collection creates open to everyone (account registration).
fn create_any(_actor: &Actor, verb: Verb, _target: Option<Target>) -> bool {
    verb == Verb::Post
}

/// Collection creates open to any authenticated actor.
fn authenticated_creates(actor: &Actor, verb: Verb, _target: Option<Target>) -> bool {
    verb == Verb::Post && !actor.is_anonymous()
}

/// Staff may perform any write.
fn staff_writes(actor: &Actor, verb: Verb, _target: Option<Target>) -> bool {
    !verb.is_safe() && actor.is_staff()
}

/// The owning account may update or delete its own object.
fn owner_modifies_own(actor: &Actor, verb: Verb, target: Option<Target>) -> bool {
    verb.is_object_write() && target.is_some_and(|t| actor.is_account(t.owner_id))
}

/// A post's author may update their own post, but not create or delete.
fn owner_updates_own(actor: &Actor, verb: Verb, target: Option<Target>) -> bool {
    matches!(verb, Verb::Put | Verb::Patch) && target.is_some_and(|t| actor.is_account(t.owner_id))
}
