//! Active/inactive moderation state for users and posts.
//!
//! Both entities start `Active`. Only admins move them between states, and
//! re-applying the current state is a successful no-op.

use rusqlite::TransactionBehavior;
use serde::Serialize;

use crate::db::{posts, users};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveState {
    Active,
    Inactive,
}

impl ActiveState {
    pub fn from_flag(active: bool) -> Self {
        if active {
            ActiveState::Active
        } else {
            ActiveState::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == ActiveState::Active
    }

    pub fn deactivate(self) -> Self {
        ActiveState::Inactive
    }

    pub fn reactivate(self) -> Self {
        ActiveState::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    User,
    Post,
}

/// Outcome of a lifecycle request. `changed` is false for an idempotent repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub entity: Entity,
    pub id: i64,
    pub state: ActiveState,
    pub changed: bool,
}

/// Moves a user or post to the requested state inside one transaction.
///
/// The transaction takes the write lock before reading, so concurrent requests for
/// the same entity queue on `busy_timeout` and the later one observes the earlier
/// one's write as a no-op.
pub fn set_active(pool: &DbPool, entity: Entity, id: i64, active: bool) -> AppResult<Transition> {
    let target = ActiveState::from_flag(active);

    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current = match entity {
        Entity::User => users::active_flag(&tx, id)?,
        Entity::Post => posts::active_flag(&tx, id)?,
    }
    .map(ActiveState::from_flag)
    .ok_or(AppError::NotFound)?;

    let next = match target {
        ActiveState::Active => current.reactivate(),
        ActiveState::Inactive => current.deactivate(),
    };
    let changed = next != current;

    if changed {
        match entity {
            Entity::User => users::set_active_flag(&tx, id, next.is_active())?,
            Entity::Post => posts::set_active_flag(&tx, id, next.is_active())?,
        };
    }
    tx.commit()?;

    if changed {
        tracing::info!(entity = ?entity, id, from = ?current, to = ?next, "lifecycle transition");
    } else {
        tracing::debug!(entity = ?entity, id, state = ?next, "lifecycle transition was a no-op");
    }

    Ok(Transition {
        entity,
        id,
        state: next,
        changed,
    })
}

pub fn set_user_active(pool: &DbPool, user_id: i64, active: bool) -> AppResult<Transition> {
    set_active(pool, Entity::User, user_id, active)
}

pub fn set_post_active(pool: &DbPool, post_id: i64, active: bool) -> AppResult<Transition> {
    set_active(pool, Entity::Post, post_id, active)
}
