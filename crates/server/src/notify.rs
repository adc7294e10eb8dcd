//! Notification fanout.
//!
//! Notifications are best-effort: a failed insert is logged and never fails
//! the request that triggered it. Handlers that write inside a transaction
//! queue notifications on an [`Outbox`] and flush it after commit, so no
//! notification row survives a rolled-back write.

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use studyflow_core::domain::Role;

use crate::entity::{notification, user};

/// A notification not yet written to the store.
#[derive(Debug, Clone)]
pub struct Pending {
    pub user_id: i32,
    pub title: String,
    pub message: String,
    pub kind: Option<String>,
    pub related_id: Option<i32>,
}

/// Inserts one notification row. Returns whether the insert succeeded.
pub async fn send(db: &DatabaseConnection, pending: Pending) -> bool {
    let row = notification::ActiveModel {
        user_id: Set(pending.user_id),
        title: Set(pending.title),
        message: Set(pending.message),
        kind: Set(pending.kind),
        related_id: Set(pending.related_id),
        is_read: Set(false),
        ..Default::default()
    };

    match row.insert(db).await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(user_id = pending.user_id, error = %err, "notification insert failed");
            false
        }
    }
}

/// Outcome of a role broadcast: how many recipients got a row.
#[derive(Debug, Serialize)]
pub struct BroadcastOutcome {
    pub success: bool,
    pub count: usize,
}

/// Sends one notification per user holding any of the named roles.
/// Unknown role names are dropped rather than rejected.
pub async fn send_to_roles(
    db: &DatabaseConnection,
    roles: &[String],
    title: &str,
    message: &str,
    kind: Option<&str>,
    related_id: Option<i32>,
) -> BroadcastOutcome {
    let known = Role::filter_known(roles.iter().map(String::as_str));
    if known.is_empty() {
        return BroadcastOutcome {
            success: false,
            count: 0,
        };
    }

    let role_names: Vec<&str> = known.iter().map(|role| role.as_str()).collect();
    let recipients = match user::Entity::find()
        .filter(user::Column::Role.is_in(role_names))
        .all(db)
        .await
    {
        Ok(users) => users,
        Err(err) => {
            tracing::warn!(error = %err, "role broadcast recipient lookup failed");
            return BroadcastOutcome {
                success: false,
                count: 0,
            };
        }
    };

    let mut count = 0;
    for recipient in recipients {
        let delivered = send(
            db,
            Pending {
                user_id: recipient.user_id,
                title: title.to_string(),
                message: message.to_string(),
                kind: kind.map(str::to_string),
                related_id,
            },
        )
        .await;
        if delivered {
            count += 1;
        }
    }

    BroadcastOutcome {
        success: count > 0,
        count,
    }
}

/// Notifications queued during a transaction, written only after it commits.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<Pending>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        user_id: i32,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: Option<&str>,
        related_id: Option<i32>,
    ) {
        self.pending.push(Pending {
            user_id,
            title: title.into(),
            message: message.into(),
            kind: kind.map(str::to_string),
            related_id,
        });
    }

    pub async fn flush(self, db: &DatabaseConnection) {
        for pending in self.pending {
            send(db, pending).await;
        }
    }
}
