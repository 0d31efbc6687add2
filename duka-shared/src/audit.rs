/// Change log for the `events` table
///
/// Updates and deletes of catalogue rows record a human readable line such
/// as `Product updated by [Jane(jane@duka.test)(<uuid>)]. Changes: name from
/// Rice to Pishori rice.` The diff works on the JSON form of the row, so any
/// `Serialize` model can be audited.

use serde::Serialize;
use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::event::{CreateEvent, Event};

/// What happened to the audited row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Update,
    Delete,
}

impl AuditAction {
    fn past_tense(&self) -> &'static str {
        match self {
            AuditAction::Update => "updated",
            AuditAction::Delete => "deleted",
        }
    }
}

/// The user responsible for a change
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl Actor {
    pub async fn load(conn: &mut PgConnection, user_id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Actor>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(conn)
            .await
    }

    fn label(&self) -> String {
        format!("[{}({})({})]", self.name, self.email, self.id)
    }
}

/// One changed field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// Lists the top-level fields whose values differ between two JSON objects
///
/// Fields named in `skip` are ignored, and so are fields absent from either
/// side. Non-object inputs produce no changes.
pub fn modified_fields(original: &Value, updated: &Value, skip: &[&str]) -> Vec<FieldChange> {
    let (Some(original), Some(updated)) = (original.as_object(), updated.as_object()) else {
        return Vec::new();
    };

    original
        .iter()
        .filter(|(field, _)| !skip.contains(&field.as_str()))
        .filter_map(|(field, old)| {
            let new = updated.get(field)?;
            (old != new).then(|| FieldChange {
                field: field.clone(),
                old: old.clone(),
                new: new.clone(),
            })
        })
        .collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders the sentence stored in `events.event_details`
pub fn event_details(
    action: AuditAction,
    entity: &str,
    changes: &[FieldChange],
    actor: &Actor,
    other_details: &str,
) -> String {
    let other_details = other_details.trim();

    match action {
        AuditAction::Update if !changes.is_empty() => {
            let messages: Vec<String> = changes
                .iter()
                .map(|c| {
                    format!(
                        "{} from {} to {}",
                        c.field,
                        display_value(&c.old),
                        display_value(&c.new)
                    )
                })
                .collect();

            let mut details = format!(
                "{} {} by {}. Changes: {}.",
                entity,
                action.past_tense(),
                actor.label(),
                messages.join(", ")
            );
            if !other_details.is_empty() {
                details.push(' ');
                details.push_str(other_details);
            }
            details
        }
        AuditAction::Delete => {
            let mut details = format!("{} {} by {}.", entity, action.past_tense(), actor.label());
            if !other_details.is_empty() {
                details.push(' ');
                details.push_str(other_details);
            }
            details
        }
        AuditAction::Update => {
            let tail = if other_details.is_empty() {
                "No values were modified"
            } else {
                other_details
            };
            format!("{} update triggered by {}. {}", entity, actor.label(), tail)
        }
    }
}

/// A change to store in the events table
pub struct ChangeLog<'a, T: Serialize> {
    pub action: AuditAction,
    /// Display name of the entity, e.g. `Product`
    pub entity: &'a str,
    pub table_name: &'a str,
    pub record_id: Uuid,
    pub original: &'a T,
    pub updated: &'a T,
    pub skip_fields: &'a [&'a str],
    pub actor_id: Uuid,
    pub other_details: &'a str,
}

/// Diffs the two versions of a row and inserts the resulting event
///
/// Runs on the caller's connection so the event commits or rolls back with
/// the change it describes.
pub async fn store_change_log<T: Serialize>(
    conn: &mut PgConnection,
    log: ChangeLog<'_, T>,
) -> Result<Event, sqlx::Error> {
    let original = serde_json::to_value(log.original)
        .map_err(|e| sqlx::Error::Protocol(format!("Change log serialisation failed: {e}")))?;
    let updated = serde_json::to_value(log.updated)
        .map_err(|e| sqlx::Error::Protocol(format!("Change log serialisation failed: {e}")))?;

    let changes = modified_fields(&original, &updated, log.skip_fields);
    let actor = Actor::load(&mut *conn, log.actor_id).await?;
    let details = event_details(log.action, log.entity, &changes, &actor, log.other_details);

    tracing::debug!(
        table = log.table_name,
        record_id = %log.record_id,
        changed_fields = changes.len(),
        "Storing change log"
    );

    Event::create(
        conn,
        CreateEvent {
            table_name: log.table_name.to_string(),
            field_id: log.record_id.to_string(),
            event_details: details,
            event_by: Some(log.actor_id),
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn actor() -> Actor {
        Actor {
            id: Uuid::nil(),
            name: "Jane".into(),
            email: "jane@duka.test".into(),
        }
    }

    #[test]
    fn test_modified_fields_skips_and_ignores_missing() {
        let original = json!({"name": "Rice", "available_stock": 10, "updated_at": "a", "code": "R1"});
        let updated = json!({"name": "Pishori", "available_stock": 10, "updated_at": "b"});

        let changes = modified_fields(&original, &updated, &["updated_at"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "name");
        assert_eq!(changes[0].old, json!("Rice"));
        assert_eq!(changes[0].new, json!("Pishori"));
    }

    #[test]
    fn test_update_details() {
        let changes = vec![
            FieldChange { field: "name".into(), old: json!("Rice"), new: json!("Pishori") },
            FieldChange { field: "minimum_stock".into(), old: json!(2), new: json!(5) },
        ];
        let details = event_details(AuditAction::Update, "Product", &changes, &actor(), "");
        assert_eq!(
            details,
            format!(
                "Product updated by [Jane(jane@duka.test)({})]. Changes: name from Rice to Pishori, minimum_stock from 2 to 5.",
                Uuid::nil()
            )
        );
    }

    #[test]
    fn test_update_without_changes() {
        let details = event_details(AuditAction::Update, "Unit", &[], &actor(), "");
        assert!(details.starts_with("Unit update triggered by [Jane"));
        assert!(details.ends_with("No values were modified"));

        let details = event_details(AuditAction::Update, "Unit", &[], &actor(), " Stock recount ");
        assert!(details.ends_with(". Stock recount"));
    }

    #[test]
    fn test_delete_details() {
        let details = event_details(AuditAction::Delete, "Category", &[], &actor(), "Name: Cereals");
        assert_eq!(
            details,
            format!("Category deleted by [Jane(jane@duka.test)({})]. Name: Cereals", Uuid::nil())
        );
    }
}
