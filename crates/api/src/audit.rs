//! Audit trail writes for mutating handlers.
//!
//! Entries are written after the business write has committed. A failed
//! audit insert is logged at `warn` and never fails the request.

use imprint_core::audit::redact_sensitive_fields;
use imprint_core::types::DbId;
use imprint_db::models::audit::CreateAuditLog;
use imprint_db::repositories::AuditLogRepo;
use imprint_db::DbPool;
use serde_json::Value;

use crate::middleware::auth::AuthUser;

/// One audit entry, built by the handler that performed the action.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action_type: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Option<DbId>,
    pub details: Option<Value>,
}

impl AuditEvent {
    pub fn new(action_type: &'static str, entity_type: &'static str, entity_id: DbId) -> Self {
        Self {
            action_type,
            entity_type,
            entity_id: Some(entity_id),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Record `event` as performed by `user`.
pub async fn record(pool: &DbPool, user: &AuthUser, event: AuditEvent) {
    record_as(pool, user.tenant_id, Some(user.user_id), event).await;
}

/// Record `event` for an explicit tenant and (optional) user, for flows that
/// run before a token exists such as login and registration.
pub async fn record_as(pool: &DbPool, tenant_id: DbId, user_id: Option<DbId>, event: AuditEvent) {
    let entry = CreateAuditLog {
        tenant_id,
        user_id,
        action_type: event.action_type.to_string(),
        entity_type: Some(event.entity_type.to_string()),
        entity_id: event.entity_id,
        details_json: event.details.as_ref().map(redact_sensitive_fields),
    };

    if let Err(e) = AuditLogRepo::create(pool, &entry).await {
        tracing::warn!(
            error = %e,
            tenant_id,
            action_type = event.action_type,
            entity_type = event.entity_type,
            entity_id = ?event.entity_id,
            "Failed to write audit log entry",
        );
    }
}
