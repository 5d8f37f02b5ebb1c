use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use switchboard_core::{
    LogEntry, Message, MessageId, MessageLog, Role, Route, SessionState, SessionStore, StoreError,
};

use crate::DbPool;

/// Sqlite-backed session store. One session row plus seq-ordered message
/// rows; redacted messages keep their row with a flag so the audit trail
/// survives the logical delete.
pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn load(&self, session_id: &str) -> Result<SessionState, StoreError> {
        let session_row = sqlx::query(
            "SELECT pending_route, draft_response, retry_count FROM sessions WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| StoreError::Load(error.to_string()))?;

        let Some(session_row) = session_row else {
            return Ok(SessionState::new(session_id));
        };

        let message_rows = sqlx::query(
            "SELECT message_id, role, content, redacted FROM session_messages \
             WHERE session_id = ?1 ORDER BY seq ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| StoreError::Load(error.to_string()))?;

        let mut entries = Vec::with_capacity(message_rows.len());
        for row in message_rows {
            let role_raw = row.get::<String, _>("role");
            let role = Role::from_str(&role_raw)
                .ok_or_else(|| StoreError::Decode(format!("unknown message role `{role_raw}`")))?;
            entries.push(LogEntry {
                message: Message {
                    id: MessageId(row.get::<String, _>("message_id")),
                    role,
                    content: row.get::<String, _>("content"),
                },
                redacted: row.get::<i64, _>("redacted") != 0,
            });
        }

        let pending_route = match session_row.get::<Option<String>, _>("pending_route") {
            Some(raw) => Some(
                Route::parse(&raw)
                    .ok_or_else(|| StoreError::Decode(format!("unknown route `{raw}`")))?,
            ),
            None => None,
        };

        Ok(SessionState {
            session_id: session_id.to_string(),
            log: MessageLog::from_entries(entries),
            pending_route,
            draft_response: session_row.get::<String, _>("draft_response"),
            retry_count: session_row.get::<i64, _>("retry_count") as u32,
        })
    }

    async fn commit(&self, state: &SessionState) -> Result<(), StoreError> {
        // The whole turn delta lands in one transaction: either the next
        // load sees all of it or none of it.
        let mut tx =
            self.pool.begin().await.map_err(|error| StoreError::Commit(error.to_string()))?;

        sqlx::query(
            "INSERT INTO sessions (session_id, pending_route, draft_response, retry_count, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT (session_id) DO UPDATE SET \
               pending_route = excluded.pending_route, \
               draft_response = excluded.draft_response, \
               retry_count = excluded.retry_count, \
               updated_at = excluded.updated_at",
        )
        .bind(&state.session_id)
        .bind(state.pending_route.map(|route| route.as_str()))
        .bind(&state.draft_response)
        .bind(i64::from(state.retry_count))
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|error| StoreError::Commit(error.to_string()))?;

        sqlx::query("DELETE FROM session_messages WHERE session_id = ?1")
            .bind(&state.session_id)
            .execute(&mut *tx)
            .await
            .map_err(|error| StoreError::Commit(error.to_string()))?;

        for (seq, entry) in state.log.iter_all().enumerate() {
            sqlx::query(
                "INSERT INTO session_messages (message_id, session_id, seq, role, content, redacted) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&entry.message.id.0)
            .bind(&state.session_id)
            .bind(seq as i64)
            .bind(entry.message.role.as_str())
            .bind(&entry.message.content)
            .bind(i64::from(entry.redacted))
            .execute(&mut *tx)
            .await
            .map_err(|error| StoreError::Commit(error.to_string()))?;
        }

        tx.commit().await.map_err(|error| StoreError::Commit(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use switchboard_core::{Message, Route, SessionState, SessionStore};

    use super::SqlSessionStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlSessionStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlSessionStore::new(pool)
    }

    #[tokio::test]
    async fn load_of_unknown_session_creates_empty_state() {
        let store = store().await;
        let state = store.load("fresh").await.expect("load");
        assert_eq!(state.session_id, "fresh");
        assert!(state.log.is_empty());
        assert_eq!(state.retry_count, 0);
    }

    #[tokio::test]
    async fn commit_then_load_round_trips_the_full_state() {
        let store = store().await;

        let mut state = SessionState::new("sess-sql");
        state.log.append(Message::user("what are the fees?"));
        state.log.append(Message::assistant("Fees start at 1.99%."));
        state.pending_route = Some(Route::Knowledge);
        state.draft_response = "Fees start at 1.99%! ⚡".to_string();
        state.retry_count = 1;

        store.commit(&state).await.expect("commit");
        let loaded = store.load("sess-sql").await.expect("load");

        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn redaction_flag_survives_persistence() {
        let store = store().await;

        let mut state = SessionState::new("sess-redact");
        state.log.append(Message::user("keep me"));
        let noise = Message::user("redact me");
        let noise_id = noise.id.clone();
        state.log.append(noise);
        state.log.redact(&noise_id);

        store.commit(&state).await.expect("commit");
        let loaded = store.load("sess-redact").await.expect("load");

        assert_eq!(loaded.log.visible_len(), 1);
        assert_eq!(loaded.log.iter_all().count(), 2);
        assert!(loaded.log.iter_all().any(|e| e.message.id == noise_id && e.redacted));
    }

    #[tokio::test]
    async fn recommit_replaces_previous_turn_state() {
        let store = store().await;

        let mut state = SessionState::new("sess-rw");
        state.log.append(Message::user("first turn"));
        store.commit(&state).await.expect("first commit");

        state.log.append(Message::assistant("first reply"));
        state.pending_route = Some(Route::Support);
        store.commit(&state).await.expect("second commit");

        let loaded = store.load("sess-rw").await.expect("load");
        assert_eq!(loaded.log.visible_len(), 2);
        assert_eq!(loaded.pending_route, Some(Route::Support));
    }

    #[tokio::test]
    async fn sessions_are_isolated_from_each_other() {
        let store = store().await;

        let mut first = SessionState::new("sess-a");
        first.log.append(Message::user("hello from a"));
        store.commit(&first).await.expect("commit a");

        let second = store.load("sess-b").await.expect("load b");
        assert!(second.log.is_empty());
    }
}
