use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::Row;

use switchboard_core::{Account, AccountStatus};

use crate::DbPool;

use super::{AccountRepository, RepositoryError};

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Balances are stored as TEXT and parsed on read; sqlite has no decimal
// column type and floats would lose cents.
fn decode_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account, RepositoryError> {
    let balance_raw = row.get::<String, _>("balance");
    let balance = Decimal::from_str(&balance_raw)
        .map_err(|_| RepositoryError::Decode(format!("invalid balance `{balance_raw}`")))?;

    let status_raw = row.get::<String, _>("status");
    let status = AccountStatus::from_str(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown account status `{status_raw}`")))?;

    let last_login = match row.get::<Option<String>, _>("last_login") {
        Some(raw) => Some(
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| RepositoryError::Decode(format!("invalid last_login `{raw}`")))?,
        ),
        None => None,
    };

    Ok(Account {
        user_id: row.get("user_id"),
        name: row.get("name"),
        balance,
        status,
        segment: row.get("segment"),
        last_login,
    })
}

#[async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, name, balance, status, segment, last_login \
             FROM accounts WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_account).transpose()
    }

    async fn save(&self, account: Account) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO accounts (user_id, name, balance, status, segment, last_login) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT (user_id) DO UPDATE SET \
               name = excluded.name, \
               balance = excluded.balance, \
               status = excluded.status, \
               segment = excluded.segment, \
               last_login = excluded.last_login",
        )
        .bind(&account.user_id)
        .bind(&account.name)
        .bind(account.balance.to_string())
        .bind(account.status.as_str())
        .bind(&account.segment)
        .bind(account.last_login.map(|date| date.to_string()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
