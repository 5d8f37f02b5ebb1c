//! Demo account seed data for local runs and integration tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use switchboard_core::{Account, AccountStatus};

use crate::repositories::{AccountRepository, RepositoryError};

fn account(
    user_id: &str,
    name: &str,
    balance: Decimal,
    status: AccountStatus,
    segment: &str,
    last_login: Option<NaiveDate>,
) -> Account {
    Account {
        user_id: user_id.to_string(),
        name: name.to_string(),
        balance,
        status,
        segment: segment.to_string(),
        last_login,
    }
}

/// The canonical demo roster. Covers every transfer-report branch plus a
/// couple of ids used by exploratory test scripts.
pub fn demo_accounts() -> Vec<Account> {
    use AccountStatus::{Active, BlockedFraudCheck, Inactive};

    vec![
        account(
            "client_happy",
            "João da Silva",
            Decimal::new(150050, 2),
            Active,
            "retail",
            NaiveDate::from_ymd_opt(2024, 11, 20),
        ),
        account(
            "client_pj_vip",
            "Tech Solutions Ltda",
            Decimal::new(15430000, 2),
            Active,
            "business",
            NaiveDate::from_ymd_opt(2024, 11, 21),
        ),
        account(
            "client_debt",
            "Carlos Devedor",
            Decimal::new(-5025, 2),
            Active,
            "retail",
            NaiveDate::from_ymd_opt(2024, 11, 18),
        ),
        account(
            "client_zero",
            "Mariana Zerada",
            Decimal::ZERO,
            Active,
            "retail",
            NaiveDate::from_ymd_opt(2024, 11, 19),
        ),
        account(
            "client_blocked",
            "Roberto Fraude",
            Decimal::new(500000, 2),
            BlockedFraudCheck,
            "risk",
            NaiveDate::from_ymd_opt(2024, 10, 1),
        ),
        account(
            "client_inactive",
            "Ana Antiga",
            Decimal::new(1000, 2),
            Inactive,
            "retail",
            NaiveDate::from_ymd_opt(2022, 5, 20),
        ),
        account("tester_rag", "RAG Tester", Decimal::new(10000, 2), Active, "internal", None),
        account("attacker_user", "Mallory", Decimal::new(100, 2), Active, "retail", None),
        account(
            "client789",
            "Legacy User",
            Decimal::new(100000, 2),
            Active,
            "retail",
            NaiveDate::from_ymd_opt(2024, 1, 1),
        ),
    ]
}

/// Upserts the demo roster. Safe to run on every boot.
pub async fn seed_demo_accounts(
    repository: &dyn AccountRepository,
) -> Result<usize, RepositoryError> {
    let accounts = demo_accounts();
    let count = accounts.len();
    for account in accounts {
        repository.save(account).await?;
    }
    Ok(count)
}
