use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
    BlockedFraudCheck,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::BlockedFraudCheck => "blocked_fraud_check",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "blocked_fraud_check" => Some(Self::BlockedFraudCheck),
            _ => None,
        }
    }
}

/// Customer account record backing the support lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub name: String,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub segment: String,
    pub last_login: Option<NaiveDate>,
}

impl Account {
    /// Registration-data summary served by the profile lookup tool.
    pub fn profile_summary(&self) -> String {
        let last_login =
            self.last_login.map_or_else(|| "unknown".to_string(), |date| date.to_string());
        format!(
            "name: {} | balance: {} | status: {} | segment: {} | last login: {}",
            self.name,
            self.balance,
            self.status.as_str(),
            self.segment,
            last_login
        )
    }

    /// Operational restriction check for money movement. Severity order:
    /// fraud block, then inactivity, then negative balance.
    pub fn transfer_report(&self) -> String {
        match self.status {
            AccountStatus::BlockedFraudCheck => {
                "CRITICAL BLOCK: account is under fraud review.".to_string()
            }
            AccountStatus::Inactive => {
                "INACTIVE ACCOUNT: registration data must be refreshed.".to_string()
            }
            AccountStatus::Active if self.balance < Decimal::ZERO => {
                format!("INSUFFICIENT FUNDS: balance is negative ({}).", self.balance)
            }
            AccountStatus::Active => "Account is active and operational.".to_string(),
        }
    }
}
