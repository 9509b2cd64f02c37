use anyhow::{bail, Result};
use async_graphql::{Enum, SimpleObject};
use serde::{Deserialize, Serialize};

use super::{Database, UserId};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub(crate) enum AccountKind {
    Cash,
    Checking,
    Savings,
    Credit,
    Loan,
    Investment,
}

impl AccountKind {
    /// Credit and loan accounts carry a negative balance for the amount owed.
    pub(crate) fn is_liability(self) -> bool {
        matches!(self, AccountKind::Credit | AccountKind::Loan)
    }
}

#[derive(SimpleObject, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Account {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) kind: AccountKind,
    pub(crate) balance: f64,
}

impl Database {
    pub(crate) fn insert_account(
        &self,
        user: UserId,
        name: &str,
        kind: AccountKind,
        balance: f64,
    ) -> Result<Account> {
        if name.trim().is_empty() {
            bail!("account name must not be empty");
        }
        if !balance.is_finite() {
            bail!("account balance must be a finite number");
        }
        let account = Account {
            id: self.next_id()?,
            name: name.trim().to_string(),
            kind,
            balance,
        };
        Database::insert(user, account.id, &account, &self.accounts)?;
        Ok(account)
    }

    pub(crate) fn account(&self, user: UserId, id: u64) -> Result<Option<Account>> {
        Database::select(user, id, &self.accounts)
    }

    pub(crate) fn accounts(&self, user: UserId) -> Result<Vec<Account>> {
        Database::select_all(user, &self.accounts)
    }
}
