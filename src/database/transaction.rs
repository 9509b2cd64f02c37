use anyhow::{anyhow, bail, Result};
use async_graphql::{InputObject, SimpleObject};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sled::Transactional;

use super::{abort, record_key, transaction_error, Account, Database, UserId};
use crate::query::Category;

#[derive(SimpleObject, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Transaction {
    pub(crate) id: u64,
    pub(crate) account_id: u64,
    /// `None` for transactions outside the known spending categories.
    pub(crate) category: Option<Category>,
    /// Always positive; `is_expense` gives the direction.
    pub(crate) amount: f64,
    pub(crate) is_expense: bool,
    pub(crate) description: Option<String>,
    pub(crate) date: NaiveDate,
}

impl Transaction {
    pub(crate) fn signed_amount(&self) -> f64 {
        if self.is_expense {
            -self.amount
        } else {
            self.amount
        }
    }
}

#[derive(InputObject, Clone, Debug)]
pub(crate) struct NewTransaction {
    pub(crate) account_id: u64,
    pub(crate) category: Option<Category>,
    pub(crate) amount: f64,
    pub(crate) is_expense: bool,
    pub(crate) description: Option<String>,
    pub(crate) date: NaiveDate,
}

impl Database {
    /// Records a transaction and applies it to the balance of its account.
    pub(crate) fn insert_transaction(
        &self,
        user: UserId,
        new: NewTransaction,
    ) -> Result<Transaction> {
        if !new.amount.is_finite() || new.amount <= 0.0 {
            bail!("transaction amount must be a positive number");
        }
        let transaction = Transaction {
            id: self.next_id()?,
            account_id: new.account_id,
            category: new.category,
            amount: new.amount,
            is_expense: new.is_expense,
            description: new.description,
            date: new.date,
        };
        let transaction_key = record_key(user, transaction.id);
        let transaction_value = bincode::serialize(&transaction)?;
        let account_key = record_key(user, transaction.account_id);

        // The record and the balance change commit together.
        (&self.transactions, &self.accounts)
            .transaction(|(transactions, accounts)| {
                let Some(bytes) = accounts.get(account_key.as_bytes())? else {
                    return Err(abort(anyhow!(
                        "account {} not found",
                        transaction.account_id
                    )));
                };
                let mut account: Account = bincode::deserialize(&bytes).map_err(abort)?;
                account.balance += transaction.signed_amount();
                let account_value = bincode::serialize(&account).map_err(abort)?;

                transactions.insert(transaction_key.as_bytes(), transaction_value.as_slice())?;
                accounts.insert(account_key.as_bytes(), account_value)?;
                Ok(())
            })
            .map_err(transaction_error)?;
        Ok(transaction)
    }

    pub(crate) fn transactions(&self, user: UserId) -> Result<Vec<Transaction>> {
        Database::select_all(user, &self.transactions)
    }
}
