mod account;
mod budget;
mod goal;
mod transaction;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use sled::{
    transaction::{ConflictableTransactionError, TransactionError},
    Db, Tree,
};

pub(crate) use self::account::{Account, AccountKind};
pub(crate) use self::budget::Budget;
pub(crate) use self::goal::{Goal, NewGoal};
pub(crate) use self::transaction::{NewTransaction, Transaction};

/// Identity of the caller, as established by the auth layer in front of
/// this service.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct UserId(pub(crate) u64);

#[derive(Clone)]
pub(crate) struct Database {
    db: Db,
    accounts: Tree,
    transactions: Tree,
    budgets: Tree,
    goals: Tree,
}

impl Database {
    pub(crate) fn connect(path: &Path) -> Result<Database> {
        let db = sled::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Ok(Database {
            accounts: Database::connect_tree(&db, "accounts")?,
            transactions: Database::connect_tree(&db, "transactions")?,
            budgets: Database::connect_tree(&db, "budgets")?,
            goals: Database::connect_tree(&db, "goals")?,
            db,
        })
    }

    fn connect_tree(db: &Db, name: &str) -> Result<Tree> {
        db.open_tree(name)
            .with_context(|| format!("failed to open tree {name}"))
    }

    fn next_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    fn insert<T: Serialize>(user: UserId, id: u64, value: &T, tree: &Tree) -> Result<()> {
        tree.insert(record_key(user, id), bincode::serialize(value)?)?;
        Ok(())
    }

    fn select<T: DeserializeOwned>(user: UserId, id: u64, tree: &Tree) -> Result<Option<T>> {
        match tree.get(record_key(user, id))? {
            Some(val) => Ok(Some(bincode::deserialize(&val)?)),
            None => Ok(None),
        }
    }

    /// Every record `user` owns in `tree`, in id order.
    fn select_all<T: DeserializeOwned>(user: UserId, tree: &Tree) -> Result<Vec<T>> {
        tree.scan_prefix(user_prefix(user))
            .map(|entry| {
                let (_, val) = entry?;
                Ok(bincode::deserialize(&val)?)
            })
            .collect()
    }
}

/// Aborts a sled transaction with `err` instead of retrying it.
fn abort<E: Into<anyhow::Error>>(err: E) -> ConflictableTransactionError<anyhow::Error> {
    ConflictableTransactionError::Abort(err.into())
}

fn transaction_error(err: TransactionError<anyhow::Error>) -> anyhow::Error {
    match err {
        TransactionError::Abort(err) => err,
        TransactionError::Storage(err) => err.into(),
    }
}

fn user_prefix(user: UserId) -> String {
    format!("{}/", user.0)
}

// Zero-padded so that lexicographic key order is id order.
fn record_key(user: UserId, id: u64) -> String {
    format!("{}/{id:020}", user.0)
}

#[cfg(test)]
pub(crate) struct TestDatabase {
    _dir: tempfile::TempDir, // keeps the data directory alive for the test
    pub(crate) db: Database,
}

#[cfg(test)]
impl TestDatabase {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path()).unwrap();
        Self { _dir: dir, db }
    }
}
