use anyhow::{bail, Result};
use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

use super::{abort, transaction_error, user_prefix, Database, UserId};
use crate::query::Category;

/// A monthly spending limit.
#[derive(SimpleObject, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Budget {
    pub(crate) id: u64,
    /// `None` limits total spending across all categories.
    pub(crate) category: Option<Category>,
    pub(crate) limit: f64,
}

impl Database {
    /// Sets the limit for `category`, replacing any previous limit for it.
    pub(crate) fn set_budget(
        &self,
        user: UserId,
        category: Option<Category>,
        limit: f64,
    ) -> Result<Budget> {
        if !limit.is_finite() || limit < 0.0 {
            bail!("budget limit must be a non-negative number");
        }
        let key = budget_key(user, category);
        let fresh_id = self.next_id()?;

        // One key per category.
        let budget = self
            .budgets
            .transaction(|budgets| {
                let id = match budgets.get(key.as_bytes())? {
                    Some(bytes) => bincode::deserialize::<Budget>(&bytes).map_err(abort)?.id,
                    None => fresh_id,
                };
                let budget = Budget {
                    id,
                    category,
                    limit,
                };
                let value = bincode::serialize(&budget).map_err(abort)?;
                budgets.insert(key.as_bytes(), value)?;
                Ok(budget)
            })
            .map_err(transaction_error)?;
        Ok(budget)
    }

    pub(crate) fn budgets(&self, user: UserId) -> Result<Vec<Budget>> {
        Database::select_all(user, &self.budgets)
    }
}

fn budget_key(user: UserId, category: Option<Category>) -> String {
    let category = category.map_or("all", Category::as_str);
    format!("{}{category}", user_prefix(user))
}
