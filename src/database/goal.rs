use anyhow::{bail, Result};
use async_graphql::{InputObject, SimpleObject};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Database, UserId};

#[derive(SimpleObject, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Goal {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) target: f64,
    pub(crate) saved: f64,
    pub(crate) deadline: Option<NaiveDate>,
}

#[derive(InputObject, Clone, Debug)]
pub(crate) struct NewGoal {
    pub(crate) name: String,
    pub(crate) target: f64,
    #[graphql(default)]
    pub(crate) saved: f64,
    pub(crate) deadline: Option<NaiveDate>,
}

impl Database {
    pub(crate) fn insert_goal(&self, user: UserId, new: NewGoal) -> Result<Goal> {
        if new.name.trim().is_empty() {
            bail!("goal name must not be empty");
        }
        if !new.target.is_finite() || new.target <= 0.0 {
            bail!("goal target must be a positive number");
        }
        if !new.saved.is_finite() || new.saved < 0.0 {
            bail!("saved amount must be a non-negative number");
        }
        let goal = Goal {
            id: self.next_id()?,
            name: new.name.trim().to_string(),
            target: new.target,
            saved: new.saved,
            deadline: new.deadline,
        };
        Database::insert(user, goal.id, &goal, &self.goals)?;
        Ok(goal)
    }

    pub(crate) fn goals(&self, user: UserId) -> Result<Vec<Goal>> {
        Database::select_all(user, &self.goals)
    }
}
