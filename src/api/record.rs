use async_graphql::{Context, Object, Result};

use super::current_user;
use crate::{
    database::{
        Account, AccountKind, Budget, Database, Goal, NewGoal, NewTransaction, Transaction,
    },
    query::Category,
};

#[derive(Default)]
pub(super) struct RecordQuery;

#[Object]
impl RecordQuery {
    #[allow(clippy::unused_async)]
    async fn accounts(&self, ctx: &Context<'_>) -> Result<Vec<Account>> {
        let user = current_user(ctx)?;
        Ok(ctx.data::<Database>()?.accounts(user)?)
    }

    #[allow(clippy::unused_async)]
    async fn transactions(&self, ctx: &Context<'_>) -> Result<Vec<Transaction>> {
        let user = current_user(ctx)?;
        Ok(ctx.data::<Database>()?.transactions(user)?)
    }

    #[allow(clippy::unused_async)]
    async fn budgets(&self, ctx: &Context<'_>) -> Result<Vec<Budget>> {
        let user = current_user(ctx)?;
        Ok(ctx.data::<Database>()?.budgets(user)?)
    }

    #[allow(clippy::unused_async)]
    async fn goals(&self, ctx: &Context<'_>) -> Result<Vec<Goal>> {
        let user = current_user(ctx)?;
        Ok(ctx.data::<Database>()?.goals(user)?)
    }
}

#[derive(Default)]
pub(super) struct RecordMutation;

#[Object]
impl RecordMutation {
    #[allow(clippy::unused_async)]
    async fn add_account(
        &self,
        ctx: &Context<'_>,
        name: String,
        kind: AccountKind,
        #[graphql(default)] balance: f64,
    ) -> Result<Account> {
        let user = current_user(ctx)?;
        Ok(ctx
            .data::<Database>()?
            .insert_account(user, &name, kind, balance)?)
    }

    /// Records a transaction and applies it to its account's balance.
    #[allow(clippy::unused_async)]
    async fn add_transaction(
        &self,
        ctx: &Context<'_>,
        input: NewTransaction,
    ) -> Result<Transaction> {
        let user = current_user(ctx)?;
        Ok(ctx.data::<Database>()?.insert_transaction(user, input)?)
    }

    /// Sets the monthly limit for a category, or for all spending when no
    /// category is given.
    #[allow(clippy::unused_async)]
    async fn set_budget(
        &self,
        ctx: &Context<'_>,
        category: Option<Category>,
        limit: f64,
    ) -> Result<Budget> {
        let user = current_user(ctx)?;
        Ok(ctx.data::<Database>()?.set_budget(user, category, limit)?)
    }

    #[allow(clippy::unused_async)]
    async fn add_goal(&self, ctx: &Context<'_>, input: NewGoal) -> Result<Goal> {
        let user = current_user(ctx)?;
        Ok(ctx.data::<Database>()?.insert_goal(user, input)?)
    }
}
