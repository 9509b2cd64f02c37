mod chat;
mod record;

use async_graphql::{Context, EmptySubscription, MergedObject, Result};

use crate::{
    chat::ChatService,
    database::{Database, UserId},
};

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(chat::ChatQuery, record::RecordQuery);

#[derive(Default, MergedObject)]
pub(crate) struct Mutation(record::RecordMutation);

pub(crate) type Schema = async_graphql::Schema<Query, Mutation, EmptySubscription>;

pub(crate) fn schema(database: Database, chat: ChatService) -> Schema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(database)
        .data(chat)
        .finish()
}

/// The user the request was authenticated as.
fn current_user(ctx: &Context<'_>) -> Result<UserId> {
    ctx.data_opt::<UserId>()
        .copied()
        .ok_or_else(|| "authentication required".into())
}

#[cfg(test)]
struct TestSchema {
    _dir: tempfile::TempDir, // to prevent the data directory from being deleted while the test is running
    db: Database,
    schema: Schema,
}

#[cfg(test)]
impl TestSchema {
    const REPLY: &'static str = "Here is what I found.";

    fn new() -> Self {
        let db_dir = tempfile::tempdir().unwrap();
        let db = Database::connect(db_dir.path()).unwrap();
        let model = std::sync::Arc::new(crate::llm::StubModel::replying(Self::REPLY));
        let chat = ChatService::new(db.clone(), model, 1000);
        let schema = schema(db.clone(), chat);
        Self {
            _dir: db_dir,
            db,
            schema,
        }
    }

    async fn execute(&self, query: &str) -> async_graphql::Response {
        let request: async_graphql::Request = query.into();
        self.schema.execute(request).await
    }

    async fn execute_as(&self, user: UserId, query: &str) -> async_graphql::Response {
        let request = async_graphql::Request::new(query).data(user);
        self.schema.execute(request).await
    }
}
