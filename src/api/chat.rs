use async_graphql::{Context, Object, Result};

use super::current_user;
use crate::{
    chat::{ChatReply, ChatService},
    query::{process_query, ProcessedQuery, EXAMPLE_QUERIES},
};

#[derive(Default)]
pub(super) struct ChatQuery;

#[Object]
impl ChatQuery {
    /// Suggested prompts for the chat box.
    #[allow(clippy::unused_async)]
    async fn example_queries(&self) -> Vec<String> {
        EXAMPLE_QUERIES.iter().map(ToString::to_string).collect()
    }

    /// Classifies `text` without touching any data, for previews while the
    /// user is typing.
    #[allow(clippy::unused_async)]
    async fn classify(&self, text: String) -> ProcessedQuery {
        process_query(&text)
    }

    /// Answers a chat message from the caller's own financial data.
    async fn chat(&self, ctx: &Context<'_>, message: String) -> Result<ChatReply> {
        let user = current_user(ctx)?;
        let chat = ctx.data::<ChatService>()?;
        let today = chrono::Utc::now().date_naive();
        match chat.respond(user, &message, today).await {
            Ok(reply) => Ok(reply),
            Err(e) => Err(async_graphql::Error::new(format!("chat failed: {e:#}"))),
        }
    }
}
