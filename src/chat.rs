use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_graphql::SimpleObject;
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::{
    database::{Database, UserId},
    llm::LanguageModel,
    query::{process_query, IntentType, ProcessedQuery},
    snapshot::Snapshot,
};

#[derive(SimpleObject, Debug, PartialEq)]
pub(crate) struct ChatReply {
    pub(crate) response: String,
    pub(crate) intent: IntentType,
    pub(crate) confidence: f64,
    pub(crate) suggested_response: String,
}

/// Answers chat messages: classifies the message, gathers the figures the
/// classification asks for, and has the language model phrase the answer.
pub(crate) struct ChatService {
    db: Database,
    model: Arc<dyn LanguageModel>,
    max_message_len: usize,
}

impl ChatService {
    pub(crate) fn new(db: Database, model: Arc<dyn LanguageModel>, max_message_len: usize) -> Self {
        Self {
            db,
            model,
            max_message_len,
        }
    }

    #[instrument(name = "chat", skip(self, message), fields(user = user.0))]
    pub(crate) async fn respond(
        &self,
        user: UserId,
        message: &str,
        today: NaiveDate,
    ) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            bail!("message must not be empty");
        }
        let len = message.chars().count();
        if len > self.max_message_len {
            bail!(
                "message is {len} characters long; the limit is {}",
                self.max_message_len
            );
        }

        let processed = process_query(message);
        info!(
            intent = ?processed.intent.kind,
            confidence = processed.confidence,
            "Classified message"
        );

        let snapshot = Snapshot::collect(&self.db, user, &processed.intent, today)
            .context("failed to gather financial data")?;
        let prompt = build_prompt(&processed, &snapshot, today)?;
        debug!(%prompt, "Built prompt");

        let response = self
            .model
            .generate(&prompt)
            .await
            .inspect_err(|e| warn!("Language model request failed: {e:#}"))
            .context("language model request failed")?;

        Ok(ChatReply {
            response: response.trim().to_string(),
            intent: processed.intent.kind,
            confidence: processed.confidence,
            suggested_response: processed.suggested_response,
        })
    }
}

fn build_prompt(processed: &ProcessedQuery, snapshot: &Snapshot, today: NaiveDate) -> Result<String> {
    let intent = serde_json::to_string_pretty(&processed.intent)?;
    let data = serde_json::to_string_pretty(snapshot)?;
    Ok(format!(
        "You are a personal finance assistant answering questions about the user's own accounts.\n\n\
        - Answer only from the financial data below; never invent figures.\n\
        - If the data does not answer the question, say so and suggest what the user could ask.\n\
        - Amounts are in the user's currency; keep them to two decimals.\n\
        - Be brief and friendly, and avoid jargon.\n\
        - Today's date is {today}.\n\n\
        USER QUESTION:\n{question}\n\n\
        CLASSIFIED INTENT (confidence {confidence}):\n{intent}\n\n\
        FINANCIAL DATA:\n{data}\n\n\
        PLANNED ACTION: {plan}\n",
        question = processed.original_query,
        confidence = processed.confidence,
        plan = processed.suggested_response,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::{AccountKind, TestDatabase},
        llm::StubModel,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
    }

    fn service(test: &TestDatabase, model: Arc<StubModel>) -> ChatService {
        ChatService::new(test.db.clone(), model, 100)
    }

    #[tokio::test]
    async fn answers_with_classification() {
        let test = TestDatabase::new();
        test.db
            .insert_account(UserId(1), "Checking", AccountKind::Checking, 1234.5)
            .unwrap();
        let model = Arc::new(StubModel::replying("  You have $1,234.50.\n"));
        let chat = service(&test, model.clone());

        let reply = chat
            .respond(UserId(1), "What's my total account balance?", today())
            .await
            .unwrap();

        assert_eq!(reply.response, "You have $1,234.50.");
        assert_eq!(reply.intent, IntentType::Balance);
        assert_eq!(reply.confidence, 0.9);
        assert_eq!(
            reply.suggested_response,
            "I'll check your account balances and overall net worth."
        );

        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("What's my total account balance?"));
        assert!(prompt.contains("\"net_worth\": 1234.5"));
        assert!(prompt.contains("\"type\": \"balance\""));
        assert!(prompt.contains("Today's date is 2025-03-20."));
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_messages() {
        let test = TestDatabase::new();
        let model = Arc::new(StubModel::replying("unused"));
        let chat = service(&test, model.clone());

        assert!(chat.respond(UserId(1), "  ", today()).await.is_err());
        let long = "a".repeat(101);
        let err = chat.respond(UserId(1), &long, today()).await.unwrap_err();
        assert!(err.to_string().contains("limit is 100"));
        assert!(model.last_prompt().is_none());
    }

    #[tokio::test]
    async fn model_failure_is_an_error() {
        let test = TestDatabase::new();
        let chat = service(&test, Arc::new(StubModel::failing()));
        let err = chat
            .respond(UserId(1), "How much did I spend on food?", today())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "language model request failed");
    }

    #[tokio::test]
    async fn unknown_questions_still_reach_the_model() {
        let test = TestDatabase::new();
        let model = Arc::new(StubModel::replying("Hi!"));
        let chat = service(&test, model.clone());

        let reply = chat.respond(UserId(1), "hello there", today()).await.unwrap();
        assert_eq!(reply.intent, IntentType::General);
        assert_eq!(reply.confidence, 0.3);
        assert!(model.last_prompt().unwrap().contains("\"kind\": \"overview\""));
    }
}
