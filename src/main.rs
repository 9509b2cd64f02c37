mod api;
mod chat;
mod database;
mod llm;
mod query;
mod settings;
mod snapshot;
mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::{
    chat::ChatService,
    database::Database,
    llm::OllamaModel,
    settings::{Args, Settings},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let settings =
        Settings::from_file(args.config.as_deref()).context("failed to load settings")?;

    let database = Database::connect(&settings.database.path)?;
    info!(
        model = %settings.llm.model,
        host = %settings.llm.ollama_host,
        "Using language model"
    );
    let model = Arc::new(OllamaModel::new(&settings.llm));
    let chat = ChatService::new(database.clone(), model, settings.chat.max_message_len);

    let schema = api::schema(database, chat);
    web::serve(schema, settings.web.address).await;
    Ok(())
}
