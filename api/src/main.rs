use anyhow::{Context, Result};
use zania_api::{build_router, logging, AppState};
use zania_rag::{factory, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;
    logging::init_logging(settings.log_file.as_deref())?;

    log::info!(
        "Starting with vector store {:?}, embeddings {:?}, LLM {:?}, timezone {}",
        settings.vector_store,
        settings.embedding_provider,
        settings.llm_provider,
        settings.timezone
    );

    let query_service = factory::build_query_service(&settings)?;
    let state = AppState::new(query_service, settings.timezone.clone());
    let app = build_router(state, settings.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
