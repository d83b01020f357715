use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    plantops_observability::init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let token_secret = std::env::var("TOKEN_SECRET").unwrap_or_else(|_| {
        tracing::warn!("TOKEN_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let pool = plantops_infra::connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    plantops_infra::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let app = plantops_api::app::build_app(pool, token_secret);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
