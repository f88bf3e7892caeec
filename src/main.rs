use iam_token::iam::{
    auth::{IamTokenEndpoint, TokenManager},
    config::Config,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    info!(message = "Using IAM token endpoint", token_url = %config.token_url);

    let endpoint = IamTokenEndpoint::from_config(&config)?;
    let token_manager = TokenManager::new(endpoint);

    match std::env::var("IAM_TOKEN") {
        Ok(token) => token_manager.set_token(token).await,
        Err(_) => token_manager.set_key(getenv("IAM_API_KEY")).await,
    }

    let token = token_manager.get_token().await?;
    let token_info = token_manager.token_info().await;
    let state = token_manager.token_state().await;

    info!(
        message = "Token ready",
        token_len = token.len(),
        token_type = %token_info.token_type,
        token_expiration = token_info.expiration,
        state = ?state,
    );

    Ok(())
}

fn getenv(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("env var {} is not set", key))
}
