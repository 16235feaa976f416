use std::time::Duration;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "income_bot={level},telegram_bot={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let telegram = settings.telegram;
    let rates = settings.rates;

    let mut builder = telegram_bot::Bot::builder()
        .token(&telegram.token)
        .allowed_users(telegram.allowed_users)
        .currencies(rates.currencies)
        .rates(rates.url.as_deref(), rates.timeout_secs.map(Duration::from_secs));

    if let Some(url) = &telegram.api_url {
        builder = builder.api_url(url);
    }

    match &telegram.webhook {
        Some(webhook) => {
            tracing::info!("Found webhook settings...");
            builder = builder.webhook(
                &webhook.base_url,
                &webhook.path,
                webhook.secret.as_deref(),
                webhook.host,
                webhook.port,
            );
        }
        None => tracing::info!("No webhook settings, using long polling..."),
    }

    let bot = builder.build()?;
    bot.run().await?;

    Ok(())
}
