//! Telegram bot.
//!
//! The bot is a thin transport around [`engine::Engine`]: it keeps one
//! conversation per user, feeds every text message to the engine and renders
//! the responses back.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use reqwest::{Client, Url};
use teloxide::{prelude::*, update_listeners::webhooks};

mod api;
mod handlers;
mod state;
mod ui;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CURRENCIES: [&str; 3] = ["USD", "EUR", "GBP"];

type IncomeEngine = engine::Engine<api::NbgClient>;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("missing bot token")]
    MissingToken,
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("invalid webhook url: {0}")]
    WebhookUrl(String),
    #[error("webhook secret may only contain A-Z, a-z, 0-9, _ and -")]
    WebhookSecret,
    #[error("invalid bot api url: {0}")]
    ApiUrl(String),
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error("failed to set up webhook: {0}")]
    Webhook(#[from] teloxide::RequestError),
}

#[derive(Clone)]
pub struct ConfigParameters {
    allowed_users: Option<Vec<UserId>>,
    engine: Arc<IncomeEngine>,
    sessions: state::SessionStore,
}

/// Where Telegram pushes updates when the bot runs behind a webhook.
#[derive(Clone, Debug)]
pub struct Webhook {
    address: SocketAddr,
    url: Url,
    secret: Option<String>,
}

pub struct Bot {
    token: String,
    api_url: Option<Url>,
    allowed_users: Option<Vec<UserId>>,
    engine: Arc<IncomeEngine>,
    webhook: Option<Webhook>,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    /// Serves updates until ctrl-c. Fails when the webhook cannot be set up.
    pub async fn run(&self) -> Result<(), BotError> {
        tracing::info!("Starting telegram bot...");

        let mut bot = teloxide::Bot::new(&self.token);
        if let Some(url) = &self.api_url {
            bot = bot.set_api_url(url.clone());
        }

        let sessions = state::SessionStore::default();
        let cleanup = sessions.spawn_cleanup(state::ABANDON_TIMEOUT, state::CLEANUP_INTERVAL);
        let result = self.dispatch(bot, sessions).await;
        cleanup.abort();
        result
    }

    async fn dispatch(
        &self,
        bot: teloxide::Bot,
        sessions: state::SessionStore,
    ) -> Result<(), BotError> {
        let parameters = ConfigParameters {
            allowed_users: self.allowed_users.clone(),
            engine: self.engine.clone(),
            sessions,
        };

        let handler =
            dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

        let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::warn!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build();

        let Some(webhook) = &self.webhook else {
            tracing::info!("Polling for updates...");
            dispatcher.dispatch().await;
            return Ok(());
        };

        tracing::info!(
            "Listening for webhook updates on {} for {}",
            webhook.address,
            webhook.url
        );
        let mut options = webhooks::Options::new(webhook.address, webhook.url.clone());
        if let Some(secret) = &webhook.secret {
            options = options.secret_token(secret.clone());
        }

        let listener = webhooks::axum(bot, options).await?;
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct BotBuilder {
    token: String,
    api_url: Option<String>,
    allowed_users: Option<Vec<UserId>>,
    currencies: Vec<String>,
    rates_url: Option<String>,
    timeout: Option<Duration>,
    webhook: Option<WebhookBuilder>,
}

#[derive(Debug)]
struct WebhookBuilder {
    base_url: String,
    path: String,
    secret: Option<String>,
    host: Option<IpAddr>,
    port: u16,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    /// Talk to this Bot API server instead of `api.telegram.org`.
    pub fn api_url(mut self, url: &str) -> BotBuilder {
        self.api_url = Some(url.to_string());
        self
    }

    /// Restricts the bot to these Telegram user ids. An empty list allows
    /// everyone.
    pub fn allowed_users(mut self, allowed_users: Vec<u64>) -> BotBuilder {
        if !allowed_users.is_empty() {
            self.allowed_users = Some(allowed_users.into_iter().map(UserId).collect());
        }
        self
    }

    /// Currencies offered on the keyboard. Defaults to USD, EUR and GBP.
    pub fn currencies(mut self, currencies: Vec<String>) -> BotBuilder {
        self.currencies = currencies;
        self
    }

    /// Rate endpoint and request timeout.
    pub fn rates(mut self, url: Option<&str>, timeout: Option<Duration>) -> BotBuilder {
        self.rates_url = url.map(str::to_string);
        self.timeout = timeout;
        self
    }

    /// Receive updates on `{base_url}{path}` instead of polling.
    pub fn webhook(
        mut self,
        base_url: &str,
        path: &str,
        secret: Option<&str>,
        host: Option<IpAddr>,
        port: u16,
    ) -> BotBuilder {
        self.webhook = Some(WebhookBuilder {
            base_url: base_url.to_string(),
            path: path.to_string(),
            secret: secret.map(str::to_string),
            host,
            port,
        });
        self
    }

    pub fn build(self) -> Result<Bot, BotError> {
        tracing::info!("Initializing telegram bot...");
        if self.token.trim().is_empty() {
            return Err(BotError::MissingToken);
        }

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;
        let rates = api::NbgClient::new(
            client,
            self.rates_url
                .unwrap_or_else(|| api::DEFAULT_RATES_URL.to_string()),
        );

        let currencies = if self.currencies.is_empty() {
            DEFAULT_CURRENCIES.map(str::to_string).to_vec()
        } else {
            self.currencies
        };
        let engine = engine::Engine::builder()
            .rates(rates)
            .currencies(currencies)
            .build()?;

        let webhook = self.webhook.map(WebhookBuilder::build).transpose()?;
        let api_url = self
            .api_url
            .map(|url| Url::parse(&url).map_err(|err| BotError::ApiUrl(err.to_string())))
            .transpose()?;

        Ok(Bot {
            token: self.token,
            api_url,
            allowed_users: self.allowed_users,
            engine: Arc::new(engine),
            webhook,
        })
    }
}

impl WebhookBuilder {
    fn build(self) -> Result<Webhook, BotError> {
        let url = webhook_url(&self.base_url, &self.path)?;

        if let Some(secret) = &self.secret
            && !is_valid_secret(secret)
        {
            return Err(BotError::WebhookSecret);
        }

        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        Ok(Webhook {
            address: SocketAddr::new(host, self.port),
            url,
            secret: self.secret,
        })
    }
}

fn webhook_url(base_url: &str, path: &str) -> Result<Url, BotError> {
    let base = base_url.trim_end_matches('/');
    let base = if base.contains("://") {
        base.to_string()
    } else {
        format!("https://{base}")
    };
    let path = format!("/{}", path.trim_start_matches('/'));

    Url::parse(&format!("{base}{path}")).map_err(|err| BotError::WebhookUrl(err.to_string()))
}

fn is_valid_secret(secret: &str) -> bool {
    (1..=256).contains(&secret.len())
        && secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
