//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::client::PcoClient;
use crate::config::ClientOptions;
use crate::pagination::PaginationOptions;
use crate::query::QueryParameters;
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Page size used with `--page` when `--per-page` is not given
const DEFAULT_PAGE_SIZE: u32 = 25;

/// Arguments of the `get` command
#[derive(Debug, Clone, Default)]
pub(crate) struct GetArgs {
    pub endpoint: String,
    pub filters: Vec<String>,
    pub include: Vec<String>,
    pub order: Option<String>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub all: bool,
    pub max_items: Option<usize>,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let client = PcoClient::new(self.load_options()?).context("invalid client options")?;

        match &self.cli.command {
            Commands::Get {
                endpoint,
                filters,
                include,
                order,
                per_page,
                page,
                all,
                max_items,
            } => {
                let args = GetArgs {
                    endpoint: endpoint.clone(),
                    filters: filters.clone(),
                    include: include.clone(),
                    order: order.clone(),
                    per_page: *per_page,
                    page: *page,
                    all: *all,
                    max_items: *max_items,
                };
                self.get(&client, &args).await
            }
            Commands::Health => self.health(&client).await,
            Commands::Me => self.me(&client).await,
        }
    }

    /// Load client options from `--config` or the environment
    fn load_options(&self) -> Result<ClientOptions> {
        let mut options = match &self.cli.config {
            Some(path) => ClientOptions::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => ClientOptions::from_env(),
        };
        if self.cli.verbose {
            options.enable_detailed_logging = true;
        }
        Ok(options)
    }

    async fn get(&self, client: &PcoClient, args: &GetArgs) -> Result<()> {
        let params = build_parameters(args)?;
        debug!(endpoint = %args.endpoint, query = %params, "Running get");

        if !args.all {
            let body: Value = client
                .connection()
                .get_with_query(&args.endpoint, &params)
                .await?;
            self.output(&body);
            return Ok(());
        }

        let options = PaginationOptions {
            page_size: args.per_page,
            max_items: args.max_items,
            ..Default::default()
        };

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });

        let items: Vec<Value> = client
            .connection()
            .get_all(&args.endpoint, &params, &options, &cancel)
            .await?;
        info!(count = items.len(), "Fetched items");
        self.output(&Value::Array(items));
        Ok(())
    }

    async fn health(&self, client: &PcoClient) -> Result<()> {
        let healthy = client.health_check().await;
        self.output(&json!({ "healthy": healthy }));
        if !healthy {
            bail!("API health check failed");
        }
        Ok(())
    }

    async fn me(&self, client: &PcoClient) -> Result<()> {
        let user = client.current_user().await;
        self.output(&json!({
            "id": user.id,
            "name": user.name,
            "first_name": user.first_name,
            "last_name": user.last_name,
            "avatar": user.avatar,
            "is_authenticated": user.is_authenticated,
        }));
        Ok(())
    }

    /// Output a value
    fn output(&self, value: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(value).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            }
        }
    }
}

/// Translate `get` arguments into query parameters
pub(crate) fn build_parameters(args: &GetArgs) -> Result<QueryParameters> {
    let mut params = QueryParameters::new();

    for filter in &args.filters {
        let (field, value) = parse_key_value(filter)?;
        params.add_filter(field, value);
    }
    for name in args.include.iter().filter(|s| !s.trim().is_empty()) {
        params.add_include(name.trim());
    }
    if let Some(order) = &args.order {
        match order.strip_prefix('-') {
            Some(field) => params.order_by_desc(field),
            None => params.order_by(order.as_str()),
        };
    }

    match (args.page, args.per_page) {
        (Some(page), size) => {
            params.set_pagination(page, size.unwrap_or(DEFAULT_PAGE_SIZE))?;
        }
        (None, Some(size)) => params.per_page = Some(size),
        (None, None) => {}
    }

    Ok(params)
}

/// Split `field=value`
pub(crate) fn parse_key_value(input: &str) -> Result<(&str, &str)> {
    match input.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim(), value)),
        _ => bail!("expected FIELD=VALUE, got '{input}'"),
    }
}
