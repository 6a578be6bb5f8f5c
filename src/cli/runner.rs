//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::FetchConfig;
use crate::engine::Fetcher;
use crate::error::Result;
use crate::types::FetchContext;
use serde_json::{json, Value};
use tracing::debug;

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
        let fetcher = Fetcher::from_config(&self.load_config()?)?;
        debug!(
            max_attempts = fetcher.policy().max_attempts,
            max_backoff = ?fetcher.policy().max_backoff,
            "fetcher ready"
        );

        match &self.cli.command {
            Commands::Get {
                repo,
                token,
                accept,
                all,
                revalidate,
                url,
            } => {
                let mut ctx = FetchContext::new(repo.as_str());
                if let Some(token) = token {
                    ctx = ctx.with_token(token.as_str());
                }
                if let Some(accept) = accept {
                    ctx = ctx.with_accept(accept.as_str());
                }
                let output = if *all {
                    Self::get_all(&fetcher, &ctx, url, *revalidate).await?
                } else {
                    Self::get(&fetcher, &ctx, url, *revalidate).await?
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                Ok(())
            }
            Commands::Clear { repo } => {
                fetcher.clear_scope(repo).await?;
                println!("{}", json!({ "cleared": repo }));
                Ok(())
            }
        }
    }

    /// Config file (or defaults) with command-line overrides applied
    fn load_config(&self) -> Result<FetchConfig> {
        let mut config = match &self.cli.config {
            Some(path) => FetchConfig::from_file(path)?,
            None => FetchConfig::default(),
        };
        if let Some(cache) = &self.cli.cache {
            config.cache_dir.clone_from(cache);
        }
        config.validate()?;
        debug!(cache_dir = %config.cache_dir.display(), "configuration loaded");
        Ok(config)
    }

    async fn get(fetcher: &Fetcher, ctx: &FetchContext, url: &str, revalidate: bool) -> Result<Value> {
        let page = fetcher.fetch::<Value>(ctx, url, revalidate).await?;
        Ok(json!({
            "available": page.is_available(),
            "cached": page.is_cached(),
            "next": page.next,
            "data": page.value,
        }))
    }

    async fn get_all(
        fetcher: &Fetcher,
        ctx: &FetchContext,
        url: &str,
        revalidate: bool,
    ) -> Result<Value> {
        let items = fetcher.fetch_all::<Value>(ctx, url, revalidate).await?;
        Ok(Value::Array(items))
    }
}
