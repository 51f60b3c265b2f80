mod api;
mod config;
mod flags;
mod http;
mod json_ld;
mod resolver;
mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::{Api, RequestEvent};
use crate::config::{Config, StorageConfig};
use crate::json_ld::JsonLdProcessor;
use crate::resolver::RemoteOrigin;
use crate::store::ResourceRepo;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let flags = flags::Ldrest::from_env_or_exit();
    let config = Config::load(flags.config())?;

    let keyspace = open_keyspace(&config.storage)?;
    let repo = Arc::new(ResourceRepo::new(keyspace)?);
    let processor = Arc::new(JsonLdProcessor::new(
        config.json_ld.load_default_context()?,
        config.remote.timeout(),
    )?);
    let remote = RemoteOrigin::new(config.remote.timeout())?;
    let api = Arc::new(Api::new(repo, processor, remote));

    match flags.subcommand {
        flags::LdrestCmd::Serve(_) => {
            info!(target: "lifecycle", "starting http server");
            http::serve(&config.server, api).await
        }
        flags::LdrestCmd::Invoke(_) => invoke(&api).await,
    }
}

fn open_keyspace(storage: &StorageConfig) -> Result<fjall::Keyspace> {
    fjall::Config::new(&storage.path)
        .temporary(storage.temporary)
        .open()
        .with_context(|| format!("unable to open keyspace {}", storage.path.display()))
}

async fn invoke(api: &Api) -> Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("unable to read event from stdin")?;
    let event: RequestEvent = serde_json::from_str(&input).context("invalid request event")?;
    let envelope = api.handle(event).await;

    let mut output = serde_json::to_vec_pretty(&envelope)?;
    output.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&output).await?;
    stdout.flush().await?;
    Ok(())
}
