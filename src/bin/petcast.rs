// Native binary for petcast - inspect tokens and reproduce viewer resolution

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::sync::Arc;

use petcast::{
    bridge::StaticBridge,
    chain::ChainClient,
    config::{self, Config, ConfigArgs},
    debug, metadata, platform,
    provider::ContextProvider,
    share,
    storage::{KeyValueStore, MemoryStore, FID_STORAGE_KEY},
};

/// petcast - NFT pet mini-app tools
///
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug)]
#[command(name = "petcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "NFT pet mini-app tools", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Print the resolved configuration to stderr
    #[arg(long, global = true)]
    show_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a data:application/json;base64 token URI
    Decode { uri: String },
    /// Read a token's URI from chain and print its metadata
    Token { id: u64 },
    /// Count pets held by an address
    Balance { owner: String },
    /// Resolve the viewer the way a page load would
    Resolve {
        /// Page URL or query string (e.g. "?fid=123")
        #[arg(long, default_value = "")]
        url: String,
        /// User agent reported by the runtime
        #[arg(long)]
        ua: Option<String>,
        /// Host SDK context as JSON
        #[arg(long)]
        context: Option<String>,
        /// Legacy globals snapshot as JSON
        #[arg(long)]
        globals: Option<String>,
        /// Previously cached FID value
        #[arg(long)]
        cache: Option<String>,
    },
    /// Build a cast compose link for a pet
    Share {
        id: u64,
        #[arg(long)]
        name: Option<String>,
    },
}

fn parse_json(label: &str, raw: Option<String>) -> Result<Option<Value>> {
    raw.map(|s| serde_json::from_str(&s).with_context(|| format!("--{label} is not valid JSON")))
        .transpose()
}

fn chain_client(cfg: &Config) -> Result<ChainClient> {
    let contract = cfg
        .pet_contract
        .clone()
        .ok_or_else(|| anyhow!("PET_CONTRACT is required for chain reads"))?;
    Ok(ChainClient::new(&cfg.rpc_url, contract, cfg.rpc_timeout_ms)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();
    platform::init_logging(log::Level::Warn);
    debug::init_from_url_and_storage_once();

    let cli = Cli::parse();
    let cfg = config::load(cli.config).context("Failed to load configuration")?;
    if cli.show_config {
        cfg.print_summary();
    }

    match cli.command {
        Command::Decode { uri } => match metadata::decode(&uri) {
            Some(meta) => println!("{}", serde_json::to_string_pretty(&meta)?),
            None => println!("null"),
        },
        Command::Token { id } => {
            let client = chain_client(&cfg)?;
            let http = reqwest::Client::new();
            let meta = metadata::load_token_metadata(&client, &http, &cfg.ipfs_gateway, id)
                .await
                .with_context(|| format!("loading token {id}"))?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        Command::Balance { owner } => {
            let client = chain_client(&cfg)?;
            let n = client.balance_of(&owner).await?;
            println!("{n}");
        }
        Command::Resolve {
            url,
            ua,
            context,
            globals,
            cache,
        } => {
            let mut bridge = StaticBridge::absent();
            bridge.user_agent = ua;
            bridge.context = parse_json("context", context)?;
            bridge.globals = parse_json("globals", globals)?;
            let storage = Arc::new(match cache {
                Some(v) => MemoryStore::with(FID_STORAGE_KEY, &v),
                None => MemoryStore::new(),
            });
            let provider = ContextProvider::new(
                Arc::new(bridge),
                storage.clone(),
                url,
                cfg.provider_options(),
            );
            let mut mount = provider.mount();
            let state = mount.loaded().await;
            mount.unmount();
            let out = json!({
                "state": state,
                "cached": storage.get(FID_STORAGE_KEY),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Share { id, name } => {
            println!("{}", share::share_pet_url(&cfg.app_url, id, name.as_deref()));
        }
    }
    Ok(())
}
