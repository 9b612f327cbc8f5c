use crate::metadata::DEFAULT_IPFS_GATEWAY;
use crate::platform::Duration;
use crate::provider::ProviderOptions;
use crate::ready::ReadyPolicy;
use anyhow::{anyhow, Result};
use clap::Args;

/// Shared settings for the CLI and the web build.
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// JSON-RPC endpoint for contract reads
    #[arg(long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Pet NFT contract address (0x...)
    #[arg(long, env = "PET_CONTRACT", global = true)]
    pub pet_contract: Option<String>,

    /// Public URL of the mini-app (used for share embeds)
    #[arg(long, env = "APP_URL", global = true)]
    pub app_url: Option<String>,

    /// IPFS HTTP gateway for ipfs:// media
    #[arg(long, env = "IPFS_GATEWAY", global = true)]
    pub ipfs_gateway: Option<String>,

    /// RPC request timeout in milliseconds (1000-60000)
    #[arg(long, env = "RPC_TIMEOUT_MS", global = true)]
    pub rpc_timeout_ms: Option<u64>,

    /// Interval between ready attempts in milliseconds (50-1000)
    #[arg(long, env = "READY_INTERVAL_MS", global = true)]
    pub ready_interval_ms: Option<u64>,

    /// Total ready signaling window in milliseconds (500-30000)
    #[arg(long, env = "READY_WINDOW_MS", global = true)]
    pub ready_window_ms: Option<u64>,

    /// How long to wait for the host context in milliseconds (0-30000)
    #[arg(long, env = "CONTEXT_TIMEOUT_MS", global = true)]
    pub context_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub rpc_url: String,
    pub pet_contract: Option<String>,
    pub app_url: String,
    pub ipfs_gateway: String,
    pub rpc_timeout_ms: u64,
    pub ready_interval_ms: u64,
    pub ready_window_ms: u64,
    pub context_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rpc_url: "https://mainnet.base.org".to_string(),
            pet_contract: None,
            app_url: "http://localhost:3000".to_string(),
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_string(),
            rpc_timeout_ms: 8000,
            ready_interval_ms: 150,
            ready_window_ms: 6000,
            context_timeout_ms: 6000,
        }
    }
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

/// Resolve configuration from parsed args.
///
/// Environment variables are already folded into `args` by clap, so this
/// only fills defaults and validates.
pub fn load(args: ConfigArgs) -> Result<Config> {
    let d = Config::default();

    let rpc_url = args.rpc_url.unwrap_or(d.rpc_url);
    validate_url(&rpc_url, "RPC_URL")?;

    let pet_contract = args.pet_contract.filter(|s| !s.trim().is_empty());
    if let Some(ref addr) = pet_contract {
        crate::chain::address_word(addr).map_err(|e| anyhow!("PET_CONTRACT: {e}"))?;
    }

    let app_url = args.app_url.unwrap_or(d.app_url);
    validate_url(&app_url, "APP_URL")?;

    let ipfs_gateway = args.ipfs_gateway.unwrap_or(d.ipfs_gateway);
    validate_url(&ipfs_gateway, "IPFS_GATEWAY")?;

    let rpc_timeout_ms = args.rpc_timeout_ms.unwrap_or(d.rpc_timeout_ms);
    let rpc_timeout_ms = validate_in_range(rpc_timeout_ms, 1000, 60000, "RPC_TIMEOUT_MS")?;

    let ready_interval_ms = args.ready_interval_ms.unwrap_or(d.ready_interval_ms);
    let ready_interval_ms = validate_in_range(ready_interval_ms, 50, 1000, "READY_INTERVAL_MS")?;

    let ready_window_ms = args.ready_window_ms.unwrap_or(d.ready_window_ms);
    let ready_window_ms = validate_in_range(ready_window_ms, 500, 30000, "READY_WINDOW_MS")?;

    let context_timeout_ms = args.context_timeout_ms.unwrap_or(d.context_timeout_ms);
    let context_timeout_ms = validate_in_range(context_timeout_ms, 0, 30000, "CONTEXT_TIMEOUT_MS")?;

    Ok(Config {
        rpc_url,
        pet_contract,
        app_url,
        ipfs_gateway,
        rpc_timeout_ms,
        ready_interval_ms,
        ready_window_ms,
        context_timeout_ms,
    })
}

impl Config {
    /// Attempt budget derived from window / interval (at least one attempt).
    pub fn ready_policy(&self) -> ReadyPolicy {
        let max_attempts = (self.ready_window_ms / self.ready_interval_ms.max(1)).max(1);
        ReadyPolicy {
            interval: Duration::from_millis(self.ready_interval_ms),
            max_attempts: u32::try_from(max_attempts).unwrap_or(u32::MAX),
            window: Duration::from_millis(self.ready_window_ms),
        }
    }

    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            ready: self.ready_policy(),
            context_timeout: Duration::from_millis(self.context_timeout_ms),
        }
    }

    /// Print current configuration (useful for debugging)
    pub fn print_summary(&self) {
        eprintln!("petcast configuration:");
        eprintln!("  RPC URL: {}", self.rpc_url);
        match &self.pet_contract {
            Some(c) => eprintln!("  Contract: {c}"),
            None => eprintln!("  Contract: (not set)"),
        }
        eprintln!("  App URL: {}", self.app_url);
        eprintln!("  IPFS gateway: {}", self.ipfs_gateway);
        eprintln!("  RPC timeout: {}ms", self.rpc_timeout_ms);
        eprintln!(
            "  Ready: every {}ms for {}ms",
            self.ready_interval_ms, self.ready_window_ms
        );
        eprintln!("  Context timeout: {}ms", self.context_timeout_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_args_are_validated() {
        let args = ConfigArgs {
            rpc_url: Some("https://rpc.example".into()),
            app_url: Some("https://pets.app".into()),
            ipfs_gateway: Some("https://gw.example".into()),
            rpc_timeout_ms: Some(2000),
            ready_interval_ms: Some(200),
            ready_window_ms: Some(5000),
            context_timeout_ms: Some(1000),
            ..Default::default()
        };
        let cfg = load(args).unwrap();
        assert_eq!(cfg.rpc_url, "https://rpc.example");
        assert_eq!(cfg.ready_policy().max_attempts, 25);
        assert_eq!(cfg.provider_options().context_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let args = ConfigArgs {
            rpc_url: Some("https://rpc.example".into()),
            app_url: Some("https://pets.app".into()),
            ipfs_gateway: Some("https://gw.example".into()),
            ready_interval_ms: Some(5),
            ..Default::default()
        };
        let err = load(args).unwrap_err().to_string();
        assert!(err.contains("READY_INTERVAL_MS"), "{err}");
    }

    #[test]
    fn non_http_urls_are_rejected() {
        let args = ConfigArgs {
            rpc_url: Some("ws://rpc.example".into()),
            ..Default::default()
        };
        assert!(load(args).is_err());
    }

    #[derive(clap::Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    #[test]
    fn cli_flags_parse_into_args() {
        use clap::Parser;
        let cli = TestCli::try_parse_from(["petcast", "--ready-interval-ms", "200", "--app-url", "https://pets.app"])
            .unwrap();
        assert_eq!(cli.config.ready_interval_ms, Some(200));
        assert_eq!(cli.config.app_url.as_deref(), Some("https://pets.app"));
    }

    #[test]
    fn load_does_not_read_the_environment_itself() {
        // Only clap folds env into args; an unparsed ConfigArgs sees defaults.
        std::env::set_var("READY_WINDOW_MS", "1");
        let cfg = load(ConfigArgs::default()).unwrap();
        assert_eq!(cfg.ready_window_ms, Config::default().ready_window_ms);
    }

    #[test]
    fn default_policy_matches_signaler_default() {
        assert_eq!(Config::default().ready_policy(), ReadyPolicy::default());
    }
}
