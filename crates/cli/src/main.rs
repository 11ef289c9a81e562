use clap::{Parser, Subcommand};
use linkless::codec::{self, PlaceholderCipher};
use linkless::{bridge, config, dispatch, fetch, gateway};

#[derive(Parser)]
#[command(name = "linkless")]
#[command(about = "Linkless SMS web gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the gateway: SMS webhook (when transport.relayUrl is set), health probe, and fetch bridge.
    Gateway {
        /// Config file path (default: LINKLESS_CONFIG_PATH or ~/.linkless/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP and WebSocket port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Fetch a page once through the bridge and print the bounded text.
    Fetch {
        /// Page URL; https:// is assumed when no scheme is given.
        url: String,
    },

    /// Print the SMS request body (LK:<payload>) a peer would send for a URL.
    Encode {
        /// Config file path, for the shared secret.
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        url: String,
    },

    /// Decode a reply payload received from the gateway.
    Decode {
        /// Config file path, for the shared secret.
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        payload: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("linkless {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Fetch { url }) => {
            if let Err(e) = run_fetch(url).await {
                log::error!("fetch failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Encode { config, url }) => {
            if let Err(e) = run_encode(config, &url) {
                log::error!("encode failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Decode { config, payload }) => {
            if let Err(e) = run_decode(config, &payload) {
                log::error!("decode failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    gateway::run_gateway(config).await
}

async fn run_fetch(url: String) -> anyhow::Result<()> {
    let bridge = bridge::FetchBridge::new(fetch::ContentFetcher::http()?);
    match bridge.spawn_fetch_web(Some(url)).await? {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    }
}

fn run_encode(config_path: Option<std::path::PathBuf>, url: &str) -> anyhow::Result<()> {
    let (config, _) = config::load_config(config_path)?;
    let secret = config::resolve_shared_secret(&config);
    println!("{}", dispatch::encode_request(&PlaceholderCipher, &secret, url)?);
    Ok(())
}

fn run_decode(config_path: Option<std::path::PathBuf>, payload: &str) -> anyhow::Result<()> {
    let (config, _) = config::load_config(config_path)?;
    let secret = config::resolve_shared_secret(&config);
    println!("{}", codec::decode_text(&PlaceholderCipher, &secret, payload)?);
    Ok(())
}
