mod error;
mod router;

use std::{collections::HashSet, net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc};

use bark_protocol_claims::{ClaimService, ServiceConfig};
use bark_protocol_client::RpcLedgerClient;
use bark_protocol_csvs::read_roster_csv;
use bark_protocol_db::AirdropDatabase;
use clap::Parser;
use router::RouterState;
use solana_sdk::{pubkey::Pubkey, signature::read_keypair_file, signer::Signer};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::error::ApiError;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Bind address for the server
    #[clap(long, env, default_value_t = SocketAddr::from_str("0.0.0.0:7001").unwrap())]
    bind_addr: SocketAddr,

    /// Path of the airdrop database
    #[clap(long, env)]
    db_path: PathBuf,

    /// RPC url
    #[clap(long, env)]
    rpc_url: String,

    /// Mint address of token in question
    #[clap(long, env)]
    mint: Pubkey,

    /// Path of the pool authority keypair
    #[clap(long, env)]
    pool_keypair_path: PathBuf,

    /// Token symbol used in the canonical claim message
    #[clap(long, env, default_value = "BARK")]
    token_symbol: String,

    /// Upper bound on a single ledger transfer, in seconds
    #[clap(long, env, default_value_t = 30)]
    transfer_timeout_secs: u64,

    /// Pre-approved addresses, comma separated
    #[clap(long, env, value_delimiter = ',')]
    allow_list: Vec<Pubkey>,

    /// Require claimants to be on the whitelist or allow list
    #[clap(long, env)]
    enforce_whitelist: bool,

    /// Require claimants to hold a nonzero token balance
    #[clap(long, env)]
    require_token_holding: bool,

    /// Roster CSV to import at startup
    #[clap(long, env)]
    roster_csv: Option<PathBuf>,

    /// Pool balance in base units, used once when the pool wallet does not
    /// exist yet
    #[clap(long, env)]
    pool_initial_balance: Option<u64>,
}

#[tokio::main]
#[instrument]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt().init();

    info!("args: {:?}", args);

    let db = AirdropDatabase::open_or_create(&args.db_path)?;
    info!("opened database at {}", args.db_path.display());

    let authority = read_keypair_file(&args.pool_keypair_path)
        .map_err(|e| format!("failed to read pool keypair: {e}"))?;
    let authority_pubkey = authority.pubkey();

    let client = RpcLedgerClient::new(args.rpc_url.clone(), args.mint, authority);
    info!("started rpc client at {}", args.rpc_url);

    let config = ServiceConfig {
        token_symbol: args.token_symbol.clone(),
        allow_list: args
            .allow_list
            .iter()
            .map(|p| p.to_string())
            .collect::<HashSet<_>>(),
        enforce_whitelist: args.enforce_whitelist,
        require_token_holding: args.require_token_holding,
        transfer_timeout: std::time::Duration::from_secs(args.transfer_timeout_secs),
    };

    let service = ClaimService::new(db, client, config);

    match service.pool_wallet().await? {
        Some(pool) => info!(
            "pool wallet {}: {} of {} base units available",
            pool.wallet_address,
            pool.available_balance(),
            pool.balance
        ),
        None => match args.pool_initial_balance {
            Some(balance) => {
                let pool = service
                    .configure_pool(&authority_pubkey.to_string(), balance)
                    .await?;
                info!(
                    "configured pool wallet {} with {} base units",
                    pool.wallet_address, pool.balance
                );
            }
            None => warn!("no pool wallet configured; claims will be rejected"),
        },
    }

    if let Some(path) = &args.roster_csv {
        let rows = read_roster_csv(path).map_err(|e| format!("roster read failed: {e}"))?;
        let summary = service.import_roster(&rows).await?;
        info!(
            "imported roster {}: {} whitelisted, {} granted",
            path.display(),
            summary.whitelisted,
            summary.granted
        );
    }

    let state = Arc::new(RouterState { service });

    let app = router::get_routes(state);

    info!("starting server at {}", args.bind_addr);
    let listener = TcpListener::bind(args.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
