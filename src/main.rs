//! Arcana Wallet - Operator CLI
//!
//! Inspection tools around the client core. Wallet signing and shielded
//! proofs live in the embedding application, so this binary sticks to what
//! can run without them.
//!
//! Run modes:
//!   arcana-wallet assets                          - List supported assets
//!   arcana-wallet config                          - Show effective configuration
//!   arcana-wallet convert <amount> [--asset SYM]  - Public <-> shielded units
//!   arcana-wallet balance <address> [--asset SYM] - Public balance of an address
//!   arcana-wallet derive-key <r> <s>              - Tongo key from a login signature

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use arcana::common::{init_from_config, ArcanaConfig};
use arcana::identity::{derive_private_key, derive_seed, seed_bytes, Identity, WalletSignature};
use arcana::reconciler::{BalanceReconciler, FetchContext};
use arcana::types::units::{format_amount, parse_decimal, to_public_units, to_shielded_units};
use arcana::types::{truncate_address, AssetRegistry};
use arcana::ArcanaError;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || matches!(args[1].as_str(), "help" | "--help" | "-h") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let config = match ArcanaConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_from_config(&config) {
        eprintln!("Warning: {}", e);
    }

    let result = match args[1].as_str() {
        "assets" => run_assets(&config),
        "config" => {
            config.print_summary();
            Ok(())
        }
        "convert" => run_convert(&config, &args[2..]),
        "balance" => run_balance(&config, &args[2..]).await,
        "derive-key" => run_derive_key(&args[2..]),
        _ => {
            print_usage();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.error_code(), e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("Arcana Wallet - Tongo shielded balances on Starknet");
    println!();
    println!("Usage:");
    println!("  arcana-wallet assets                           List supported assets");
    println!("  arcana-wallet config                           Show effective configuration");
    println!("  arcana-wallet convert <amount> [--asset SYM]   Convert public <-> shielded units");
    println!("  arcana-wallet balance <address> [--asset SYM]  Fetch the public balance");
    println!("  arcana-wallet derive-key <r> <s> [--show-secret]");
    println!("                                                 Derive the Tongo key from a login signature");
    println!();
    println!("Environment Variables:");
    println!("  ARCANA_NETWORK                    mainnet | sepolia (default: mainnet)");
    println!("  ARCANA_RPC_URL                    Starknet JSON-RPC endpoint");
    println!("  ARCANA_ASSETS_FILE                JSON asset table (required on sepolia)");
    println!("  ARCANA_DEFAULT_ASSET              Default asset (default: STRK)");
    println!("  ARCANA_POLL_INTERVAL_SECS         Balance polling period (default: 10)");
    println!("  ARCANA_CONFIRMATION_TIMEOUT_SECS  Confirmation wait bound (default: 300)");
    println!("  ARCANA_LOG_LEVEL                  trace | debug | info | warn | error");
    println!("  ARCANA_LOG_JSON                   Set to 1 for JSON logs");
}

/// `--asset SYM`, falling back to the configured default
fn asset_arg(config: &ArcanaConfig, args: &[String]) -> String {
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--asset" if i + 1 < args.len() => return args[i + 1].clone(),
            _ => i += 1,
        }
    }
    config.default_asset.clone()
}

fn load_registry(config: &ArcanaConfig) -> Result<AssetRegistry, ArcanaError> {
    Ok(config.load_registry()?)
}

fn run_assets(config: &ArcanaConfig) -> Result<(), ArcanaError> {
    let registry = load_registry(config)?;

    println!("=== Supported Assets ({:?}) ===", config.network);
    for asset in registry.iter() {
        println!();
        println!("{} - {}", asset.symbol, asset.name);
        println!("  Decimals:   {}", asset.decimals);
        println!("  Token:      {}", truncate_address(&asset.erc20_address));
        println!("  Tongo:      {}", truncate_address(&asset.tongo_address));
        println!(
            "  Unit:       {} {} per shielded unit",
            format_amount(asset.rate, asset.decimals),
            asset.symbol
        );
    }

    Ok(())
}

fn run_convert(config: &ArcanaConfig, args: &[String]) -> Result<(), ArcanaError> {
    let amount = args
        .first()
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| ArcanaError::InvalidAmount("usage: convert <amount>".to_string()))?;

    let registry = load_registry(config)?;
    let asset = registry.get(&asset_arg(config, args))?;

    let public = parse_decimal(amount, asset.decimals);
    if public.is_zero() {
        return Err(ArcanaError::InvalidAmount(format!("'{}' is not positive", amount)));
    }
    let shielded = to_shielded_units(public, asset.rate);
    let settled = to_public_units(shielded, asset.rate);

    println!("=== {} Conversion ===", asset.symbol);
    println!("Public amount:   {} ({} base units)", format_amount(public, asset.decimals), public);
    println!("Shielded units:  {}", shielded);
    println!("Shielded value:  {}", format_amount(settled, asset.decimals));
    if settled != public {
        println!(
            "Remainder:       {} stays public",
            format_amount(public - settled, asset.decimals)
        );
    }

    Ok(())
}

async fn run_balance(config: &ArcanaConfig, args: &[String]) -> Result<(), ArcanaError> {
    let address = args
        .first()
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| ArcanaError::InvalidDestination("usage: balance <address>".to_string()))?;

    let registry = load_registry(config)?;
    let asset = registry.get(&asset_arg(config, args))?.clone();

    let reconciler = BalanceReconciler::new(Arc::new(config.network_handle()), &asset.symbol);
    let snapshot = reconciler
        .fetch(&FetchContext {
            address: address.clone(),
            asset: asset.clone(),
            handle: None,
            epoch: reconciler.epoch(),
        })
        .await;

    if let arcana::FetchOutcome::Partial {
        public_error: Some(e),
        ..
    } = &snapshot.last_fetch
    {
        return Err(ArcanaError::FetchFailed(e.clone()));
    }

    println!(
        "{} {}: {} {}",
        truncate_address(address),
        asset.symbol,
        format_amount(snapshot.public, asset.decimals),
        asset.symbol
    );

    Ok(())
}

fn run_derive_key(args: &[String]) -> Result<(), ArcanaError> {
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let show_secret = args.iter().any(|a| a == "--show-secret");

    let (r, s) = match positional.as_slice() {
        [r, s, ..] => (r.as_str(), s.as_str()),
        _ => {
            return Err(ArcanaError::LoginFailed(
                "usage: derive-key <r> <s>".to_string(),
            ))
        }
    };

    let pair = WalletSignature::pair(r, s).to_pair()?;
    let identity = Identity::from_private_key(derive_private_key(&pair)?)?;

    println!("Public key:  {}", identity.public_key_hex());
    if show_secret {
        println!("Seed:        0x{}", hex::encode(seed_bytes(&derive_seed(&pair))));
        println!("Private key: {}", identity.private_key().to_hex_string());
    }

    Ok(())
}
