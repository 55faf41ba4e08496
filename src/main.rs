use color_eyre::eyre::{
    Result,
    eyre,
};
use lottery_client::{
    local_ledger::LedgerConfig,
    types::{
        format_eth,
        parse_eth,
    },
    wallets,
};
use std::time::Duration;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

fn print_usage_and_exit() -> ! {
    let defaults = LedgerConfig::default();
    println!(
        "Usage: lottery-client [--wallet <name>] [--wallet-dir <path>]\n\
         [--entry-fee <eth>] [--threshold <eth>] [--draw-delay <seconds>]\n\
         \n\
         Runs the lottery client against an in-process local ledger.\n\
         \n\
         Flags:\n\
           --wallet <name>        Keystore wallet to play as (defaults to a local demo account)\n\
           --wallet-dir <path>    Override keystore directory (defaults to ~/.ethereum/keystore)\n\
           --entry-fee <eth>      Entry fee per ticket (default {} ETH)\n\
           --threshold <eth>      Prize pool threshold that schedules the draw (default {} ETH)\n\
           --draw-delay <seconds> Countdown length once the threshold is met (default {})",
        format_eth(defaults.entry_fee),
        format_eth(defaults.threshold),
        defaults.draw_delay.as_secs(),
    );
    std::process::exit(0);
}

struct CliOptions {
    wallet_name: Option<String>,
    wallet_dir: Option<String>,
    ledger: LedgerConfig,
}

fn parse_cli_args() -> Result<CliOptions> {
    let mut args = std::env::args().skip(1);
    let mut wallet_name: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut ledger = LedgerConfig::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--entry-fee" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--entry-fee requires an ETH amount"))?;
                ledger.entry_fee = parse_eth(&raw)?;
            }
            "--threshold" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--threshold requires an ETH amount"))?;
                ledger.threshold = parse_eth(&raw)?;
            }
            "--draw-delay" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--draw-delay requires a number of seconds"))?;
                let seconds: u64 = raw
                    .parse()
                    .map_err(|_| eyre!("--draw-delay must be a number of seconds"))?;
                ledger.draw_delay = Duration::from_secs(seconds);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    Ok(CliOptions {
        wallet_name,
        wallet_dir,
        ledger,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let options = parse_cli_args()?;

    // the TUI owns stdout, so logs go to a rolling file
    let file_appender = rolling::daily("logs", "lottery-client.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let wallet = match &options.wallet_name {
        Some(name) => {
            let dir = wallets::resolve_wallet_dir(options.wallet_dir.as_deref())?;
            let descriptor = wallets::find_wallet(&dir, name)?;
            Some(wallets::unlock_wallet(&descriptor)?)
        }
        None => None,
    };

    client::run_app(client::AppConfig {
        ledger: options.ledger,
        wallet,
    })
    .await
}
