use std::sync::Arc;

use dotenv;
use tokio::sync::mpsc;

pub mod error;
pub mod config;
pub mod shared_state;
pub mod token;
pub mod exchange_rate;
pub mod quote;
pub mod rate_limit;
pub mod rate_feed;
pub mod hermes_collector;
pub mod atomic_swap;
pub mod onchain;
pub mod quote_service;
pub mod quote_ticker;

use config::Config;
use shared_state::SharedState;
use hermes_collector::HermesCollector;
use rate_feed::{
    FeedUpdate,
    RateFeed,
};
use atomic_swap::AtomicSwap;
use onchain::{
    ForexAmmRpc,
    OnchainQuoteSource,
};
use quote_service::QuoteService;
use quote_ticker::QuoteTicker;
use token::TokenSymbol;



#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    // Every setting has a default, so running without .env is fine.
    if let Err(e) = dotenv::from_path(".env") {
        log::warn!("could not load .env, using environment only: {}", e);
    }

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{}", e);
            return
        }
    };

    let state = Arc::new(SharedState::default());

    let mailbox = Arc::new(AtomicSwap::new(Box::new(None)));

    let (tx, rx) = mpsc::channel::<FeedUpdate>(16);

    let mut collector = HermesCollector::new(&cfg.hermes_url, &cfg.feed_pairs, tx);
    collector.request_period_millis_set(cfg.request_period_ms);

    let feed = RateFeed::new(rx, cfg.rate_max_age_secs, mailbox.clone());

    let source: Option<Box<dyn OnchainQuoteSource + Send + Sync>> = match cfg.rpc_url {
        Some(ref url) => {
            let rpc = match ForexAmmRpc::new(url, cfg.amm_address,
                TokenSymbol::PYUSDC.descriptor().address
            ) {
                Ok(rpc) => rpc,
                Err(e) => {
                    log::error!("{}", e);
                    return
                }
            };

            match rpc.paused().await {
                Ok(true) => log::warn!("ForexAMM {} is paused", rpc.address()),
                Ok(false) => log::info!("ForexAMM {} is live", rpc.address()),
                Err(e) => log::warn!("could not read ForexAMM status: {}", e),
            }

            if let Some(account) = cfg.balance_address {
                match rpc.balance(account).await {
                    Ok(balance) => log::info!("{} balance: {} ETH", account, balance),
                    Err(e) => log::warn!("could not read balance of {}: {}", account, e),
                }
            }

            Some(Box::new(rpc))
        }

        None => {
            log::info!("RPC_URL not set, on-chain quote fallback disabled");
            None
        }
    };

    let ticker = QuoteTicker::new(mailbox, QuoteService::new(source),
        &cfg.quote_amount, cfg.quote_from, cfg.quote_to, cfg.ticker_period_ms
    );

    let collector_h = tokio::spawn(hermes_collector::main(collector, state.clone()));
    let feed_h = tokio::spawn(rate_feed::main(feed, state.clone()));
    let ticker_h = tokio::spawn(quote_ticker::main(ticker, state.clone()));

    let state_signal = state.clone();
    let sig_h = tokio::spawn(async move {
        if let Ok(..) = tokio::signal::ctrl_c().await {
            log::info!("shutting down");
            state_signal.shut_down();
        }
    });

    // Collector exits either on shutdown or when it has nothing to poll, in
    // both cases the rest has nothing left to do.
    let _ = collector_h.await;
    state.shut_down();

    let _ = feed_h.await;
    let _ = ticker_h.await;

    sig_h.abort();
    let _ = sig_h.await;
}
