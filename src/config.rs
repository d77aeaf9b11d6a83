use std::env;

use alloy::primitives::Address;

use crate::{
    error::{
        Error,
        Result,
    },
    exchange_rate::Pair,
    token::TokenSymbol,
};



macro_rules! env_load_or_default {
    ($name:expr, $default:expr) => {{
        match env::var($name) {
            Ok(val) => val,
            Err(..) => $default.to_string(),
        }
    }}
}



/// Service configuration, loaded from environment (and .env file).
pub struct Config {
    pub hermes_url: String,
    pub feed_pairs: Vec<Pair>,
    pub request_period_ms: u64,
    pub rate_max_age_secs: u64,
    pub rpc_url: Option<String>,
    pub amm_address: Address,
    pub balance_address: Option<Address>,
    pub quote_amount: String,
    pub quote_from: TokenSymbol,
    pub quote_to: TokenSymbol,
    pub ticker_period_ms: u64,
}



fn parse_u64(key: &'static str, val: &str) -> Result<u64> {
    val.trim().parse().map_err(|e| Error::Config {
        key,
        reason: format!("{:?}: {}", val, e),
    })
}



fn config_err(key: &'static str, e: impl std::fmt::Display) -> Error {
    Error::Config {
        key,
        reason: e.to_string(),
    }
}



impl Config {
    pub fn from_env() -> Result<Self> {
        let hermes_url = env_load_or_default!("HERMES_URL",
            "https://hermes.pyth.network"
        );

        let feed_pairs = env_load_or_default!("FEED_PAIRS", "USD/INR")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<Pair>())
            .collect::<Result<Vec<_>>>()
            .map_err(|e| config_err("FEED_PAIRS", e))?;

        if feed_pairs.is_empty() {
            return Err(Error::Config {
                key: "FEED_PAIRS",
                reason: "at least one pair is required".to_string(),
            })
        }

        let request_period_ms = parse_u64("REQUEST_PERIOD_MS",
            &env_load_or_default!("REQUEST_PERIOD_MS", "30000")
        )?;

        let rate_max_age_secs = parse_u64("RATE_MAX_AGE_SECS",
            &env_load_or_default!("RATE_MAX_AGE_SECS", "120")
        )?;

        let rpc_url = env::var("RPC_URL").ok().filter(|s| !s.trim().is_empty());

        let amm_address = env_load_or_default!("FOREX_AMM_ADDRESS",
            "0xEa9FD265B4AD929a6bfDD431B66a42fcdD554E01"
        )
            .parse::<Address>()
            .map_err(|e| config_err("FOREX_AMM_ADDRESS", e))?;

        // Account whose native balance is logged at startup, if any.
        let balance_address = match env::var("BALANCE_ADDRESS") {
            Ok(val) if !val.trim().is_empty() => Some(val.trim()
                .parse::<Address>()
                .map_err(|e| config_err("BALANCE_ADDRESS", e))?
            ),
            _ => None,
        };

        let quote_amount = env_load_or_default!("QUOTE_AMOUNT", "100");

        let quote_from: TokenSymbol = env_load_or_default!("QUOTE_FROM", "PYUSDC")
            .parse()
            .map_err(|e| config_err("QUOTE_FROM", e))?;

        let quote_to: TokenSymbol = env_load_or_default!("QUOTE_TO", "SINR")
            .parse()
            .map_err(|e| config_err("QUOTE_TO", e))?;

        let ticker_period_ms = parse_u64("TICKER_PERIOD_MS",
            &env_load_or_default!("TICKER_PERIOD_MS", "5000")
        )?;

        Ok(Self {
            hermes_url,
            feed_pairs,
            request_period_ms,
            rate_max_age_secs,
            rpc_url,
            amm_address,
            balance_address,
            quote_amount,
            quote_from,
            quote_to,
            ticker_period_ms,
        })
    }
}
