use alloy::primitives::utils::UnitsError;
use thiserror::Error;



/// Errors of the service layer: configuration, the price endpoint and the
/// on-chain quote source.
///
/// The quote calculator does not use this type. Its failures are data, see
/// `quote::QuoteError`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration value for {key}: {reason}")]
    Config {
        key: &'static str,
        reason: String,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not decode response as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote endpoint returned status {0}")]
    Status(u16),

    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("rpc request failed: {0}")]
    Transport(#[from] alloy::transports::TransportError),

    #[error("unit conversion failed: {0}")]
    Units(#[from] UnitsError),

    #[error("unknown token symbol: {0}")]
    UnknownToken(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}



pub type Result<T> = std::result::Result<T, Error>;
