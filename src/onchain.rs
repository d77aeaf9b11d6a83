//! Read-only access to the deployed ForexAMM contract.
//!
//! Only quoting, status and balance reads are done here, nothing is signed or
//! sent. Contract bindings are generated from the ABI declared below.



use alloy::{
    primitives::{
        utils::format_units,
        Address,
        U256,
    },
    providers::{
        DynProvider,
        Provider,
        ProviderBuilder,
    },
    sol,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;

use crate::{
    error::{
        Error,
        Result,
    },
    token::format_token_amount,
};



sol! {
    #[sol(rpc)]
    interface IForexAMM {
        function quotePYUSDForToken(address tokenOut, uint256 amountIn)
            external view
            returns (uint256 amountOut, uint256 fee, uint256 price, uint256 slippageBps);

        function quoteTokenForPYUSD(address tokenIn, uint256 amountIn)
            external view
            returns (uint256 amountOut, uint256 fee, uint256 price, uint256 slippageBps);

        function quoteTokenForToken(address tokenIn, address tokenOut, uint256 amountIn,
            bool useDirectCrossRate
        )
            external view
            returns (uint256 amountOut, uint256 fee, uint256 crossRate, uint256 slippageBps);

        function paused() external view returns (bool);
    }
}



/// Authoritative quote as returned by the AMM, all values in base units of
/// the contract (amounts in token decimals, price as the contract scales it).
///
/// `price` - PYUSD price of the token, or the cross rate for token to token
/// quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnchainQuote {
    pub amount_out: U256,
    pub fee: U256,
    pub price: U256,
    pub slippage_bps: U256,
}



impl From<IForexAMM::quotePYUSDForTokenReturn> for OnchainQuote {
    fn from(r: IForexAMM::quotePYUSDForTokenReturn) -> Self {
        Self {
            amount_out: r.amountOut,
            fee: r.fee,
            price: r.price,
            slippage_bps: r.slippageBps,
        }
    }
}



impl From<IForexAMM::quoteTokenForPYUSDReturn> for OnchainQuote {
    fn from(r: IForexAMM::quoteTokenForPYUSDReturn) -> Self {
        Self {
            amount_out: r.amountOut,
            fee: r.fee,
            price: r.price,
            slippage_bps: r.slippageBps,
        }
    }
}



impl From<IForexAMM::quoteTokenForTokenReturn> for OnchainQuote {
    fn from(r: IForexAMM::quoteTokenForTokenReturn) -> Self {
        Self {
            amount_out: r.amountOut,
            fee: r.fee,
            price: r.crossRate,
            slippage_bps: r.slippageBps,
        }
    }
}



/// Source of quotes for pairs the reference rate can not price.
#[async_trait]
pub trait OnchainQuoteSource {
    async fn quote(&self, token_in: Address, token_out: Address, amount_in: U256)
        -> Result<OnchainQuote>;
}



/// Contract function that quotes one swap direction.
pub enum QuoteCall {
    FromPyusd(IForexAMM::quotePYUSDForTokenCall),
    ToPyusd(IForexAMM::quoteTokenForPYUSDCall),
    Cross(IForexAMM::quoteTokenForTokenCall),
}



/// ForexAMM accessed over Ethereum JSON-RPC.
///
/// `pyusd` - collateral token, decides which quote function is used.
pub struct ForexAmmRpc {
    provider: DynProvider,
    amm: IForexAMM::IForexAMMInstance<DynProvider>,
    pyusd: Address,
}



impl ForexAmmRpc {
    pub fn new(rpc_url: &str, amm: Address, pyusd: Address) -> Result<Self> {
        let url: Url = rpc_url.parse().map_err(|e| Error::Config {
            key: "RPC_URL",
            reason: format!("{:?}: {}", rpc_url, e),
        })?;

        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            amm: IForexAMM::new(amm, provider.clone()),
            provider,
            pyusd,
        })
    }


    pub fn address(&self) -> Address {
        *self.amm.address()
    }


    /// Select the contract function that quotes the given direction.
    pub fn quote_call(&self, token_in: Address, token_out: Address, amount_in: U256)
        -> QuoteCall
    {
        if token_in == self.pyusd {
            QuoteCall::FromPyusd(IForexAMM::quotePYUSDForTokenCall {
                tokenOut: token_out,
                amountIn: amount_in,
            })
        }
        else if token_out == self.pyusd {
            QuoteCall::ToPyusd(IForexAMM::quoteTokenForPYUSDCall {
                tokenIn: token_in,
                amountIn: amount_in,
            })
        }
        else {
            // Route through PYUSD, the contract may disable direct cross
            // rates.
            QuoteCall::Cross(IForexAMM::quoteTokenForTokenCall {
                tokenIn: token_in,
                tokenOut: token_out,
                amountIn: amount_in,
                useDirectCrossRate: false,
            })
        }
    }


    /// Whether swaps on the AMM are paused.
    pub async fn paused(&self) -> Result<bool> {
        Ok(self.amm.paused().call().await?)
    }


    /// Native balance of `account`, in ETH with display precision.
    pub async fn balance(&self, account: Address) -> Result<String> {
        let wei = self.provider.get_balance(account).await?;
        format_balance(wei)
    }
}



/// Format native balance in wei the way ETH amounts are shown.
pub fn format_balance(wei: U256) -> Result<String> {
    let eth = format_units(wei, "ether")?;
    Ok(format_token_amount(&eth, "ETH"))
}



#[async_trait]
impl OnchainQuoteSource for ForexAmmRpc {
    async fn quote(&self, token_in: Address, token_out: Address, amount_in: U256)
        -> Result<OnchainQuote>
    {
        let q: OnchainQuote = match self.quote_call(token_in, token_out, amount_in) {
            QuoteCall::FromPyusd(c) => self.amm
                .quotePYUSDForToken(c.tokenOut, c.amountIn)
                .call().await?
                .into(),

            QuoteCall::ToPyusd(c) => self.amm
                .quoteTokenForPYUSD(c.tokenIn, c.amountIn)
                .call().await?
                .into(),

            QuoteCall::Cross(c) => self.amm
                .quoteTokenForToken(c.tokenIn, c.tokenOut, c.amountIn,
                    c.useDirectCrossRate
                )
                .call().await?
                .into(),
        };

        Ok(q)
    }
}
