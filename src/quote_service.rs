use alloy::primitives::U256;

use crate::{
    error::{
        Error,
        Result,
    },
    exchange_rate::ExchangeRate,
    onchain::OnchainQuoteSource,
    quote::{
        compute_quote,
        QuoteError,
        QuoteResult,
    },
    token::{
        self,
        from_base_units,
        to_base_units,
    },
};



#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteOrigin {
    ReferenceRate,
    Onchain,
}



/// Quote as shown to the user.
///
/// `fee`, `price` and `slippage_bps` are only known for on-chain quotes. Fee
/// is in destination token units, price is the raw contract value.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapQuote {
    pub result: QuoteResult,
    pub origin: QuoteOrigin,
    pub fee: Option<String>,
    pub price: Option<U256>,
    pub slippage_bps: Option<U256>,
}



/// Prices swaps from the reference rate and asks the AMM for everything the
/// rate can not price.
pub struct QuoteService {
    source: Option<Box<dyn OnchainQuoteSource + Send + Sync>>,
}



impl QuoteService {
    /// Without on-chain source, failed reference quotes are returned as is.
    pub fn new(source: Option<Box<dyn OnchainQuoteSource + Send + Sync>>) -> Self {
        Self {
            source,
        }
    }


    pub async fn quote(&self, amount: &str, from: &str, to: &str,
        rate: Option<&ExchangeRate>
    )
        -> Result<SwapQuote>
    {
        let result = compute_quote(amount, from, to, rate);

        let fallback = matches!(result.error,
            Some(QuoteError::UnsupportedPair { .. } | QuoteError::RateUnavailable)
        );

        let (true, Some(source)) = (fallback, &self.source) else {
            return Ok(SwapQuote {
                result,
                origin: QuoteOrigin::ReferenceRate,
                fee: None,
                price: None,
                slippage_bps: None,
            })
        };

        log::debug!("{} -> {}: {:?}, asking chain", from, to, result.error);

        let src = token::descriptor(from)?;
        let dst = token::descriptor(to)?;

        // Same grid as the calculator, so both paths agree on what the amount
        // is in base units.
        let amount_in = to_base_units(amount, src.decimals)?;
        if amount_in.is_zero() {
            return Err(Error::InvalidAmount(amount.to_string()))
        }

        let q = source.quote(src.address, dst.address, amount_in).await?;

        let out = from_base_units(q.amount_out, dst.decimals)?;
        let fee = from_base_units(q.fee, dst.decimals)?;
        let input = from_base_units(amount_in, src.decimals)?;

        let rate = if input > 0.0 { out / input } else { 0.0 };

        Ok(SwapQuote {
            result: QuoteResult {
                output_amount: format!("{:.*}", dst.display_decimals, out),
                display_rate: format!("{:.6}", rate),
                error: None,
            },
            origin: QuoteOrigin::Onchain,
            fee: Some(format!("{:.*}", dst.display_decimals, fee)),
            price: Some(q.price),
            slippage_bps: Some(q.slippage_bps),
        })
    }
}



#[cfg(test)]
mod test {
    use std::sync::{
        Arc,
        Mutex,
        atomic::{
            AtomicUsize,
            Ordering,
        },
    };

    use alloy::primitives::Address;
    use async_trait::async_trait;

    use super::*;
    use crate::{
        exchange_rate::USD_INR,
        onchain::OnchainQuote,
        token::TokenSymbol,
    };

    /// Prices everything 1:1 in base units, minus a fixed fee, and counts
    /// calls.
    struct FlatSource {
        calls: Arc<AtomicUsize>,
        last: LastCall,
    }

    #[async_trait]
    impl OnchainQuoteSource for FlatSource {
        async fn quote(&self, token_in: Address, token_out: Address,
            amount_in: U256
        )
            -> Result<OnchainQuote>
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((token_in, token_out, amount_in));

            Ok(OnchainQuote {
                amount_out: amount_in.saturating_sub(U256::from(10u64)),
                fee: U256::from(10u64),
                price: U256::from(83_250_000u64),
                slippage_bps: U256::from(7u64),
            })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl OnchainQuoteSource for FailingSource {
        async fn quote(&self, _: Address, _: Address, _: U256)
            -> Result<OnchainQuote>
        {
            Err(Error::Status(503))
        }
    }

    type LastCall = Arc<Mutex<Option<(Address, Address, U256)>>>;

    fn service() -> (QuoteService, Arc<AtomicUsize>, LastCall) {
        let calls = Arc::new(AtomicUsize::new(0));
        let last = LastCall::default();
        let source = FlatSource {
            calls: calls.clone(),
            last: last.clone(),
        };

        (QuoteService::new(Some(Box::new(source))), calls, last)
    }

    fn last_amount_in(last: &LastCall) -> Option<U256> {
        last.lock().unwrap().map(|(_, _, amount)| amount)
    }

    #[tokio::test]
    async fn test_reference_rate_quote_does_not_touch_chain() {
        let (svc, calls, _) = service();
        let rate = ExchangeRate::new(USD_INR, 8325000, -5, 0, 0);

        let q = svc.quote("100", "PYUSDC", "sINR", Some(&rate)).await.unwrap();

        assert_eq!(q.origin, QuoteOrigin::ReferenceRate);
        assert_eq!(q.result.output_amount, "8325.00000");
        assert_eq!(q.price, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_pair_falls_back_to_chain() {
        let (svc, calls, last) = service();

        // ETH has 18 decimals, PYUSDC 6: 1 ETH is 10^18 wei in, 10^18 - 10
        // base units out.
        let q = svc.quote("1", "ETH", "PYUSDC", None).await.unwrap();

        assert_eq!(q.origin, QuoteOrigin::Onchain);
        assert_eq!(q.result.error, None);
        assert_eq!(q.slippage_bps, Some(U256::from(7u64)));
        assert_eq!(q.price, Some(U256::from(83_250_000u64)));
        assert_eq!(q.fee.as_deref(), Some("0.000010"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (token_in, token_out, amount_in) = last.lock().unwrap().unwrap();
        assert_eq!(token_in, TokenSymbol::ETH.descriptor().address);
        assert_eq!(token_out, TokenSymbol::PYUSDC.descriptor().address);
        assert_eq!(amount_in, U256::from(1_000_000_000_000_000_000u128));
    }

    #[tokio::test]
    async fn test_missing_rate_falls_back_to_chain() {
        let (svc, calls, _) = service();

        let q = svc.quote("2.5", "PYUSDC", "SINR", None).await.unwrap();

        assert_eq!(q.origin, QuoteOrigin::Onchain);
        // 2_500_000 base units in, 2_499_990 out with 5 decimals.
        assert_eq!(q.result.output_amount, "24.99990");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_accepts_what_calculator_accepts() {
        let (svc, _, last) = service();

        let q = svc.quote("1e3", "ETH", "PYUSDC", None).await.unwrap();
        assert_eq!(q.origin, QuoteOrigin::Onchain);
        assert_eq!(last_amount_in(&last),
            Some(U256::from(1_000_000_000_000_000_000_000u128))
        );

        svc.quote("+5", "PYUSDC", "SINR", None).await.unwrap();
        assert_eq!(last_amount_in(&last), Some(U256::from(5_000_000u64)));
    }

    #[tokio::test]
    async fn test_fallback_rounds_like_calculator() {
        let (svc, _, last) = service();
        let rate = ExchangeRate::new(USD_INR, 100000, -5, 0, 0);

        // sINR has 5 decimals, the 6th place is rounded on both paths.
        let reference = svc.quote("1.000006", "SINR", "PYUSDC", Some(&rate))
            .await
            .unwrap();
        assert_eq!(reference.result.output_amount, "1.000010");

        svc.quote("1.000006", "SINR", "ETH", None).await.unwrap();
        assert_eq!(last_amount_in(&last), Some(U256::from(100_001u64)));
    }

    #[tokio::test]
    async fn test_sub_unit_amount_is_not_sent_to_chain() {
        let (svc, calls, last) = service();

        // Rounds to zero PYUSDC base units.
        let err = svc.quote("0.0000004", "PYUSDC", "SINR", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(..)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Rounds up to one base unit.
        svc.quote("0.0000006", "PYUSDC", "SINR", None).await.unwrap();
        assert_eq!(last_amount_in(&last), Some(U256::from(1u64)));
    }

    #[tokio::test]
    async fn test_invalid_amount_is_not_sent_to_chain() {
        let (svc, calls, _) = service();

        let q = svc.quote("-5", "ETH", "PYUSDC", None).await.unwrap();

        assert_eq!(q.origin, QuoteOrigin::ReferenceRate);
        assert_eq!(q.result.error, Some(QuoteError::InvalidAmount));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_without_source_error_is_returned_as_is() {
        let svc = QuoteService::new(None);

        let q = svc.quote("1", "ETH", "PYUSDC", None).await.unwrap();

        assert_eq!(q.origin, QuoteOrigin::ReferenceRate);
        assert!(matches!(q.result.error, Some(QuoteError::UnsupportedPair { .. })));
    }

    #[tokio::test]
    async fn test_unknown_token_on_fallback() {
        let (svc, calls, _) = service();

        let err = svc.quote("1", "DOGE", "PYUSDC", None).await.unwrap_err();

        assert!(matches!(err, Error::UnknownToken(..)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_source_error_is_propagated() {
        let svc = QuoteService::new(Some(Box::new(FailingSource)));

        let err = svc.quote("1", "ETH", "PYUSDC", None).await.unwrap_err();
        assert!(matches!(err, Error::Status(503)));
    }
}
