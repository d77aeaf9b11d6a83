use std::{
    sync::Arc,
    time::{
        Duration,
        SystemTime,
        UNIX_EPOCH,
    },
};

use tokio::time::sleep;

use crate::{
    shared_state::SharedState,
    atomic_swap::AtomicSwap,
    error::Result,
    exchange_rate::USD_INR,
    quote_service::{
        QuoteOrigin,
        QuoteService,
        SwapQuote,
    },
    rate_feed::RateBook,
    token::{
        format_token_amount,
        TokenSymbol,
    },
};



/// Periodically prices one configured swap with the newest known rates.
///
/// `amount` - human readable amount of `from` token.
pub struct QuoteTicker {
    mailbox: Arc<AtomicSwap<Option<RateBook>>>,
    service: QuoteService,
    amount: String,
    from: TokenSymbol,
    to: TokenSymbol,
    period: Duration,
}



impl QuoteTicker {
    pub fn new(mailbox: Arc<AtomicSwap<Option<RateBook>>>, service: QuoteService,
        amount: &str, from: TokenSymbol, to: TokenSymbol, period_ms: u64
    )
        -> Self
    {
        Self {
            mailbox,
            service,
            amount: amount.to_string(),
            from,
            to,
            period: Duration::from_millis(period_ms),
        }
    }


    /// Price the configured swap once against `book` and log the outcome.
    async fn tick(&self, book: Option<&RateBook>, now: u64) -> Result<SwapQuote> {
        let rate = book.and_then(|b| b.fresh_rate(&USD_INR, now));

        if let Some(err) = book.and_then(|b| b.error.as_deref()) {
            log::debug!("last rate update failed: {}", err);
        }

        let from = self.from.to_string();
        let to = self.to.to_string();
        let amount = format_token_amount(&self.amount, &from);

        let quote = self.service.quote(&self.amount, &from, &to, rate).await;

        match quote {
            Ok(ref q) => match (&q.result.error, q.origin) {
                (None, QuoteOrigin::ReferenceRate) => log::info!(
                    "{} {} -> {} {} (rate {} +/- {:.4})",
                    amount, from, q.result.output_amount, to,
                    q.result.display_rate,
                    rate.map(|r| r.confidence()).unwrap_or(0.0)
                ),

                (None, QuoteOrigin::Onchain) => log::info!(
                    "{} {} -> {} {} (on-chain rate {}, price {}, fee {}, slippage {} bps)",
                    amount, from, q.result.output_amount, to,
                    q.result.display_rate,
                    q.price.unwrap_or_default(),
                    q.fee.as_deref().unwrap_or("0"),
                    q.slippage_bps.unwrap_or_default()
                ),

                (Some(e), _) => log::warn!("{} {} -> {}: {}", amount, from, to, e),
            },

            Err(ref e) => log::error!("quote {} -> {} failed: {}", from, to, e),
        }

        quote
    }
}



pub async fn main(ticker: QuoteTicker, shared_state: Arc<SharedState>) {
    let mut incoming: Box<Option<RateBook>> = Box::new(None);
    let mut book: Option<RateBook> = None;

    while !shared_state.is_shut_down() {
        incoming = ticker.mailbox.swap(incoming);

        // Keep the previous book when the feed has not published anything new
        // since the last tick, staleness is checked per rate.
        if let Some(newer) = incoming.take() {
            book = Some(newer);
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let _ = ticker.tick(book.as_ref(), now).await;

        sleep(ticker.period).await;
    }
}
