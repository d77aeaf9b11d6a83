use std::{
    collections::HashMap,
    sync::Arc,
};

use tokio::sync::mpsc;

use crate::{
    shared_state::SharedState,
    exchange_rate::{
        ExchangeRate,
        Pair,
    },
    atomic_swap::AtomicSwap,
};



/// Outcome of a single poll of the price endpoint.
///
/// `fetched_at` - Unix timestamp in seconds when the response was handled.
#[derive(Debug, Clone)]
pub enum FeedUpdate {
    Rates {
        rates: Vec<ExchangeRate>,
        fetched_at: u64,
    },
    Failed {
        reason: String,
        fetched_at: u64,
    },
}



/// Latest known reference rates.
///
/// `rates` - latest rate per pair. A failed poll does not remove rates, it
/// only sets `error`, staleness is decided by `max_age`.
/// `last_updated` - time of the last successful poll.
/// `error` - reason of the last poll failure, cleared by next success.
/// `max_age` - rates published more than this many seconds ago are stale.
#[derive(Debug, Clone, Default)]
pub struct RateBook {
    rates: HashMap<Pair, ExchangeRate>,
    pub last_updated: Option<u64>,
    pub error: Option<String>,
    pub max_age: u64,
}



impl RateBook {
    pub fn new(max_age: u64) -> Self {
        Self {
            max_age,
            ..Default::default()
        }
    }


    pub fn apply(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Rates { rates, fetched_at } => {
                for rate in rates {
                    // Out of order responses must not replace newer prices.
                    if let Some(cur) = self.rates.get(&rate.pair) {
                        if cur.publish_time > rate.publish_time {
                            continue
                        }
                    }

                    self.rates.insert(rate.pair, rate);
                }

                self.last_updated = Some(fetched_at);
                self.error = None;
            }

            FeedUpdate::Failed { reason, .. } => {
                self.error = Some(reason);
            }
        }
    }


    /// Latest usable rate value for pair name like "USD/INR".
    pub fn get_rate(&self, pair_name: &str) -> Option<f64> {
        let pair: Pair = pair_name.parse().ok()?;
        self.rates.get(&pair)?.usable()
    }


    /// Latest rate for pair that is not older than `max_age` at `now`.
    pub fn fresh_rate(&self, pair: &Pair, now: u64) -> Option<&ExchangeRate> {
        let rate = self.rates.get(pair)?;

        // Publish time ahead of our clock is treated as fresh.
        if now.saturating_sub(rate.publish_time) > self.max_age {
            return None
        }

        Some(rate)
    }
}



pub struct RateFeed {
    rx: mpsc::Receiver<FeedUpdate>,
    book: RateBook,
    mailbox: Arc<AtomicSwap<Option<RateBook>>>,
}



impl RateFeed {
    pub fn new(rx: mpsc::Receiver<FeedUpdate>, max_age: u64,
        mailbox: Arc<AtomicSwap<Option<RateBook>>>
    )
        -> Self
    {
        Self {
            rx,
            book: RateBook::new(max_age),
            mailbox,
        }
    }
}



pub async fn main(mut feed: RateFeed, shared_state: Arc<SharedState>) {
    let mut published: Box<Option<RateBook>> = Box::new(None);

    // If collector task has exited, this task has no use to be alive.
    while let Some(update) = feed.rx.recv().await {
        if let FeedUpdate::Failed { ref reason, .. } = update {
            log::warn!("rate feed update failed: {}", reason);
        }

        feed.book.apply(update);

        *published = Some(feed.book.clone());
        published = feed.mailbox.swap(published);

        if shared_state.is_shut_down() {
            return
        }
    }
}
