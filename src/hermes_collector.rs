use std::{
    sync::Arc,
    time::{
        Duration,
        SystemTime,
        UNIX_EPOCH,
    },
};

use tokio::{
    time::sleep,
    sync::mpsc,
};

use reqwest::StatusCode;

use serde::Deserialize;

use crate::{
    error::{
        Error,
        Result,
    },
    shared_state::SharedState,
    rate_limit::RateLimit,
    rate_feed::FeedUpdate,
    exchange_rate::{
        ExchangeRate,
        Pair,
    },
};



/// Polls Pyth Hermes for latest prices of configured pairs.
pub struct HermesCollector {
    tx: mpsc::Sender<FeedUpdate>,
    client: reqwest::Client,
    url: String,
    feed_ids: Vec<(&'static str, &'static str)>,
    request_period: u64,
}



impl HermesCollector {
    /// `base_url` - Hermes endpoint without path, i.e.
    /// https://hermes.pyth.network. Pairs without a known feed id are
    /// skipped with a warning.
    pub fn new(base_url: &str, pairs: &[Pair], tx: mpsc::Sender<FeedUpdate>)
        -> Self
    {
        let mut feed_ids = Vec::with_capacity(pairs.len());
        for pair in pairs {
            match pair.feed_id() {
                Some(id) => feed_ids.push(("ids[]", id)),
                None => log::warn!("no price feed known for {}, skipping", pair),
            }
        }

        Self {
            tx,
            client: reqwest::Client::new(),
            url: format!("{}/v2/updates/price/latest",
                base_url.trim_end_matches('/')
            ),
            feed_ids,
            request_period: 30_000,
        }
    }


    /// Set request period in milliseconds. Hermes allows 30 requests per 10
    /// seconds per IP, anything under 500 is asking for a 429.
    ///
    /// This describes how long should be the pause between requests to price
    /// endpoint.
    pub fn request_period_millis_set(&mut self, request_period: u64) {
        self.request_period = request_period;
    }
}



/// Price in Hermes fixed point format. Price and confidence are sent as
/// decimal strings, because they do not always fit into JS number.
#[derive(Deserialize, Debug, Clone)]
struct DecodedPrice {
    price: String,
    conf: String,
    expo: i32,
    publish_time: u64,
}



#[derive(Deserialize, Debug, Clone)]
struct DecodedFeed {
    id: String,
    price: DecodedPrice,
}



#[derive(Deserialize, Debug, Clone)]
struct DecodedBody {
    #[serde(default)]
    parsed: Vec<DecodedFeed>,
}



impl DecodedFeed {
    /// Feeds we did not ask for are ignored, as are entries with unparsable
    /// numbers.
    fn into_rate(self) -> Option<ExchangeRate> {
        let pair = Pair::from_feed_id(&self.id)?;

        let Ok(price) = self.price.price.parse::<i64>() else {
            log::warn!("unparsable price {:?} for {}", self.price.price, pair);
            return None
        };

        let conf = self.price.conf.parse::<u64>().unwrap_or(0);

        Some(ExchangeRate::new(pair, price, self.price.expo, conf,
            self.price.publish_time
        ))
    }
}



/// Decode Hermes JSON body into rates of known pairs.
pub fn decode_rates(body: &str) -> Result<Vec<ExchangeRate>> {
    let decoded: DecodedBody = serde_json::from_str(body)?;

    Ok(decoded.parsed.into_iter()
        .filter_map(DecodedFeed::into_rate)
        .collect())
}



fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}



async fn poll_once(collector: &HermesCollector, start: &SystemTime,
    rate_limit: &mut RateLimit
)
    -> Result<Vec<ExchangeRate>>
{
    let response = collector.client
        .get(&collector.url)
        .query(&collector.feed_ids)
        .header("accept", "application/json")
        .send()
        .await?;

    rate_limit.update_from_headers(start, response.status(), response.headers());

    let status = response.status();
    if status != StatusCode::OK {
        return Err(Error::Status(status.as_u16()))
    }

    let body = response.text().await?;
    let rates = decode_rates(&body)?;

    if rates.is_empty() {
        log::warn!("price endpoint returned no known feeds");
    }

    Ok(rates)
}



pub async fn main(collector: HermesCollector, shared_state: Arc<SharedState>) {
    // Desired/targeted request period
    let req_period = Duration::from_millis(collector.request_period);

    let mut rate_limit = RateLimit::default();

    if collector.feed_ids.is_empty() {
        log::error!("no price feeds configured, collector exits");
        return
    }

    while !shared_state.is_shut_down() {
        rate_limit.start();

        // We consider that the request is made at this point in time, DNS and
        // request building are neglible compared to the request period.
        let start = SystemTime::now();

        let update = match poll_once(&collector, &start, &mut rate_limit).await {
            Ok(rates) => {
                log::debug!("fetched {} rates", rates.len());

                FeedUpdate::Rates {
                    rates,
                    fetched_at: unix_now(),
                }
            }

            Err(e) => FeedUpdate::Failed {
                reason: e.to_string(),
                fetched_at: unix_now(),
            },
        };

        // At the moment this is a conscious decission to lose data if rate
        // feed can not keep up. There is no point to buffer old prices.
        match collector.tx.try_send(update) {
            Ok(()) => {},
            Err(mpsc::error::TrySendError::Full(..)) => {
                log::warn!("rate feed can not keep up, dropping update");
            }
            Err(mpsc::error::TrySendError::Closed(..)) => {
                log::error!("rate feed has gone away, collector exits");
                return
            }
        }

        let mut ts_next_req = start + req_period;
        rate_limit.ts_next_req_adjust(&mut ts_next_req);

        let now = SystemTime::now();

        // If we are slower than the request period, do not sleep at all and
        // employ best effort polling.
        if ts_next_req > now {
            match ts_next_req.duration_since(now) {
                Ok(sleep_duration) => {
                    sleep(sleep_duration).await;
                }

                // Only on jitter in system time, trust the configured period.
                Err(..) => {
                    sleep(req_period).await;
                }
            }
        }
        else {
            log::debug!("price request took longer than the request period");
        }
    }
}
