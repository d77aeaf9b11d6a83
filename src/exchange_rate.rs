use std::{
    fmt,
    str::FromStr,
};

use crate::error::{
    Error,
    Result,
};



#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    USD,
    INR,
    EUR,
}



/// Currency pair, i.e. USD/INR.
///
/// `base` - this is the first currency that is shown in pair, i.e. USD/INR,
/// base is USD.
/// `quote` - is the second shown in pair, i.e. USD/INR, INR is quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub base: Currency,
    pub quote: Currency,
}



pub const USD_INR: Pair = Pair {
    base: Currency::USD,
    quote: Currency::INR,
};

pub const USD_EUR: Pair = Pair {
    base: Currency::USD,
    quote: Currency::EUR,
};



/// Pyth price feed ids per supported pair.
const PRICE_FEEDS: [(Pair, &str); 2] = [
    (USD_INR, "0ac0f9a2886fc2dd708bc66cc2cea359052ce89d324f45d95fadbc6c4fcf1809"),
    (USD_EUR, "e62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43"),
];



impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "INR" => Ok(Self::INR),
            "EUR" => Ok(Self::EUR),
            _ => Err(Error::Config {
                key: "currency",
                reason: format!("unsupported currency {:?}", s),
            }),
        }
    }
}



impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}



impl FromStr for Pair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((base, quote)) = s.split_once('/') else {
            return Err(Error::Config {
                key: "pair",
                reason: format!("expected BASE/QUOTE, got {:?}", s),
            })
        };

        Ok(Self {
            base: base.parse()?,
            quote: quote.parse()?,
        })
    }
}



impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}



impl Pair {
    /// Pyth feed id (hex, without 0x) for this pair, if the pair is known.
    pub fn feed_id(&self) -> Option<&'static str> {
        PRICE_FEEDS.iter()
            .find(|(pair, _)| pair == self)
            .map(|(_, id)| *id)
    }


    /// Reverse lookup of a feed id returned by the price service. Ids are
    /// compared case-insensitively and with optional 0x prefix.
    pub fn from_feed_id(id: &str) -> Option<Pair> {
        let id = id.strip_prefix("0x").unwrap_or(id);

        PRICE_FEEDS.iter()
            .find(|(_, feed)| feed.eq_ignore_ascii_case(id))
            .map(|(pair, _)| *pair)
    }
}



fn scale(whole: f64, expo: i32) -> f64 {
    // Dividing by an exact power of ten keeps i.e. 8325000e-5 at 83.25,
    // multiplying by 1e-5 would not.
    if expo < 0 {
        whole / 10f64.powi(-expo)
    }
    else {
        whole * 10f64.powi(expo)
    }
}



/// Reference exchange rate as published by the oracle: units of `pair.quote`
/// per one unit of `pair.base`.
///
/// `price` - we keep the oracle's whole number, because floating point looses
/// precission. Real value is `price * 10^expo`.
/// `expo` - power of ten exponent, usually negative, i.e. price 8325000 with
/// expo -5 is 83.25.
/// `conf` - confidence interval in the same fixed point units as price.
/// `publish_time` - Unix timestamp in seconds when the price was published.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    pub pair: Pair,
    pub price: i64,
    pub expo: i32,
    pub conf: u64,
    pub publish_time: u64,
}



impl ExchangeRate {
    pub fn new(pair: Pair, price: i64, expo: i32, conf: u64, publish_time: u64)
        -> Self
    {
        Self {
            pair, price, expo, conf, publish_time,
        }
    }


    pub fn value(&self) -> f64 {
        scale(self.price as f64, self.expo)
    }


    /// Confidence interval around `value()`, in the same units.
    pub fn confidence(&self) -> f64 {
        scale(self.conf as f64, self.expo)
    }


    /// Rate value if it can be used for pricing.
    ///
    /// Zero, negative and non finite values mean "unavailable", never a valid
    /// zero price.
    pub fn usable(&self) -> Option<f64> {
        let value = self.value();
        if value.is_finite() && value > 0.0 {
            Some(value)
        }
        else {
            None
        }
    }
}



#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pair_parse_and_display() {
        let pair: Pair = "usd/inr".parse().unwrap();
        assert_eq!(pair, USD_INR);
        assert_eq!(pair.to_string(), "USD/INR");

        assert!("USDINR".parse::<Pair>().is_err());
        assert!("USD/BTC".parse::<Pair>().is_err());
    }

    #[test]
    fn test_feed_id_lookup() {
        let id = USD_INR.feed_id().unwrap();
        assert_eq!(Pair::from_feed_id(id), Some(USD_INR));

        let prefixed = format!("0x{}", id.to_ascii_uppercase());
        assert_eq!(Pair::from_feed_id(&prefixed), Some(USD_INR));

        assert_eq!(Pair::from_feed_id("deadbeef"), None);
    }

    #[test]
    fn test_rate_value() {
        let rate = ExchangeRate::new(USD_INR, 8325000, -5, 1200, 1_700_000_000);
        assert_eq!(rate.value(), 83.25);
        assert!(rate.usable().is_some());
    }

    #[test]
    fn test_confidence() {
        let rate = ExchangeRate::new(USD_INR, 8325000, -5, 1450, 0);
        assert_eq!(rate.confidence(), 0.0145);

        let rate = ExchangeRate::new(USD_INR, 8325000, -5, 0, 0);
        assert_eq!(rate.confidence(), 0.0);
    }

    #[test]
    fn test_zero_or_negative_rate_is_unusable() {
        assert_eq!(ExchangeRate::new(USD_INR, 0, -5, 0, 0).usable(), None);
        assert_eq!(ExchangeRate::new(USD_INR, -1, -5, 0, 0).usable(), None);
    }
}
