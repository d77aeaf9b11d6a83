//! Quote calculator that turns a reference exchange rate into an estimated
//! swap output.
//!
//! Only a few token pairs are priced from the reference rate, they are listed
//! in a static route table. Every other pair is reported as unsupported, so
//! that the caller can ask the AMM contract for a quote instead. This module
//! never touches network or shared state, the rate is always handed in by the
//! caller.



use thiserror::Error;

use crate::{
    exchange_rate::{
        ExchangeRate,
        Pair,
        USD_INR,
    },
    token::{
        self,
        TokenSymbol,
    },
};



/// Reasons why a quote could not be calculated from the reference rate.
///
/// These are never returned as `Err`, they travel inside `QuoteResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("invalid input amount")]
    InvalidAmount,

    #[error("rate not available")]
    RateUnavailable,

    #[error("pair {from}/{to} not supported by reference-rate pricing")]
    UnsupportedPair {
        from: String,
        to: String,
    },
}



/// Outcome of a single quote request. Constructed fresh per request.
///
/// `output_amount` - estimated amount of destination token, formatted with
/// destination token display precision.
/// `display_rate` - effective rate used for the quote.
/// `error` - populated on every failure path, in that case both amounts are
/// "0".
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteResult {
    pub output_amount: String,
    pub display_rate: String,
    pub error: Option<QuoteError>,
}



impl QuoteResult {
    fn failed(error: QuoteError) -> Self {
        Self {
            output_amount: "0".to_string(),
            display_rate: "0".to_string(),
            error: Some(error),
        }
    }
}



#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Use the reference rate as is.
    Direct,
    /// Use reciprocal of the reference rate.
    Inverse,
}



/// Pricing strategy for one ordered token pair.
///
/// `pair` - reference rate this route needs.
/// `rate_decimals` - decimal places of the displayed rate.
#[derive(Debug, Clone, Copy)]
struct Route {
    source: TokenSymbol,
    destination: TokenSymbol,
    pair: Pair,
    direction: Direction,
    rate_decimals: usize,
}



const ROUTES: [Route; 2] = [
    Route {
        source: TokenSymbol::PYUSDC,
        destination: TokenSymbol::SINR,
        pair: USD_INR,
        direction: Direction::Direct,
        rate_decimals: 2,
    },
    Route {
        source: TokenSymbol::SINR,
        destination: TokenSymbol::PYUSDC,
        pair: USD_INR,
        direction: Direction::Inverse,
        rate_decimals: 6,
    },
];



fn route_for(source: &str, destination: &str) -> Option<&'static Route> {
    let source: TokenSymbol = source.parse().ok()?;
    let destination: TokenSymbol = destination.parse().ok()?;

    ROUTES.iter()
        .find(|r| r.source == source && r.destination == destination)
}



/// Multiply by 10^exp, dividing for negative exponents so that exact powers of
/// ten stay exact.
fn scale_pow10(value: f64, exp: i32) -> f64 {
    if exp >= 0 {
        value * 10f64.powi(exp)
    }
    else {
        value / 10f64.powi(-exp)
    }
}



/// Estimate swap output for `input_amount` of `source` token into
/// `destination` token.
///
/// Input is first put on the source token base unit grid, converted into
/// destination base units with the route's effective rate and then scaled
/// back into a human readable destination amount.
///
/// Amounts that can not be put on the grid, or whose output does not fit
/// into f64, are reported as `InvalidAmount` too.
pub fn compute_quote(input_amount: &str, source: &str, destination: &str,
    reference_rate: Option<&ExchangeRate>
)
    -> QuoteResult
{
    if token::parse_amount(input_amount).is_none() {
        return QuoteResult::failed(QuoteError::InvalidAmount)
    }

    let Some(route) = route_for(source, destination) else {
        return QuoteResult::failed(QuoteError::UnsupportedPair {
            from: source.to_string(),
            to: destination.to_string(),
        })
    };

    // A rate for some other pair is as good as no rate.
    let rate = reference_rate
        .filter(|r| r.pair == route.pair)
        .and_then(ExchangeRate::usable);

    let Some(rate) = rate else {
        return QuoteResult::failed(QuoteError::RateUnavailable)
    };

    let rate = match route.direction {
        Direction::Direct => rate,
        Direction::Inverse => 1.0 / rate,
    };

    let src = route.source.descriptor();
    let dst = route.destination.descriptor();

    // Amounts beyond u128 base units are out of range for pricing.
    let base_in = token::to_base_units(input_amount, src.decimals)
        .ok()
        .and_then(|units| u128::try_from(units).ok());

    let Some(base_in) = base_in else {
        return QuoteResult::failed(QuoteError::InvalidAmount)
    };

    let src_exp = i32::from(src.decimals);
    let dst_exp = i32::from(dst.decimals);

    let base_out = scale_pow10(base_in as f64 * rate, dst_exp - src_exp);
    let output = scale_pow10(base_out, -dst_exp);

    if !output.is_finite() {
        return QuoteResult::failed(QuoteError::InvalidAmount)
    }

    QuoteResult {
        output_amount: format!("{:.*}", dst.display_decimals, output),
        display_rate: format!("{:.*}", route.rate_decimals, rate),
        error: None,
    }
}



#[cfg(test)]
mod test {
    use super::*;
    use crate::exchange_rate::USD_EUR;

    fn usd_inr(price: i64) -> ExchangeRate {
        // expo -5, i.e. 8325000 is 83.25
        ExchangeRate::new(USD_INR, price, -5, 0, 1_700_000_000)
    }

    fn output(q: &QuoteResult) -> f64 {
        q.output_amount.parse().unwrap()
    }

    #[test]
    fn test_forward_quote() {
        let rate = usd_inr(8325000);
        let q = compute_quote("100", "PYUSDC", "sINR", Some(&rate));

        assert_eq!(q.error, None);
        assert_eq!(q.output_amount, "8325.00000");
        assert_eq!(q.display_rate, "83.25");
    }

    #[test]
    fn test_reverse_quote() {
        let rate = usd_inr(8325000);
        let q = compute_quote("1000", "sINR", "PYUSDC", Some(&rate));

        assert_eq!(q.error, None);
        // 1000 / 83.25 = 12.012012...
        assert_eq!(q.output_amount, "12.012012");
        assert_eq!(q.display_rate, "0.012012");
    }

    #[test]
    fn test_forward_output_is_product() {
        let rates = [8325000, 8299999, 100000, 9000000000];
        let amounts = ["0.5", "1", "12.345678", "2500", "999999"];

        for price in rates {
            let rate = usd_inr(price);
            for amount in amounts {
                let q = compute_quote(amount, "PYUSDC", "SINR", Some(&rate));
                let expected = amount.parse::<f64>().unwrap() * rate.value();
                let got = output(&q);

                assert!((got - expected).abs() <= 0.5e-5 + expected * 1e-12,
                    "{} @ {}: got {}, expected {}", amount, price, got, expected
                );
            }
        }
    }

    #[test]
    fn test_round_trip_recovers_input() {
        for price in [8325000, 8412345, 150000] {
            let rate = usd_inr(price);

            for amount in ["1", "250", "42.5", "10000"] {
                let fwd = compute_quote(amount, "PYUSDC", "SINR", Some(&rate));
                let back = compute_quote(&fwd.output_amount, "SINR", "PYUSDC",
                    Some(&rate)
                );

                let x: f64 = amount.parse().unwrap();
                // Forward output is rounded to 5 places, the error grows by
                // 1/rate on the way back, plus 6 place output rounding.
                let tol = 0.5e-5 / rate.value() + 0.5e-6 + 1e-9;
                assert!((output(&back) - x).abs() <= tol,
                    "{} @ {}: came back as {}", amount, price, back.output_amount
                );
            }
        }
    }

    #[test]
    fn test_input_is_put_on_source_grid() {
        let rate = usd_inr(100000);
        // sINR has 5 decimals, 6th place can not exist on chain.
        let q = compute_quote("1.000004", "SINR", "PYUSDC", Some(&rate));
        assert_eq!(q.output_amount, "1.000000");

        let q = compute_quote("1.000006", "SINR", "PYUSDC", Some(&rate));
        assert_eq!(q.output_amount, "1.000010");
    }

    #[test]
    fn test_invalid_amounts() {
        let rate = usd_inr(8325000);

        for amount in ["0", "-5", "abc", "", "NaN", "inf", "1e400"] {
            let q = compute_quote(amount, "PYUSDC", "SINR", Some(&rate));

            assert_eq!(q.output_amount, "0", "{}", amount);
            assert_eq!(q.display_rate, "0", "{}", amount);
            assert_eq!(q.error, Some(QuoteError::InvalidAmount), "{}", amount);
        }
    }

    #[test]
    fn test_scientific_and_signed_amounts() {
        let rate = usd_inr(8325000);

        let q = compute_quote("1e3", "PYUSDC", "SINR", Some(&rate));
        assert_eq!(q.output_amount, "83250.00000");

        let q = compute_quote("+5", "PYUSDC", "SINR", Some(&rate));
        assert_eq!(q.output_amount, "416.25000");
    }

    #[test]
    fn test_amount_out_of_range() {
        let rate = usd_inr(8325000);

        // 10^36 base units still fit.
        let q = compute_quote("1e30", "PYUSDC", "SINR", Some(&rate));
        assert_eq!(q.error, None);

        for amount in ["1e33", "1e302"] {
            let q = compute_quote(amount, "PYUSDC", "SINR", Some(&rate));
            assert_eq!(q.output_amount, "0", "{}", amount);
            assert_eq!(q.error, Some(QuoteError::InvalidAmount), "{}", amount);
        }
    }

    #[test]
    fn test_invalid_amount_wins_over_unsupported_pair() {
        let q = compute_quote("0", "ETH", "PYUSDC", None);
        assert_eq!(q.error, Some(QuoteError::InvalidAmount));
    }

    #[test]
    fn test_rate_not_available() {
        let q = compute_quote("100", "PYUSDC", "SINR", None);
        assert_eq!(q.error, Some(QuoteError::RateUnavailable));
        assert_eq!(q.output_amount, "0");
        assert_eq!(q.display_rate, "0");

        let q = compute_quote("100", "SINR", "PYUSDC", None);
        assert_eq!(q.error, Some(QuoteError::RateUnavailable));
    }

    #[test]
    fn test_zero_or_foreign_rate_is_not_available() {
        let zero = usd_inr(0);
        let q = compute_quote("100", "PYUSDC", "SINR", Some(&zero));
        assert_eq!(q.error, Some(QuoteError::RateUnavailable));

        let eur = ExchangeRate::new(USD_EUR, 92000, -5, 0, 0);
        let q = compute_quote("100", "PYUSDC", "SINR", Some(&eur));
        assert_eq!(q.error, Some(QuoteError::RateUnavailable));
    }

    #[test]
    fn test_unsupported_pairs() {
        let rate = usd_inr(8325000);

        let pairs = [
            ("ETH", "PYUSDC"),
            ("PYUSDC", "ETH"),
            ("SINR", "ETH"),
            ("PYUSDC", "PYUSDC"),
            ("BTC", "SINR"),
        ];

        for (from, to) in pairs {
            for r in [Some(&rate), None] {
                let q = compute_quote("10", from, to, r);

                assert_eq!(q.output_amount, "0");
                assert_eq!(q.display_rate, "0");
                assert_eq!(q.error, Some(QuoteError::UnsupportedPair {
                    from: from.to_string(),
                    to: to.to_string(),
                }));
            }
        }
    }

    #[test]
    fn test_same_inputs_same_output() {
        let rate = usd_inr(8331234);
        let a = compute_quote("77.7", "PYUSDC", "SINR", Some(&rate));
        let b = compute_quote("77.7", "PYUSDC", "SINR", Some(&rate));
        assert_eq!(a, b);
    }
}
