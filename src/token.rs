//! Supported tokens and their fixed decimal-scaling exponents.
//!
//! Exponents are pinned per symbol for the lifetime of the process. They are
//! never read from the token contracts at runtime.



use std::{
    fmt,
    str::FromStr,
};

use alloy::primitives::{
    address,
    utils::{
        format_units,
        parse_units,
    },
    Address,
    U256,
};

use crate::error::{
    Error,
    Result,
};



#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSymbol {
    /// USD-pegged stable-value token, the AMM's collateral.
    PYUSDC,
    /// INR-pegged synthetic token.
    SINR,
    ETH,
}



impl FromStr for TokenSymbol {
    type Err = Error;

    /// Symbols are matched case-insensitively, so `sINR` and `SINR` are the
    /// same token.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PYUSDC" => Ok(Self::PYUSDC),
            "SINR" => Ok(Self::SINR),
            "ETH" => Ok(Self::ETH),
            _ => Err(Error::UnknownToken(s.to_string())),
        }
    }
}



impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PYUSDC => "PYUSDC",
            Self::SINR => "sINR",
            Self::ETH => "ETH",
        };

        f.write_str(s)
    }
}



/// Static description of a supported token.
///
/// `decimals` - base unit exponent, human amount `x` is `x * 10^decimals`
/// base units.
/// `display_decimals` - number of decimal places used when an amount of this
/// token is shown to the user.
/// `address` - token contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub symbol: TokenSymbol,
    pub decimals: u8,
    pub display_decimals: usize,
    pub address: Address,
}



const TOKENS: [TokenDescriptor; 3] = [
    TokenDescriptor {
        symbol: TokenSymbol::PYUSDC,
        decimals: 6,
        display_decimals: 6,
        address: address!("0xCaC524BcA292aaade2DF8A05cC58F0a65B1B3bB9"),
    },
    TokenDescriptor {
        symbol: TokenSymbol::SINR,
        decimals: 5,
        display_decimals: 5,
        address: address!("0x814ebF49951162795526126553BEbd3C52cd942A"),
    },
    TokenDescriptor {
        symbol: TokenSymbol::ETH,
        decimals: 18,
        display_decimals: 6,
        address: Address::ZERO,
    },
];



impl TokenSymbol {
    pub fn descriptor(self) -> &'static TokenDescriptor {
        // Table is indexed in declaration order of the enum.
        match self {
            Self::PYUSDC => &TOKENS[0],
            Self::SINR => &TOKENS[1],
            Self::ETH => &TOKENS[2],
        }
    }
}



/// Look up token descriptor by user supplied symbol.
pub fn descriptor(symbol: &str) -> Result<&'static TokenDescriptor> {
    let symbol: TokenSymbol = symbol.parse()?;
    Ok(symbol.descriptor())
}



/// Human readable amount as a number, if it is a valid swap input.
///
/// Plain decimals and scientific notation are both accepted. Only finite
/// amounts greater than zero are valid.
pub fn parse_amount(amount: &str) -> Option<f64> {
    match amount.trim().parse::<f64>() {
        Ok(val) if val.is_finite() && val > 0.0 => Some(val),
        _ => None,
    }
}



/// Put human readable amount on the base unit grid of a token with
/// `decimals`, rounding half up to the nearest base unit.
///
/// This is the only amount to base units conversion, both reference-rate
/// pricing and on-chain quoting go through it. Amounts that do not fit into
/// uint256 base units are invalid.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let invalid = |reason: String| Error::InvalidAmount(
        format!("{:?}: {}", amount.trim(), reason)
    );

    let value = parse_amount(amount)
        .ok_or_else(|| invalid("not a positive number".to_string()))?;

    // Display of f64 is the shortest decimal that reads back as the same
    // value, and it never uses exponent notation.
    let plain = value.to_string();
    let (int, frac) = plain.split_once('.').unwrap_or((plain.as_str(), ""));

    let places = usize::from(decimals);
    let kept = &frac[..frac.len().min(places)];
    let round_up = frac.as_bytes().get(places).is_some_and(|d| *d >= b'5');

    let grid = if kept.is_empty() {
        int.to_string()
    }
    else {
        format!("{}.{}", int, kept)
    };

    let units: U256 = parse_units(&grid, decimals)
        .map_err(|e| invalid(e.to_string()))?
        .into();

    if !round_up {
        return Ok(units)
    }

    units.checked_add(U256::from(1))
        .ok_or_else(|| invalid("exceeds uint256".to_string()))
}



/// Human readable value of `units` base units of a token with `decimals`.
pub fn from_base_units(units: U256, decimals: u8) -> Result<f64> {
    let s = format_units(units, decimals)?;
    s.parse().map_err(|_| Error::InvalidAmount(s))
}



/// Format amount with the fixed display precision of the given token.
///
/// Unknown symbols fall back to 4 decimal places, unparsable amounts are
/// shown as zero.
pub fn format_token_amount(amount: &str, symbol: &str) -> String {
    let value: f64 = amount.trim().parse().unwrap_or(0.0);
    let places = match descriptor(symbol) {
        Ok(token) => token.display_decimals,
        Err(..) => 4,
    };

    format!("{:.*}", places, value)
}
