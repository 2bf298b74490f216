use crate::error::CrmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// Non-negative money amount held in fen (1/100 yuan).
///
/// Stored on disk as the plain decimal string the user typed, normalized
/// (`"1000000"`, `"2500.5"` becomes `"2500.50"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_yuan(yuan: u64) -> Self {
        Amount(yuan * 100)
    }

    pub fn fen(self) -> u64 {
        self.0
    }

    /// `¥1,000,000` style rendering for tables and reports.
    pub fn grouped(self) -> String {
        let yuan = (self.0 / 100).to_string();
        let mut out = String::with_capacity(yuan.len() + yuan.len() / 3 + 4);
        for (i, ch) in yuan.chars().enumerate() {
            if i > 0 && (yuan.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        let fen = self.0 % 100;
        if fen == 0 {
            format!("¥{out}")
        } else {
            format!("¥{out}.{fen:02}")
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fen = self.0 % 100;
        if fen == 0 {
            write!(f, "{}", self.0 / 100)
        } else {
            write!(f, "{}.{:02}", self.0 / 100, fen)
        }
    }
}

impl FromStr for Amount {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || CrmError::InvalidAmount(raw.to_string());

        let (whole, frac) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if raw.ends_with('.') {
            return Err(invalid());
        }

        let yuan: u64 = whole.parse().map_err(|_| invalid())?;
        let fen: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        yuan.checked_mul(100)
            .and_then(|v| v.checked_add(fen))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for Amount {
    type Error = CrmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}
