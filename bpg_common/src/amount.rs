use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "VND";

//--------------------------------------       Amount        ---------------------------------------------------------
/// A monetary amount, expressed in the minor unit of the shop currency.
///
/// Bank transfers are always non-negative, but the inner value is signed so that differences between two amounts can
/// be represented (and so that the value maps directly onto an SQLite INTEGER).
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, SubAssign, sub_assign);
op!(unary Amount, Neg, neg);

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as an amount: {0}")]
pub struct AmountConversionError(String);

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Amount {
    type Error = AmountConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(AmountConversionError(format!("Value {value} is too large to convert to an Amount")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {DEFAULT_CURRENCY_CODE}", self.0)
    }
}

impl Amount {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The absolute difference between two amounts, in minor units.
    pub fn abs_diff(&self, other: Amount) -> u64 {
        self.0.abs_diff(other.0)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}
