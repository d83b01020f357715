//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers map to `BIGSERIAL` columns, so they wrap `i64` rather than a
//! generated UUID.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! impl_i64_newtype {
    ($t:ident, $name:literal) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(i64);

        impl $t {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id = s
                    .parse::<i64>()
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))?;
                Ok(Self(id))
            }
        }
    };
}

impl_i64_newtype!(UserId, "UserId");
impl_i64_newtype!(ProductId, "ProductId");
impl_i64_newtype!(CustomerId, "CustomerId");
impl_i64_newtype!(SupplierId, "SupplierId");
impl_i64_newtype!(ProductionId, "ProductionId");
impl_i64_newtype!(SaleId, "SaleId");
impl_i64_newtype!(ExpenseId, "ExpenseId");
impl_i64_newtype!(BatchId, "BatchId");
impl_i64_newtype!(WithdrawalId, "WithdrawalId");
