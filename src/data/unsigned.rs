//! Unsigned counter newtype for non-negative database fields.
//!
//! PostgreSQL has no unsigned integer types, so profile counters are stored
//! as `INTEGER` and converted at the Rust boundary. A negative value in the
//! database is a bug and fails decoding loudly rather than wrapping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-negative count (posts, photos, likes, followers, ...).
///
/// Maps to `INTEGER` in Postgres; encoding a value above `i32::MAX` is an
/// error, decoding a negative column value is an error.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Count(u32);

impl Count {
    pub fn new(val: u32) -> Self {
        Self(val)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Clamp a possibly-negative raw value to a valid count.
    ///
    /// Used when normalizing external responses, where a negative or absurdly
    /// large counter is treated as 0 rather than rejected.
    pub fn saturating_from(raw: i64) -> Self {
        Self(u32::try_from(raw).unwrap_or(0))
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for Count {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<Count> for u32 {
    fn from(val: Count) -> Self {
        val.0
    }
}

impl TryFrom<i32> for Count {
    type Error = std::num::TryFromIntError;
    fn try_from(val: i32) -> Result<Self, Self::Error> {
        u32::try_from(val).map(Self)
    }
}

impl TryFrom<i64> for Count {
    type Error = std::num::TryFromIntError;
    fn try_from(val: i64) -> Result<Self, Self::Error> {
        u32::try_from(val).map(Self)
    }
}

impl sqlx::Type<sqlx::Postgres> for Count {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for Count {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let v = i32::try_from(self.0).map_err(|_| format!("Count value {} overflows i32", self.0))?;
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&v, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Count {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| format!("negative i32 {raw} cannot decode as Count").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_and_conversions() {
        let c = Count::new(42);
        assert_eq!(c.get(), 42);
        assert_eq!(u32::from(c), 42);

        let c2: Count = 10u32.into();
        assert_eq!(c2.get(), 10);
    }

    #[test]
    fn try_from_signed_rejects_negative() {
        assert_eq!(Count::try_from(0i32).unwrap().get(), 0);
        assert!(Count::try_from(-1i32).is_err());
        assert!(Count::try_from(-1i64).is_err());
        assert!(Count::try_from(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn saturating_from_clamps() {
        assert_eq!(Count::saturating_from(-5).get(), 0);
        assert_eq!(Count::saturating_from(0).get(), 0);
        assert_eq!(Count::saturating_from(250_000).get(), 250_000);
        assert_eq!(Count::saturating_from(i64::from(u32::MAX) + 1).get(), 0);
    }

    #[test]
    fn serde_transparent() {
        let c = Count::new(42);
        assert_eq!(serde_json::to_string(&c).unwrap(), "42");

        let deserialized: Count = serde_json::from_str("42").unwrap();
        assert_eq!(deserialized.get(), 42);
    }

    #[test]
    fn encode_overflow_is_an_error() {
        // u32::MAX exceeds i32::MAX
        let c = Count::new(u32::MAX);
        let mut buf = sqlx::postgres::PgArgumentBuffer::default();
        let result = sqlx::Encode::<sqlx::Postgres>::encode_by_ref(&c, &mut buf);
        assert!(result.is_err());
    }
}
