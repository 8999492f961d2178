use std::fmt;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::decimal::{from_hundredths, to_hundredths};

// ============================================================================
// Percentage
// ============================================================================

/// An ownership percentage in `[0, 100]`, held as basis points
/// (hundredths of a percent) so sums are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percentage(i64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const HUNDRED: Percentage = Percentage(10_000);

    /// Rounds to two decimals (half away from zero). `None` when outside `[0, 100]`.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let bp = to_hundredths(value)?;
        Self::from_basis_points(bp)
    }

    pub fn from_basis_points(bp: i64) -> Option<Self> {
        if (Self::ZERO.0..=Self::HUNDRED.0).contains(&bp) {
            Some(Percentage(bp))
        } else {
            None
        }
    }

    pub fn basis_points(self) -> i64 {
        self.0
    }

    pub fn as_decimal(self) -> Decimal {
        from_hundredths(self.0)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}

// Rendered as a two-decimal string, e.g. "60.00".
impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ============================================================================
// Share rows
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct Share {
    pub id: i64,
    pub user_id: i64,
    pub apartment_id: i64,
    pub percentage_bp: i64,
}

impl Share {
    pub fn percentage(&self) -> Percentage {
        Percentage(self.percentage_bp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareUser {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareApartment {
    pub id: i64,
    pub name: String,
}

/// A share expanded with the owning user and the apartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareDetails {
    pub id: i64,
    pub user: ShareUser,
    pub apartment: ShareApartment,
    pub procent: Percentage,
}

impl<'r> FromRow<'r, SqliteRow> for ShareDetails {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(ShareDetails {
            id: row.try_get("id")?,
            user: ShareUser {
                id: row.try_get("user_id")?,
                name: row.try_get("user_name")?,
                surname: row.try_get("user_surname")?,
                username: row.try_get("user_username")?,
            },
            apartment: ShareApartment {
                id: row.try_get("apartment_id")?,
                name: row.try_get("apartment_name")?,
            },
            procent: Percentage(row.try_get("percentage_bp")?),
        })
    }
}

/// One of a user's shares with the apartment summary shown on profiles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedShare {
    pub id: i64,
    pub procent: Percentage,
    pub apartment: OwnedShareApartment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedShareApartment {
    pub id: i64,
    pub name: String,
    pub price_for_clean: Decimal,
    pub picture: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for OwnedShare {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(OwnedShare {
            id: row.try_get("id")?,
            procent: Percentage(row.try_get("percentage_bp")?),
            apartment: OwnedShareApartment {
                id: row.try_get("apartment_id")?,
                name: row.try_get("apartment_name")?,
                price_for_clean: from_hundredths(row.try_get("apartment_price_for_clean_cents")?),
                picture: row.try_get("apartment_picture")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn percentage_bounds_are_inclusive() {
        assert_eq!(
            Percentage::from_decimal(Decimal::ONE_HUNDRED),
            Some(Percentage::HUNDRED)
        );
        assert_eq!(Percentage::from_decimal(Decimal::ZERO), Some(Percentage::ZERO));
        assert_eq!(Percentage::from_decimal(Decimal::from_str("100.01").unwrap()), None);
        assert_eq!(Percentage::from_decimal(Decimal::from_str("-0.01").unwrap()), None);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        let p = Percentage::from_decimal(Decimal::from_str("33.335").unwrap()).unwrap();
        assert_eq!(p.basis_points(), 3334);
        assert_eq!(p.to_string(), "33.34");
    }

    #[test]
    fn percentage_serializes_as_string() {
        let p = Percentage::from_basis_points(6000).unwrap();
        assert_eq!(serde_json::to_value(p).unwrap(), serde_json::json!("60.00"));
    }
}
