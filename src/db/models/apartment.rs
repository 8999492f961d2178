use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use super::decimal::from_hundredths;

#[derive(Debug, Clone, FromRow)]
pub struct Apartment {
    pub id: i64,
    pub name: String,
    pub price_for_clean_cents: i64,
    pub vat_bp: i64,
    pub can_faktura: bool,
    pub picture: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Apartment {
    pub fn price_for_clean(&self) -> Decimal {
        from_hundredths(self.price_for_clean_cents)
    }

    pub fn vat(&self) -> Decimal {
        from_hundredths(self.vat_bp)
    }
}

/// Validated apartment fields, amounts already in hundredths.
#[derive(Debug, Clone)]
pub struct ApartmentData {
    pub name: String,
    pub price_for_clean_cents: i64,
    pub vat_bp: i64,
    pub can_faktura: bool,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentView {
    pub id: i64,
    pub name: String,
    pub price_for_clean: Decimal,
    pub vat: Decimal,
    pub can_faktura: bool,
    pub picture: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<&Apartment> for ApartmentView {
    fn from(a: &Apartment) -> Self {
        ApartmentView {
            id: a.id,
            name: a.name.clone(),
            price_for_clean: a.price_for_clean(),
            vat: a.vat(),
            can_faktura: a.can_faktura,
            picture: a.picture.clone(),
            created_at: a.created_at,
        }
    }
}
