use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInfo {
    pub id: i64,
    pub user_id: i64,
    pub country: Option<String>,
    pub city: Option<String>,
    pub company_name: Option<String>,
    pub nip: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}

/// Billing fields as submitted; empty strings are normalized to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceInfoData {
    pub country: Option<String>,
    pub city: Option<String>,
    pub company_name: Option<String>,
    pub nip: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}

impl InvoiceInfoData {
    /// A profile is only worth storing when at least one field carries a value.
    pub fn has_any_value(&self) -> bool {
        [
            &self.country,
            &self.city,
            &self.company_name,
            &self.nip,
            &self.address,
            &self.email,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_profile_has_no_value() {
        let data = InvoiceInfoData {
            city: Some("   ".into()),
            ..Default::default()
        };
        assert!(!data.has_any_value());

        let data = InvoiceInfoData {
            nip: Some("1234567890".into()),
            ..Default::default()
        };
        assert!(data.has_any_value());
    }
}
