//! Company settings: the singleton profile every document is issued from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{non_empty, DocumentKind};
use crate::totals::round_money;

pub const DEFAULT_COMPANY_NAME: &str = "My Company";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_PAYMENT_TERMS: &str = "Due within 30 days";

/// Units offered before any custom unit.
pub const DEFAULT_UNITS: [&str; 4] = ["Item", "Shots", "Sec", "Minute"];

/// Singleton company profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CompanySettings {
    pub id: Uuid,
    pub company_name: String,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,
    pub tax_number: Option<String>,
    pub pan_number: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub currency: String,
    pub logo_url: Option<String>,
    pub tax_enabled: bool,
    pub tax_rate: Decimal,
    pub default_payment_terms: Option<String>,
    pub next_invoice_number: i32,
    pub next_quotation_number: i32,
    pub next_proforma_number: i32,
    pub custom_units: Vec<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl CompanySettings {
    /// Settings used when none have been stored yet.
    pub fn with_defaults(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            company_email: None,
            company_phone: None,
            company_address: None,
            tax_number: None,
            pan_number: None,
            bank_name: None,
            account_number: None,
            ifsc_code: None,
            currency: DEFAULT_CURRENCY.to_string(),
            logo_url: None,
            tax_enabled: true,
            tax_rate: Decimal::TEN,
            default_payment_terms: Some(DEFAULT_PAYMENT_TERMS.to_string()),
            next_invoice_number: 1,
            next_quotation_number: 1,
            next_proforma_number: 1,
            custom_units: Vec::new(),
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Current counter value for a document kind.
    pub fn counter_for(&self, kind: DocumentKind) -> u32 {
        let value = match kind {
            DocumentKind::Invoice => self.next_invoice_number,
            DocumentKind::Quote => self.next_quotation_number,
            DocumentKind::Proforma => self.next_proforma_number,
        };
        value.max(0) as u32
    }

    /// Default units followed by the custom ones.
    pub fn available_units(&self) -> Vec<String> {
        DEFAULT_UNITS
            .iter()
            .map(|u| u.to_string())
            .chain(self.custom_units.iter().cloned())
            .collect()
    }

    /// Apply a profile update; counters, logo and id are left alone.
    pub fn apply(&mut self, update: &SettingsUpdate) {
        self.company_name = update.company_name.clone();
        self.company_email = update.company_email.clone();
        self.company_phone = update.company_phone.clone();
        self.company_address = update.company_address.clone();
        self.tax_number = update.tax_number.clone();
        self.pan_number = update.pan_number.clone();
        self.bank_name = update.bank_name.clone();
        self.account_number = update.account_number.clone();
        self.ifsc_code = update.ifsc_code.clone();
        self.currency = update.currency.clone();
        self.tax_enabled = update.tax_enabled;
        self.tax_rate = update.tax_rate;
        self.default_payment_terms = update.default_payment_terms.clone();
        if let Some(units) = &update.custom_units {
            self.custom_units = units.clone();
        }
    }
}

/// Input for saving the settings screen.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SettingsUpdate {
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: String,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,
    pub tax_number: Option<String>,
    pub pan_number: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    pub tax_enabled: bool,
    #[validate(custom(function = "validate_tax_rate"))]
    pub tax_rate: Decimal,
    pub default_payment_terms: Option<String>,
    pub custom_units: Option<Vec<String>>,
}

impl SettingsUpdate {
    /// Trim text, uppercase the currency, and drop blank optionals and units.
    pub fn normalized(self) -> Self {
        Self {
            company_name: self.company_name.trim().to_string(),
            company_email: non_empty(self.company_email),
            company_phone: non_empty(self.company_phone),
            company_address: non_empty(self.company_address),
            tax_number: non_empty(self.tax_number),
            pan_number: non_empty(self.pan_number),
            bank_name: non_empty(self.bank_name),
            account_number: non_empty(self.account_number),
            ifsc_code: non_empty(self.ifsc_code),
            currency: self.currency.trim().to_uppercase(),
            tax_enabled: self.tax_enabled,
            tax_rate: round_money(self.tax_rate),
            default_payment_terms: non_empty(self.default_payment_terms),
            custom_units: self.custom_units.map(|units| {
                units
                    .into_iter()
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .collect()
            }),
        }
    }
}

pub(crate) fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("tax_rate_range");
        err.message = Some("Tax rate must be between 0 and 100".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CompanySettings {
        CompanySettings::with_defaults(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn counters_are_independent_per_kind() {
        let mut s = settings();
        s.next_invoice_number = 7;
        s.next_quotation_number = 3;
        s.next_proforma_number = 12;
        assert_eq!(s.counter_for(DocumentKind::Invoice), 7);
        assert_eq!(s.counter_for(DocumentKind::Quote), 3);
        assert_eq!(s.counter_for(DocumentKind::Proforma), 12);
    }

    #[test]
    fn available_units_lists_defaults_first() {
        let mut s = settings();
        s.custom_units = vec!["Hour".to_string()];
        assert_eq!(
            s.available_units(),
            vec!["Item", "Shots", "Sec", "Minute", "Hour"]
        );
    }

    #[test]
    fn tax_rate_outside_percentage_range_is_rejected() {
        assert!(validate_tax_rate(&Decimal::new(-1, 0)).is_err());
        assert!(validate_tax_rate(&Decimal::new(101, 0)).is_err());
        assert!(validate_tax_rate(&Decimal::new(185, 1)).is_ok());
    }

    #[test]
    fn normalizing_rounds_tax_rate_to_two_places() {
        let update = SettingsUpdate {
            company_name: "Acme".to_string(),
            company_email: None,
            company_phone: None,
            company_address: None,
            tax_number: None,
            pan_number: None,
            bank_name: None,
            account_number: None,
            ifsc_code: None,
            currency: "usd".to_string(),
            tax_enabled: true,
            tax_rate: Decimal::new(12345, 3),
            default_payment_terms: None,
            custom_units: None,
        }
        .normalized();
        assert_eq!(update.tax_rate, Decimal::new(1235, 2));
        assert_eq!(update.currency, "USD");
    }

    #[test]
    fn apply_keeps_counters_and_logo() {
        let mut s = settings();
        s.next_invoice_number = 42;
        s.logo_url = Some("http://localhost/logos/a.png".to_string());
        let update = SettingsUpdate {
            company_name: "Acme".to_string(),
            company_email: None,
            company_phone: None,
            company_address: None,
            tax_number: None,
            pan_number: None,
            bank_name: Some("First Bank".to_string()),
            account_number: None,
            ifsc_code: None,
            currency: "EUR".to_string(),
            tax_enabled: false,
            tax_rate: Decimal::ZERO,
            default_payment_terms: None,
            custom_units: None,
        };
        s.apply(&update);
        assert_eq!(s.company_name, "Acme");
        assert_eq!(s.next_invoice_number, 42);
        assert!(s.logo_url.is_some());
        assert!(!s.tax_enabled);
    }
}
