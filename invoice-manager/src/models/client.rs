//! Client address book model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::non_empty;

/// Address-book entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub pan_number: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for adding a client.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewClient {
    #[validate(length(min = 1, message = "Client name is required"))]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub pan_number: Option<String>,
}

impl NewClient {
    /// Trim the name and turn blank optional fields into `None`.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: non_empty(self.email),
            phone: non_empty(self.phone),
            address: non_empty(self.address),
            tax_number: non_empty(self.tax_number),
            pan_number: non_empty(self.pan_number),
        }
    }
}
