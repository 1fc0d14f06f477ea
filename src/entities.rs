//! Concrete entity types for the customer, supplier and location pickers.
//!
//! All three deserialize straight from the JSON returned by the backend.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::core::{Entity, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomerType {
    Individual,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlacklistStatus {
    #[default]
    Clear,
    Blacklisted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub customer_type: CustomerType,
    pub tier: Tier,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub blacklist_status: BlacklistStatus,
    #[serde(default)]
    pub credit_limit: Option<f64>,
    #[serde(default)]
    pub lifetime_value: Option<f64>,
    /// ISO-8601 date of the last transaction, if any.
    #[serde(default)]
    pub last_transaction_date: Option<String>,
}

impl Entity for Customer {
    const RECENT_KEY: &'static str = "recentCustomers";

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "id" => Some(Cow::Borrowed(&self.id)),
            "name" => Some(Cow::Borrowed(&self.name)),
            "code" => Some(Cow::Borrowed(&self.code)),
            "type" => Some(Cow::Borrowed(match self.customer_type {
                CustomerType::Individual => "INDIVIDUAL",
                CustomerType::Business => "BUSINESS",
            })),
            "tier" => Some(Cow::Borrowed(self.tier.label())),
            "last_transaction_date" => self.last_transaction_date.as_deref().map(Cow::Borrowed),
            "credit_limit" => self.credit_limit.map(|v| Cow::Owned(format!("{v:.2}"))),
            _ => None,
        }
    }

    fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    fn is_blacklisted(&self) -> bool {
        self.blacklist_status == BlacklistStatus::Blacklisted
    }

    fn tier(&self) -> Option<Tier> {
        Some(self.tier)
    }

    fn has_transaction_history(&self) -> bool {
        self.last_transaction_date
            .as_deref()
            .is_some_and(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub supplier_type: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Entity for Supplier {
    const RECENT_KEY: &'static str = "recentSuppliers";

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "id" => Some(self.id.as_str()),
            "name" => Some(self.name.as_str()),
            "code" => Some(self.code.as_str()),
            "supplier_type" => self.supplier_type.as_deref(),
            "contact_person" => self.contact_person.as_deref(),
            "email" => self.email.as_deref(),
            _ => None,
        };
        value.map(Cow::Borrowed)
    }

    fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Warehouse,
    Store,
    ServiceCenter,
    Other,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Warehouse => "WAREHOUSE",
            LocationType::Store => "STORE",
            LocationType::ServiceCenter => "SERVICE_CENTER",
            LocationType::Other => "OTHER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LocationType::Warehouse => "Warehouse",
            LocationType::Store => "Store",
            LocationType::ServiceCenter => "Service Center",
            LocationType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub location_code: String,
    pub location_name: String,
    pub location_type: LocationType,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Entity for Location {
    const RECENT_KEY: &'static str = "recentLocations";

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.location_name
    }

    // Accepts both the short names used in picker config and the wire names.
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "id" => Some(self.id.as_str()),
            "name" | "location_name" => Some(self.location_name.as_str()),
            "code" | "location_code" => Some(self.location_code.as_str()),
            "type" | "location_type" => Some(self.location_type.as_str()),
            "city" => self.city.as_deref(),
            "state" => self.state.as_deref(),
            _ => None,
        };
        value.map(Cow::Borrowed)
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}
