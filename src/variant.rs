//! Variant, price and attribute records.
//!
//! These are the leaves of the product record tree. Each record knows how to
//! project itself from the platform representation and how to build the
//! drafts the platform expects when it is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::ProductUpdateAction;
use crate::adapters::{
    date_time_field, money_from_typed, parse_date_time, parse_date_time_field, AttributeSlots,
};
use crate::error::ProviderError;
use crate::field::Field;
use crate::platform;

/// A money amount.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Money {
    /// Amount in the smallest unit of the currency.
    pub cent_amount: Field<i64>,
    /// ISO 4217 currency code.
    pub currency_code: Field<String>,
}

impl Money {
    /// Create a known money amount.
    pub fn new(cent_amount: i64, currency_code: impl Into<String>) -> Self {
        Self {
            cent_amount: Field::Known(cent_amount),
            currency_code: Field::known(currency_code),
        }
    }

    /// Whether this planned amount requires a change to `current`.
    pub fn differs_from(&self, current: &Money) -> bool {
        self.cent_amount.differs_from(&current.cent_amount)
            || self.currency_code.differs_from(&current.currency_code)
    }

    /// The wire money. Both parts must be known by the time it is sent.
    pub fn draft(&self) -> Result<platform::Money, ProviderError> {
        match (self.cent_amount.as_known(), self.currency_code.as_known()) {
            (Some(cent_amount), Some(currency_code)) => Ok(platform::Money {
                cent_amount: *cent_amount,
                currency_code: currency_code.clone(),
            }),
            _ => Err(ProviderError::Internal(
                "price value has no known cent_amount and currency_code".to_string(),
            )),
        }
    }
}

impl From<platform::Money> for Money {
    fn from(money: platform::Money) -> Self {
        Self::new(money.cent_amount, money.currency_code)
    }
}

// =========================================================================
// Price
// =========================================================================

/// An embedded price of a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Platform-assigned id.
    #[serde(default)]
    pub id: Field<String>,
    /// User-defined key.
    #[serde(default)]
    pub key: Field<String>,
    /// Money value.
    pub value: Money,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default)]
    pub country: Field<String>,
    /// RFC 3339 start of the validity window.
    #[serde(default)]
    pub valid_from: Field<String>,
    /// RFC 3339 end of the validity window.
    #[serde(default)]
    pub valid_until: Field<String>,
}

impl Price {
    /// A price with only a value; every other field is null.
    pub fn new(value: Money) -> Self {
        Self {
            id: Field::Null,
            key: Field::Null,
            value,
            country: Field::Null,
            valid_from: Field::Null,
            valid_until: Field::Null,
        }
    }

    /// Project a platform price.
    pub fn from_remote(price: &platform::Price) -> Result<Self, ProviderError> {
        Ok(Self {
            id: Field::known(price.id.clone()),
            key: Field::from_option(price.key.clone()),
            value: money_from_typed(&price.value)?.into(),
            country: Field::from_option(price.country.clone()),
            valid_from: date_time_field(price.valid_from.as_ref()),
            valid_until: date_time_field(price.valid_until.as_ref()),
        })
    }

    /// Build the draft sent in creates, `addVariant` and `setPrices`.
    pub fn draft(&self) -> Result<platform::PriceDraft, ProviderError> {
        Ok(platform::PriceDraft {
            key: self.key.as_known().cloned(),
            value: self.value.draft()?,
            country: self.country.as_known().cloned(),
            valid_from: parse_date_time_field(&self.valid_from)?,
            valid_until: parse_date_time_field(&self.valid_until)?,
        })
    }

    /// Whether this planned price requires a change to `current`.
    pub fn differs_from(&self, current: &Price) -> bool {
        self.id.differs_from(&current.id)
            || self.key.differs_from(&current.key)
            || self.value.differs_from(&current.value)
            || self.country.differs_from(&current.country)
            || timestamp_differs(&self.valid_from, &current.valid_from)
            || timestamp_differs(&self.valid_until, &current.valid_until)
    }

    /// Whether two prices share a scope: same currency, same country (or
    /// both none), and overlapping `[valid_from, valid_until)` windows.
    ///
    /// Windows that only touch do not overlap. Unparseable bounds make the
    /// prices non-conflicting; they are reported by timestamp validation.
    /// An unknown currency, country or bound never conflicts either.
    pub fn conflicts_with(&self, other: &Price) -> bool {
        let unknowns = |p: &Price| {
            [
                p.value.currency_code.is_unknown(),
                p.country.is_unknown(),
                p.valid_from.is_unknown(),
                p.valid_until.is_unknown(),
            ]
        };
        if unknowns(self).into_iter().chain(unknowns(other)).any(|unknown| unknown) {
            return false;
        }
        if self.value.currency_code != other.value.currency_code || self.country != other.country {
            return false;
        }
        match (self.window(), other.window()) {
            (Ok(a), Ok(b)) => windows_overlap(a, b),
            _ => false,
        }
    }

    fn window(&self) -> Result<Window, ProviderError> {
        Ok((
            parse_date_time_field(&self.valid_from)?,
            parse_date_time_field(&self.valid_until)?,
        ))
    }
}

type Window = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

fn windows_overlap((a_from, a_until): Window, (b_from, b_until): Window) -> bool {
    starts_before(a_from, b_until) && starts_before(b_from, a_until)
}

// Missing bounds are open-ended.
fn starts_before(from: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> bool {
    match (from, until) {
        (Some(from), Some(until)) => from < until,
        _ => true,
    }
}

/// Timestamps written with different offsets can denote the same instant.
fn timestamp_differs(planned: &Field<String>, current: &Field<String>) -> bool {
    if let (Some(p), Some(c)) = (planned.as_known(), current.as_known()) {
        if let (Ok(p), Ok(c)) = (parse_date_time(p), parse_date_time(c)) {
            return p != c;
        }
    }
    planned.differs_from(current)
}

/// Whether a planned price list requires a full replacement of `current`.
///
/// Lists are compared as ordered sequences.
pub fn prices_differ(planned: &[Price], current: &[Price]) -> bool {
    planned.len() != current.len()
        || planned
            .iter()
            .zip(current)
            .any(|(planned, current)| planned.differs_from(current))
}

// =========================================================================
// Attribute
// =========================================================================

/// A named attribute of a variant, holding exactly one value slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariantAttribute {
    /// Attribute name.
    pub name: String,
    /// Value slots.
    #[serde(flatten)]
    pub slots: AttributeSlots,
}

impl VariantAttribute {
    /// Project a platform attribute.
    pub fn from_remote(attribute: &platform::Attribute) -> Self {
        Self {
            name: attribute.name.clone(),
            slots: AttributeSlots::from_value(&attribute.name, &attribute.value),
        }
    }

    /// The resolved wire value; `None` means no value.
    pub fn value(&self) -> Option<platform::AttributeValue> {
        self.slots.value()
    }

    /// The wire attribute, or `None` when no slot is populated.
    pub fn draft(&self) -> Option<platform::Attribute> {
        self.value().map(|value| platform::Attribute {
            name: self.name.clone(),
            value,
        })
    }
}

// =========================================================================
// Variant
// =========================================================================

/// A product variant record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductVariant {
    /// Platform-assigned sequential id.
    pub id: Field<i64>,
    /// User-defined key.
    pub key: Field<String>,
    /// Stock keeping unit.
    pub sku: Field<String>,
    /// Embedded prices, in order.
    #[serde(rename = "price")]
    pub prices: Vec<Price>,
    /// Attributes.
    #[serde(rename = "attribute")]
    pub attributes: Vec<VariantAttribute>,
}

impl ProductVariant {
    /// Project a platform variant.
    pub fn from_remote(variant: &platform::ProductVariant) -> Result<Self, ProviderError> {
        Ok(Self {
            id: Field::Known(variant.id),
            key: Field::from_option(variant.key.clone()),
            sku: Field::from_option(variant.sku.clone()),
            prices: variant
                .prices
                .iter()
                .map(Price::from_remote)
                .collect::<Result<_, _>>()?,
            attributes: variant
                .attributes
                .iter()
                .map(VariantAttribute::from_remote)
                .collect(),
        })
    }

    /// Price drafts for every price, in order.
    pub fn price_drafts(&self) -> Result<Vec<platform::PriceDraft>, ProviderError> {
        self.prices.iter().map(Price::draft).collect()
    }

    /// Attribute drafts; attributes without a value are left out.
    pub fn attribute_drafts(&self) -> Vec<platform::Attribute> {
        self.attributes
            .iter()
            .filter_map(VariantAttribute::draft)
            .collect()
    }

    /// The draft used when creating the product.
    pub fn draft(&self) -> Result<platform::ProductVariantDraft, ProviderError> {
        Ok(platform::ProductVariantDraft {
            sku: self.sku.as_known().cloned(),
            key: self.key.as_known().cloned(),
            prices: self.price_drafts()?,
            attributes: self.attribute_drafts(),
        })
    }

    /// The action adding this variant to an existing product.
    pub fn add_action(&self) -> Result<ProductUpdateAction, ProviderError> {
        Ok(ProductUpdateAction::AddVariant {
            sku: self.sku.as_known().cloned(),
            key: self.key.as_known().cloned(),
            prices: self.price_drafts()?,
            attributes: self.attribute_drafts(),
            staged: false,
        })
    }

    /// The known id of a variant that exists remotely.
    pub fn require_id(&self) -> Result<i64, ProviderError> {
        self.id.as_known().copied().ok_or_else(|| {
            ProviderError::Internal(format!(
                "variant {} has no known id",
                self.sku.as_known().map(String::as_str).unwrap_or("<no sku>")
            ))
        })
    }
}
