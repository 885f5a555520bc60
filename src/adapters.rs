//! Conversions between platform wire values and record fields.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ProviderError;
use crate::field::Field;
use crate::platform::{AttributeValue, LocalizedString, Money, TypedMoney};

/// Project an optional localized wire value. An empty map stays known.
pub fn localized_field(value: Option<&LocalizedString>) -> Field<LocalizedString> {
    Field::from_option(value.cloned())
}

/// The localized value to send for a planned field; null and unknown send nothing.
pub fn localized_value(field: &Field<LocalizedString>) -> Option<LocalizedString> {
    field.as_known().cloned()
}

/// Convert platform money into draft money.
///
/// Only cent-precision money is supported. Any other variant is a contract
/// violation between this provider and the platform.
pub fn money_from_typed(value: &TypedMoney) -> Result<Money, ProviderError> {
    match value {
        TypedMoney::CentPrecision {
            cent_amount,
            currency_code,
            ..
        } => Ok(Money {
            cent_amount: *cent_amount,
            currency_code: currency_code.clone(),
        }),
        other => Err(ProviderError::Internal(format!(
            "unsupported money type '{}', only centPrecision is supported",
            other.kind()
        ))),
    }
}

/// The four record slots of an attribute value, in outward priority order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeSlots {
    /// Boolean slot.
    pub bool_value: Field<bool>,
    /// Plain text slot.
    pub text_value: Field<String>,
    /// Localized text slot.
    pub localized_text_value: Field<LocalizedString>,
    /// Product type reference slot (the product type id).
    pub product_type_reference_value: Field<String>,
}

impl AttributeSlots {
    /// Spread a wire value into slots.
    ///
    /// Unrecognized shapes leave every slot null.
    pub fn from_value(name: &str, value: &AttributeValue) -> Self {
        let mut slots = Self::default();
        match value {
            AttributeValue::Bool(b) => slots.bool_value = Field::Known(*b),
            AttributeValue::Text(s) => slots.text_value = Field::Known(s.clone()),
            AttributeValue::LocalizedText(map) => {
                slots.localized_text_value = Field::Known(map.clone())
            },
            AttributeValue::ProductTypeReference(id) => {
                slots.product_type_reference_value = Field::Known(id.clone())
            },
            AttributeValue::Unrecognized(raw) => {
                warn!(attribute = %name, value = %raw, "Unsupported attribute value shape, leaving it unset");
            },
        }
        slots
    }

    /// The first slot that is not null, in priority order. An unknown slot
    /// resolves to [`Field::Unknown`].
    pub fn resolve(&self) -> Field<AttributeValue> {
        [
            self.bool_value.as_ref().map(|b| AttributeValue::Bool(*b)),
            self.text_value
                .as_ref()
                .map(|s| AttributeValue::Text(s.clone())),
            self.localized_text_value
                .as_ref()
                .map(|map| AttributeValue::LocalizedText(map.clone())),
            self.product_type_reference_value
                .as_ref()
                .map(|id| AttributeValue::ProductTypeReference(id.clone())),
        ]
        .into_iter()
        .find(|slot| !slot.is_null())
        .unwrap_or(Field::Null)
    }

    /// The value of the first populated slot, if it is known.
    pub fn value(&self) -> Option<AttributeValue> {
        self.resolve().into_option()
    }

    /// How many slots are set. Unknown slots count as set.
    pub fn populated(&self) -> usize {
        [
            !self.bool_value.is_null(),
            !self.text_value.is_null(),
            !self.localized_text_value.is_null(),
            !self.product_type_reference_value.is_null(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// Format an instant the way records store it: RFC 3339, seconds, `Z`.
pub fn format_date_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Project an optional wire instant.
pub fn date_time_field(value: Option<&DateTime<Utc>>) -> Field<String> {
    Field::from_option(value.map(format_date_time))
}

/// Parse a record timestamp.
pub fn parse_date_time(value: &str) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            ProviderError::Validation(format!("'{}' is not an RFC 3339 timestamp: {}", value, e))
        })
}

/// Parse an optional record timestamp; null and unknown parse to `None`.
pub fn parse_date_time_field(
    field: &Field<String>,
) -> Result<Option<DateTime<Utc>>, ProviderError> {
    field.as_known().map(|s| parse_date_time(s)).transpose()
}
