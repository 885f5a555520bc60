//! Wire types of the commerce platform's product API.
//!
//! These mirror the platform JSON (camelCase) and are what a [`ProductClient`]
//! sends and receives. Records in [`crate::model`] are projected from and into
//! these types.
//!
//! [`ProductClient`]: crate::client::ProductClient

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A map of locale to text, e.g. `{"en": "Shoe", "de": "Schuh"}`.
pub type LocalizedString = BTreeMap<String, String>;

/// Reference type id of product types.
pub const PRODUCT_TYPE_TYPE_ID: &str = "product-type";

/// Reference type id of tax categories.
pub const TAX_CATEGORY_TYPE_ID: &str = "tax-category";

/// Reference type id of categories.
pub const CATEGORY_TYPE_ID: &str = "category";

/// How prices of a product are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PriceMode {
    /// Prices are embedded in the product variants.
    #[default]
    Embedded,
    /// Prices are standalone resources.
    Standalone,
}

/// A typed reference returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// The referenced resource type, e.g. `product-type`.
    #[serde(rename = "typeId")]
    pub type_id: String,
    /// The referenced resource id.
    pub id: String,
}

impl Reference {
    /// Create a reference.
    pub fn new(type_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            id: id.into(),
        }
    }
}

/// A resource identifier sent to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// The referenced resource type.
    #[serde(rename = "typeId", skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    /// The referenced resource id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The referenced resource key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ResourceIdentifier {
    /// Identify a resource of `type_id` by its id.
    pub fn by_id(type_id: &str, id: impl Into<String>) -> Self {
        Self {
            type_id: Some(type_id.to_string()),
            id: Some(id.into()),
            key: None,
        }
    }
}

// =========================================================================
// Money
// =========================================================================

/// Money as sent in drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Amount in the smallest indivisible unit of the currency.
    pub cent_amount: i64,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

/// Money as returned by the platform, tagged by its precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TypedMoney {
    /// Money with the currency's default number of fraction digits.
    #[serde(rename = "centPrecision", rename_all = "camelCase")]
    CentPrecision {
        /// Amount in cents.
        cent_amount: i64,
        /// ISO 4217 currency code.
        currency_code: String,
        /// Number of fraction digits of the currency.
        fraction_digits: u32,
    },
    /// Money with more fraction digits than the currency defines.
    #[serde(rename = "highPrecision", rename_all = "camelCase")]
    HighPrecision {
        /// Amount rounded to cents.
        cent_amount: i64,
        /// ISO 4217 currency code.
        currency_code: String,
        /// Number of fraction digits of `precise_amount`.
        fraction_digits: u32,
        /// The precise amount.
        precise_amount: i64,
    },
    /// A money type this provider does not know.
    #[serde(other)]
    Unrecognized,
}

impl TypedMoney {
    /// Cent-precision money with two fraction digits.
    pub fn cents(cent_amount: i64, currency_code: impl Into<String>) -> Self {
        Self::CentPrecision {
            cent_amount,
            currency_code: currency_code.into(),
            fraction_digits: 2,
        }
    }

    /// The wire tag of this variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CentPrecision { .. } => "centPrecision",
            Self::HighPrecision { .. } => "highPrecision",
            Self::Unrecognized => "unrecognized",
        }
    }
}

// =========================================================================
// Attribute values
// =========================================================================

/// The value of a product variant attribute.
///
/// Attribute values are dynamic JSON on the wire; decoding inspects the shape
/// and keeps anything it cannot classify in [`AttributeValue::Unrecognized`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A boolean attribute.
    Bool(bool),
    /// A plain text attribute.
    Text(String),
    /// A localized text attribute.
    LocalizedText(LocalizedString),
    /// A reference to a product type, by id.
    ProductTypeReference(String),
    /// Any other shape (numbers, sets, money, other references, ...).
    Unrecognized(Value),
}

impl AttributeValue {
    /// Classify a dynamic wire value.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(b),
            Value::String(s) => Self::Text(s),
            Value::Object(ref map) if map.contains_key("typeId") => {
                let type_id = map.get("typeId").and_then(Value::as_str);
                let id = map.get("id").and_then(Value::as_str);
                match (type_id, id) {
                    (Some(PRODUCT_TYPE_TYPE_ID), Some(id)) => {
                        Self::ProductTypeReference(id.to_string())
                    },
                    _ => Self::Unrecognized(value),
                }
            },
            Value::Object(ref map) if map.values().all(Value::is_string) => Self::LocalizedText(
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect(),
            ),
            other => Self::Unrecognized(other),
        }
    }

    /// The wire JSON for this value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Text(s) => Value::String(s.clone()),
            Self::LocalizedText(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            Self::ProductTypeReference(id) => serde_json::json!({
                "typeId": PRODUCT_TYPE_TYPE_ID,
                "id": id,
            }),
            Self::Unrecognized(value) => value.clone(),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

/// A named attribute of a product variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name as defined by the product type.
    pub name: String,
    /// Attribute value.
    pub value: AttributeValue,
}

// =========================================================================
// Product
// =========================================================================

/// A price of a product variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Platform-assigned id.
    pub id: String,
    /// User-defined key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Money value.
    pub value: TypedMoney,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Start of the validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

/// A product variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Sequential id within the product.
    pub id: i64,
    /// User-defined key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Stock keeping unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Embedded prices.
    #[serde(default)]
    pub prices: Vec<Price>,
    /// Attributes.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// One projection (current or staged) of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    /// Product name.
    pub name: LocalizedString,
    /// Assigned categories.
    #[serde(default)]
    pub categories: Vec<Reference>,
    /// Product description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    /// URL slug.
    pub slug: LocalizedString,
    /// Search engine title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<LocalizedString>,
    /// Search engine description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<LocalizedString>,
    /// Search engine keywords.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<LocalizedString>,
    /// The master variant.
    pub master_variant: ProductVariant,
    /// Additional variants.
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

/// The current and staged projections of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCatalogData {
    /// Whether the product is published.
    pub published: bool,
    /// Whether staged differs from current.
    pub has_staged_changes: bool,
    /// Published data.
    pub current: ProductData,
    /// Work-in-progress data.
    pub staged: ProductData,
}

/// A product as returned by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Platform-assigned id.
    pub id: String,
    /// Optimistic concurrency version.
    pub version: i64,
    /// User-defined key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// The product type.
    pub product_type: Reference,
    /// The tax category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_category: Option<Reference>,
    /// Price lookup mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_mode: Option<PriceMode>,
    /// Catalog data.
    pub master_data: ProductCatalogData,
}

// =========================================================================
// Drafts
// =========================================================================

/// A price to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDraft {
    /// User-defined key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Money value.
    pub value: Money,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Start of the validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

/// A variant to create together with a product.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductVariantDraft {
    /// Stock keeping unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// User-defined key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Embedded prices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<PriceDraft>,
    /// Attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

/// The payload of a product create call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    /// The product type.
    pub product_type: ResourceIdentifier,
    /// Product name.
    pub name: LocalizedString,
    /// URL slug.
    pub slug: LocalizedString,
    /// User-defined key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Product description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedString>,
    /// Assigned categories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<ResourceIdentifier>,
    /// Search engine title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<LocalizedString>,
    /// Search engine description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<LocalizedString>,
    /// Search engine keywords.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<LocalizedString>,
    /// The master variant.
    pub master_variant: ProductVariantDraft,
    /// Additional variants.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<ProductVariantDraft>,
    /// The tax category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_category: Option<ResourceIdentifier>,
    /// Publish the product right away.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<bool>,
    /// Price lookup mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_mode: Option<PriceMode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_value_classification() {
        assert_eq!(
            AttributeValue::from_json(json!(true)),
            AttributeValue::Bool(true)
        );
        assert_eq!(
            AttributeValue::from_json(json!("red")),
            AttributeValue::Text("red".to_string())
        );
        assert_eq!(
            AttributeValue::from_json(json!({"en": "red", "de": "rot"})),
            AttributeValue::LocalizedText(LocalizedString::from([
                ("de".to_string(), "rot".to_string()),
                ("en".to_string(), "red".to_string()),
            ]))
        );
        assert_eq!(
            AttributeValue::from_json(json!({"typeId": "product-type", "id": "pt-1"})),
            AttributeValue::ProductTypeReference("pt-1".to_string())
        );
    }

    #[test]
    fn test_attribute_value_unrecognized_shapes() {
        for raw in [
            json!(42),
            json!(["a", "b"]),
            json!({"typeId": "category", "id": "c-1"}),
            json!({"centAmount": 100, "currencyCode": "EUR"}),
        ] {
            assert_eq!(
                AttributeValue::from_json(raw.clone()),
                AttributeValue::Unrecognized(raw)
            );
        }
    }

    #[test]
    fn test_attribute_value_wire_form() {
        let value = AttributeValue::ProductTypeReference("pt-1".to_string());
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"typeId": "product-type", "id": "pt-1"})
        );

        let attr: Attribute =
            serde_json::from_value(json!({"name": "waterproof", "value": false})).unwrap();
        assert_eq!(attr.value, AttributeValue::Bool(false));
    }

    #[test]
    fn test_typed_money_tags() {
        let money: TypedMoney = serde_json::from_value(json!({
            "type": "centPrecision",
            "centAmount": 1000,
            "currencyCode": "USD",
            "fractionDigits": 2
        }))
        .unwrap();
        assert_eq!(money, TypedMoney::cents(1000, "USD"));

        let money: TypedMoney = serde_json::from_value(json!({
            "type": "highPrecision",
            "centAmount": 1000,
            "currencyCode": "USD",
            "fractionDigits": 4,
            "preciseAmount": 100012
        }))
        .unwrap();
        assert_eq!(money.kind(), "highPrecision");

        let money: TypedMoney = serde_json::from_value(json!({
            "type": "somethingNew",
            "centAmount": 1
        }))
        .unwrap();
        assert_eq!(money, TypedMoney::Unrecognized);
    }

    #[test]
    fn test_remote_product_decoding() {
        let product: Product = serde_json::from_value(json!({
            "id": "p-1",
            "version": 3,
            "productType": {"typeId": "product-type", "id": "pt-1"},
            "masterData": {
                "published": true,
                "hasStagedChanges": false,
                "current": {
                    "name": {"en": "Shoe"},
                    "slug": {"en": "shoe"},
                    "categories": [],
                    "masterVariant": {"id": 1, "sku": "s1", "prices": [], "attributes": []},
                    "variants": []
                },
                "staged": {
                    "name": {"en": "Shoe"},
                    "slug": {"en": "shoe"},
                    "masterVariant": {"id": 1}
                }
            }
        }))
        .unwrap();

        assert_eq!(product.version, 3);
        assert!(product.tax_category.is_none());
        assert!(product.price_mode.is_none());
        assert_eq!(product.master_data.current.master_variant.sku.as_deref(), Some("s1"));
        assert!(product.master_data.staged.master_variant.prices.is_empty());
    }

    #[test]
    fn test_draft_omits_empty_parts() {
        let draft = ProductDraft {
            product_type: ResourceIdentifier::by_id(PRODUCT_TYPE_TYPE_ID, "pt-1"),
            name: LocalizedString::from([("en".to_string(), "Shoe".to_string())]),
            slug: LocalizedString::from([("en".to_string(), "shoe".to_string())]),
            key: None,
            description: None,
            categories: vec![],
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            master_variant: ProductVariantDraft::default(),
            variants: vec![],
            tax_category: None,
            publish: Some(true),
            price_mode: Some(PriceMode::Embedded),
        };

        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({
                "productType": {"typeId": "product-type", "id": "pt-1"},
                "name": {"en": "Shoe"},
                "slug": {"en": "shoe"},
                "masterVariant": {},
                "publish": true,
                "priceMode": "Embedded"
            })
        );
    }
}
