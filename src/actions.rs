//! Product update actions.
//!
//! An update is a batch of actions submitted together with the product
//! version it was computed against. Each action serializes to the platform's
//! JSON form, tagged by `action`.

use serde::{Deserialize, Serialize};

use crate::platform::{
    Attribute, AttributeValue, LocalizedString, PriceDraft, PriceMode, ResourceIdentifier,
};

/// An update request: the expected version and the ordered actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    /// The version the actions were computed against.
    pub version: i64,
    /// The actions, applied by the platform in order.
    pub actions: Vec<ProductUpdateAction>,
}

impl ProductUpdate {
    /// Create an update batch.
    pub fn new(version: i64, actions: Vec<ProductUpdateAction>) -> Self {
        Self { version, actions }
    }
}

/// Which parts of the staged projection a publish applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishScope {
    /// Publish every staged change.
    All,
}

/// One unit of a product update batch.
///
/// Actions that accept a `staged` flag always carry `false` here, so that
/// both the current and the staged projection change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ProductUpdateAction {
    /// Set or unset the product key.
    SetKey {
        /// The new key; `None` unsets it.
        key: Option<String>,
    },
    /// Set or unset the price mode.
    SetPriceMode {
        /// The new mode; `None` unsets it.
        #[serde(rename = "priceMode")]
        price_mode: Option<PriceMode>,
    },
    /// Set or unset the tax category.
    SetTaxCategory {
        /// The new tax category; `None` unsets it.
        #[serde(rename = "taxCategory")]
        tax_category: Option<ResourceIdentifier>,
    },
    /// Change the product name.
    ChangeName {
        /// The new name.
        name: LocalizedString,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Set or unset the description.
    SetDescription {
        /// The new description.
        description: Option<LocalizedString>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Change the slug.
    ChangeSlug {
        /// The new slug.
        slug: LocalizedString,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Set or unset the meta title.
    SetMetaTitle {
        /// The new meta title.
        #[serde(rename = "metaTitle")]
        meta_title: Option<LocalizedString>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Set or unset the meta description.
    SetMetaDescription {
        /// The new meta description.
        #[serde(rename = "metaDescription")]
        meta_description: Option<LocalizedString>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Set or unset the meta keywords.
    SetMetaKeywords {
        /// The new meta keywords.
        #[serde(rename = "metaKeywords")]
        meta_keywords: Option<LocalizedString>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Assign the product to a category.
    AddToCategory {
        /// The category.
        category: ResourceIdentifier,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Remove the product from a category.
    RemoveFromCategory {
        /// The category.
        category: ResourceIdentifier,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Publish staged changes.
    Publish {
        /// What to publish.
        scope: PublishScope,
    },
    /// Unpublish the product.
    Unpublish,
    /// Set or unset a variant SKU.
    SetSku {
        /// The variant.
        #[serde(rename = "variantId")]
        variant_id: i64,
        /// The new SKU.
        sku: Option<String>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Set or unset a variant key.
    SetProductVariantKey {
        /// The variant.
        #[serde(rename = "variantId")]
        variant_id: i64,
        /// The new key.
        key: Option<String>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Replace every embedded price of a variant.
    SetPrices {
        /// The variant.
        #[serde(rename = "variantId")]
        variant_id: i64,
        /// The full new price list.
        prices: Vec<PriceDraft>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Set an attribute value; a `null` value removes the attribute.
    SetAttribute {
        /// The variant.
        #[serde(rename = "variantId")]
        variant_id: i64,
        /// Attribute name.
        name: String,
        /// The new value.
        value: Option<AttributeValue>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Add a variant.
    AddVariant {
        /// Stock keeping unit.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sku: Option<String>,
        /// User-defined key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        /// Embedded prices.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        prices: Vec<PriceDraft>,
        /// Attributes.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attributes: Vec<Attribute>,
        /// Whether only the staged projection changes.
        staged: bool,
    },
    /// Remove a variant by id.
    RemoveVariant {
        /// The variant.
        id: i64,
        /// Whether only the staged projection changes.
        staged: bool,
    },
}

impl ProductUpdateAction {
    /// The wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetKey { .. } => "setKey",
            Self::SetPriceMode { .. } => "setPriceMode",
            Self::SetTaxCategory { .. } => "setTaxCategory",
            Self::ChangeName { .. } => "changeName",
            Self::SetDescription { .. } => "setDescription",
            Self::ChangeSlug { .. } => "changeSlug",
            Self::SetMetaTitle { .. } => "setMetaTitle",
            Self::SetMetaDescription { .. } => "setMetaDescription",
            Self::SetMetaKeywords { .. } => "setMetaKeywords",
            Self::AddToCategory { .. } => "addToCategory",
            Self::RemoveFromCategory { .. } => "removeFromCategory",
            Self::Publish { .. } => "publish",
            Self::Unpublish => "unpublish",
            Self::SetSku { .. } => "setSku",
            Self::SetProductVariantKey { .. } => "setProductVariantKey",
            Self::SetPrices { .. } => "setPrices",
            Self::SetAttribute { .. } => "setAttribute",
            Self::AddVariant { .. } => "addVariant",
            Self::RemoveVariant { .. } => "removeVariant",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Money;
    use serde_json::json;

    #[test]
    fn test_action_wire_form() {
        let action = ProductUpdateAction::ChangeName {
            name: LocalizedString::from([("en".to_string(), "Boot".to_string())]),
            staged: false,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"action": "changeName", "name": {"en": "Boot"}, "staged": false})
        );
        assert_eq!(action.name(), "changeName");
    }

    #[test]
    fn test_unset_actions_carry_explicit_null() {
        let action = ProductUpdateAction::SetKey { key: None };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"action": "setKey", "key": null})
        );

        let action = ProductUpdateAction::SetAttribute {
            variant_id: 2,
            name: "color".to_string(),
            value: None,
            staged: false,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "action": "setAttribute",
                "variantId": 2,
                "name": "color",
                "value": null,
                "staged": false
            })
        );
    }

    #[test]
    fn test_variant_actions_wire_form() {
        let action = ProductUpdateAction::SetPrices {
            variant_id: 1,
            prices: vec![PriceDraft {
                key: None,
                value: Money {
                    cent_amount: 1000,
                    currency_code: "USD".to_string(),
                },
                country: Some("US".to_string()),
                valid_from: None,
                valid_until: None,
            }],
            staged: false,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "action": "setPrices",
                "variantId": 1,
                "prices": [{
                    "value": {"centAmount": 1000, "currencyCode": "USD"},
                    "country": "US"
                }],
                "staged": false
            })
        );

        let action = ProductUpdateAction::Publish {
            scope: PublishScope::All,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"action": "publish", "scope": "All"})
        );
        assert_eq!(
            serde_json::to_value(ProductUpdateAction::Unpublish).unwrap(),
            json!({"action": "unpublish"})
        );
    }

    #[test]
    fn test_update_round_trips_through_json() {
        let update = ProductUpdate::new(
            7,
            vec![
                ProductUpdateAction::RemoveVariant {
                    id: 3,
                    staged: false,
                },
                ProductUpdateAction::AddVariant {
                    sku: Some("s4".to_string()),
                    key: None,
                    prices: vec![],
                    attributes: vec![],
                    staged: false,
                },
            ],
        );
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["actions"][1], json!({"action": "addVariant", "sku": "s4", "staged": false}));

        let back: ProductUpdate = serde_json::from_value(value).unwrap();
        assert_eq!(back, update);
    }
}
