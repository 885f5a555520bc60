//! The declarative product record.
//!
//! A [`Product`] is what the host stores as resource state and hands back as a
//! plan. It is a flat, snake_case projection of the platform product that only
//! keeps the current (published) catalog data.

use serde::{Deserialize, Serialize};

use crate::adapters::{localized_field, localized_value};
use crate::error::ProviderError;
use crate::field::Field;
use crate::platform::{
    self, LocalizedString, PriceMode, ResourceIdentifier, CATEGORY_TYPE_ID, PRODUCT_TYPE_TYPE_ID,
    TAX_CATEGORY_TYPE_ID,
};
use crate::variant::ProductVariant;

/// The product record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    /// Platform-assigned id.
    pub id: Field<String>,
    /// Optimistic concurrency version.
    pub version: Field<i64>,
    /// User-defined key.
    pub key: Field<String>,
    /// Product type id. Immutable.
    pub product_type: Field<String>,
    /// Tax category id.
    pub tax_category: Field<String>,
    /// Price lookup mode.
    pub price_mode: Field<PriceMode>,
    /// Catalog data.
    pub master_data: Option<MasterData>,
}

/// Publication state and current catalog data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterData {
    /// Whether the product is published.
    pub published: Field<bool>,
    /// Whether the staged projection differs from current.
    pub has_staged_changes: Field<bool>,
    /// The current projection.
    pub current: Option<ProductData>,
}

/// The current projection of a product.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductData {
    /// Product name.
    pub name: Field<LocalizedString>,
    /// URL slug.
    pub slug: Field<LocalizedString>,
    /// Product description.
    pub description: Field<LocalizedString>,
    /// Search engine title.
    pub meta_title: Field<LocalizedString>,
    /// Search engine description.
    pub meta_description: Field<LocalizedString>,
    /// Search engine keywords.
    pub meta_keywords: Field<LocalizedString>,
    /// Category ids. Never an empty list; no categories is null.
    pub categories: Field<Vec<String>>,
    /// The master variant.
    pub master_variant: Option<ProductVariant>,
    /// Additional variants, in order.
    #[serde(rename = "variant")]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Decode a record from state JSON.
    pub fn from_state(state: serde_json::Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(state)?)
    }

    /// Encode this record as state JSON.
    pub fn to_state(&self) -> Result<serde_json::Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Project a platform product.
    pub fn from_remote(product: &platform::Product) -> Result<Self, ProviderError> {
        Ok(Self {
            id: Field::known(product.id.clone()),
            version: Field::Known(product.version),
            key: Field::from_option(product.key.clone()),
            product_type: Field::known(product.product_type.id.clone()),
            tax_category: Field::from_option(product.tax_category.as_ref().map(|r| r.id.clone())),
            price_mode: Field::from_option(product.price_mode),
            master_data: Some(MasterData::from_remote(&product.master_data)?),
        })
    }

    /// Build the create payload for this planned record.
    ///
    /// Fails without touching the platform when a required block is empty.
    pub fn to_draft(&self) -> Result<platform::ProductDraft, ProviderError> {
        let product_type = self
            .product_type
            .as_known()
            .ok_or_else(|| ProviderError::Internal("product_type is not known".to_string()))?;
        let master_data = self.master_data()?;
        let current = master_data.current()?;

        Ok(platform::ProductDraft {
            product_type: ResourceIdentifier::by_id(PRODUCT_TYPE_TYPE_ID, product_type.clone()),
            name: current.require_name()?.clone(),
            slug: current.require_slug()?.clone(),
            key: self.key.as_known().cloned(),
            description: localized_value(&current.description),
            categories: current
                .category_ids()
                .iter()
                .map(|id| ResourceIdentifier::by_id(CATEGORY_TYPE_ID, id.clone()))
                .collect(),
            meta_title: localized_value(&current.meta_title),
            meta_description: localized_value(&current.meta_description),
            meta_keywords: localized_value(&current.meta_keywords),
            master_variant: current.master_variant()?.draft()?,
            variants: current
                .variants
                .iter()
                .map(ProductVariant::draft)
                .collect::<Result<_, _>>()?,
            tax_category: self
                .tax_category
                .as_known()
                .map(|id| ResourceIdentifier::by_id(TAX_CATEGORY_TYPE_ID, id.clone())),
            publish: master_data.published.as_known().copied(),
            price_mode: self.price_mode.as_known().copied(),
        })
    }

    /// The master data block, which must be present.
    pub fn master_data(&self) -> Result<&MasterData, ProviderError> {
        self.master_data
            .as_ref()
            .ok_or_else(|| ProviderError::Internal("master_data is empty".to_string()))
    }

    /// Mutable access to the master data block.
    pub fn master_data_mut(&mut self) -> Result<&mut MasterData, ProviderError> {
        self.master_data
            .as_mut()
            .ok_or_else(|| ProviderError::Internal("master_data is empty".to_string()))
    }

    /// The current projection, which must be present.
    pub fn current(&self) -> Result<&ProductData, ProviderError> {
        self.master_data()?.current()
    }

    /// The known remote id.
    pub fn require_id(&self) -> Result<&str, ProviderError> {
        self.id
            .as_known()
            .map(String::as_str)
            .ok_or_else(|| ProviderError::Internal("product id is not known".to_string()))
    }

    /// The known remote version.
    pub fn require_version(&self) -> Result<i64, ProviderError> {
        self.version
            .as_known()
            .copied()
            .ok_or_else(|| ProviderError::Internal("product version is not known".to_string()))
    }
}

impl MasterData {
    /// Whether the product is planned or observed as published.
    pub fn is_published(&self) -> bool {
        self.published.as_known() == Some(&true)
    }

    fn from_remote(data: &platform::ProductCatalogData) -> Result<Self, ProviderError> {
        Ok(Self {
            published: Field::Known(data.published),
            has_staged_changes: Field::Known(data.has_staged_changes),
            current: Some(ProductData::from_remote(&data.current)?),
        })
    }

    /// The current projection, which must be present.
    pub fn current(&self) -> Result<&ProductData, ProviderError> {
        self.current
            .as_ref()
            .ok_or_else(|| ProviderError::Internal("master_data.current is empty".to_string()))
    }

    /// Mutable access to the current projection.
    pub fn current_mut(&mut self) -> Result<&mut ProductData, ProviderError> {
        self.current
            .as_mut()
            .ok_or_else(|| ProviderError::Internal("master_data.current is empty".to_string()))
    }
}

impl ProductData {
    fn from_remote(data: &platform::ProductData) -> Result<Self, ProviderError> {
        let categories: Vec<String> = data.categories.iter().map(|r| r.id.clone()).collect();
        Ok(Self {
            name: Field::known(data.name.clone()),
            slug: Field::known(data.slug.clone()),
            description: localized_field(data.description.as_ref()),
            meta_title: localized_field(data.meta_title.as_ref()),
            meta_description: localized_field(data.meta_description.as_ref()),
            meta_keywords: localized_field(data.meta_keywords.as_ref()),
            categories: if categories.is_empty() {
                Field::Null
            } else {
                Field::Known(categories)
            },
            master_variant: Some(ProductVariant::from_remote(&data.master_variant)?),
            variants: data
                .variants
                .iter()
                .map(ProductVariant::from_remote)
                .collect::<Result<_, _>>()?,
        })
    }

    /// The master variant, which must be present.
    pub fn master_variant(&self) -> Result<&ProductVariant, ProviderError> {
        self.master_variant.as_ref().ok_or_else(|| {
            ProviderError::Internal("master_data.current.master_variant is empty".to_string())
        })
    }

    /// Mutable access to the master variant.
    pub fn master_variant_mut(&mut self) -> Result<&mut ProductVariant, ProviderError> {
        self.master_variant.as_mut().ok_or_else(|| {
            ProviderError::Internal("master_data.current.master_variant is empty".to_string())
        })
    }

    /// The known name. Names are required and never unset.
    pub fn require_name(&self) -> Result<&LocalizedString, ProviderError> {
        self.name
            .as_known()
            .ok_or_else(|| ProviderError::Internal("name is not set".to_string()))
    }

    /// The known slug. Slugs are required and never unset.
    pub fn require_slug(&self) -> Result<&LocalizedString, ProviderError> {
        self.slug
            .as_known()
            .ok_or_else(|| ProviderError::Internal("slug is not set".to_string()))
    }

    /// Known category ids; null and unknown are no categories.
    pub fn category_ids(&self) -> &[String] {
        self.categories.as_known().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every variant, master first.
    pub fn all_variants(&self) -> impl Iterator<Item = &ProductVariant> {
        self.master_variant.iter().chain(self.variants.iter())
    }
}
