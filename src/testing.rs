//! Testing utilities for the product resource.
//!
//! This module provides an in-memory [`ProductClient`], fixtures, and a
//! harness to drive any [`ResourceService`] through its lifecycle without a
//! host or a remote platform.
//!
//! # Example
//!
//! ```ignore
//! use commercetools_product_provider::testing::{sample_product, InMemoryProductClient, ResourceTester};
//! use commercetools_product_provider::ProductResource;
//!
//! #[tokio::test]
//! async fn test_create_product() {
//!     let tester = ResourceTester::new(ProductResource::new(InMemoryProductClient::new()));
//!
//!     let state = tester
//!         .lifecycle_create(sample_product().to_state().unwrap())
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["id"], "product-1");
//! }
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::actions::{ProductUpdate, ProductUpdateAction};
use crate::client::ProductClient;
use crate::error::ProviderError;
use crate::field::Field;
use crate::model::{MasterData, Product, ProductData};
use crate::platform::{
    self, LocalizedString, PriceMode, Reference, ResourceIdentifier, TypedMoney, CATEGORY_TYPE_ID,
    PRODUCT_TYPE_TYPE_ID, TAX_CATEGORY_TYPE_ID,
};
use crate::schema::{Diagnostic, Schema};
use crate::service::ResourceService;
use crate::types::{ImportedResource, PlanResult};
use crate::variant::{Money, Price, ProductVariant};

// =========================================================================
// Fixtures
// =========================================================================

fn localized(locale: &str, text: &str) -> LocalizedString {
    LocalizedString::from([(locale.to_string(), text.to_string())])
}

/// A planned product: a published shoe with master variant `s1`, a USD price
/// for the US and a NOK price without country. Computed fields are null.
pub fn sample_product() -> Product {
    Product {
        key: Field::known("shoe"),
        product_type: Field::known("pt-1"),
        price_mode: Field::Known(PriceMode::Embedded),
        master_data: Some(MasterData {
            published: Field::Known(true),
            has_staged_changes: Field::Null,
            current: Some(ProductData {
                name: Field::Known(localized("en", "Shoe")),
                slug: Field::Known(localized("en", "shoe")),
                description: Field::Known(localized("en", "A comfortable shoe")),
                categories: Field::Known(vec!["cat-1".to_string()]),
                master_variant: Some(ProductVariant {
                    sku: Field::known("s1"),
                    prices: vec![
                        Price {
                            country: Field::known("US"),
                            ..Price::new(Money::new(1000, "USD"))
                        },
                        Price::new(Money::new(9000, "NOK")),
                    ],
                    ..ProductVariant::default()
                }),
                ..ProductData::default()
            }),
        }),
        ..Product::default()
    }
}

/// Build the product the platform would return for `draft`.
///
/// The product is at version 1, the master variant gets id 1 and further
/// variants 2, 3, ... in order. Prices get ids `price-1`, `price-2`, ...
pub fn remote_from_draft(
    id: &str,
    draft: &platform::ProductDraft,
) -> Result<platform::Product, ProviderError> {
    let mut next_price = 0;
    build_product(id, draft, &mut next_price)
}

fn build_product(
    id: &str,
    draft: &platform::ProductDraft,
    next_price: &mut u64,
) -> Result<platform::Product, ProviderError> {
    let master_variant = build_variant(1, &draft.master_variant, next_price);
    let variants = draft
        .variants
        .iter()
        .zip(2..)
        .map(|(variant, variant_id)| build_variant(variant_id, variant, next_price))
        .collect();

    let data = platform::ProductData {
        name: draft.name.clone(),
        categories: draft
            .categories
            .iter()
            .map(|c| reference(CATEGORY_TYPE_ID, c))
            .collect::<Result<_, _>>()?,
        description: draft.description.clone(),
        slug: draft.slug.clone(),
        meta_title: draft.meta_title.clone(),
        meta_description: draft.meta_description.clone(),
        meta_keywords: draft.meta_keywords.clone(),
        master_variant,
        variants,
    };

    Ok(platform::Product {
        id: id.to_string(),
        version: 1,
        key: draft.key.clone(),
        product_type: reference(PRODUCT_TYPE_TYPE_ID, &draft.product_type)?,
        tax_category: draft
            .tax_category
            .as_ref()
            .map(|t| reference(TAX_CATEGORY_TYPE_ID, t))
            .transpose()?,
        price_mode: draft.price_mode,
        master_data: platform::ProductCatalogData {
            published: draft.publish.unwrap_or(false),
            has_staged_changes: false,
            staged: data.clone(),
            current: data,
        },
    })
}

fn build_variant(
    id: i64,
    draft: &platform::ProductVariantDraft,
    next_price: &mut u64,
) -> platform::ProductVariant {
    platform::ProductVariant {
        id,
        key: draft.key.clone(),
        sku: draft.sku.clone(),
        prices: build_prices(&draft.prices, next_price),
        attributes: draft.attributes.clone(),
    }
}

fn build_prices(drafts: &[platform::PriceDraft], next_price: &mut u64) -> Vec<platform::Price> {
    drafts
        .iter()
        .map(|draft| {
            *next_price += 1;
            platform::Price {
                id: format!("price-{}", next_price),
                key: draft.key.clone(),
                value: TypedMoney::cents(draft.value.cent_amount, draft.value.currency_code.clone()),
                country: draft.country.clone(),
                valid_from: draft.valid_from,
                valid_until: draft.valid_until,
            }
        })
        .collect()
}

fn reference(type_id: &str, identifier: &ResourceIdentifier) -> Result<Reference, ProviderError> {
    let id = identifier.id.clone().ok_or_else(|| {
        ProviderError::InvalidRequest(format!("{} identifier without id", type_id))
    })?;
    Ok(Reference::new(type_id, id))
}

// =========================================================================
// In-memory client
// =========================================================================

#[derive(Default)]
struct Store {
    products: BTreeMap<String, platform::Product>,
    next_product: u64,
    next_price: u64,
    failures: HashMap<&'static str, VecDeque<ProviderError>>,
    calls: Vec<&'static str>,
}

impl Store {
    fn enter(&mut self, method: &'static str) -> Result<(), ProviderError> {
        self.calls.push(method);
        match self.failures.get_mut(method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A [`ProductClient`] that keeps products in memory.
///
/// It assigns ids `product-1`, `product-2`, ..., checks versions the way the
/// platform does, applies every update action to both projections, and
/// records each call. Failures queued with [`Self::fail_next`] are returned
/// before the call touches the store.
#[derive(Default)]
pub struct InMemoryProductClient {
    store: Mutex<Store>,
}

impl InMemoryProductClient {
    /// Create an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a product as if it had been created remotely.
    pub fn insert(&self, product: platform::Product) {
        self.lock().products.insert(product.id.clone(), product);
    }

    /// The stored product with `id`.
    pub fn product(&self, id: &str) -> Option<platform::Product> {
        self.lock().products.get(id).cloned()
    }

    /// Bump the version of a stored product, as a concurrent writer would.
    pub fn touch(&self, id: &str) {
        if let Some(product) = self.lock().products.get_mut(id) {
            product.version += 1;
        }
    }

    /// Make the next call to `method` fail with `err`. Queued failures for the
    /// same method are returned in order.
    pub fn fail_next(&self, method: &'static str, err: ProviderError) {
        self.lock()
            .failures
            .entry(method)
            .or_default()
            .push_back(err);
    }

    /// Every call made so far, by method name.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    /// How many times `method` was called.
    pub fn call_count(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == method).count()
    }
}

#[async_trait]
impl ProductClient for InMemoryProductClient {
    async fn get_product(&self, id: &str) -> Result<platform::Product, ProviderError> {
        let mut store = self.lock();
        store.enter("get_product")?;
        store
            .products
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("product {}", id)))
    }

    async fn create_product(
        &self,
        draft: &platform::ProductDraft,
    ) -> Result<platform::Product, ProviderError> {
        let mut store = self.lock();
        store.enter("create_product")?;
        store.next_product += 1;
        let id = format!("product-{}", store.next_product);
        let mut next_price = store.next_price;
        let product = build_product(&id, draft, &mut next_price)?;
        store.next_price = next_price;
        store.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &str,
        update: &ProductUpdate,
    ) -> Result<platform::Product, ProviderError> {
        let mut store = self.lock();
        store.enter("update_product")?;
        let mut product = store
            .products
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("product {}", id)))?;
        check_version(&product, update.version)?;

        let mut next_price = store.next_price;
        for action in &update.actions {
            apply_action(&mut product, action, &mut next_price)?;
        }
        product.master_data.staged = product.master_data.current.clone();
        product.master_data.has_staged_changes = false;
        product.version += 1;

        store.next_price = next_price;
        store.products.insert(id.to_string(), product.clone());
        Ok(product)
    }

    async fn delete_product(
        &self,
        id: &str,
        version: i64,
    ) -> Result<platform::Product, ProviderError> {
        let mut store = self.lock();
        store.enter("delete_product")?;
        let product = store
            .products
            .get(id)
            .ok_or_else(|| ProviderError::NotFound(format!("product {}", id)))?;
        check_version(product, version)?;
        store
            .products
            .remove(id)
            .ok_or_else(|| ProviderError::NotFound(format!("product {}", id)))
    }
}

fn check_version(product: &platform::Product, version: i64) -> Result<(), ProviderError> {
    if product.version == version {
        Ok(())
    } else {
        Err(ProviderError::FailedPrecondition(format!(
            "Object {} has a different version than expected. Expected: {} - Actual: {}.",
            product.id, version, product.version
        )))
    }
}

fn apply_action(
    product: &mut platform::Product,
    action: &ProductUpdateAction,
    next_price: &mut u64,
) -> Result<(), ProviderError> {
    let data = &mut product.master_data.current;
    match action {
        ProductUpdateAction::SetKey { key } => product.key = key.clone(),
        ProductUpdateAction::SetPriceMode { price_mode } => product.price_mode = *price_mode,
        ProductUpdateAction::SetTaxCategory { tax_category } => {
            product.tax_category = tax_category
                .as_ref()
                .map(|t| reference(TAX_CATEGORY_TYPE_ID, t))
                .transpose()?;
        },
        ProductUpdateAction::ChangeName { name, .. } => data.name = name.clone(),
        ProductUpdateAction::SetDescription { description, .. } => {
            data.description = description.clone();
        },
        ProductUpdateAction::ChangeSlug { slug, .. } => data.slug = slug.clone(),
        ProductUpdateAction::SetMetaTitle { meta_title, .. } => {
            data.meta_title = meta_title.clone();
        },
        ProductUpdateAction::SetMetaDescription {
            meta_description, ..
        } => data.meta_description = meta_description.clone(),
        ProductUpdateAction::SetMetaKeywords { meta_keywords, .. } => {
            data.meta_keywords = meta_keywords.clone();
        },
        ProductUpdateAction::AddToCategory { category, .. } => {
            let category = reference(CATEGORY_TYPE_ID, category)?;
            if !data.categories.contains(&category) {
                data.categories.push(category);
            }
        },
        ProductUpdateAction::RemoveFromCategory { category, .. } => {
            let category = reference(CATEGORY_TYPE_ID, category)?;
            data.categories.retain(|c| *c != category);
        },
        ProductUpdateAction::Publish { .. } => product.master_data.published = true,
        ProductUpdateAction::Unpublish => product.master_data.published = false,
        ProductUpdateAction::SetSku {
            variant_id, sku, ..
        } => variant_mut(data, *variant_id)?.sku = sku.clone(),
        ProductUpdateAction::SetProductVariantKey {
            variant_id, key, ..
        } => variant_mut(data, *variant_id)?.key = key.clone(),
        ProductUpdateAction::SetPrices {
            variant_id, prices, ..
        } => variant_mut(data, *variant_id)?.prices = build_prices(prices, next_price),
        ProductUpdateAction::SetAttribute {
            variant_id,
            name,
            value,
            ..
        } => {
            let attributes = &mut variant_mut(data, *variant_id)?.attributes;
            match value {
                Some(value) => match attributes.iter_mut().find(|a| a.name == *name) {
                    Some(existing) => existing.value = value.clone(),
                    None => attributes.push(platform::Attribute {
                        name: name.clone(),
                        value: value.clone(),
                    }),
                },
                None => attributes.retain(|a| a.name != *name),
            }
        },
        ProductUpdateAction::AddVariant {
            sku,
            key,
            prices,
            attributes,
            ..
        } => {
            let id = data
                .variants
                .iter()
                .map(|v| v.id)
                .fold(data.master_variant.id, i64::max)
                + 1;
            data.variants.push(platform::ProductVariant {
                id,
                key: key.clone(),
                sku: sku.clone(),
                prices: build_prices(prices, next_price),
                attributes: attributes.clone(),
            });
        },
        ProductUpdateAction::RemoveVariant { id, .. } => {
            if *id == data.master_variant.id {
                return Err(ProviderError::InvalidRequest(
                    "Cannot remove the master variant".to_string(),
                ));
            }
            let before = data.variants.len();
            data.variants.retain(|v| v.id != *id);
            if data.variants.len() == before {
                return Err(ProviderError::InvalidRequest(format!(
                    "Variant {} does not exist",
                    id
                )));
            }
        },
    }
    Ok(())
}

fn variant_mut(
    data: &mut platform::ProductData,
    id: i64,
) -> Result<&mut platform::ProductVariant, ProviderError> {
    if data.master_variant.id == id {
        return Ok(&mut data.master_variant);
    }
    data.variants
        .iter_mut()
        .find(|v| v.id == id)
        .ok_or_else(|| ProviderError::InvalidRequest(format!("Variant {} does not exist", id)))
}

// =========================================================================
// Resource tester
// =========================================================================

/// A test harness for [`ResourceService`] implementations.
pub struct ResourceTester<R: ResourceService> {
    resource: R,
}

impl<R: ResourceService> ResourceTester<R> {
    /// Create a new tester for the given resource.
    pub fn new(resource: R) -> Self {
        Self { resource }
    }

    /// Get a reference to the underlying resource.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Get the resource schema.
    pub fn schema(&self) -> Schema {
        self.resource.schema()
    }

    /// Validate `config`; error diagnostics become [`TestError::Diagnostics`].
    pub async fn validate_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.resource.validate_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a creation (no prior state).
    pub async fn plan_create(&self, proposed_state: Value) -> Result<PlanResult, ProviderError> {
        self.resource.plan(None, proposed_state).await
    }

    /// Plan an update.
    pub async fn plan_update(
        &self,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.resource.plan(Some(prior_state), proposed_state).await
    }

    /// Create a resource.
    pub async fn create(&self, planned_state: Value) -> Result<Value, ProviderError> {
        self.resource.create(planned_state).await
    }

    /// Read a resource.
    pub async fn read(&self, current_state: Value) -> Result<Option<Value>, ProviderError> {
        self.resource.read(current_state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.resource.update(prior_state, planned_state).await
    }

    /// Delete a resource.
    pub async fn delete(&self, current_state: Value) -> Result<(), ProviderError> {
        self.resource.delete(current_state).await
    }

    /// Import a resource by id.
    pub async fn import(&self, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        self.resource.import(id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan, create, then read back. Returns the state read.
    pub async fn lifecycle_create(&self, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(config).await?;
        let created = self.create(plan.planned_state).await?;
        self.read_existing(created).await
    }

    /// Plan against `prior_state`, update, then read back.
    pub async fn lifecycle_update(
        &self,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_update(prior_state.clone(), proposed_state).await?;
        let updated = self.update(prior_state, plan.planned_state).await?;
        self.read_existing(updated).await
    }

    /// Create from `initial_config`, update to `updated_config`, then delete.
    ///
    /// Returns the state read after the update.
    pub async fn lifecycle_crud(
        &self,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(initial_config).await?;
        let updated = self.lifecycle_update(created, updated_config).await?;
        self.delete(updated.clone()).await?;
        Ok(updated)
    }

    async fn read_existing(&self, state: Value) -> Result<Value, ProviderError> {
        self.read(state).await?.ok_or_else(|| {
            ProviderError::NotFound(format!(
                "{} disappeared right after it was written",
                self.resource.type_name()
            ))
        })
    }
}

/// Why a harness call failed.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// Validation reported errors.
    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The resource returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("{} error diagnostic(s):", diagnostics.len());
    for d in diagnostics {
        out.push_str(&format!("\n  {}", d.summary));
        if let Some(detail) = &d.detail {
            out.push_str(&format!(": {}", detail));
        }
        if let Some(attribute) = &d.attribute {
            out.push_str(&format!(" (at {})", attribute));
        }
    }
    out
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Panics unless `plan` neither updates nor replaces.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        !plan.has_changes(),
        "Expected no changes, but got {} action(s): {:?}",
        plan.actions.len(),
        plan_action_names(plan)
    );
}

/// Panics unless `plan` replaces the resource.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected a replacing plan"
    );
}

/// Assert that a plan submits exactly the named actions, in order.
///
/// # Panics
///
/// Panics if the action names differ.
pub fn assert_plan_actions(plan: &PlanResult, expected: &[&str]) {
    assert!(
        !plan.requires_replace,
        "Expected an in-place update, got a replacement"
    );
    assert_eq!(plan_action_names(plan), expected, "Unexpected plan actions");
}

fn plan_action_names(plan: &PlanResult) -> Vec<&str> {
    plan.actions
        .iter()
        .map(|a| a["action"].as_str().unwrap_or("<untagged>"))
        .collect()
}

/// Assert that the actions have exactly the given names, in order.
///
/// # Panics
///
/// Panics if the action names differ.
pub fn assert_action_names(actions: &[ProductUpdateAction], expected: &[&str]) {
    let names: Vec<&str> = actions.iter().map(ProductUpdateAction::name).collect();
    assert_eq!(names, expected, "Unexpected update actions");
}

/// Assert that no update actions were computed.
///
/// # Panics
///
/// Panics if there are any actions.
pub fn assert_no_actions(actions: &[ProductUpdateAction]) {
    assert!(
        actions.is_empty(),
        "Expected no actions, but got {:?}",
        actions.iter().map(ProductUpdateAction::name).collect::<Vec<_>>()
    );
}

/// Panics if any diagnostic is an error. Warnings are fine.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<&str> = error_summaries(diagnostics);
    assert!(errors.is_empty(), "Expected no errors, got {:?}", errors);
}

/// Panics unless some error diagnostic's summary contains `needle`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], needle: &str) {
    let errors = error_summaries(diagnostics);
    assert!(
        errors.iter().any(|summary| summary.contains(needle)),
        "No error mentions '{}'; errors: {:?}",
        needle,
        errors
    );
}

fn error_summaries(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.summary.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::PublishScope;
    use crate::platform::AttributeValue;
    use crate::resource::ProductResource;
    use serde_json::json;

    fn tester() -> ResourceTester<ProductResource<InMemoryProductClient>> {
        ResourceTester::new(ProductResource::new(InMemoryProductClient::new()))
    }

    fn config() -> Value {
        sample_product().to_state().unwrap()
    }

    #[tokio::test]
    async fn test_tester_lifecycle_create() {
        let tester = tester();
        let state = tester.lifecycle_create(config()).await.unwrap();
        assert_eq!(state["id"], "product-1");
        assert_eq!(state["version"], 1);
        assert_eq!(state["master_data"]["published"], true);
        assert_eq!(state["master_data"]["current"]["categories"], json!(["cat-1"]));
    }

    #[tokio::test]
    async fn test_tester_plan_update_no_changes() {
        let tester = tester();
        let state = tester.lifecycle_create(config()).await.unwrap();
        let plan = tester.plan_update(state, config()).await.unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_tester_plan_update_with_changes() {
        let tester = tester();
        let state = tester.lifecycle_create(config()).await.unwrap();

        let mut changed = config();
        changed["master_data"]["current"]["slug"] = json!({"en": "boot"});
        changed["master_data"]["current"]["master_variant"]["price"] =
            json!([{"value": {"cent_amount": 1200, "currency_code": "USD"}}]);
        let plan = tester.plan_update(state, changed).await.unwrap();
        assert_plan_actions(&plan, &["changeSlug", "setPrices"]);

        let mut replaced = config();
        replaced["product_type"] = json!("pt-2");
        let state = tester.lifecycle_create(config()).await.unwrap();
        let plan = tester.plan_update(state, replaced).await.unwrap();
        assert_plan_replaces(&plan);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_crud() {
        let tester = tester();
        let mut updated_config = config();
        updated_config["key"] = Value::Null;
        updated_config["master_data"]["current"]["variant"] =
            json!([{"sku": "s2", "attribute": [{"name": "size", "text_value": "42"}]}]);

        let state = tester
            .lifecycle_crud(config(), updated_config)
            .await
            .unwrap();
        assert!(state["key"].is_null());
        assert_eq!(state["version"], 2);
        let variant = &state["master_data"]["current"]["variant"][0];
        assert_eq!(variant["id"], 2);
        assert_eq!(variant["attribute"][0]["text_value"], "42");

        let client = tester.resource().client();
        assert!(client.product("product-1").is_none());
        assert_eq!(
            client.calls(),
            vec![
                "create_product",
                "get_product",
                "update_product",
                "get_product",
                "delete_product",
            ]
        );
    }

    #[tokio::test]
    async fn test_tester_validate_config() {
        let tester = tester();
        tester.validate_config(config()).await.unwrap();

        let mut invalid = config();
        invalid["master_data"]["current"]["variant"] = json!([{"sku": "s1"}]);
        match tester.validate_config(invalid).await {
            Err(TestError::Diagnostics(diagnostics)) => {
                assert_error_contains(&diagnostics, "Duplicate SKU");
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_applies_actions() {
        let client = InMemoryProductClient::new();
        let draft = sample_product().to_draft().unwrap();
        let created = client.create_product(&draft).await.unwrap();

        let update = ProductUpdate::new(
            created.version,
            vec![
                ProductUpdateAction::Unpublish,
                ProductUpdateAction::SetAttribute {
                    variant_id: 1,
                    name: "waterproof".to_string(),
                    value: Some(AttributeValue::Bool(true)),
                    staged: false,
                },
                ProductUpdateAction::AddVariant {
                    sku: Some("s2".to_string()),
                    key: None,
                    prices: vec![],
                    attributes: vec![],
                    staged: false,
                },
                ProductUpdateAction::Publish {
                    scope: PublishScope::All,
                },
            ],
        );
        let updated = client.update_product(&created.id, &update).await.unwrap();

        assert_eq!(updated.version, 2);
        assert!(updated.master_data.published);
        let current = &updated.master_data.current;
        assert_eq!(current.master_variant.attributes.len(), 1);
        assert_eq!(current.variants[0].id, 2);
        assert_eq!(updated.master_data.staged, *current);
    }

    #[tokio::test]
    async fn test_client_rejects_stale_version_and_bad_batches() {
        let client = InMemoryProductClient::new();
        let draft = sample_product().to_draft().unwrap();
        let created = client.create_product(&draft).await.unwrap();

        let stale = ProductUpdate::new(0, vec![ProductUpdateAction::Unpublish]);
        let err = client.update_product(&created.id, &stale).await.unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));

        let bad = ProductUpdate::new(
            1,
            vec![
                ProductUpdateAction::Unpublish,
                ProductUpdateAction::RemoveVariant { id: 1, staged: false },
            ],
        );
        let err = client.update_product(&created.id, &bad).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));

        // A rejected batch leaves the product untouched
        assert_eq!(client.product(&created.id).unwrap(), created);
    }

    #[tokio::test]
    async fn test_client_failure_injection() {
        let client = InMemoryProductClient::new();
        client.fail_next("get_product", ProviderError::Unavailable("down".to_string()));

        let err = client.get_product("product-1").await.unwrap_err();
        assert!(err.is_retryable());
        let err = client.get_product("product-1").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(client.call_count("get_product"), 2);
    }

    #[test]
    fn test_remote_from_draft_assigns_ids() {
        let mut draft = sample_product().to_draft().unwrap();
        draft.variants.push(platform::ProductVariantDraft::default());
        let remote = remote_from_draft("p", &draft).unwrap();

        assert_eq!(remote.master_data.current.master_variant.id, 1);
        assert_eq!(remote.master_data.current.variants[0].id, 2);
        let price_ids: Vec<&str> = remote
            .master_data
            .current
            .master_variant
            .prices
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(price_ids, vec!["price-1", "price-2"]);
    }

    #[test]
    fn test_assert_no_errors() {
        assert_no_errors(&[Diagnostic::warning("careful")]);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        assert_no_errors(&[Diagnostic::error("broken")]);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Duplicate SKU 's1'").with_attribute("master_data.current.variant.0.sku")
        ]);
        let text = err.to_string();
        assert!(text.contains("1 error diagnostic(s)"));
        assert!(text.contains("(at master_data.current.variant.0.sku)"));
    }
}
