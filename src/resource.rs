//! The product resource lifecycle.
//!
//! [`ProductResource`] drives a [`ProductClient`] through create, read,
//! update, delete and import, and implements [`ResourceService`] on top of
//! them. Remote calls that mutate are retried on transient errors within the
//! budgets in [`ResourceOptions`]; reads are not retried.
//!
//! Dropping a lifecycle future cancels it at its next await point, either a
//! remote call or a backoff sleep.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::actions::{ProductUpdate, ProductUpdateAction};
use crate::client::ProductClient;
use crate::diff::{compute_update, requires_replace};
use crate::error::ProviderError;
use crate::field::Field;
use crate::model::Product;
use crate::platform::PriceMode;
use crate::retry::{retry, RetryPolicy};
use crate::schema::{product_schema, Diagnostic, Schema};
use crate::service::ResourceService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::{validate, validate_product};
use crate::variant::{prices_differ, ProductVariant};

/// The type name hosts use for the product resource.
pub const PRODUCT_RESOURCE_TYPE: &str = "commercetools_product";

const CREATE_SUMMARY: &str = "Error creating product";
const READ_SUMMARY: &str = "Error reading product";
const UPDATE_SUMMARY: &str = "Error updating product";
const DELETE_SUMMARY: &str = "Error deleting product";
const IMPORT_SUMMARY: &str = "Error importing product";

/// Options for the product resource.
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    /// Retry policy for creates. Default: 20 seconds.
    pub create_retry: RetryPolicy,
    /// Retry policy for updates. Default: 5 seconds.
    pub update_retry: RetryPolicy,
    /// Retry policy for deletes. Default: 5 seconds.
    pub delete_retry: RetryPolicy,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            create_retry: RetryPolicy::create(),
            update_retry: RetryPolicy::update(),
            delete_retry: RetryPolicy::delete(),
        }
    }
}

impl ResourceOptions {
    /// Create new resource options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the create retry policy.
    pub fn with_create_retry(mut self, policy: RetryPolicy) -> Self {
        self.create_retry = policy;
        self
    }

    /// Set the update retry policy.
    pub fn with_update_retry(mut self, policy: RetryPolicy) -> Self {
        self.update_retry = policy;
        self
    }

    /// Set the delete retry policy.
    pub fn with_delete_retry(mut self, policy: RetryPolicy) -> Self {
        self.delete_retry = policy;
        self
    }

    /// Use the same retry policy for every mutating call.
    pub fn with_retry(self, policy: RetryPolicy) -> Self {
        self.with_create_retry(policy)
            .with_update_retry(policy)
            .with_delete_retry(policy)
    }
}

/// A plan for one product: the planned record and what applying it does.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPlan {
    /// The planned record, with computed fields resolved or unknown.
    pub planned: Product,
    /// The actions an update would submit. Empty on create and replace.
    pub actions: Vec<ProductUpdateAction>,
    /// Whether the product must be destroyed and recreated.
    pub requires_replace: bool,
}

/// The product resource.
pub struct ProductResource<C> {
    client: Arc<C>,
    options: ResourceOptions,
}

impl<C: ProductClient> ProductResource<C> {
    /// Create a resource with default options.
    pub fn new(client: C) -> Self {
        Self::with_options(Arc::new(client), ResourceOptions::default())
    }

    /// Create a resource sharing `client`.
    pub fn with_options(client: Arc<C>, options: ResourceOptions) -> Self {
        Self { client, options }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The configured options.
    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    /// Create the planned product and return the observed record.
    #[instrument(skip(self, planned), name = "product.create")]
    pub async fn create_product(&self, planned: &Product) -> Result<Product, ProviderError> {
        info!("Create called");
        let draft = planned
            .to_draft()
            .map_err(|e| e.in_operation(CREATE_SUMMARY))?;

        let result = retry(&self.options.create_retry, "create product", || {
            self.client.create_product(&draft)
        })
        .await
        .and_then(|created| Product::from_remote(&created));

        match result {
            Ok(product) => {
                info!(id = ?product.id.as_known(), "Create completed successfully");
                Ok(product)
            },
            Err(e) => {
                error!(error = %e, "Create failed");
                Err(e.in_operation(CREATE_SUMMARY))
            },
        }
    }

    /// Read a product by id. `None` means it no longer exists.
    #[instrument(skip(self), name = "product.read")]
    pub async fn read_product(&self, id: &str) -> Result<Option<Product>, ProviderError> {
        debug!("Read called");
        match self.client.get_product(id).await {
            Ok(remote) => {
                let product =
                    Product::from_remote(&remote).map_err(|e| e.in_operation(READ_SUMMARY))?;
                debug!(version = remote.version, "Read completed successfully");
                Ok(Some(product))
            },
            Err(e) if e.is_not_found() => {
                warn!("Product not found, removing from state");
                Ok(None)
            },
            Err(e) => {
                error!(error = %e, "Read failed");
                Err(e.in_operation(READ_SUMMARY))
            },
        }
    }

    /// Bring the product described by `current` to `planned`.
    ///
    /// When nothing differs, no remote call is made and `current` is returned.
    #[instrument(skip_all, name = "product.update")]
    pub async fn update_product(
        &self,
        current: &Product,
        planned: &Product,
    ) -> Result<Product, ProviderError> {
        info!("Update called");
        let result = self.apply_update(current, planned).await;
        match result {
            Ok(product) => {
                info!(version = ?product.version.as_known(), "Update completed successfully");
                Ok(product)
            },
            Err(e) => {
                error!(error = %e, "Update failed");
                Err(e.in_operation(UPDATE_SUMMARY))
            },
        }
    }

    async fn apply_update(
        &self,
        current: &Product,
        planned: &Product,
    ) -> Result<Product, ProviderError> {
        let actions = compute_update(current, planned)?;
        if actions.is_empty() {
            debug!("No changes, skipping remote update");
            return Ok(current.clone());
        }

        let id = current.require_id()?;
        let update = ProductUpdate::new(current.require_version()?, actions);
        debug!(
            id,
            version = update.version,
            actions = ?update.actions.iter().map(ProductUpdateAction::name).collect::<Vec<_>>(),
            "Submitting update"
        );

        let updated = retry(&self.options.update_retry, "update product", || {
            self.client.update_product(id, &update)
        })
        .await?;
        Product::from_remote(&updated)
    }

    /// Delete the product described by `current`.
    ///
    /// Any failure that survives the retry budget is fatal, not-found included.
    #[instrument(skip_all, name = "product.delete")]
    pub async fn delete_product(&self, current: &Product) -> Result<(), ProviderError> {
        info!("Delete called");
        let id = current.require_id().map_err(|e| e.in_operation(DELETE_SUMMARY))?;
        let version = current
            .require_version()
            .map_err(|e| e.in_operation(DELETE_SUMMARY))?;

        let result = retry(&self.options.delete_retry, "delete product", || {
            self.client.delete_product(id, version)
        })
        .await;

        match result {
            Ok(_) => {
                info!(id, "Delete completed successfully");
                Ok(())
            },
            Err(e) => {
                error!(id, error = %e, "Delete failed");
                Err(e.in_operation(DELETE_SUMMARY))
            },
        }
    }

    /// Import an existing product by id.
    #[instrument(skip(self), name = "product.import")]
    pub async fn import_product(&self, id: &str) -> Result<Product, ProviderError> {
        info!("Import called");
        let result = self
            .client
            .get_product(id)
            .await
            .and_then(|remote| Product::from_remote(&remote));
        match result {
            Ok(product) => {
                info!("Import completed successfully");
                Ok(product)
            },
            Err(e) => {
                error!(error = %e, "Import failed");
                Err(e.in_operation(IMPORT_SUMMARY))
            },
        }
    }
}

// =========================================================================
// Planning
// =========================================================================

/// Plan `proposed` against the prior record, if any.
///
/// Fills defaults (`price_mode` Embedded, `published` true), resolves computed
/// fields from `prior` or marks them unknown, and computes the update actions.
pub fn plan_product(
    prior: Option<&Product>,
    proposed: Product,
) -> Result<ProductPlan, ProviderError> {
    let mut planned = with_defaults(proposed);

    let Some(prior) = prior else {
        mark_computed_unknown(&mut planned);
        return Ok(ProductPlan {
            planned,
            actions: Vec::new(),
            requires_replace: false,
        });
    };

    if requires_replace(prior, &planned) {
        mark_computed_unknown(&mut planned);
        return Ok(ProductPlan {
            planned,
            actions: Vec::new(),
            requires_replace: true,
        });
    }

    carry_computed(prior, &mut planned);
    let actions = compute_update(prior, &planned)?;
    if !actions.is_empty() {
        planned.version = Field::Unknown;
        if let Some(master) = planned.master_data.as_mut() {
            master.has_staged_changes = Field::Unknown;
        }
    }

    Ok(ProductPlan {
        planned,
        actions,
        requires_replace: false,
    })
}

fn with_defaults(mut product: Product) -> Product {
    product.price_mode = product.price_mode.or_default_to(PriceMode::Embedded);
    if let Some(master) = product.master_data.as_mut() {
        master.published = std::mem::take(&mut master.published).or_default_to(true);
    }
    product
}

fn mark_computed_unknown(product: &mut Product) {
    product.id = Field::Unknown;
    product.version = Field::Unknown;
    let Some(master) = product.master_data.as_mut() else {
        return;
    };
    master.has_staged_changes = Field::Unknown;
    let Some(current) = master.current.as_mut() else {
        return;
    };
    if current.categories.is_null() {
        current.categories = Field::Unknown;
    }
    for variant in current
        .master_variant
        .iter_mut()
        .chain(current.variants.iter_mut())
    {
        variant.id = Field::Unknown;
        for price in &mut variant.prices {
            price.id = Field::Unknown;
        }
    }
}

fn carry_computed(prior: &Product, planned: &mut Product) {
    planned.id = prior.id.clone();
    planned.version = prior.version.clone();

    let prior_master = prior.master_data.as_ref();
    let Some(master) = planned.master_data.as_mut() else {
        return;
    };
    master.has_staged_changes = prior_master
        .map(|m| m.has_staged_changes.clone())
        .unwrap_or(Field::Unknown);

    let prior_current = prior_master.and_then(|m| m.current.as_ref());
    let Some(current) = master.current.as_mut() else {
        return;
    };

    if current.categories.is_null() {
        current.categories = prior_current
            .map(|c| c.categories.clone())
            .unwrap_or(Field::Unknown);
    }

    let prior_master_variant = prior_current.and_then(|c| c.master_variant.as_ref());
    if let Some(variant) = current.master_variant.as_mut() {
        carry_variant(prior_master_variant, variant);
    }

    let prior_variants = prior_current.map(|c| c.variants.as_slice()).unwrap_or(&[]);
    for (position, variant) in current.variants.iter_mut().enumerate() {
        let matched = match variant.sku.as_known() {
            Some(sku) => prior_variants
                .iter()
                .find(|p| p.sku.as_known() == Some(sku)),
            None if variant.sku.is_null() => {
                prior_variants.get(position).filter(|p| p.sku.is_null())
            },
            None => None,
        };
        carry_variant(matched, variant);
    }
}

fn carry_variant(prior: Option<&ProductVariant>, planned: &mut ProductVariant) {
    planned.id = prior.map(|p| p.id.clone()).unwrap_or(Field::Unknown);
    for price in &mut planned.prices {
        price.id = Field::Unknown;
    }

    // Unchanged price lists keep their ids; a replaced list gets new ones.
    if let Some(prior) = prior {
        if !prices_differ(&planned.prices, &prior.prices) {
            for (price, prior_price) in planned.prices.iter_mut().zip(&prior.prices) {
                price.id = prior_price.id.clone();
            }
        }
    }
}

// =========================================================================
// Service
// =========================================================================

#[async_trait]
impl<C: ProductClient> ResourceService for ProductResource<C> {
    fn type_name(&self) -> &'static str {
        PRODUCT_RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        product_schema()
    }

    async fn validate_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&self.schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        match Product::from_state(config) {
            Ok(product) => diagnostics.extend(validate_product(&product)),
            Err(e) => diagnostics.push(
                Diagnostic::error("Invalid product configuration").with_detail(e.to_string()),
            ),
        }
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let prior = prior_state.map(Product::from_state).transpose()?;
        let proposed = Product::from_state(proposed_state)?;
        let plan = plan_product(prior.as_ref(), proposed)?;
        debug!(
            requires_replace = plan.requires_replace,
            actions = plan.actions.len(),
            "Plan computed"
        );

        let planned_state = plan.planned.to_state()?;
        if plan.requires_replace {
            return Ok(PlanResult::replace(planned_state));
        }
        let actions = plan
            .actions
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlanResult::with_actions(planned_state, actions))
    }

    async fn create(&self, planned_state: Value) -> Result<Value, ProviderError> {
        let planned =
            Product::from_state(planned_state).map_err(|e| e.in_operation(CREATE_SUMMARY))?;
        self.create_product(&planned).await?.to_state()
    }

    async fn read(&self, current_state: Value) -> Result<Option<Value>, ProviderError> {
        let current =
            Product::from_state(current_state).map_err(|e| e.in_operation(READ_SUMMARY))?;
        let id = current
            .require_id()
            .map_err(|e| e.in_operation(READ_SUMMARY))?;
        self.read_product(id)
            .await?
            .map(|product| product.to_state())
            .transpose()
    }

    async fn update(&self, prior_state: Value, planned_state: Value) -> Result<Value, ProviderError> {
        let current =
            Product::from_state(prior_state).map_err(|e| e.in_operation(UPDATE_SUMMARY))?;
        let planned =
            Product::from_state(planned_state).map_err(|e| e.in_operation(UPDATE_SUMMARY))?;
        self.update_product(&current, &planned).await?.to_state()
    }

    async fn delete(&self, current_state: Value) -> Result<(), ProviderError> {
        let current =
            Product::from_state(current_state).map_err(|e| e.in_operation(DELETE_SUMMARY))?;
        self.delete_product(&current).await
    }

    async fn import(&self, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        let product = self.import_product(id).await?;
        Ok(vec![ImportedResource::new(
            PRODUCT_RESOURCE_TYPE,
            product.to_state()?,
        )])
    }
}
