//! Product resource provider for commercetools.
//!
//! This crate reconciles a declarative product record with a product stored
//! on the commercetools platform. It follows the pattern established by
//! [terraform-plugin-framework](https://github.com/hashicorp/terraform-plugin-framework)
//! resources: the host hands over JSON state and plans, the resource answers
//! with new state, update actions and diagnostics.
//!
//! # Overview
//!
//! - **Records**: [`model::Product`] and [`variant::ProductVariant`], with tri-state
//!   [`Field`] values (null, unknown, known)
//! - **Reconciliation**: [`diff::compute_update`] turns current and planned
//!   records into an ordered list of [`ProductUpdateAction`]s
//! - **Lifecycle**: [`ProductResource`] drives a [`ProductClient`] through
//!   create, read, update, delete and import, with bounded retries
//! - **Service seam**: the [`ResourceService`] trait, JSON in and out
//! - **Schema & validation**: the product schema and its validators
//! - **Error types**: [`ProviderError`], convertible into [`schema::Diagnostic`]s
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use commercetools_product_provider::{
//!     init_logging, ProductClient, ProductResource, ResourceService,
//! };
//!
//! async fn apply(client: impl ProductClient, config: serde_json::Value)
//!     -> Result<serde_json::Value, commercetools_product_provider::ProviderError>
//! {
//!     init_logging();
//!     let resource = ProductResource::new(client);
//!
//!     let plan = resource.plan(None, config).await?;
//!     resource.create(plan.planned_state).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actions;
pub mod adapters;
pub mod client;
pub mod diff;
pub mod error;
pub mod field;
pub mod logging;
pub mod model;
pub mod platform;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;
pub mod variant;

// Re-export main types at crate root
pub use actions::{ProductUpdate, ProductUpdateAction};
pub use client::ProductClient;
pub use diff::{compute_update, compute_variant_update, requires_replace};
pub use error::ProviderError;
pub use field::{Field, UNKNOWN_VALUE};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use model::Product;
pub use resource::{
    plan_product, ProductPlan, ProductResource, ResourceOptions, PRODUCT_RESOURCE_TYPE,
};
pub use retry::RetryPolicy;
pub use schema::{product_schema, Schema};
pub use service::ResourceService;
pub use types::{ImportedResource, PlanResult};
pub use validation::{is_valid, validate, validate_product, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
