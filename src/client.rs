//! The remote product API as consumed by the resource.

use async_trait::async_trait;

use crate::actions::ProductUpdate;
use crate::error::ProviderError;
use crate::platform::{Product, ProductDraft};

/// Client for the platform's product endpoints.
///
/// Implementations classify failures into [`ProviderError`] variants; the
/// resource decides what to retry from that classification alone (see
/// [`ProviderError::is_retryable`] and [`ProviderError::from_http_status`]).
#[async_trait]
pub trait ProductClient: Send + Sync + 'static {
    /// Fetch a product by id. A missing product is [`ProviderError::NotFound`].
    async fn get_product(&self, id: &str) -> Result<Product, ProviderError>;

    /// Create a product.
    async fn create_product(&self, draft: &ProductDraft) -> Result<Product, ProviderError>;

    /// Apply an update batch to the product at `update.version`.
    async fn update_product(
        &self,
        id: &str,
        update: &ProductUpdate,
    ) -> Result<Product, ProviderError>;

    /// Delete the product at `version`, returning its last representation.
    async fn delete_product(&self, id: &str, version: i64) -> Result<Product, ProviderError>;
}
