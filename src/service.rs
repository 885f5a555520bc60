//! The resource service seam.
//!
//! [`ResourceService`] is what a host drives: JSON documents in, JSON
//! documents and diagnostics out. [`ProductResource`](crate::resource::ProductResource)
//! is the product implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// Trait that managed resource implementations implement.
///
/// # Example
///
/// ```ignore
/// use commercetools_product_provider::{ResourceService, ProviderError, PlanResult};
/// use commercetools_product_provider::schema::{Schema, Attribute};
///
/// struct Tag;
///
/// #[async_trait::async_trait]
/// impl ResourceService for Tag {
///     fn type_name(&self) -> &'static str {
///         "example_tag"
///     }
///
///     fn schema(&self) -> Schema {
///         Schema::v0().with_attribute("name", Attribute::required_string())
///     }
///
///     // ... implement the lifecycle methods
/// }
/// ```
#[async_trait]
pub trait ResourceService: Send + Sync + 'static {
    // =========================================================================
    // Schema
    // =========================================================================

    /// The resource type name as the host addresses it.
    fn type_name(&self) -> &'static str;

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Validate a resource's configuration before planning.
    ///
    /// By default this checks the document against [`Self::schema`].
    async fn validate_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema(), &config))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Plan changes for a resource. `prior_state` is `None` on create.
    async fn plan(
        &self,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource from its planned state.
    async fn create(&self, planned_state: Value) -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    ///
    /// Returns `None` when the resource no longer exists remotely.
    async fn read(&self, current_state: Value) -> Result<Option<Value>, ProviderError>;

    /// Update an existing resource.
    async fn update(&self, prior_state: Value, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, current_state: Value) -> Result<(), ProviderError>;

    /// Import an existing remote resource into management.
    async fn import(&self, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            self.type_name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ResourceService for Echo {
        fn type_name(&self) -> &'static str {
            "test_echo"
        }

        fn schema(&self) -> Schema {
            Schema::v0()
                .with_attribute("name", Attribute::required_string())
                .with_attribute("id", Attribute::computed_string())
        }

        async fn plan(
            &self,
            _prior_state: Option<Value>,
            proposed_state: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::no_change(proposed_state))
        }

        async fn create(&self, planned_state: Value) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn read(&self, current_state: Value) -> Result<Option<Value>, ProviderError> {
            Ok(Some(current_state))
        }

        async fn update(
            &self,
            _prior_state: Value,
            planned_state: Value,
        ) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn delete(&self, _current_state: Value) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_validate_config_uses_schema() {
        let diagnostics = Echo.validate_config(json!({})).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));

        let diagnostics = Echo.validate_config(json!({"name": "x"})).await.unwrap();
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_default_import_is_unimplemented() {
        let err = Echo.import("abc").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));
        assert!(err.to_string().contains("test_echo"));
    }
}
