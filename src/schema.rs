//! Schema types for describing resource structure.
//!
//! A [`Schema`] is a tree of [`Block`]s. Blocks hold typed [`Attribute`]s and
//! named [`NestedBlock`]s; the generic validator in [`crate::validation`]
//! walks that tree over a JSON document. [`product_schema`] declares the
//! product resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Text.
    String,
    /// Signed 64-bit integer.
    Int64,
    /// `true` or `false`.
    Bool,
    /// Ordered elements of one type.
    List(Box<AttributeType>),
    /// String keys to values of one type.
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// `List` of `element_type`.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// `Map` of string keys to `value_type`.
    pub fn map(value_type: AttributeType) -> Self {
        Self::Map(Box::new(value_type))
    }

    /// Locale to text, e.g. `{"en": "Shoe", "de": "Schuh"}`.
    pub fn localized() -> Self {
        Self::map(Self::String)
    }
}

/// Who sets an attribute: the configuration, the provider, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// Configuration must set it.
    pub required: bool,
    /// Configuration may set it.
    pub optional: bool,
    /// The provider sets it when configuration does not.
    pub computed: bool,
}

impl AttributeFlags {
    /// Set by configuration, always.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    /// Set by configuration, or left null.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Self::default()
        }
    }

    /// Set by the provider only.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Self::default()
        }
    }

    /// Set by configuration, otherwise by the provider.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Self::default()
        }
    }
}

/// One attribute of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Presence rules.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Documentation shown to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A change to this attribute replaces the resource.
    #[serde(default)]
    pub force_new: bool,
    /// Value planned when configuration leaves the attribute null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl Attribute {
    /// An attribute of the given type and presence.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
        }
    }

    /// Required string.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Optional string.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Provider-assigned string, e.g. an id.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Required integer.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    /// Provider-assigned integer, e.g. a version.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    /// Optional boolean.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Provider-assigned boolean.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    /// Required localized string.
    pub fn required_localized() -> Self {
        Self::new(AttributeType::localized(), AttributeFlags::required())
    }

    /// Optional localized string.
    pub fn optional_localized() -> Self {
        Self::new(AttributeType::localized(), AttributeFlags::optional())
    }

    /// Attach documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the resource when this attribute changes.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Plan `default` when configuration leaves the attribute null.
    ///
    /// The attribute also becomes computed, since the provider fills it in.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self.flags.computed = true;
        self
    }
}

/// How a nested block appears in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// An object, or null.
    #[default]
    Single,
    /// An ordered array of objects.
    List,
}

/// Attributes and nested blocks at one level of a document.
///
/// Both are kept sorted by name, so validation reports in a stable order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Nested blocks by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blocks: BTreeMap<String, NestedBlock>,
    /// Documentation shown to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// An empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Attach documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A block nested in a parent, with its cardinality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The nested block.
    #[serde(flatten)]
    pub block: Block,
    /// Object or array.
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Fewest items accepted. For `Single`, 1 makes the block required.
    #[serde(default)]
    pub min_items: u32,
    /// Most items accepted; 0 means no limit.
    #[serde(default)]
    pub max_items: u32,
}

impl NestedBlock {
    /// An optional object.
    pub fn single(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::Single,
            min_items: 0,
            max_items: 1,
        }
    }

    /// An unbounded array of objects.
    pub fn list(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::List,
            min_items: 0,
            max_items: 0,
        }
    }

    /// Require at least `min` items.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Accept at most `max` items.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// A versioned resource schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Bumped whenever stored state needs migrating.
    #[serde(default)]
    pub version: u64,
    /// The top level of the document.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// An empty schema at `version`.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// An empty schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add a top-level attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block = self.block.with_attribute(name, attr);
        self
    }

    /// Add a top-level nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block = self.block.with_block(name, block);
        self
    }

    /// Attach documentation to the top level.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block = self.block.with_description(description);
        self
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

// =========================================================================
// Product schema
// =========================================================================

/// The schema of the product resource.
pub fn product_schema() -> Schema {
    Schema::v0()
        .with_description(
            "An abstract sellable good with a set of Attributes defined by a Product Type.",
        )
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("version", Attribute::computed_int64())
        .with_attribute(
            "key",
            Attribute::optional_string()
                .with_description("User-defined unique identifier of the Product."),
        )
        .with_attribute(
            "product_type",
            Attribute::required_string()
                .with_description(
                    "The ID of the Product Type defining the Attributes of the Product. Cannot be changed.",
                )
                .with_force_new(),
        )
        .with_attribute(
            "tax_category",
            Attribute::optional_string().with_description("The ID of the TaxCategory of the Product."),
        )
        .with_attribute(
            "price_mode",
            Attribute::optional_string()
                .with_description("Type of Price to be used when looking up a price for the Product.")
                .with_default(serde_json::json!("Embedded")),
        )
        .with_block(
            "master_data",
            NestedBlock::single(
                Block::new()
                    .with_description("The current representation of the product information.")
                    .with_attribute(
                        "published",
                        Attribute::optional_bool()
                            .with_description("true if the Product is published.")
                            .with_default(serde_json::json!(true)),
                    )
                    .with_attribute("has_staged_changes", Attribute::computed_bool())
                    .with_block(
                        "current",
                        NestedBlock::single(product_data_block()).with_min_items(1),
                    ),
            )
            .with_min_items(1),
        )
}

fn product_data_block() -> Block {
    Block::new()
        .with_description("Current (published) data of the Product.")
        .with_attribute(
            "name",
            Attribute::required_localized().with_description("Name of the Product."),
        )
        .with_attribute(
            "slug",
            Attribute::required_localized()
                .with_description("User-defined identifier used in a deep-link URL for the Product."),
        )
        .with_attribute(
            "description",
            Attribute::optional_localized().with_description("Description of the Product."),
        )
        .with_attribute(
            "meta_title",
            Attribute::optional_localized()
                .with_description("Title of the Product displayed in search results."),
        )
        .with_attribute(
            "meta_description",
            Attribute::optional_localized()
                .with_description("Description of the Product displayed in search results."),
        )
        .with_attribute(
            "meta_keywords",
            Attribute::optional_localized()
                .with_description("Keywords that give additional information to search engines."),
        )
        .with_attribute(
            "categories",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                AttributeFlags::optional_computed(),
            )
            .with_description("IDs of Categories assigned to the Product."),
        )
        .with_block(
            "master_variant",
            NestedBlock::single(variant_block().with_description("The Master Variant of the Product."))
                .with_min_items(1),
        )
        .with_block(
            "variant",
            NestedBlock::list(variant_block().with_description("Additional Product Variants.")),
        )
}

fn variant_block() -> Block {
    Block::new()
        .with_attribute(
            "id",
            Attribute::computed_int64().with_description(
                "A unique, sequential identifier of the Product Variant within the Product.",
            ),
        )
        .with_attribute(
            "key",
            Attribute::optional_string()
                .with_description("User-defined unique identifier of the ProductVariant."),
        )
        .with_attribute(
            "sku",
            Attribute::optional_string()
                .with_description("User-defined unique SKU of the Product Variant."),
        )
        .with_block("price", NestedBlock::list(price_block()))
        .with_block("attribute", NestedBlock::list(attribute_block()))
}

fn price_block() -> Block {
    Block::new()
        .with_description("The Embedded Prices of the Product Variant.")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Unique identifier of this Price."),
        )
        .with_attribute(
            "key",
            Attribute::optional_string().with_description("User-defined identifier of the Price."),
        )
        .with_attribute(
            "country",
            Attribute::optional_string().with_description("Country for which this Price is valid."),
        )
        .with_attribute(
            "valid_from",
            Attribute::optional_string()
                .with_description("Date and time (RFC 3339) from which this Price is valid."),
        )
        .with_attribute(
            "valid_until",
            Attribute::optional_string()
                .with_description("Date and time (RFC 3339) until this Price is valid."),
        )
        .with_block(
            "value",
            NestedBlock::single(
                Block::new()
                    .with_description("Money value of this Price.")
                    .with_attribute("cent_amount", Attribute::required_int64())
                    .with_attribute("currency_code", Attribute::required_string()),
            )
            .with_min_items(1),
        )
}

fn attribute_block() -> Block {
    Block::new()
        .with_description("Attributes of the Product Variant.")
        .with_attribute("name", Attribute::required_string())
        .with_attribute("bool_value", Attribute::optional_bool())
        .with_attribute("text_value", Attribute::optional_string())
        .with_attribute("localized_text_value", Attribute::optional_localized())
        .with_attribute("product_type_reference_value", Attribute::optional_string())
}

// =========================================================================
// Diagnostics
// =========================================================================

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// The operation cannot proceed.
    Error,
    /// Worth a look; the operation proceeds.
    Warning,
}

/// A message for the user about configuration or an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: DiagnosticSeverity,
    /// One-line headline, e.g. "Duplicate SKU 's1'".
    pub summary: String,
    /// Longer explanation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted path of the offending value, e.g. `master_data.current.slug`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// An error with the given headline.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// A warning with the given headline.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Attach a longer explanation.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Point at the offending value.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
