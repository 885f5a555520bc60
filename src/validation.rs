//! Validation of resource configuration.
//!
//! Two layers:
//!
//! - [`validate`] checks a JSON document against a [`Schema`]: presence of
//!   required attributes, value types, nested block cardinality.
//! - [`validate_product`] checks the value-level rules of a decoded product
//!   that a schema cannot express: unique SKUs, non-overlapping price
//!   scopes, country codes, timestamps, attribute value slots.
//!
//! Values the host does not know yet ([`UNKNOWN_VALUE`]) pass both layers.
//!
//! # Example
//!
//! ```
//! use commercetools_product_provider::schema::{Schema, Attribute};
//! use commercetools_product_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("count", Attribute::required_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "test", "count": "x"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("count".to_string()));
//! ```

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::adapters::parse_date_time;
use crate::field::UNKNOWN_VALUE;
use crate::model::Product;
use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};
use crate::variant::ProductVariant;

/// Check `value` against `schema`. An empty result means it conforms.
///
/// - required attributes must be present and not null;
/// - computed-only attributes are never checked, the provider owns them;
/// - values must have the declared type, and [`UNKNOWN_VALUE`] stands in for
///   any type or block;
/// - nested blocks are checked recursively, including their item counts.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut walker = Walker::default();
    walker.block(&schema.block, value, "");
    walker.diagnostics
}

/// Like [`validate`], as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    match validate(schema, value) {
        diagnostics if diagnostics.is_empty() => Ok(()),
        diagnostics => Err(diagnostics),
    }
}

/// Whether `value` conforms to `schema`.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

#[derive(Default)]
struct Walker {
    diagnostics: Vec<Diagnostic>,
}

impl Walker {
    fn report(&mut self, path: &str, summary: String, detail: Option<String>) {
        let mut diagnostic = Diagnostic::error(summary);
        if let Some(detail) = detail {
            diagnostic = diagnostic.with_detail(detail);
        }
        if !path.is_empty() {
            diagnostic = diagnostic.with_attribute(path);
        }
        self.diagnostics.push(diagnostic);
    }

    fn mismatch(&mut self, path: &str, expected: &str, got: &Value) {
        self.report(
            path,
            format!("Invalid type for attribute '{}'", path),
            Some(format!("Expected {}, got {}", expected, kind_of(got))),
        );
    }

    fn block(&mut self, block: &Block, value: &Value, path: &str) {
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Null => return,
            v if is_unknown(v) => return,
            other => {
                self.report(
                    path,
                    "Expected object".to_string(),
                    Some(format!("Got {}", kind_of(other))),
                );
                return;
            },
        };
        self.fields(block, fields, path);
    }

    fn fields(&mut self, block: &Block, fields: &Map<String, Value>, path: &str) {
        for (name, attribute) in &block.attributes {
            self.attribute(attribute, fields.get(name), &child(path, name));
        }
        for (name, nested) in &block.blocks {
            self.nested(nested, fields.get(name), &child(path, name));
        }
    }

    fn attribute(&mut self, attribute: &Attribute, value: Option<&Value>, path: &str) {
        let flags = attribute.flags;
        if flags.computed && !flags.optional && !flags.required {
            return;
        }
        match value {
            Some(value) if !value.is_null() => self.typed(&attribute.attr_type, value, path),
            _ if flags.required => self.report(
                path,
                format!("Missing required attribute '{}'", path),
                Some("Set this attribute in the configuration".to_string()),
            ),
            _ => {},
        }
    }

    fn typed(&mut self, attr_type: &AttributeType, value: &Value, path: &str) {
        if is_unknown(value) {
            return;
        }
        match (attr_type, value) {
            (AttributeType::String, Value::String(_)) | (AttributeType::Bool, Value::Bool(_)) => {},
            (AttributeType::Int64, v) if v.is_i64() => {},
            (AttributeType::List(element), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    self.typed(element, item, &child(path, &i.to_string()));
                }
            },
            (AttributeType::Map(element), Value::Object(entries)) => {
                for (key, item) in entries {
                    self.typed(element, item, &child(path, key));
                }
            },
            (expected, got) => self.mismatch(path, type_name(expected), got),
        }
    }

    fn nested(&mut self, nested: &NestedBlock, value: Option<&Value>, path: &str) {
        let value = value.filter(|v| !v.is_null());
        match (nested.nesting_mode, value) {
            (_, None) if nested.min_items > 0 => self.report(
                path,
                format!("Missing required block '{}'", path),
                Some(format!("At least {} item(s) required", nested.min_items)),
            ),
            (_, None) => {},
            (_, Some(v)) if is_unknown(v) => {},
            (BlockNestingMode::Single, Some(v)) => self.block(&nested.block, v, path),
            (BlockNestingMode::List, Some(Value::Array(items))) => {
                let count = items.len() as u32;
                if count < nested.min_items {
                    self.report(
                        path,
                        format!("Block '{}' needs at least {} item(s)", path, nested.min_items),
                        Some(format!("Got {}", count)),
                    );
                }
                if nested.max_items > 0 && count > nested.max_items {
                    self.report(
                        path,
                        format!("Block '{}' takes at most {} item(s)", path, nested.max_items),
                        Some(format!("Got {}", count)),
                    );
                }
                for (i, item) in items.iter().enumerate() {
                    self.block(&nested.block, item, &child(path, &i.to_string()));
                }
            },
            (BlockNestingMode::List, Some(other)) => self.report(
                path,
                format!("Expected list for block '{}'", path),
                Some(format!("Got {}", kind_of(other))),
            ),
        }
    }
}

// =========================================================================
// Product rules
// =========================================================================

/// Validate the value-level rules of a product record.
pub fn validate_product(product: &Product) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let Some(current) = product
        .master_data
        .as_ref()
        .and_then(|m| m.current.as_ref())
    else {
        return diagnostics;
    };

    let base = "master_data.current";
    let mut variants: Vec<(String, &ProductVariant)> = Vec::new();
    if let Some(master) = &current.master_variant {
        variants.push((format!("{}.master_variant", base), master));
    }
    for (i, variant) in current.variants.iter().enumerate() {
        variants.push((format!("{}.variant.{}", base, i), variant));
    }

    let mut skus: HashMap<&str, &str> = HashMap::new();
    for (path, variant) in &variants {
        if let Some(sku) = variant.sku.as_known() {
            if let Some(first) = skus.insert(sku.as_str(), path.as_str()) {
                diagnostics.push(
                    Diagnostic::error(format!("Duplicate SKU '{}'", sku))
                        .with_detail(format!("Also used by {}", first))
                        .with_attribute(format!("{}.sku", path)),
                );
            }
        }
        validate_prices(variant, path, &mut diagnostics);
        validate_attributes(variant, path, &mut diagnostics);
    }

    diagnostics
}

fn validate_prices(variant: &ProductVariant, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    for (i, price) in variant.prices.iter().enumerate() {
        let price_path = format!("{}.price.{}", path, i);

        if let Some(country) = price.country.as_known() {
            if !is_country_code(country) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid country code '{}'", country))
                        .with_detail("Expected a two-letter uppercase ISO 3166-1 alpha-2 code")
                        .with_attribute(format!("{}.country", price_path)),
                );
            }
        }

        for (name, field) in [
            ("valid_from", &price.valid_from),
            ("valid_until", &price.valid_until),
        ] {
            if let Some(Err(err)) = field.as_known().map(|s| parse_date_time(s)) {
                diagnostics.push(
                    Diagnostic::error("Invalid timestamp")
                        .with_detail(err.message().to_string())
                        .with_attribute(format!("{}.{}", price_path, name)),
                );
            }
        }

        for (j, earlier) in variant.prices[..i].iter().enumerate() {
            if price.conflicts_with(earlier) {
                diagnostics.push(
                    Diagnostic::error("Conflicting price scopes")
                        .with_detail(format!(
                            "Prices {} and {} share currency, country and an overlapping validity period",
                            j, i
                        ))
                        .with_attribute(price_path.clone()),
                );
            }
        }
    }
}

fn validate_attributes(variant: &ProductVariant, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let mut names = HashSet::new();
    for (i, attribute) in variant.attributes.iter().enumerate() {
        let attr_path = format!("{}.attribute.{}", path, i);

        if !names.insert(attribute.name.as_str()) {
            diagnostics.push(
                Diagnostic::error(format!("Duplicate attribute '{}'", attribute.name))
                    .with_attribute(format!("{}.name", attr_path)),
            );
        }

        let assigned = attribute.slots.populated();
        if assigned != 1 {
            diagnostics.push(
                Diagnostic::error(format!(
                    "Attribute '{}' must have exactly one value",
                    attribute.name
                ))
                .with_detail(format!("{} value(s) set", assigned))
                .with_attribute(attr_path),
            );
        }
    }
}

fn is_country_code(value: &str) -> bool {
    value.len() == 2 && value.bytes().all(|b| b.is_ascii_uppercase())
}

fn is_unknown(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

fn child(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn type_name(attr_type: &AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Bool => "bool",
        AttributeType::List(_) => "list",
        AttributeType::Map(_) => "map",
    }
}
