//! The reconciliation engine.
//!
//! [`compute_update`] turns an observed product record and a planned one into
//! the ordered list of update actions the platform must apply. The order is
//! part of the contract: the platform applies actions in sequence, and a
//! different order can land on a different end state.
//!
//! Both inputs are borrowed and never mutated. Every compared field goes
//! through [`differs_from`](crate::field::Field::differs_from), so unknown
//! planned values never produce an action.

use std::collections::{BTreeSet, HashMap};

use crate::actions::{ProductUpdateAction, PublishScope};
use crate::adapters::localized_value;
use crate::error::ProviderError;
use crate::field::Field;
use crate::model::{Product, ProductData};
use crate::platform::{ResourceIdentifier, CATEGORY_TYPE_ID, TAX_CATEGORY_TYPE_ID};
use crate::variant::{prices_differ, ProductVariant};

/// Compute the actions that turn `current` into `planned`.
pub fn compute_update(
    current: &Product,
    planned: &Product,
) -> Result<Vec<ProductUpdateAction>, ProviderError> {
    let current_master = current.master_data()?;
    let planned_master = planned.master_data()?;
    let current_data = current_master.current()?;
    let planned_data = planned_master.current()?;

    let mut actions = Vec::new();

    // Top-level scalars
    if planned.key.differs_from(&current.key) {
        actions.push(ProductUpdateAction::SetKey {
            key: planned.key.as_known().cloned(),
        });
    }
    if planned.price_mode.differs_from(&current.price_mode) {
        actions.push(ProductUpdateAction::SetPriceMode {
            price_mode: planned.price_mode.as_known().copied(),
        });
    }
    if planned.tax_category.differs_from(&current.tax_category) {
        actions.push(ProductUpdateAction::SetTaxCategory {
            tax_category: planned
                .tax_category
                .as_known()
                .map(|id| ResourceIdentifier::by_id(TAX_CATEGORY_TYPE_ID, id.clone())),
        });
    }

    product_data_actions(current_data, planned_data, &mut actions)?;

    // Publish state
    if planned_master.published.differs_from(&current_master.published) {
        if planned_master.published.as_known() == Some(&true) {
            actions.push(ProductUpdateAction::Publish {
                scope: PublishScope::All,
            });
        } else {
            actions.push(ProductUpdateAction::Unpublish);
        }
    }

    actions.extend(compute_variant_update(
        current_data.master_variant()?,
        planned_data.master_variant()?,
    )?);

    variants_actions(&current_data.variants, &planned_data.variants, &mut actions)?;

    Ok(actions)
}

fn product_data_actions(
    current: &ProductData,
    planned: &ProductData,
    actions: &mut Vec<ProductUpdateAction>,
) -> Result<(), ProviderError> {
    if planned.name.differs_from(&current.name) {
        actions.push(ProductUpdateAction::ChangeName {
            name: planned.require_name()?.clone(),
            staged: false,
        });
    }
    if planned.description.differs_from(&current.description) {
        actions.push(ProductUpdateAction::SetDescription {
            description: localized_value(&planned.description),
            staged: false,
        });
    }
    if planned.slug.differs_from(&current.slug) {
        actions.push(ProductUpdateAction::ChangeSlug {
            slug: planned.require_slug()?.clone(),
            staged: false,
        });
    }
    if planned.meta_title.differs_from(&current.meta_title) {
        actions.push(ProductUpdateAction::SetMetaTitle {
            meta_title: localized_value(&planned.meta_title),
            staged: false,
        });
    }
    if planned.meta_description.differs_from(&current.meta_description) {
        actions.push(ProductUpdateAction::SetMetaDescription {
            meta_description: localized_value(&planned.meta_description),
            staged: false,
        });
    }
    if planned.meta_keywords.differs_from(&current.meta_keywords) {
        actions.push(ProductUpdateAction::SetMetaKeywords {
            meta_keywords: localized_value(&planned.meta_keywords),
            staged: false,
        });
    }

    // Categories are a set; an unknown plan leaves them alone.
    if !planned.categories.is_unknown() {
        let current_ids = current.category_ids();
        let planned_ids = planned.category_ids();
        for id in planned_ids.iter().filter(|id| !current_ids.contains(id)) {
            actions.push(ProductUpdateAction::AddToCategory {
                category: ResourceIdentifier::by_id(CATEGORY_TYPE_ID, id.clone()),
                staged: false,
            });
        }
        for id in current_ids.iter().filter(|id| !planned_ids.contains(id)) {
            actions.push(ProductUpdateAction::RemoveFromCategory {
                category: ResourceIdentifier::by_id(CATEGORY_TYPE_ID, id.clone()),
                staged: false,
            });
        }
    }

    Ok(())
}

fn variants_actions(
    current: &[ProductVariant],
    planned: &[ProductVariant],
    actions: &mut Vec<ProductUpdateAction>,
) -> Result<(), ProviderError> {
    let mut by_id: HashMap<i64, &ProductVariant> = HashMap::with_capacity(current.len());
    for variant in current {
        by_id.insert(variant.require_id()?, variant);
    }

    for variant in planned {
        let matched = variant.id.as_known().and_then(|id| by_id.remove(id));
        match matched {
            Some(existing) => actions.extend(compute_variant_update(existing, variant)?),
            None => actions.push(variant.add_action()?),
        }
    }

    // Whatever was not matched is no longer planned.
    for variant in current {
        let id = variant.require_id()?;
        if by_id.contains_key(&id) {
            actions.push(ProductUpdateAction::RemoveVariant { id, staged: false });
        }
    }

    Ok(())
}

/// Compute the actions that turn the `current` variant into `planned`.
///
/// Prices are replaced as a whole when they differ. Every planned attribute is
/// re-asserted unless its value is still unknown; current attributes missing
/// from the plan are removed, in name order.
pub fn compute_variant_update(
    current: &ProductVariant,
    planned: &ProductVariant,
) -> Result<Vec<ProductUpdateAction>, ProviderError> {
    let variant_id = current.require_id()?;
    let mut actions = Vec::new();

    if planned.sku.differs_from(&current.sku) {
        actions.push(ProductUpdateAction::SetSku {
            variant_id,
            sku: planned.sku.as_known().cloned(),
            staged: false,
        });
    }
    if planned.key.differs_from(&current.key) {
        actions.push(ProductUpdateAction::SetProductVariantKey {
            variant_id,
            key: planned.key.as_known().cloned(),
            staged: false,
        });
    }

    if prices_differ(&planned.prices, &current.prices) {
        actions.push(ProductUpdateAction::SetPrices {
            variant_id,
            prices: planned.price_drafts()?,
            staged: false,
        });
    }

    let mut stale: BTreeSet<&str> = current.attributes.iter().map(|a| a.name.as_str()).collect();
    for attribute in &planned.attributes {
        stale.remove(attribute.name.as_str());
        let value = match attribute.slots.resolve() {
            Field::Unknown => continue,
            value => value.into_option(),
        };
        actions.push(ProductUpdateAction::SetAttribute {
            variant_id,
            name: attribute.name.clone(),
            value,
            staged: false,
        });
    }
    for name in stale {
        actions.push(ProductUpdateAction::SetAttribute {
            variant_id,
            name: name.to_string(),
            value: None,
            staged: false,
        });
    }

    Ok(actions)
}

/// Whether `planned` changes an immutable field, forcing a new product.
pub fn requires_replace(current: &Product, planned: &Product) -> bool {
    planned.product_type.differs_from(&current.product_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AttributeSlots;
    use crate::field::Field;
    use crate::model::{MasterData, ProductData};
    use crate::platform::{AttributeValue, LocalizedString, PriceMode};
    use crate::testing::{remote_from_draft, sample_product};
    use crate::variant::{Money, Price, VariantAttribute};
    use proptest::prelude::*;

    fn en(text: &str) -> LocalizedString {
        LocalizedString::from([("en".to_string(), text.to_string())])
    }

    fn created(planned: &Product) -> Product {
        let draft = planned.to_draft().unwrap();
        Product::from_remote(&remote_from_draft("product-1", &draft).unwrap()).unwrap()
    }

    fn variant(id: Option<i64>, sku: &str) -> ProductVariant {
        ProductVariant {
            id: Field::from_option(id),
            sku: Field::known(sku),
            ..ProductVariant::default()
        }
    }

    fn bool_attr(name: &str, value: bool) -> VariantAttribute {
        VariantAttribute {
            name: name.to_string(),
            slots: AttributeSlots {
                bool_value: Field::Known(value),
                ..AttributeSlots::default()
            },
        }
    }

    fn text_attr(name: &str, value: &str) -> VariantAttribute {
        VariantAttribute {
            name: name.to_string(),
            slots: AttributeSlots {
                text_value: Field::known(value),
                ..AttributeSlots::default()
            },
        }
    }

    fn with_current(product: &mut Product, f: impl FnOnce(&mut ProductData)) {
        f(product
            .master_data_mut()
            .unwrap()
            .current_mut()
            .unwrap());
    }

    #[test]
    fn test_identical_records_need_no_actions() {
        let state = created(&sample_product());
        assert!(compute_update(&state, &state).unwrap().is_empty());
    }

    #[test]
    fn test_identical_records_reassert_attributes() {
        let mut state = created(&sample_product());
        with_current(&mut state, |data| {
            data.master_variant_mut().unwrap().attributes = vec![bool_attr("waterproof", true)];
        });
        assert_eq!(
            compute_update(&state, &state).unwrap(),
            vec![ProductUpdateAction::SetAttribute {
                variant_id: 1,
                name: "waterproof".to_string(),
                value: Some(AttributeValue::Bool(true)),
                staged: false,
            }]
        );
    }

    #[test]
    fn test_plan_equal_to_created_state_needs_no_actions() {
        let planned = sample_product();
        let state = created(&planned);

        // A plan carries the state's computed values and unknown price ids.
        let mut plan = planned.clone();
        plan.id = state.id.clone();
        plan.version = state.version.clone();
        plan.master_data_mut().unwrap().has_staged_changes = Field::Known(false);
        with_current(&mut plan, |data| {
            let master = data.master_variant_mut().unwrap();
            master.id = Field::Known(1);
            for price in &mut master.prices {
                price.id = Field::Unknown;
            }
        });

        assert!(compute_update(&state, &plan).unwrap().is_empty());
    }

    #[test]
    fn test_name_change_is_a_single_action() {
        let state = created(&sample_product());
        let mut plan = state.clone();
        with_current(&mut plan, |data| data.name = Field::Known(en("Boot")));

        let actions = compute_update(&state, &plan).unwrap();
        assert_eq!(
            actions,
            vec![ProductUpdateAction::ChangeName {
                name: en("Boot"),
                staged: false,
            }]
        );
    }

    #[test]
    fn test_action_order() {
        let state = created(&sample_product());
        let mut plan = state.clone();
        plan.key = Field::known("new-key");
        plan.price_mode = Field::Known(PriceMode::Standalone);
        plan.tax_category = Field::known("tax-1");
        plan.master_data_mut().unwrap().published = Field::Known(false);
        with_current(&mut plan, |data| {
            data.slug = Field::Known(en("boot"));
            data.name = Field::Known(en("Boot"));
            data.description = Field::Null;
            data.meta_title = Field::Known(en("Boots"));
            data.categories = Field::Known(vec!["cat-2".to_string()]);
            data.master_variant_mut().unwrap().sku = Field::known("s1-new");
        });

        let names: Vec<&str> = compute_update(&state, &plan)
            .unwrap()
            .iter()
            .map(ProductUpdateAction::name)
            .collect();
        assert_eq!(
            names,
            vec![
                "setKey",
                "setPriceMode",
                "setTaxCategory",
                "changeName",
                "setDescription",
                "changeSlug",
                "setMetaTitle",
                "addToCategory",
                "removeFromCategory",
                "unpublish",
                "setSku",
            ]
        );
    }

    #[test]
    fn test_unset_scalars_carry_null() {
        let mut state = created(&sample_product());
        state.tax_category = Field::known("tax-1");
        let mut plan = state.clone();
        plan.key = Field::Null;
        plan.tax_category = Field::Null;

        let actions = compute_update(&state, &plan).unwrap();
        assert_eq!(
            actions,
            vec![
                ProductUpdateAction::SetKey { key: None },
                ProductUpdateAction::SetTaxCategory { tax_category: None },
            ]
        );
    }

    #[test]
    fn test_unknown_plan_values_never_differ() {
        let state = created(&sample_product());
        let mut plan = state.clone();
        plan.key = Field::Unknown;
        plan.tax_category = Field::Unknown;
        plan.price_mode = Field::Unknown;
        plan.master_data_mut().unwrap().published = Field::Unknown;
        with_current(&mut plan, |data| {
            data.description = Field::Unknown;
            data.categories = Field::Unknown;
            data.master_variant_mut().unwrap().sku = Field::Unknown;
        });

        assert!(compute_update(&state, &plan).unwrap().is_empty());
    }

    #[test]
    fn test_publish_transitions() {
        let state = created(&sample_product());
        let mut unpublished = state.clone();
        unpublished.master_data_mut().unwrap().published = Field::Known(false);

        assert_eq!(
            compute_update(&unpublished, &state).unwrap(),
            vec![ProductUpdateAction::Publish {
                scope: PublishScope::All
            }]
        );
        assert_eq!(
            compute_update(&state, &unpublished).unwrap(),
            vec![ProductUpdateAction::Unpublish]
        );
    }

    #[test]
    fn test_variant_set_algebra() {
        let mut state = created(&sample_product());
        with_current(&mut state, |data| {
            data.variants = vec![
                variant(Some(2), "a"),
                variant(Some(3), "b"),
                variant(Some(4), "c"),
            ];
        });
        let mut plan = state.clone();
        with_current(&mut plan, |data| {
            data.variants = vec![
                variant(Some(3), "b"),
                variant(Some(4), "c"),
                variant(None, "d"),
            ];
        });

        let actions = compute_update(&state, &plan).unwrap();
        assert_eq!(
            actions,
            vec![
                ProductUpdateAction::AddVariant {
                    sku: Some("d".to_string()),
                    key: None,
                    prices: vec![],
                    attributes: vec![],
                    staged: false,
                },
                ProductUpdateAction::RemoveVariant { id: 2, staged: false },
            ]
        );
    }

    #[test]
    fn test_unknown_variant_id_is_an_addition() {
        let state = created(&sample_product());
        let mut plan = state.clone();
        with_current(&mut plan, |data| {
            data.variants = vec![ProductVariant {
                id: Field::Unknown,
                ..variant(None, "new")
            }];
        });

        let actions = compute_update(&state, &plan).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name(), "addVariant");
    }

    #[test]
    fn test_leftover_variants_removed_in_current_order() {
        let mut state = created(&sample_product());
        with_current(&mut state, |data| {
            data.variants = vec![
                variant(Some(7), "x"),
                variant(Some(3), "y"),
                variant(Some(5), "z"),
            ];
        });
        let mut plan = state.clone();
        with_current(&mut plan, |data| data.variants.clear());

        let actions = compute_update(&state, &plan).unwrap();
        assert_eq!(
            actions,
            vec![
                ProductUpdateAction::RemoveVariant { id: 7, staged: false },
                ProductUpdateAction::RemoveVariant { id: 3, staged: false },
                ProductUpdateAction::RemoveVariant { id: 5, staged: false },
            ]
        );
    }

    #[test]
    fn test_attribute_reassert_then_remove() {
        let current = ProductVariant {
            attributes: vec![bool_attr("a", true), text_attr("b", "x")],
            ..variant(Some(1), "s1")
        };
        let planned = ProductVariant {
            attributes: vec![bool_attr("a", true)],
            ..current.clone()
        };

        let actions = compute_variant_update(&current, &planned).unwrap();
        assert_eq!(
            actions,
            vec![
                ProductUpdateAction::SetAttribute {
                    variant_id: 1,
                    name: "a".to_string(),
                    value: Some(AttributeValue::Bool(true)),
                    staged: false,
                },
                ProductUpdateAction::SetAttribute {
                    variant_id: 1,
                    name: "b".to_string(),
                    value: None,
                    staged: false,
                },
            ]
        );
    }

    #[test]
    fn test_leftover_attributes_sorted_by_name() {
        let current = ProductVariant {
            attributes: vec![text_attr("zeta", "1"), text_attr("alpha", "2")],
            ..variant(Some(1), "s1")
        };
        let planned = ProductVariant {
            attributes: vec![],
            ..current.clone()
        };

        let names: Vec<String> = compute_variant_update(&current, &planned)
            .unwrap()
            .into_iter()
            .filter_map(|a| match a {
                ProductUpdateAction::SetAttribute { name, value: None, .. } => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_unknown_attribute_value_is_left_alone() {
        let reference = |id: Field<String>| VariantAttribute {
            name: "ref".to_string(),
            slots: AttributeSlots {
                product_type_reference_value: id,
                ..AttributeSlots::default()
            },
        };
        let current = ProductVariant {
            attributes: vec![reference(Field::known("pt-9"))],
            ..variant(Some(1), "s1")
        };
        let mut planned = current.clone();
        planned.attributes = vec![reference(Field::Unknown)];

        assert!(compute_variant_update(&current, &planned).unwrap().is_empty());

        planned.attributes.push(text_attr("color", "red"));
        assert_eq!(
            compute_variant_update(&current, &planned).unwrap(),
            vec![ProductUpdateAction::SetAttribute {
                variant_id: 1,
                name: "color".to_string(),
                value: Some(AttributeValue::Text("red".to_string())),
                staged: false,
            }]
        );
    }

    #[test]
    fn test_any_price_difference_replaces_all_prices() {
        let current = ProductVariant {
            prices: vec![
                Price {
                    id: Field::known("price-1"),
                    ..Price::new(Money::new(1000, "USD"))
                },
                Price {
                    id: Field::known("price-2"),
                    ..Price::new(Money::new(9000, "NOK"))
                },
            ],
            ..variant(Some(1), "s1")
        };
        let mut planned = current.clone();
        planned.prices[1].value.cent_amount = Field::Known(9500);

        let actions = compute_variant_update(&current, &planned).unwrap();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            ProductUpdateAction::SetPrices {
                variant_id, prices, ..
            } => {
                assert_eq!(*variant_id, 1);
                assert_eq!(prices.len(), 2);
                assert_eq!(prices[0].value.cent_amount, 1000);
                assert_eq!(prices[1].value.cent_amount, 9500);
            },
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_variant_key_and_sku_changes() {
        let current = variant(Some(2), "s2");
        let planned = ProductVariant {
            sku: Field::Null,
            key: Field::known("v2"),
            ..current.clone()
        };

        assert_eq!(
            compute_variant_update(&current, &planned).unwrap(),
            vec![
                ProductUpdateAction::SetSku {
                    variant_id: 2,
                    sku: None,
                    staged: false,
                },
                ProductUpdateAction::SetProductVariantKey {
                    variant_id: 2,
                    key: Some("v2".to_string()),
                    staged: false,
                },
            ]
        );
    }

    #[test]
    fn test_empty_slots_fail_fast() {
        let state = created(&sample_product());

        let mut plan = state.clone();
        plan.master_data = None;
        assert!(matches!(
            compute_update(&state, &plan),
            Err(ProviderError::Internal(_))
        ));

        let mut plan = state.clone();
        plan.master_data_mut().unwrap().current = None;
        assert!(compute_update(&state, &plan).is_err());
        assert!(compute_update(&plan, &state).is_err());

        let mut plan = state.clone();
        with_current(&mut plan, |data| data.master_variant = None);
        assert!(compute_update(&state, &plan).is_err());
    }

    #[test]
    fn test_null_name_is_rejected() {
        let state = created(&sample_product());
        let mut plan = state.clone();
        with_current(&mut plan, |data| data.name = Field::Null);
        assert!(matches!(
            compute_update(&state, &plan),
            Err(ProviderError::Internal(_))
        ));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let state = created(&sample_product());
        let mut plan = state.clone();
        with_current(&mut plan, |data| data.variants = vec![variant(None, "n")]);
        let (state_before, plan_before) = (state.clone(), plan.clone());

        compute_update(&state, &plan).unwrap();
        assert_eq!(state, state_before);
        assert_eq!(plan, plan_before);
    }

    #[test]
    fn test_requires_replace_on_product_type_change() {
        let state = created(&sample_product());
        let mut plan = state.clone();
        assert!(!requires_replace(&state, &plan));
        plan.product_type = Field::known("pt-other");
        assert!(requires_replace(&state, &plan));
        plan.product_type = Field::Unknown;
        assert!(!requires_replace(&state, &plan));
    }

    fn arb_localized() -> impl Strategy<Value = Field<LocalizedString>> {
        prop_oneof![
            Just(Field::Null),
            "[a-z]{1,8}".prop_map(|s| Field::Known(en(&s))),
        ]
    }

    fn arb_variant(id: i64) -> impl Strategy<Value = ProductVariant> {
        (
            prop::option::of("[a-z0-9]{1,6}"),
            prop::collection::vec((1i64..10_000, prop::sample::select(vec!["USD", "EUR"])), 0..3),
            prop::collection::vec(("[a-c]", any::<bool>()), 0..3),
        )
            .prop_map(move |(sku, prices, attributes)| ProductVariant {
                id: Field::Known(id),
                key: Field::Null,
                sku: Field::from_option(sku),
                prices: prices
                    .into_iter()
                    .enumerate()
                    .map(|(i, (amount, currency))| Price {
                        id: Field::known(format!("price-{}-{}", id, i)),
                        ..Price::new(Money::new(amount, currency))
                    })
                    .collect(),
                attributes: attributes
                    .into_iter()
                    .map(|(name, value)| bool_attr(&name, value))
                    .collect(),
            })
    }

    fn arb_product() -> impl Strategy<Value = Product> {
        (
            prop::option::of("[a-z]{1,6}"),
            any::<bool>(),
            arb_localized(),
            arb_variant(1),
            prop::collection::vec(2i64..20, 0..4),
        )
            .prop_flat_map(|(key, published, description, master, ids)| {
                let extra: Vec<_> = ids.into_iter().map(arb_variant).collect();
                (
                    Just(key),
                    Just(published),
                    Just(description),
                    Just(master),
                    extra,
                )
            })
            .prop_map(|(key, published, description, master, variants)| {
                let mut seen = std::collections::HashSet::new();
                let variants = variants
                    .into_iter()
                    .filter(|v| v.id.as_known().is_some_and(|id| seen.insert(*id)))
                    .collect();
                Product {
                    id: Field::known("product-1"),
                    version: Field::Known(1),
                    key: Field::from_option(key),
                    product_type: Field::known("pt-1"),
                    tax_category: Field::Null,
                    price_mode: Field::Known(PriceMode::Embedded),
                    master_data: Some(MasterData {
                        published: Field::Known(published),
                        has_staged_changes: Field::Known(false),
                        current: Some(ProductData {
                            name: Field::Known(en("Shoe")),
                            slug: Field::Known(en("shoe")),
                            description,
                            master_variant: Some(master),
                            variants,
                            ..ProductData::default()
                        }),
                    }),
                }
            })
    }

    proptest! {
        #[test]
        fn test_compute_update_is_idempotent(product in arb_product()) {
            let actions = compute_update(&product, &product).unwrap();
            let only_reasserts = actions.iter().all(|a| matches!(
                a,
                ProductUpdateAction::SetAttribute { value: Some(_), .. }
            ));
            prop_assert!(only_reasserts);
        }

        #[test]
        fn test_removing_every_variant(product in arb_product()) {
            let mut plan = product.clone();
            plan.master_data.as_mut().unwrap().current.as_mut().unwrap().variants.clear();
            let removed = compute_update(&product, &plan)
                .unwrap()
                .iter()
                .filter(|a| matches!(a, ProductUpdateAction::RemoveVariant { .. }))
                .count();
            prop_assert_eq!(removed, product.current().unwrap().variants.len());
        }
    }
}
