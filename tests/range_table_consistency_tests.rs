//! Registry-wide range-table properties.
//!
//! Rather than spot-checking individual tables, walk every registered
//! attribute descriptor and assert the invariants the engine relies on:
//! discrete entries round-trip in both directions, continuous bounds are
//! ordered, and table selection is stable for every supported model family.

use rsspecan::attribute::{Access, AttributeRegistry, DataType};
use rsspecan::range_table::{RangeTable, PRECISION_FLOOR};

const MODELS: &[&str] = &["FSW-26", "FSV-30", "FSVA-13", "FSQ-8", ""];

#[test]
fn every_discrete_entry_round_trips() {
    for desc in AttributeRegistry::global().descriptors() {
        for model in MODELS {
            let Some(table) = desc.range.select(model) else {
                continue;
            };
            let RangeTable::Discrete(entries) = table else {
                continue;
            };
            for entry in *entries {
                let token = table
                    .write_token(desc.name, entry.value, desc.precision)
                    .unwrap_or_else(|e| panic!("{}: write mapping failed: {e}", desc.name));
                assert_eq!(token, entry.command, "{}", desc.name);

                let value = table
                    .read_value(desc.name, &token, false)
                    .unwrap_or_else(|e| panic!("{}: read mapping failed: {e}", desc.name));
                assert!(
                    (value - entry.value).abs() <= PRECISION_FLOOR,
                    "{}: {} -> {token} -> {value}",
                    desc.name,
                    entry.value
                );
            }
        }
    }
}

#[test]
fn discrete_tables_have_unique_values_and_tokens() {
    for desc in AttributeRegistry::global().descriptors() {
        for model in MODELS {
            let Some(RangeTable::Discrete(entries)) = desc.range.select(model) else {
                continue;
            };
            for (i, a) in entries.iter().enumerate() {
                for b in &entries[i + 1..] {
                    assert!(
                        (a.value - b.value).abs() > PRECISION_FLOOR,
                        "{}: duplicate value {}",
                        desc.name,
                        a.value
                    );
                    assert_ne!(a.command, b.command, "{}: duplicate token", desc.name);
                }
            }
        }
    }
}

#[test]
fn continuous_bounds_are_ordered() {
    for desc in AttributeRegistry::global().descriptors() {
        for model in MODELS {
            let Some(RangeTable::Continuous { min, max }) = desc.range.select(model) else {
                continue;
            };
            assert!(min < max, "{}: empty range [{min}, {max}]", desc.name);
        }
    }
}

#[test]
fn event_attributes_are_write_only_and_unranged() {
    for desc in AttributeRegistry::global().descriptors() {
        if desc.data_type == DataType::Event {
            assert_eq!(desc.access, Access::WriteOnly, "{}", desc.name);
            assert!(desc.range.select("FSW-26").is_none(), "{}", desc.name);
        }
    }
}

#[test]
fn read_only_attributes_never_carry_write_styles() {
    use rsspecan::attribute::WriteStyle;
    for desc in AttributeRegistry::global().descriptors() {
        if desc.access == Access::ReadOnly {
            assert!(
                matches!(desc.write_style, WriteStyle::Plain),
                "{}: write style on a read-only attribute",
                desc.name
            );
        }
    }
}

#[test]
fn model_selection_is_deterministic() {
    for desc in AttributeRegistry::global().descriptors() {
        for model in MODELS {
            let first = desc.range.select(model);
            let second = desc.range.select(model);
            match (first, second) {
                (None, None) => {}
                (Some(a), Some(b)) => assert!(std::ptr::eq(a, b), "{}", desc.name),
                _ => panic!("{}: unstable selection", desc.name),
            }
        }
    }
}
