//! Attribute metadata and the global attribute registry.
//!
//! Every instrument setting the driver exposes is described once, statically,
//! by an [`AttributeDescriptor`]: the SCPI command template, the value type,
//! the access mode, the legal-value domain and how values are formatted on
//! the wire. The descriptors live in per-personality constant tables and are
//! collected into one process-wide registry at first use; nothing is mutated
//! after that, so the registry is shared by reference without
//! synchronization.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{DriverError, DriverResult};
use crate::range_table::RangeSpec;

/// Opaque attribute identifier, stable across driver versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrId(pub u32);

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value type an attribute carries on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Signed integer, formatted as plain decimal.
    Int,
    /// Float, formatted with the fixed wire precision.
    Real,
    /// Boolean, formatted as `ON`/`OFF`.
    Bool,
    /// String, quoted per the attribute's quoting convention.
    Text,
    /// Command without a value (e.g. `INIT`, marker-to-peak).
    Event,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int => "Int",
            DataType::Real => "Real",
            DataType::Bool => "Bool",
            DataType::Text => "Text",
            DataType::Event => "Event",
        };
        f.write_str(name)
    }
}

/// Access mode of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Query form only.
    ReadOnly,
    /// Command form only.
    WriteOnly,
    /// Both forms.
    ReadWrite,
}

/// Write-direction formatting override.
///
/// The set of distinct behaviors is small and fixed, so it is a closed enum
/// rather than open callback dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteStyle {
    /// Default formatting for the data type.
    Plain,
    /// Append a unit token directly after the value (`20SYM`, `1.5S`).
    UnitSuffix(&'static str),
    /// Render exactly one value as a different literal token, e.g. `0` as
    /// `"LAST"`; every other value formats normally.
    SpecialToken {
        /// The value that gets replaced.
        value: i64,
        /// Its literal wire form.
        token: &'static str,
    },
    /// IEEE-488.2 hexadecimal numeric (`#H3A`).
    BlockHex,
    /// IEEE-488.2 binary numeric (`#B1010`).
    BlockBinary,
}

/// Read-direction parsing override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStyle {
    /// Default parsing for the data type.
    Plain,
    /// Compatibility mode: accept a reply that is a truncated prefix of a
    /// range-table token.
    PrefixMatch,
    /// Numeric reply may carry a trailing unit to strip.
    StripUnit,
}

/// Quoting convention for `Text` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Bare token, no quotes.
    None,
    /// Single quotes (the usual R&S convention).
    Single,
    /// Double quotes.
    Double,
}

/// Static metadata for one instrument setting.
///
/// Defined once in a personality's attribute table, immutable thereafter,
/// looked up by ID on every engine call.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDescriptor {
    /// Registry key.
    pub id: AttrId,
    /// Diagnostic name used in error messages.
    pub name: &'static str,
    /// SCPI command template, possibly with `{...}` capability placeholders.
    pub command: &'static str,
    /// Wire value type.
    pub data_type: DataType,
    /// Access mode.
    pub access: Access,
    /// Whether the template carries capability placeholders.
    pub uses_capabilities: bool,
    /// Legal-value domain, possibly model-dependent.
    pub range: RangeSpec,
    /// Float comparison tolerance against discrete range-table entries.
    pub precision: f64,
    /// Write-direction formatting override.
    pub write_style: WriteStyle,
    /// Read-direction parsing override.
    pub read_style: ReadStyle,
    /// Quoting convention for `Text` values.
    pub quoting: Quoting,
}

impl AttributeDescriptor {
    /// Descriptor with default formatting, no capabilities and no range
    /// table. The table constructors below refine it.
    pub const fn new(
        id: AttrId,
        name: &'static str,
        command: &'static str,
        data_type: DataType,
        access: Access,
    ) -> Self {
        Self {
            id,
            name,
            command,
            data_type,
            access,
            uses_capabilities: false,
            range: RangeSpec::None,
            precision: 0.0,
            write_style: WriteStyle::Plain,
            read_style: ReadStyle::Plain,
            quoting: Quoting::Single,
        }
    }

    /// Mark the command template as carrying capability placeholders.
    pub const fn with_capabilities(mut self) -> Self {
        self.uses_capabilities = true;
        self
    }

    /// Attach a legal-value domain.
    pub const fn with_range(mut self, range: RangeSpec) -> Self {
        self.range = range;
        self
    }

    /// Set the float comparison tolerance for discrete tables.
    pub const fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    /// Override write-direction formatting.
    pub const fn with_write_style(mut self, style: WriteStyle) -> Self {
        self.write_style = style;
        self
    }

    /// Override read-direction parsing.
    pub const fn with_read_style(mut self, style: ReadStyle) -> Self {
        self.read_style = style;
        self
    }

    /// Set the quoting convention for `Text` values.
    pub const fn with_quoting(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }
}

/// Process-wide descriptor lookup, keyed by attribute ID.
pub struct AttributeRegistry {
    map: HashMap<u32, &'static AttributeDescriptor>,
}

static GLOBAL: Lazy<AttributeRegistry> =
    Lazy::new(|| AttributeRegistry::from_tables(crate::instrument::ATTRIBUTE_TABLES));

impl AttributeRegistry {
    /// Build a registry from descriptor tables. IDs must be unique; a
    /// duplicate is a table-authoring bug caught in debug builds.
    pub(crate) fn from_tables(tables: &[&'static [AttributeDescriptor]]) -> Self {
        let mut map = HashMap::new();
        for table in tables {
            for desc in *table {
                let previous = map.insert(desc.id.0, desc);
                debug_assert!(
                    previous.is_none(),
                    "duplicate attribute id {} ({})",
                    desc.id,
                    desc.name
                );
            }
        }
        Self { map }
    }

    /// The shared registry covering every personality's attribute table.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Find a descriptor by ID.
    pub fn lookup(&self, id: AttrId) -> DriverResult<&'static AttributeDescriptor> {
        self.map
            .get(&id.0)
            .copied()
            .ok_or(DriverError::UnknownAttribute(id))
    }

    /// Iterate over all registered descriptors (test support).
    pub fn descriptors(&self) -> impl Iterator<Item = &'static AttributeDescriptor> + '_ {
        self.map.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_TABLE: &[AttributeDescriptor] = &[AttributeDescriptor::new(
        AttrId(9001),
        "TEST_ATTRIBUTE",
        "TEST:CMD",
        DataType::Real,
        Access::ReadWrite,
    )];

    #[test]
    fn lookup_hit_and_miss() {
        let registry = AttributeRegistry::from_tables(&[TEST_TABLE]);
        assert_eq!(registry.lookup(AttrId(9001)).unwrap().name, "TEST_ATTRIBUTE");
        assert!(matches!(
            registry.lookup(AttrId(9999)),
            Err(DriverError::UnknownAttribute(AttrId(9999)))
        ));
    }

    #[test]
    fn global_registry_has_no_duplicate_ids() {
        let registry = AttributeRegistry::global();
        let total: usize = crate::instrument::ATTRIBUTE_TABLES
            .iter()
            .map(|t| t.len())
            .sum();
        assert_eq!(registry.descriptors().count(), total);
    }

    #[test]
    fn capability_flag_matches_template_placeholders() {
        for desc in AttributeRegistry::global().descriptors() {
            let has_placeholder = desc.command.contains('{');
            assert_eq!(
                desc.uses_capabilities, has_placeholder,
                "attribute {} declares capabilities inconsistently",
                desc.name
            );
        }
    }
}
