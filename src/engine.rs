//! Attribute get/set dispatch.
//!
//! The engine is the single funnel every registered setting goes through:
//! look the descriptor up, check access and type, resolve capability
//! placeholders, map the value through the range table (or format it
//! directly), and perform exactly one write (or one write+read) over the
//! session. Feature functions call the typed wrappers at the bottom of this
//! module.

use crate::attribute::{
    Access, AttrId, AttributeDescriptor, AttributeRegistry, DataType, ReadStyle, WriteStyle,
};
use crate::capability::{resolve_command, CapabilityContext};
use crate::command::{
    format_block_binary, format_block_hex, format_bool, format_int, format_real, parse_bool,
    parse_int, parse_real, parse_real_with_unit, quote, strip_quotes,
};
use crate::error::{DriverError, DriverResult};
use crate::range_table::{RangeTable, PRECISION_FLOOR};
use crate::session::Session;

/// A typed attribute value crossing the engine boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Signed integer.
    Int(i64),
    /// Float.
    Real(f64),
    /// Boolean.
    Bool(bool),
    /// String.
    Text(String),
    /// Valueless command trigger.
    Event,
}

impl AttrValue {
    /// The data type this value carries.
    pub fn data_type(&self) -> DataType {
        match self {
            AttrValue::Int(_) => DataType::Int,
            AttrValue::Real(_) => DataType::Real,
            AttrValue::Bool(_) => DataType::Bool,
            AttrValue::Text(_) => DataType::Text,
            AttrValue::Event => DataType::Event,
        }
    }
}

/// Write an attribute: compose `<resolved command> <formatted value>` and
/// send it. Event attributes send the bare command.
pub async fn set_attribute(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
    value: AttrValue,
) -> DriverResult<()> {
    let desc = AttributeRegistry::global().lookup(id)?;

    if matches!(desc.access, Access::ReadOnly) {
        return Err(DriverError::AttributeNotWritable {
            attribute: desc.name,
        });
    }
    if value.data_type() != desc.data_type {
        return Err(DriverError::InvalidType {
            attribute: desc.name,
            expected: desc.data_type,
            requested: value.data_type(),
        });
    }

    let header = resolve_command(desc.command, ctx)?;

    let payload = match &value {
        AttrValue::Event => None,
        AttrValue::Bool(b) => Some(format_bool(*b).to_string()),
        AttrValue::Text(s) => Some(quote(s, desc.quoting)),
        AttrValue::Int(i) => Some(format_scalar(desc, session.model(), Some(*i), *i as f64)?),
        AttrValue::Real(r) => Some(format_scalar(desc, session.model(), None, *r)?),
    };

    let cmd = match payload {
        Some(p) => format!("{header} {p}"),
        None => header,
    };
    session.write(&cmd).await
}

/// Read an attribute: send `<resolved command>?` and parse the reply per
/// the declared data type, inverse-mapping discrete range-table tokens.
pub async fn get_attribute(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
) -> DriverResult<AttrValue> {
    let desc = AttributeRegistry::global().lookup(id)?;

    if matches!(desc.access, Access::WriteOnly)
        || desc.data_type == DataType::Event
        || desc.command.is_empty()
    {
        return Err(DriverError::AttributeNotReadable {
            attribute: desc.name,
        });
    }

    let header = resolve_command(desc.command, ctx)?;
    let raw = session.query(&format!("{header}?")).await?;
    let reply = raw.trim();

    let table = desc.range.select(session.model());
    let discrete = matches!(table, Some(RangeTable::Discrete(_)));
    let prefix_match = desc.read_style == ReadStyle::PrefixMatch;

    match desc.data_type {
        DataType::Int => {
            if discrete {
                if let Some(table) = table {
                    let value = table.read_value(desc.name, reply, prefix_match)?;
                    return Ok(AttrValue::Int(value.round() as i64));
                }
            }
            if desc.read_style == ReadStyle::StripUnit {
                Ok(AttrValue::Int(parse_real_with_unit(reply)?.round() as i64))
            } else {
                Ok(AttrValue::Int(parse_int(reply)?))
            }
        }
        DataType::Real => {
            if discrete {
                if let Some(table) = table {
                    return Ok(AttrValue::Real(table.read_value(
                        desc.name,
                        reply,
                        prefix_match,
                    )?));
                }
            }
            if desc.read_style == ReadStyle::StripUnit {
                Ok(AttrValue::Real(parse_real_with_unit(reply)?))
            } else {
                Ok(AttrValue::Real(parse_real(reply)?))
            }
        }
        DataType::Bool => Ok(AttrValue::Bool(parse_bool(reply)?)),
        DataType::Text => Ok(AttrValue::Text(strip_quotes(reply))),
        DataType::Event => Err(DriverError::AttributeNotReadable {
            attribute: desc.name,
        }),
    }
}

/// Scalar write formatting: special token, then range table or default
/// formatting, then the block/unit-suffix overrides.
fn format_scalar(
    desc: &AttributeDescriptor,
    model: &str,
    int_value: Option<i64>,
    real_value: f64,
) -> DriverResult<String> {
    if let WriteStyle::SpecialToken { value: special, token } = desc.write_style {
        let hit = match int_value {
            Some(i) => i == special,
            None => (real_value - special as f64).abs() <= PRECISION_FLOOR,
        };
        if hit {
            return Ok(token.to_string());
        }
    }
    if let (WriteStyle::BlockHex, Some(i)) = (desc.write_style, int_value) {
        return Ok(format_block_hex(i));
    }
    if let (WriteStyle::BlockBinary, Some(i)) = (desc.write_style, int_value) {
        return Ok(format_block_binary(i));
    }

    let base = match desc.range.select(model) {
        Some(table) => match (table, int_value) {
            (RangeTable::Discrete(_), _) => {
                table.write_token(desc.name, real_value, desc.precision)?
            }
            (RangeTable::Continuous { min, max }, Some(i)) => {
                let v = i as f64;
                if v < *min || v > *max {
                    return Err(DriverError::InvalidValue {
                        attribute: desc.name,
                        detail: format!("{i} outside [{min}, {max}]"),
                    });
                }
                format_int(i)
            }
            (RangeTable::Continuous { .. }, None) => {
                table.write_token(desc.name, real_value, desc.precision)?
            }
        },
        None => match int_value {
            Some(i) => format_int(i),
            None => format_real(real_value),
        },
    };

    Ok(match desc.write_style {
        WriteStyle::UnitSuffix(unit) => format!("{base}{unit}"),
        _ => base,
    })
}

// =============================================================================
// Typed wrappers
// =============================================================================

/// Write an integer attribute.
pub async fn set_int(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
    value: i64,
) -> DriverResult<()> {
    set_attribute(session, ctx, id, AttrValue::Int(value)).await
}

/// Write a float attribute.
pub async fn set_real(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
    value: f64,
) -> DriverResult<()> {
    set_attribute(session, ctx, id, AttrValue::Real(value)).await
}

/// Write a boolean attribute.
pub async fn set_bool(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
    value: bool,
) -> DriverResult<()> {
    set_attribute(session, ctx, id, AttrValue::Bool(value)).await
}

/// Write a string attribute.
pub async fn set_text(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
    value: &str,
) -> DriverResult<()> {
    set_attribute(session, ctx, id, AttrValue::Text(value.to_string())).await
}

/// Trigger an event attribute.
pub async fn send_event(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
) -> DriverResult<()> {
    set_attribute(session, ctx, id, AttrValue::Event).await
}

/// Read an integer attribute.
pub async fn get_int(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
) -> DriverResult<i64> {
    let desc = AttributeRegistry::global().lookup(id)?;
    match get_attribute(session, ctx, id).await? {
        AttrValue::Int(v) => Ok(v),
        other => Err(DriverError::InvalidType {
            attribute: desc.name,
            expected: other.data_type(),
            requested: DataType::Int,
        }),
    }
}

/// Read a float attribute.
pub async fn get_real(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
) -> DriverResult<f64> {
    let desc = AttributeRegistry::global().lookup(id)?;
    match get_attribute(session, ctx, id).await? {
        AttrValue::Real(v) => Ok(v),
        other => Err(DriverError::InvalidType {
            attribute: desc.name,
            expected: other.data_type(),
            requested: DataType::Real,
        }),
    }
}

/// Read a boolean attribute.
pub async fn get_bool(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
) -> DriverResult<bool> {
    let desc = AttributeRegistry::global().lookup(id)?;
    match get_attribute(session, ctx, id).await? {
        AttrValue::Bool(v) => Ok(v),
        other => Err(DriverError::InvalidType {
            attribute: desc.name,
            expected: other.data_type(),
            requested: DataType::Bool,
        }),
    }
}

/// Read a string attribute.
pub async fn get_text(
    session: &Session,
    ctx: &CapabilityContext,
    id: AttrId,
) -> DriverResult<String> {
    let desc = AttributeRegistry::global().lookup(id)?;
    match get_attribute(session, ctx, id).await? {
        AttrValue::Text(v) => Ok(v),
        other => Err(DriverError::InvalidType {
            attribute: desc.name,
            expected: other.data_type(),
            requested: DataType::Text,
        }),
    }
}
