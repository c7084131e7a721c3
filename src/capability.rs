//! Repeated-capability resolution.
//!
//! Many SCPI commands are parameterized by an instance number: which display
//! window, which marker, which trace, which limit line. Attribute command
//! templates carry those slots as `{name}` placeholders
//! (`"CALC{window}:MARK{marker}:X"`), and a [`CapabilityContext`] supplies
//! the qualifiers that fill them, positionally, at call time.
//!
//! A template with no placeholders ignores the context entirely, so callers
//! may pass a non-empty context defensively without failing.

use std::str::FromStr;

use crate::error::{DriverError, DriverResult};

/// Ordered list of instance qualifiers for one command invocation.
///
/// Qualifiers are consumed left to right by the placeholders of the command
/// template. They are usually small indices, occasionally named tokens.
///
/// ```
/// use rsspecan::capability::{resolve_command, CapabilityContext};
///
/// let ctx = CapabilityContext::new().with_index(2).with_index(1);
/// let cmd = resolve_command("DISP:WIND{window}:TRAC{trace}:MODE", &ctx).unwrap();
/// assert_eq!(cmd, "DISP:WIND2:TRAC1:MODE");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityContext {
    qualifiers: Vec<String>,
}

impl CapabilityContext {
    /// Empty context, for attributes without repeated capabilities.
    pub const fn none() -> Self {
        Self {
            qualifiers: Vec::new(),
        }
    }

    /// Start building a context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a numeric instance qualifier.
    pub fn with_index(mut self, index: u32) -> Self {
        self.qualifiers.push(index.to_string());
        self
    }

    /// Append a literal qualifier token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.qualifiers.push(token.into());
        self
    }

    /// Number of qualifiers supplied.
    pub fn len(&self) -> usize {
        self.qualifiers.len()
    }

    /// True when no qualifiers were supplied.
    pub fn is_empty(&self) -> bool {
        self.qualifiers.is_empty()
    }

    fn get(&self, index: usize) -> Option<&str> {
        self.qualifiers.get(index).map(String::as_str)
    }
}

impl FromStr for CapabilityContext {
    type Err = DriverError;

    /// Parse the legacy comma-separated qualifier form, e.g. `"2,1"`.
    fn from_str(s: &str) -> DriverResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::none());
        }
        let mut ctx = Self::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(DriverError::InvalidRepeatedCapability(format!(
                    "blank qualifier in capability string '{s}'"
                )));
            }
            ctx = ctx.with_token(part);
        }
        Ok(ctx)
    }
}

/// Substitute the context's qualifiers into a command template.
///
/// Each `{name}` placeholder consumes the next qualifier; the placeholder
/// name is only used for diagnostics. Returns the fully resolved command
/// with no remaining placeholders, or `InvalidRepeatedCapability` when the
/// context runs short, a qualifier is blank, or a brace never closes.
pub fn resolve_command(template: &str, ctx: &CapabilityContext) -> DriverResult<String> {
    let mut resolved = String::with_capacity(template.len() + 8);
    let mut rest = template;
    let mut slot = 0usize;

    while let Some(open) = rest.find('{') {
        resolved.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            DriverError::InvalidRepeatedCapability(format!(
                "unterminated placeholder in command template '{template}'"
            ))
        })?;
        let name = &after[..close];

        let qualifier = ctx.get(slot).ok_or_else(|| {
            DriverError::InvalidRepeatedCapability(format!(
                "no qualifier for placeholder '{{{name}}}' (slot {slot}) in '{template}'"
            ))
        })?;
        if qualifier.trim().is_empty() {
            return Err(DriverError::InvalidRepeatedCapability(format!(
                "blank qualifier for placeholder '{{{name}}}' (slot {slot})"
            )));
        }
        resolved.push_str(qualifier.trim());

        slot += 1;
        rest = &after[close + 1..];
    }
    resolved.push_str(rest);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_without_placeholders_ignores_context() {
        let ctx = CapabilityContext::new().with_index(2);
        let cmd = resolve_command("FREQ:CENT", &ctx).unwrap();
        assert_eq!(cmd, "FREQ:CENT");
    }

    #[test]
    fn single_placeholder_resolves() {
        let ctx = CapabilityContext::new().with_index(4);
        let cmd = resolve_command("CALC{window}:MARK1:X", &ctx).unwrap();
        assert_eq!(cmd, "CALC4:MARK1:X");
    }

    #[test]
    fn placeholders_consume_qualifiers_positionally() {
        let ctx = CapabilityContext::new().with_index(2).with_index(1);
        let cmd = resolve_command("Win{w}:TRAC{t}", &ctx).unwrap();
        assert_eq!(cmd, "Win2:TRAC1");
    }

    #[test]
    fn short_context_is_rejected() {
        let ctx = CapabilityContext::new().with_index(2);
        let err = resolve_command("Win{w}:TRAC{t}", &ctx).unwrap_err();
        assert!(matches!(err, DriverError::InvalidRepeatedCapability(_)));
        assert!(err.to_string().contains("{t}"));
    }

    #[test]
    fn empty_context_rejected_when_template_has_placeholders() {
        let err = resolve_command("CALC{window}:MARK{marker}", &CapabilityContext::none())
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidRepeatedCapability(_)));
    }

    #[test]
    fn blank_qualifier_is_rejected() {
        let ctx = CapabilityContext::new().with_token("  ");
        let err = resolve_command("CALC{window}:MARK1", &ctx).unwrap_err();
        assert!(matches!(err, DriverError::InvalidRepeatedCapability(_)));
    }

    #[test]
    fn unterminated_placeholder_is_rejected() {
        let ctx = CapabilityContext::new().with_index(1);
        let err = resolve_command("CALC{window:MARK1", &ctx).unwrap_err();
        assert!(matches!(err, DriverError::InvalidRepeatedCapability(_)));
    }

    #[test]
    fn legacy_comma_string_parses() {
        let ctx: CapabilityContext = "2,1".parse().unwrap();
        assert_eq!(ctx, CapabilityContext::new().with_index(2).with_index(1));

        let empty: CapabilityContext = "".parse().unwrap();
        assert!(empty.is_empty());

        assert!("2,,1".parse::<CapabilityContext>().is_err());
    }
}
