//! Fast-path validation of an [`AgentSpec`], run before any tier.

use super::spec::AgentSpec;
use crate::error::ValidationError;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Validate an agent spec. Lengths are counted in characters, not bytes.
pub fn validate_spec(spec: &AgentSpec) -> Result<(), ValidationError> {
    let name_len = spec.name.trim().chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
        return Err(ValidationError::NameLength {
            min: NAME_MIN_CHARS,
            max: NAME_MAX_CHARS,
            actual: name_len,
        });
    }

    if let Some(description) = &spec.description {
        let len = description.chars().count();
        if len > DESCRIPTION_MAX_CHARS {
            return Err(ValidationError::DescriptionTooLong {
                max: DESCRIPTION_MAX_CHARS,
                actual: len,
            });
        }
    }

    if let Some(temperature) = spec.temperature {
        // NaN fails the range check too
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ValidationError::TemperatureOutOfRange(temperature));
        }
    }

    if spec.max_tokens == Some(0) {
        return Err(ValidationError::InvalidMaxTokens);
    }

    Ok(())
}
