use serde::{Deserialize, Deserializer};
use snafu::{Snafu, ensure};

pub mod cohort;
pub mod student;

///lets a patch tell "field omitted" (`None`) apart from "field set to null" (`Some(None)`)
#[allow(clippy::option_option)]
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

///a record or a field of one that breaks the data rules, always the client's fault
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ValidationError {
    #[snafu(display("Invalid `{}`: {}", field, reason))]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

pub type ValidationResult<T> = Result<T, ValidationError>;

pub fn ensure_not_blank(field: &'static str, value: &str) -> ValidationResult<()> {
    ensure!(
        !value.trim().is_empty(),
        InvalidFieldSnafu {
            field,
            reason: "must not be blank"
        }
    );
    Ok(())
}

///applies an optional-field patch: omitted keeps, null clears, a value replaces
#[allow(clippy::option_option)]
pub fn patch_optional<T>(target: &mut Option<T>, patch: Option<Option<T>>) {
    if let Some(new_value) = patch {
        *target = new_value;
    }
}

pub fn patch_required<T>(target: &mut T, patch: Option<T>) {
    if let Some(new_value) = patch {
        *target = new_value;
    }
}
