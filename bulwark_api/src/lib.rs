pub mod config;
pub mod constants;
pub mod error;

/// Returns true if the value is equal to its type's default value.
///
/// Used with `#[serde(skip_serializing_if = "is_default")]`.
pub(crate) fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}
