//! Conversion from property strings to typed field values.

/// A type that can be parsed from a single property value.
pub trait FromProperty: Sized {
    /// Name of the target type, used in conversion errors.
    const TYPE_NAME: &'static str;

    /// Whether a blank value counts as absent rather than as input to convert.
    const BLANK_IS_ABSENT: bool = true;

    fn from_property(value: &str) -> Option<Self>;
}

impl FromProperty for String {
    const TYPE_NAME: &'static str = "string";
    const BLANK_IS_ABSENT: bool = false;

    fn from_property(value: &str) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromProperty for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_property(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

macro_rules! impl_from_property_int {
    ($($ty:ty),*) => {
        $(
            impl FromProperty for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_property(value: &str) -> Option<Self> {
                    value.trim().parse().ok()
                }
            }
        )*
    };
}

impl_from_property_int!(i16, i32, i64, u16, u32, u64, usize);

/// Splits a comma-delimited value into trimmed, non-empty tokens.
///
/// An empty or blank value yields no tokens.
pub fn split_delimited(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Compares enum constant names loosely: case-insensitive, with `-` and `_`
/// ignored, so `if-required`, `IF_REQUIRED` and `ifRequired` all match.
pub fn relaxed_eq(value: &str, constant: &str) -> bool {
    let strip = |s: &str| {
        s.trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect::<String>()
    };
    strip(value) == strip(constant)
}
