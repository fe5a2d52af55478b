//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Checkout backends
//! hand out opaque string identifiers, so the wrappers are string-backed.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>`, and `Into<String>` implementations
///
/// # Example
///
/// ```rust
/// # use next_checkout_core::define_id;
/// define_id!(RefId);
/// define_id!(PackageId);
///
/// let ref_id = RefId::new("ord_8f3a");
/// let package_id = PackageId::new("12");
///
/// // These are different types, so this won't compile:
/// // let _: RefId = package_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(RefId);
define_id!(PackageId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality() {
        assert_eq!(RefId::new("ord_1"), RefId::new("ord_1"));
        assert_ne!(RefId::new("ord_1"), RefId::new("ord_2"));
    }

    #[test]
    fn test_id_display() {
        let id = PackageId::new("12");
        assert_eq!(id.to_string(), "12");
        assert_eq!(id.as_str(), "12");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = RefId::new("ord_8f3a");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"ord_8f3a\"");

        let back: RefId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_from_conversions() {
        let id: PackageId = "7".into();
        assert_eq!(id, PackageId::new("7"));

        let raw: String = id.into();
        assert_eq!(raw, "7");
    }
}
