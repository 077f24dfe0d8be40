//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Every Washday entity
//! is keyed by a UUID generated by the store or the identity provider.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around [`uuid::Uuid`] with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `generate()`, `as_uuid()`, `parse()`
/// - `From<Uuid>`, `Into<Uuid>` and `Into<serde_json::Value>`
///
/// # Example
///
/// ```rust
/// # use washday_core::define_id;
/// define_id!(GarageId);
/// define_id!(BayId);
///
/// let garage = GarageId::generate();
/// let bay = BayId::generate();
///
/// // These are different types, so this won't compile:
/// // let _: GarageId = bay;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: ::uuid::Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random (v4) ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }

            /// Parse an ID from its hyphenated string form.
            ///
            /// # Errors
            ///
            /// Returns an error if `s` is not a valid UUID.
            pub fn parse(s: &str) -> ::core::result::Result<Self, ::uuid::Error> {
                ::uuid::Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<$name> for ::serde_json::Value {
            fn from(id: $name) -> Self {
                ::serde_json::Value::String(id.0.to_string())
            }
        }
    };
}

// An identity id doubles as the profile and vendor-profile primary key.
define_id!(IdentityId);
define_id!(VehicleId);
define_id!(ServiceId);
define_id!(ServiceAreaId);
define_id!(BookingId);
define_id!(ReviewId);

/// Vendors are identities operating under the vendor role, so a vendor id
/// is the same UUID as the owning identity.
pub type VendorId = IdentityId;
