//! Status enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table, and its text form is the
//! value used in JSON and in validation messages.

use crate::error::CoreError;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant = $val ),+
        }

        impl $name {
            /// Every variant in lifecycle order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Stable string representation matching the serde names.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }

            /// Parse the text form, rejecting unknown values with a validation error.
            pub fn parse(value: &str) -> Result<Self, CoreError> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|s| s.as_str() == value)
                    .ok_or_else(|| {
                        let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                        CoreError::Validation(format!(
                            "Invalid {} '{value}'. Must be one of: {}",
                            $label,
                            valid.join(", ")
                        ))
                    })
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Crop lifecycle status, declared in nominal lifecycle order.
    CropStatus ("status") {
        Planned = 1 => "planned",
        Planted = 2 => "planted",
        Growing = 3 => "growing",
        Mature = 4 => "mature",
        Harvested = 5 => "harvested",
        Sold = 6 => "sold",
    }
}

define_status_enum! {
    /// Farmer identity verification status.
    VerificationStatus ("verification status") {
        Pending = 1 => "pending",
        Verified = 2 => "verified",
        Rejected = 3 => "rejected",
    }
}

impl CropStatus {
    /// Statuses whose records count toward upcoming harvests.
    pub const HARVEST_WINDOW: &'static [CropStatus] = &[CropStatus::Growing, CropStatus::Mature];

    /// `sold` is the end of the nominal lifecycle.
    pub fn is_terminal(self) -> bool {
        self == CropStatus::Sold
    }
}
