//! Type-safe identifier wrappers around participant and session codes.
//!
//! The experiment framework identifies participants and sessions by short
//! opaque strings (e.g. `"k3v9x2aa"`). Wrapping them in distinct newtypes
//! prevents a session code from being used where a participant key is
//! expected. Both serialize as plain JSON strings, so they also work as
//! keys of the merged `group_decisions` maps.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_code {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing code string.
            pub fn new(code: impl Into<String>) -> Self {
                Self(code.into())
            }

            /// Borrow the code as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(code: &str) -> Self {
                Self(code.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(code: String) -> Self {
                Self(code)
            }
        }

        impl From<$name> for String {
            fn from(code: $name) -> Self {
                code.0
            }
        }
    };
}

define_code! {
    /// Stable participant code, used as the key inside merged per-group
    /// decision snapshots.
    ParticipantCode
}

define_code! {
    /// Code of the experiment session a group belongs to.
    SessionCode
}
