// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small declarative macros shared across kiln crates

/// `Display` for enums whose variants print as fixed words.
///
/// Variants carrying data are written `Variant(..)`.
///
/// ```ignore
/// kiln_core::simple_display! {
///     JobState {
///         Building => "building",
///         Failed => "failed",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($rest:tt)* ))? => $word:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let word = match self {
                    $( Self::$variant $(( $($rest)* ))? => $word, )+
                };
                f.write_str(word)
            }
        }
    };
}

/// Builder-style setters, expanded inside an `impl` block.
///
/// `set` fields take their value as-is; `option` fields are `Option<T>` and
/// take anything convertible into `T`.
///
/// ```ignore
/// impl BuildSettings {
///     kiln_core::setters! {
///         set { push: bool }
///         option { registry: String }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(set { $( $field:ident : $ty:ty ),* $(,)? })?
        $(option { $( $opt:ident : $opt_ty:ty ),* $(,)? })?
    ) => {
        $($(
            pub fn $field(mut self, value: $ty) -> Self {
                self.$field = value;
                self
            }
        )*)?
        $($(
            pub fn $opt(mut self, value: impl Into<$opt_ty>) -> Self {
                self.$opt = Some(value.into());
                self
            }
        )*)?
    };
}
