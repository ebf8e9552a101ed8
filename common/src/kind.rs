//! Macros for defining kind enums.

/// Macro for defining a kind enum backed by a [`u8`] discriminant.
///
/// The enum is stored as `INT2` in Postgres and parsed from/displayed as
/// `SCREAMING_SNAKE_CASE` strings.
///
/// # Example
///
/// ```rust
/// # use crate::common::define_kind;
///
/// define_kind! {
///     #[doc = "Fuel kind."]
///     enum Fuel {
///         #[doc = "Petrol engine."]
///         Petrol = 1,
///
///         #[doc = "Battery electric."]
///         Electric = 2,
///     }
/// }
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            Eq,
            Hash,
            PartialEq,
        )]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant = $value,
            )*
        }

        impl $name {
            /// All the variants of this kind, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Converts this into its [`u8`] representation.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Converts the provided [`u8`] representation back into this
            /// kind, if it's known.
            #[must_use]
            pub fn from_u8(value: u8) -> Option<Self> {
                Self::ALL.iter().copied().find(|k| k.u8() == value)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let v = u8::try_from(i16::from_sql(ty, raw)?)?;
                Self::from_u8(v).ok_or_else(|| {
                    ::std::format!(
                        "invalid `{}` value: {v}",
                        ::core::stringify!($name),
                    )
                    .into()
                })
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                i16::from(self.u8()).to_sql(ty, w)
            }
        }
    };
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    crate::define_kind! {
        #[doc = "Test kind."]
        enum Gearbox {
            #[doc = "Manual."]
            Manual = 1,

            #[doc = "Dual clutch."]
            DualClutch = 2,
        }
    }

    #[test]
    fn round_trips_through_u8() {
        for kind in Gearbox::ALL {
            assert_eq!(Gearbox::from_u8(kind.u8()), Some(*kind));
        }
        assert_eq!(Gearbox::from_u8(0), None);
        assert_eq!(Gearbox::from_u8(3), None);
    }

    #[test]
    fn uses_screaming_snake_case() {
        assert_eq!(Gearbox::DualClutch.to_string(), "DUAL_CLUTCH");
        assert_eq!(Gearbox::from_str("MANUAL").unwrap(), Gearbox::Manual);
        assert!(Gearbox::from_str("manual").is_err());
    }
}
