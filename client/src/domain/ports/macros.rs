//! Helper macro for port error enums.
//!
//! Each generated enum gets snake_case constructors that accept `impl Into`
//! arguments, plus a `label` used as a structured logging field.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*

            /// Snake-case variant name for log fields.
            pub fn label(&self) -> &'static str {
                match self {
                    $(
                        Self::$variant { .. } => ::paste::paste! { stringify!([<$variant:snake>]) },
                    )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum ProbePortError {
            Unreachable { message: String } => "unreachable: {message}",
            Status { code: u16 } => "status: {code}",
            Rejected { message: String, code: u16 } => "rejected: {message} ({code})",
            Cancelled => "cancelled",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ProbePortError::unreachable("connection refused");
        assert_eq!(err.to_string(), "unreachable: connection refused");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = ProbePortError::status(404_u16);
        assert_eq!(err.to_string(), "status: 404");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = ProbePortError::rejected("duplicate review", 409_u16);
        assert_eq!(err.to_string(), "rejected: duplicate review (409)");
    }

    #[test]
    fn labels_use_snake_case_variant_names() {
        assert_eq!(ProbePortError::unreachable("x").label(), "unreachable");
        assert_eq!(ProbePortError::rejected("x", 1_u16).label(), "rejected");
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(ProbePortError::cancelled(), ProbePortError::Cancelled);
    }
}
