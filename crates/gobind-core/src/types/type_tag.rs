use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Bits reserved below a fundamental type id.
pub const TYPE_FUNDAMENTAL_SHIFT: usize = 2;

/// Fundamental type identifiers of the native type system.
///
/// The discriminants are the native `GType` values of the fundamental types
/// (`n << TYPE_FUNDAMENTAL_SHIFT`), so a tag can be handed to the native
/// library unchanged. Derived types are reduced to their fundamental before
/// being classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(usize)]
pub enum TypeTag {
    Invalid = 0,
    None = 4,
    Interface = 8,
    Char = 12,
    UChar = 16,
    Bool = 20,
    Int = 24,
    UInt = 28,
    Long = 32,
    ULong = 36,
    Int64 = 40,
    UInt64 = 44,
    Enum = 48,
    Flags = 52,
    Float = 56,
    Double = 60,
    String = 64,
    Pointer = 68,
    Boxed = 72,
    Param = 76,
    Object = 80,
}

impl TypeTag {
    /// Classify a fundamental `GType`. Anything that is not one of the
    /// fundamentals above maps to [`TypeTag::Invalid`].
    pub fn from_gtype(gtype: usize) -> Self {
        Self::try_from(gtype).unwrap_or(TypeTag::Invalid)
    }

    pub fn gtype(self) -> usize {
        self.into()
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Invalid => "invalid",
            TypeTag::None => "void",
            TypeTag::Interface => "GInterface",
            TypeTag::Char => "gchar",
            TypeTag::UChar => "guchar",
            TypeTag::Bool => "gboolean",
            TypeTag::Int => "gint",
            TypeTag::UInt => "guint",
            TypeTag::Long => "glong",
            TypeTag::ULong => "gulong",
            TypeTag::Int64 => "gint64",
            TypeTag::UInt64 => "guint64",
            TypeTag::Enum => "GEnum",
            TypeTag::Flags => "GFlags",
            TypeTag::Float => "gfloat",
            TypeTag::Double => "gdouble",
            TypeTag::String => "gchararray",
            TypeTag::Pointer => "gpointer",
            TypeTag::Boxed => "GBoxed",
            TypeTag::Param => "GParam",
            TypeTag::Object => "GObject",
        }
    }

    /// Whether a generic value can be initialised to hold this tag without
    /// further type information.
    pub fn is_value_type(self) -> bool {
        !matches!(
            self,
            TypeTag::Invalid
                | TypeTag::None
                | TypeTag::Interface
                | TypeTag::Enum
                | TypeTag::Flags
                | TypeTag::Boxed
                | TypeTag::Param
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeTag::Char
                | TypeTag::UChar
                | TypeTag::Int
                | TypeTag::UInt
                | TypeTag::Long
                | TypeTag::ULong
                | TypeTag::Int64
                | TypeTag::UInt64
                | TypeTag::Enum
                | TypeTag::Flags
                | TypeTag::Float
                | TypeTag::Double
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_match_native_fundamentals() {
        assert_eq!(TypeTag::Invalid.gtype(), 0);
        assert_eq!(TypeTag::None.gtype(), 4);
        assert_eq!(TypeTag::Bool.gtype(), 20);
        assert_eq!(TypeTag::Int.gtype(), 24);
        assert_eq!(TypeTag::String.gtype(), 64);
        assert_eq!(TypeTag::Object.gtype(), 80);
    }

    #[test]
    fn from_gtype_round_trips_fundamentals() {
        for n in 0..=20usize {
            let gtype = n << TYPE_FUNDAMENTAL_SHIFT;
            assert_eq!(TypeTag::from_gtype(gtype).gtype(), gtype);
        }
    }

    #[test]
    fn unknown_gtype_is_invalid() {
        assert_eq!(TypeTag::from_gtype(3), TypeTag::Invalid);
        assert_eq!(TypeTag::from_gtype(21 << TYPE_FUNDAMENTAL_SHIFT), TypeTag::Invalid);
        assert_eq!(TypeTag::from_gtype(0x5555_0000), TypeTag::Invalid);
    }

    #[test]
    fn value_types() {
        assert!(TypeTag::Int.is_value_type());
        assert!(TypeTag::String.is_value_type());
        assert!(TypeTag::Object.is_value_type());
        assert!(!TypeTag::Invalid.is_value_type());
        assert!(!TypeTag::None.is_value_type());
        assert!(!TypeTag::Boxed.is_value_type());
    }

    #[test]
    fn display_uses_native_names() {
        assert_eq!(TypeTag::String.to_string(), "gchararray");
        assert_eq!(TypeTag::Bool.to_string(), "gboolean");
    }
}
