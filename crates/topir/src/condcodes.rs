//! Condition codes for comparison instructions.

use core::fmt;

/// Integer comparison condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntCC {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// Signed `<`
    SignedLessThan,
    /// Signed `>`
    SignedGreaterThan,
    /// Signed `<=`
    SignedLessThanOrEqual,
    /// Signed `>=`
    SignedGreaterThanOrEqual,
    /// Unsigned `<`
    UnsignedLessThan,
    /// Unsigned `>`
    UnsignedGreaterThan,
    /// Unsigned `<=`
    UnsignedLessThanOrEqual,
    /// Unsigned `>=`
    UnsignedGreaterThanOrEqual,
}

impl fmt::Display for IntCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntCC::Equal => "eq",
            IntCC::NotEqual => "ne",
            IntCC::SignedLessThan => "slt",
            IntCC::SignedGreaterThan => "sgt",
            IntCC::SignedLessThanOrEqual => "sle",
            IntCC::SignedGreaterThanOrEqual => "sge",
            IntCC::UnsignedLessThan => "ult",
            IntCC::UnsignedGreaterThan => "ugt",
            IntCC::UnsignedLessThanOrEqual => "ule",
            IntCC::UnsignedGreaterThanOrEqual => "uge",
        };
        write!(f, "{}", s)
    }
}

/// Ordered floating point comparison condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatCC {
    /// Ordered and equal
    Equal,
    /// Ordered and not equal
    NotEqual,
    /// Ordered and less than
    LessThan,
    /// Ordered and greater than
    GreaterThan,
    /// Ordered and less than or equal
    LessThanOrEqual,
    /// Ordered and greater than or equal
    GreaterThanOrEqual,
}

impl fmt::Display for FloatCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FloatCC::Equal => "oeq",
            FloatCC::NotEqual => "one",
            FloatCC::LessThan => "olt",
            FloatCC::GreaterThan => "ogt",
            FloatCC::LessThanOrEqual => "ole",
            FloatCC::GreaterThanOrEqual => "oge",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn test_condcode_display() {
        assert_eq!(format!("{}", IntCC::UnsignedLessThan), "ult");
        assert_eq!(format!("{}", FloatCC::NotEqual), "one");
    }
}
