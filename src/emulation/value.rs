/// An abstract 32-bit evaluation-stack value.
///
/// Either every bit is determined ([`StackValue::Int32`]) or nothing is
/// assumed about the value at all. Arithmetic over unknowns stays unknown;
/// there is deliberately no partial-bits lattice here since the dispatch
/// machinery only ever consumes fully known keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackValue {
    /// A fully determined 32-bit integer
    Int32(i32),
    /// Nothing is known about the value
    #[default]
    Unknown,
}

impl StackValue {
    /// True if all 32 bits are determined.
    #[must_use]
    pub fn is_int32(&self) -> bool {
        matches!(self, StackValue::Int32(_))
    }

    /// True if nothing is known about the value.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, StackValue::Unknown)
    }

    /// The concrete value, if all bits are determined.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            StackValue::Int32(v) => Some(*v),
            StackValue::Unknown => None,
        }
    }

    /// Applies a binary integer operation, propagating unknowns.
    #[must_use]
    pub(crate) fn combine(self, rhs: StackValue, op: impl Fn(i32, i32) -> StackValue) -> StackValue {
        match (self, rhs) {
            (StackValue::Int32(a), StackValue::Int32(b)) => op(a, b),
            _ => StackValue::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_accessors() {
        assert!(StackValue::Int32(5).is_int32());
        assert_eq!(StackValue::Int32(5).as_i32(), Some(5));
        assert!(StackValue::Unknown.is_unknown());
        assert_eq!(StackValue::Unknown.as_i32(), None);
    }

    #[test]
    fn combine_propagates_unknown() {
        let add = |a: i32, b: i32| StackValue::Int32(a.wrapping_add(b));
        assert_eq!(
            StackValue::Int32(1).combine(StackValue::Int32(2), add),
            StackValue::Int32(3)
        );
        assert_eq!(
            StackValue::Int32(1).combine(StackValue::Unknown, add),
            StackValue::Unknown
        );
        assert_eq!(
            StackValue::Unknown.combine(StackValue::Int32(2), add),
            StackValue::Unknown
        );
    }
}
