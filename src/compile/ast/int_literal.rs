use std::num::IntErrorKind;

#[derive(Debug, Clone)]
pub struct IntLiteral {
    value: String,
    base: u32,
}

impl IntLiteral {
    pub fn new(value: String, base: u32) -> IntLiteral {
        IntLiteral { value, base }
    }

    /// Converts the literal text into the `i32` holding its 32-bit pattern,
    /// so `0xFFFFFFFF` denotes -1. Anything that does not fit in 32 bits is
    /// out of bounds.
    pub fn parse(&self) -> Result<i32, IntLiteralError> {
        u32::from_str_radix(&self.value, self.base)
            .map(|bits| bits as i32)
            .map_err(|err| match err.kind() {
                IntErrorKind::PosOverflow => IntLiteralError::OutOfBounds,
                _ => unreachable!("Parser returned invalid number: {}", self.value),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntLiteralError {
    OutOfBounds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexadecimal_patterns_cover_the_full_word() {
        assert_eq!(Ok(-1), IntLiteral::new("FFFFFFFF".to_string(), 16).parse());
        assert_eq!(Ok(255), IntLiteral::new("FF".to_string(), 16).parse());
    }

    #[test]
    fn oversized_literals_are_rejected() {
        assert_eq!(
            Err(IntLiteralError::OutOfBounds),
            IntLiteral::new("4294967296".to_string(), 10).parse()
        );
    }
}
