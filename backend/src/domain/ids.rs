//! Strongly typed identifiers for workflow records.
//!
//! Every persisted record is keyed by a positive 64-bit sequence value. The
//! newtypes keep ticket, user, and item identifiers from being swapped at call
//! sites while serialising transparently as JSON numbers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Validation errors raised when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    /// The value is not a base-10 integer.
    #[error("identifier must be an integer: {0}")]
    NotANumber(String),
    /// Identifiers start at one.
    #[error("identifier must be positive, got {0}")]
    NotPositive(i64),
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw sequence value.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Validate a raw value received from an untrusted source.
            pub const fn try_new(value: i64) -> Result<Self, IdParseError> {
                if value < 1 {
                    return Err(IdParseError::NotPositive(value));
                }
                Ok(Self(value))
            }

            /// Raw sequence value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| IdParseError::NotANumber(s.to_owned()))?;
                Self::try_new(value)
            }
        }
    };
}

define_id! {
    /// Identifier of a repair ticket.
    TicketId
}

define_id! {
    /// Identifier of a user supplied by the identity service.
    UserId
}

define_id! {
    /// Identifier of an inventory item.
    InventoryItemId
}

define_id! {
    /// Monotonic identifier of a transition log row.
    TransitionId
}

define_id! {
    /// Monotonic identifier of a work-session event.
    SessionEventId
}

define_id! {
    /// Monotonic identifier of an XP ledger entry.
    XpEntryId
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("42", Ok(TicketId::new(42)))]
    #[case(" 7 ", Ok(TicketId::new(7)))]
    #[case("0", Err(IdParseError::NotPositive(0)))]
    #[case("abc", Err(IdParseError::NotANumber("abc".to_owned())))]
    fn parses_ticket_ids(#[case] raw: &str, #[case] expected: Result<TicketId, IdParseError>) {
        assert_eq!(raw.parse::<TicketId>(), expected);
    }

    #[rstest]
    fn serialises_as_plain_number() {
        let value = serde_json::to_value(UserId::new(9)).expect("serialise id");
        assert_eq!(value, serde_json::json!(9));
    }
}
