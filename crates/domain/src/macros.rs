//! Macro for implementing Display and FromStr for status enums
//!
//! Stored status text keeps its canonical casing while parsing accepts any
//! casing.
//!
//! # Example
//!
//! ```rust
//! use mailroom_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum SweepState {
//!     Idle,
//!     Running,
//! }
//!
//! impl_domain_status_conversions!(SweepState {
//!     Idle => "Idle",
//!     Running => "Running",
//! });
//!
//! assert_eq!("RUNNING".parse::<SweepState>().unwrap(), SweepState::Running);
//! assert_eq!(SweepState::Idle.to_string(), "Idle");
//! ```

/// Implements Display, FromStr and `as_str` for status enums
///
/// - Display writes the canonical text exactly as given
/// - FromStr compares ASCII case-insensitively
/// - `as_str` returns the canonical text as `&'static str`
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical text stored in the database
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Pending,
        Completed,
    }

    impl_domain_status_conversions!(TestStatus {
        Pending => "Pending",
        Completed => "Completed",
    });

    #[test]
    fn test_display_keeps_canonical_casing() {
        assert_eq!(TestStatus::Pending.to_string(), "Pending");
        assert_eq!(TestStatus::Completed.as_str(), "Completed");
    }

    #[test]
    fn test_fromstr_mixed_case() {
        assert_eq!(TestStatus::from_str("pending").unwrap(), TestStatus::Pending);
        assert_eq!(TestStatus::from_str("COMPLETED").unwrap(), TestStatus::Completed);
        assert_eq!(TestStatus::from_str("CompLeted").unwrap(), TestStatus::Completed);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = TestStatus::from_str("invalid");
        assert!(result.unwrap_err().contains("Invalid TestStatus: invalid"));
        assert!(TestStatus::from_str("").is_err());
    }
}
