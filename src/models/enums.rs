use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid enum value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(QuestionStatus {
    Pending => "pending",
    Wrong => "wrong",
    Partial => "partial",
    Correct => "correct",
});

str_enum!(StampColor {
    Green => "green",
    Yellow => "yellow",
    Red => "red",
});

impl Default for QuestionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl QuestionStatus {
    /// Points a status awards out of `max_points`. `None` means ungraded.
    pub fn points_for(&self, max_points: f64) -> Option<f64> {
        match self {
            Self::Pending => None,
            Self::Wrong => Some(0.0),
            Self::Partial => Some(max_points / 2.0),
            Self::Correct => Some(max_points),
        }
    }

    /// Status implied by a stamp coefficient.
    pub fn from_coefficient(coefficient: f64) -> Self {
        if coefficient >= 1.0 {
            Self::Correct
        } else if coefficient > 0.0 {
            Self::Partial
        } else {
            Self::Wrong
        }
    }
}
