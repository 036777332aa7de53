use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Trend {
    Stable => "STABLE",
    Worsening => "WORSENING",
    Improving => "IMPROVING",
    Indeterminate => "INDETERMINATE",
    InsufficientData => "INSUFFICIENT_DATA",
});

str_enum!(OverallAssessment {
    UrgentAttention => "URGENT_ATTENTION",
    AttentionAdvised => "ATTENTION_ADVISED",
    MonitoringRecommended => "MONITORING_RECOMMENDED",
    Stable => "STABLE",
});

str_enum!(Channel {
    Email => "EMAIL",
    Sms => "SMS",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn trend_round_trip() {
        for (variant, s) in [
            (Trend::Stable, "STABLE"),
            (Trend::Worsening, "WORSENING"),
            (Trend::Improving, "IMPROVING"),
            (Trend::Indeterminate, "INDETERMINATE"),
            (Trend::InsufficientData, "INSUFFICIENT_DATA"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Trend::from_str(s).unwrap(), variant);
            assert_eq!(serde_json::to_string(&variant).unwrap(), format!("\"{s}\""));
        }
    }

    #[test]
    fn overall_assessment_round_trip() {
        for (variant, s) in [
            (OverallAssessment::UrgentAttention, "URGENT_ATTENTION"),
            (OverallAssessment::AttentionAdvised, "ATTENTION_ADVISED"),
            (OverallAssessment::MonitoringRecommended, "MONITORING_RECOMMENDED"),
            (OverallAssessment::Stable, "STABLE"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(OverallAssessment::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Trend::from_str("stable").is_err());
        assert!(Channel::from_str("PIGEON").is_err());
        assert!(OverallAssessment::from_str("").is_err());
    }
}
