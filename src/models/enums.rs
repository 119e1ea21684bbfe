use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
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

str_enum!(TimeSlot {
    Morning => "morning",
    Afternoon => "afternoon",
    Night => "night",
});

impl TimeSlot {
    /// All slots in chronological order.
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Night];

    /// Display label for schedule headers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Night => "Night",
        }
    }
}

str_enum!(DoseStatus {
    Pending => "pending",
    Taken => "taken",
    Missed => "missed",
    Suspected => "suspected",
});

impl DoseStatus {
    /// A terminal status can never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

str_enum!(MedicineColor {
    Primary => "primary",
    Secondary => "secondary",
    Accent => "accent",
    Lavender => "lavender",
    Sunny => "sunny",
    Care => "care",
});

impl MedicineColor {
    pub const ALL: [MedicineColor; 6] = [
        MedicineColor::Primary,
        MedicineColor::Secondary,
        MedicineColor::Accent,
        MedicineColor::Lavender,
        MedicineColor::Sunny,
        MedicineColor::Care,
    ];

    /// Draw a random display color — assigned once at creation, cosmetic only.
    pub fn random() -> Self {
        use rand::seq::SliceRandom;
        *Self::ALL
            .choose(&mut rand::thread_rng())
            .unwrap_or(&MedicineColor::Primary)
    }
}

str_enum!(NotificationKind {
    MissedDose => "missed_dose",
    WeeklyReport => "weekly_report",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn time_slot_round_trip() {
        for (variant, s) in [
            (TimeSlot::Morning, "morning"),
            (TimeSlot::Afternoon, "afternoon"),
            (TimeSlot::Night, "night"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(TimeSlot::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn dose_status_round_trip() {
        for (variant, s) in [
            (DoseStatus::Pending, "pending"),
            (DoseStatus::Taken, "taken"),
            (DoseStatus::Missed, "missed"),
            (DoseStatus::Suspected, "suspected"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(DoseStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_value_rejected() {
        let err = DoseStatus::from_str("skipped");
        assert!(err.is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!DoseStatus::Pending.is_terminal());
        assert!(DoseStatus::Taken.is_terminal());
        assert!(DoseStatus::Missed.is_terminal());
        assert!(DoseStatus::Suspected.is_terminal());
    }

    #[test]
    fn color_random_is_from_fixed_set() {
        for _ in 0..20 {
            let c = MedicineColor::random();
            assert!(MedicineColor::ALL.contains(&c));
        }
    }

    #[test]
    fn notification_kind_round_trip() {
        assert_eq!(NotificationKind::MissedDose.as_str(), "missed_dose");
        assert_eq!(
            NotificationKind::from_str("weekly_report").unwrap(),
            NotificationKind::WeeklyReport
        );
    }
}
