use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ChatId);
id_newtype!(PreferenceId);

/// Owner of stored chat and preference records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

impl FromStr for Sender {
    type Err = UnknownSender;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "user" => Ok(Sender::User),
            "ai" => Ok(Sender::Ai),
            other => Err(UnknownSender(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown chat sender '{0}'")]
pub struct UnknownSender(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAnswer {
    #[error("unknown {field} option '{value}'")]
    UnknownChoice { field: &'static str, value: String },
    #[error("comfort rating must be between 1 and 5, got {0}")]
    ComfortOutOfRange(i64),
    #[error("comfort rating must be a number, got '{0}'")]
    ComfortNotANumber(String),
}

/// Closed option set with a stable wire value and a display label per variant.
macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $value:literal, $label:literal;)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = InvalidAnswer;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let raw = raw.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.as_str().eq_ignore_ascii_case(raw))
                    .ok_or_else(|| InvalidAnswer::UnknownChoice {
                        field: $field,
                        value: raw.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum!(
    /// Total trip spend bracket, in rupees.
    Budget, "budget" {
        Under25k => "under-25k", "Under ₹25,000";
        From25kTo50k => "25k-50k", "₹25,000 - ₹50,000";
        From50kTo100k => "50k-100k", "₹50,000 - ₹1,00,000";
        From100kTo200k => "100k-200k", "₹1,00,000 - ₹2,00,000";
        Above200k => "above-200k", "Above ₹2,00,000";
    }
);

choice_enum!(
    TripDuration, "duration" {
        OneToTwoDays => "1-2-days", "1-2 Days";
        ThreeToFiveDays => "3-5-days", "3-5 Days";
        OneWeek => "1-week", "1 Week";
        TwoWeeks => "2-weeks", "2 Weeks";
        OneMonth => "1-month", "1 Month+";
    }
);

choice_enum!(
    TravelStyle, "travel style" {
        Adventure => "adventure", "Adventure & Outdoor";
        Cultural => "cultural", "Cultural & Historical";
        Relaxation => "relaxation", "Relaxation & Wellness";
        Family => "family", "Family Friendly";
        Business => "business", "Business Travel";
        Romantic => "romantic", "Romantic Getaway";
    }
);

choice_enum!(
    Accommodation, "accommodation" {
        Hotel => "hotel", "Hotels";
        Resort => "resort", "Resorts";
        Homestay => "homestay", "Homestays";
        Hostel => "hostel", "Hostels";
        Airbnb => "airbnb", "Vacation Rentals";
        Boutique => "boutique", "Boutique Properties";
    }
);

/// 1 = budget travel, 5 = luxury travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct ComfortRating(u8);

impl ComfortRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ComfortRating {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<i64> for ComfortRating {
    type Error = InvalidAnswer;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(InvalidAnswer::ComfortOutOfRange(value))
    }
}

impl From<ComfortRating> for u8 {
    fn from(value: ComfortRating) -> Self {
        value.0
    }
}

impl FromStr for ComfortRating {
    type Err = InvalidAnswer;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let value = raw
            .parse::<i64>()
            .map_err(|_| InvalidAnswer::ComfortNotANumber(raw.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for ComfortRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Trip preferences collected once per session by the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub comfort_rating: ComfortRating,
    pub budget: Budget,
    pub duration: TripDuration,
    pub travel_style: TravelStyle,
    pub accommodation: Accommodation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_use_camel_case_wire_names() {
        let prefs = Preferences {
            comfort_rating: ComfortRating::new(4).expect("rating"),
            budget: Budget::From25kTo50k,
            duration: TripDuration::ThreeToFiveDays,
            travel_style: TravelStyle::Adventure,
            accommodation: Accommodation::Hotel,
        };
        let value = serde_json::to_value(&prefs).expect("json");
        assert_eq!(
            value,
            serde_json::json!({
                "comfortRating": 4,
                "budget": "25k-50k",
                "duration": "3-5-days",
                "travelStyle": "adventure",
                "accommodation": "hotel"
            })
        );
    }

    #[test]
    fn unknown_sender_names_the_sender() {
        assert_eq!("ai".parse::<Sender>(), Ok(Sender::Ai));
        let err = "robot".parse::<Sender>().expect_err("should fail");
        assert_eq!(err, UnknownSender("robot".into()));
        assert_eq!(err.to_string(), "unknown chat sender 'robot'");
    }

    #[test]
    fn rejects_out_of_range_comfort_rating() {
        let err = serde_json::from_value::<ComfortRating>(serde_json::json!(9))
            .expect_err("should fail");
        assert!(err.to_string().contains("between 1 and 5"));
        assert_eq!("0".parse::<ComfortRating>(), Err(InvalidAnswer::ComfortOutOfRange(0)));
        assert_eq!(
            "x".parse::<ComfortRating>(),
            Err(InvalidAnswer::ComfortNotANumber("x".into()))
        );
    }

    #[test]
    fn parses_choices_case_insensitively() {
        assert_eq!("Above-200K".parse::<Budget>(), Ok(Budget::Above200k));
        assert_eq!(" boutique ".parse::<Accommodation>(), Ok(Accommodation::Boutique));
        let err = "moon".parse::<TravelStyle>().expect_err("unknown");
        assert_eq!(err.to_string(), "unknown travel style option 'moon'");
    }
}
