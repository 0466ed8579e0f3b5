use std::str::FromStr;

use shared::domain::{
    Accommodation, Budget, ComfortRating, InvalidAnswer, Preferences, TravelStyle, TripDuration,
};

/// The five questions, in the order they are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardStep {
    ComfortRating,
    Budget,
    Duration,
    TravelStyle,
    Accommodation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOption {
    pub value: &'static str,
    pub label: &'static str,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::ComfortRating,
        WizardStep::Budget,
        WizardStep::Duration,
        WizardStep::TravelStyle,
        WizardStep::Accommodation,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::ComfortRating => "What's your comfort rating?",
            WizardStep::Budget => "What's your budget range?",
            WizardStep::Duration => "How long is your trip?",
            WizardStep::TravelStyle => "What's your travel style?",
            WizardStep::Accommodation => "Preferred accommodation type?",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            WizardStep::ComfortRating => "1 = Budget travel, 5 = Luxury travel",
            WizardStep::Budget => "This helps us recommend appropriate options",
            WizardStep::Duration => "Duration helps us plan the perfect itinerary",
            WizardStep::TravelStyle => "This helps us customize your experience",
            WizardStep::Accommodation => "Choose what suits your style best",
        }
    }

    /// Accepted answers as (wire value, label). Comfort rating is a 1..=5 scale.
    pub fn options(self) -> Vec<StepOption> {
        fn collect<T: Copy>(
            all: &[T],
            value: fn(T) -> &'static str,
            label: fn(T) -> &'static str,
        ) -> Vec<StepOption> {
            all.iter()
                .map(|choice| StepOption {
                    value: value(*choice),
                    label: label(*choice),
                })
                .collect()
        }

        match self {
            WizardStep::ComfortRating => ["1", "2", "3", "4", "5"]
                .into_iter()
                .map(|value| StepOption {
                    value,
                    label: match value {
                        "1" => "Budget",
                        "5" => "Luxury",
                        _ => value,
                    },
                })
                .collect(),
            WizardStep::Budget => collect(Budget::ALL, Budget::as_str, Budget::label),
            WizardStep::Duration => {
                collect(TripDuration::ALL, TripDuration::as_str, TripDuration::label)
            }
            WizardStep::TravelStyle => {
                collect(TravelStyle::ALL, TravelStyle::as_str, TravelStyle::label)
            }
            WizardStep::Accommodation => collect(
                Accommodation::ALL,
                Accommodation::as_str,
                Accommodation::label,
            ),
        }
    }
}

/// One answer, tagged with the step it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    ComfortRating(ComfortRating),
    Budget(Budget),
    Duration(TripDuration),
    TravelStyle(TravelStyle),
    Accommodation(Accommodation),
}

impl Answer {
    pub fn step(self) -> WizardStep {
        match self {
            Answer::ComfortRating(_) => WizardStep::ComfortRating,
            Answer::Budget(_) => WizardStep::Budget,
            Answer::Duration(_) => WizardStep::Duration,
            Answer::TravelStyle(_) => WizardStep::TravelStyle,
            Answer::Accommodation(_) => WizardStep::Accommodation,
        }
    }

    pub fn parse(step: WizardStep, raw: &str) -> Result<Self, InvalidAnswer> {
        Ok(match step {
            WizardStep::ComfortRating => Answer::ComfortRating(ComfortRating::from_str(raw)?),
            WizardStep::Budget => Answer::Budget(Budget::from_str(raw)?),
            WizardStep::Duration => Answer::Duration(TripDuration::from_str(raw)?),
            WizardStep::TravelStyle => Answer::TravelStyle(TravelStyle::from_str(raw)?),
            WizardStep::Accommodation => Answer::Accommodation(Accommodation::from_str(raw)?),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesDraft {
    pub comfort_rating: ComfortRating,
    pub budget: Option<Budget>,
    pub duration: Option<TripDuration>,
    pub travel_style: Option<TravelStyle>,
    pub accommodation: Option<Accommodation>,
}

impl PreferencesDraft {
    pub fn is_answered(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::ComfortRating => true,
            WizardStep::Budget => self.budget.is_some(),
            WizardStep::Duration => self.duration.is_some(),
            WizardStep::TravelStyle => self.travel_style.is_some(),
            WizardStep::Accommodation => self.accommodation.is_some(),
        }
    }

    fn apply(&mut self, answer: Answer) {
        match answer {
            Answer::ComfortRating(v) => self.comfort_rating = v,
            Answer::Budget(v) => self.budget = Some(v),
            Answer::Duration(v) => self.duration = Some(v),
            Answer::TravelStyle(v) => self.travel_style = Some(v),
            Answer::Accommodation(v) => self.accommodation = Some(v),
        }
    }

    fn finish(&self) -> Option<Preferences> {
        Some(Preferences {
            comfort_rating: self.comfort_rating,
            budget: self.budget?,
            duration: self.duration?,
            travel_style: self.travel_style?,
            accommodation: self.accommodation?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WizardProgress {
    current: usize,
    draft: PreferencesDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The current step is unanswered or the wizard is closed; nothing changed.
    Blocked,
    Moved(WizardStep),
    Completed(Preferences),
}

/// Walks the five preference questions in order. Inactive until `start`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSequencer {
    progress: Option<WizardProgress>,
}

impl StepSequencer {
    pub fn start(&mut self) {
        self.progress = Some(WizardProgress {
            current: 0,
            draft: PreferencesDraft::default(),
        });
    }

    pub fn is_active(&self) -> bool {
        self.progress.is_some()
    }

    pub fn current_step(&self) -> Option<WizardStep> {
        self.progress
            .as_ref()
            .map(|progress| WizardStep::ALL[progress.current])
    }

    pub fn draft(&self) -> Option<&PreferencesDraft> {
        self.progress.as_ref().map(|progress| &progress.draft)
    }

    /// Stores the answer in its step's field. Ignored while inactive.
    pub fn set_answer(&mut self, answer: Answer) {
        if let Some(progress) = self.progress.as_mut() {
            progress.draft.apply(answer);
        }
    }

    pub fn can_advance(&self, step: WizardStep) -> bool {
        self.draft().is_some_and(|draft| draft.is_answered(step))
    }

    pub fn next(&mut self) -> Advance {
        let Some(progress) = self.progress.as_mut() else {
            return Advance::Blocked;
        };
        if !progress.draft.is_answered(WizardStep::ALL[progress.current]) {
            return Advance::Blocked;
        }
        if progress.current + 1 < WizardStep::ALL.len() {
            progress.current += 1;
            return Advance::Moved(WizardStep::ALL[progress.current]);
        }
        match progress.draft.finish() {
            Some(preferences) => {
                self.progress = None;
                Advance::Completed(preferences)
            }
            None => Advance::Blocked,
        }
    }

    /// Returns false at the first step or while inactive.
    pub fn back(&mut self) -> bool {
        match self.progress.as_mut() {
            Some(progress) if progress.current > 0 => {
                progress.current -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.progress = None;
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
