use serde::{Deserialize, Serialize};

use crate::util::clamp;

pub const MIN_NOTIFICATIONS_PER_DAY: u32 = 10;
pub const MAX_NOTIFICATIONS_PER_DAY: u32 = 50;
pub const MAX_HOUR: u32 = 24;

/// Milliseconds since the unix epoch.
pub type Timestamp = i64;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub notifications_enabled: bool,
    pub notifications_per_day: u32,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            notifications_enabled: false,
            notifications_per_day: 20,
            start_hour: 8,
            end_hour: 22,
        }
    }
}

impl Settings {
    /// Clamp the numeric fields into the ranges the settings form accepts.
    pub fn clamped(self) -> Settings {
        Settings {
            notifications_per_day: clamp(
                self.notifications_per_day,
                MIN_NOTIFICATIONS_PER_DAY,
                MAX_NOTIFICATIONS_PER_DAY,
            ),
            start_hour: clamp(self.start_hour, 0, MAX_HOUR),
            end_hour: clamp(self.end_hour, 0, MAX_HOUR),
            ..self
        }
    }

    pub fn has_valid_window(&self) -> bool {
        self.start_hour < self.end_hour
    }

    /// Fields present in `patch` replace the current ones; the rest are kept.
    pub fn patched(self, patch: &serde_json::Value) -> Result<Settings, serde_json::Error> {
        let mut merged = serde_json::to_value(self)?;
        if let (Some(target), Some(fields)) = (merged.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(merged)
    }
}

/// A day's pending reminders. `date` is the local calendar day, `YYYY-MM-DD`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub date: String,
    pub times: Vec<Timestamp>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum JawRest {
    #[default]
    Oui,
    Non,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PainLevel {
    #[default]
    Aucune,
    #[serde(rename = "Légère")]
    Legere,
    #[serde(rename = "Modérée")]
    Moderee,
    Forte,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Activity {
    #[default]
    Travail,
    #[serde(rename = "Écrans")]
    Ecrans,
    Repas,
    Sport,
    Repos,
    Autre,
}

impl Activity {
    pub fn label(&self) -> &'static str {
        match self {
            Activity::Travail => "Travail",
            Activity::Ecrans => "Écrans",
            Activity::Repas => "Repas",
            Activity::Sport => "Sport",
            Activity::Repos => "Repos",
            Activity::Autre => "Autre",
        }
    }
}

/// Questionnaire answers as submitted by the UI, before they are stamped.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Answers {
    pub jaw_rest: JawRest,
    pub pain_level: PainLevel,
    pub activity: Activity,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub jaw_rest: JawRest,
    pub pain_level: PainLevel,
    pub activity: Activity,
    /// RFC 3339
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub icon: String,
    /// The reminder this alert stands for.
    pub scheduled_at: Timestamp,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PreviewData {
    pub times: Vec<Timestamp>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToastData {
    pub message: Option<String>,
}
