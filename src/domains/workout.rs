use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Trainer-owned plan. Read-only to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub exercises: ExerciseSchedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl WorkoutPlan {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            duration_weeks: None,
            category: None,
            goal: None,
            difficulty: None,
            exercises: ExerciseSchedule::default(),
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Count(u64),
    Amount(f64),
    Text(String),
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Amount(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Quantity>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExerciseDetail {
    /// "3 x 10", "3 sets", "10 reps", optionally followed by "for 45".
    pub fn prescription(&self) -> Option<String> {
        let volume = match (&self.sets, &self.reps) {
            (Some(sets), Some(reps)) => Some(format!("{sets} x {reps}")),
            (Some(sets), None) => Some(format!("{sets} sets")),
            (None, Some(reps)) => Some(format!("{reps} reps")),
            (None, None) => None,
        };
        match (volume, &self.duration) {
            (Some(volume), Some(duration)) => Some(format!("{volume} for {duration}")),
            (Some(volume), None) => Some(volume),
            (None, Some(duration)) => Some(format!("for {duration}")),
            (None, None) => None,
        }
    }
}

/// A single exercise entry: a bare name, a structured record, or whatever
/// else the server stored for that slot. `Raw` must stay last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exercise {
    Named(String),
    Detailed(ExerciseDetail),
    Raw(Value),
}

impl Exercise {
    pub fn label(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Detailed(detail) => match detail.name.as_deref().filter(|n| !n.is_empty()) {
                Some(name) => name.to_string(),
                None => serde_json::to_string(detail).unwrap_or_default(),
            },
            Self::Raw(value) => match value.get("name") {
                Some(Value::String(name)) if !name.is_empty() => name.clone(),
                Some(name) if is_truthy(name) => name.to_string(),
                _ => value.to_string(),
            },
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayExercises {
    Listed(Vec<Exercise>),
    Unconfigured(Value),
}

impl DayExercises {
    pub fn exercises(&self) -> &[Exercise] {
        match self {
            Self::Listed(list) => list,
            Self::Unconfigured(_) => &[],
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Listed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingDay {
    pub day: String,
    pub exercises: DayExercises,
}

/// Day name to exercises, in the order the server sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseSchedule {
    days: Vec<TrainingDay>,
}

impl ExerciseSchedule {
    pub fn new(days: Vec<TrainingDay>) -> Self {
        Self { days }
    }

    pub fn days(&self) -> &[TrainingDay] {
        &self.days
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, name: &str) -> Option<&TrainingDay> {
        self.days
            .iter()
            .find(|day| day.day.eq_ignore_ascii_case(name))
    }
}

impl Serialize for ExerciseSchedule {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for day in &self.days {
            map.serialize_entry(&day.day, &day.exercises)?;
        }
        map.end()
    }
}

struct ScheduleVisitor;

impl<'de> Visitor<'de> for ScheduleVisitor {
    type Value = ExerciseSchedule;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping from day name to exercises")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(ExerciseSchedule::default())
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(ExerciseSchedule::default())
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut days = Vec::new();
        while let Some((day, exercises)) = access.next_entry::<String, DayExercises>()? {
            days.push(TrainingDay { day, exercises });
        }
        Ok(ExerciseSchedule { days })
    }

    fn visit_seq<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut days = Vec::new();
        while let Some(exercises) = access.next_element::<DayExercises>()? {
            days.push(TrainingDay {
                day: format!("Day {}", days.len() + 1),
                exercises,
            });
        }
        Ok(ExerciseSchedule { days })
    }
}

impl<'de> Deserialize<'de> for ExerciseSchedule {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ScheduleVisitor)
    }
}
