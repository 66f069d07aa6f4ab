use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// CSV / `records` column names, in table order (the `ID` column comes first
/// and is not part of the CSV).
pub const COLUMNS: [&str; 42] = [
    "Name",
    "Sex",
    "Event",
    "Equipment",
    "Age",
    "AgeClass",
    "BirthYearClass",
    "Division",
    "BodyweightKg",
    "WeightClassKg",
    "Squat1Kg",
    "Squat2Kg",
    "Squat3Kg",
    "Squat4Kg",
    "Best3SquatKg",
    "Bench1Kg",
    "Bench2Kg",
    "Bench3Kg",
    "Bench4Kg",
    "Best3BenchKg",
    "Deadlift1Kg",
    "Deadlift2Kg",
    "Deadlift3Kg",
    "Deadlift4Kg",
    "Best3DeadliftKg",
    "TotalKg",
    "Place",
    "Dots",
    "Wilks",
    "Glossbrenner",
    "Goodlift",
    "Tested",
    "Country",
    "State",
    "Federation",
    "ParentFederation",
    "Date",
    "MeetCountry",
    "MeetState",
    "MeetTown",
    "MeetName",
    "Sanctioned",
];

/// One competition result. Attempt weights are signed: negative means a
/// failed attempt, zero means not taken.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub sex: String,
    pub event: String,
    pub equipment: String,
    #[serde(deserialize_with = "empty_as_zero")]
    pub age: f64,
    pub age_class: String,
    pub birth_year_class: String,
    pub division: String,
    #[serde(deserialize_with = "empty_as_zero")]
    pub bodyweight_kg: f64,
    pub weight_class_kg: String,
    #[serde(deserialize_with = "empty_as_zero")]
    pub squat1_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub squat2_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub squat3_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub squat4_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub best3_squat_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub bench1_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub bench2_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub bench3_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub bench4_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub best3_bench_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub deadlift1_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub deadlift2_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub deadlift3_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub deadlift4_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub best3_deadlift_kg: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub total_kg: f64,
    pub place: String,
    #[serde(deserialize_with = "empty_as_zero")]
    pub dots: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub wilks: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub glossbrenner: f64,
    #[serde(deserialize_with = "empty_as_zero")]
    pub goodlift: f64,
    pub tested: String,
    pub country: String,
    pub state: String,
    pub federation: String,
    pub parent_federation: String,
    pub date: String,
    pub meet_country: String,
    pub meet_state: String,
    pub meet_town: String,
    pub meet_name: String,
    pub sanctioned: String,
}

/// Empty cells read as 0.0, the "not attempted" value. Anything else must be a
/// finite number.
fn empty_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| D::Error::custom(format!("invalid number {trimmed:?}")))?;
    if !value.is_finite() {
        return Err(D::Error::custom(format!("non-finite number {trimmed:?}")));
    }
    Ok(value)
}
