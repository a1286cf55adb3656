use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LookupError, LookupResult};

/// Where the form is in its request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Outcome of the last finished submission, as shown under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub success: bool,
    pub message: String,
    /// Compact JSON text of the record; only set on success.
    pub raw_body: Option<String>,
}

/// The fields a form accepts through `update_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Id,
}

impl TryFrom<&str> for FormField {
    type Error = LookupError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case("id") {
            Ok(FormField::Id)
        } else {
            Err(LookupError::UnknownField(value.to_string()))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub id_value: String,
    pub phase: Phase,
    pub last_result: Option<SubmissionResult>,
}

impl FormState {
    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn update_field(&mut self, name: &str, value: impl Into<String>) -> LookupResult<()> {
        match FormField::try_from(name)? {
            FormField::Id => self.id_value = value.into(),
        }
        Ok(())
    }
}

/// A leaf value of the record. The service passes through whatever the
/// upstream provider sent, so numbers and strings are both accepted and
/// displayed as-is. A null or absent leaf shows as an empty value.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl Scalar {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Flag(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RequestEcho {
    pub query: Scalar,
    pub language: Scalar,
    pub unit: Scalar,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Astro {
    pub sunrise: Scalar,
    pub sunset: Scalar,
    pub moonrise: Scalar,
    pub moonset: Scalar,
    pub moon_phase: Scalar,
    pub moon_illumination: Scalar,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AirQuality {
    pub co: Scalar,
    pub no2: Scalar,
    pub o3: Scalar,
    pub so2: Scalar,
    pub pm2_5: Scalar,
    pub pm10: Scalar,
    #[serde(rename = "us-epa-index")]
    pub us_epa_index: Scalar,
    #[serde(rename = "gb-defra-index")]
    pub gb_defra_index: Scalar,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Current {
    #[serde(default)]
    pub temperature: Scalar,
    #[serde(default)]
    pub feelslike: Scalar,
    #[serde(default)]
    pub humidity: Scalar,
    #[serde(default)]
    pub wind_speed: Scalar,
    #[serde(default)]
    pub wind_dir: Scalar,
    #[serde(default)]
    pub pressure: Scalar,
    #[serde(default)]
    pub cloudcover: Scalar,
    #[serde(default)]
    pub uv_index: Scalar,
    #[serde(default)]
    pub visibility: Scalar,
    #[serde(default)]
    pub is_day: Scalar,
    pub weather_icons: Vec<String>,
    pub weather_descriptions: Vec<String>,
    pub astro: Astro,
    pub air_quality: AirQuality,
}

impl Current {
    pub fn is_daytime(&self) -> bool {
        self.is_day.as_text() == Some("yes")
    }
}

/// A stored weather record: the upstream provider payload merged with the
/// fields the record was created with.
///
/// The nested blocks and the icon/description lists must be present; any
/// leaf may be null or missing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherRecord {
    pub request: RequestEcho,
    #[serde(default)]
    pub location: Scalar,
    #[serde(default)]
    pub date: Scalar,
    #[serde(default)]
    pub notes: Option<String>,
    pub current: Current,
}

impl WeatherRecord {
    /// Decode and validate a raw body.
    ///
    /// Text that is not JSON is a `Decode` error; JSON without the expected
    /// shape is a `SchemaMismatch`.
    pub fn from_raw(raw: &str) -> LookupResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(LookupError::Decode)?;
        serde_json::from_value(value).map_err(LookupError::SchemaMismatch)
    }

    /// Notes worth showing, if any.
    pub fn visible_notes(&self) -> Option<&str> {
        self.notes.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// Body of a record creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    pub date: NaiveDate,
    pub location: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
}
