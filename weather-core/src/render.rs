//! Projection of a stored weather record into labeled display rows.
//!
//! Rendering never fails: text that does not decode into a `WeatherRecord`
//! becomes a one-line fallback message instead of a report.

use std::fmt;

use crate::model::{SubmissionResult, WeatherRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Rows(Vec<Row>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub body: SectionBody,
}

/// Read-only view of one weather record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReport {
    pub title: String,
    pub sections: Vec<Section>,
}

impl WeatherReport {
    pub fn from_record(record: &WeatherRecord) -> Self {
        let current = &record.current;
        let astro = &current.astro;
        let air = &current.air_quality;

        let mut weather = Vec::with_capacity(11);
        if let Some(icon) = current.weather_icons.first() {
            weather.push(row("Icon", icon));
        }
        let description = current
            .weather_descriptions
            .first()
            .map(String::as_str)
            .unwrap_or("Unknown");
        weather.extend([
            row("Description", description),
            row("Temperature", format!("{}°C", current.temperature)),
            row("Feels Like", format!("{}°C", current.feelslike)),
            row("Humidity", format!("{}%", current.humidity)),
            row("Wind", format!("{} km/h {}", current.wind_speed, current.wind_dir)),
            row("Pressure", format!("{} hPa", current.pressure)),
            row("Cloud Cover", format!("{}%", current.cloudcover)),
            row("UV Index", &current.uv_index),
            row("Visibility", format!("{} km", current.visibility)),
            row("Is Day", if current.is_daytime() { "Day" } else { "Night" }),
        ]);

        let mut sections = vec![
            Section {
                title: "Request Info",
                body: SectionBody::Rows(vec![
                    row("Query", &record.request.query),
                    row("Language", &record.request.language),
                    row("Units", &record.request.unit),
                ]),
            },
            Section { title: "Current Weather", body: SectionBody::Rows(weather) },
            Section {
                title: "Astronomy",
                body: SectionBody::Rows(vec![
                    row("Sunrise", &astro.sunrise),
                    row("Sunset", &astro.sunset),
                    row("Moonrise", &astro.moonrise),
                    row("Moonset", &astro.moonset),
                    row("Moon Phase", &astro.moon_phase),
                    row("Moon Illumination", format!("{}%", astro.moon_illumination)),
                ]),
            },
            Section {
                title: "Air Quality",
                body: SectionBody::Rows(vec![
                    row("CO", &air.co),
                    row("NO₂", &air.no2),
                    row("O₃", &air.o3),
                    row("SO₂", &air.so2),
                    row("PM2.5", &air.pm2_5),
                    row("PM10", &air.pm10),
                    row("US EPA Index", &air.us_epa_index),
                    row("UK DEFRA Index", &air.gb_defra_index),
                ]),
            },
        ];

        if let Some(notes) = record.visible_notes() {
            sections.push(Section { title: "Notes", body: SectionBody::Text(notes.to_string()) });
        }

        Self { title: format!("Weather for {} on {}", record.location, record.date), sections }
    }

    /// Value of the first row with the given label.
    pub fn value(&self, label: &str) -> Option<&str> {
        self.sections
            .iter()
            .filter_map(|section| match &section.body {
                SectionBody::Rows(rows) => Some(rows),
                SectionBody::Text(_) => None,
            })
            .flatten()
            .find(|r| r.label == label)
            .map(|r| r.value.as_str())
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;

        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}", section.title)?;
            match &section.body {
                SectionBody::Rows(rows) => {
                    for r in rows {
                        writeln!(f, "  {}: {}", r.label, r.value)?;
                    }
                }
                SectionBody::Text(text) => {
                    for line in text.lines() {
                        writeln!(f, "  {line}")?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Report(WeatherReport),
    /// The body could not be shown; holds the message to display instead.
    Fallback(String),
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Report(report) => fmt::Display::fmt(report, f),
            Rendered::Fallback(message) => writeln!(f, "{message}"),
        }
    }
}

pub fn render(raw: &str) -> Rendered {
    match WeatherRecord::from_raw(raw) {
        Ok(record) => Rendered::Report(WeatherReport::from_record(&record)),
        Err(err) => {
            tracing::debug!(error = ?err, "weather record cannot be rendered");
            Rendered::Fallback(err.to_string())
        }
    }
}

/// The panel shown under the form: the result message, then the record
/// when the lookup succeeded.
pub fn render_submission(result: &SubmissionResult) -> String {
    let mut out = format!("{}\n", result.message);

    if let (true, Some(raw)) = (result.success, result.raw_body.as_deref()) {
        out.push('\n');
        out.push_str(&render(raw).to_string());
    }

    out
}

fn row(label: &'static str, value: impl ToString) -> Row {
    Row { label, value: value.to_string() }
}
