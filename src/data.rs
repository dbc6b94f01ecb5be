use crate::config::AppConfig;
use crate::types::{Organization, DEFAULT_TYPE};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use tracing::{debug, info};

/// One row exactly as it appears in the source file. Every column is optional
/// here; cleaning into an `Organization` happens once in `clean_row`.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawRow {
    #[serde(rename = "OrganizationName")]
    name: Option<String>,
    #[serde(rename = "OrganizationType")]
    org_type: Option<String>,
    #[serde(rename = "FinalCategories")]
    category: Option<String>,
    #[serde(rename = "Headquarter")]
    headquarter: Option<String>,
    #[serde(rename = "WebsiteUrl")]
    website_url: Option<String>,
    #[serde(rename = "AiSummary")]
    summary: Option<String>,
    #[serde(rename = "Latitude")]
    latitude: Option<String>,
    #[serde(rename = "Longitude")]
    longitude: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub kept: usize,
    pub skipped_unnamed: usize,
    pub without_coordinates: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub organizations: Vec<Organization>,
    pub report: LoadReport,
}

pub fn load_organizations(config: &AppConfig) -> Result<LoadedData> {
    info!("Loading organizations from {:?}...", config.input.data_csv);

    let file = File::open(&config.input.data_csv)
        .with_context(|| format!("Failed to open CSV file: {:?}", config.input.data_csv))?;
    let data = read_organizations(file, config.delimiter_byte())
        .with_context(|| format!("Failed to parse CSV file: {:?}", config.input.data_csv))?;

    let report = &data.report;
    info!(
        rows = report.rows,
        kept = report.kept,
        skipped = report.skipped_unnamed,
        unmapped = report.without_coordinates,
        "Loaded organizations"
    );

    Ok(data)
}

pub fn read_organizations<R: Read>(reader: R, delimiter: u8) -> Result<LoadedData> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut organizations = Vec::new();
    let mut report = LoadReport::default();

    for (line, result) in rdr.deserialize::<RawRow>().enumerate() {
        let row = result.with_context(|| format!("Malformed record at data row {}", line + 1))?;
        report.rows += 1;

        match clean_row(row) {
            Some(org) => {
                if org.coordinates().is_none() {
                    report.without_coordinates += 1;
                }
                organizations.push(org);
            }
            None => {
                debug!(row = line + 1, "Skipping record without organization name");
                report.skipped_unnamed += 1;
            }
        }
    }

    report.kept = organizations.len();
    Ok(LoadedData { organizations, report })
}

fn clean_row(row: RawRow) -> Option<Organization> {
    let name = text(row.name);
    if name.is_empty() {
        return None;
    }

    let mut org_type = text(row.org_type);
    if org_type.is_empty() {
        org_type = DEFAULT_TYPE.to_string();
    }

    let latitude = row.latitude.as_deref().and_then(parse_coordinate).filter(|v| (-90.0..=90.0).contains(v));
    let longitude = row.longitude.as_deref().and_then(parse_coordinate).filter(|v| (-180.0..=180.0).contains(v));

    Some(Organization {
        name,
        org_type,
        category: text(row.category),
        headquarter: text(row.headquarter),
        website_url: text(row.website_url),
        summary: text(row.summary),
        latitude,
        longitude,
    })
}

fn text(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Parses a coordinate written with either `.` or `,` as decimal separator.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
