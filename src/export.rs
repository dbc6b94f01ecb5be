use crate::types::Organization;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::io::Write;

pub const COLUMNS: [&str; 8] = [
    "OrganizationName",
    "OrganizationType",
    "FinalCategories",
    "Headquarter",
    "WebsiteUrl",
    "AiSummary",
    "Latitude",
    "Longitude",
];

fn coordinate_text(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes the selected organizations with the same columns the loader reads.
pub fn write_organizations<W: Write>(writer: W, records: &[Organization], indices: &[usize], delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    wtr.write_record(COLUMNS).context("Failed to write CSV header")?;

    for org in indices.iter().filter_map(|&i| records.get(i)) {
        wtr.write_record([
            org.name.as_str(),
            org.org_type.as_str(),
            org.category.as_str(),
            org.headquarter.as_str(),
            org.website_url.as_str(),
            org.summary.as_str(),
            coordinate_text(org.latitude).as_str(),
            coordinate_text(org.longitude).as_str(),
        ])
        .with_context(|| format!("Failed to write CSV row for {:?}", org.name))?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn organizations_to_csv(records: &[Organization], indices: &[usize], delimiter: u8) -> Result<String> {
    let mut buf = Vec::new();
    write_organizations(&mut buf, records, indices, delimiter)?;
    String::from_utf8(buf).context("CSV output was not valid UTF-8")
}
