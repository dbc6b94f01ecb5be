//! Ring/pie cluster icons.
//!
//! The most frequent organization type fills the inner disc. Every other type
//! gets a wedge of the surrounding ring, sized by its share of the
//! non-dominant organizations.

use crate::config::{ColorConfig, IconPreset};
use crate::types::{Organization, DEFAULT_TYPE};
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt::Write;

pub const INNER_RADIUS_RATIO: f64 = 0.65;
/// Wedges narrower than this are not drawn.
pub const MIN_SEGMENT_DEGREES: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct TypePalette {
    colors: HashMap<String, String>,
    fallback: String,
}

impl TypePalette {
    pub fn from_config(config: &ColorConfig) -> Self {
        TypePalette {
            colors: config.types.clone(),
            fallback: config.fallback.clone(),
        }
    }

    pub fn color_for(&self, org_type: &str) -> &str {
        self.colors.get(org_type).unwrap_or(&self.fallback)
    }
}

impl Default for TypePalette {
    fn default() -> Self {
        Self::from_config(&ColorConfig::default())
    }
}

pub fn icon_diameter(count: usize, preset: &IconPreset) -> f64 {
    (preset.min_size + (count as f64).sqrt() * preset.scale).clamp(preset.min_size, preset.max_size)
}

/// Occurrences per type, in the order each type is first encountered.
pub fn type_counts<'a>(orgs: impl IntoIterator<Item = &'a Organization>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for org in orgs {
        let org_type = org.display_type();
        match counts.iter_mut().find(|(t, _)| t == org_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((org_type.to_string(), 1)),
        }
    }
    counts
}

/// Parses `Type:count` entries, summing repeats into the slot of their first
/// appearance. Splits on the last `:` so type names may contain colons.
pub fn parse_type_counts<'a>(entries: impl IntoIterator<Item = &'a str>) -> Result<Vec<(String, usize)>> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for entry in entries {
        let (org_type, n) = entry
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("Expected 'Type:count', got '{}'", entry))?;
        let n: usize = n.trim().parse().with_context(|| format!("Invalid count in '{}'", entry))?;
        let org_type = match org_type.trim() {
            "" => DEFAULT_TYPE,
            t => t,
        };
        match counts.iter_mut().find(|(t, _)| t == org_type) {
            Some((_, total)) => *total += n,
            None => counts.push((org_type.to_string(), n)),
        }
    }
    Ok(counts)
}

fn dominant_slot(counts: &[(String, usize)]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, (_, n)) in counts.iter().enumerate() {
        // Strictly greater: on a tie the earlier type keeps the slot.
        if best.map_or(true, |b| *n > counts[b].1) {
            best = Some(i);
        }
    }
    best
}

pub fn dominant_type<'a>(orgs: impl IntoIterator<Item = &'a Organization>) -> Option<String> {
    let counts = type_counts(orgs);
    dominant_slot(&counts).map(|i| counts[i].0.clone())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeFill {
    pub org_type: String,
    pub color: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingSegment {
    pub fill: TypeFill,
    pub start_angle: f64,
    pub end_angle: f64,
    /// SVG path data for the wedge between the inner and outer radius.
    pub path: String,
}

impl RingSegment {
    pub fn span(&self) -> f64 {
        self.end_angle - self.start_angle
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterIcon {
    pub count: usize,
    pub diameter: f64,
    pub outer_radius: f64,
    pub inner_radius: f64,
    pub dominant: Option<TypeFill>,
    pub segments: Vec<RingSegment>,
    /// Types whose wedge fell under the minimum angle.
    pub suppressed: Vec<TypeFill>,
}

impl ClusterIcon {
    pub fn drawn_degrees(&self) -> f64 {
        self.segments.iter().map(RingSegment::span).sum()
    }

    pub fn to_svg(&self) -> String {
        let size = self.diameter;
        let c = size / 2.0;
        let mut svg = String::new();

        let _ = write!(
            svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{s:.2}" height="{s:.2}" viewBox="0 0 {s:.2} {s:.2}">"##,
            s = size
        );
        let _ = write!(
            svg,
            r##"<circle cx="{c:.2}" cy="{c:.2}" r="{r:.2}" fill="#ffffff" fill-opacity="0.85"/>"##,
            r = self.outer_radius
        );
        for segment in &self.segments {
            let _ = write!(
                svg,
                r##"<path d="{}" fill="{}" fill-rule="evenodd"/>"##,
                segment.path, segment.fill.color
            );
        }
        if let Some(dominant) = &self.dominant {
            let _ = write!(
                svg,
                r##"<circle cx="{c:.2}" cy="{c:.2}" r="{r:.2}" fill="{}"/>"##,
                dominant.color,
                r = self.inner_radius
            );
        }
        let font_size = (self.inner_radius * 0.8).max(10.0);
        let _ = write!(
            svg,
            r##"<text x="{c:.2}" y="{c:.2}" text-anchor="middle" dominant-baseline="central" font-family="sans-serif" font-weight="bold" font-size="{font_size:.1}" fill="#ffffff">{}</text>"##,
            self.count
        );
        svg.push_str("</svg>");
        svg
    }
}

pub fn render_cluster_icon(orgs: &[&Organization], preset: &IconPreset, palette: &TypePalette) -> ClusterIcon {
    render_icon_from_counts(&type_counts(orgs.iter().copied()), preset, palette)
}

/// Same icon as [`render_cluster_icon`], from per-type counts in first-seen order.
pub fn render_icon_from_counts(counts: &[(String, usize)], preset: &IconPreset, palette: &TypePalette) -> ClusterIcon {
    let counts: Vec<(String, usize)> = counts.iter().filter(|(_, n)| *n > 0).cloned().collect();
    let count = counts.iter().map(|(_, n)| n).sum();
    let diameter = icon_diameter(count, preset);
    let outer_radius = diameter / 2.0;
    let inner_radius = outer_radius * INNER_RADIUS_RATIO;

    let dominant_idx = dominant_slot(&counts);
    let fill = |(org_type, n): &(String, usize)| TypeFill {
        color: palette.color_for(org_type).to_string(),
        org_type: org_type.clone(),
        count: *n,
    };

    let rest: Vec<&(String, usize)> = counts
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != dominant_idx)
        .map(|(_, entry)| entry)
        .collect();
    let rest_total: usize = rest.iter().map(|(_, n)| n).sum();

    let mut segments = Vec::new();
    let mut suppressed = Vec::new();
    let mut cursor = 0.0;
    for entry in rest {
        let span = entry.1 as f64 / rest_total as f64 * 360.0;
        let (start, end) = (cursor, cursor + span);
        cursor = end;
        if span < MIN_SEGMENT_DEGREES {
            suppressed.push(fill(entry));
            continue;
        }
        segments.push(RingSegment {
            fill: fill(entry),
            start_angle: start,
            end_angle: end,
            path: ring_segment_path(outer_radius, inner_radius, outer_radius, start, end),
        });
    }

    ClusterIcon {
        count,
        diameter,
        outer_radius,
        inner_radius,
        dominant: dominant_idx.map(|i| fill(&counts[i])),
        segments,
        suppressed,
    }
}

/// Point on a circle around `(center, center)`, with 0° at 12 o'clock.
pub fn polar_to_cartesian(center: f64, radius: f64, angle_deg: f64) -> (f64, f64) {
    let rad = (angle_deg - 90.0) * PI / 180.0;
    (center + radius * rad.cos(), center + radius * rad.sin())
}

fn ring_segment_path(outer: f64, inner: f64, center: f64, start: f64, end: f64) -> String {
    if end - start >= 360.0 - 1e-9 {
        return full_ring_path(outer, inner, center);
    }

    let large_arc = if end - start > 180.0 { 1 } else { 0 };
    let (osx, osy) = polar_to_cartesian(center, outer, start);
    let (oex, oey) = polar_to_cartesian(center, outer, end);
    let (iex, iey) = polar_to_cartesian(center, inner, end);
    let (isx, isy) = polar_to_cartesian(center, inner, start);

    format!(
        "M {osx:.2} {osy:.2} A {outer:.2} {outer:.2} 0 {large_arc} 1 {oex:.2} {oey:.2} \
         L {iex:.2} {iey:.2} A {inner:.2} {inner:.2} 0 {large_arc} 0 {isx:.2} {isy:.2} Z"
    )
}

// An arc whose end equals its start draws nothing, so a whole ring is two halves.
fn full_ring_path(outer: f64, inner: f64, center: f64) -> String {
    format!(
        "M {c:.2} {ot:.2} A {outer:.2} {outer:.2} 0 1 1 {c:.2} {ob:.2} A {outer:.2} {outer:.2} 0 1 1 {c:.2} {ot:.2} Z \
         M {c:.2} {it:.2} A {inner:.2} {inner:.2} 0 1 0 {c:.2} {ib:.2} A {inner:.2} {inner:.2} 0 1 0 {c:.2} {it:.2} Z",
        c = center,
        ot = center - outer,
        ob = center + outer,
        it = center - inner,
        ib = center + inner,
    )
}
