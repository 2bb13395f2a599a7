//! Renderers that turn presentation data into text.

use std::fmt::Write as _;

use safety_map_classify::ServiceCategory;
use safety_map_spatial::LocalUnitStats;

use crate::{
    DistrictPopup, FeatureDot, LocationSummary, NearestPopup, RegionSummary, SafetyStatus,
};

/// Formats presentation data for one output surface.
pub trait Renderer {
    /// Popup for a named location.
    fn location(&self, summary: &LocationSummary) -> String;

    /// Region-wide totals block.
    fn region(&self, summary: &RegionSummary) -> String;

    /// Popup for a single feature marker.
    fn feature_dot(&self, dot: &FeatureDot) -> String;

    /// Popup for a click inside the district.
    fn district(&self, popup: &DistrictPopup) -> String;

    /// Popup for a local unit.
    fn local_unit(&self, stats: &LocalUnitStats) -> String;

    /// Popup for the nearest facility.
    fn nearest(&self, popup: &NearestPopup) -> String;
}

const fn status_line(status: SafetyStatus) -> &'static str {
    match status {
        SafetyStatus::Safe => "✅ Safe",
        SafetyStatus::NotSafe => "❌ Not Safe",
        SafetyStatus::DataUnavailable => "⚠️ Data unavailable",
    }
}

const fn service_icon(category: ServiceCategory) -> &'static str {
    match category {
        ServiceCategory::Hospital => "🏥",
        ServiceCategory::Police => "🚓",
        ServiceCategory::FireStation => "🚒",
        ServiceCategory::Unknown => "🆘",
    }
}

/// Markup hooks shared by both renderers: `plain` escapes ordinary text
/// and `strong` emphasizes it.
struct Markup {
    plain: fn(&str) -> String,
    strong: fn(&str) -> String,
}

impl Markup {
    fn location_lines(&self, summary: &LocationSummary) -> Vec<String> {
        let mut lines = vec![
            format!("📍 {}", (self.plain)(&summary.name)),
            format!("🏫 {}", summary.category),
            status_line(summary.status).to_string(),
        ];
        if let Some(reason) = &summary.unavailable_reason {
            lines.push(format!("Reason: {}", (self.plain)(reason)));
        }
        for category in ServiceCategory::tracked() {
            lines.push(format!(
                "{} {}: {}",
                service_icon(*category),
                category.label(),
                summary.counts.get(*category)
            ));
        }
        lines
    }

    fn district_lines(&self, popup: &DistrictPopup) -> Vec<String> {
        let mut lines = vec![
            (self.strong)(&format!(
                "You are inside {}",
                popup.district.as_deref().unwrap_or("the district")
            )),
            format!("Lat: {:.4}, Lng: {:.4}", popup.at.lat, popup.at.lon),
            format!("Area: {:.2} sq.km", popup.area_sq_km),
        ];

        if let Some(emergency) = &popup.emergency {
            lines.push((self.strong)("Emergency service counts:"));
            for (label, count) in emergency.entries() {
                lines.push(format!("{label}: {count}"));
            }
        }

        if let Some(tourism) = &popup.tourism {
            lines.push((self.strong)("Tourism sites:"));
            for (kind, count) in tourism.iter() {
                lines.push(format!("📍 {}: {count}", (self.plain)(kind)));
            }
        }

        lines
    }

    fn local_unit_lines(&self, stats: &LocalUnitStats) -> Vec<String> {
        let mut lines = vec![
            (self.strong)(&stats.name),
            format!("Area: {:.2} sq.km", stats.area_sq_km),
        ];
        match (stats.population, stats.density_per_sq_km) {
            (Some(population), Some(density)) => {
                lines.push(format!("Population: {population}"));
                lines.push(format!("Density: {density:.2} people/sq.km"));
            }
            (Some(population), None) => lines.push(format!("Population: {population}")),
            _ => lines.push("No population data available".to_string()),
        }
        lines
    }

    fn dot_lines(&self, dot: &FeatureDot) -> Vec<String> {
        let precision = dot.precision;
        vec![
            (self.strong)(&dot.heading),
            (self.plain)(&dot.name),
            format!(
                "Lat: {:.precision$}, Lng: {:.precision$}",
                dot.coordinates.lat, dot.coordinates.lon
            ),
        ]
    }
}

const TEXT: Markup = Markup {
    plain: str::to_string,
    strong: str::to_string,
};

/// Plain terminal text, one item per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn location(&self, summary: &LocationSummary) -> String {
        TEXT.location_lines(summary).join("\n")
    }

    fn region(&self, summary: &RegionSummary) -> String {
        let mut out = String::from("Total Emergency Services Found\n");
        for category in ServiceCategory::tracked() {
            writeln!(
                out,
                "  {}: {}",
                category.label(),
                summary.totals.get(*category)
            )
            .ok();
        }
        if !summary.unavailable.is_empty() {
            writeln!(out, "Data unavailable for: {}", summary.unavailable.join(", ")).ok();
        }
        out
    }

    fn feature_dot(&self, dot: &FeatureDot) -> String {
        TEXT.dot_lines(dot).join("\n")
    }

    fn district(&self, popup: &DistrictPopup) -> String {
        TEXT.district_lines(popup).join("\n")
    }

    fn local_unit(&self, stats: &LocalUnitStats) -> String {
        TEXT.local_unit_lines(stats).join("\n")
    }

    fn nearest(&self, popup: &NearestPopup) -> String {
        format!(
            "Nearest {}: {} ({:.0} m away at {})",
            popup.service, popup.facility, popup.distance_m, popup.at
        )
    }
}

/// Escapes text for inclusion in HTML.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn bold(raw: &str) -> String {
    format!("<b>{}</b>", escape_html(raw))
}

const HTML: Markup = Markup {
    plain: escape_html,
    strong: bold,
};

/// Popup markup for a web map, lines joined with `<br>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn location(&self, summary: &LocationSummary) -> String {
        HTML.location_lines(summary).join("<br>")
    }

    fn region(&self, summary: &RegionSummary) -> String {
        let mut out = String::from("<h3>Total Emergency Services Found</h3><ul>");
        for category in ServiceCategory::tracked() {
            write!(
                out,
                "<li>{}: {}</li>",
                category.label(),
                summary.totals.get(*category)
            )
            .ok();
        }
        out.push_str("</ul>");
        if !summary.unavailable.is_empty() {
            let names: Vec<String> = summary.unavailable.iter().map(|n| escape_html(n)).collect();
            write!(out, "<p>Data unavailable for: {}</p>", names.join(", ")).ok();
        }
        out
    }

    fn feature_dot(&self, dot: &FeatureDot) -> String {
        HTML.dot_lines(dot).join("<br>")
    }

    fn district(&self, popup: &DistrictPopup) -> String {
        HTML.district_lines(popup).join("<br>")
    }

    fn local_unit(&self, stats: &LocalUnitStats) -> String {
        HTML.local_unit_lines(stats).join("<br>")
    }

    fn nearest(&self, popup: &NearestPopup) -> String {
        format!(
            "Nearest {}: <br><strong>{}</strong>",
            escape_html(&popup.service),
            escape_html(&popup.facility)
        )
    }
}
