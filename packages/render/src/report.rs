//! Whole-message renderers built on [`render_bounded`].

use chrono_tz::Tz;
use incident_watch_analytics_models::WeeklyReport;
use incident_watch_database_models::StoredIncident;
use incident_watch_incident_models::Incident;

use crate::{
    Rendered,
    format::{
        NO_DATA, daily_line, hotspot_line, hourly_line, incident_line, local_date,
        stored_incident_line, summary_line, type_stat_line, violent_hour_line,
    },
    render_bounded,
};

/// Indent for lines under a section title.
const ITEM_INDENT: &str = "  ";

/// Renders the changes of one poll: new incidents first, then cleared ones.
#[must_use]
pub fn render_changes(new: &[Incident], cleared: &[Incident], tz: &Tz, budget: usize) -> Rendered {
    let header = format!("{} new, {} cleared", new.len(), cleared.len());
    let lines: Vec<String> = new
        .iter()
        .map(|incident| format!("+ {}", incident_line(incident, tz)))
        .chain(
            cleared
                .iter()
                .map(|incident| format!("- {}", incident_line(incident, tz))),
        )
        .collect();

    render_bounded(&header, &lines, budget)
}

/// Renders a list of stored incidents under `title`.
#[must_use]
pub fn render_incident_list(
    title: &str,
    incidents: &[StoredIncident],
    tz: &Tz,
    budget: usize,
) -> Rendered {
    let header = format!("{title} ({})", incidents.len());
    let lines: Vec<String> = if incidents.is_empty() {
        vec![NO_DATA.to_string()]
    } else {
        incidents
            .iter()
            .map(|incident| stored_incident_line(incident, tz))
            .collect()
    };

    render_bounded(&header, &lines, budget)
}

fn section<T>(
    lines: &mut Vec<String>,
    title: &str,
    items: &[T],
    format: impl Fn(usize, &T) -> String,
) {
    lines.push(format!("{title}:"));
    if items.is_empty() {
        lines.push(format!("{ITEM_INDENT}{NO_DATA}"));
        return;
    }
    for (i, item) in items.iter().enumerate() {
        lines.push(format!("{ITEM_INDENT}{}", format(i + 1, item)));
    }
}

/// Renders a periodic report under `title`.
///
/// Sections are emitted in a fixed order and an empty section reads
/// `no data`, so truncation always cuts from the least important end.
#[must_use]
pub fn render_report(title: &str, report: &WeeklyReport, tz: &Tz, budget: usize) -> Rendered {
    let header = format!(
        "{title}: {} to {}",
        local_date(report.window.start, tz),
        local_date(report.window.end, tz),
    );

    let mut lines = vec![summary_line(&report.summary)];
    section(&mut lines, "Top types", &report.top_types, type_stat_line);
    section(&mut lines, "Hotspots", &report.hotspots, hotspot_line);
    section(&mut lines, "Peak hours", &report.peak_hours, |_, stat| {
        hourly_line(stat)
    });
    section(&mut lines, "Daily", &report.daily, |_, stat| daily_line(stat));
    section(
        &mut lines,
        "Violent by hour",
        &report.violent_by_hour,
        |_, stat| violent_hour_line(stat),
    );

    render_bounded(&header, &lines, budget)
}
