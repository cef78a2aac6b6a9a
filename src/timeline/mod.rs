//! Timeline - Display List and Static Report Export
//!
//! Both views are derived from the event log on demand and never mutate it.

use crate::event_log_service::{Event, EventKind};
use crate::report_renderer::{escape_markup, render_report_card, ReportCard};
use crate::snapshot_service::ImagePayload;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the timeline
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    /// `HH:MM:SS`
    pub time_label: String,
    pub kind: EventKind,
    pub camera_id: Option<String>,
    pub location: String,
    pub assessment: String,
    pub action: String,
    pub object_count: usize,
    /// Snapshot as a `data:` URI
    pub thumbnail: Option<String>,
    pub report: Option<String>,
}

impl From<&Event> for TimelineEntry {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            timestamp: event.timestamp,
            time_label: event.timestamp.format("%H:%M:%S").to_string(),
            kind: event.kind,
            camera_id: event.camera_id.clone(),
            location: event.location.clone(),
            assessment: event.assessment.clone(),
            action: event.recommended_action.clone(),
            object_count: event.objects.len(),
            thumbnail: event.snapshot.as_ref().map(ImagePayload::to_data_uri),
            report: event.report.clone(),
        }
    }
}

/// Timeline rows in log order
pub fn timeline(events: &[Event]) -> Vec<TimelineEntry> {
    events.iter().map(TimelineEntry::from).collect()
}

/// Image for the export: the snapshot, or a synthesized card
fn export_image(event: &Event) -> ImagePayload {
    match &event.snapshot {
        Some(snapshot) => snapshot.clone(),
        None => render_report_card(&ReportCard {
            title: &format!("{} Event", event.kind.label()),
            location: &event.location,
            timestamp: event.timestamp,
            body: event.report.as_deref().unwrap_or(&event.assessment),
        }),
    }
}

const EXPORT_STYLE: &str = "body{font-family:sans-serif;background:#0b1320;color:#f1faee;margin:2rem}\
article.event{border:1px solid #1d3557;border-radius:6px;padding:1rem;margin-bottom:1.5rem}\
article.event img{max-width:100%;display:block;margin-top:.75rem}\
.meta{color:#a8dadc;font-size:.9rem}\
.objects{font-size:.9rem}";

/// Self-contained HTML report of the given events, in the given order
pub fn export_html(events: &[&Event], generated_at: DateTime<Utc>) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Patrol Station Event Report</title>\n");
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", EXPORT_STYLE));
    html.push_str("<h1>Patrol Station Event Report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Generated {} &middot; {} event(s)</p>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        events.len()
    ));

    for event in events.iter().copied() {
        html.push_str(&format!(
            "<article class=\"event\" data-event-id=\"{}\">\n",
            event.id
        ));
        html.push_str(&format!(
            "<h2>{} &middot; {}</h2>\n",
            event.kind.label(),
            escape_markup(&event.location)
        ));
        html.push_str(&format!(
            "<p class=\"meta\"><time datetime=\"{}\">{}</time></p>\n",
            event.timestamp.to_rfc3339(),
            event.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        html.push_str(&format!(
            "<p><strong>Assessment:</strong> {}</p>\n<p><strong>Action:</strong> {}</p>\n",
            escape_markup(&event.assessment),
            escape_markup(&event.recommended_action)
        ));

        if !event.objects.is_empty() {
            html.push_str("<ul class=\"objects\">\n");
            for obj in &event.objects {
                html.push_str(&format!(
                    "<li>{} ({:.0}%)</li>\n",
                    escape_markup(&obj.name),
                    obj.confidence * 100.0
                ));
            }
            html.push_str("</ul>\n");
        }

        html.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\">\n</article>\n",
            export_image(event).to_data_uri(),
            escape_markup(&event.location)
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}
