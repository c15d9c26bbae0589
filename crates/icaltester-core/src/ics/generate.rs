//! Calendar feed generation.

use chrono::{DateTime, Utc};

use super::text::escape_text;
use crate::date::{exclusive_end, format_wire_date, format_wire_timestamp};
use crate::event::FeedEvent;

/// Product identifier used when none is supplied.
pub const DEFAULT_PROD_ID: &str = "-//icaltester//ICS Mock//EN";

/// Summary emitted for events with an empty summary.
pub const DEFAULT_SUMMARY: &str = "Blocked";

const CRLF: &str = "\r\n";

/// A calendar to serialize: display name, optional product id, events.
#[derive(Debug, Clone, Default)]
pub struct CalendarDocument {
    /// Display name, emitted as `X-WR-CALNAME`.
    pub name: String,
    /// `PRODID` value; [`DEFAULT_PROD_ID`] if unset.
    pub prod_id: Option<String>,
    /// Events, emitted in order.
    pub events: Vec<FeedEvent>,
}

impl CalendarDocument {
    /// Creates an empty document with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prod_id: None,
            events: Vec::new(),
        }
    }

    /// Builder: set the product identifier.
    pub fn with_prod_id(mut self, prod_id: impl Into<String>) -> Self {
        self.prod_id = Some(prod_id.into());
        self
    }

    /// Builder: set the events.
    pub fn with_events(mut self, events: Vec<FeedEvent>) -> Self {
        self.events = events;
        self
    }

    /// Appends one event.
    pub fn push(&mut self, event: FeedEvent) {
        self.events.push(event);
    }
}

/// Serializes a document, stamping every event with the current UTC time.
pub fn build_calendar_text(document: &CalendarDocument) -> String {
    build_calendar_text_at(document, Utc::now())
}

/// Serializes a document with an explicit `DTSTAMP`.
///
/// Events are written in input order, without deduplication. Every line,
/// including the last, ends with CRLF.
pub fn build_calendar_text_at(document: &CalendarDocument, stamped_at: DateTime<Utc>) -> String {
    let dtstamp = format_wire_timestamp(stamped_at);
    let prod_id = document.prod_id.as_deref().unwrap_or(DEFAULT_PROD_ID);

    let mut lines: Vec<String> = Vec::with_capacity(7 + document.events.len() * 8);
    lines.push("BEGIN:VCALENDAR".to_string());
    lines.push("VERSION:2.0".to_string());
    lines.push(format!("PRODID:{}", single_line(prod_id)));
    lines.push("CALSCALE:GREGORIAN".to_string());
    lines.push("METHOD:PUBLISH".to_string());
    lines.push(format!("X-WR-CALNAME:{}", text_value(&document.name)));

    for event in &document.events {
        let summary = if event.summary.is_empty() {
            DEFAULT_SUMMARY
        } else {
            event.summary.as_str()
        };

        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", single_line(&event.uid)));
        lines.push(format!("DTSTAMP:{}", dtstamp));
        lines.push(format!("DTSTART;VALUE=DATE:{}", format_wire_date(event.start)));
        lines.push(format!(
            "DTEND;VALUE=DATE:{}",
            format_wire_date(exclusive_end(event.start, Some(event.end)))
        ));
        lines.push(format!("SUMMARY:{}", text_value(summary)));
        lines.push(format!("STATUS:{}", event.status.as_ics()));
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());

    let mut out = lines.join(CRLF);
    out.push_str(CRLF);
    out
}

/// Escapes a TEXT value after dropping bare carriage returns.
fn text_value(value: &str) -> String {
    escape_text(&value.replace('\r', ""))
}

/// Strips line breaks from values that are not TEXT-escaped.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}
