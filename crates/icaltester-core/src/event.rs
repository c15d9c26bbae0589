//! Event types shared by the codec, the sync engine and the public feed.
//!
//! - [`CalendarEvent`]: a normalized event as produced by the parser
//! - [`Booking`]: a manual booking entered against a mock calendar
//! - [`FeedEvent`]: one entry of an outbound feed, fed to the generator

use serde::{Deserialize, Serialize};

use crate::date::{CalendarDate, exclusive_end};

/// Status of a parsed event.
///
/// Only two states survive parsing: anything that is not `CANCELLED` is
/// treated as confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Cancelled,
}

impl EventStatus {
    /// Maps an iCalendar `STATUS` value (case-insensitive).
    pub fn from_ics(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("CANCELLED") {
            Self::Cancelled
        } else {
            Self::Confirmed
        }
    }

    /// Returns the iCalendar `STATUS` value.
    pub fn as_ics(&self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns the lowercase storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A normalized whole-day event.
///
/// `end` is exclusive and always strictly after `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Identifier assigned by the calendar that produced the event.
    pub uid: String,
    /// First day covered by the event.
    pub start: CalendarDate,
    /// First day not covered by the event.
    pub end: CalendarDate,
    /// Display text.
    pub summary: String,
    /// Confirmed or cancelled.
    pub status: EventStatus,
}

impl CalendarEvent {
    /// Creates an event, bumping `end` to `start + 1 day` if it is not after `start`.
    pub fn new(
        uid: impl Into<String>,
        start: CalendarDate,
        end: CalendarDate,
        summary: impl Into<String>,
        status: EventStatus,
    ) -> Self {
        Self {
            uid: uid.into(),
            start,
            end: exclusive_end(start, Some(end)),
            summary: summary.into(),
            status,
        }
    }

    /// Number of days (nights, for a stay) the event covers.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Returns true if the event was cancelled at the source.
    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }
}

/// Status of a manual booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum BookingStatus {
    #[default]
    Confirmed,
    Cancelled,
    Tentative,
    Pending,
}

impl BookingStatus {
    /// Parses a status name leniently; unknown values read as confirmed.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "cancelled" => Self::Cancelled,
            "tentative" => Self::Tentative,
            "pending" => Self::Pending,
            _ => Self::Confirmed,
        }
    }

    /// Returns the iCalendar `STATUS` value emitted in feeds.
    pub fn as_ics(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Tentative | Self::Pending => "TENTATIVE",
            Self::Confirmed => "CONFIRMED",
        }
    }
}

impl From<String> for BookingStatus {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl From<EventStatus> for BookingStatus {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Confirmed => Self::Confirmed,
            EventStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// A booking entered by hand on a mock calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Storage identifier.
    pub id: String,
    /// Stable feed UID, if the user supplied one.
    #[serde(default)]
    pub uid: Option<String>,
    /// Check-in date.
    pub start_date: CalendarDate,
    /// Check-out date (exclusive).
    pub end_date: CalendarDate,
    /// Display text.
    #[serde(default)]
    pub summary: String,
    /// Booking state.
    #[serde(default)]
    pub status: BookingStatus,
}

impl Booking {
    /// Returns the UID to publish: the supplied one, or one derived from the id.
    pub fn feed_uid(&self) -> String {
        match self.uid.as_deref() {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => format!("m-{}@icaltester", self.id),
        }
    }
}

/// One entry of an outbound calendar feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub uid: String,
    pub start: CalendarDate,
    pub end: CalendarDate,
    pub summary: String,
    pub status: BookingStatus,
}

impl FeedEvent {
    /// Creates a feed entry.
    pub fn new(
        uid: impl Into<String>,
        start: CalendarDate,
        end: CalendarDate,
        summary: impl Into<String>,
        status: BookingStatus,
    ) -> Self {
        Self {
            uid: uid.into(),
            start,
            end,
            summary: summary.into(),
            status,
        }
    }
}

impl From<&Booking> for FeedEvent {
    fn from(booking: &Booking) -> Self {
        Self::new(
            booking.feed_uid(),
            booking.start_date,
            booking.end_date,
            booking.summary.clone(),
            booking.status,
        )
    }
}

impl From<&CalendarEvent> for FeedEvent {
    fn from(event: &CalendarEvent) -> Self {
        Self::new(
            event.uid.clone(),
            event.start,
            event.end,
            event.summary.clone(),
            event.status.into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> CalendarDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn event_status_from_ics() {
        assert_eq!(EventStatus::from_ics("CANCELLED"), EventStatus::Cancelled);
        assert_eq!(EventStatus::from_ics("cancelled "), EventStatus::Cancelled);
        assert_eq!(EventStatus::from_ics("TENTATIVE"), EventStatus::Confirmed);
        assert_eq!(EventStatus::from_ics(""), EventStatus::Confirmed);
    }

    #[test]
    fn booking_status_ics_mapping() {
        assert_eq!(BookingStatus::Confirmed.as_ics(), "CONFIRMED");
        assert_eq!(BookingStatus::Cancelled.as_ics(), "CANCELLED");
        assert_eq!(BookingStatus::Tentative.as_ics(), "TENTATIVE");
        assert_eq!(BookingStatus::Pending.as_ics(), "TENTATIVE");
        assert_eq!(BookingStatus::parse_lenient("Pending"), BookingStatus::Pending);
        assert_eq!(BookingStatus::parse_lenient("blocked"), BookingStatus::Confirmed);
    }

    #[test]
    fn booking_status_deserializes_leniently() {
        let status: BookingStatus = serde_json::from_str(r#""blocked""#).unwrap();
        assert_eq!(status, BookingStatus::Confirmed);
        let status: BookingStatus = serde_json::from_str(r#""CANCELLED""#).unwrap();
        assert_eq!(status, BookingStatus::Cancelled);
        assert_eq!(
            serde_json::to_string(&BookingStatus::Tentative).unwrap(),
            r#""tentative""#
        );
    }

    #[test]
    fn calendar_event_enforces_exclusive_end() {
        let event = CalendarEvent::new(
            "a",
            date(2026, 5, 1),
            date(2026, 5, 1),
            "x",
            EventStatus::Confirmed,
        );
        assert_eq!(event.end, date(2026, 5, 2));
        assert_eq!(event.days(), 1);
    }

    #[test]
    fn booking_feed_uid_fallback() {
        let mut booking = Booking {
            id: "42".to_string(),
            uid: None,
            start_date: date(2026, 5, 1),
            end_date: date(2026, 5, 4),
            summary: "Guest".to_string(),
            status: BookingStatus::Pending,
        };
        assert_eq!(booking.feed_uid(), "m-42@icaltester");

        booking.uid = Some("custom@example.com".to_string());
        assert_eq!(booking.feed_uid(), "custom@example.com");

        let entry = FeedEvent::from(&booking);
        assert_eq!(entry.uid, "custom@example.com");
        assert_eq!(entry.status, BookingStatus::Pending);
    }

    #[test]
    fn booking_deserializes_with_defaults() {
        let json = r#"{"id":"1","start_date":"2026-06-01","end_date":"2026-06-03"}"#;
        let booking: Booking = serde_json::from_str(json).unwrap();
        assert_eq!(booking.start_date, date(2026, 6, 1));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!(booking.summary.is_empty());
    }
}
