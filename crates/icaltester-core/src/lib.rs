//! Core types: civil dates, calendar events, bookings, iCal codec, tracing

pub mod date;
pub mod event;
pub mod ics;
pub mod tracing;

pub use date::{CalendarDate, exclusive_end, next_day};
pub use event::{Booking, BookingStatus, CalendarEvent, EventStatus, FeedEvent};
pub use ics::{
    CalendarDocument, ParsedCalendar, build_calendar_text, build_calendar_text_at, escape_text,
    parse_calendar, parse_calendar_text, unescape_text,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
