use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

/// 24-hour day/month/year rendering, e.g. `1/1/2024, 06:00:00`.
pub const DISPLAY_FORMAT: &str = "%-d/%-m/%Y, %H:%M:%S";

/// Render `instant` as civil time in `zone`.
///
/// Pure: no locale or process timezone is consulted, and the instant itself
/// is left untouched.
pub fn render_in_timezone(instant: DateTime<Utc>, zone: Tz) -> String {
    instant.with_timezone(&zone).format(DISPLAY_FORMAT).to_string()
}

/// One instant shown both as stored and as displayed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TimeView {
    pub utc: DateTime<Utc>,
    /// `utc` rendered in the display timezone.
    pub local: String,
}

impl TimeView {
    pub fn new(instant: DateTime<Utc>, zone: Tz) -> Self {
        Self {
            utc: instant,
            local: render_in_timezone(instant, zone),
        }
    }
}
