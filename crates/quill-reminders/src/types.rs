//! Reminder schedule types.
//!
//! `Schedule` is what the user asked for. `ScheduledReminders` is what was
//! actually registered with the OS and is the only form that gets persisted.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

const NONE_KEY: &str = "none";
const WEEKDAYS_KEY: &str = "weekdays";
const WEEKDAYS_WITH_TIME_KEY: &str = "weekdaysWithTime";

/// Day of the week, numbered from Sunday = 0.
///
/// This is the only numbering used inside the crate. The host calendar's
/// 1-based numbering appears only when a trigger is built
/// (see [`crate::Trigger::weekly`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Weekday {
    /// Hour used when the user has not picked a reminder time.
    pub const DEFAULT_REMINDER_HOUR: u32 = 10;

    /// All weekdays in numeric order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// 0-based number (Sunday = 0).
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Weekday for a 0-based number.
    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(number as usize).copied()
    }

    /// Host calendar number (Sunday = 1).
    pub fn calendar_number(self) -> u8 {
        self.number() + 1
    }

    /// Weekday a calendar date falls on.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::ALL[date.weekday().num_days_from_sunday() as usize]
    }
}

/// Time of day a reminder fires, at minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeParts")]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

#[derive(Deserialize)]
struct TimeParts {
    hour: u32,
    minute: u32,
}

impl TryFrom<TimeParts> for ReminderTime {
    type Error = String;

    fn try_from(parts: TimeParts) -> Result<Self, Self::Error> {
        ReminderTime::new(parts.hour, parts.minute)
            .ok_or_else(|| format!("invalid reminder time {}:{}", parts.hour, parts.minute))
    }
}

impl ReminderTime {
    /// Create a time, rejecting out-of-range components.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Whether this time is strictly later than `now`, comparing hour and minute only.
    pub fn is_after(&self, now: NaiveTime) -> bool {
        (self.hour, self.minute) > (now.hour(), now.minute())
    }
}

impl Default for ReminderTime {
    fn default() -> Self {
        Self {
            hour: Weekday::DEFAULT_REMINDER_HOUR,
            minute: 0,
        }
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// The reminder schedule a user asked for.
///
/// `Weekdays` with an empty set registers nothing, but it is not equal to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Schedule {
    /// No reminders.
    #[default]
    None,
    /// Remind on these days.
    Weekdays(BTreeSet<Weekday>),
}

impl Schedule {
    /// Build a weekday schedule from any collection of days.
    pub fn weekdays(days: impl IntoIterator<Item = Weekday>) -> Self {
        Schedule::Weekdays(days.into_iter().collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Schedule::None)
    }

    /// Scheduled days in ascending order.
    pub fn days(&self) -> Vec<Weekday> {
        match self {
            Schedule::None => Vec::new(),
            Schedule::Weekdays(days) => days.iter().copied().collect(),
        }
    }
}

/// Opaque identifier of an OS-level trigger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NotificationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NotificationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable key of a site, e.g. its URI representation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlogId(String);

impl BlogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlogId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for BlogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A site reminders can be scheduled for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blog {
    /// Store key.
    pub id: BlogId,
    /// Remote numeric site id. Prompt reminders need it.
    pub site_id: Option<u64>,
    /// Display title, used as the notification subtitle.
    pub title: Option<String>,
}

impl Blog {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: BlogId::new(id),
            site_id: None,
            title: None,
        }
    }

    pub fn with_site_id(mut self, site_id: u64) -> Self {
        self.site_id = Some(site_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A weekday and the trigger registered for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledWeekday {
    pub weekday: Weekday,
    pub notification_id: NotificationId,
}

/// Weekday triggers that share a user-chosen time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledWeekdaysWithTime {
    pub time: ReminderTime,
    pub days: Vec<ScheduledWeekday>,
}

/// Persisted record of the triggers registered for one blog.
///
/// Serialized as a map with exactly one of the keys `none`, `weekdays` or
/// `weekdaysWithTime`. Anything else decodes to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RemindersRepr")]
pub enum ScheduledReminders {
    #[default]
    None,
    Weekdays(Vec<ScheduledWeekday>),
    WeekdaysWithTime(ScheduledWeekdaysWithTime),
}

impl ScheduledReminders {
    /// Collect registered days into the variant matching whether a time was chosen.
    pub fn from_registered(days: Vec<ScheduledWeekday>, time: Option<ReminderTime>) -> Self {
        match time {
            Some(time) => ScheduledReminders::WeekdaysWithTime(ScheduledWeekdaysWithTime { time, days }),
            None => ScheduledReminders::Weekdays(days),
        }
    }

    /// Every notification id held by this record.
    pub fn notification_ids(&self) -> Vec<NotificationId> {
        self.days()
            .iter()
            .map(|day| day.notification_id.clone())
            .collect()
    }

    /// Registered weekday entries.
    pub fn days(&self) -> &[ScheduledWeekday] {
        match self {
            ScheduledReminders::None => &[],
            ScheduledReminders::Weekdays(days) => days,
            ScheduledReminders::WeekdaysWithTime(scheduled) => &scheduled.days,
        }
    }

    /// User-chosen time, if any.
    pub fn time(&self) -> Option<ReminderTime> {
        match self {
            ScheduledReminders::WeekdaysWithTime(scheduled) => Some(scheduled.time),
            _ => None,
        }
    }
}

impl From<&ScheduledReminders> for Schedule {
    fn from(reminders: &ScheduledReminders) -> Self {
        match reminders {
            ScheduledReminders::None => Schedule::None,
            _ => Schedule::weekdays(reminders.days().iter().map(|day| day.weekday)),
        }
    }
}

impl Serialize for ScheduledReminders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            ScheduledReminders::None => map.serialize_entry(NONE_KEY, &true)?,
            ScheduledReminders::Weekdays(days) => map.serialize_entry(WEEKDAYS_KEY, days)?,
            ScheduledReminders::WeekdaysWithTime(scheduled) => {
                map.serialize_entry(WEEKDAYS_WITH_TIME_KEY, scheduled)?
            }
        }
        map.end()
    }
}

/// Wire shape of `ScheduledReminders` before the one-key rule is applied.
#[derive(Deserialize)]
struct RemindersRepr {
    #[serde(default)]
    none: Option<serde_json::Value>,
    #[serde(default)]
    weekdays: Option<serde_json::Value>,
    #[serde(default, rename = "weekdaysWithTime")]
    weekdays_with_time: Option<serde_json::Value>,
}

impl From<RemindersRepr> for ScheduledReminders {
    fn from(repr: RemindersRepr) -> Self {
        match (repr.none, repr.weekdays, repr.weekdays_with_time) {
            (Some(_), None, None) => ScheduledReminders::None,
            (None, Some(days), None) => match serde_json::from_value(days) {
                Ok(days) => ScheduledReminders::Weekdays(days),
                Err(e) => {
                    warn!(error = %e, "malformed weekdays reminders, treating as none");
                    ScheduledReminders::None
                }
            },
            (None, None, Some(scheduled)) => match serde_json::from_value(scheduled) {
                Ok(scheduled) => ScheduledReminders::WeekdaysWithTime(scheduled),
                Err(e) => {
                    warn!(error = %e, "malformed timed reminders, treating as none");
                    ScheduledReminders::None
                }
            },
            (none, weekdays, with_time) => {
                let keys = [none.is_some(), weekdays.is_some(), with_time.is_some()]
                    .iter()
                    .filter(|present| **present)
                    .count();
                warn!(keys, "reminders entry must have exactly one key, treating as none");
                ScheduledReminders::None
            }
        }
    }
}
