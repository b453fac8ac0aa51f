use std::fmt::Debug;

use chrono::Local;
use chrono::NaiveDate;

/// Namespace prepended to every bucket key unless configured otherwise.
pub const DEFAULT_KEY_PREFIX: &str = "api_requests";

/// How long a bucket survives after its most recent write.
pub const DEFAULT_EXPIRY_DAYS: u32 = 31;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// What a bucket counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Client IP addresses.
    Ip,
    /// Raw `User-Agent` header values.
    UserAgent,
}

impl MetricKind {
    pub const ALL: [MetricKind; 2] = [MetricKind::UserAgent, MetricKind::Ip];

    /// Short label, suitable for metric attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Ip => "ip",
            MetricKind::UserAgent => "user_agent",
        }
    }
}

/// Builds the store key of the bucket for `kind` on `date`.
///
/// User-agent buckets live at `{prefix}:{YYYY-MM-DD}` and IP buckets at
/// `{prefix}:ips:{YYYY-MM-DD}`. These formats are shared with existing deployments and
/// must not change.
pub fn bucket_key(prefix: &str, kind: MetricKind, date: NaiveDate) -> String {
    let date = date.format("%Y-%m-%d");
    match kind {
        MetricKind::UserAgent => format!("{prefix}:{date}"),
        MetricKind::Ip => format!("{prefix}:ips:{date}"),
    }
}

/// Source of "today" for bucketing.
///
/// The date always comes from the process, never from the request.
pub trait Calendar: Debug + Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The process-local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCalendar;

impl Calendar for LocalCalendar {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A calendar pinned to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FixedCalendar(pub NaiveDate);

impl Calendar for FixedCalendar {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
