use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use chrono::Days;
use chrono::NaiveDate;
use futures::future::try_join_all;

use crate::Store;
use crate::StoreError;
use crate::bucket::Calendar;
use crate::bucket::DEFAULT_KEY_PREFIX;
use crate::bucket::LocalCalendar;
use crate::bucket::MetricKind;
use crate::bucket::bucket_key;

/// Keys longer than this are shortened in rendered reports.
const MAX_KEY_WIDTH: usize = 50;
const ELLIPSIS: &str = "...";
const BANNER_WIDTH: usize = 80;
const RULE_WIDTH: usize = 40;

/// Per-key counts merged over a window of days.
///
/// Built fresh for each report and owned by whoever asked for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    user_agents: HashMap<String, u64>,
    ips: HashMap<String, u64>,
    days: i64,
}

impl Summary {
    pub fn new(days: i64, user_agents: HashMap<String, u64>, ips: HashMap<String, u64>) -> Self {
        Self {
            user_agents,
            ips,
            days,
        }
    }

    /// The window size that was requested, even when it was not positive.
    pub fn days(&self) -> i64 {
        self.days
    }

    pub fn user_agents(&self) -> &HashMap<String, u64> {
        &self.user_agents
    }

    pub fn ips(&self) -> &HashMap<String, u64> {
        &self.ips
    }

    pub fn counts(&self, kind: MetricKind) -> &HashMap<String, u64> {
        match kind {
            MetricKind::UserAgent => &self.user_agents,
            MetricKind::Ip => &self.ips,
        }
    }

    /// Every tracked request is counted once against its user-agent.
    pub fn total_requests(&self) -> u64 {
        self.user_agents
            .values()
            .fold(0u64, |total, count| total.saturating_add(*count))
    }

    /// The `limit` highest counts for `kind`.
    ///
    /// Equal counts are ordered by key, so the ranking is deterministic.
    pub fn top(&self, kind: MetricKind, limit: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts(kind)
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(limit);
        entries
    }

    fn add(&mut self, kind: MetricKind, entries: Vec<(String, u64)>) {
        let counts = match kind {
            MetricKind::UserAgent => &mut self.user_agents,
            MetricKind::Ip => &mut self.ips,
        };
        for (key, count) in entries {
            let total = counts.entry(key).or_insert(0);
            *total = total.saturating_add(count);
        }
    }

    /// Renders the human-readable report, listing at most `limit` entries per section.
    pub fn render(&self, limit: usize) -> String {
        let banner = "=".repeat(BANNER_WIDTH);
        let mut output = vec![
            banner.clone(),
            "API Usage Statistics Summary".to_string(),
            banner.clone(),
            format!("Period: Past {} days", self.days),
            "-".repeat(RULE_WIDTH),
        ];

        output.push(self.render_section(
            "Top User Agents:",
            "No user agent data available",
            MetricKind::UserAgent,
            limit,
        ));
        output.push(self.render_section(
            "Top IP Addresses:",
            "No IP data available",
            MetricKind::Ip,
            limit,
        ));

        output.push(format!(
            "\nSummary:\n  Total unique user agents: {}\n  Total unique IPs: {}\n  Total API requests: {}",
            self.user_agents.len(),
            self.ips.len(),
            self.total_requests()
        ));

        output.push(banner);
        output.join("\n")
    }

    fn render_section(&self, title: &str, empty: &str, kind: MetricKind, limit: usize) -> String {
        let mut section = format!("\n{title}");
        let ranked = self.top(kind, limit);

        if ranked.is_empty() {
            let _ = write!(section, "\n  {empty}");
            return section;
        }

        let longest = ranked
            .iter()
            .map(|(key, _)| key.chars().count())
            .max()
            .unwrap_or(0);
        // IPs are short, only user-agents get capped and shortened
        let width = match kind {
            MetricKind::UserAgent => longest.min(MAX_KEY_WIDTH),
            MetricKind::Ip => longest,
        };

        for (rank, (key, count)) in ranked.into_iter().enumerate() {
            let shown = match kind {
                MetricKind::UserAgent => shorten(key),
                MetricKind::Ip => key.to_string(),
            };
            let _ = write!(
                section,
                "\n  {:>2}. {:<width$} : {:>6} requests",
                rank + 1,
                shown,
                count
            );
        }
        section
    }
}

fn shorten(key: &str) -> String {
    if key.chars().count() > MAX_KEY_WIDTH {
        let head: String = key
            .chars()
            .take(MAX_KEY_WIDTH - ELLIPSIS.len())
            .collect();
        format!("{head}{ELLIPSIS}")
    } else {
        key.to_string()
    }
}

/// Reads daily buckets back out of a [`Store`] and reports on them.
pub struct StatsReporter<S: ?Sized> {
    store: Arc<S>,
    key_prefix: String,
    calendar: Arc<dyn Calendar>,
}

impl<S: ?Sized> Clone for StatsReporter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key_prefix: self.key_prefix.clone(),
            calendar: Arc::clone(&self.calendar),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for StatsReporter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsReporter")
            .field("key_prefix", &self.key_prefix)
            .field("calendar", &self.calendar)
            .finish_non_exhaustive()
    }
}

impl<S> StatsReporter<S>
where
    S: Store + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            calendar: Arc::new(LocalCalendar),
        }
    }

    /// Read buckets written under a different namespace.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Choose which date counts as "today" when walking back through the window.
    pub fn with_calendar(mut self, calendar: Arc<dyn Calendar>) -> Self {
        self.calendar = calendar;
        self
    }

    /// Merges the counts of today and the `days - 1` days before it.
    ///
    /// Buckets that do not exist (never written, or already expired) contribute nothing.
    /// Days are read concurrently, but merged in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] encountered while reading.
    pub async fn summarize(&self, days: i64) -> Result<Summary, StoreError> {
        let today = self.calendar.today();
        let reads = (0..days.max(0) as u64)
            .map_while(|offset| today.checked_sub_days(Days::new(offset)))
            .map(|date| self.read_day(date));

        let mut summary = Summary {
            days,
            ..Summary::default()
        };
        for day in try_join_all(reads).await? {
            for (kind, entries) in day {
                summary.add(kind, entries);
            }
        }
        Ok(summary)
    }

    async fn read_day(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<(MetricKind, Vec<(String, u64)>)>, StoreError> {
        let mut day = Vec::with_capacity(MetricKind::ALL.len());
        for kind in MetricKind::ALL {
            let key = bucket_key(&self.key_prefix, kind, date);
            if self.store.exists(&key).await? {
                day.push((kind, self.store.range_desc_with_scores(&key, 0, -1).await?));
            }
        }
        Ok(day)
    }

    /// [`StatsReporter::summarize`] followed by [`Summary::render`].
    pub async fn summary_report(&self, days: i64, limit: usize) -> Result<String, StoreError> {
        Ok(self.summarize(days).await?.render(limit))
    }

    /// Prints the report to standard output.
    pub async fn display_summary(&self, days: i64, limit: usize) -> Result<(), StoreError> {
        println!("{}", self.summary_report(days, limit).await?);
        Ok(())
    }
}
