//! Default weekly opening schedule seeded for new tenants.

use chrono::{NaiveTime, Weekday};

use crate::domain::foundation::TenantId;

/// Opening hours applied to every seeded weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleDefaults {
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        Self {
            opens_at: NaiveTime::from_hms_opt(11, 0, 0).unwrap_or(NaiveTime::MIN),
            closes_at: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// One weekday's opening hours for a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultScheduleEntry {
    pub tenant_id: TenantId,
    pub weekday: Weekday,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub is_active: bool,
}

const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Builds the seven default entries: weekdays open, weekend closed.
pub fn default_week(tenant_id: TenantId, defaults: &ScheduleDefaults) -> Vec<DefaultScheduleEntry> {
    WEEK.iter()
        .map(|&weekday| DefaultScheduleEntry {
            tenant_id,
            weekday,
            opens_at: defaults.opens_at,
            closes_at: defaults.closes_at,
            is_active: !matches!(weekday, Weekday::Sat | Weekday::Sun),
        })
        .collect()
}
