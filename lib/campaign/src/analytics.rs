//! Campaign reporting over tracked visits and sent notifications

use crate::campaign::Campaign;
use crate::mailing::{total_prospects, NotificationLog};
use crate::tracking::{TrackingData, TrackingEvent};
use ahash::AHashSet;
use chrono::{DateTime, Utc};
use leadx_core::{EnumValue, RecordStore};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Count per observed value; missing values are counted under `unknown`
pub type Breakdown = BTreeMap<String, usize>;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignOverview {
    pub campaign_id: Uuid,
    pub campaign_title: String,
    pub status: &'static str,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Visits {
    pub total: usize,
    /// Distinct IP addresses
    pub unique_ip: usize,
    /// Distinct IP address and user agent pairs
    pub total_unique: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_prospects_notified: usize,
    pub unique_prospect_visits: usize,
    /// Percentage, rounded to two decimals
    pub email_cta_click_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceBrowserBreakdown {
    pub device_types: Breakdown,
    pub browsers: Breakdown,
    pub operating_systems: Breakdown,
    pub languages: Breakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UtmSources {
    pub source: Breakdown,
    pub medium: Breakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignAnalytics {
    pub campaign_overview: CampaignOverview,
    pub visits: Visits,
    pub statistics: Statistics,
    pub device_browser_breakdown: DeviceBrowserBreakdown,
    pub utm_sources: UtmSources,
}

impl CampaignAnalytics {
    pub fn compute(campaign: &Campaign, events: &[TrackingEvent], log: &NotificationLog) -> Self {
        let events: Vec<&TrackingEvent> = events.iter().filter(|e| e.campaign_id == campaign.id).collect();
        Self {
            campaign_overview: CampaignOverview {
                campaign_id: campaign.id,
                campaign_title: campaign.title.clone(),
                status: campaign.status.as_value(),
                start_date: campaign.start_date,
                end_date: campaign.end_date,
            },
            visits: visits(&events),
            statistics: statistics(&events, log.notified_count(campaign.id)),
            device_browser_breakdown: device_browser_breakdown(&events),
            utm_sources: utm_sources(&events),
        }
    }
}

fn visits(events: &[&TrackingEvent]) -> Visits {
    let unique_ip: AHashSet<&str> = events.iter().filter_map(|e| e.ip_address.as_deref()).collect();
    let unique_visitors: AHashSet<(&str, &str)> = events
        .iter()
        .filter_map(|e| {
            let ip = e.ip_address.as_deref()?;
            Some((ip, e.user_agent.as_deref().unwrap_or("no_user_agent")))
        })
        .collect();
    Visits {
        total: events.len(),
        unique_ip: unique_ip.len(),
        total_unique: unique_visitors.len(),
    }
}

fn statistics(events: &[&TrackingEvent], notified: usize) -> Statistics {
    let visitors: AHashSet<&str> = events.iter().filter_map(|e| e.prospect_id.as_deref()).collect();
    let unique_prospect_visits = visitors.len();
    let email_cta_click_rate = if unique_prospect_visits > 0 && notified > 0 {
        let rate = unique_prospect_visits as f64 / notified as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    } else {
        0.0
    };
    Statistics {
        total_prospects_notified: notified,
        unique_prospect_visits,
        email_cta_click_rate,
    }
}

fn breakdown<'e>(values: impl Iterator<Item = Option<&'e str>>) -> Breakdown {
    let mut counts = Breakdown::new();
    for value in values {
        *counts.entry(value.unwrap_or(UNKNOWN).to_string()).or_default() += 1;
    }
    counts
}

fn device_browser_breakdown(events: &[&TrackingEvent]) -> DeviceBrowserBreakdown {
    let data: Vec<&TrackingData> = events.iter().map(|e| &e.tracking_data).collect();
    DeviceBrowserBreakdown {
        device_types: breakdown(data.iter().map(|d| d.device_type.as_deref())),
        browsers: breakdown(data.iter().map(|d| d.browser.as_deref())),
        operating_systems: breakdown(data.iter().map(|d| d.os.as_deref())),
        languages: breakdown(data.iter().map(|d| d.language.as_deref())),
    }
}

/// Only visits that carry a `utm_source` are counted
fn utm_sources(events: &[&TrackingEvent]) -> UtmSources {
    let tagged: Vec<&&TrackingEvent> = events.iter().filter(|e| e.utm.utm_source.is_some()).collect();
    UtmSources {
        source: breakdown(tagged.iter().map(|e| e.utm.utm_source.as_deref())),
        medium: breakdown(tagged.iter().map(|e| e.utm.utm_medium.as_deref())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailStatistics {
    pub campaign: CampaignRef,
    pub total_emails_sent: usize,
    pub notified_prospects: usize,
    /// Targeted prospects not notified yet
    pub available_prospects: usize,
    pub total_prospects: usize,
}

/// Mail counters; all zero for a campaign without a prospect filter
pub fn email_statistics(campaign: &Campaign, prospects: &dyn RecordStore, log: &NotificationLog) -> EmailStatistics {
    let campaign_ref = CampaignRef {
        id: campaign.id,
        title: campaign.title.clone(),
    };
    if !campaign.has_prospect_filter() {
        return EmailStatistics {
            campaign: campaign_ref,
            total_emails_sent: 0,
            notified_prospects: 0,
            available_prospects: 0,
            total_prospects: 0,
        };
    }

    let total = total_prospects(campaign, prospects);
    let notified = log.notified_count(campaign.id);
    EmailStatistics {
        campaign: campaign_ref,
        total_emails_sent: log.total_sent(campaign.id),
        notified_prospects: notified,
        // Notified prospects may since have dropped out of the filter
        available_prospects: total.saturating_sub(notified),
        total_prospects: total,
    }
}
