//! Recipient selection and notification bookkeeping

use crate::campaign::Campaign;
use crate::tracking::tracking_url;
use crate::Result;
use ahash::AHashSet;
use chrono::{DateTime, Utc};
use leadx_core::{compile, FilterClause, Record, RecordId, RecordStore};
use leadx_import::prospect;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

/// A prospect that was sent a campaign mail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub campaign_id: Uuid,
    pub prospect_id: RecordId,
    pub sent_at: DateTime<Utc>,
}

/// Which prospects have been mailed for which campaign.
///
/// A prospect may be mailed more than once when sending is forced, so
/// sent mails and notified prospects are counted separately.
#[derive(Default)]
pub struct NotificationLog {
    entries: RwLock<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, campaign_id: Uuid, prospect_id: RecordId) {
        self.entries.write().push(Notification {
            campaign_id,
            prospect_id,
            sent_at: Utc::now(),
        });
    }

    /// Mails sent for the campaign, repeats included
    pub fn total_sent(&self, campaign_id: Uuid) -> usize {
        self.entries.read().iter().filter(|n| n.campaign_id == campaign_id).count()
    }

    pub fn notified(&self, campaign_id: Uuid) -> AHashSet<RecordId> {
        self.entries
            .read()
            .iter()
            .filter(|n| n.campaign_id == campaign_id)
            .map(|n| n.prospect_id)
            .collect()
    }

    pub fn notified_count(&self, campaign_id: Uuid) -> usize {
        self.notified(campaign_id).len()
    }
}

fn prospect_clauses(campaign: &Campaign) -> Vec<FilterClause> {
    match &campaign.prospect_filter {
        Some(filter) => compile(&prospect::schema(), filter, &prospect::casts()),
        None => Vec::new(),
    }
}

/// Prospects the campaign's filter selects; already notified ones are
/// left out unless `force` is set
pub fn recipients(
    campaign: &Campaign,
    prospects: &dyn RecordStore,
    log: &NotificationLog,
    force: bool,
) -> Vec<Record> {
    let selected = prospects.query(&prospect_clauses(campaign));
    if force {
        return selected;
    }
    let notified = log.notified(campaign.id);
    selected.into_iter().filter(|r| !notified.contains(&r.id)).collect()
}

/// Number of prospects the campaign targets; zero without a filter
pub fn total_prospects(campaign: &Campaign, prospects: &dyn RecordStore) -> usize {
    if !campaign.has_prospect_filter() {
        return 0;
    }
    prospects.count(&prospect_clauses(campaign))
}

/// A mail ready for delivery
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMail {
    pub prospect_id: RecordId,
    pub email: String,
    pub tracking_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MailingSummary {
    pub emails_sent: usize,
    pub total_emails_sent: usize,
    pub notified_prospects: usize,
    #[serde(skip)]
    pub mails: Vec<OutboundMail>,
}

/// Validate the campaign, select recipients and record a notification for
/// each mail prepared. Delivery itself happens elsewhere.
pub fn prepare_mailing(
    campaign: &Campaign,
    prospects: &dyn RecordStore,
    log: &NotificationLog,
    base_url: &Url,
    force: bool,
) -> Result<MailingSummary> {
    campaign.validate_for_sending()?;

    let mut mails = Vec::new();
    for record in recipients(campaign, prospects, log, force) {
        let Some(email) = record.get("email").and_then(|v| v.as_str()) else {
            warn!(campaign = %campaign.id, prospect = %record.id, "Prospect has no email address");
            continue;
        };
        let url = tracking_url(base_url, campaign, record.id)?;
        log.record(campaign.id, record.id);
        mails.push(OutboundMail {
            prospect_id: record.id,
            email: email.to_string(),
            tracking_url: url.to_string(),
        });
    }

    info!(campaign = %campaign.id, emails = mails.len(), force, "Prepared campaign mailing");
    Ok(MailingSummary {
        emails_sent: mails.len(),
        total_emails_sent: log.total_sent(campaign.id),
        notified_prospects: log.notified_count(campaign.id),
        mails,
    })
}
