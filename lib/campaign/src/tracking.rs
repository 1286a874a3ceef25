//! Landing page visit tracking and campaign link generation

use crate::campaign::{Campaign, Landingpage};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use leadx_core::RecordId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Marketing parameters carried on the landing page query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
    pub gclid: Option<String>,
    pub fbclid: Option<String>,
}

impl UtmParams {
    /// Last occurrence wins for repeated keys
    pub fn from_query(query: &[(String, String)]) -> Self {
        let mut params = UtmParams::default();
        for (key, value) in query {
            let slot = match key.as_str() {
                "utm_source" => &mut params.utm_source,
                "utm_medium" => &mut params.utm_medium,
                "utm_campaign" => &mut params.utm_campaign,
                "utm_content" => &mut params.utm_content,
                "utm_term" => &mut params.utm_term,
                "gclid" => &mut params.gclid,
                "fbclid" => &mut params.fbclid,
                _ => continue,
            };
            *slot = Some(value.clone());
        }
        params
    }
}

/// Client details derived from the request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingData {
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub screen_resolution: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
}

/// An incoming landing page request
#[derive(Debug, Clone, Default)]
pub struct Visit {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    /// Preferred language from `Accept-Language`
    pub language: Option<String>,
    /// Value of the `timezone` header
    pub timezone: Option<String>,
    pub query: Vec<(String, String)>,
}

impl Visit {
    fn query_value(&self, key: &str) -> Option<String> {
        self.query.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub landingpage_id: Uuid,
    /// Prospect id from the tracking link, unverified
    pub prospect_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    #[serde(flatten)]
    pub utm: UtmParams,
    pub tracking_data: TrackingData,
    pub created_at: DateTime<Utc>,
}

fn known_agent(user_agent: Option<&str>) -> Option<&str> {
    user_agent.filter(|ua| !ua.is_empty() && *ua != "0")
}

pub fn detect_device_type(user_agent: Option<&str>) -> Option<&'static str> {
    let ua = known_agent(user_agent)?;
    let device = if ["Mobile", "Android", "iPhone", "iPad"].iter().any(|m| ua.contains(m)) {
        "mobile"
    } else if ua.contains("Tablet") {
        "tablet"
    } else {
        "desktop"
    };
    Some(device)
}

pub fn detect_browser(user_agent: Option<&str>) -> Option<&'static str> {
    let ua = known_agent(user_agent)?;
    let browser = ["Chrome", "Firefox", "Safari", "Edge"]
        .into_iter()
        .find(|name| ua.contains(name))
        .unwrap_or("Other");
    Some(browser)
}

pub fn detect_os(user_agent: Option<&str>) -> Option<&'static str> {
    let ua = known_agent(user_agent)?;
    let os = [
        ("Windows", "Windows"),
        ("Mac", "macOS"),
        ("Linux", "Linux"),
        ("Android", "Android"),
        ("iOS", "iOS"),
    ]
    .into_iter()
    .find(|(marker, _)| ua.contains(marker))
    .map_or("Other", |(_, os)| os);
    Some(os)
}

/// Link to the campaign's landing page for one prospect, with UTM tags
pub fn tracking_url(base: &Url, campaign: &Campaign, prospect_id: RecordId) -> Result<Url> {
    let landingpage = campaign.landingpage.as_ref().ok_or(Error::MissingLandingpage)?;

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["lp", landingpage.slug.as_str()]);
    url.query_pairs_mut()
        .append_pair("prospect", &prospect_id.to_string())
        .append_pair("utm_source", "mail")
        .append_pair("utm_medium", "web")
        .append_pair("utm_campaign", &campaign.title);
    Ok(url)
}

/// Append-only log of landing page visits
#[derive(Default)]
pub struct VisitTracker {
    events: RwLock<Vec<TrackingEvent>>,
}

impl VisitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, campaign_id: Uuid, landingpage: &Landingpage, visit: &Visit) -> TrackingEvent {
        let user_agent = visit.user_agent.as_deref();
        let event = TrackingEvent {
            id: Uuid::new_v4(),
            campaign_id,
            landingpage_id: landingpage.id,
            prospect_id: visit.query_value("prospect"),
            ip_address: visit.ip_address.clone(),
            user_agent: visit.user_agent.clone(),
            referrer: visit.referrer.clone(),
            utm: UtmParams::from_query(&visit.query),
            tracking_data: TrackingData {
                language: visit.language.clone(),
                timezone: visit.timezone.clone(),
                screen_resolution: visit.query_value("screen_resolution"),
                device_type: detect_device_type(user_agent).map(str::to_string),
                browser: detect_browser(user_agent).map(str::to_string),
                os: detect_os(user_agent).map(str::to_string),
            },
            created_at: Utc::now(),
        };
        debug!(campaign = %campaign_id, landingpage = %landingpage.slug, "Tracked landing page visit");
        self.events.write().push(event.clone());
        event
    }

    pub fn for_campaign(&self, campaign_id: Uuid) -> Vec<TrackingEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.campaign_id == campaign_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}
