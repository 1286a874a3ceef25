use crate::{Error, Result};
use chrono::{DateTime, Utc};
use leadx_core::{EnumValue, RawFilters};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub const ALL: [CampaignStatus; 4] = [
        CampaignStatus::Draft,
        CampaignStatus::Active,
        CampaignStatus::Paused,
        CampaignStatus::Completed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "Draft",
            CampaignStatus::Active => "Active",
            CampaignStatus::Paused => "Paused",
            CampaignStatus::Completed => "Completed",
        }
    }
}

impl EnumValue for CampaignStatus {
    const NAME: &'static str = "CampaignStatus";

    fn from_value(value: &str) -> Option<Self> {
        CampaignStatus::ALL.into_iter().find(|s| s.as_value() == value)
    }

    fn as_value(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landingpage {
    pub id: Uuid,
    pub title: String,
    /// Public identifier used in tracking links
    pub slug: String,
}

impl Landingpage {
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            slug: slug.into(),
        }
    }
}

/// A mailing campaign targeting the prospects selected by `prospect_filter`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub landingpage: Option<Landingpage>,
    /// Raw filter keys as accepted by the prospect filter entry point
    #[serde(default)]
    pub prospect_filter: Option<RawFilters>,
}

impl Campaign {
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            slug: slug.into(),
            description: None,
            status: CampaignStatus::Draft,
            start_date: None,
            end_date: None,
            landingpage: None,
            prospect_filter: None,
        }
    }

    /// A filter that is present but empty counts as missing
    pub fn has_prospect_filter(&self) -> bool {
        self.prospect_filter.as_ref().map_or(false, |f| !f.is_empty())
    }

    /// Checks run in order: landing page, prospect filter, status
    pub fn validate_for_sending(&self) -> Result<()> {
        if self.landingpage.is_none() {
            return Err(Error::NoLandingpage);
        }
        if !self.has_prospect_filter() {
            return Err(Error::NoProspectFilter);
        }
        if self.status != CampaignStatus::Active {
            return Err(Error::NotActive);
        }
        Ok(())
    }
}
