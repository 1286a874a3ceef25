//! # leadx Campaign
//!
//! Mailing campaigns over imported prospects: send validation, recipient
//! selection through the prospect filter, tracking links, landing page
//! visit tracking and campaign analytics. Mail rendering and delivery are
//! left to the caller, as is persistence: campaigns, the notification log
//! and the visit tracker are plain in-memory values owned by the embedding
//! application.

pub mod analytics;
pub mod campaign;
pub mod error;
pub mod mailing;
pub mod tracking;

pub use analytics::{email_statistics, CampaignAnalytics, EmailStatistics};
pub use campaign::{Campaign, CampaignStatus, Landingpage};
pub use error::{Error, Result};
pub use mailing::{prepare_mailing, recipients, total_prospects, MailingSummary, NotificationLog, OutboundMail};
pub use tracking::{tracking_url, TrackingEvent, UtmParams, Visit, VisitTracker};
