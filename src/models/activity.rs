use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::ListingId;

/// Message between a browsing identity and an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub sender_id: Option<String>,
    pub recipient_id: Option<String>,
    pub property_id: Option<ListingId>,
    pub subject: Option<String>,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMessage {
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<ListingId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TourStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tour {
    pub id: String,
    pub property_id: Option<ListingId>,
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub notes: Option<String>,
    pub status: TourStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTour {
    pub property_id: ListingId,
    pub user_id: String,
    pub agent_id: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: TourStatus,
}
