use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Who sent a chat message, relative to the device owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Delivery state shown on outgoing bubbles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Sent,
    Read,
}

/// One message in a direct conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub direction: Direction,
    pub status: Option<DeliveryStatus>,
}

/// A post on the group forum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: String,
    pub sender: String,
    pub avatar_url: Option<String>,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// One display section: all messages from the same calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DaySection<T> {
    pub label: String,
    pub items: Vec<T>,
}

/// Section label for a message day: "Today", "Yesterday", or the date
pub fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    match (today - day).num_days() {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        _ => day.format("%d/%m/%Y").to_string(),
    }
}

/// Sort items chronologically and bucket them by calendar day.
///
/// Sections come back oldest day first, items within a section in send
/// order. Works for both conversations and the forum; pass the accessor
/// for the item's timestamp.
pub fn group_by_day<T: Clone>(
    items: &[T],
    sent_at: impl Fn(&T) -> DateTime<Utc>,
    today: NaiveDate,
) -> Vec<DaySection<T>> {
    let mut sorted: Vec<T> = items.to_vec();
    sorted.sort_by_key(|item| sent_at(item));

    let mut sections: Vec<DaySection<T>> = Vec::new();
    let mut current_day: Option<NaiveDate> = None;
    for item in sorted {
        let day = sent_at(&item).date_naive();
        match sections.last_mut() {
            Some(section) if current_day == Some(day) => section.items.push(item),
            _ => {
                sections.push(DaySection {
                    label: day_label(day, today),
                    items: vec![item],
                });
                current_day = Some(day);
            }
        }
    }
    sections
}

/// The most recent outgoing message, for the read receipt
pub fn last_outgoing(messages: &[ChatMessage]) -> Option<&ChatMessage> {
    messages
        .iter()
        .filter(|m| m.direction == Direction::Outgoing)
        .max_by_key(|m| m.sent_at)
}
