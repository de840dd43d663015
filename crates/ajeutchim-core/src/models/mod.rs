//! Data models for association records.
//!
//! These are the record types the screens render, together with the
//! local filtering, grouping, and tallying they need:
//!
//! - `Member`: the member directory
//! - `Payment`: contribution tracking, filtered by year and month
//! - `ChatMessage`, `ForumPost`: day-bucketed message lists
//! - `Election`, `Candidate`: vote tallies and percentages

pub mod election;
pub mod member;
pub mod message;
pub mod payment;

pub use election::{Candidate, Election};
pub use member::{sort_directory, Member};
pub use message::{
    day_label, group_by_day, last_outgoing, ChatMessage, DaySection, DeliveryStatus, Direction,
    ForumPost,
};
pub use payment::{available_years, filter_by_period, total_paid, Payment, PaymentStatus};
