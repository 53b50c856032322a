use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::new_subscriber::NewSubscriber;
use crate::domain::source_address::SourceAddress;
use crate::domain::subscriber_email::SubscriberEmail;

pub const SUBSCRIBERS_HEADER_ROW: [&str; 3] = ["Email", "Subscribed At", "IP Address"];
pub const EMAIL_COLUMN: &str = "Email";

/// A stored subscription, one worksheet row.
#[derive(Debug)]
pub struct Subscriber {
    pub email: SubscriberEmail,
    pub subscribed_at: DateTime<Utc>,
    pub source_address: SourceAddress,
}

impl Subscriber {
    pub fn new(new_subscriber: NewSubscriber, subscribed_at: DateTime<Utc>) -> Subscriber {
        Subscriber {
            email: new_subscriber.email,
            subscribed_at,
            source_address: new_subscriber.source_address,
        }
    }

    /// Cells in the column order of [`SUBSCRIBERS_HEADER_ROW`].
    pub fn to_row(&self) -> Vec<String> {
        vec![
            String::from(self.email.as_ref()),
            self.subscribed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            String::from(self.source_address.as_ref()),
        ]
    }
}
