/// Outcome of an accepted subscription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// A new row was appended.
    Success,
    /// The email was already stored, nothing was written.
    Existing,
}

impl SubscriptionStatus {
    pub fn message(&self) -> &'static str {
        match self {
            SubscriptionStatus::Success => "Successfully subscribed!",
            SubscriptionStatus::Existing => "Already subscribed",
        }
    }
}

impl AsRef<str> for SubscriptionStatus {
    fn as_ref(&self) -> &str {
        match self {
            SubscriptionStatus::Success => "success",
            SubscriptionStatus::Existing => "existing",
        }
    }
}
