use serde_json::{Map, Value};

use crate::domain::source_address::SourceAddress;
use crate::domain::subscriber_email::SubscriberEmail;

#[derive(Debug)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub source_address: SourceAddress,
}

/// Fields read from the JSON document posted by the signup form.
#[derive(Debug)]
pub struct NewSubscriberBody {
    pub email: String,
}

impl NewSubscriberBody {
    /// Fails only when `body` is not a JSON object.
    ///
    /// A missing or non-string `email` reads as an empty one, so it is rejected
    /// later by the email rules instead of here.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let object: Map<String, Value> = serde_json::from_slice(body)?;
        let email = match object.get("email") {
            Some(Value::String(email)) => email.clone(),
            _ => String::new(),
        };

        Ok(NewSubscriberBody { email })
    }
}

impl TryFrom<(NewSubscriberBody, SourceAddress)> for NewSubscriber {
    type Error = String;

    fn try_from(
        (body, source_address): (NewSubscriberBody, SourceAddress),
    ) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(body.email)?;

        Ok(NewSubscriber {
            email,
            source_address,
        })
    }
}
