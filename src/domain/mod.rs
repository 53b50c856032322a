pub mod new_subscriber;
pub mod source_address;
pub mod subscriber;
pub mod subscriber_email;
pub mod subscription_status;
