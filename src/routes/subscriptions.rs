use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use chrono::{DateTime, Utc};

use crate::{
    domain::{
        new_subscriber::{NewSubscriber, NewSubscriberBody},
        source_address::SourceAddress,
        subscriber::{Subscriber, EMAIL_COLUMN, SUBSCRIBERS_HEADER_ROW},
        subscription_status::SubscriptionStatus,
    },
    routes::error_chain_fmt,
    startup::WorksheetTitle,
    store::{get_or_create_worksheet, SpreadsheetStore, StoreError},
};

pub const INVALID_EMAIL_MESSAGE: &str = "Valid email address required";
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";
pub const SUBSCRIBE_FAILED_MESSAGE: &str = "Failed to subscribe. Please try again.";

#[derive(serde::Serialize)]
struct SubscriptionResponse {
    message: &'static str,
    status: SubscriptionStatus,
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: &'static str,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to store the new subscriber.")]
    UnexpectedError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscribeError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // The underlying cause stays in the logs, callers only get a fixed message.
    fn error_response(&self) -> HttpResponse {
        let error = match self {
            SubscribeError::ValidationError(_) => INVALID_EMAIL_MESSAGE,
            SubscribeError::UnexpectedError(_) => SUBSCRIBE_FAILED_MESSAGE,
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse { error })
    }
}

#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(request, body, store, worksheet_title),
    fields(subscriber_email = tracing::field::Empty)
)]
pub async fn handle_create_subscription(
    request: HttpRequest,
    body: web::Bytes,
    store: web::Data<dyn SpreadsheetStore>,
    worksheet_title: web::Data<WorksheetTitle>,
) -> Result<HttpResponse, SubscribeError> {
    let body = NewSubscriberBody::from_json(&body).map_err(|err| {
        tracing::error!("Failed to parse the request body: {:?}", err);
        SubscribeError::UnexpectedError(Box::new(err))
    })?;
    let new_subscriber = NewSubscriber::try_from((
        body,
        SourceAddress::from_headers(request.headers()),
    ))
    .map_err(|err| {
        tracing::warn!("Validation error: {:?}", err);
        SubscribeError::ValidationError(err)
    })?;

    tracing::Span::current().record("subscriber_email", new_subscriber.email.as_ref());

    let status = subscribe(
        store.get_ref(),
        worksheet_title.0.as_str(),
        new_subscriber,
        Utc::now(),
    )
    .await
    .map_err(|err| {
        tracing::error!("Failed to store subscriber: {:?}", err);
        SubscribeError::UnexpectedError(Box::new(err))
    })?;

    Ok(HttpResponse::Ok().json(SubscriptionResponse {
        message: status.message(),
        status,
    }))
}

/// Browser preflight for the cross-origin POST.
pub async fn handle_subscription_preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

pub async fn handle_subscription_method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ErrorResponse {
        error: METHOD_NOT_ALLOWED_MESSAGE,
    })
}

/// Appends `new_subscriber` to the worksheet unless its email is already there.
///
/// The read-then-append sequence is not atomic: two concurrent calls for the
/// same unseen email can both append.
#[tracing::instrument(
    name = "Store a subscriber unless already present",
    skip(store, new_subscriber, now),
    fields(subscriber_email = %new_subscriber.email)
)]
pub async fn subscribe(
    store: &dyn SpreadsheetStore,
    worksheet_title: &str,
    new_subscriber: NewSubscriber,
    now: DateTime<Utc>,
) -> Result<SubscriptionStatus, StoreError> {
    let spreadsheet = store.open().await?;
    let worksheet =
        get_or_create_worksheet(spreadsheet.as_ref(), worksheet_title, &SUBSCRIBERS_HEADER_ROW)
            .await?;
    let rows = spreadsheet.list_rows(&worksheet).await?;

    if rows.contains(EMAIL_COLUMN, new_subscriber.email.as_ref())? {
        tracing::info!("Subscriber already present, skipping append");
        return Ok(SubscriptionStatus::Existing);
    }

    let subscriber = Subscriber::new(new_subscriber, now);

    spreadsheet
        .append_row(&worksheet, subscriber.to_row())
        .await?;

    Ok(SubscriptionStatus::Success)
}
