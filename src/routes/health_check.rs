use actix_web::HttpResponse;

/// Liveness probe, answers 200 with an empty body.
#[tracing::instrument(name = "Health Check handler")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
