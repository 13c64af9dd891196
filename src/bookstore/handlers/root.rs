use axum::response::IntoResponse;

#[utoipa::path(
    get,
    path = "/",
    responses (
        (status = 200, description = "Greeting", body = String, content_type = "text/plain")
    ),
    tag = "bookstore",
)]
pub async fn root() -> impl IntoResponse {
    "Welcome to the bookstore"
}
