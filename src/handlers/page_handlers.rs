use axum::response::Html;

const INDEX_PAGE: &str = include_str!("../../static/index.html");

/// `GET /` — the bundled frontend, served verbatim.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
