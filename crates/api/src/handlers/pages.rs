use axum::response::Html;

use crate::html;

/// GET /
pub async fn index() -> Html<String> {
    Html(html::index_page())
}
