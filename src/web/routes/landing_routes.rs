use axum::{Router, response::Html, routing::get};
use std::sync::Arc;
use tera::{Context, Tera};

use crate::web::{AppError, AppState};

const LANDING_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ app_name }}</title>
</head>
<body>
  <main>
    <h1>{{ app_name }}</h1>
    <p>{{ tagline }}</p>
    <ul>
    {% for feature in features %}
      <li>{{ feature }}</li>
    {% endfor %}
    </ul>
    <a href="{{ register_url | safe }}">Get started</a>
    <a href="{{ login_url | safe }}">Log in</a>
  </main>
</body>
</html>
"#;

pub fn landing_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(landing_page))
}

pub fn render_landing_page() -> Result<String, tera::Error> {
    let mut context = Context::new();
    context.insert("app_name", "LinkShelf");
    context.insert("tagline", "Keep every link you care about in one place.");
    context.insert(
        "features",
        &[
            "Save links with a name you will remember",
            "Edit or remove them whenever you like",
            "Search your collection instantly",
        ],
    );
    context.insert("register_url", "/Auth/Register");
    context.insert("login_url", "/Auth/login");

    Tera::one_off(LANDING_TEMPLATE, &context, true)
}

async fn landing_page() -> Result<Html<String>, AppError> {
    Ok(Html(render_landing_page()?))
}
