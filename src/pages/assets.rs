use axum::{http::header, response::IntoResponse};

/// パス
pub const STYLESHEET_PATH: &str = "/static/style.css";

const STYLESHEET: &str = r#"body {
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
  max-width: 40rem;
  margin: 4rem auto;
  padding: 0 1rem;
  color: #24292f;
}
a.button {
  display: inline-block;
  padding: 0.5rem 1rem;
  border-radius: 6px;
  background: #2da44e;
  color: #fff;
  text-decoration: none;
}
a.button.secondary {
  background: #6e7781;
}
ul.flashes {
  list-style: none;
  padding: 0;
}
li.flash {
  margin: 0.5rem 0;
  padding: 0.5rem 1rem;
  border-radius: 6px;
}
li.flash.info { background: #ddf4ff; }
li.flash.warning { background: #fff8c5; }
li.flash.error { background: #ffebe9; }
li.flash.details { background: #f6f8fa; }
pre {
  white-space: pre-wrap;
  word-break: break-word;
}
"#;

pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}
