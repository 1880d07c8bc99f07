//! ページの描画. ハンドラはデータだけを渡す

use std::fmt::Write;

use htmlescape::{encode_attribute, encode_minimal};

use crate::{
    framework::{
        session::{Flash, FlashCategory},
        system::User,
    },
    origin::Origin,
    pages,
};

/// トップページ
#[derive(Debug)]
pub struct IndexPage<'a> {
    pub user: &'a User,
    pub origin: Option<&'a Origin>,
    pub flashes: &'a [Flash],
}

impl IndexPage<'_> {
    pub fn render(&self) -> String {
        let title = match self.origin {
            Some(origin) => format!("Fork {origin}"),
            None => "Fork Gateway".to_string(),
        };

        let mut body = String::new();
        let _ = write!(body, "<h1>{}</h1>", encode_minimal(&title));
        body.push_str(&render_flashes(self.flashes));

        match self.user {
            User::Authenticated(user) => {
                let _ = write!(
                    body,
                    "<p>Signed in as <strong>{}</strong></p>\
                     <p><a class=\"button\" href=\"{}\">Fork</a> \
                     <a class=\"button secondary\" href=\"{}\">Sign out</a></p>",
                    encode_minimal(&user.login),
                    pages::fork::PATH,
                    pages::logout::PATH,
                );
            }
            User::Anonymous => {
                let _ = write!(
                    body,
                    "<p><a class=\"button\" href=\"{}\">Sign in with GitHub</a></p>",
                    crate::github_oauth::LOGIN_PATH,
                );
            }
        }

        layout(&title, &body)
    }
}

/// 500 のエラーページ
#[derive(Debug)]
pub struct ErrorPage<'a> {
    pub detail: &'a str,
}

impl ErrorPage<'_> {
    pub fn render(&self) -> String {
        let body = format!(
            "<h1>Something went wrong</h1><pre class=\"details\">{}</pre>\
             <p><a href=\"{}\">Back</a></p>",
            encode_minimal(self.detail),
            pages::index::PATH,
        );
        layout("Error", &body)
    }
}

fn render_flashes(flashes: &[Flash]) -> String {
    if flashes.is_empty() {
        return String::new();
    }

    let mut out = String::from("<ul class=\"flashes\">");
    for flash in flashes {
        let category = flash.category.as_str();
        let _ = write!(out, "<li class=\"flash {category}\">");
        if flash.category == FlashCategory::Details {
            let _ = write!(out, "<pre>{}</pre>", encode_minimal(&flash.text));
        } else {
            out.push_str(&encode_minimal(&flash.text));
        }
        if let Some(link) = &flash.link {
            let _ = write!(
                out,
                " <a href=\"{}\">{}</a>",
                encode_attribute(link),
                encode_minimal(link)
            );
        }
        out.push_str("</li>");
    }
    out.push_str("</ul>");
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n\
         <title>{}</title>\n<link rel=\"stylesheet\" href=\"{}\" />\n</head>\n\
         <body>\n{body}\n</body>\n</html>\n",
        encode_minimal(title),
        pages::assets::STYLESHEET_PATH,
    )
}
