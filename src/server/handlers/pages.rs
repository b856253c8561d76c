//! Minimal HTML pages. Styling and client behaviour live outside this crate.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;

use crate::state::AppState;
use crate::themes::ThemeConfig;

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&state.theme))
}

pub fn render_index(theme: &ThemeConfig) -> String {
    let name = escape_html(&theme.app_name);
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\" data-theme=\"{id}\">\n\
         <head><meta charset=\"UTF-8\"><title>{name}</title></head>\n\
         <body class=\"{css}\">\n\
         <h1>{name}</h1>\n\
         <ul>\n\
         <li>POST upload: multipart field <code>file</code> (.pdf or .txt)</li>\n\
         <li>GET documents</li>\n\
         <li>DELETE documents/&lt;name&gt;</li>\n\
         <li>POST chat: <code>{{\"query\": \"...\", \"sources\": [...]}}</code></li>\n\
         </ul>\n\
         </body>\n\
         </html>\n",
        id = theme.id,
        css = escape_html(&theme.theme_css),
    )
}

/// Landing page linking to each mounted theme.
pub fn render_landing(themes: &[&ThemeConfig]) -> String {
    let links: String = themes
        .iter()
        .map(|theme| {
            format!(
                "<li><a href=\"{}/\">{}</a></li>\n",
                escape_html(theme.mount_path.trim_end_matches('/')),
                escape_html(&theme.app_name)
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head><meta charset=\"UTF-8\"><title>Project Corpus | Select Domain</title></head>\n\
         <body>\n\
         <h1>Project Corpus</h1>\n\
         <ul>\n{links}</ul>\n\
         </body>\n\
         </html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
