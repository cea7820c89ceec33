use bytes::Bytes;
use serde::Serialize;

use crate::model::*;

use super::PayloadFormat;

/// Server → client push envelope for structured clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Push<'a> {
    Message(&'a ChatMessage),
}

pub fn render(message: &ChatMessage, format: PayloadFormat) -> Result<Bytes, serde_json::Error> {
    match format {
        PayloadFormat::Json => serde_json::to_vec(&Push::Message(message)).map(Bytes::from),
        PayloadFormat::Html => Ok(Bytes::from(html_fragment(message))),
    }
}

fn html_fragment(message: &ChatMessage) -> String {
    format!(
        "<div class=\"chat-message\" data-message-id=\"{}\" data-posted-at=\"{}\">\
         <span class=\"chat-author\">{}</span>\
         <span class=\"chat-text\">{}</span></div>",
        message.id,
        message.posted_at,
        escape_html(&message.author_name),
        escape_html(&message.text),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            c => out.push(c),
        }
    }
    out
}
