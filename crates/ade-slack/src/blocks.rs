//! Block Kit rendering of [`Content`].

use ade_core::compose::{ALL_HEALTHY, Content, Digest, DigestBody};
use serde_json::{Value, json};

/// Full `chat.postMessage` body for `content` addressed to `channel`.
pub fn payload(channel: &str, content: &Content) -> Value {
  match content {
    Content::Text(text) => json!({ "channel": channel, "text": text }),
    Content::Digest(Digest::AllHealthy) => json!({
      "channel": channel,
      "text": ALL_HEALTHY,
      "blocks": [{ "type": "section", "text": plain(ALL_HEALTHY) }],
    }),
    Content::Digest(Digest::Attention(body)) => json!({
      "channel": channel,
      "text": format!("{} Azure Deployment Environment Expiration Alert", body.marker()),
      "blocks": digest_blocks(body),
    }),
  }
}

fn plain(text: &str) -> Value { json!({ "type": "plain_text", "text": text, "emoji": true }) }

fn mrkdwn(text: &str) -> Value { json!({ "type": "mrkdwn", "text": text }) }

fn section(text: &str) -> Value { json!({ "type": "section", "text": mrkdwn(text) }) }

fn context(text: &str) -> Value { json!({ "type": "context", "elements": [mrkdwn(text)] }) }

fn divider() -> Value { json!({ "type": "divider" }) }

pub fn digest_blocks(body: &DigestBody) -> Vec<Value> {
  let mut blocks = vec![
    json!({ "type": "header", "text": plain(&body.title()) }),
    section(&body.summary_text()),
    divider(),
  ];

  for (i, group) in body.sections.iter().enumerate() {
    if i > 0 {
      blocks.push(divider());
    }
    blocks.push(section(&group.heading()));
    blocks.extend(group.entries.iter().map(|entry| section(&entry.to_string())));
    if let Some(note) = group.omitted_note() {
      blocks.push(context(&note));
    }
  }

  blocks.push(divider());
  blocks.push(context(&body.footer()));
  blocks
}
