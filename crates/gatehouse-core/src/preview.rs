//! Bounded previews for viewers who were denied access.
//!
//! The preview is the first `limit_words` words of the plain-text rendering of
//! the body. The read-time estimate always reflects the whole body.

use serde::{Deserialize, Serialize};

use crate::access::AccessDecision;

const ELLIPSIS: char = '…';

/// Tags whose contents never count as readable text.
const SKIPPED_TAGS: &[&str] = &["script", "style"];

/// Tags that end a block of text; they become whitespace when stripped.
const BLOCK_TAGS: &[&str] = &[
  "br", "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6",
  "blockquote", "pre", "tr", "td", "th", "section", "article", "hr",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewConfig {
  #[serde(default = "default_limit_words")]
  pub limit_words:      usize,
  #[serde(default = "default_words_per_minute")]
  pub words_per_minute: usize,
}

fn default_limit_words() -> usize { 150 }

fn default_words_per_minute() -> usize { 200 }

impl Default for PreviewConfig {
  fn default() -> Self {
    Self {
      limit_words:      default_limit_words(),
      words_per_minute: default_words_per_minute(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
  /// Plain-text preview, with an ellipsis when truncated.
  pub text:                String,
  /// `text`, escaped and wrapped in a single paragraph.
  pub html:                String,
  /// Word count of the full body.
  pub word_count:          usize,
  pub preview_word_count:  usize,
  pub truncated:           bool,
  /// Minutes to read the full body.
  pub estimated_read_time: usize,
}

/// Build a preview of `full_content` for a denied viewer.
///
/// Returns `None` when `decision` already grants access; there is nothing to
/// preview in that case.
pub fn preview(
  full_content: &str,
  decision: &AccessDecision,
  config: &PreviewConfig,
) -> Option<Preview> {
  if decision.has_access {
    return None;
  }

  let plain = strip_markup(full_content);
  let words: Vec<&str> = plain.split_whitespace().collect();
  let shown = words.len().min(config.limit_words);
  let truncated = shown < words.len();

  let mut text = words[..shown].join(" ");
  if truncated {
    text.push(ELLIPSIS);
  }
  let html = format!("<p>{}</p>", escape_html(&text));

  Some(Preview {
    html,
    text,
    word_count: words.len(),
    preview_word_count: shown,
    truncated,
    estimated_read_time: read_time_minutes(words.len(), config.words_per_minute),
  })
}

/// Whole minutes to read `words`, rounded up. Never zero for non-empty text.
pub fn read_time_minutes(words: usize, words_per_minute: usize) -> usize {
  if words == 0 {
    return 0;
  }
  words.div_ceil(words_per_minute.max(1)).max(1)
}

// ─── Markup ──────────────────────────────────────────────────────────────────

/// Remove tags and decode the common entities, leaving readable text.
pub fn strip_markup(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut rest = input;

  while let Some(start) = rest.find('<') {
    out.push_str(&decode_entities(&rest[..start]));
    let Some(len) = rest[start..].find('>') else {
      // Unterminated tag: treat the remainder as text.
      out.push_str(&decode_entities(&rest[start..]));
      return out;
    };

    let tag = &rest[start + 1..start + len];
    rest = &rest[start + len + 1..];

    let closing = tag.starts_with('/');
    let name = tag
      .trim_start_matches('/')
      .split(|c: char| c.is_whitespace() || c == '/')
      .next()
      .unwrap_or_default()
      .to_ascii_lowercase();

    if !closing && SKIPPED_TAGS.contains(&name.as_str()) {
      rest = skip_past_closing(rest, &name);
    } else if BLOCK_TAGS.contains(&name.as_str()) {
      out.push(' ');
    }
  }

  out.push_str(&decode_entities(rest));
  out
}

/// Drop everything up to and including `</name>`.
fn skip_past_closing<'a>(rest: &'a str, name: &str) -> &'a str {
  let needle = format!("</{name}");
  // ASCII lowercasing keeps byte offsets aligned with `rest`.
  let Some(at) = rest.to_ascii_lowercase().find(&needle) else {
    return "";
  };
  match rest[at..].find('>') {
    Some(end) => &rest[at + end + 1..],
    None => "",
  }
}

fn decode_entities(text: &str) -> String {
  if !text.contains('&') {
    return text.to_owned();
  }
  text
    .replace("&nbsp;", " ")
    .replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&quot;", "\"")
    .replace("&#39;", "'")
    .replace("&apos;", "'")
    .replace("&amp;", "&")
}

fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::access::AccessReason;

  fn denied() -> AccessDecision {
    AccessDecision {
      has_access:       false,
      reason:           AccessReason::None,
      requires_upgrade: true,
      release_date:     None,
      trial_days_left:  None,
    }
  }

  fn words(n: usize) -> String {
    (1..=n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
  }

  #[test]
  fn granted_decision_has_no_preview() {
    let decision = AccessDecision { has_access: true, ..denied() };
    assert!(preview("body", &decision, &PreviewConfig::default()).is_none());
  }

  #[test]
  fn read_time_uses_full_word_count() {
    let config = PreviewConfig { limit_words: 10, words_per_minute: 200 };
    let p = preview(&words(1000), &denied(), &config).unwrap();
    assert_eq!(p.preview_word_count, 10);
    assert_eq!(p.word_count, 1000);
    assert_eq!(p.estimated_read_time, 5);
    assert!(p.truncated);
    assert_eq!(p.text, format!("{}…", words(10)));
  }

  #[test]
  fn short_content_is_not_truncated() {
    let p = preview("just a few words", &denied(), &PreviewConfig::default()).unwrap();
    assert!(!p.truncated);
    assert_eq!(p.text, "just a few words");
    assert_eq!(p.word_count, 4);
    assert_eq!(p.estimated_read_time, 1);
  }

  #[test]
  fn empty_content_reads_in_zero_minutes() {
    let p = preview("", &denied(), &PreviewConfig::default()).unwrap();
    assert_eq!(p.word_count, 0);
    assert_eq!(p.estimated_read_time, 0);
    assert_eq!(p.html, "<p></p>");
  }

  #[test]
  fn markup_is_stripped_before_counting() {
    let body = "<h1>Title</h1><p>First <b>bold</b> para.</p><p>Second&nbsp;one</p>";
    let config = PreviewConfig { limit_words: 3, words_per_minute: 200 };
    let p = preview(body, &denied(), &config).unwrap();
    assert_eq!(p.word_count, 6);
    assert_eq!(p.text, "Title First bold…");
  }

  #[test]
  fn block_tags_separate_words() {
    assert_eq!(
      strip_markup("one<br>two<p>three</p>").split_whitespace().count(),
      3
    );
  }

  #[test]
  fn script_and_style_bodies_are_dropped() {
    let text = strip_markup("a<script>var x = 1 < 2;</script>b<style>p{}</style> c");
    assert_eq!(text.split_whitespace().collect::<Vec<_>>(), vec!["ab", "c"]);
  }

  #[test]
  fn preview_html_is_escaped() {
    let p = preview("Tom &amp; Jerry &lt;3", &denied(), &PreviewConfig::default()).unwrap();
    assert_eq!(p.text, "Tom & Jerry <3");
    assert_eq!(p.html, "<p>Tom &amp; Jerry &lt;3</p>");
  }

  #[test]
  fn preview_is_deterministic() {
    let body = words(300);
    let config = PreviewConfig::default();
    assert_eq!(
      preview(&body, &denied(), &config),
      preview(&body, &denied(), &config)
    );
  }
}
