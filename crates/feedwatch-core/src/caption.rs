//! Caption rendering for release notifications.
//!
//! Captions use Telegram's HTML parse mode. Telegram limits a media caption
//! to 1024 characters of *visible* text (after entities are parsed, counted
//! in UTF-16 code units), so every budget computation here uses
//! [`caption_len`] on visible text, never the length of the markup.
//!
//! Layout:
//!
//! ```text
//! <header, linked to the release page>
//! Title: <title>
//! Original: <original title>
//! Description: <description, italic, truncated to fit>
//!
//!  1-12  | WEBRip 1080p |  1.46 GB  ⬇ 🧲
//! 13-24  | WEBRip 720p  | 700.00 MB ⬇ 🧲
//! ```
//!
//! Each table row links the raw download and the magnet redirect endpoint.

use std::sync::OnceLock;

use feedwatch_models::Release;
use regex::Regex;
use thiserror::Error;

use crate::magnet::MagnetLinks;

/// Maximum visible caption length accepted by the delivery transport.
pub const CAPTION_LIMIT: usize = 1024;

/// Glyph linking the raw download.
const DOWNLOAD_GLYPH: &str = "⬇";

/// Glyph linking the magnet redirect.
const MAGNET_GLYPH: &str = "🧲";

/// Glyph linking back to the release page after a truncated description.
const ELLIPSIS: &str = "…";

/// Errors raised while rendering a caption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    /// Metadata alone exceeds the caption budget.
    #[error("caption for {original_title:?} exceeds {limit} characters by {excess} before the description")]
    Overflow {
        original_title: String,
        limit: usize,
        excess: usize,
    },
}

/// Length of text as counted by the delivery transport.
pub fn caption_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Escapes text for HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decodes character references in one pass, so `&amp;lt;` yields `&lt;`.
///
/// Numeric references and the named entities common in release
/// descriptions are decoded; unknown names and invalid code points are left
/// as written and get escaped again on render.
fn unescape_html(text: &str) -> String {
    entity_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let decoded = if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else {
                caps.get(3).and_then(|name| named_entity(name.as_str()))
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "laquo" => '\u{00AB}',
        "raquo" => '\u{00BB}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "bull" => '\u{2022}',
        "middot" => '\u{00B7}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        "times" => '\u{00D7}',
        _ => return None,
    };
    Some(c)
}

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([a-zA-Z]+));").expect("entity pattern is valid")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn line_break_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"))
}

fn blank_lines_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+\n").expect("blank lines pattern is valid"))
}

/// The text a reader sees once the HTML markup has been parsed.
pub fn visible_text(html: &str) -> String {
    unescape_html(&tag_pattern().replace_all(html, ""))
}

/// Normalizes a raw description to plain text.
///
/// Carriage returns are dropped, `<br>` tags become newlines, remaining tags
/// are stripped, runs of blank lines collapse to one, and leading/trailing
/// whitespace (including trailing blank lines) is removed.
pub fn normalize_description(raw: &str) -> String {
    let text = raw.replace('\r', "");
    let text = line_break_pattern().replace_all(&text, "\n");
    let text = tag_pattern().replace_all(&text, "");
    let text = unescape_html(&text);
    let text = blank_lines_pattern().replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Formats a byte count with binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Pads `text` with spaces on both sides to `width` characters.
///
/// The left side gets the smaller half of the padding.
pub fn center(text: &str, width: usize) -> String {
    let extra = width.saturating_sub(text.chars().count());
    let left = extra / 2;
    let right = extra - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.map(|s| s.chars().count()).max().unwrap_or(0)
}

/// Truncates `text` to at most `max` UTF-16 code units on a char boundary.
fn truncate_to(text: &str, max: usize) -> &str {
    let mut used = 0;
    for (idx, c) in text.char_indices() {
        if used + c.len_utf16() > max {
            return &text[..idx];
        }
        used += c.len_utf16();
    }
    text
}

fn assemble(link: &str, header: &str, title: &str, original: &str, description: &str) -> String {
    format!(
        "<a href=\"{link}\"><b>{header}</b></a>\n\
         <b>Title:</b> {title}\n\
         <b>Original:</b> {original}\n\
         <b>Description:</b> <i>{description}</i>\n",
        link = escape_html(link),
    )
}

fn assemble_row(series: &str, type_label: &str, size: &str, download: &str, magnet: &str) -> String {
    format!(
        "\n<code>{series} | {type_label} | {size}</code> \
         <a href=\"{download}\">{DOWNLOAD_GLYPH}</a> \
         <a href=\"{magnet}\">{MAGNET_GLYPH}</a>",
        download = escape_html(download),
        magnet = escape_html(magnet),
    )
}

/// Visible characters of the caption template with every field empty.
pub fn fixed_overhead() -> usize {
    static OVERHEAD: OnceLock<usize> = OnceLock::new();
    *OVERHEAD.get_or_init(|| caption_len(&visible_text(&assemble("", "", "", "", ""))))
}

/// Visible characters of one table row with every field empty.
pub fn fixed_per_row_chars() -> usize {
    static PER_ROW: OnceLock<usize> = OnceLock::new();
    *PER_ROW.get_or_init(|| caption_len(&visible_text(&assemble_row("", "", "", "", ""))))
}

/// One padded table row, before it is turned into markup.
struct TableRow {
    series: String,
    type_label: String,
    size: String,
    download_url: String,
    magnet_url: String,
}

impl TableRow {
    fn visible_len(&self) -> usize {
        caption_len(&self.series)
            + caption_len(&self.type_label)
            + caption_len(&self.size)
            + fixed_per_row_chars()
    }

    fn to_html(&self) -> String {
        assemble_row(
            &escape_html(&self.series),
            &escape_html(&self.type_label),
            &escape_html(&self.size),
            &self.download_url,
            &self.magnet_url,
        )
    }
}

/// Turns a release into a bounded notification caption.
#[derive(Debug, Clone)]
pub struct CaptionRenderer {
    links: MagnetLinks,
}

impl CaptionRenderer {
    pub fn new(links: MagnetLinks) -> Self {
        Self { links }
    }

    /// Builds the aligned variant table.
    fn table(&self, release: &Release) -> Vec<TableRow> {
        let sizes: Vec<String> = release
            .variants
            .iter()
            .map(|v| format_size(v.size_bytes))
            .collect();

        let series_width = column_width(release.variants.iter().map(|v| v.series.as_str()));
        let type_width = column_width(release.variants.iter().map(|v| v.type_label.as_str()));
        let size_width = column_width(sizes.iter().map(String::as_str));

        release
            .variants
            .iter()
            .zip(&sizes)
            .map(|(variant, size)| TableRow {
                series: center(&variant.series, series_width),
                type_label: center(&variant.type_label, type_width),
                size: center(size, size_width),
                download_url: variant.download_url.clone(),
                magnet_url: self.links.link(release.id.as_str(), &variant.type_label),
            })
            .collect()
    }

    /// Renders the caption for `release` under `header`.
    ///
    /// The visible length of the result never exceeds [`CAPTION_LIMIT`]. The
    /// description is the only part that gets shortened; if everything else
    /// already exceeds the limit, [`CaptionError::Overflow`] is returned.
    pub fn render(&self, header: &str, release: &Release) -> Result<String, CaptionError> {
        let meta = &release.meta;
        let rows = self.table(release);

        let used = fixed_overhead()
            + caption_len(header)
            + caption_len(&meta.title)
            + caption_len(&meta.original_title)
            + rows.iter().map(TableRow::visible_len).sum::<usize>();

        if used > CAPTION_LIMIT {
            return Err(CaptionError::Overflow {
                original_title: meta.original_title.clone(),
                limit: CAPTION_LIMIT,
                excess: used - CAPTION_LIMIT,
            });
        }
        let remaining = CAPTION_LIMIT - used;

        let description = normalize_description(&meta.description);
        let description_html = if caption_len(&description) <= remaining {
            escape_html(&description)
        } else if remaining == 0 {
            String::new()
        } else {
            let kept = truncate_to(&description, remaining - caption_len(ELLIPSIS));
            format!(
                "{}</i><a href=\"{}\">{}</a><i>",
                escape_html(kept),
                escape_html(&meta.link),
                ELLIPSIS
            )
        };

        let mut caption = assemble(
            &meta.link,
            &escape_html(header),
            &escape_html(&meta.title),
            &escape_html(&meta.original_title),
            &description_html,
        );
        for row in &rows {
            caption.push_str(&row.to_html());
        }
        Ok(caption)
    }
}
