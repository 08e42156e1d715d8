//! Structured rich text: model, plain-text extraction, and HTML rendering
//!
//! Span offsets coming from the CMS are UTF-16 code unit positions into the
//! block text; they are converted to byte offsets before slicing.

use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::sanitize::{safe_class, safe_url};
use crate::helpers::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Preformatted,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    ListItem,
    OListItem,
    Image,
    Embed,
    #[serde(other)]
    Unknown,
}

impl BlockKind {
    fn heading_level(self) -> Option<u8> {
        match self {
            BlockKind::Heading1 => Some(1),
            BlockKind::Heading2 => Some(2),
            BlockKind::Heading3 => Some(3),
            BlockKind::Heading4 => Some(4),
            BlockKind::Heading5 => Some(5),
            BlockKind::Heading6 => Some(6),
            _ => None,
        }
    }

    fn list_tag(self) -> Option<&'static str> {
        match self {
            BlockKind::ListItem => Some("ul"),
            BlockKind::OListItem => Some("ol"),
            _ => None,
        }
    }
}

/// One block of rich text (paragraph, heading, list item, image, embed...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spans: Vec<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Embed>,
}

impl RichTextBlock {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub embed_url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// How links are resolved and whether output is sanitized
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    /// Site root, used for links to other posts
    pub root: String,
    /// Documents of this type link to `post/<uid>/`
    pub document_type: String,
    pub sanitize: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            document_type: "posts".to_string(),
            sanitize: true,
        }
    }
}

/// Plain text of every block, joined by a single space
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render blocks to HTML; consecutive list items share one `<ul>`/`<ol>`
pub fn as_html(blocks: &[RichTextBlock], options: &HtmlOptions) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list_tag = block.kind.list_tag();
        if open_list != list_tag {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }
        html.push_str(&render_block(block, options));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn render_block(block: &RichTextBlock, options: &HtmlOptions) -> String {
    if let Some(level) = block.kind.heading_level() {
        return format!(
            "<h{level}>{}</h{level}>",
            render_spans(&block.text, &block.spans, options)
        );
    }

    match block.kind {
        BlockKind::Paragraph => format!(
            "<p>{}</p>",
            render_spans(&block.text, &block.spans, options)
        ),
        BlockKind::Preformatted => format!(
            "<pre>{}</pre>",
            render_spans(&block.text, &block.spans, options)
        ),
        BlockKind::ListItem | BlockKind::OListItem => format!(
            "<li>{}</li>",
            render_spans(&block.text, &block.spans, options)
        ),
        BlockKind::Image => match block.url.as_deref().and_then(|u| checked_url(u, options)) {
            Some(src) => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                escape_html(src),
                escape_html(block.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        BlockKind::Embed => block
            .oembed
            .as_ref()
            .map(|embed| render_embed(embed, options))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn render_embed(embed: &Embed, options: &HtmlOptions) -> String {
    let url = checked_url(&embed.embed_url, options).unwrap_or("");
    let mut attrs = format!(
        r#"data-oembed="{}" data-oembed-type="{}""#,
        escape_html(url),
        escape_html(&embed.kind)
    );
    if let Some(provider) = &embed.provider_name {
        attrs.push_str(&format!(r#" data-oembed-provider="{}""#, escape_html(provider)));
    }

    let inner = match &embed.html {
        Some(html) if !options.sanitize => html.clone(),
        _ if !url.is_empty() => format!(
            r#"<a href="{}">{}</a>"#,
            escape_html(url),
            escape_html(url)
        ),
        _ => String::new(),
    };

    format!("<div {}>{}</div>", attrs, inner)
}

fn checked_url<'a>(url: &'a str, options: &HtmlOptions) -> Option<&'a str> {
    if options.sanitize {
        safe_url(url)
    } else {
        Some(url)
    }
}

struct OpenTag {
    open: String,
    close: &'static str,
}

fn span_tag(span: &Span, options: &HtmlOptions) -> OpenTag {
    match span.kind {
        SpanKind::Strong => OpenTag {
            open: "<strong>".to_string(),
            close: "</strong>",
        },
        SpanKind::Em => OpenTag {
            open: "<em>".to_string(),
            close: "</em>",
        },
        SpanKind::Label => {
            let class = span
                .data
                .as_ref()
                .and_then(|d| d.label.as_deref())
                .map(safe_class)
                .unwrap_or_default();
            OpenTag {
                open: format!(r#"<span class="{}">"#, class),
                close: "</span>",
            }
        }
        SpanKind::Hyperlink => match span.data.as_ref().and_then(|d| resolve_link(d, options)) {
            Some((href, target)) => {
                let target = target
                    .map(|t| format!(r#" target="{}" rel="noopener""#, escape_html(&t)))
                    .unwrap_or_default();
                OpenTag {
                    open: format!(r#"<a href="{}"{}>"#, escape_html(&href), target),
                    close: "</a>",
                }
            }
            None => OpenTag {
                open: String::new(),
                close: "",
            },
        },
        SpanKind::Unknown => OpenTag {
            open: String::new(),
            close: "",
        },
    }
}

/// Hyperlink target: document links to our own posts, web/media links as given
fn resolve_link(data: &SpanData, options: &HtmlOptions) -> Option<(String, Option<String>)> {
    if data.link_type.as_deref() == Some("Document") {
        let uid = data.uid.as_deref()?;
        if data.document_type.as_deref() != Some(options.document_type.as_str()) {
            return None;
        }
        let root = options.root.trim_end_matches('/');
        let href = format!("{}/{}", root, crate::helpers::post_path(uid));
        return Some((href, None));
    }

    let url = checked_url(data.url.as_deref()?, options)?;
    Some((url.to_string(), data.target.clone()))
}

/// Byte offset of the given UTF-16 position, clamped to the text length
fn byte_index(text: &str, utf16_pos: usize) -> usize {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        if units >= utf16_pos {
            return idx;
        }
        units += ch.len_utf16();
    }
    text.len()
}

fn escape_text(text: &str) -> String {
    escape_html(text).replace('\n', "<br />")
}

/// Render text with its spans applied; overlapping spans are closed and
/// reopened so the output is always well nested
fn render_spans(text: &str, spans: &[Span], options: &HtmlOptions) -> String {
    let mut ranges: Vec<(usize, usize, &Span)> = spans
        .iter()
        .filter_map(|span| {
            let start = byte_index(text, span.start);
            let end = byte_index(text, span.end);
            (start < end).then_some((start, end, span))
        })
        .collect();
    // Outer spans first when several start at the same position
    ranges.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut bounds: Vec<usize> = ranges
        .iter()
        .flat_map(|(start, end, _)| [*start, *end])
        .chain([0, text.len()])
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut html = String::with_capacity(text.len());
    let mut stack: Vec<(usize, OpenTag)> = Vec::new();
    let mut next_range = 0;

    for window in bounds.windows(2) {
        let (pos, next) = (window[0], window[1]);

        if stack.iter().any(|(end, _)| *end <= pos) {
            let mut reopen = Vec::new();
            while let Some((end, tag)) = stack.pop() {
                html.push_str(tag.close);
                if end > pos {
                    reopen.push((end, tag));
                }
                if !stack.iter().any(|(end, _)| *end <= pos) {
                    break;
                }
            }
            for (end, tag) in reopen.into_iter().rev() {
                html.push_str(&tag.open);
                stack.push((end, tag));
            }
        }

        while next_range < ranges.len() && ranges[next_range].0 == pos {
            let (_, end, span) = ranges[next_range];
            let tag = span_tag(span, options);
            html.push_str(&tag.open);
            stack.push((end, tag));
            next_range += 1;
        }

        html.push_str(&escape_text(&text[pos..next]));
    }

    while let Some((_, tag)) = stack.pop() {
        html.push_str(tag.close);
    }

    html
}
