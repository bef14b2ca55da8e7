//! Minimal HTML-to-text extraction for fetched pages.
//!
//! No DOM: a single pass that drops tags, skips script/style/nav/footer
//! subtrees, inserts newlines at block boundaries, and decodes the common
//! entities. Good enough for readable article text without a browser.

/// Elements whose entire content is noise for research purposes.
const SKIPPED: &[&str] = &["script", "style", "nav", "footer", "header", "aside", "iframe"];

const BLOCK_PREFIXES: &[&str] = &[
    "p", "/p", "br", "div", "/div", "h1", "h2", "h3", "h4", "h5", "h6", "/h", "li", "tr",
];

pub fn html_to_text(html: &str) -> String {
    let mut text = String::new();
    let mut in_tag = false;
    let mut building_tag = false;
    let mut tag_name = String::new();
    let mut skip_depth = 0usize;

    for ch in html.chars() {
        if ch == '<' {
            in_tag = true;
            building_tag = true;
            tag_name.clear();
            continue;
        }
        if ch == '>' {
            in_tag = false;
            building_tag = false;

            let tag = tag_name.to_lowercase();
            if SKIPPED.contains(&tag.as_str()) {
                skip_depth += 1;
            } else if let Some(opened) = tag.strip_prefix('/') {
                if SKIPPED.contains(&opened) {
                    skip_depth = skip_depth.saturating_sub(1);
                }
            }
            if skip_depth == 0 && BLOCK_PREFIXES.iter().any(|p| tag.starts_with(p)) {
                text.push('\n');
            }
            continue;
        }
        if in_tag {
            if building_tag && (ch.is_alphanumeric() || ch == '/') {
                tag_name.push(ch);
            } else {
                building_tag = false;
            }
            continue;
        }
        if skip_depth > 0 {
            continue;
        }
        text.push(ch);
    }

    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    let mut lines: Vec<&str> = text.lines().map(str::trim).collect();
    lines.dedup_by(|a, b| a.is_empty() && b.is_empty());
    lines
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
