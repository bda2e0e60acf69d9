//! Turns a conversational agent answer into chat HTML: numbered route
//! entries become styled route cards, surrounding prose is rendered as
//! sanitized markdown.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

/// One parsed numbered entry from an answer, e.g. a ferry connection with
/// its company, times, and fare lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCard {
    pub title: String,
    pub badge: Option<String>,
    pub details: Vec<(String, String)>,
    pub notes: Vec<String>,
}

impl RouteCard {
    fn new(title: String, badge: Option<String>) -> Self {
        Self {
            title,
            badge,
            details: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn detail(&self, label: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(label))
            .map(|(_, value)| value.as_str())
    }

    fn push_detail_line(&mut self, line: &str) {
        let trimmed = line.trim();
        let text = trimmed.strip_prefix("- ").unwrap_or(trimmed);
        let Some((label, value)) = split_labeled(text) else {
            self.notes.push(text.to_string());
            return;
        };
        if label.eq_ignore_ascii_case("departure") {
            if let Some(idx) = find_ignore_ascii_case(value, ", arrival:") {
                let departure = value[..idx].trim();
                let arrival = value[idx + ", arrival:".len()..].trim();
                self.details
                    .push(("Departure".to_string(), departure.to_string()));
                self.details
                    .push(("Arrival".to_string(), arrival.to_string()));
                return;
            }
        }
        self.details.push((label.to_string(), value.to_string()));
    }
}

enum Segment {
    Prose(String),
    Cards(Vec<RouteCard>),
}

/// Renders a full answer: card blocks become `route-card` divs, everything
/// else goes through the markdown pass.
#[must_use]
pub fn render_answer_html(answer: &str) -> String {
    let mut out = String::new();
    for segment in parse_answer(answer) {
        match segment {
            Segment::Prose(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push_str(&render_markdown_html(trimmed));
                }
            }
            Segment::Cards(cards) => {
                out.push_str("<div class=\"route-cards\">\n");
                for card in &cards {
                    out.push_str(&render_route_card(card));
                    out.push('\n');
                }
                out.push_str("</div>\n");
            }
        }
    }
    out
}

/// Extracts every numbered entry from an answer, in order.
#[must_use]
pub fn parse_route_cards(answer: &str) -> Vec<RouteCard> {
    let mut cards = Vec::new();
    for segment in parse_answer(answer) {
        if let Segment::Cards(block) = segment {
            cards.extend(block);
        }
    }
    cards
}

fn parse_answer(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut prose = String::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let Some((title, badge)) = split_numbered_heading(line) else {
            prose.push_str(line);
            prose.push('\n');
            continue;
        };
        flush_prose(&mut segments, &mut prose);
        let mut cards = Vec::new();
        let mut current = RouteCard::new(title, badge);
        'block: loop {
            while let Some(next) = lines.peek() {
                if next.trim().is_empty() || split_numbered_heading(next).is_some() {
                    break;
                }
                current.push_detail_line(next);
                lines.next();
            }
            loop {
                match lines.peek() {
                    Some(next) if next.trim().is_empty() => {
                        lines.next();
                    }
                    Some(next) => {
                        if let Some((title, badge)) = split_numbered_heading(next) {
                            lines.next();
                            cards.push(std::mem::replace(
                                &mut current,
                                RouteCard::new(title, badge),
                            ));
                            continue 'block;
                        }
                        break 'block;
                    }
                    None => break 'block,
                }
            }
        }
        cards.push(current);
        segments.push(Segment::Cards(cards));
    }
    flush_prose(&mut segments, &mut prose);
    segments
}

fn flush_prose(segments: &mut Vec<Segment>, prose: &mut String) {
    if !prose.trim().is_empty() {
        segments.push(Segment::Prose(std::mem::take(prose)));
    } else {
        prose.clear();
    }
}

/// Recognizes `N. Title` entry headings. A trailing short parenthesized
/// annotation such as `(Direct)` or `(Connection)` becomes the badge.
fn split_numbered_heading(line: &str) -> Option<(String, Option<String>)> {
    let trimmed = line.trim_start();
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || digits > 3 {
        return None;
    }
    let rest = trimmed[digits..].strip_prefix('.')?.strip_prefix(' ')?;
    let title = rest.trim();
    if title.is_empty() {
        return None;
    }
    if let Some(open) = title.rfind('(') {
        if title.ends_with(')') && open > 0 {
            let badge = title[open + 1..title.len() - 1].trim();
            if !badge.is_empty() && badge.len() <= 24 {
                let head = title[..open].trim();
                if !head.is_empty() {
                    return Some((head.to_string(), Some(badge.to_string())));
                }
            }
        }
    }
    Some((title.to_string(), None))
}

fn split_labeled(text: &str) -> Option<(&str, &str)> {
    let (label, value) = text.split_once(':')?;
    let label = label.trim();
    let value = value.trim();
    if label.is_empty() || value.is_empty() || label.len() > 40 {
        return None;
    }
    Some((label, value))
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(&needle.to_ascii_lowercase())
}

fn render_route_card(card: &RouteCard) -> String {
    let mut out = String::from("<div class=\"route-card\">");
    out.push_str("<div class=\"route-card-header\"><span class=\"route-card-title\">");
    out.push_str(&escape_html(&card.title));
    out.push_str("</span>");
    if let Some(badge) = &card.badge {
        out.push_str("<span class=\"route-card-badge\">");
        out.push_str(&escape_html(badge));
        out.push_str("</span>");
    }
    out.push_str("</div>");
    if !card.details.is_empty() {
        out.push_str("<dl class=\"route-card-details\">");
        for (label, value) in &card.details {
            out.push_str("<dt>");
            out.push_str(&escape_html(label));
            out.push_str("</dt><dd>");
            out.push_str(&escape_html(value));
            out.push_str("</dd>");
        }
        out.push_str("</dl>");
    }
    for note in &card.notes {
        out.push_str("<div class=\"route-card-note\">");
        out.push_str(&escape_html(note));
        out.push_str("</div>");
    }
    out.push_str("</div>");
    out
}

#[must_use]
pub fn escape_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Fares are stored as integer euro cents.
#[must_use]
pub fn format_euros(cents: i64) -> String {
    format!("€{}.{:02}", cents / 100, (cents % 100).abs())
}

/// Durations are stored as whole minutes.
#[must_use]
pub fn format_duration(minutes: i64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 && rest > 0 {
        format!("{hours}h {rest}m")
    } else if hours > 0 {
        format!("{hours}h")
    } else {
        format!("{rest}m")
    }
}

pub fn render_markdown_html(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(content, options).map(|event| match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: sanitize_link_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: sanitize_image_source(dest_url),
            title,
            id,
        }),
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(CowStr::from(raw.into_string())),
        other => other,
    });
    let mut output = String::new();
    html::push_html(&mut output, parser);
    output
}

fn sanitize_link_destination(dest_url: CowStr<'_>) -> CowStr<'static> {
    let value = dest_url.into_string();
    if is_safe_destination(&value, true) {
        CowStr::from(value)
    } else {
        CowStr::from("#")
    }
}

fn sanitize_image_source(dest_url: CowStr<'_>) -> CowStr<'static> {
    let value = dest_url.into_string();
    if is_safe_destination(&value, false) {
        CowStr::from(value)
    } else {
        CowStr::from("")
    }
}

fn is_safe_destination(value: &str, allow_mailto: bool) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("//") {
        return false;
    }
    if lower.starts_with('#')
        || lower.starts_with('/')
        || lower.starts_with("./")
        || lower.starts_with("../")
    {
        return true;
    }
    if lower.starts_with("http://")
        || lower.starts_with("https://")
        || (allow_mailto && lower.starts_with("mailto:"))
    {
        return true;
    }

    !lower.contains(':')
}
