//! Deterministic placeholder artwork for media that cannot be reached.
//!
//! The SHA-256 of the title and category picks a palette and an icon set, so
//! the same article always gets the same card. Output is an SVG document and
//! never touches the network.
//!
//! Stand-ins are vector rather than raster: an SVG data URI renders anywhere
//! an `<img>` does, stays byte-stable for a given input, and needs no image
//! encoder.

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use sha2::{Digest, Sha256};

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

const MAX_TITLE_LINES: usize = 4;
const ICON_COUNT: usize = 6;
const FALLBACK_TITLE: &str = "Untitled";

/// Smallest edge, in pixels, a card is rendered at.
pub const MIN_DIMENSION: u32 = 64;
/// Largest edge, in pixels, a card is rendered at.
pub const MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackConfig {
    pub width: u32,
    pub height: u32,
    pub brand: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            brand: "mediaward".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

impl SyntheticImage {
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

struct Palette {
    start: &'static str,
    end: &'static str,
    accent: &'static str,
    text: &'static str,
}

const PALETTES: [Palette; 6] = [
    Palette {
        start: "#1e3a8a",
        end: "#0f766e",
        accent: "#99f6e4",
        text: "#f8fafc",
    },
    Palette {
        start: "#7c2d12",
        end: "#be123c",
        accent: "#fed7aa",
        text: "#fff7ed",
    },
    Palette {
        start: "#312e81",
        end: "#6d28d9",
        accent: "#ddd6fe",
        text: "#faf5ff",
    },
    Palette {
        start: "#14532d",
        end: "#3f6212",
        accent: "#d9f99d",
        text: "#f7fee7",
    },
    Palette {
        start: "#0c4a6e",
        end: "#155e75",
        accent: "#bae6fd",
        text: "#f0f9ff",
    },
    Palette {
        start: "#27272a",
        end: "#52525b",
        accent: "#fde68a",
        text: "#fafafa",
    },
];

// 24x24 path data.
const ICON_SETS: [&[&str]; 4] = [
    // photography
    &[
        "M3 5h18v14H3z",
        "M2 20l7-11 5 7 3-4 5 8z",
        "M12 7a5 5 0 1 0 0.01 0z",
    ],
    // nature
    &[
        "M5 19C5 9 11 4 20 4c0 9-5 15-15 15z",
        "M12 2l3 7h7l-5.5 4.5 2 7.5-6.5-4.5-6.5 4.5 2-7.5L2 9h7z",
        "M2 20l7-11 5 7 3-4 5 8z",
    ],
    // technology
    &[
        "M8 6l-6 6 6 6 1.5-1.5L5 12l4.5-4.5z M16 6l6 6-6 6-1.5-1.5L19 12l-4.5-4.5z",
        "M7 7h10v10H7z",
        "M13 2L4 14h7l-1 8 9-12h-7z",
    ],
    // writing
    &[
        "M4 4h7a2 2 0 0 1 2 2v14a2 2 0 0 0-2-2H4z M20 4h-5a2 2 0 0 0-2 2v14a2 2 0 0 1 2-2h5z",
        "M3 21l3-1 12-12-2-2L4 18z",
        "M6 17h3l2-4V7H5v6h3z M14 17h3l2-4V7h-6v6h3z",
    ],
];

pub struct SyntheticFallback {
    config: FallbackConfig,
}

impl SyntheticFallback {
    /// Dimensions outside `MIN_DIMENSION..=MAX_DIMENSION` are clamped.
    pub fn new(mut config: FallbackConfig) -> Self {
        config.width = config.width.clamp(MIN_DIMENSION, MAX_DIMENSION);
        config.height = config.height.clamp(MIN_DIMENSION, MAX_DIMENSION);
        Self { config }
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    pub fn generate(&self, title: &str, category: Option<&str>) -> SyntheticImage {
        let title = title.trim();
        let title = if title.is_empty() { FALLBACK_TITLE } else { title };
        let category = category.map(str::trim).filter(|value| !value.is_empty());

        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update([0x1f]);
        hasher.update(category.unwrap_or_default().as_bytes());
        let digest = hasher.finalize();

        let svg = self.render(title, category, digest.as_slice());
        SyntheticImage {
            bytes: Bytes::from(svg),
            content_type: SVG_CONTENT_TYPE,
        }
    }

    pub fn data_uri(&self, title: &str, category: Option<&str>) -> String {
        self.generate(title, category).to_data_uri()
    }

    fn render(&self, title: &str, category: Option<&str>, digest: &[u8]) -> String {
        let width = self.config.width;
        let height = self.config.height;
        let palette = &PALETTES[usize::from(digest[0]) % PALETTES.len()];
        let icons = ICON_SETS[usize::from(digest[1]) % ICON_SETS.len()];

        let footer = (height / 9).max(24);
        let font_size = (height / 11).max(14);
        let line_height = font_size + font_size / 4;
        let chars_per_line = ((width * 10) / (font_size * 6)).max(8) as usize;
        let lines = wrap_title(title, chars_per_line, MAX_TITLE_LINES);

        let mut svg = String::with_capacity(4096);
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" role="img" aria-label="{label}">"#,
            label = escape_xml(title),
        ));
        svg.push_str(&format!(
            r#"<defs><linearGradient id="bg" x1="0" y1="0" x2="1" y2="1"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient>"#,
            palette.start, palette.end,
        ));
        svg.push_str(
            r##"<filter id="shadow" x="-10%" y="-10%" width="120%" height="120%"><feDropShadow dx="0" dy="2" stdDeviation="3" flood-color="#000000" flood-opacity="0.45"/></filter></defs>"##,
        );
        svg.push_str(r#"<rect width="100%" height="100%" fill="url(#bg)"/>"#);

        svg.push_str(&format!(
            r#"<g fill="{}" fill-opacity="0.12">"#,
            palette.accent
        ));
        let usable_height = height.saturating_sub(footer).max(1);
        for slot in 0..ICON_COUNT {
            let seed = &digest[2 + slot * 3..5 + slot * 3];
            let x = u32::from(seed[0]) * width / 255;
            let y = u32::from(seed[1]) * usable_height / 255;
            let scale = 2 + u32::from(seed[2]) % 4;
            let path = icons[slot % icons.len()];
            svg.push_str(&format!(
                r#"<path transform="translate({x} {y}) scale({scale})" d="{path}"/>"#
            ));
        }
        svg.push_str("</g>");

        let center_x = width / 2;
        let block = line_height * lines.len() as u32;
        let first_baseline = (usable_height.saturating_sub(block)) / 2 + font_size;
        svg.push_str(&format!(
            r#"<text x="{center_x}" text-anchor="middle" font-family="system-ui, sans-serif" font-size="{font_size}" font-weight="700" fill="{}" filter="url(#shadow)">"#,
            palette.text,
        ));
        for (index, line) in lines.iter().enumerate() {
            let y = first_baseline + line_height * index as u32;
            svg.push_str(&format!(
                r#"<tspan x="{center_x}" y="{y}">{}</tspan>"#,
                escape_xml(line)
            ));
        }
        svg.push_str("</text>");

        svg.push_str(&format!(
            r#"<rect x="0.5" y="0.5" width="{}" height="{}" fill="none" stroke="{}" stroke-opacity="0.6"/>"#,
            width.saturating_sub(1),
            height.saturating_sub(1),
            palette.accent,
        ));

        let footer_top = height.saturating_sub(footer);
        let footer_baseline = footer_top + footer * 2 / 3;
        let footer_font = (footer / 2).max(10);
        svg.push_str(&format!(
            r##"<rect x="0" y="{footer_top}" width="{width}" height="{footer}" fill="#000000" fill-opacity="0.35"/>"##
        ));
        svg.push_str(&format!(
            r#"<text x="16" y="{footer_baseline}" font-family="system-ui, sans-serif" font-size="{footer_font}" fill="{}">{}</text>"#,
            palette.accent,
            escape_xml(&self.config.brand),
        ));
        if let Some(category) = category {
            svg.push_str(&format!(
                r#"<text x="{}" y="{footer_baseline}" text-anchor="end" font-family="system-ui, sans-serif" font-size="{footer_font}" fill="{}">{}</text>"#,
                width.saturating_sub(16),
                palette.text,
                escape_xml(category),
            ));
        }
        svg.push_str("</svg>");
        svg
    }
}

/// Greedy word wrap. Overlong words are cut; overflow past `max_lines` ends
/// the last line with an ellipsis.
fn wrap_title(title: &str, width: usize, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut overflow = false;

    for word in title.split_whitespace() {
        let word: String = word.chars().take(width).collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed <= width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
            continue;
        }

        lines.push(std::mem::take(&mut current));
        if lines.len() == max_lines {
            overflow = true;
            break;
        }
        current = word;
    }

    if !overflow && !current.is_empty() {
        lines.push(current);
    }

    if overflow && let Some(last) = lines.last_mut() {
        let mut kept: String = last.chars().take(width.saturating_sub(1)).collect();
        kept.truncate(kept.trim_end().len());
        kept.push('…');
        *last = kept;
    }
    lines
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> SyntheticFallback {
        SyntheticFallback::new(FallbackConfig::default())
    }

    fn svg_text(image: &SyntheticImage) -> String {
        String::from_utf8(image.bytes.to_vec()).expect("svg is utf-8")
    }

    #[test]
    fn identical_input_is_byte_identical() {
        let first = fallback().generate("Spring in Kyoto", Some("travel"));
        let second = fallback().generate("Spring in Kyoto", Some("travel"));
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.content_type, SVG_CONTENT_TYPE);
    }

    #[test]
    fn category_changes_the_artwork() {
        let travel = fallback().generate("Spring in Kyoto", Some("travel"));
        let food = fallback().generate("Spring in Kyoto", Some("food"));
        assert_ne!(travel.bytes, food.bytes);
    }

    #[test]
    fn composition_has_every_layer() {
        let svg = svg_text(&fallback().generate("Notes", Some("essays")));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("linearGradient"));
        assert!(svg.contains("fill-opacity=\"0.12\""));
        assert!(svg.contains("feDropShadow"));
        assert!(svg.contains("stroke-opacity"));
        assert!(svg.contains(">mediaward</text>"));
        assert!(svg.contains(">essays</text>"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn markup_in_titles_is_escaped() {
        let svg = svg_text(&fallback().generate("<script>&\"", None));
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;script&gt;&amp;&quot;"));
    }

    #[test]
    fn empty_titles_still_render() {
        let svg = svg_text(&fallback().generate("   ", None));
        assert!(svg.contains(FALLBACK_TITLE));
    }

    #[test]
    fn long_titles_are_capped_with_an_ellipsis() {
        let title = "word ".repeat(80);
        let lines = wrap_title(&title, 20, MAX_TITLE_LINES);
        assert_eq!(lines.len(), MAX_TITLE_LINES);
        assert!(lines.iter().all(|line| line.chars().count() <= 20));
        assert!(lines[MAX_TITLE_LINES - 1].ends_with('…'));
    }

    #[test]
    fn short_titles_fit_on_one_line() {
        assert_eq!(wrap_title("Hello world", 20, 4), vec!["Hello world"]);
    }

    #[test]
    fn oversized_dimensions_are_clamped() {
        let huge = SyntheticFallback::new(FallbackConfig {
            width: u32::MAX,
            height: u32::MAX,
            ..FallbackConfig::default()
        });
        assert_eq!(huge.config().width, MAX_DIMENSION);
        assert_eq!(huge.config().height, MAX_DIMENSION);

        let svg = svg_text(&huge.generate("Wide load", Some("maps")));
        assert!(svg.contains("width=\"4096\" height=\"4096\""));

        let tiny = SyntheticFallback::new(FallbackConfig {
            width: 1,
            height: 1,
            ..FallbackConfig::default()
        });
        assert_eq!(tiny.config().width, MIN_DIMENSION);
    }

    #[test]
    fn data_uri_is_base64_svg() {
        let uri = fallback().data_uri("Hello", None);
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
        let payload = uri.trim_start_matches("data:image/svg+xml;base64,");
        let decoded = STANDARD.decode(payload).expect("valid base64");
        assert!(decoded.starts_with(b"<svg"));
    }
}
