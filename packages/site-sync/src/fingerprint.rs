//! Content fingerprinting for change detection.
//!
//! Markup and styles are scrubbed of volatile noise before hashing so that
//! a page rebuilt by the site builder without material changes produces the
//! same digest. The digest is MD5 (32 hex chars): content addressing only,
//! never used for security.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::error::{Result, SyncError};

/// Vendor attribute prefix used by [`Fingerprinter::default`].
const DEFAULT_VENDOR_PREFIX: &str = "data-ready-";

lazy_static! {
    static ref DEFAULT_VENDOR_ATTR: Regex =
        Regex::new(&vendor_attr_pattern(DEFAULT_VENDOR_PREFIX)).unwrap();

    static ref HTML_COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();

    // id/class values with 10+ consecutive digits are builder-generated
    static ref AUTO_ID_ATTR: Regex = Regex::new(
        r#"(?i)\s+(?:id|class)\s*=\s*(?:"[^"]*\d{10,}[^"]*"|'[^']*\d{10,}[^']*')"#
    ).unwrap();

    static ref STYLE_ATTR: Regex = Regex::new(r#"(?i)\s+style\s*=\s*"([^"]*)""#).unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    static ref CSS_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();

    static ref KEYFRAMES_AT: Regex = Regex::new(r"(?i)@(?:-[a-z]+-)?keyframes\b").unwrap();

    // Custom properties whose name embeds an integer (e.g. --frame-12: ...)
    static ref NUMBERED_CUSTOM_PROP: Regex =
        Regex::new(r"--[A-Za-z0-9_-]*\d[A-Za-z0-9_-]*\s*:[^;}]*;?").unwrap();

    static ref HEX3: Regex = Regex::new(r"#([0-9a-fA-F])([0-9a-fA-F])([0-9a-fA-F])\b").unwrap();

    static ref HEX6: Regex = Regex::new(r"#[0-9a-fA-F]{6}\b").unwrap();

    static ref TRAILING_SEMICOLON: Regex = Regex::new(r";\s*\}").unwrap();
}

const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

/// Computes noise-insensitive fingerprints.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    vendor_attr: Regex,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            vendor_attr: DEFAULT_VENDOR_ATTR.clone(),
        }
    }
}

impl Fingerprinter {
    /// Create a fingerprinter treating attributes with `vendor_attr_prefix` as noise.
    pub fn new(vendor_attr_prefix: &str) -> Result<Self> {
        let vendor_attr = Regex::new(&vendor_attr_pattern(vendor_attr_prefix)).map_err(|e| {
            SyncError::Configuration(format!(
                "invalid fingerprint attribute prefix {:?}: {}",
                vendor_attr_prefix, e
            ))
        })?;
        Ok(Self { vendor_attr })
    }

    /// Digest of the scrubbed markup and styles.
    pub fn fingerprint(&self, markup: &str, styles: &str) -> String {
        let markup = self.normalize_markup(markup);
        let styles = normalize_styles(styles);

        let mut context = md5::Context::new();
        context.consume(markup.as_bytes());
        context.consume([0u8]);
        context.consume(styles.as_bytes());
        format!("{:x}", context.compute())
    }

    /// Markup with comments, vendor attributes, auto-generated ids/classes
    /// and inline transforms removed; entities decoded; whitespace collapsed.
    pub fn normalize_markup(&self, markup: &str) -> String {
        let text = HTML_COMMENT.replace_all(markup, "");
        let text = self.vendor_attr.replace_all(&text, "");
        let text = AUTO_ID_ATTR.replace_all(&text, "");
        let text = STYLE_ATTR.replace_all(&text, |caps: &Captures| {
            let kept = strip_transforms(&caps[1]);
            if kept.is_empty() {
                String::new()
            } else {
                format!(" style=\"{}\"", kept)
            }
        });

        let mut text = text.into_owned();
        for (entity, literal) in ENTITIES {
            text = text.replace(entity, literal);
        }

        WHITESPACE.replace_all(&text, " ").trim().to_string()
    }
}

fn vendor_attr_pattern(prefix: &str) -> String {
    format!(
        r#"(?i)\s+{}[^\s=>]*(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+))?"#,
        regex::escape(prefix)
    )
}

/// Fingerprint with the default vendor attribute prefix.
pub fn fingerprint(markup: &str, styles: &str) -> String {
    Fingerprinter::default().fingerprint(markup, styles)
}

/// Styles with comments, keyframes and numbered custom properties removed,
/// whitespace collapsed and hex colors canonicalized.
pub fn normalize_styles(styles: &str) -> String {
    let text = CSS_COMMENT.replace_all(styles, "");
    let text = strip_keyframes(&text);
    let text = NUMBERED_CUSTOM_PROP.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = HEX3.replace_all(&text, |caps: &Captures| {
        format!(
            "#{0}{0}{1}{1}{2}{2}",
            &caps[1], &caps[2], &caps[3]
        )
        .to_lowercase()
    });
    let text = HEX6.replace_all(&text, |caps: &Captures| caps[0].to_lowercase());
    let text = TRAILING_SEMICOLON.replace_all(&text, "}");
    text.trim().to_string()
}

/// Drop `transform`-family declarations from an inline style value.
fn strip_transforms(style: &str) -> String {
    style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl.split(':').next().unwrap_or("").trim().to_lowercase();
            property != "transform" && !property.ends_with("-transform")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Remove every `@keyframes` block, including nested braces.
fn strip_keyframes(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;

    while let Some(found) = KEYFRAMES_AT.find(rest) {
        out.push_str(&rest[..found.start()]);
        let after = &rest[found.end()..];

        let Some(open) = after.find('{') else {
            // Unterminated at-rule: drop the remainder.
            return out;
        };

        let mut depth = 0usize;
        let mut end = after.len();
        for (i, c) in after[open..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = open + i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        rest = &after[end..];
    }

    out.push_str(rest);
    out
}
