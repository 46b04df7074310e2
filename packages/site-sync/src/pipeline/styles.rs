//! Best-effort translation of style rules into utility-class annotations.
//!
//! Known declarations are replaced by a `/* utility */` comment, known color
//! and spacing literals inside declaration values by theme variables.
//! Anything not in the tables is left exactly as written.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Exact-value color literals and their theme tokens.
pub const COLOR_TABLE: [(&str, &str); 5] = [
    ("#667eea", "blue-500"),
    ("#764ba2", "purple-600"),
    ("#f093fb", "pink-400"),
    ("#f5f7fa", "gray-50"),
    ("#c3cfe2", "gray-300"),
];

/// Pixel spacing literals and their scale steps.
pub const SPACING_TABLE: [(&str, &str); 4] = [
    ("10", "2.5"),
    ("20", "5"),
    ("40", "10"),
    ("80", "20"),
];

/// Font sizes in pixels and their text utilities.
pub const FONT_SIZE_TABLE: [(&str, &str); 6] = [
    ("14", "text-sm"),
    ("16", "text-base"),
    ("18", "text-lg"),
    ("24", "text-xl"),
    ("32", "text-2xl"),
    ("48", "text-4xl"),
];

/// Fixed declarations (property, value) and their utilities.
const LAYOUT_TABLE: [(&str, &str, &str); 15] = [
    ("display", "flex", "flex"),
    ("flex-direction", "column", "flex-col"),
    ("flex-direction", "row", "flex-row"),
    ("justify-content", "center", "justify-center"),
    ("justify-content", "space-between", "justify-between"),
    ("align-items", "center", "items-center"),
    ("align-items", "flex-start", "items-start"),
    ("align-items", "flex-end", "items-end"),
    ("display", "grid", "grid"),
    ("grid-template-columns", "repeat(2, 1fr)", "grid-cols-2"),
    ("grid-template-columns", "repeat(3, 1fr)", "grid-cols-3"),
    ("grid-template-columns", "repeat(4, 1fr)", "grid-cols-4"),
    ("gap", "20px", "gap-5"),
    ("gap", "16px", "gap-4"),
    ("flex-wrap", "wrap", "flex-wrap"),
];

lazy_static! {
    static ref LAYOUT_RULES: Vec<(Regex, String)> = LAYOUT_TABLE
        .iter()
        .map(|(property, value, utility)| {
            let value = regex::escape(value).replace(", ", r",\s*");
            let pattern = format!(
                r"(?P<pre>^|[\s;{{]){}\s*:\s*{}(?P<end>\s*(?:;|\}}|$))",
                regex::escape(property),
                value
            );
            (Regex::new(&pattern).unwrap(), format!("/* {} */", utility))
        })
        .collect();

    static ref FONT_SIZE: Regex =
        Regex::new(r"(?P<pre>^|[\s;{])font-size\s*:\s*(?P<px>\d+)px\b").unwrap();

    static ref GRADIENT: Regex =
        Regex::new(r"background\s*:\s*linear-gradient\(([^)]+)\)").unwrap();

    static ref CSS_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();

    // Innermost `{ ... }` block, i.e. a declaration list
    static ref DECLARATION_BLOCK: Regex = Regex::new(r"\{(?P<body>[^{}]*)\}").unwrap();

    static ref DECLARATION: Regex =
        Regex::new(r"(?P<property>[-\w]+\s*:)(?P<value>[^;]*)").unwrap();

    static ref URL_CALL: Regex = Regex::new(r"(?i)url\([^)]*\)").unwrap();

    static ref COLOR: Regex = Regex::new(r"(?i)#[0-9a-f]{6}\b").unwrap();

    static ref SPACING: Regex =
        Regex::new(r"(?P<pre>^|[^\w.#-])(?P<px>\d+)px\b").unwrap();
}

/// Translate each rule, preserving order.
pub fn translate_rules(rules: &[String]) -> Vec<String> {
    rules.iter().map(|rule| translate_rule(rule)).collect()
}

/// Translate one rule. Unknown content passes through untouched.
pub fn translate_rule(rule: &str) -> String {
    let text = FONT_SIZE.replace_all(rule, |caps: &Captures| {
        match lookup(&FONT_SIZE_TABLE, &caps["px"]) {
            Some(utility) => format!("{}/* {} */", &caps["pre"], utility),
            None => caps[0].to_string(),
        }
    });

    let mut text = text.into_owned();
    for (pattern, annotation) in LAYOUT_RULES.iter() {
        text = pattern
            .replace_all(&text, |caps: &Captures| {
                format!("{}{}{}", &caps["pre"], annotation, &caps["end"])
            })
            .into_owned();
    }

    let text = GRADIENT.replace_all(&text, |caps: &Captures| {
        translate_gradient(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });

    // Literal tables apply to declaration values only: never to selectors,
    // at-rule preludes, annotations or url() arguments
    DECLARATION_BLOCK
        .replace_all(&text, |block: &Captures| {
            let body = outside(&CSS_COMMENT, &block["body"], |segment| {
                DECLARATION
                    .replace_all(segment, |decl: &Captures| {
                        format!(
                            "{}{}",
                            &decl["property"],
                            outside(&URL_CALL, &decl["value"], replace_literals)
                        )
                    })
                    .into_owned()
            });
            format!("{{{}}}", body)
        })
        .into_owned()
}

/// Swap known color and spacing literals for theme variables.
fn replace_literals(value: &str) -> String {
    let value = COLOR.replace_all(value, |caps: &Captures| {
        match lookup(&COLOR_TABLE, &caps[0].to_lowercase()) {
            Some(token) => format!("var(--un-{})", token),
            None => caps[0].to_string(),
        }
    });

    SPACING
        .replace_all(&value, |caps: &Captures| {
            match lookup(&SPACING_TABLE, &caps["px"]) {
                Some(step) => format!("{}var(--un-spacing-{})", &caps["pre"], step),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Apply `rewrite` to the text between matches of `skip`; matches are copied as is.
fn outside<F>(skip: &Regex, text: &str, rewrite: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in skip.find_iter(text) {
        out.push_str(&rewrite(&text[last..found.start()]));
        out.push_str(found.as_str());
        last = found.end();
    }
    out.push_str(&rewrite(&text[last..]));
    out
}

/// `135deg, #667eea 0%, #764ba2 100%` -> `/* bg-gradient-to-br from-[#667eea] to-[#764ba2] */`
fn translate_gradient(args: &str) -> Option<String> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() < 3 || parts.iter().any(|p| p.contains('(')) {
        return None;
    }

    let angle = parts[0];
    let from = parts[1].split_whitespace().next()?;
    let to = parts[2].split_whitespace().next()?;

    let direction = if angle.contains("135deg") {
        "to-br"
    } else if angle.contains("45deg") {
        "to-tr"
    } else {
        "to-r"
    };

    Some(format!(
        "/* bg-gradient-{} from-[{}] to-[{}] */",
        direction, from, to
    ))
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}
