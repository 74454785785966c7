//! Name normalizer: turns a human-entered folder label into `NameParts`.
//!
//! Parsing happens in two stages. `parse` reads the label into a
//! `ParsedName` (who is named and how they relate), then `emit` renders the
//! ordered list of renderings a CRM record could plausibly carry. Registry
//! overrides are applied between the two so curated parts still get the
//! usual variants.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::model::{NameParts, SpecialCaseRule};
use crate::registry::{collapse_whitespace, first_parenthetical, strip_parentheticals, SpecialCaseRegistry};

static HOUSEHOLD_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*&\s*|\s+and\s+").expect("household separator pattern is valid"));

const RELATION_WORDS: [&str; 3] = ["son", "sons", "daughter"];

/// Someone named after a relation word ("son", "daughter").
#[derive(Debug, Clone, PartialEq, Eq)]
enum Relative {
    /// Two tokens followed the relation word.
    Full { first: String, last: String },
    /// One token: a given name sharing the entity's last name.
    Given(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ParsedName {
    first: String,
    last: String,
    middle: String,
    info: String,
    /// Further first names sharing `last`.
    household: Vec<String>,
    relatives: Vec<Relative>,
}

/// Normalizer with an injected, read-only registry.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    registry: Arc<SpecialCaseRegistry>,
}

impl Normalizer {
    pub fn new(registry: Arc<SpecialCaseRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SpecialCaseRegistry {
        &self.registry
    }

    /// Parse `raw_name`. Never fails; the worst case is a `NameParts` whose
    /// `last_name` is the whole label and everything else empty.
    pub fn normalize(&self, raw_name: &str) -> NameParts {
        let rule = self.registry.lookup(raw_name);
        let mut parsed = parse(raw_name);
        if let Some(rule) = rule {
            apply_overrides(&mut parsed, rule);
        }
        if parsed.first.is_empty() && parsed.last.is_empty() {
            parsed = ParsedName {
                last: raw_name.trim().to_string(),
                ..ParsedName::default()
            };
        }

        let (normalized, swapped) = emit(&parsed);
        let mut parts = NameParts {
            first_name: parsed.first,
            last_name: parsed.last,
            middle_name: parsed.middle,
            additional_info: parsed.info,
            full_name: raw_name.to_string(),
            normalized_names: normalized,
            swapped_names: swapped,
            ..NameParts::default()
        };

        if let Some(rule) = rule {
            parts.special_case = true;
            if let Some(names) = &rule.overrides.normalized_names {
                parts.normalized_names = non_empty(names);
            }
            if let Some(names) = &rule.overrides.swapped_names {
                parts.swapped_names = non_empty(names);
            }
            parts.expected_matches_source = rule.expected_matches_source.clone();
            parts.expected_matches_target = rule.expected_matches_target.clone();
        }

        tracing::debug!(
            raw = raw_name,
            last = %parts.last_name,
            first = %parts.first_name,
            variants = parts.normalized_names.len(),
            special_case = parts.special_case,
            "name normalized"
        );
        parts
    }
}

fn apply_overrides(parsed: &mut ParsedName, rule: &SpecialCaseRule) {
    let o = &rule.overrides;
    if let Some(v) = &o.first_name {
        parsed.first = v.trim().to_string();
    }
    if let Some(v) = &o.last_name {
        parsed.last = v.trim().to_string();
    }
    if let Some(v) = &o.middle_name {
        parsed.middle = v.trim().to_string();
    }
    if let Some(v) = &o.additional_info {
        parsed.info = v.trim().to_string();
    }
}

fn non_empty(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

fn parse(raw_name: &str) -> ParsedName {
    let collapsed = collapse_whitespace(raw_name);
    let (working, paren_info) = extract_parenthetical(&collapsed);
    let (main, relation) = split_relation(&working);

    let mut parsed = if main.contains(',') {
        parse_comma(&main)
    } else if has_household_separator(&main) {
        parse_household(&main)
    } else {
        parse_tokens(&main)
    };

    parsed.info = [paren_info, std::mem::take(&mut parsed.info)]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" & ");

    if let Some(relation) = relation {
        parsed.relatives = parse_relatives(&relation);
    }
    parsed
}

/// Pull the first parenthetical out as additional info. An unclosed "("
/// takes the rest of the label.
fn extract_parenthetical(s: &str) -> (String, String) {
    if let Some(content) = first_parenthetical(s) {
        return (strip_parentheticals(s), content);
    }
    match s.find('(') {
        Some(open) => (
            collapse_whitespace(&s[..open]),
            s[open + 1..].trim().to_string(),
        ),
        None => (s.to_string(), String::new()),
    }
}

/// Split at the first relation word that is neither the first nor the last
/// token. A relation word with nothing after it is a given name ("Nguyen,
/// Son").
fn split_relation(s: &str) -> (String, Option<String>) {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let last = tokens.len().saturating_sub(1);
    let position = tokens.iter().enumerate().skip(1).find_map(|(i, t)| {
        let word = t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        (i < last && RELATION_WORDS.contains(&word.as_str())).then_some(i)
    });

    let Some(i) = position else {
        return (s.to_string(), None);
    };
    let main = trim_dangling(&tokens[..i]);
    let relation = tokens[i + 1..].join(" ");
    if main.is_empty() || relation.is_empty() {
        (s.to_string(), None)
    } else {
        (main, Some(relation))
    }
}

/// Join tokens, dropping trailing "&"/"and" and trailing commas.
fn trim_dangling(tokens: &[&str]) -> String {
    let mut end = tokens.len();
    while end > 0 {
        let t = tokens[end - 1];
        if t == "&" || t.eq_ignore_ascii_case("and") {
            end -= 1;
        } else {
            break;
        }
    }
    tokens[..end]
        .join(" ")
        .trim_end_matches(',')
        .trim()
        .to_string()
}

fn has_household_separator(s: &str) -> bool {
    HOUSEHOLD_SEP_RE.is_match(s)
}

fn split_household(s: &str) -> Vec<String> {
    HOUSEHOLD_SEP_RE
        .split(s)
        .map(collapse_whitespace)
        .filter(|seg| !seg.is_empty() && !seg.eq_ignore_ascii_case("and"))
        .collect()
}

/// "Last, First Middle [& Other …]"
fn parse_comma(s: &str) -> ParsedName {
    let (last, rest) = s.split_once(',').unwrap_or((s, ""));
    let rest = rest.replace(',', " ");
    let mut segments = split_household(&rest).into_iter();

    let mut parsed = ParsedName {
        last: collapse_whitespace(last),
        ..ParsedName::default()
    };
    if let Some(head) = segments.next() {
        let mut tokens = head.split_whitespace();
        parsed.first = tokens.next().unwrap_or_default().to_string();
        parsed.middle = tokens.collect::<Vec<_>>().join(" ");
    }
    parsed.household = segments.collect();
    parsed
}

/// "A & B" / "A B and C" without a comma.
fn parse_household(s: &str) -> ParsedName {
    let segments = split_household(s);
    if segments.len() < 2 {
        return parse_tokens(&segments.join(" "));
    }

    let left: Vec<&str> = segments[0].split_whitespace().collect();
    if left.len() == 1 {
        // Shared last name, every other segment a member's first name.
        ParsedName {
            last: left[0].to_string(),
            first: segments[1].clone(),
            household: segments[2..].to_vec(),
            ..ParsedName::default()
        }
    } else {
        ParsedName {
            last: left[0].to_string(),
            first: left[1..].join(" "),
            info: segments[1..].join(" & "),
            household: segments[1..].to_vec(),
            ..ParsedName::default()
        }
    }
}

fn parse_tokens(s: &str) -> ParsedName {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    match tokens.as_slice() {
        [] => ParsedName::default(),
        [only] => ParsedName {
            last: only.to_string(),
            ..ParsedName::default()
        },
        [first, last] => ParsedName {
            first: first.to_string(),
            last: last.to_string(),
            ..ParsedName::default()
        },
        [first, middle @ .., last] => ParsedName {
            first: first.to_string(),
            middle: middle.join(" "),
            last: last.to_string(),
            ..ParsedName::default()
        },
    }
}

fn parse_relatives(relation: &str) -> Vec<Relative> {
    split_household(relation)
        .iter()
        .filter_map(|segment| {
            let tokens: Vec<&str> = segment.split_whitespace().collect();
            match tokens.as_slice() {
                [] => None,
                [given] => Some(Relative::Given(given.to_string())),
                [first, second, ..] => Some(Relative::Full {
                    first: first.to_string(),
                    last: second.to_string(),
                }),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Emit
// ---------------------------------------------------------------------------

/// Ordered renderings. Duplicates are kept; empty strings never are.
#[derive(Default)]
struct Variants(Vec<String>);

impl Variants {
    fn push(&mut self, s: String) {
        let s = s.trim();
        if !s.is_empty() {
            self.0.push(s.to_string());
        }
    }

    /// "Last, First", "Last,First", "First Last"
    fn push_pair(&mut self, first: &str, last: &str) {
        if first.is_empty() || last.is_empty() {
            return;
        }
        self.push(format!("{last}, {first}"));
        self.push(format!("{last},{first}"));
        self.push(format!("{first} {last}"));
    }
}

fn emit(p: &ParsedName) -> (Vec<String>, Vec<String>) {
    let mut v = Variants::default();
    let both = !p.first.is_empty() && !p.last.is_empty();

    v.push_pair(&p.first, &p.last);
    for member in &p.household {
        v.push_pair(member, &p.last);
    }

    for relative in &p.relatives {
        match relative {
            Relative::Full { first, last } => {
                v.push(format!("{first} {last}"));
                v.push(format!("{last}, {first}"));
                v.push(format!("{last},{first}"));
            }
            Relative::Given(given) if !p.last.is_empty() => {
                v.push(format!("{given} {}", p.last));
                v.push(format!("{}, {given}", p.last));
                v.push(format!("{},{given}", p.last));
            }
            Relative::Given(_) => {}
        }
    }

    if both && !p.middle.is_empty() {
        v.push(format!("{}, {} {}", p.last, p.first, p.middle));
        v.push(format!("{} {} {}", p.first, p.middle, p.last));
    }
    if both && !p.info.is_empty() {
        v.push(format!("{}, {} ({})", p.last, p.first, p.info));
        v.push(format!("{} {} ({})", p.first, p.last, p.info));
    }

    let swapped = if both {
        vec![format!("{} {}", p.first, p.last), format!("{} {}", p.last, p.first)]
    } else {
        Vec::new()
    };

    (v.0, swapped)
}
