//! A small CSS selector engine.
//!
//! Supports what page markup contracts need: type, universal, `#id`,
//! `.class`, attribute conditions (`[a]`, `[a=v]`, `[a^=v]`, `[a$=v]`,
//! `[a*=v]`), descendant and child combinators, and comma-separated groups.

use super::{Document, ElementId};
use crate::result::{StorefrontError, StorefrontResult};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists { key: String },
    Equals { key: String, value: String },
    Prefix { key: String, value: String },
    Suffix { key: String, value: String },
    Contains { key: String, value: String },
}

impl AttrCondition {
    fn matches(&self, doc: &Document, id: ElementId) -> bool {
        match self {
            Self::Exists { key } => doc.has_attribute(id, key),
            Self::Equals { key, value } => doc.attribute(id, key) == Some(value.as_str()),
            Self::Prefix { key, value } => doc
                .attribute(id, key)
                .is_some_and(|actual| actual.starts_with(value.as_str())),
            Self::Suffix { key, value } => doc
                .attribute(id, key)
                .is_some_and(|actual| actual.ends_with(value.as_str())),
            Self::Contains { key, value } => doc
                .attribute(id, key)
                .is_some_and(|actual| actual.contains(value.as_str())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

impl Compound {
    fn matches(&self, doc: &Document, id: ElementId) -> bool {
        let Some(element) = doc.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(wanted) = &self.id {
            if element.attribute("id") != Some(wanted.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| element.has_class(class))
            && self.attrs.iter().all(|attr| attr.matches(doc, id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    // Relation to the part on the left.
    combinator: Option<Combinator>,
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Vec<Part>>,
}

impl Selector {
    /// Parse a selector list such as `.benefit-card, .review-card`
    pub fn parse(source: &str) -> StorefrontResult<Self> {
        let error = |message: &str| StorefrontError::Selector {
            selector: source.to_string(),
            message: message.to_string(),
        };

        let mut groups = Vec::new();
        for group in split_groups(source).map_err(|m| error(m))? {
            groups.push(parse_chain(&group).map_err(|m| error(&m))?);
        }
        if groups.is_empty() {
            return Err(error("empty selector"));
        }

        Ok(Self {
            source: source.trim().to_string(),
            groups,
        })
    }

    /// Original selector text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `id` matches any group of this selector
    #[must_use]
    pub fn matches(&self, doc: &Document, id: ElementId) -> bool {
        self.groups
            .iter()
            .any(|chain| matches_chain(doc, id, chain))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn matches_chain(doc: &Document, id: ElementId, chain: &[Part]) -> bool {
    let Some((last, rest)) = chain.split_last() else {
        return false;
    };
    if !last.compound.matches(doc, id) {
        return false;
    }

    let mut current = id;
    let mut combinator = last.combinator;
    for part in rest.iter().rev() {
        let found = match combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Child => doc
                .parent(current)
                .filter(|parent| part.compound.matches(doc, *parent)),
            Combinator::Descendant => doc
                .ancestors(current)
                .find(|ancestor| part.compound.matches(doc, *ancestor)),
        };
        let Some(found) = found else {
            return false;
        };
        current = found;
        combinator = part.combinator;
    }
    true
}

fn split_groups(source: &str) -> Result<Vec<String>, &'static str> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut bracket_depth = 0usize;

    for ch in source.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(ch);
            }
            (Some(_), _) => current.push(ch),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                bracket_depth += 1;
                current.push(ch);
            }
            (None, ']') => {
                bracket_depth = bracket_depth.checked_sub(1).ok_or("unbalanced `]`")?;
                current.push(ch);
            }
            (None, ',') if bracket_depth == 0 => {
                if current.trim().is_empty() {
                    return Err("empty selector group");
                }
                groups.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err("unterminated string");
    }
    if bracket_depth != 0 {
        return Err("unterminated attribute selector");
    }
    if !current.trim().is_empty() {
        groups.push(current);
    } else if !groups.is_empty() {
        return Err("trailing comma");
    }
    Ok(groups)
}

fn parse_chain(group: &str) -> Result<Vec<Part>, String> {
    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokenize_chain(group)? {
        if token == ">" {
            if pending.is_some() || parts.is_empty() {
                return Err("misplaced `>` combinator".to_string());
            }
            pending = Some(Combinator::Child);
            continue;
        }

        let compound = parse_compound(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part {
            compound,
            combinator,
        });
    }

    if parts.is_empty() || pending.is_some() {
        return Err("incomplete selector".to_string());
    }
    Ok(parts)
}

// Splits on whitespace and `>` outside of attribute brackets.
fn tokenize_chain(group: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for ch in group.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' if in_brackets => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                in_brackets = true;
                current.push(ch);
            }
            ']' => {
                in_brackets = false;
                current.push(ch);
            }
            '>' if !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".to_string());
            }
            c if c.is_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn take_ident(chars: &[char], mut pos: usize) -> (String, usize) {
    let start = pos;
    while pos < chars.len() && is_ident_char(chars[pos]) {
        pos += 1;
    }
    (chars[start..pos].iter().collect(), pos)
}

fn parse_compound(token: &str) -> Result<Compound, String> {
    let chars: Vec<char> = token.chars().collect();
    let mut compound = Compound::default();
    let mut pos = 0;

    if chars.first() == Some(&'*') {
        pos = 1;
    } else if chars.first().is_some_and(|c| is_ident_char(*c)) {
        let (tag, next) = take_ident(&chars, 0);
        compound.tag = Some(tag.to_ascii_lowercase());
        pos = next;
    }

    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                let (class, next) = take_ident(&chars, pos + 1);
                if class.is_empty() {
                    return Err(format!("empty class name in `{token}`"));
                }
                compound.classes.push(class);
                pos = next;
            }
            '#' => {
                let (id, next) = take_ident(&chars, pos + 1);
                if id.is_empty() {
                    return Err(format!("empty id in `{token}`"));
                }
                compound.id = Some(id);
                pos = next;
            }
            '[' => {
                let close = chars[pos..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| pos + offset)
                    .ok_or_else(|| format!("unterminated attribute in `{token}`"))?;
                let body: String = chars[pos + 1..close].iter().collect();
                compound.attrs.push(parse_attr(&body)?);
                pos = close + 1;
            }
            other => return Err(format!("unexpected `{other}` in `{token}`")),
        }
    }

    Ok(compound)
}

fn parse_attr(body: &str) -> Result<AttrCondition, String> {
    let Some(eq) = body.find('=') else {
        let key = body.trim();
        if key.is_empty() || !key.chars().all(is_ident_char) {
            return Err(format!("invalid attribute name `{key}`"));
        }
        return Ok(AttrCondition::Exists {
            key: key.to_ascii_lowercase(),
        });
    };

    let (raw_key, operator) = match body[..eq].chars().last() {
        Some(op @ ('^' | '$' | '*')) => (&body[..eq - 1], Some(op)),
        _ => (&body[..eq], None),
    };
    let key = raw_key.trim().to_ascii_lowercase();
    if key.is_empty() || !key.chars().all(is_ident_char) {
        return Err(format!("invalid attribute name `{key}`"));
    }
    let value = unquote(body[eq + 1..].trim())?;

    Ok(match operator {
        Some('^') => AttrCondition::Prefix { key, value },
        Some('$') => AttrCondition::Suffix { key, value },
        Some('*') => AttrCondition::Contains { key, value },
        _ => AttrCondition::Equals { key, value },
    })
}

fn unquote(raw: &str) -> Result<String, String> {
    let mut chars = raw.chars();
    match chars.next() {
        Some(q @ ('"' | '\'')) => {
            if raw.len() >= 2 && raw.ends_with(q) {
                Ok(raw[1..raw.len() - 1].to_string())
            } else {
                Err(format!("unterminated string `{raw}`"))
            }
        }
        _ => Ok(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;

    fn page() -> (Document, ElementId, ElementId, ElementId) {
        let mut doc = Document::new();
        let body = doc.body();
        let card = doc.append(
            body,
            Element::new("div")
                .with_class("bundle-card")
                .with_attribute("id", "best"),
        );
        let title = doc.append(card, Element::new("h3").with_class("bundle-card__title"));
        let link = doc.append(body, Element::new("a").with_attribute("href", "#buy-now"));
        (doc, card, title, link)
    }

    #[test]
    fn test_parse_groups() {
        let selector = Selector::parse(".benefit-card, .review-card").unwrap();
        assert_eq!(selector.groups.len(), 2);
        assert_eq!(selector.source(), ".benefit-card, .review-card");
    }

    #[test]
    fn test_parse_errors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse(".a,").is_err());
        assert!(Selector::parse("a[href").is_err());
        assert!(Selector::parse("> .a").is_err());
        assert!(Selector::parse(".a:hover").is_err());
    }

    #[test]
    fn test_compound_matching() {
        let (doc, card, title, link) = page();

        assert!(Selector::parse("div.bundle-card").unwrap().matches(&doc, card));
        assert!(Selector::parse("#best").unwrap().matches(&doc, card));
        assert!(!Selector::parse("span.bundle-card").unwrap().matches(&doc, card));
        assert!(Selector::parse("a[href^=\"#\"]").unwrap().matches(&doc, link));
        assert!(Selector::parse("[href$='now']").unwrap().matches(&doc, link));
        assert!(Selector::parse("[href*=buy]").unwrap().matches(&doc, link));
        assert!(!Selector::parse("[href=\"#\"]").unwrap().matches(&doc, link));
        assert!(Selector::parse("*").unwrap().matches(&doc, title));
    }

    #[test]
    fn test_combinators() {
        let (doc, _card, title, _link) = page();

        assert!(Selector::parse(".bundle-card .bundle-card__title")
            .unwrap()
            .matches(&doc, title));
        assert!(Selector::parse("body .bundle-card__title")
            .unwrap()
            .matches(&doc, title));
        assert!(Selector::parse(".bundle-card > h3").unwrap().matches(&doc, title));
        assert!(!Selector::parse("body > h3").unwrap().matches(&doc, title));
    }
}
