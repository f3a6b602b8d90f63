//! A small CSS selector subset for the removal catalogs.
//!
//! Supported: `tag`, `#id`, `.class`, `[attr]`, `[attr=v]`, `[attr*=v]`,
//! `[attr^=v]`, and compounds of those. Combinators are not supported;
//! `parse` returns `None` for anything it does not understand, and catalog
//! loading skips such entries instead of failing.

use super::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    StartsWith,
}

impl Selector {
    /// The selector text this was parsed from, for logging.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, el: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if el.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id != *id {
                return false;
            }
        }
        for class in &self.classes {
            if !el.class_name.split_whitespace().any(|c| c == class) {
                return false;
            }
        }
        for attr in &self.attrs {
            if !attr.matches(el) {
                return false;
            }
        }
        true
    }
}

impl AttrMatcher {
    fn matches(&self, el: &Element) -> bool {
        // id and class live on the element itself; empty means absent.
        let actual = match self.name.as_str() {
            "id" => Some(el.id.as_str()).filter(|v| !v.is_empty()),
            "class" => Some(el.class_name.as_str()).filter(|v| !v.is_empty()),
            name => el.attributes.get(name).map(String::as_str),
        };
        match (actual, self.op) {
            (None, _) => false,
            (Some(_), AttrOp::Exists) => true,
            (Some(v), AttrOp::Equals) => v == self.value,
            (Some(v), AttrOp::Contains) => v.contains(&self.value),
            (Some(v), AttrOp::StartsWith) => v.starts_with(&self.value),
        }
    }
}

pub fn parse(input: &str) -> Option<Selector> {
    let source = input.trim();
    if source.is_empty() {
        return None;
    }
    let chars: Vec<char> = source.chars().collect();
    let mut sel = Selector {
        source: source.to_string(),
        tag: None,
        id: None,
        classes: Vec::new(),
        attrs: Vec::new(),
    };
    let mut i = 0;

    if i < chars.len() && is_ident_char(chars[i]) {
        let (ident, next) = read_ident(&chars, i)?;
        sel.tag = Some(ident.to_ascii_lowercase());
        i = next;
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                let (ident, next) = read_ident(&chars, i + 1)?;
                sel.id = Some(ident);
                i = next;
            }
            '.' => {
                let (ident, next) = read_ident(&chars, i + 1)?;
                sel.classes.push(ident);
                i = next;
            }
            '[' => {
                let (attr, next) = read_attr(&chars, i + 1)?;
                sel.attrs.push(attr);
                i = next;
            }
            _ => return None,
        }
    }

    if sel.tag.is_none() && sel.id.is_none() && sel.classes.is_empty() && sel.attrs.is_empty() {
        return None;
    }
    Some(sel)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], mut i: usize) -> Option<(String, usize)> {
    let start = i;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    if i == start {
        return None;
    }
    Some((chars[start..i].iter().collect(), i))
}

fn read_attr(chars: &[char], i: usize) -> Option<(AttrMatcher, usize)> {
    let (name, mut i) = read_ident(chars, i)?;
    let op = match chars.get(i) {
        Some(']') => {
            return Some((
                AttrMatcher {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                },
                i + 1,
            ));
        }
        Some('=') => {
            i += 1;
            AttrOp::Equals
        }
        Some('*') if chars.get(i + 1) == Some(&'=') => {
            i += 2;
            AttrOp::Contains
        }
        Some('^') if chars.get(i + 1) == Some(&'=') => {
            i += 2;
            AttrOp::StartsWith
        }
        _ => return None,
    };

    let quote = match chars.get(i) {
        Some(&q @ ('"' | '\'')) => {
            i += 1;
            Some(q)
        }
        _ => None,
    };
    let start = i;
    let end_char = quote.unwrap_or(']');
    while i < chars.len() && chars[i] != end_char {
        i += 1;
    }
    if i >= chars.len() {
        return None;
    }
    let value: String = chars[start..i].iter().collect();
    i += 1;
    if quote.is_some() {
        if chars.get(i) != Some(&']') {
            return None;
        }
        i += 1;
    }
    Some((
        AttrMatcher {
            name,
            op,
            value,
        },
        i,
    ))
}
