//! Minimal selector engine used by `querySelector` and the style cascade.
//!
//! Supports comma-separated lists of compound selectors (`tag`, `*`, `#id`,
//! `.class`, `[attr]`, `[attr=value]`) joined by descendant or child (`>`)
//! combinators. Pseudo-classes and the sibling combinators are rejected.

use crate::error::{DomError, DomResult};
use crate::node::NodeHandle;

/// `(ids, classes and attributes, types)`
pub type Specificity = (u32, u32, u32);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, node: &NodeHandle) -> bool {
        let guard = node.read();
        let element = match guard.element() {
            Some(element) => element,
            None => return false,
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && !element.local_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.get_attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class = element.get_attribute("class").unwrap_or("");
            let has = |wanted: &String| class.split_ascii_whitespace().any(|c| c == wanted);
            if !self.classes.iter().all(has) {
                return false;
            }
        }
        self.attributes.iter().all(|(name, value)| match (element.get_attribute(name), value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A single complex selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

impl Selector {
    pub fn specificity(&self) -> Specificity {
        self.compounds.iter().fold((0, 0, 0), |(a, b, c), compound| {
            let types = match compound.tag.as_deref() {
                Some("*") | None => 0,
                Some(_) => 1,
            };
            (
                a + compound.id.is_some() as u32,
                b + (compound.classes.len() + compound.attributes.len()) as u32,
                c + types,
            )
        })
    }

    pub fn matches(&self, node: &NodeHandle) -> bool {
        self.matches_at(self.compounds.len() - 1, node)
    }

    fn matches_at(&self, index: usize, node: &NodeHandle) -> bool {
        if !self.compounds[index].matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => node
                .parent()
                .map(|parent| self.matches_at(index - 1, &parent))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut ancestor = node.parent();
                while let Some(candidate) = ancestor {
                    if self.matches_at(index - 1, &candidate) {
                        return true;
                    }
                    ancestor = candidate.parent();
                }
                false
            }
        }
    }
}

/// A comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<Selector>);

impl SelectorList {
    pub fn parse(input: &str) -> DomResult<Self> {
        let selectors = input
            .split(',')
            .map(|part| SelectorParser::new(part, input).parse())
            .collect::<DomResult<Vec<_>>>()?;
        Ok(SelectorList(selectors))
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.0
    }

    pub fn matches(&self, node: &NodeHandle) -> bool {
        self.0.iter().any(|s| s.matches(node))
    }

    /// Highest specificity among the selectors matching `node`
    pub fn matching_specificity(&self, node: &NodeHandle) -> Option<Specificity> {
        self.0
            .iter()
            .filter(|s| s.matches(node))
            .map(Selector::specificity)
            .max()
    }
}

struct SelectorParser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> SelectorParser<'a> {
    fn new(part: &str, source: &'a str) -> Self {
        Self {
            chars: part.trim().chars().collect(),
            pos: 0,
            source,
        }
    }

    fn error(&self) -> DomError {
        DomError::InvalidSelector(self.source.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn ident(&mut self) -> DomResult<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse(mut self) -> DomResult<Selector> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_space => combinators.push(Combinator::Descendant),
                Some(_) => return Err(self.error()),
            }
            compounds.push(self.compound()?);
        }

        Ok(Selector { compounds, combinators })
    }

    fn compound(&mut self) -> DomResult<Compound> {
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                compound.tag = Some("*".to_string());
            }
            Some(c) if c.is_alphabetic() => compound.tag = Some(self.ident()?.to_ascii_lowercase()),
            _ => {}
        }

        while let Some(c) = self.peek() {
            match c {
                '#' => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                '.' => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                '[' => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(self.error());
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> DomResult<(String, Option<String>)> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = match self.peek() {
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                Some(self.attribute_value()?)
            }
            _ => None,
        };
        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(self.error());
        }
        self.pos += 1;
        Ok((name, value))
    }

    fn attribute_value(&mut self) -> DomResult<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == quote {
                        let value = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(value);
                    }
                    self.pos += 1;
                }
                Err(self.error())
            }
            _ => self.ident(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (NodeHandle, NodeHandle, NodeHandle) {
        let section = NodeHandle::new_element("section");
        section.set_attribute("id", "main").unwrap();
        let div = NodeHandle::new_element("div");
        div.set_attribute("class", "card wide").unwrap();
        let span = NodeHandle::new_element("span");
        span.set_attribute("data-kind", "note").unwrap();
        section.append_child(&div).unwrap();
        div.append_child(&span).unwrap();
        (section, div, span)
    }

    #[test]
    fn test_compound_matching() {
        let (section, div, span) = tree();
        assert!(SelectorList::parse("#main").unwrap().matches(&section));
        assert!(SelectorList::parse("div.card.wide").unwrap().matches(&div));
        assert!(!SelectorList::parse("div.card.narrow").unwrap().matches(&div));
        assert!(SelectorList::parse("[data-kind=note]").unwrap().matches(&span));
        assert!(SelectorList::parse("span[data-kind='note']").unwrap().matches(&span));
        assert!(SelectorList::parse("*").unwrap().matches(&span));
    }

    #[test]
    fn test_combinators() {
        let (_, div, span) = tree();
        assert!(SelectorList::parse("#main span").unwrap().matches(&span));
        assert!(SelectorList::parse("#main > div > span").unwrap().matches(&span));
        assert!(!SelectorList::parse("#main > span").unwrap().matches(&span));
        assert!(SelectorList::parse("p, .card").unwrap().matches(&div));
    }

    #[test]
    fn test_specificity() {
        let list = SelectorList::parse("#main div.card").unwrap();
        assert_eq!(list.selectors()[0].specificity(), (1, 1, 1));

        let (_, div, _) = tree();
        let list = SelectorList::parse("div, .card").unwrap();
        assert_eq!(list.matching_specificity(&div), Some((0, 1, 0)));
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "div >", ":hover", "a + b", "[x", "#"] {
            assert!(SelectorList::parse(bad).is_err(), "{:?} should be rejected", bad);
        }
    }
}
