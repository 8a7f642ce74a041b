//! Compact selector syntax: `tag#id.class[attr=value]`.
//!
//! The same parsed form backs two things: the [`selector`] descriptor
//! constructor and the simple element queries a host may offer (see
//! [`crate::host::MemoryHost`]).

use crate::node::{AttrMap, AttrValue, Element};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SelectorSpec {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, Option<String>)>,
}

impl SelectorSpec {
    pub(crate) fn parse(input: &str) -> SelectorSpec {
        let mut spec = SelectorSpec::default();
        let mut chars = input.chars().peekable();
        let mut tag = String::new();
        while let Some(&ch) = chars.peek() {
            if ch == '#' || ch == '.' || ch == '[' {
                break;
            }
            tag.push(ch);
            chars.next();
        }
        if !tag.is_empty() {
            spec.tag = Some(tag.to_ascii_lowercase());
        }
        while let Some(ch) = chars.next() {
            match ch {
                '#' => {
                    let token = read_until(&mut chars, &['#', '.', '[']);
                    spec.id = Some(token);
                }
                '.' => {
                    let token = read_until(&mut chars, &['#', '.', '[']);
                    if !token.is_empty() {
                        spec.classes.push(token);
                    }
                }
                '[' => {
                    let body = read_bracket(&mut chars);
                    match body.split_once('=') {
                        Some((name, raw)) => {
                            spec.attrs.push((name.to_owned(), Some(unquote(raw))));
                        }
                        // No `=` makes a boolean-true attribute.
                        None => spec.attrs.push((body, None)),
                    }
                }
                _ => {}
            }
        }
        spec
    }
}

fn read_until(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, stops: &[char]) -> String {
    let mut token = String::new();
    while let Some(&ch) = chars.peek() {
        if stops.contains(&ch) {
            break;
        }
        token.push(ch);
        chars.next();
    }
    token
}

fn read_bracket(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut token = String::new();
    for ch in chars.by_ref() {
        if ch == ']' {
            break;
        }
        token.push(ch);
    }
    token
}

fn unquote(raw: &str) -> String {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return raw[1..raw.len() - 1].to_owned();
        }
    }
    raw.to_owned()
}

/// Builds an element descriptor from selector syntax. An empty tag defaults
/// to `div`.
pub fn selector(spec: &str) -> Element {
    let parsed = SelectorSpec::parse(spec);
    let mut attrs = AttrMap::new();
    if let Some(id) = parsed.id {
        attrs.insert("id".to_owned(), AttrValue::Str(id));
    }
    if !parsed.classes.is_empty() {
        attrs.insert("class".to_owned(), AttrValue::Str(parsed.classes.join(" ")));
    }
    for (name, value) in parsed.attrs {
        let value = match value {
            Some(text) => AttrValue::Str(text),
            None => AttrValue::Bool(true),
        };
        attrs.insert(name, value);
    }
    Element {
        tag: parsed.tag.unwrap_or_else(|| "div".to_owned()),
        attrs: if attrs.is_empty() { None } else { Some(attrs) },
        children: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tag_id_and_classes() {
        let el = selector("ul#menu.side.dark");
        assert_eq!(el.tag, "ul");
        let attrs = el.attrs.unwrap();
        assert_eq!(attrs.get("id"), Some(&AttrValue::Str("menu".into())));
        assert_eq!(attrs.get("class"), Some(&AttrValue::Str("side dark".into())));
    }

    #[test]
    fn missing_tag_defaults_to_div() {
        let el = selector("#app");
        assert_eq!(el.tag, "div");
        assert_eq!(
            el.attrs.unwrap().get("id"),
            Some(&AttrValue::Str("app".into()))
        );
    }

    #[test]
    fn attribute_tokens() {
        let el = selector("input[type=text][disabled][placeholder='your name']");
        let attrs = el.attrs.unwrap();
        assert_eq!(attrs.get("type"), Some(&AttrValue::Str("text".into())));
        assert_eq!(attrs.get("disabled"), Some(&AttrValue::Bool(true)));
        assert_eq!(
            attrs.get("placeholder"),
            Some(&AttrValue::Str("your name".into()))
        );
    }

    #[test]
    fn double_quotes_are_stripped_too() {
        let el = selector("a[href=\"/home\"]");
        assert_eq!(
            el.attrs.unwrap().get("href"),
            Some(&AttrValue::Str("/home".into()))
        );
    }

    #[test]
    fn tag_is_lowercased() {
        assert_eq!(selector("DIV.box").tag, "div");
    }
}
