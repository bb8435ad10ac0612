//! Minimal namespace-aware element tree.
//!
//! We only need a read-only view of the document: for every element its resolved namespace,
//! its local name, the text found before its first child and its children.  The tree is built
//! from the `quick-xml` namespace reader.  It leaves a few well-formedness rules to its users
//! (names, allowed characters, position of the XML declaration) so these are checked here.
//!
//! Internal entities declared in the DOCTYPE are expanded as plain text, external and
//! parameter entities are not.
//!

use std::borrow::Cow;
use std::collections::HashMap;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, multispace0, multispace1},
    sequence::{delimited, preceded},
    IResult,
};
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use tracing::{debug, trace};

use crate::ParseError;

/// Upper bound on the text produced by entity expansion in one document
const MAX_EXPANSION: usize = 16 * 1024 * 1024;

/// One element of the document.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Resolved namespace URI, `None` if the element is in no namespace
    pub namespace: Option<String>,
    /// Local name, without prefix
    pub name: String,
    /// Character data before the first child element
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Parse `input` into a tree, returning the root element.
    ///
    /// Anything not well-formed (including an empty document) is `ParseError::Malformed`.
    ///
    #[tracing::instrument(skip(input))]
    pub fn parse(input: &str) -> Result<Element, ParseError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        check_chars(input)?;

        let mut reader = NsReader::from_str(input);
        reader.config_mut().check_comments = true;

        let mut entities = Entities::default();
        let mut stack: Vec<Element> = vec![];
        let mut root: Option<Element> = None;
        let mut started = false;
        let mut doctype = false;

        loop {
            let (ns, event) = reader
                .read_resolved_event()
                .map_err(|e| ParseError::Malformed(e.to_string()))?;
            let namespace = resolve(ns)?;

            match event {
                Event::Decl(_) => {
                    if started {
                        return Err(malformed("XML declaration not at start of document"));
                    }
                }
                Event::DocType(e) => {
                    if doctype || root.is_some() || !stack.is_empty() {
                        return Err(malformed("misplaced DOCTYPE"));
                    }
                    doctype = true;
                    entities.declare(utf8(&e)?)?;
                }
                Event::PI(e) => {
                    let target = utf8(e.target())?;
                    if !is_name(target) || target.eq_ignore_ascii_case("xml") {
                        return Err(malformed(&format!("bad processing instruction {target:?}")));
                    }
                }
                Event::Start(e) => {
                    check_single_root(&root, &stack)?;
                    stack.push(open(namespace, &e, &mut entities)?);
                }
                Event::Empty(e) => {
                    check_single_root(&root, &stack)?;
                    let elem = open(namespace, &e, &mut entities)?;
                    attach(&mut stack, &mut root, elem);
                }
                Event::End(_) => {
                    let elem = stack
                        .pop()
                        .ok_or_else(|| malformed("unexpected end tag"))?;
                    attach(&mut stack, &mut root, elem);
                }
                Event::Text(e) => {
                    let raw = utf8(&e)?;
                    if raw.contains("]]>") {
                        return Err(malformed("`]]>` in character data"));
                    }
                    let text = entities.unescape(raw)?;
                    add_text(&mut stack, &text)?;
                }
                Event::CData(e) => {
                    add_text(&mut stack, utf8(&e)?)?;
                }
                Event::Eof => break,
                // Comments carry nothing for us, `--` inside is caught by the reader
                Event::Comment(_) => (),
            }
            started = true;
        }

        if let Some(elem) = stack.last() {
            return Err(ParseError::Malformed(format!(
                "unexpected end of document, <{}> is not closed",
                elem.name
            )));
        }
        let root = root.ok_or_else(|| malformed("no element found"))?;
        trace!("root = {}", root.name);
        Ok(root)
    }

    /// Same as `parse()` for raw bytes which must be valid UTF-8.
    ///
    pub fn parse_bytes(input: &[u8]) -> Result<Element, ParseError> {
        Self::parse(decode(input)?)
    }

    /// Namespace-qualified match.
    ///
    #[inline]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.name == name
    }

    /// All elements below this one, depth-first in document order.
    ///
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// First direct child with that qualified name.
    ///
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.is(namespace, name))
    }

    /// First element at any depth below this one with that qualified name.
    ///
    pub fn find(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.descendants().find(|e| e.is(namespace, name))
    }
}

/// Pre-order iterator returned by `Element::descendants()`.
///
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let elem = self.stack.pop()?;
        self.stack.extend(elem.children.iter().rev());
        Some(elem)
    }
}

/// Check that `input` is UTF-8, dropping the BOM if any.
///
pub fn decode(input: &[u8]) -> Result<&str, ParseError> {
    let input = input.strip_prefix(b"\xef\xbb\xbf").unwrap_or(input);
    std::str::from_utf8(input).map_err(|e| ParseError::Malformed(format!("invalid encoding: {e}")))
}

/// Internal entities from the DOCTYPE, stored already expanded.
///
#[derive(Debug, Default)]
struct Entities {
    declared: HashMap<String, String>,
    expanded: usize,
}

impl Entities {
    /// Register every `<!ENTITY name "value">` of the internal subset.  The first
    /// declaration of a name wins.
    ///
    fn declare(&mut self, doctype: &str) -> Result<(), ParseError> {
        let mut rest = doctype;
        while let Some(pos) = rest.find("<!ENTITY") {
            rest = &rest[pos..];
            match entity_decl(rest) {
                Ok((next, (name, value))) => {
                    let value = self.unescape(value)?.into_owned();
                    debug!("entity {name} = {value:?}");
                    self.declared.entry(name.to_string()).or_insert(value);
                    rest = next;
                }
                // Parameter or external entity
                Err(_) => rest = &rest["<!ENTITY".len()..],
            }
        }
        Ok(())
    }

    /// Replace character and entity references in `raw`.
    ///
    fn unescape<'a>(&mut self, raw: &'a str) -> Result<Cow<'a, str>, ParseError> {
        let declared = &self.declared;
        let budget = MAX_EXPANSION.saturating_sub(self.expanded);
        let mut used = 0;
        let text = unescape_with(raw, |name| {
            resolve_predefined_entity(name).or_else(|| {
                let value = declared.get(name)?;
                used += value.len();
                (used <= budget).then_some(value.as_str())
            })
        })
        .map_err(|e| match used > budget {
            true => malformed("entity expansion too large"),
            false => ParseError::Malformed(e.to_string()),
        })?;

        self.expanded += used;
        check_chars(&text)?;
        Ok(text)
    }
}

/// `<!ENTITY name "value">`, single quotes allowed.
///
fn entity_decl(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag("<!ENTITY")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = take_while1(is_name_char)(input)?;
    let (input, _) = multispace1(input)?;
    let (input, value) = alt((
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
    ))(input)?;
    let (input, _) = preceded(multispace0, char('>'))(input)?;
    Ok((input, (name, value)))
}

#[inline]
fn malformed(msg: &str) -> ParseError {
    ParseError::Malformed(msg.to_string())
}

#[inline]
fn utf8(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| ParseError::Malformed(e.to_string()))
}

/// `Char` production of XML 1.0, surrogates can not appear in a `str`.
///
#[inline]
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{fffd}' | '\u{10000}'..='\u{10ffff}')
}

fn check_chars(s: &str) -> Result<(), ParseError> {
    match s.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(ParseError::Malformed(format!(
            "invalid character U+{:04X}",
            c as u32
        ))),
        None => Ok(()),
    }
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{c0}'..='\u{d6}' | '\u{d8}'..='\u{f6}' | '\u{f8}'..='\u{2ff}'
        | '\u{370}'..='\u{37d}' | '\u{37f}'..='\u{1fff}' | '\u{200c}'..='\u{200d}'
        | '\u{2070}'..='\u{218f}' | '\u{2c00}'..='\u{2fef}' | '\u{3001}'..='\u{d7ff}'
        | '\u{f900}'..='\u{fdcf}' | '\u{fdf0}'..='\u{fffd}' | '\u{10000}'..='\u{effff}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{b7}' | '\u{300}'..='\u{36f}' | '\u{203f}'..='\u{2040}')
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

/// Name with at most one `:` separating two non-empty parts.
///
fn is_qname(s: &str) -> bool {
    match s.split_once(':') {
        Some((prefix, local)) => is_name(prefix) && is_name(local) && !local.contains(':'),
        None => is_name(s),
    }
}

fn resolve(ns: ResolveResult) -> Result<Option<String>, ParseError> {
    match ns {
        ResolveResult::Bound(ns) => Ok(Some(utf8(ns.as_ref())?.to_string())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(ParseError::Malformed(format!(
            "unbound prefix {}",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

/// Create a childless element, validating its name and attributes on the way.
///
fn open(
    namespace: Option<String>,
    start: &BytesStart,
    entities: &mut Entities,
) -> Result<Element, ParseError> {
    let name = start.name();
    let qname = utf8(name.as_ref())?;
    if !is_qname(qname) {
        return Err(ParseError::Malformed(format!("invalid element name {qname:?}")));
    }

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::Malformed(e.to_string()))?;
        let key = utf8(attr.key.as_ref())?;
        if !is_qname(key) {
            return Err(ParseError::Malformed(format!("invalid attribute name {key:?}")));
        }
        let value = utf8(&attr.value)?;
        if value.contains('<') {
            return Err(ParseError::Malformed(format!("`<` in value of {key}")));
        }
        entities.unescape(value)?;
    }

    Ok(Element {
        namespace,
        name: utf8(start.local_name().as_ref())?.to_string(),
        ..Default::default()
    })
}

fn check_single_root(root: &Option<Element>, stack: &[Element]) -> Result<(), ParseError> {
    if root.is_some() && stack.is_empty() {
        return Err(malformed("junk after document element"));
    }
    Ok(())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, elem: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(elem),
        None => *root = Some(elem),
    }
}

/// Text only counts before the first child, text outside the root must be blank.
///
fn add_text(stack: &mut [Element], text: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(elem) => {
            if elem.children.is_empty() {
                elem.text.push_str(text);
            }
        }
        None => {
            if !text.trim().is_empty() {
                return Err(malformed("text outside of the root element"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const NS: &str = "urn:test";

    #[rstest]
    #[case("")]
    #[case("   \n\t ")]
    #[case("<kml><Document><unclosed></Document></kml>")]
    #[case("<kml><Document>")]
    #[case("<kml></kmz>")]
    #[case("</kml>")]
    #[case("<a/><b/>")]
    #[case("<a/>trailing")]
    #[case("leading<a/>")]
    #[case("<a x=\"1\" x=\"2\"/>")]
    #[case("<p:a/>")]
    #[case("<a>&nope;</a>")]
    #[case("just some text")]
    #[case("<1a/>")]
    #[case("<a:b:c xmlns:a=\"urn:x\"/>")]
    #[case("<a 1b=\"x\"/>")]
    #[case("<a>\u{1}</a>")]
    #[case("<a>&#1;</a>")]
    #[case("<a>\u{fffe}</a>")]
    #[case("<a>]]></a>")]
    #[case("<a><!-- x -- y --></a>")]
    #[case("<a><!-- x ---></a>")]
    #[case("<a b='<'/>")]
    #[case("<a b='&nope;'/>")]
    #[case("<?xml version=\"1.0\"?><?xml version=\"1.0\"?><a/>")]
    #[case(" <?xml version=\"1.0\"?><a/>")]
    #[case("<a><?XML x?></a>")]
    #[case("<!DOCTYPE a><!DOCTYPE a><a/>")]
    #[case("<a/><!DOCTYPE a>")]
    fn test_parse_malformed(#[case] input: &str) {
        let res = Element::parse(input);
        assert!(matches!(res, Err(ParseError::Malformed(_))), "{input:?} gave {res:?}");
    }

    #[test]
    fn test_parse_prolog() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported -->
<!DOCTYPE kml>
<?xml-stylesheet type="text/xsl" href="style.xsl"?>
<a b="x &amp; y">&#x41;<!-- inside --></a>"#;
        let root = Element::parse(input).unwrap();

        assert_eq!("a", root.name);
        assert_eq!("A", root.text);
    }

    #[test]
    fn test_parse_internal_entities() {
        let input = r#"<!DOCTYPE a [
  <!ENTITY lon "174.7633">
  <!ENTITY pos '&lon;,-36.8485'>
  <!ENTITY % param "ignored">
  <!ENTITY ext SYSTEM "http://example.com/ext">
]>
<a k="&lon;"><b>&pos;</b><c>&amp;&lon;</c></a>"#;
        let root = Element::parse(input).unwrap();

        assert_eq!("174.7633,-36.8485", root.children[0].text);
        assert_eq!("&174.7633", root.children[1].text);
    }

    #[test]
    fn test_parse_external_entity_is_unknown() {
        let input = r#"<!DOCTYPE a [<!ENTITY ext SYSTEM "ext.xml">]><a>&ext;</a>"#;
        assert!(matches!(Element::parse(input), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_parse_entity_expansion_limit() {
        let mut decl = String::from(r#"<!ENTITY l0 "0123456789">"#);
        for i in 1..8 {
            let refs = format!("&l{};", i - 1).repeat(10);
            decl.push_str(&format!(r#"<!ENTITY l{i} "{refs}">"#));
        }
        let input = format!("<!DOCTYPE a [{decl}]><a>&l7;</a>");

        let res = Element::parse(&input);
        assert_eq!(
            Err(ParseError::Malformed("entity expansion too large".into())),
            res
        );
    }

    #[test]
    fn test_parse_bad_encoding() {
        let res = Element::parse_bytes(b"<a>\xff\xfe</a>");
        assert!(matches!(res, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_parse_bytes_with_bom() {
        let root = Element::parse_bytes(b"\xef\xbb\xbf<a/>").unwrap();
        assert_eq!("a", root.name);
    }

    #[test]
    fn test_parse_namespaces() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
        <root xmlns="urn:test" xmlns:v="urn:vendor">
          <v:index>3</v:index>
          <plain xmlns="">x</plain>
        </root>"#;
        let root = Element::parse(input).unwrap();

        assert!(root.is(NS, "root"));
        assert_eq!("3", root.child("urn:vendor", "index").unwrap().text);
        let plain = &root.children[1];
        assert_eq!(None, plain.namespace);
        assert_eq!("plain", plain.name);
    }

    #[test]
    fn test_text_before_first_child_only() {
        let input = "<a>head &amp; <![CDATA[<raw>]]><b>inner</b>tail</a>";
        let root = Element::parse(input).unwrap();

        assert_eq!("head & <raw>", root.text);
        assert_eq!("inner", root.children[0].text);
    }

    #[test]
    fn test_descendants_document_order() {
        let input = "<r><a><b/><c><d/></c></a><e/></r>";
        let root = Element::parse(input).unwrap();

        let names: Vec<_> = root.descendants().map(|e| e.name.as_str()).collect();
        assert_eq!(vec!["a", "b", "c", "d", "e"], names);
    }

    #[test]
    fn test_find_and_child() {
        let input = r#"<r xmlns="urn:test"><a><b>deep</b></a><b>shallow</b></r>"#;
        let root = Element::parse(input).unwrap();

        assert_eq!("deep", root.find(NS, "b").unwrap().text);
        assert_eq!("shallow", root.child(NS, "b").unwrap().text);
        assert!(root.find("urn:other", "b").is_none());
    }
}
