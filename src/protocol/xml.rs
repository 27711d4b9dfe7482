//! A small in-memory XML element tree.
//!
//! Full DOM/XML-Schema machinery is explicitly out of scope;
//! this is the minimal tree `DecodableShape::from_xml` needs to walk a
//! response, grounded on the same quick-xml streaming-reader approach used
//! for STS responses in `credentials/sts.rs`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::DecodeError;

#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// The first direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children named `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse a complete XML document into its root element.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::Xml(e.to_string()))?;
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf).map_err(|e| DecodeError::Xml(e.to_string()))? {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    push_completed(&mut stack, &mut root, element);
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&t.unescape().map_err(|e| DecodeError::Xml(e.to_string()))?);
                    }
                }
                Event::End(_) => {
                    let Some(element) = stack.pop() else {
                        return Err(DecodeError::Xml("unbalanced closing tag".to_string()));
                    };
                    push_completed(&mut stack, &mut root, element);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        root.ok_or_else(|| DecodeError::Xml("empty document".to_string()))
    }

    /// Serialize this element (and its subtree) back to an XML document.
    pub fn to_xml_string(&self) -> Result<String, DecodeError> {
        let mut writer = Writer::new(Vec::new());
        self.write(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| DecodeError::Xml(e.to_string()))
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DecodeError> {
        use quick_xml::events::{BytesEnd, BytesText};

        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(start)).map_err(|e| DecodeError::Xml(e.to_string()))?;

        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|e| DecodeError::Xml(e.to_string()))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| DecodeError::Xml(e.to_string()))?;
        Ok(())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, DecodeError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| DecodeError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| DecodeError::Xml(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn push_completed(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_text() {
        let xml = b"<Root><Name>widget</Name><Count>3</Count></Root>";
        let root = XmlElement::parse(xml).unwrap();
        assert_eq!(root.name, "Root");
        assert_eq!(root.child("Name").unwrap().text(), "widget");
        assert_eq!(root.child("Count").unwrap().text(), "3");
    }

    #[test]
    fn parses_repeated_children_in_order() {
        let xml = b"<Items><Item>a</Item><Item>b</Item></Items>";
        let root = XmlElement::parse(xml).unwrap();
        let items: Vec<_> = root.children_named("Item").map(|c| c.text()).collect();
        assert_eq!(items, vec!["a", "b"]);
    }

    #[test]
    fn round_trips_through_serialization() {
        let mut root = XmlElement::new("Root");
        root.children.push({
            let mut child = XmlElement::new("Name");
            child.text = "widget".to_string();
            child
        });
        let xml = root.to_xml_string().unwrap();
        let reparsed = XmlElement::parse(xml.as_bytes()).unwrap();
        assert_eq!(reparsed.child("Name").unwrap().text(), "widget");
    }
}
