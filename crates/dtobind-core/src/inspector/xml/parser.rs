//! quick-xml reader for `<dto-mapping>` documents
//!
//! Parsing runs in two passes: the event stream is folded into a small element
//! tree, then the tree is interpreted into a [`MappingDocument`].

use super::{ArgMapping, DtoMapping, FieldMapping, MappingDocument, SourceMapping};
use crate::types::{CascadeType, CompoundSource, SourceSpec};
use crate::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
    position: u64,
}

impl Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn non_empty(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(str::trim).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.non_empty(name).ok_or_else(|| {
            Error::xml(format!(
                "<{}> at byte {} needs a '{}' attribute",
                self.name, self.position, name
            ))
        })
    }

    fn flag(&self, name: &str) -> Result<bool> {
        match self.non_empty(name) {
            None => Ok(false),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(Error::xml(format!(
                "<{}> at byte {}: '{}' is not a boolean for '{}'",
                self.name, self.position, v, name
            ))),
        }
    }

    fn unexpected(&self, parent: &str) -> Error {
        Error::xml(format!(
            "unexpected <{}> inside <{}> at byte {}",
            self.name, parent, self.position
        ))
    }
}

/// Parse a mapping document from XML text
pub fn parse(xml: &str) -> Result<MappingDocument> {
    let root = read_tree(xml)?;
    if root.name != "dto-mapping" {
        return Err(Error::xml(format!(
            "root element must be <dto-mapping>, found <{}>",
            root.name
        )));
    }
    let mut document = MappingDocument::default();
    for child in &root.children {
        match child.name.as_str() {
            "dto" => document.insert(dto(child)?)?,
            _ => return Err(child.unexpected(&root.name)),
        }
    }
    Ok(document)
}

fn read_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(open(e, position)?),
            Event::Empty(ref e) => {
                let element = open(e, position)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::xml(format!("unbalanced end tag at byte {}", position)))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                let text = e.unescape()?;
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(text.trim());
                }
            }
            Event::CData(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::xml("document ended inside an element"));
    }
    root.ok_or_else(|| Error::xml("document has no root element"))
}

fn open(e: &BytesStart<'_>, position: u64) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in e.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        position,
        ..Element::default()
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::xml("document has more than one root element")),
    }
    Ok(())
}

fn dto(element: &Element) -> Result<DtoMapping> {
    let mut mapping = DtoMapping::new(element.required("type")?);
    for child in &element.children {
        match child.name.as_str() {
            "beanNames" => {
                for name in &child.children {
                    if name.name != "beanName" {
                        return Err(name.unexpected(&child.name));
                    }
                    if name.text.is_empty() {
                        return Err(Error::xml(format!(
                            "empty <beanName> at byte {}",
                            name.position
                        )));
                    }
                    mapping.bean_names.push(name.text.clone());
                }
            }
            "targetField" => {
                let field = target_field(child)?;
                if mapping.field(&field.name).is_some() {
                    return Err(Error::xml(format!(
                        "field '{}' of {} is mapped twice",
                        field.name, mapping.type_name
                    )));
                }
                mapping.fields.push(field);
            }
            "immutableConstructor" => {
                if mapping.constructor.is_some() {
                    return Err(Error::xml(format!(
                        "{} declares more than one <immutableConstructor>",
                        mapping.type_name
                    )));
                }
                mapping.constructor = Some(constructor(child)?);
            }
            _ => return Err(child.unexpected(&element.name)),
        }
    }
    Ok(mapping)
}

fn target_field(element: &Element) -> Result<FieldMapping> {
    let cascade_type = match element.non_empty("cascadeType") {
        None => None,
        Some(text) => Some(CascadeType::parse(text).ok_or_else(|| {
            Error::xml(format!(
                "unknown cascadeType '{}' at byte {}",
                text, element.position
            ))
        })?),
    };
    Ok(FieldMapping {
        name: element.required("fieldName")?.to_string(),
        transient: element.flag("transient")?,
        cascade: element.flag("cascade")?,
        field_type: element.non_empty("fieldType").map(str::to_string),
        cascade_type,
        source: source_children(element)?,
    })
}

fn constructor(element: &Element) -> Result<Vec<ArgMapping>> {
    let mut args = Vec::new();
    for child in &element.children {
        if child.name != "arg" {
            return Err(child.unexpected(&element.name));
        }
        let order = child.required("order")?;
        let order = order.parse::<usize>().map_err(|_| {
            Error::xml(format!(
                "arg order '{}' at byte {} is not a non-negative integer",
                order, child.position
            ))
        })?;
        let source = source_children(child)?;
        if source == SourceMapping::Default {
            return Err(Error::xml(format!(
                "constructor arg {} needs a <source> or <sources>",
                order
            )));
        }
        args.push(ArgMapping {
            order,
            type_name: child.non_empty("type").map(str::to_string),
            source,
        });
    }
    Ok(args)
}

/// The single `<source>` or `<sources>` child of an element, if any
fn source_children(element: &Element) -> Result<SourceMapping> {
    let mut mapping = SourceMapping::Default;
    for child in &element.children {
        let parsed = match child.name.as_str() {
            "source" => SourceMapping::Single(source(child)?),
            "sources" => SourceMapping::Compound(sources(child)?),
            _ => return Err(child.unexpected(&element.name)),
        };
        if mapping != SourceMapping::Default {
            return Err(Error::xml(format!(
                "<{}> at byte {} has more than one source declaration",
                element.name, element.position
            )));
        }
        mapping = parsed;
    }
    Ok(mapping)
}

fn source(element: &Element) -> Result<SourceSpec> {
    let mut spec = SourceSpec::new(element.non_empty("name").unwrap_or_default());
    if let Some(merger) = element.non_empty("merger") {
        spec = spec.merger(merger);
    }
    if let Some(bean) = element.non_empty("sourceBean") {
        spec = spec.bean(bean);
    }
    spec.params = params(element, &[])?;
    Ok(spec)
}

fn sources(element: &Element) -> Result<CompoundSource> {
    let mut compound = CompoundSource::new();
    if let Some(merger) = element.non_empty("merger") {
        compound = compound.merger(merger);
    }
    for child in &element.children {
        if child.name == "source" {
            compound = compound.source(source(child)?);
        }
    }
    if compound.sources.is_empty() {
        return Err(Error::xml(format!(
            "<sources> at byte {} lists no <source>",
            element.position
        )));
    }
    compound.params = params(element, &["source"])?;
    Ok(compound)
}

/// `mergerParam` followed by the text of each `<param>` child
fn params(element: &Element, also_allowed: &[&str]) -> Result<Vec<String>> {
    let mut params: Vec<String> = element
        .attribute("mergerParam")
        .filter(|p| !p.is_empty())
        .map(|p| vec![p.to_string()])
        .unwrap_or_default();
    for child in &element.children {
        match child.name.as_str() {
            "param" => params.push(child.text.clone()),
            name if also_allowed.contains(&name) => {}
            _ => return Err(child.unexpected(&element.name)),
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dto-mapping>
  <!-- people -->
  <dto type="PersonDto">
    <beanNames>
      <beanName>person</beanName>
      <beanName>address</beanName>
    </beanNames>
    <targetField fieldName="fullName">
      <sources merger="string_format" mergerParam="%s %s">
        <source name="firstName"/>
        <source name="lastName" sourceBean="person"/>
      </sources>
    </targetField>
    <targetField fieldName="birth">
      <source name="birthDate" merger="date_format">
        <param>yyyy-MM-dd</param>
      </source>
    </targetField>
    <targetField fieldName="city">
      <source name="city" sourceBean="address"/>
    </targetField>
    <targetField fieldName="friends" cascade="true" fieldType="FriendDto" cascadeType="collection"/>
    <targetField fieldName="scratch" transient="TRUE"/>
  </dto>
  <dto type="Point">
    <immutableConstructor>
      <arg order="1" type="int"><source name="y"/></arg>
      <arg order="0" type="int"><source name="x" merger="identity" mergerParam="&amp;ignored"/></arg>
    </immutableConstructor>
  </dto>
</dto-mapping>"#;

    #[test]
    fn test_parse_full_document() {
        let document = parse(DOCUMENT).unwrap();
        let person = document.get("PersonDto").unwrap();
        assert_eq!(person.bean_names, vec!["person", "address"]);
        assert_eq!(person.fields.len(), 5);

        match &person.field("fullName").unwrap().source {
            SourceMapping::Compound(compound) => {
                assert_eq!(compound.merger.as_deref(), Some("string_format"));
                assert_eq!(compound.params, vec!["%s %s".to_string()]);
                assert_eq!(compound.sources.len(), 2);
                assert_eq!(compound.sources[1].bean.as_deref(), Some("person"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &person.field("birth").unwrap().source {
            SourceMapping::Single(spec) => {
                assert_eq!(spec.params, vec!["yyyy-MM-dd".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let friends = person.field("friends").unwrap();
        assert!(friends.cascade);
        assert_eq!(friends.cascade_type, Some(CascadeType::Collection));
        assert_eq!(friends.field_type.as_deref(), Some("FriendDto"));
        assert!(person.field("scratch").unwrap().transient);

        let point = document.get("Point").unwrap();
        let args = point.constructor.as_ref().unwrap();
        assert_eq!(args.len(), 2);
        match &args[1].source {
            SourceMapping::Single(spec) => assert_eq!(spec.params, vec!["&ignored".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed_documents() {
        let cases = [
            "<dto-mapping><dto type=\"A\"></dto-mapping>",
            "<mapping/>",
            "<dto-mapping><dto/></dto-mapping>",
            "<dto-mapping><dto type=\"A\"><unknown/></dto></dto-mapping>",
            "<dto-mapping><dto type=\"A\"><targetField fieldName=\"a\" cascade=\"yes\"/></dto></dto-mapping>",
            "<dto-mapping><dto type=\"A\"><immutableConstructor><arg order=\"x\"><source name=\"a\"/></arg></immutableConstructor></dto></dto-mapping>",
            "<dto-mapping><dto type=\"A\"><immutableConstructor><arg order=\"0\"/></immutableConstructor></dto></dto-mapping>",
            "<dto-mapping><dto type=\"A\"/><dto type=\"A\"/></dto-mapping>",
            "<dto-mapping><dto type=\"A\"><targetField fieldName=\"a\"><source/><source/></targetField></dto></dto-mapping>",
            "",
        ];
        for xml in cases {
            let err = parse(xml).unwrap_err();
            assert!(err.is_configuration(), "{} -> {}", xml, err);
        }
    }
}
