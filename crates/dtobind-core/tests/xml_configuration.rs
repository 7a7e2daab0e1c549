//! Binding driven by XML mapping documents


use dtobind_core::{
    Binder, BinderConfig, CollectionKind, Error, MappingSource, ObjectRef, Value,
    XmlBeanInspector,
};
use std::io::Write;
use test_support::{person_with_addresses, registry, simple_entity};

const MAPPING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dto-mapping>
  <dto type="PersonDTO">
    <targetField fieldName="fullName">
      <sources merger="string_format" mergerParam="%2$s, %1$s">
        <source name="firstName"/>
        <source name="lastName"/>
      </sources>
    </targetField>
    <targetField fieldName="addresses" cascade="true"/>
  </dto>
  <dto type="PersonAddressDTO">
    <targetField fieldName="street"><source name="street" merger="to_string"/></targetField>
    <targetField fieldName="person" transient="true"/>
  </dto>
  <dto type="ImmutableDTO">
    <immutableConstructor>
      <arg order="0"><source name="aString"/></arg>
      <arg order="1"><source name="anInt"/></arg>
      <arg order="2"><source name="aDouble"/></arg>
    </immutableConstructor>
  </dto>
  <dto type="EntitySummary">
    <beanNames><beanName>left</beanName><beanName>right</beanName></beanNames>
    <targetField fieldName="pair">
      <sources merger="string_format" mergerParam="%s&amp;%s">
        <source name="aString" sourceBean="left"/>
        <source name="aString" sourceBean="right"/>
      </sources>
    </targetField>
    <targetField fieldName="count" fieldType="int">
      <source name="anInt" sourceBean="right"/>
    </targetField>
  </dto>
</dto-mapping>
"#;

fn mapping_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MAPPING.as_bytes()).unwrap();
    file
}

fn xml_binder(file: &tempfile::NamedTempFile) -> Binder {
    let config = BinderConfig::default()
        .with_mapping(MappingSource::XmlFile(file.path().to_path_buf()));
    Binder::builder(registry()).config(config).build().unwrap()
}

#[test]
fn test_xml_file_drives_binding() {
    let file = mapping_file();
    let binder = xml_binder(&file);

    let person = person_with_addresses(&["Via Roma"]);
    let dto = binder.bind("PersonDTO", &[Value::Object(person)]).unwrap();
    let dto = dto.as_object().unwrap();
    assert_eq!(dto.get("fullName"), Value::from("Lovelace, Ada"));
    // Status has no XML entry and falls back to the same-named source.
    assert_eq!(dto.get("status"), Value::enumeration("Status", "ACTIVE"));

    let addresses = dto.get("addresses");
    assert_eq!(addresses.collection_kind(), Some(CollectionKind::List));
    let address = addresses.items().unwrap()[0].as_object().unwrap().clone();
    assert_eq!(address.get("street"), Value::from("Via Roma"));
    assert_eq!(address.get("person"), Value::Null);
}

#[test]
fn test_xml_constructor_mapping() {
    let file = mapping_file();
    let binder = xml_binder(&file);
    let dto = binder
        .bind("ImmutableDTO", &[Value::Object(simple_entity("x", 4, 0.25, true))])
        .unwrap();
    let dto = dto.as_object().unwrap();
    assert_eq!(dto.get("label"), Value::from("x"));
    assert_eq!(dto.get("count"), Value::Int(4));
    assert_eq!(dto.get("ratio"), Value::Float(0.25));
}

#[test]
fn test_types_known_only_from_xml() {
    let file = mapping_file();
    let binder = xml_binder(&file);
    let left = simple_entity("L", 1, 0.0, true);
    let right = simple_entity("R", 2, 0.0, true);

    let summary = binder
        .bind("EntitySummary", &[Value::Object(left), Value::Object(right)])
        .unwrap();
    let summary = summary.as_object().unwrap();
    assert_eq!(summary.type_name(), "EntitySummary");
    assert_eq!(summary.get("pair"), Value::from("L&R"));
    assert_eq!(summary.get("count"), Value::Int(2));
}

#[test]
fn test_eager_inspection_surfaces_errors_at_build_time() {
    let broken = r#"<dto-mapping>
        <dto type="PersonDTO">
          <targetField fieldName="fullName"><source name="firstName" sourceBean="nobody"/></targetField>
        </dto>
      </dto-mapping>"#;
    let config = BinderConfig::default().with_mapping(MappingSource::XmlInline(broken.to_string()));
    let err = Binder::builder(registry()).config(config.clone()).build().unwrap_err();
    assert!(matches!(err, Error::Inspection { .. }));

    // Deferred inspection only fails when the type is first bound.
    let lazy = BinderConfig {
        eager_xml_inspection: false,
        ..config
    };
    let binder = Binder::builder(registry()).config(lazy).build().unwrap();
    let err = binder
        .bind("PersonDTO", &[Value::Object(ObjectRef::new("Person"))])
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_malformed_documents_are_rejected() {
    for xml in [
        "<dto-mapping><dto type=\"A\"></dto-mapping>",
        "<dto-mapping><unknown/></dto-mapping>",
        "<dto-mapping><dto type=\"A\"><targetField fieldName=\"x\" cascade=\"sometimes\"/></dto></dto-mapping>",
        "<dto-mapping><dto type=\"A\"/><dto type=\"A\"/></dto-mapping>",
    ] {
        let err = XmlBeanInspector::from_xml(xml).unwrap_err();
        assert!(err.is_configuration(), "accepted {}", xml);
    }

    let missing = BinderConfig::default()
        .with_mapping(MappingSource::XmlFile("/no/such/mapping.xml".into()));
    assert!(matches!(
        Binder::builder(registry()).config(missing).build(),
        Err(Error::Io { .. })
    ));
}
