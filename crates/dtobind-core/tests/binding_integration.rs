//! End-to-end binding behavior through the public API


use dtobind_core::{
    merger_ids, Binder, BinderConfig, CollectionKind, Error, InstanceRegistry, MapRef,
    MappingSource, ObjectRef, PropertyAccessor, PropertyAccessorAware, PropertyDescriptor,
    PropertyType, SinglePropertyValueMerger, SourceSpec, TypeDescriptor, TypeRegistry, Value,
};
use std::sync::{Arc, OnceLock};
use test_support::{binder, person_with_addresses, registry, simple_entity};

#[test]
fn test_self_binding_copies_values_into_a_new_instance() {
    let binder = binder();
    let entity = simple_entity("test", 123, 345.35, true);

    let bound = binder.bind("SimpleEntity", &[Value::Object(entity.clone())]).unwrap();
    let copy = bound.as_object().unwrap();

    assert!(!copy.ptr_eq(&entity));
    assert!(copy.same_state(&entity));
    assert_eq!(copy.get("aString"), Value::from("test"));
    assert_eq!(copy.get("anInt"), Value::Int(123));
    assert_eq!(copy.get("aDouble"), Value::Float(345.35));
    assert_eq!(copy.get("aBoolean"), Value::Bool(true));
}

#[test]
fn test_bidirectional_graph_binds_without_recursing_forever() {
    let binder = binder();
    let person = person_with_addresses(&["Main St", "Side St"]);

    let dto = binder.bind("PersonDTO", &[Value::Object(person)]).unwrap();
    let dto_ref = dto.as_object().unwrap();
    assert_eq!(dto_ref.get("fullName"), Value::from("Ada Lovelace"));
    assert_eq!(dto_ref.get("status"), Value::enumeration("Status", "ACTIVE"));

    let addresses = dto_ref.get("addresses");
    let addresses = addresses.items().unwrap();
    assert_eq!(addresses.len(), 2);
    for address in addresses {
        let address = address.as_object().unwrap();
        assert_eq!(address.type_name(), "PersonAddressDTO");
        assert_eq!(address.get("person"), dto);
    }
    assert_eq!(
        addresses[1].as_object().unwrap().get("street"),
        Value::from("Side St")
    );
}

#[test]
fn test_named_source_beans() {
    let binder = binder();
    let sources = [
        Value::Object(simple_entity("hello", 1, 1.0, true)),
        Value::Object(simple_entity("cruel", 2, 2.0, false)),
        Value::Object(simple_entity("world", 3, 3.0, true)),
    ];
    let dto = binder.bind("MultiBeanDTO", &sources).unwrap();
    let dto = dto.as_object().unwrap();
    assert_eq!(dto.get("source1"), Value::from("hello"));
    assert_eq!(dto.get("source2"), Value::from("cruel"));
    assert_eq!(dto.get("source3"), Value::from("world"));

    // A missing positional bean reads as null.
    let partial = binder.bind("MultiBeanDTO", &sources[..1]).unwrap();
    assert_eq!(partial.as_object().unwrap().get("source3"), Value::Null);
}

#[test]
fn test_cascade_shape_follows_the_target_property() {
    let binder = binder();
    let entities = vec![
        Value::Object(simple_entity("a", 1, 1234.5, true)),
        Value::Object(simple_entity("b", 2, 0.5, false)),
    ];
    let origins = [
        Value::list(entities.clone()),
        Value::array(entities.clone()),
        Value::set(entities.clone()),
    ];

    for origin in origins {
        let holder = ObjectRef::new("EntityHolder");
        holder.set("entities", origin.clone());
        let source = [Value::Object(holder)];

        let as_list = binder.bind("HolderListDTO", &source).unwrap();
        let list = as_list.as_object().unwrap().get("entities");
        assert_eq!(list.collection_kind(), Some(CollectionKind::List));
        let items = list.items().unwrap().to_vec();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_object().unwrap().type_name(), "FormatDTO");
        assert_eq!(items[0].as_object().unwrap().get("formatted"), Value::from("1,234.50"));

        let as_array = binder.bind("HolderArrayDTO", &source).unwrap();
        let array = as_array.as_object().unwrap().get("entities");
        assert_eq!(array.collection_kind(), Some(CollectionKind::Array));
        assert_eq!(array.items().unwrap().len(), 2);
    }
}

#[test]
fn test_bind_list_and_collection_keep_shape() {
    let binder = binder();
    let a = Value::Object(simple_entity("a", 1, 1.0, true));
    let b = Value::Object(simple_entity("b", 2, 2.0, false));

    let list = binder
        .bind_list("FormatDTO", &[Value::list([a.clone(), b.clone()])])
        .unwrap();
    assert_eq!(list.collection_kind(), Some(CollectionKind::List));
    assert_eq!(list.items().unwrap().len(), 2);

    let set = binder
        .bind_collection("FormatDTO", &Value::set([a.clone(), b.clone()]))
        .unwrap();
    assert_eq!(set.collection_kind(), Some(CollectionKind::Set));
    assert_eq!(set.items().unwrap().len(), 2);

    let parallel = binder
        .bind_list("MultiBeanDTO", &[Value::list([a.clone()]), Value::Null, Value::list([b])])
        .unwrap();
    let row = parallel.items().unwrap()[0].as_object().unwrap().clone();
    assert_eq!(row.get("source1"), Value::from("a"));
    assert_eq!(row.get("source2"), Value::Null);
    assert_eq!(row.get("source3"), Value::from("b"));

    let empty = binder.bind_collection("FormatDTO", &Value::list([])).unwrap();
    assert_eq!(empty.items().map(<[Value]>::len), Some(0));
}

#[test]
fn test_null_handling() {
    let binder = binder();
    assert_eq!(binder.extract("SimpleEntity", &Value::Null).unwrap(), Value::Null);
    assert_eq!(binder.bind("FormatDTO", &[Value::Null]).unwrap(), Value::Null);

    let registry = binder.registry();
    let sum = registry.single(merger_ids::SUM).unwrap();
    assert_eq!(sum.merge(&Value::Null, &[]).unwrap(), Value::Float(0.0));
    let age = registry.single(merger_ids::AGE).unwrap();
    assert_eq!(age.merge(&Value::Null, &[]).unwrap(), Value::Float(0.0));
    let date_format = registry.single(merger_ids::DATE_FORMAT).unwrap();
    assert_eq!(
        date_format.merge(&Value::Null, &["yyyy-MM-dd".to_string()]).unwrap(),
        Value::Null
    );
}

#[test]
fn test_immutable_dto_uses_constructor_with_primitive_defaults() {
    let binder = binder();
    let metadata = binder.metadata("ImmutableDTO").unwrap();
    assert!(metadata.is_immutable());

    let entity = simple_entity("frozen", 7, 0.0, true);
    let dto = binder.bind("ImmutableDTO", &[Value::Object(entity)]).unwrap();
    let dto = dto.as_object().unwrap();
    assert_eq!(dto.get("label"), Value::from("frozen"));
    assert_eq!(dto.get("count"), Value::Int(0));
    assert_eq!(dto.get("ratio"), Value::Float(7.0));
}

#[test]
fn test_map_sources_use_whole_path_keys() {
    let types = TypeRegistry::new().with_type(
        TypeDescriptor::builder("FlatDTO")
            .property(PropertyDescriptor::new("city", PropertyType::Text).source("address.city"))
            .build()
            .unwrap(),
    );
    let binder = Binder::builder(types)
        .config(BinderConfig::default().with_mapping(MappingSource::Attributes))
        .build()
        .unwrap();

    let source = MapRef::from_entries([("address.city", Value::from("Turin"))]);
    let dto = binder.bind("FlatDTO", &[Value::Map(source)]).unwrap();
    assert_eq!(dto.as_object().unwrap().get("city"), Value::from("Turin"));

    let target = MapRef::new();
    binder
        .accessor()
        .write("a.b.c", Value::Int(1), &Value::Map(target.clone()));
    assert_eq!(target.get("a.b.c"), Value::Int(1));
    assert_eq!(target.len(), 1);
}

#[test]
fn test_extract_round_trip() {
    let binder = binder();
    let entity = simple_entity("back", 9, 2.5, false);
    let dto = binder.bind("SimpleEntity", &[Value::Object(entity.clone())]).unwrap();
    let rebuilt = binder.extract("SimpleEntity", &dto).unwrap();
    assert!(rebuilt.as_object().unwrap().same_state(&entity));
}

struct Upper {
    accessor: OnceLock<Arc<PropertyAccessor>>,
}

impl PropertyAccessorAware for Upper {
    fn set_property_accessor(&self, accessor: Arc<PropertyAccessor>) {
        let _ = self.accessor.set(accessor);
    }
}

impl SinglePropertyValueMerger for Upper {
    fn merge(&self, value: &Value, params: &[String]) -> dtobind_core::Result<Value> {
        let accessor = self
            .accessor
            .get()
            .ok_or_else(|| Error::configuration("no accessor"))?;
        let nested = accessor.read(&params[0], value);
        Ok(nested.as_str().map(|s| Value::from(s.to_uppercase())).unwrap_or_default())
    }
}

#[test]
fn test_custom_accessor_aware_merger() {
    let types = registry().with_type(
        TypeDescriptor::builder("ShoutDTO")
            .property(
                PropertyDescriptor::new("loud", PropertyType::Text).source_spec(
                    SourceSpec::new(dtobind_core::ROOT_OBJECT)
                        .merger("upper")
                        .param("aString"),
                ),
            )
            .build()
            .unwrap(),
    );
    let instances = InstanceRegistry::new();
    instances.register_single_accessor_aware(
        "upper",
        Upper {
            accessor: OnceLock::new(),
        },
    );
    let binder = Binder::builder(types)
        .registry(instances)
        .config(BinderConfig::default().with_mapping(MappingSource::Attributes))
        .build()
        .unwrap();

    let dto = binder
        .bind("ShoutDTO", &[Value::Object(simple_entity("quiet", 0, 0.0, false))])
        .unwrap();
    assert_eq!(dto.as_object().unwrap().get("loud"), Value::from("QUIET"));
}

#[test]
fn test_configuration_errors_abort_the_call() {
    let binder = binder();
    let err = binder.bind("NoSuchDTO", &[Value::from("x")]).unwrap_err();
    assert!(err.is_configuration());
}

fn cloning_holder_binder() -> Binder {
    let types = TypeRegistry::new()
        .with_type(
            TypeDescriptor::builder("Child")
                .cloneable()
                .property(PropertyDescriptor::new("label", PropertyType::Text))
                .build()
                .unwrap(),
        )
        .with_type(
            TypeDescriptor::builder("ChildDto")
                .property(PropertyDescriptor::new("label", PropertyType::Text))
                .build()
                .unwrap(),
        )
        .with_type(
            TypeDescriptor::builder("HolderDto")
                .property(
                    PropertyDescriptor::new("a", PropertyType::object("ChildDto"))
                        .source_spec(SourceSpec::new("a").merger(merger_ids::CLONE))
                        .cascade(),
                )
                .property(
                    PropertyDescriptor::new("b", PropertyType::object("ChildDto"))
                        .source_spec(SourceSpec::new("b").merger(merger_ids::CLONE))
                        .cascade(),
                )
                .build()
                .unwrap(),
        );
    Binder::builder(types)
        .config(BinderConfig::default().with_mapping(MappingSource::Attributes))
        .build()
        .unwrap()
}

#[test]
fn test_sources_made_during_the_bind_never_share_a_target() {
    let binder = cloning_holder_binder();
    for _ in 0..50 {
        let holder = ObjectRef::new("Holder");
        for (name, label) in [("a", "A"), ("b", "B")] {
            let child = ObjectRef::new("Child");
            child.set("label", Value::from(label));
            holder.set(name, Value::Object(child));
        }

        let dto = binder.bind("HolderDto", &[Value::Object(holder)]).unwrap();
        let dto = dto.as_object().unwrap();
        let a = dto.get("a");
        let b = dto.get("b");
        assert_ne!(a, b);
        assert_eq!(a.as_object().unwrap().get("label"), Value::from("A"));
        assert_eq!(b.as_object().unwrap().get("label"), Value::from("B"));
    }
}
