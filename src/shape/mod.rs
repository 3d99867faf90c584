//! Element shaping.
//!
//! Turns one OSM `node` or `way` element into a [`ShapedRecord`]:
//! origin metadata is grouped under `created`, coordinates become `pos`,
//! `addr:*` tags are nested under `address` and `nd` children are collected
//! into `node_refs`. Every other attribute or tag becomes a top-level field.

mod record;

pub use record::{FieldMap, FieldValue, ShapedRecord};

use std::num::ParseFloatError;
use thiserror::Error;

use crate::element::RawElement;

/// Attribute keys grouped under `created`.
pub const CREATED: [&str; 5] = ["version", "changeset", "timestamp", "user", "uid"];

const ADDRESS_PREFIX: &str = "addr:";

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("{tag} {id}: {axis} value {value:?} is not a number")]
    InvalidCoordinate {
        tag: String,
        id: String,
        axis: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("{tag} {id}: {axis} value {value:?} is not finite")]
    NonFiniteCoordinate {
        tag: String,
        id: String,
        axis: &'static str,
        value: String,
    },
}

/// Shape one element. Returns `Ok(None)` for anything but `node` and `way`.
pub fn shape_element(element: &RawElement) -> Result<Option<ShapedRecord>, ShapeError> {
    if !element.is_entity() {
        return Ok(None);
    }

    let mut record = ShapedRecord::new();
    record.insert("type", FieldValue::Text(element.tag.clone()));
    apply_element_attributes(element, &mut record)?;

    for child in &element.children {
        match child.tag.as_str() {
            "tag" => apply_child_tag(child, &mut record),
            "nd" => {
                if let Some(node_ref) = child.attr("ref") {
                    record.sequence_mut("node_refs").push(node_ref.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(Some(record))
}

/// Copy the element's own attributes into `record`.
pub fn apply_element_attributes(
    element: &RawElement,
    record: &mut ShapedRecord,
) -> Result<(), ShapeError> {
    if let (Some(lat), Some(lon)) = (element.attr("lat"), element.attr("lon")) {
        let lat = parse_coordinate(element, "lat", lat)?;
        let lon = parse_coordinate(element, "lon", lon)?;
        record.insert("pos", FieldValue::Position([lat, lon]));
    }

    for (key, value) in &element.attributes {
        if CREATED.contains(&key.as_str()) {
            record.group_mut("created").insert(key, value);
        } else if key == "lat" || key == "lon" {
            continue;
        } else {
            record.insert(key, FieldValue::Text(value.clone()));
        }
    }

    Ok(())
}

/// Merge one `tag` child into `record`. Tags without both `k` and `v`, and
/// address keys nested deeper than `addr:<name>`, are dropped.
pub fn apply_child_tag(child: &RawElement, record: &mut ShapedRecord) {
    let Some((key, value)) = child.tag_pair() else {
        return;
    };

    if key.starts_with(ADDRESS_PREFIX) {
        let segments: Vec<&str> = key.split(':').collect();
        if segments.len() > 2 {
            return;
        }
        if let Some(name) = segments.last() {
            record.group_mut("address").insert(name, value);
        }
    } else {
        record.insert(key, FieldValue::Text(value.to_string()));
    }
}

fn parse_coordinate(element: &RawElement, axis: &'static str, raw: &str) -> Result<f64, ShapeError> {
    let id = element.attr("id").unwrap_or("<no id>").to_string();
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|source| ShapeError::InvalidCoordinate {
            tag: element.tag.clone(),
            id: id.clone(),
            axis,
            value: raw.to_string(),
            source,
        })?;
    if !value.is_finite() {
        return Err(ShapeError::NonFiniteCoordinate {
            tag: element.tag.clone(),
            id,
            axis,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tag(k: &str, v: &str) -> RawElement {
        RawElement::new("tag").with_attr("k", k).with_attr("v", v)
    }

    fn nd(node_ref: &str) -> RawElement {
        RawElement::new("nd").with_attr("ref", node_ref)
    }

    fn shape(element: &RawElement) -> ShapedRecord {
        shape_element(element).unwrap().expect("node or way")
    }

    #[test]
    fn skips_non_entity_elements() {
        for name in ["relation", "osm", "bounds", "tag", "nd", "member"] {
            let element = RawElement::new(name)
                .with_attr("id", "1")
                .with_child(tag("name", "x"));
            assert!(shape_element(&element).unwrap().is_none(), "{name}");
        }
    }

    #[test]
    fn shapes_minimal_node() {
        let element = RawElement::new("node")
            .with_attr("id", "1")
            .with_attr("lat", "10.0")
            .with_attr("lon", "20.0")
            .with_attr("version", "3")
            .with_attr("user", "alice");

        let record = shape(&element);

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "type": "node",
                "pos": [10.0, 20.0],
                "id": "1",
                "created": {"version": "3", "user": "alice"}
            })
        );
    }

    #[test]
    fn pos_matches_parsed_floats_exactly() {
        let element = RawElement::new("way")
            .with_attr("lat", "-31.9505269")
            .with_attr("lon", "115.8604572");
        let record = shape(&element);
        assert_eq!(
            record.get("pos"),
            Some(&FieldValue::Position(["-31.9505269".parse().unwrap(), "115.8604572".parse().unwrap()]))
        );
    }

    #[test]
    fn pos_requires_both_coordinates() {
        let element = RawElement::new("node").with_attr("lat", "1.0");
        let record = shape(&element);
        assert!(!record.contains_key("pos"));
        assert!(!record.contains_key("lat"));
    }

    #[test]
    fn created_keys_appear_only_under_created() {
        let element = RawElement::new("node")
            .with_attr("id", "5")
            .with_attr("version", "2")
            .with_attr("changeset", "17")
            .with_attr("timestamp", "2012-03-28T18:31:23Z")
            .with_attr("user", "bob")
            .with_attr("uid", "99")
            .with_attr("visible", "true");

        let record = shape(&element);
        let created = record.group("created").expect("created group");

        for key in CREATED {
            assert!(created.get(key).is_some(), "{key}");
            assert!(!record.contains_key(key), "{key}");
        }
        assert_eq!(created.get("timestamp"), Some("2012-03-28T18:31:23Z"));
        assert_eq!(record.text("visible"), Some("true"));
        assert_eq!(record.text("id"), Some("5"));
    }

    #[test]
    fn absent_optional_fields_stay_absent() {
        let record = shape(&RawElement::new("node").with_attr("id", "1"));
        for key in ["pos", "created", "address", "node_refs"] {
            assert!(!record.contains_key(key), "{key}");
        }
    }

    #[test]
    fn single_level_address_is_nested() {
        let element = RawElement::new("node")
            .with_child(tag("addr:city", "Perth"))
            .with_child(tag("addr:street", "Hay Street"));
        let record = shape(&element);
        let address = record.group("address").expect("address group");
        assert_eq!(address.get("city"), Some("Perth"));
        assert_eq!(address.get("street"), Some("Hay Street"));
        assert!(!record.contains_key("addr:city"));
    }

    #[test]
    fn deep_address_keys_are_dropped() {
        let element = RawElement::new("node")
            .with_child(tag("addr:city:district", "North"))
            .with_child(tag("addr:street:name", "Main"));
        let record = shape(&element);
        assert!(!record.contains_key("address"));
        assert!(!record.contains_key("addr:city:district"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn collects_node_refs_in_order() {
        let element = RawElement::new("way")
            .with_attr("id", "10")
            .with_child(nd("123"))
            .with_child(tag("highway", "residential"))
            .with_child(nd("456"));
        let record = shape(&element);
        assert_eq!(
            record.get("node_refs"),
            Some(&FieldValue::Sequence(vec!["123".into(), "456".into()]))
        );
        assert_eq!(record.text("highway"), Some("residential"));
    }

    #[test]
    fn nd_without_ref_is_ignored() {
        let element = RawElement::new("way").with_child(RawElement::new("nd"));
        assert!(!shape(&element).contains_key("node_refs"));
    }

    #[test]
    fn later_tags_overwrite_earlier_ones() {
        let element = RawElement::new("node")
            .with_child(tag("name", "First"))
            .with_child(tag("name", "Second"));
        assert_eq!(shape(&element).text("name"), Some("Second"));
    }

    #[test]
    fn tag_missing_value_changes_nothing() {
        let base = RawElement::new("node")
            .with_attr("id", "3")
            .with_child(tag("amenity", "cafe"));
        let with_broken = base
            .clone()
            .with_child(RawElement::new("tag").with_attr("k", "name"));

        assert_eq!(shape(&base), shape(&with_broken));
    }

    #[test]
    fn shaping_is_idempotent() {
        let element = RawElement::new("way")
            .with_attr("id", "8")
            .with_attr("user", "carol")
            .with_child(nd("1"))
            .with_child(tag("addr:postcode", "6000"));
        assert_eq!(shape(&element), shape(&element));
    }

    #[test]
    fn ignores_unknown_children() {
        let element = RawElement::new("way").with_child(
            RawElement::new("member")
                .with_attr("ref", "1")
                .with_attr("k", "x")
                .with_attr("v", "y"),
        );
        assert_eq!(shape(&element).len(), 1);
    }

    #[test]
    fn non_numeric_latitude_fails() {
        let element = RawElement::new("node")
            .with_attr("id", "77")
            .with_attr("lat", "north")
            .with_attr("lon", "1.0");
        let err = shape_element(&element).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidCoordinate { axis: "lat", .. }));
        assert!(err.to_string().contains("node 77"));
    }

    #[test]
    fn non_finite_longitude_fails() {
        let element = RawElement::new("node")
            .with_attr("lat", "1.0")
            .with_attr("lon", "inf");
        assert!(matches!(
            shape_element(&element),
            Err(ShapeError::NonFiniteCoordinate { axis: "lon", .. })
        ));
    }

    #[test]
    fn coordinates_tolerate_surrounding_whitespace() {
        let element = RawElement::new("node")
            .with_attr("lat", " 1.25 ")
            .with_attr("lon", "2.5\n");
        assert_eq!(shape(&element).get("pos"), Some(&FieldValue::Position([1.25, 2.5])));
    }

    #[test]
    fn tag_named_like_group_is_replaced_by_group() {
        let element = RawElement::new("node")
            .with_child(tag("address", "flat"))
            .with_child(tag("addr:city", "Perth"));
        let record = shape(&element);
        assert_eq!(record.group("address").and_then(|g| g.get("city")), Some("Perth"));
    }
}
