//! Include resolution: whole-document and field includes, cycles, missing files.

mod common;

use common::Fixture;
use serde_yaml::Value as Yaml;
use tabula::include::{flatten_documents, load, load_stream, Loaded, OpenSet};
use tabula::SetupError;

fn get<'a>(doc: &'a Yaml, key: &str) -> &'a Yaml {
    doc.get(key).unwrap_or_else(|| panic!("missing key {key}"))
}

#[test]
fn field_include_replaces_the_value() {
    let fx = Fixture::new();
    fx.write("shared/args.yaml", "[1, 2]\n");
    let main = fx.write(
        "math.test.yaml",
        "case: adds\nin: !include shared/args.yaml\nout: 3\n",
    );

    let docs = load_stream(&main).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(get(&docs[0], "in"), &serde_yaml::from_str::<Yaml>("[1, 2]").unwrap());
}

#[test]
fn document_include_of_multi_document_file_is_spliced_in_order() {
    let fx = Fixture::new();
    fx.write(
        "cases.yaml",
        "case: one\nin: [1]\n---\ncase: two\nin: [2]\n",
    );
    let main = fx.write(
        "math.test.yaml",
        "file: ./math.js\n---\nsuite: add\n--- !include cases.yaml\n---\ncase: three\n",
    );

    let docs = load_stream(&main).unwrap();
    let names: Vec<_> = docs
        .iter()
        .filter_map(|d| d.get("case").and_then(Yaml::as_str))
        .collect();
    assert_eq!(names, ["one", "two", "three"]);
    assert_eq!(docs.len(), 5);
}

#[test]
fn sibling_branches_may_include_the_same_leaf() {
    let fx = Fixture::new();
    fx.write("leaf.yaml", "value: 42\n");
    fx.write("left.yaml", "leaf: !include leaf.yaml\n");
    fx.write("right.yaml", "leaf: !include leaf.yaml\n");
    let main = fx.write(
        "tree.yaml",
        "left: !include left.yaml\nright: !include right.yaml\n",
    );

    let Loaded::Single(doc) = load(&main, &OpenSet::new()).unwrap() else {
        panic!("expected a single document");
    };
    let left = get(get(&doc, "left"), "leaf");
    let right = get(get(&doc, "right"), "leaf");
    assert_eq!(left, right);
    assert_eq!(get(left, "value").as_i64(), Some(42));
}

#[test]
fn self_inclusion_is_circular() {
    let fx = Fixture::new();
    let main = fx.write("self.yaml", "me: !include self.yaml\n");

    let err = load_stream(&main).unwrap_err();
    assert!(matches!(err, SetupError::CircularInclusion { .. }), "{err:?}");
}

#[test]
fn longer_cycles_are_circular() {
    let fx = Fixture::new();
    fx.write("a.yaml", "next: !include b.yaml\n");
    fx.write("b.yaml", "next: !include c.yaml\n");
    fx.write("c.yaml", "--- !include a.yaml\n");

    let err = load_stream(&fx.path("a.yaml")).unwrap_err();
    let SetupError::CircularInclusion { path } = err else {
        panic!("expected circular inclusion, got {err:?}");
    };
    assert!(path.ends_with("a.yaml"));
}

#[test]
fn missing_include_names_target_and_referrer() {
    let fx = Fixture::new();
    let main = fx.write("main.yaml", "data: !include nowhere.yaml\n");

    let err = load_stream(&main).unwrap_err();
    let SetupError::IncludeNotFound { path, from } = err else {
        panic!("expected include not found, got {err:?}");
    };
    assert!(path.ends_with("nowhere.yaml"));
    assert!(from.ends_with("main.yaml"));
}

#[test]
fn include_paths_resolve_against_the_including_file() {
    let fx = Fixture::new();
    fx.write("shared/inner/value.yaml", "7\n");
    fx.write("shared/outer.yaml", "n: !include inner/value.yaml\n");
    let main = fx.write("specs/main.yaml", "x: !include ../shared/outer.yaml\n");

    let docs = load_stream(&main).unwrap();
    assert_eq!(get(get(&docs[0], "x"), "n").as_i64(), Some(7));
}

#[test]
fn non_string_include_is_rejected() {
    let fx = Fixture::new();
    let main = fx.write("main.yaml", "x: !include [a, b]\n");

    let err = load_stream(&main).unwrap_err();
    assert!(matches!(err, SetupError::InvalidInclude { .. }), "{err:?}");
}

#[test]
fn nested_document_lists_flatten_completely() {
    let nested: Yaml = serde_yaml::from_str("[[{a: 1}, [{b: 2}]], {c: 3}]").unwrap();
    let Yaml::Sequence(items) = nested else {
        unreachable!()
    };
    let flat = flatten_documents(items);
    assert_eq!(flat.len(), 3);
    assert!(flat.iter().all(Yaml::is_mapping));
}
