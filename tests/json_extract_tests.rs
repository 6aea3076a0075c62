use serde::Deserialize;
use semantic_quiz::json_utils::{extract_first, find_json_structures, NodeType};

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    x: i32,
}

#[test]
fn whole_reply_is_preferred() {
    let v: Vec<Item> = extract_first(r#"  [{"x":1},{"x":2}]  "#).unwrap();
    assert_eq!(v, vec![Item { x: 1 }, Item { x: 2 }]);
}

#[test]
fn first_matching_root_wins() {
    let s = r#"prefix {"y":5} middle [{"x":7},{"x":8}] tail [{"x":9}]"#;
    let v: Vec<Item> = extract_first(s).unwrap();
    assert_eq!(v, vec![Item { x: 7 }, Item { x: 8 }]);
}

#[test]
fn nested_children_are_not_salvaged() {
    // The outer array fails, so its valid first element must not be returned
    let s = r#"here: [{"x":1},{"x":"two"}]"#;
    assert!(extract_first::<Vec<Item>>(s).is_err());
    assert!(extract_first::<Item>(r#"{"wrapper": {"x": 3}}"#).is_err());
}

#[test]
fn braces_inside_strings_are_ignored() {
    let s = r#"note {"label": "a } tricky ] string", "x": 4} done"#;
    let roots = find_json_structures(s);
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].kind, NodeType::Object);
    #[derive(Deserialize)]
    struct Labelled {
        label: String,
        x: i32,
    }
    let v: Labelled = extract_first(s).unwrap();
    assert_eq!(v.label, "a } tricky ] string");
    assert_eq!(v.x, 4);
}

#[test]
fn plain_prose_is_an_error() {
    assert!(extract_first::<Vec<Item>>("no json here at all").is_err());
}
