use offload_worker::{
    canonical_text, filter_records, parse_json_text, sort_records, JsonTransform, ParseSource,
    Request, Transform, WorkerError, WorkerErrorKind,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn array_root_is_the_dataset() {
    let dataset = parse_json_text(r#"[{"id":1},{"id":2},{"id":3}]"#).unwrap();
    assert_eq!(dataset, vec![json!({"id":1}), json!({"id":2}), json!({"id":3})]);
}

#[test]
fn object_root_yields_values_in_document_order() {
    let dataset = parse_json_text(r#"{"z":{"n":1},"a":{"n":2},"m":{"n":3}}"#).unwrap();
    assert_eq!(dataset, vec![json!({"n":1}), json!({"n":2}), json!({"n":3})]);
}

#[test]
fn malformed_json_is_a_decode_error() {
    let err = parse_json_text("[{\"id\": 1,,}]").unwrap_err();
    assert!(matches!(err, WorkerError::Decode(_)));
    assert_eq!(err.kind(), WorkerErrorKind::Decode);
}

#[test]
fn scalar_roots_are_rejected() {
    for text in ["42", "\"text\"", "true", "null"] {
        let err = parse_json_text(text).unwrap_err();
        assert_eq!(err.kind(), WorkerErrorKind::Decode, "root {text}");
    }
}

#[test]
fn filter_matches_whole_record_text_case_insensitively() {
    let dataset = vec![json!({"name":"Apple"}), json!({"name":"Banana"})];
    let filtered = filter_records(dataset, Some("app"));
    assert_eq!(filtered, vec![json!({"name":"Apple"})]);
}

#[test]
fn filter_searches_keys_and_nested_values() {
    let dataset = vec![
        json!({"id": 1, "tags": ["red", "Ripe"]}),
        json!({"id": 2, "owner": {"city": "Lima"}}),
        json!({"id": 3}),
    ];
    assert_eq!(
        filter_records(dataset.clone(), Some("ripe")),
        vec![dataset[0].clone()]
    );
    assert_eq!(
        filter_records(dataset.clone(), Some("CITY")),
        vec![dataset[1].clone()]
    );
    assert!(filter_records(dataset, Some("absent")).is_empty());
}

#[test]
fn blank_or_missing_filter_is_a_noop() {
    let dataset = vec![json!({"a": 1}), json!({"a": 2})];
    assert_eq!(filter_records(dataset.clone(), None), dataset);
    assert_eq!(filter_records(dataset.clone(), Some("")), dataset);
    assert_eq!(filter_records(dataset.clone(), Some("   ")), dataset);
}

#[test]
fn sort_by_id_is_stable() {
    let dataset = vec![
        json!({"id":2,"x":"a"}),
        json!({"id":1,"x":"b"}),
        json!({"id":1,"x":"c"}),
    ];
    assert_eq!(
        sort_records(dataset),
        vec![
            json!({"id":1,"x":"b"}),
            json!({"id":1,"x":"c"}),
            json!({"id":2,"x":"a"}),
        ]
    );
}

#[test]
fn sort_by_id_coerces_text_and_puts_non_numbers_last() {
    let dataset = vec![
        json!({"id":"10"}),
        json!({"id":"abc"}),
        json!({"id":9}),
        json!({"other":true}),
        json!({"id":"-1"}),
    ];
    assert_eq!(
        sort_records(dataset),
        vec![
            json!({"id":"-1"}),
            json!({"id":9}),
            json!({"id":"10"}),
            json!({"id":"abc"}),
            json!({"other":true}),
        ]
    );
}

#[test]
fn sort_by_name_ignores_case() {
    let dataset = vec![
        json!({"name":"banana"}),
        json!({"name":"Apple"}),
        json!({"name":"cherry"}),
        json!({"name":"apple"}),
    ];
    assert_eq!(
        sort_records(dataset),
        vec![
            json!({"name":"Apple"}),
            json!({"name":"apple"}),
            json!({"name":"banana"}),
            json!({"name":"cherry"}),
        ]
    );
}

#[test]
fn sort_key_is_chosen_from_first_record() {
    // The first record has no `id`, so later `id` fields are ignored.
    let dataset = vec![
        json!({"name":"b"}),
        json!({"name":"c","id":-1}),
        json!({"name":"a","id":5}),
    ];
    assert_eq!(
        sort_records(dataset),
        vec![
            json!({"name":"a","id":5}),
            json!({"name":"b"}),
            json!({"name":"c","id":-1}),
        ]
    );
}

#[test]
fn sort_falls_back_to_canonical_text() {
    let dataset = vec![json!({"v":2}), json!({"v":1})];
    let once = sort_records(dataset.clone());
    assert_eq!(once, vec![json!({"v":1}), json!({"v":2})]);
    assert_eq!(sort_records(dataset), once);
}

#[test]
fn sort_handles_empty_and_scalar_records() {
    assert!(sort_records(Vec::new()).is_empty());
    assert_eq!(
        sort_records(vec![json!("b"), json!(3), json!("A")]),
        vec![json!("A"), json!("b"), json!(3)]
    );
}

#[test]
fn canonical_text_preserves_key_order() {
    assert_eq!(canonical_text(&json!({"b":1,"a":[true,null]})), r#"{"b":1,"a":[true,null]}"#);
}

#[test]
fn integral_floats_render_and_match_without_fraction() {
    let record = json!({"price": 2.0, "ratio": 0.5, "tags": ["a\"b", -0.0]});
    assert_eq!(canonical_text(&record), r#"{"price":2,"ratio":0.5,"tags":["a\"b",0]}"#);

    let dataset = vec![json!({"price": 2.0}), json!({"price": 2.5})];
    let kept = filter_records(dataset, Some(r#""price":2}"#));
    assert_eq!(kept, vec![json!({"price": 2.0})]);
}

#[test]
fn transform_parses_raw_file_bytes() {
    let request = Request::Parse {
        source: ParseSource::File(br#"{"first":{"id":1},"second":{"id":2}}"#.to_vec()),
    };
    let dataset = JsonTransform.apply(request).unwrap();
    assert_eq!(dataset, vec![json!({"id":1}), json!({"id":2})]);
}

#[test]
fn transform_accepts_already_parsed_payload() {
    let payload = vec![json!({"id":1})];
    let request = Request::Parse {
        source: ParseSource::Payload(payload.clone()),
    };
    assert_eq!(JsonTransform.apply(request).unwrap(), payload);
}
