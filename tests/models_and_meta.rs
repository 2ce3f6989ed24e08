use estat_market::ClassificationIndex;
use estat_market::models::{ApiResult, RawResponse, RawValueRecord};
use serde_json::json;

#[test]
fn status_accepts_string_or_number() {
    let r: ApiResult = serde_json::from_str(r#"{"STATUS":0,"ERROR_MSG":"ok"}"#).unwrap();
    assert_eq!(r.status, 0);
    let r: ApiResult = serde_json::from_str(r#"{"STATUS":"100"}"#).unwrap();
    assert_eq!(r.status, 100);
    assert_eq!(r.error_msg, None);
    assert!(serde_json::from_str::<ApiResult>(r#"{"STATUS":-1}"#).is_err());
}

#[test]
fn value_record_uses_wire_field_names() {
    let v: RawValueRecord = serde_json::from_str(
        r#"{"@tab":"001","@cat01":"100","@area":"13000","@time":"2020000000","@classCode":"A","@unit":"円","$":"12,5"}"#,
    )
    .unwrap();
    assert_eq!(v.tab.as_deref(), Some("001"));
    assert_eq!(v.cat01.as_deref(), Some("100"));
    assert_eq!(v.area.as_deref(), Some("13000"));
    assert_eq!(v.time.as_deref(), Some("2020000000"));
    assert_eq!(v.class_code.as_deref(), Some("A"));
    // unparsable text is missing, never zero
    assert_eq!(v.numeric_value(), None);
}

#[test]
fn value_text_coercion() {
    let cell = |s: serde_json::Value| {
        serde_json::from_value::<RawValueRecord>(json!({ "$": s }))
            .unwrap()
            .numeric_value()
    };
    assert_eq!(cell(json!("1200")), Some(1200.0));
    assert_eq!(cell(json!(" 3.5 ")), Some(3.5));
    assert_eq!(cell(json!("-")), None);
    assert_eq!(cell(json!("")), None);
    assert_eq!(cell(json!("x")), None);
    assert_eq!(cell(json!(null)), None);
    assert_eq!(cell(json!(-4)), Some(-4.0));
    assert_eq!(RawValueRecord::default().numeric_value(), None);
}

#[test]
fn bare_statistical_data_document_is_accepted() {
    let body = json!({
        "STATISTICAL_DATA": {
            "RESULT": {"STATUS": 0},
            "CLASS_INF": {"CLASS_OBJ": []},
            "DATA_INF": {"VALUE": [{"$": "1"}]}
        }
    });
    let r = RawResponse::from_json(&body);
    assert!(r.check_status().is_ok());
    assert_eq!(r.values.len(), 1);
    assert!(r.class_objs.is_empty());
}

#[test]
fn missing_result_block_is_an_error() {
    let r = RawResponse::from_json(&json!({"unexpected": true}));
    assert!(r.check_status().is_err());
    assert!(r.values.is_empty());
}

#[test]
fn index_resolves_and_passes_unknown_codes_through() {
    let objs = vec![
        json!({"@id": "area", "@name": "地域", "CLASS": [
            {"@code": "01", "@name": "北海道"},
            {"@code": "13", "@name": "東京都"}
        ]}),
        json!({"@id": "time", "@name": "時間軸", "@description": "年次", "CLASS": [
            {"@code": "2019", "@name": "2019年"},
            {"@code": "2020", "@name": "2020年"}
        ]}),
    ];
    let idx = ClassificationIndex::build(&objs);
    assert_eq!(idx.len(), 2);
    assert_eq!(idx.resolve("area", "13"), "東京都");
    assert_eq!(idx.resolve("time", "2019"), "2019年");
    assert_eq!(idx.resolve("area", "47"), "47");
    assert_eq!(idx.resolve("cat01", "100"), "100");
    assert_eq!(idx.resolve_opt("area", None), None);

    let time = idx.dimension("time").unwrap();
    assert_eq!(time.name, "時間軸");
    assert_eq!(time.description.as_deref(), Some("年次"));
    let ids: Vec<&str> = idx.dimensions().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["area", "time"]);
}

#[test]
fn malformed_dimensions_are_skipped_not_fatal() {
    let objs = vec![
        json!({"@name": "no id", "CLASS": [{"@code": "1", "@name": "x"}]}),
        json!({"@id": "cat01", "CLASS": [{"@name": "missing code"}]}),
        json!("garbage"),
        json!({"@id": "area", "CLASS": [{"@code": "13", "@name": "東京都"}]}),
    ];
    let idx = ClassificationIndex::build(&objs);
    assert_eq!(idx.len(), 1);
    assert_eq!(idx.resolve("area", "13"), "東京都");
    assert_eq!(idx.resolve("cat01", "1"), "1");
    assert!(ClassificationIndex::build(&[]).is_empty());
}
