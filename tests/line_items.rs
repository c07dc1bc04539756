use std::collections::BTreeMap;

use storefront_api::line_items::{
    INVALID_ITEMS_PLACEHOLDER, ITEMS_JSON_MAX_LEN, ItemsError, LineItem, format_cents,
    items_total_cents, parse_cents, parse_items, product_id_from_code, render_items_html,
    to_items_json,
};

fn line(quantity: i64, name: &str, unit_price: &str) -> LineItem {
    LineItem {
        quantity,
        name: name.to_string(),
        unit_price: unit_price.to_string(),
        color: "Red".to_string(),
        size: "M".to_string(),
        image_url: "http://img.example/1.jpg".to_string(),
    }
}

#[test]
fn parses_wire_tuples_into_typed_items() {
    let json = r#"{"id5_a": [2, "Shirt", "20.00", "Red", "M", "url"]}"#;
    let items = parse_items(json).expect("valid snapshot");
    assert_eq!(items.len(), 1);

    let item = &items["id5_a"];
    assert_eq!(item.quantity, 2);
    assert_eq!(item.name, "Shirt");
    assert_eq!(item.unit_price, "20.00");
    assert_eq!(item.color, "Red");
    assert_eq!(item.size, "M");
    assert_eq!(item.image_url, "url");
}

#[test]
fn wrong_tuple_arity_is_malformed() {
    let json = r#"{"id5_a": [2, "Shirt", "20.00", "Red", "M"]}"#;
    assert!(matches!(parse_items(json), Err(ItemsError::Malformed(_))));

    let json = r#"{"id5_a": [2, "Shirt", "20.00", "Red", "M", "url", "extra"]}"#;
    assert!(matches!(parse_items(json), Err(ItemsError::Malformed(_))));
}

#[test]
fn malformed_json_is_malformed_not_a_panic() {
    assert!(matches!(
        parse_items("{not json"),
        Err(ItemsError::Malformed(_))
    ));
}

#[test]
fn empty_mapping_is_rejected() {
    assert!(matches!(parse_items("{}"), Err(ItemsError::Empty)));
}

#[test]
fn oversized_payload_is_rejected() {
    let json = format!("{{\"id1_a\": [1, \"{}\", \"1.00\", \"R\", \"M\", \"u\"]}}", "x".repeat(ITEMS_JSON_MAX_LEN));
    assert!(matches!(parse_items(&json), Err(ItemsError::TooLong)));
}

#[test]
fn serialization_preserves_the_wire_shape() {
    let items: BTreeMap<String, LineItem> =
        BTreeMap::from([("id5_a".to_string(), line(2, "Shirt", "20.00"))]);
    let json = to_items_json(&items).expect("serializes");
    assert!(json.contains(r#""id5_a":[2,"Shirt","20.00","Red","M","http://img.example/1.jpg"]"#));

    let reparsed = parse_items(&json).expect("round trip");
    assert_eq!(reparsed, items);
}

#[test]
fn product_id_recovery_from_codes() {
    assert_eq!(product_id_from_code("id5_a"), Some(5));
    assert_eq!(product_id_from_code("id12_red_m"), Some(12));
    assert_eq!(product_id_from_code("id07"), Some(7));
    assert_eq!(product_id_from_code("sku9"), None);
    assert_eq!(product_id_from_code("id_red"), None);
    assert_eq!(product_id_from_code("id"), None);
    assert_eq!(product_id_from_code("id-5_a"), None);
    assert_eq!(product_id_from_code(""), None);
}

#[test]
fn money_parsing_has_no_float_surprises() {
    assert_eq!(parse_cents("20"), Some(2000));
    assert_eq!(parse_cents("20.5"), Some(2050));
    assert_eq!(parse_cents("20.00"), Some(2000));
    assert_eq!(parse_cents("0.99"), Some(99));
    assert_eq!(parse_cents(" 7.30 "), Some(730));
    assert_eq!(parse_cents("1.234"), None);
    assert_eq!(parse_cents("-5"), None);
    assert_eq!(parse_cents("abc"), None);
    assert_eq!(parse_cents(""), None);
    assert_eq!(parse_cents("."), None);
}

#[test]
fn cents_formatting() {
    assert_eq!(format_cents(2000), "20.00");
    assert_eq!(format_cents(2050), "20.50");
    assert_eq!(format_cents(99), "0.99");
    assert_eq!(format_cents(0), "0.00");
}

#[test]
fn totals_sum_quantity_times_unit_price() {
    let items: BTreeMap<String, LineItem> = BTreeMap::from([
        ("id1_a".to_string(), line(2, "Shirt", "20.00")),
        ("id2_b".to_string(), line(1, "Hoodie", "79.50")),
    ]);
    assert_eq!(items_total_cents(&items), Some(2 * 2000 + 7950));
}

#[test]
fn totals_reject_bad_quantities_and_prices() {
    let items: BTreeMap<String, LineItem> =
        BTreeMap::from([("id1_a".to_string(), line(0, "Shirt", "20.00"))]);
    assert_eq!(items_total_cents(&items), None);

    let items: BTreeMap<String, LineItem> =
        BTreeMap::from([("id1_a".to_string(), line(1, "Shirt", "twenty"))]);
    assert_eq!(items_total_cents(&items), None);
}

#[test]
fn html_rendering_lists_every_item() {
    let items: BTreeMap<String, LineItem> = BTreeMap::from([
        ("id1_a".to_string(), line(2, "Shirt", "20.00")),
        ("id2_b".to_string(), line(1, "Hoodie", "79.50")),
    ]);
    let html = render_items_html(&to_items_json(&items).unwrap());
    assert!(html.contains("Shirt"));
    assert!(html.contains("Hoodie"));
    assert!(html.contains("<strong>Quantity:</strong> 2"));
}

#[test]
fn html_rendering_escapes_markup_in_fields() {
    let items: BTreeMap<String, LineItem> =
        BTreeMap::from([("id1_a".to_string(), line(1, "<script>alert(1)</script>", "1.00"))]);
    let html = render_items_html(&to_items_json(&items).unwrap());
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn html_rendering_falls_back_to_placeholder() {
    assert_eq!(render_items_html("{not json"), INVALID_ITEMS_PLACEHOLDER);
    assert_eq!(render_items_html("{}"), INVALID_ITEMS_PLACEHOLDER);
    assert_eq!(
        render_items_html(r#"{"id1_a": [1, "Shirt"]}"#),
        INVALID_ITEMS_PLACEHOLDER
    );
}
