use std::collections::BTreeMap;

use storefront_api::line_items::{ItemsMap, LineItem};
use storefront_api::services::product_service::{TRENDING_LIMIT, rank_trending};

fn snapshot(entries: &[(&str, i64)]) -> ItemsMap {
    entries
        .iter()
        .map(|(code, quantity)| {
            (
                code.to_string(),
                LineItem {
                    quantity: *quantity,
                    name: "Item".to_string(),
                    unit_price: "10.00".to_string(),
                    color: "Black".to_string(),
                    size: "M".to_string(),
                    image_url: "u".to_string(),
                },
            )
        })
        .collect::<BTreeMap<_, _>>()
}

#[test]
fn accumulates_quantity_per_product_across_orders() {
    // Orders contribute 3 + 2 to product 1 and 5 to product 2.
    let orders = vec![
        snapshot(&[("id1_a", 3)]),
        snapshot(&[("id2_b", 5)]),
        snapshot(&[("id1_a", 2)]),
    ];
    // Equal totals fall back to ascending product id.
    assert_eq!(rank_trending(orders), vec![1, 2]);
}

#[test]
fn higher_totals_rank_first() {
    let orders = vec![snapshot(&[("id1_a", 1), ("id2_b", 4), ("id3_c", 2)])];
    assert_eq!(rank_trending(orders), vec![2, 3, 1]);
}

#[test]
fn line_item_code_contributes_to_the_embedded_product() {
    let orders = vec![snapshot(&[("id5_a", 2)])];
    assert_eq!(rank_trending(orders), vec![5]);
}

#[test]
fn unparseable_codes_are_skipped() {
    let orders = vec![snapshot(&[("garbled", 9), ("id4_x", 1)])];
    assert_eq!(rank_trending(orders), vec![4]);
}

#[test]
fn zero_total_products_never_appear() {
    let orders = vec![snapshot(&[("id1_a", 0), ("id2_b", 3)])];
    assert_eq!(rank_trending(orders), vec![2]);
}

#[test]
fn output_is_capped_at_the_display_limit() {
    let orders = vec![
        snapshot(&[
            ("id1_a", 1),
            ("id2_a", 2),
            ("id3_a", 3),
            ("id4_a", 4),
            ("id5_a", 5),
            ("id6_a", 6),
            ("id7_a", 7),
            ("id8_a", 8),
        ]),
    ];
    let ranked = rank_trending(orders);
    assert_eq!(ranked.len(), TRENDING_LIMIT);
    assert_eq!(ranked, vec![8, 7, 6, 5, 4, 3]);
}

#[test]
fn no_orders_means_no_trending() {
    assert!(rank_trending(Vec::<ItemsMap>::new()).is_empty());
}
