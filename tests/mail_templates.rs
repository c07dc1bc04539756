use storefront_api::entity::orders::Model as OrderModel;
use storefront_api::line_items::INVALID_ITEMS_PLACEHOLDER;
use storefront_api::mail::{admin_order_email, order_placed_email, status_update_email};
use storefront_api::models::OrderStatus;

fn order() -> OrderModel {
    OrderModel {
        order_id: 42,
        items_json: r#"{"id5_a": [2, "Shirt", "20.00", "Red", "M", "url"]}"#.to_string(),
        amount_cents: 4995,
        name: "Alex Doe".to_string(),
        email: "alex@example.com".to_string(),
        address1: "1 Main St".to_string(),
        address2: String::new(),
        city: "Sydney".to_string(),
        state: "NSW".to_string(),
        zip_code: "2000".to_string(),
        phone: "0400000000".to_string(),
        shipping_method: "Standard Post".to_string(),
        shipping_cost_cents: 995,
        oid: String::new(),
        amount_paid_cents: None,
        payment_status: String::new(),
        payid_proof: None,
        user_id: None,
        is_guest: true,
        status: "PLACED".to_string(),
        created_at: chrono::Utc::now().into(),
        updated_at: chrono::Utc::now().into(),
    }
}

#[test]
fn customer_confirmation_carries_the_order_fields() {
    let email = order_placed_email(&order());
    assert_eq!(email.to, "alex@example.com");
    assert_eq!(email.subject, "Order Placed");
    assert!(email.html.contains("42"));
    assert!(email.html.contains("49.95"));
    assert!(email.html.contains("Shirt"));
    // Empty payment label renders as pending.
    assert!(email.html.contains("Pending"));
}

#[test]
fn admin_notification_goes_to_the_configured_address() {
    let mut model = order();
    model.payment_status = "PayID".to_string();
    model.payid_proof = Some("http://img.example/proof.jpg".to_string());

    let email = admin_order_email(&model, "ops@example.com", "http://localhost:3000");
    assert_eq!(email.to, "ops@example.com");
    assert_eq!(email.subject, "New Order Notification - Order #42");
    assert!(email.html.contains("PayID"));
    assert!(email.html.contains("Guest User"));
    assert!(email.html.contains("http://img.example/proof.jpg"));
    assert!(email.html.contains("/admin/orders/42"));
}

#[test]
fn status_emails_describe_the_transition() {
    let confirmed = status_update_email(&order(), OrderStatus::Confirmed);
    assert_eq!(confirmed.to, "alex@example.com");
    assert_eq!(confirmed.subject, "Order #42 Confirmed");
    assert!(confirmed.html.contains("confirmed"));

    let rejected = status_update_email(&order(), OrderStatus::Rejected);
    assert_eq!(rejected.subject, "Order #42 Rejected");
    assert!(rejected.html.contains("could not accept"));
}

#[test]
fn unreadable_snapshots_render_the_placeholder_in_emails() {
    let mut model = order();
    model.items_json = "{not json".to_string();
    let email = order_placed_email(&model);
    assert!(email.html.contains(INVALID_ITEMS_PLACEHOLDER));
}
