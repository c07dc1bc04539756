//! Notification collaborator. Callers treat delivery as fire-and-forget:
//! failures are logged, never propagated into the request's result.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use std::sync::Mutex;
use thiserror::Error;

use crate::{
    config::SmtpConfig,
    entity::orders::Model as OrderModel,
    line_items::{format_cents, render_items_html},
    models::OrderStatus,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("smtp failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Send and swallow: notification failure must not fail the request.
pub async fn send_or_log(mailer: &dyn Mailer, email: Email) {
    let to = email.to.clone();
    let subject = email.subject.clone();
    if let Err(err) = mailer.send(email).await {
        tracing::warn!(error = %err, to = %to, subject = %subject, "notification email failed");
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let Email { to, subject, html } = email;
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|_| MailError::Address(self.from.clone()))?,
            )
            .to(to.parse().map_err(|_| MailError::Address(to.clone()))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| MailError::Transport(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Used when SMTP is not configured: logs instead of delivering.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "smtp not configured, email suppressed");
        Ok(())
    }
}

/// Test double that records every message instead of delivering.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mailer lock").len()
    }

    pub fn sent_to(&self, addr: &str) -> usize {
        self.sent
            .lock()
            .expect("mailer lock")
            .iter()
            .filter(|e| e.to == addr)
            .count()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.sent.lock().expect("mailer lock").push(email);
        Ok(())
    }
}

fn display_payment_status(order: &OrderModel) -> &str {
    if order.payment_status.is_empty() {
        "Pending"
    } else {
        &order.payment_status
    }
}

/// Customer confirmation sent when an order is placed or a payment lands.
pub fn order_placed_email(order: &OrderModel) -> Email {
    let html = format!(
        "<h2>Order Placed</h2>\
         <p>Hi {name},</p>\
         <p>Thank you for your order.</p>\
         <p><strong>Order ID:</strong> {order_id}<br>\
         <strong>Amount:</strong> ${amount}<br>\
         <strong>Payment Status:</strong> {payment_status}</p>\
         {items}",
        name = order.name,
        order_id = order.order_id,
        amount = format_cents(order.amount_cents),
        payment_status = display_payment_status(order),
        items = render_items_html(&order.items_json),
    );
    Email {
        to: order.email.clone(),
        subject: "Order Placed".to_string(),
        html,
    }
}

/// Back-office notification for a new order, addressed from configuration.
pub fn admin_order_email(order: &OrderModel, admin_email: &str, public_base_url: &str) -> Email {
    let user_type = if order.user_id.is_some() {
        "Registered User"
    } else {
        "Guest User"
    };
    let proof = order
        .payid_proof
        .as_deref()
        .map(|url| format!("<p><strong>Payment Proof:</strong> <a href=\"{url}\">{url}</a></p>"))
        .unwrap_or_default();

    let html = format!(
        "<h2>New Order #{order_id}</h2>\
         <p><strong>Amount:</strong> ${amount}<br>\
         <strong>Payment Status:</strong> {payment_status}<br>\
         <strong>Order Status:</strong> {status}<br>\
         <strong>Customer:</strong> {name} ({email}, {phone})<br>\
         <strong>Customer Type:</strong> {user_type}<br>\
         <strong>Ship To:</strong> {address1} {address2}, {city}, {state} {zip}</p>\
         {items}\
         {proof}\
         <p><a href=\"{base}/admin/orders/{order_id}\">Open in back office</a></p>",
        order_id = order.order_id,
        amount = format_cents(order.amount_cents),
        payment_status = display_payment_status(order),
        status = order.status,
        name = order.name,
        email = order.email,
        phone = order.phone,
        user_type = user_type,
        address1 = order.address1,
        address2 = order.address2,
        city = order.city,
        state = order.state,
        zip = order.zip_code,
        items = render_items_html(&order.items_json),
        proof = proof,
        base = public_base_url,
    );
    Email {
        to: admin_email.to_string(),
        subject: format!("New Order Notification - Order #{}", order.order_id),
        html,
    }
}

/// Exactly one of these is sent per confirm/reject transition.
pub fn status_update_email(order: &OrderModel, status: OrderStatus) -> Email {
    let (subject, line) = match status {
        OrderStatus::Confirmed => (
            format!("Order #{} Confirmed", order.order_id),
            "Your order has been confirmed and is being prepared for shipment.",
        ),
        OrderStatus::Rejected => (
            format!("Order #{} Rejected", order.order_id),
            "Unfortunately we could not accept your order. If a payment was made it will be refunded.",
        ),
        OrderStatus::Placed => (
            format!("Order #{} Update", order.order_id),
            "Your order has been received.",
        ),
    };
    let html = format!(
        "<h2>Order Update</h2>\
         <p>Hi {name},</p>\
         <p>{line}</p>\
         <p><strong>Order ID:</strong> {order_id}<br>\
         <strong>Amount:</strong> ${amount}</p>\
         {items}",
        name = order.name,
        line = line,
        order_id = order.order_id,
        amount = format_cents(order.amount_cents),
        items = render_items_html(&order.items_json),
    );
    Email {
        to: order.email.clone(),
        subject,
        html,
    }
}
