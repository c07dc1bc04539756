use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Destination for back-office order notifications.
    pub admin_email: String,
    /// Base URL the payment provider redirects back to.
    pub public_base_url: String,
    pub currency: String,
    pub smtp: Option<SmtpConfig>,
    pub paypal: Option<PaypalConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let admin_email =
            env::var("ADMIN_EMAIL").unwrap_or_else(|_| "orders@example.com".to_string());
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let currency = env::var("CURRENCY").unwrap_or_else(|_| "USD".to_string());

        let smtp = match (env::var("SMTP_HOST"), env::var("SMTP_FROM")) {
            (Ok(host), Ok(from)) => Some(SmtpConfig {
                host,
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                from,
            }),
            _ => None,
        };

        let paypal = match (env::var("PAYPAL_CLIENT_ID"), env::var("PAYPAL_CLIENT_SECRET")) {
            (Ok(client_id), Ok(client_secret)) => Some(PaypalConfig {
                client_id,
                client_secret,
                base_url: env::var("PAYPAL_BASE_URL")
                    .unwrap_or_else(|_| "https://api.paypal.com".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            admin_email,
            public_base_url,
            currency,
            smtp,
            paypal,
        })
    }

    pub fn payment_return_url(&self) -> String {
        format!("{}/payment/success", self.public_base_url)
    }

    pub fn payment_cancel_url(&self) -> String {
        format!("{}/payment/cancel", self.public_base_url)
    }
}
