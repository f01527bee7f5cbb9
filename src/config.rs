use eyre::{Context, Report};
use std::env;
use std::net::{Ipv4Addr, SocketAddr};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database_url: String,
    pub stripe: StripeConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl ServerConfig {
    pub fn to_socket_addrs(&self) -> SocketAddr {
        SocketAddr::new(self.host.into(), self.port)
    }
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// Price backing recurring donations; every subscription bills it.
    pub price_id: String,
    pub api_base: String,
    pub return_url: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub api_base: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Report> {
        Ok(Self {
            server: ServerConfig {
                host: optional("HOST", "0.0.0.0")
                    .parse()
                    .wrap_err("HOST is not a valid IPv4 address")?,
                port: optional("PORT", "3001")
                    .parse()
                    .wrap_err("PORT is not a valid port number")?,
            },
            database_url: required("DATABASE_URL")?,
            stripe: StripeConfig {
                secret_key: required("STRIPE_SECRET_KEY")?,
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
                price_id: required("STRIPE_PRICE_ID")?,
                api_base: optional("STRIPE_API_BASE", "https://api.stripe.com"),
                return_url: optional(
                    "PAYMENT_RETURN_URL",
                    "http://localhost:3000/payment-success",
                ),
            },
            mail: MailConfig {
                api_key: required("MAIL_API_KEY")?,
                api_base: optional("MAIL_API_BASE", "https://api.resend.com"),
                from: optional("MAIL_FROM", "receipts@donations.example"),
            },
        })
    }
}

fn required(key: &str) -> Result<String, Report> {
    env::var(key).wrap_err_with(|| format!("{key} not set in environment"))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
