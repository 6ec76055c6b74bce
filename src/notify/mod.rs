//! Transactional email delivery via SMTP.
//!
//! [`EmailNotifier`] wraps the `lettre` async SMTP transport and composes
//! the HTML notifications the marketplace sends: mission offers to
//! providers, booking confirmations and payment receipts to clients. When
//! no SMTP host is configured [`EmailNotifier::from_settings`] returns
//! `None` and callers skip sending entirely; delivery failures are logged
//! by callers and never fail the triggering request.

use chrono::{DateTime, Utc};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::EmailConfig;
use crate::error::EmailError;

pub struct EmailNotifier {
    smtp_host: String,
    smtp_port: u16,
    from_address: String,
    smtp_user: Option<String>,
    smtp_password: Option<String>,
}

fn mission_assigned_content(category: &str, deadline: DateTime<Utc>) -> (String, String) {
    let subject = format!("[HomeLink] New {} mission for you", category);
    let html = format!(
        "<html><body>\
         <h2>You have a new mission</h2>\
         <p>A client is looking for a <strong>{}</strong> provider and you are \
         the best match.</p>\
         <p>Please accept or decline before <strong>{}</strong>, after which \
         the mission moves to a backup provider.</p>\
         </body></html>",
        category,
        deadline.to_rfc3339()
    );
    (subject, html)
}

fn booking_confirmed_content(
    category: &str,
    scheduled_for: DateTime<Utc>,
    price: Decimal,
) -> (String, String) {
    let subject = format!("[HomeLink] Your {} booking is confirmed", category);
    let html = format!(
        "<html><body>\
         <h2>Booking confirmed</h2>\
         <p>Your <strong>{}</strong> booking is scheduled for \
         <strong>{}</strong>.</p>\
         <p>Agreed price: <strong>{}</strong></p>\
         </body></html>",
        category,
        scheduled_for.to_rfc3339(),
        price
    );
    (subject, html)
}

fn payment_receipt_content(category: &str, amount: Decimal) -> (String, String) {
    let subject = "[HomeLink] Payment receipt".to_string();
    let html = format!(
        "<html><body>\
         <h2>Thank you for your payment</h2>\
         <p>We captured <strong>{}</strong> for your <strong>{}</strong> \
         booking.</p>\
         </body></html>",
        amount, category
    );
    (subject, html)
}

impl EmailNotifier {
    /// Returns `None` when `email.smtp_host` is unset, signalling that
    /// email delivery is disabled for this deployment.
    pub fn from_settings(settings: &EmailConfig) -> Option<Self> {
        let smtp_host = settings.smtp_host.clone()?;
        Some(Self {
            smtp_host,
            smtp_port: settings.smtp_port,
            from_address: settings.from_address.clone(),
            smtp_user: settings.smtp_user.clone(),
            smtp_password: settings.smtp_password.clone(),
        })
    }

    async fn send_html(&self, to: &str, subject: &str, html: String) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_host)?
                .port(self.smtp_port);

        if let (Some(user), Some(pass)) = (&self.smtp_user, &self.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        info!(to = to, subject = subject, "Notification email sent");
        Ok(())
    }

    pub async fn mission_assigned(
        &self,
        to: &str,
        category: &str,
        deadline: DateTime<Utc>,
    ) -> Result<(), EmailError> {
        let (subject, html) = mission_assigned_content(category, deadline);
        self.send_html(to, &subject, html).await
    }

    pub async fn booking_confirmed(
        &self,
        to: &str,
        category: &str,
        scheduled_for: DateTime<Utc>,
        price: Decimal,
    ) -> Result<(), EmailError> {
        let (subject, html) = booking_confirmed_content(category, scheduled_for, price);
        self.send_html(to, &subject, html).await
    }

    pub async fn payment_receipt(
        &self,
        to: &str,
        category: &str,
        amount: Decimal,
    ) -> Result<(), EmailError> {
        let (subject, html) = payment_receipt_content(category, amount);
        self.send_html(to, &subject, html).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_settings() -> EmailConfig {
        EmailConfig {
            smtp_host: None,
            smtp_port: 587,
            from_address: "noreply@homelink.example".to_string(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[test]
    fn test_from_settings_disabled_without_host() {
        assert!(EmailNotifier::from_settings(&base_settings()).is_none());

        let mut settings = base_settings();
        settings.smtp_host = Some("smtp.example.com".to_string());
        assert!(EmailNotifier::from_settings(&settings).is_some());
    }

    #[test]
    fn test_mission_assigned_content_mentions_deadline() {
        let deadline = Utc::now();
        let (subject, html) = mission_assigned_content("plumbing", deadline);
        assert!(subject.contains("plumbing"));
        assert!(html.contains(&deadline.to_rfc3339()));
        assert!(html.contains("backup provider"));
    }

    #[test]
    fn test_receipt_content_includes_amount() {
        let (subject, html) = payment_receipt_content("gardening", dec!(75.50));
        assert_eq!(subject, "[HomeLink] Payment receipt");
        assert!(html.contains("75.50"));
        assert!(html.contains("gardening"));
    }
}
