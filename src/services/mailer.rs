// src/services/mailer.rs

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use url::Url;

use crate::{
    config::{Config, RESET_TOKEN_TTL_MINUTES, SmtpConfig, VERIFICATION_TOKEN_TTL_HOURS},
    error::AppError,
};

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// The actionable link embedded in the body.
    pub link: String,
}

/// Transactional mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError>;
}

/// Delivers mail through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from: &str) -> Result<Self, AppError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .port(smtp.port);

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| AppError::InternalServerError(format!("Invalid MAIL_FROM: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!("Email sending error: {:?}", e);
            AppError::InternalServerError(format!("Failed to send email: {}", e))
        })?;

        tracing::info!("Email sent to {}", email.to);
        Ok(())
    }
}

/// Development transport: writes the message to the log instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            link = %email.link,
            "SMTP not configured, email not sent"
        );
        Ok(())
    }
}

/// `page` is relative, so a FRONTEND_URL with a path prefix keeps it.
fn frontend_link(config: &Config, page: &str, token: &str) -> Result<String, AppError> {
    let base = format!("{}/", config.frontend_url.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .and_then(|base| base.join(page))
        .map_err(|e| AppError::InternalServerError(format!("Invalid FRONTEND_URL: {}", e)))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.to_string())
}

fn layout(title: &str, intro: &str, link: &str, button: &str, footer: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; line-height: 1.6;">
  <h2 style="color: #330570;">{title}</h2>
  <p>{intro}</p>
  <a href="{link}"
     style="display: inline-block; padding: 10px 20px; background-color: #330570; color: white; text-decoration: none; border-radius: 5px;">
    {button}
  </a>
  <p style="margin-top: 20px; color: #666;">{footer}</p>
</div>"#
    )
}

pub fn verification_email(config: &Config, to: &str, token: &str) -> Result<OutgoingEmail, AppError> {
    let link = frontend_link(config, "verify-email", token)?;
    let html = layout(
        "Подтверждение email",
        "Для завершения регистрации подтвердите адрес электронной почты:",
        &link,
        "Подтвердить email",
        &format!(
            "Ссылка действительна {} часа. Если вы не регистрировались, проигнорируйте это письмо.",
            VERIFICATION_TOKEN_TTL_HOURS
        ),
    );

    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Подтверждение регистрации".to_string(),
        html,
        link,
    })
}

pub fn password_reset_email(
    config: &Config,
    to: &str,
    token: &str,
) -> Result<OutgoingEmail, AppError> {
    let link = frontend_link(config, "reset-password", token)?;
    let html = layout(
        "Восстановление пароля",
        "Для сброса пароля перейдите по ссылке:",
        &link,
        "Сбросить пароль",
        &format!(
            "Ссылка действительна {} минут. Если вы не запрашивали сброс пароля, проигнорируйте это письмо.",
            RESET_TOKEN_TTL_MINUTES
        ),
    );

    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Восстановление пароля".to_string(),
        html,
        link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn verification_link_embeds_token() {
        let email = verification_email(&test_config(), "a@x.com", "abc123").unwrap();
        assert_eq!(email.link, "http://front.test/verify-email?token=abc123");
        assert!(email.html.contains(&email.link));
        assert_eq!(email.to, "a@x.com");
    }

    #[test]
    fn reset_link_points_to_reset_page() {
        let email = password_reset_email(&test_config(), "a@x.com", "tok").unwrap();
        assert_eq!(email.link, "http://front.test/reset-password?token=tok");
        assert_eq!(email.subject, "Восстановление пароля");
    }

    #[test]
    fn links_keep_the_frontend_path_prefix() {
        let mut config = test_config();
        config.frontend_url = "https://host.test/app".into();
        let email = verification_email(&config, "a@x.com", "t1").unwrap();
        assert_eq!(email.link, "https://host.test/app/verify-email?token=t1");

        config.frontend_url = "https://host.test/app/".into();
        let email = password_reset_email(&config, "a@x.com", "t2").unwrap();
        assert_eq!(email.link, "https://host.test/app/reset-password?token=t2");
    }

    #[test]
    fn broken_frontend_url_is_an_internal_error() {
        let mut config = test_config();
        config.frontend_url = "not a url".into();
        assert!(matches!(
            verification_email(&config, "a@x.com", "t"),
            Err(AppError::InternalServerError(_))
        ));
    }

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        let email = verification_email(&test_config(), "a@x.com", "t").unwrap();
        assert!(LogMailer.send(email).await.is_ok());
    }
}
