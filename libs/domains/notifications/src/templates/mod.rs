//! Email template rendering engine.
//!
//! Every [`AccountEvent`] maps to three templates: subject, plain text and
//! HTML. Values interpolated into HTML are escaped; subjects and plain text
//! are rendered verbatim. Templates are compiled once in [`TemplateEngine::new`].

mod sources;

use crate::error::{NotificationError, NotificationResult};
use crate::events::{AccountEvent, EventKind};
use crate::models::RenderedMessage;
use handlebars::Handlebars;
use serde::Serialize;
use sources::*;
use strum::IntoEnumIterator;

/// Product details interpolated into every email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    /// Product name used in subjects and signatures.
    pub product_name: String,
    /// Base URL for support and reset links, without a trailing slash.
    pub base_url: String,
    /// Validity window stated in verification emails.
    pub code_ttl_minutes: u32,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            product_name: "InfiniteDb".to_string(),
            base_url: "https://infinitedb.com".to_string(),
            code_ttl_minutes: 15,
        }
    }
}

impl Branding {
    /// Host part of the base URL, shown in the footer.
    pub fn site(&self) -> &str {
        let without_scheme = self
            .base_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.base_url);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Serialize)]
struct TemplateData<'a> {
    product: &'a str,
    site: &'a str,
    support_url: String,
    ttl_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_url: Option<String>,
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Template engine for rendering account emails.
pub struct TemplateEngine {
    html: Handlebars<'static>,
    text: Handlebars<'static>,
    branding: Branding,
}

impl TemplateEngine {
    /// Create an engine with the default branding.
    pub fn new() -> NotificationResult<Self> {
        Self::with_branding(Branding::default())
    }

    /// Create an engine with all templates compiled.
    pub fn with_branding(branding: Branding) -> NotificationResult<Self> {
        let mut html = Handlebars::new();
        html.set_strict_mode(true);
        html.register_escape_fn(escape_html);

        let mut text = Handlebars::new();
        text.set_strict_mode(true);
        text.register_escape_fn(handlebars::no_escape);

        html.register_partial("footer", FOOTER_HTML_PARTIAL)?;
        text.register_partial("signature", SIGNATURE_TEXT_PARTIAL)?;

        for kind in EventKind::iter() {
            let (subject, plain, markup) = sources_for(kind);
            let name = kind.template_name();
            text.register_template_string(&format!("{}_subject", name), subject)
                .map_err(|e| NotificationError::TemplateError(format!("Failed to register {}_subject: {}", name, e)))?;
            text.register_template_string(&format!("{}_text", name), plain)
                .map_err(|e| NotificationError::TemplateError(format!("Failed to register {}_text: {}", name, e)))?;
            html.register_template_string(&format!("{}_html", name), markup)
                .map_err(|e| NotificationError::TemplateError(format!("Failed to register {}_html: {}", name, e)))?;
        }

        Ok(Self {
            html,
            text,
            branding,
        })
    }

    pub fn branding(&self) -> &Branding {
        &self.branding
    }

    /// Render the email for an event.
    ///
    /// Output depends only on the event and the branding. An error here means
    /// a template references data the engine does not provide.
    pub fn render(&self, event: &AccountEvent) -> NotificationResult<RenderedMessage> {
        let name = event.kind().template_name();
        let data = self.template_data(event);

        let subject = self.text.render(&format!("{}_subject", name), &data)?;
        let plain_text = self.text.render(&format!("{}_text", name), &data)?;
        let html = self.html.render(&format!("{}_html", name), &data)?;

        Ok(RenderedMessage::new(
            subject,
            plain_text,
            html,
            vec![event.email().to_string()],
        ))
    }

    fn template_data<'a>(&'a self, event: &'a AccountEvent) -> TemplateData<'a> {
        let mut data = TemplateData {
            product: &self.branding.product_name,
            site: self.branding.site(),
            support_url: self.branding.url("support"),
            ttl_minutes: self.branding.code_ttl_minutes,
            code: None,
            reset_url: None,
        };

        match event {
            AccountEvent::VerificationCodeIssued { code, .. } => data.code = Some(code.as_str()),
            AccountEvent::PasswordResetRequested { reset_token, .. } => {
                data.reset_url = Some(format!(
                    "{}?token={}",
                    self.branding.url("reset"),
                    urlencoding::encode(reset_token)
                ));
            }
            AccountEvent::AccountCreated { .. } | AccountEvent::AccountDeleted { .. } => {}
        }

        data
    }
}

fn sources_for(kind: EventKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        EventKind::VerificationCodeIssued => (
            VERIFICATION_CODE_SUBJECT_TEMPLATE,
            VERIFICATION_CODE_TEXT_TEMPLATE,
            VERIFICATION_CODE_HTML_TEMPLATE,
        ),
        EventKind::AccountCreated => (
            WELCOME_SUBJECT_TEMPLATE,
            WELCOME_TEXT_TEMPLATE,
            WELCOME_HTML_TEMPLATE,
        ),
        EventKind::PasswordResetRequested => (
            PASSWORD_RESET_SUBJECT_TEMPLATE,
            PASSWORD_RESET_TEXT_TEMPLATE,
            PASSWORD_RESET_HTML_TEMPLATE,
        ),
        EventKind::AccountDeleted => (
            ACCOUNT_DELETED_SUBJECT_TEMPLATE,
            ACCOUNT_DELETED_TEXT_TEMPLATE,
            ACCOUNT_DELETED_HTML_TEMPLATE,
        ),
    }
}
