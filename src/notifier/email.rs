use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use super::{Delivery, Notifier};
use crate::config::SmtpConfig;
use crate::models::{BrandOutcome, BrandResult, BrandScan, RunSummary};
use crate::utils::error::{AppError, Result};

/// Sends the run summary as one multipart (plain text + HTML) email.
pub struct EmailNotifier {
    config: SmtpConfig,
    suppress_seeding: bool,
}

/// How a brand is presented in the email.
enum Section<'a> {
    NewItems(&'a BrandScan),
    Seeded(usize),
    NoChanges,
    Skipped(&'a str),
}

impl EmailNotifier {
    pub fn new(config: SmtpConfig, suppress_seeding: bool) -> Self {
        Self {
            config,
            suppress_seeding,
        }
    }

    fn section<'a>(&self, result: &'a BrandResult) -> Section<'a> {
        match &result.outcome {
            BrandOutcome::Failed { error } => Section::Skipped(error),
            BrandOutcome::Scanned(scan) if scan.new_items.is_empty() => Section::NoChanges,
            BrandOutcome::Scanned(scan) if scan.seeding && self.suppress_seeding => {
                Section::Seeded(scan.items.len())
            }
            BrandOutcome::Scanned(scan) => Section::NewItems(scan),
        }
    }

    /// New items that will actually be listed, after seeding suppression.
    fn listed_count(&self, summary: &RunSummary) -> usize {
        summary
            .brands
            .iter()
            .map(|b| match self.section(b) {
                Section::NewItems(scan) => scan.new_items.len(),
                _ => 0,
            })
            .sum()
    }

    fn format_subject(&self, summary: &RunSummary) -> String {
        let listed = self.listed_count(summary);
        if listed == 0 {
            format!("Brand Radar ~ {} ~ no new items", summary.date)
        } else {
            format!("Brand Radar ~ {} ~ {} new", summary.date, listed)
        }
    }

    fn format_text_body(&self, summary: &RunSummary) -> String {
        let mut text = String::new();

        text.push_str(&format!("DAILY BRAND RADAR ~ {}\n\n", summary.date));

        for result in &summary.brands {
            match self.section(result) {
                Section::NewItems(scan) => {
                    text.push_str(&format!("{}\n", result.brand));
                    for item in &scan.new_items {
                        match &item.price {
                            Some(price) => text.push_str(&format!("  - {} · {}\n", item.name, price)),
                            None => text.push_str(&format!("  - {}\n", item.name)),
                        }
                        if !item.link.is_empty() {
                            text.push_str(&format!("    {}\n", item.link));
                        }
                    }
                    text.push('\n');
                }
                Section::Seeded(count) => {
                    text.push_str(&format!("{}: first scan, {} items recorded\n\n", result.brand, count));
                }
                Section::NoChanges => {
                    text.push_str(&format!("{}: no new items\n\n", result.brand));
                }
                Section::Skipped(error) => {
                    text.push_str(&format!("{}: skipped ({})\n\n", result.brand, error));
                }
            }
        }

        match &summary.report_path {
            Some(path) => text.push_str(&format!("Full report: {}\n", path.display())),
            None => text.push_str("Full markdown report is stored under reports/.\n"),
        }

        text
    }

    fn format_html_body(&self, summary: &RunSummary) -> String {
        let mut html = String::new();

        html.push_str(&format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        h1 {{ font-size: 20px; }}
        h2 {{ font-size: 16px; margin-top: 20px; }}
        .muted {{ color: #6c757d; }}
        .skipped {{ color: #b45309; }}
        .price {{ color: #2e7d32; }}
    </style>
</head>
<body>
    <h1>Brand Radar ~ {}</h1>
"#,
            summary.date
        ));

        for result in &summary.brands {
            let brand = escape_html(&result.brand);
            match self.section(result) {
                Section::NewItems(scan) => {
                    html.push_str(&format!("    <h2>{}</h2>\n    <ul>\n", brand));
                    for item in &scan.new_items {
                        let name = escape_html(&item.name);
                        let label = if item.link.is_empty() {
                            name
                        } else {
                            format!(r#"<a href="{}">{}</a>"#, escape_html(&item.link), name)
                        };
                        match &item.price {
                            Some(price) => html.push_str(&format!(
                                "        <li>{} <span class=\"price\">{}</span></li>\n",
                                label,
                                escape_html(price)
                            )),
                            None => html.push_str(&format!("        <li>{}</li>\n", label)),
                        }
                    }
                    html.push_str("    </ul>\n");
                }
                Section::Seeded(count) => html.push_str(&format!(
                    "    <h2>{}</h2>\n    <p class=\"muted\">First scan, {} items recorded.</p>\n",
                    brand, count
                )),
                Section::NoChanges => html.push_str(&format!(
                    "    <h2>{}</h2>\n    <p class=\"muted\">No new items.</p>\n",
                    brand
                )),
                Section::Skipped(error) => html.push_str(&format!(
                    "    <h2>{}</h2>\n    <p class=\"skipped\">Skipped: {}</p>\n",
                    brand,
                    escape_html(error)
                )),
            }
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn build_message(&self, summary: &RunSummary, from: &str, to: &str) -> Result<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, from)
            .parse()
            .map_err(|e| AppError::Notify(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Notify(format!("invalid recipient address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.format_subject(summary))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(self.format_text_body(summary)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(self.format_html_body(summary)),
                    ),
            )
            .map_err(|e| AppError::Notify(format!("cannot build message: {}", e)))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, summary: &RunSummary) -> Result<Delivery> {
        let Some((username, password, to)) = self.config.credentials() else {
            warn!("Email credentials not set, skipping email send");
            return Ok(Delivery::Skipped("email credentials not set".into()));
        };

        let email = self.build_message(summary, username, to)?;

        let credentials = Credentials::new(username.to_string(), password.to_string());
        let mailer = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| AppError::Notify(format!("SMTP setup failed: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.host)
        }
        .port(self.config.port)
        .credentials(credentials)
        .build();

        mailer
            .send(email)
            .await
            .map_err(|e| AppError::Notify(format!("SMTP send failed: {}", e)))?;

        info!("Sent summary email to {}", to);
        Ok(Delivery::Sent)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
