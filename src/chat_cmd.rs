//! Interactive chat loop.

use anyhow::Result;
use dialoguer::{Input, theme::ColorfulTheme};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

use sitechat::export::write_preview;
use sitechat::paths::preview_dir;
use sitechat::{
    Config, ExportRejected, GeminiClient, GenerationRequest, GenerationService, Locale, Outcome,
    QuotaGate, Session, SubmitRejected, View,
};

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Prompt(String),
    Attach(Vec<PathBuf>),
    Detach(String),
    Files,
    Preview,
    Export(Option<PathBuf>),
    Quota,
    Help,
    Quit,
}

impl ChatCommand {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Prompt(line.to_string());
        };
        let (name, args) = rest
            .split_once(char::is_whitespace)
            .map(|(name, args)| (name, args.trim()))
            .unwrap_or((rest, ""));
        match name {
            "attach" => Self::Attach(args.split_whitespace().map(PathBuf::from).collect()),
            "detach" | "remove" => Self::Detach(args.to_string()),
            "files" => Self::Files,
            "preview" => Self::Preview,
            "export" | "download" => Self::Export((!args.is_empty()).then(|| PathBuf::from(args))),
            "quota" => Self::Quota,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            // Not a known command; let the model see it
            _ => Self::Prompt(line.to_string()),
        }
    }
}

pub fn run(config: &Config, log_file: Option<&Path>) -> Result<()> {
    let mut session = Session::new(Locale::load(config.locale), config.contact_email.clone());
    let mut quota = QuotaGate::open_default(config.daily_limit);
    let client = GeminiClient::from_config(config);
    let theme = ColorfulTheme::default();

    if let Some(path) = log_file {
        debug!(path = %path.display(), "chat session started");
    }
    println!("{}", session.locale().t("app_intro"));
    println!("{}", session.locale().t("help"));

    loop {
        println!();
        println!("{}", quota_banner(&mut quota, session.locale()));
        let line: String = match Input::with_theme(&theme)
            .with_prompt(">")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(err) => {
                debug!(error = %err, "input closed");
                break;
            }
        };

        match ChatCommand::parse(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Help => println!("{}", session.locale().t("help")),
            ChatCommand::Attach(paths) => {
                let count = session.stage_files(&paths);
                println!(
                    "{}",
                    session
                        .locale()
                        .t_with("attachments_staged", &[("count", count.to_string().as_str())])
                );
            }
            ChatCommand::Detach(name) => {
                let key = if session.remove_attachment(&name) {
                    "attachment_removed"
                } else {
                    "attachment_not_found"
                };
                println!("{}", session.locale().t_with(key, &[("name", name.as_str())]));
            }
            ChatCommand::Files => {
                if session.staged().is_empty() {
                    println!("{}", session.locale().t("no_attachments"));
                }
                for attachment in session.staged() {
                    println!("  {} ({})", attachment.display_name, attachment.mime_type);
                }
            }
            ChatCommand::Preview => {
                session.set_view(View::Preview);
                show_preview(&session);
            }
            ChatCommand::Export(dest) => export(&mut session, dest),
            ChatCommand::Quota => println!("{}", quota_status(&mut quota, session.locale())),
            ChatCommand::Prompt(text) => send(&mut session, &client, &mut quota, &text),
        }
    }
    Ok(())
}

fn send(session: &mut Session, service: &dyn GenerationService, quota: &mut QuotaGate, text: &str) {
    let exchange = match session.begin(text, quota) {
        Ok(exchange) => exchange,
        Err(rejected) => {
            let message = match rejected {
                SubmitRejected::Empty => session.locale().t("empty_prompt"),
                SubmitRejected::Busy => session.locale().t("busy"),
                SubmitRejected::QuotaExhausted => {
                    limit_reached(session.locale(), quota.daily_limit())
                }
            };
            println!("{message}");
            return;
        }
    };

    println!("{}", session.working_message());
    let reply = generate_with_indicator(service, exchange.request());
    let outcome = session.complete(exchange, reply, quota);

    if let Some(entry) = session.transcript().last() {
        println!();
        println!("{}", entry.text);
    }
    if outcome == Outcome::SiteInstalled {
        show_preview(session);
    }
}

/// Run the model call on a worker thread, printing progress dots until it returns
fn generate_with_indicator(
    service: &dyn GenerationService,
    request: &GenerationRequest,
) -> Result<String> {
    std::thread::scope(|scope| {
        let handle = scope.spawn(|| service.generate(request));
        let mut stderr = std::io::stderr();
        while !handle.is_finished() {
            let _ = write!(stderr, ".");
            let _ = stderr.flush();
            std::thread::sleep(Duration::from_millis(500));
        }
        let _ = writeln!(stderr);
        handle
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("generation worker panicked")))
    })
}

fn show_preview(session: &Session) {
    let written = preview_dir()
        .and_then(|dir| write_preview(session.bundle(), session.locale().lang(), &dir));
    match written {
        Ok(path) => {
            let path = path.display().to_string();
            println!(
                "{}",
                session
                    .locale()
                    .t_with("preview_written", &[("path", path.as_str())])
            );
        }
        Err(err) => error!(error = %format!("{err:#}"), "failed to write preview"),
    }
}

fn export(session: &mut Session, dest: Option<PathBuf>) {
    let dest = dest.unwrap_or_else(|| PathBuf::from("."));
    match session.export(&dest) {
        Ok(path) => {
            let path = path.display().to_string();
            println!(
                "{}",
                session
                    .locale()
                    .t_with("export_done", &[("path", path.as_str())])
            );
        }
        Err(ExportRejected::Failed(_)) => {
            if let Some(entry) = session.transcript().last() {
                println!("{}", entry.text);
            }
        }
        Err(rejected) => {
            info!(reason = %rejected, "export unavailable");
            println!("{}", session.locale().t("export_unavailable"));
        }
    }
}

fn limit_reached(locale: &Locale, limit: u32) -> String {
    if limit == 1 {
        locale.t("limit_reached_one")
    } else {
        locale.t_with("limit_reached_many", &[("limit", limit.to_string().as_str())])
    }
}

fn quota_banner(quota: &mut QuotaGate, locale: &Locale) -> String {
    if quota.is_exhausted() {
        return limit_reached(locale, quota.daily_limit());
    }
    let remaining = quota.remaining();
    let key = if remaining == 1 {
        "remaining_one"
    } else {
        "remaining_many"
    };
    locale.t_with(key, &[("count", remaining.to_string().as_str())])
}

pub fn quota_status(quota: &mut QuotaGate, locale: &Locale) -> String {
    let count = quota.current_count().to_string();
    let limit = quota.daily_limit().to_string();
    let date = quota.date().to_string();
    locale.t_with(
        "quota_status",
        &[
            ("count", count.as_str()),
            ("limit", limit.as_str()),
            ("date", date.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitechat::Lang;
    use sitechat::quota::{MemoryQuotaStore, SystemClock};

    fn gate(limit: u32) -> QuotaGate {
        QuotaGate::open(
            Box::new(MemoryQuotaStore::default()),
            Box::new(SystemClock),
            limit,
        )
    }

    #[test]
    fn parse_plain_prompt() {
        assert_eq!(
            ChatCommand::parse("a site for my bakery"),
            ChatCommand::Prompt("a site for my bakery".to_string())
        );
    }

    #[test]
    fn parse_attach_paths() {
        assert_eq!(
            ChatCommand::parse("/attach a.png  img/b.jpg"),
            ChatCommand::Attach(vec![PathBuf::from("a.png"), PathBuf::from("img/b.jpg")])
        );
    }

    #[test]
    fn parse_export_with_and_without_destination() {
        assert_eq!(ChatCommand::parse("/export"), ChatCommand::Export(None));
        assert_eq!(
            ChatCommand::parse("/export out/site.zip"),
            ChatCommand::Export(Some(PathBuf::from("out/site.zip")))
        );
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(
            ChatCommand::parse("/detach logo.png"),
            ChatCommand::Detach("logo.png".to_string())
        );
        assert_eq!(ChatCommand::parse("/files"), ChatCommand::Files);
        assert_eq!(ChatCommand::parse("/preview"), ChatCommand::Preview);
        assert_eq!(ChatCommand::parse("/quota"), ChatCommand::Quota);
        assert_eq!(ChatCommand::parse(" /help "), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("/quit"), ChatCommand::Quit);
    }

    #[test]
    fn unknown_slash_is_a_prompt() {
        assert_eq!(
            ChatCommand::parse("/about page please"),
            ChatCommand::Prompt("/about page please".to_string())
        );
    }

    #[test]
    fn banner_shows_remaining_then_limit() {
        let locale = Locale::load(Lang::En);
        let mut quota = gate(1);
        assert_eq!(quota_banner(&mut quota, &locale), "1 creation remaining");
        quota.record_generation();
        assert_eq!(
            quota_banner(&mut quota, &locale),
            "You've reached the daily creation limit of one site."
        );
    }

    #[test]
    fn banner_plural_forms() {
        let locale = Locale::load(Lang::En);
        let mut quota = gate(3);
        assert_eq!(quota_banner(&mut quota, &locale), "3 creations remaining");
        for _ in 0..3 {
            quota.record_generation();
        }
        assert_eq!(
            quota_banner(&mut quota, &locale),
            "You've reached the daily creation limit of 3 sites."
        );
    }
}
