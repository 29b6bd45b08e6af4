//! End-to-end session scenarios with a scripted generation service.

use anyhow::Result;
use std::io::{Cursor, Read};
use std::rc::Rc;
use std::sync::Mutex;
use tempfile::TempDir;

use sitechat::quota::{FileQuotaStore, MemoryQuotaStore, SystemClock, date_key};
use sitechat::{
    GenerationRequest, GenerationService, Lang, Locale, Outcome, QuotaGate, QuotaRecord, Session,
    Speaker, SubmitRejected, View,
};

struct Scripted {
    replies: Mutex<Vec<String>>,
    seen: Mutex<Vec<GenerationRequest>>,
}

impl Scripted {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl GenerationService for Scripted {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(self.replies.lock().unwrap().remove(0))
    }
}

const SITE_REPLY: &str = r#"Your bakery site is ready!

```json
{
  "html": "<p>hi</p>",
  "css": "p{color:red}",
  "js": "console.log(1)"
}
```"#;

fn today() -> String {
    date_key(time::OffsetDateTime::now_utc().date())
}

#[test]
fn clarify_then_generate_then_export() {
    let tmp = TempDir::new().unwrap();
    let store = Rc::new(MemoryQuotaStore::default());
    let mut quota = QuotaGate::open(Box::new(store.clone()), Box::new(SystemClock), 1);
    let mut session = Session::new(Locale::load(Lang::En), "help@example.com");
    let placeholder = session.bundle().clone();
    let service = Scripted::new(&["What should the bakery be called?", SITE_REPLY]);

    assert_eq!(quota.current_count(), 0);
    assert!(!quota.is_exhausted());

    let outcome = session
        .submit("I need a site for my bakery", &service, &mut quota)
        .unwrap();
    assert_eq!(outcome, Outcome::Conversation);
    assert_eq!(session.bundle(), &placeholder);
    assert_eq!(quota.current_count(), 0);

    let outcome = session.submit("Call it Crumbs", &service, &mut quota).unwrap();
    assert_eq!(outcome, Outcome::SiteInstalled);
    assert_eq!(quota.current_count(), 1);
    assert!(quota.is_exhausted());
    assert_eq!(session.view(), View::Preview);
    assert_eq!(session.bundle().html, "<p>hi</p>");
    assert_eq!(
        store.snapshot(),
        Some(QuotaRecord {
            date: today(),
            count: 1
        })
    );

    let last = session.transcript().last().unwrap();
    assert_eq!(last.speaker, Speaker::Assistant);
    assert!(last.text.starts_with("Your bakery site is ready!"));
    assert!(last.text.contains("generated by AI"));
    assert!(last.text.contains("help@example.com"));
    assert!(!last.text.contains("```json"));

    // second request carried the first exchange as history
    let seen = service.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].history.len(), 2);
    assert_eq!(seen[1].history[1].text, "What should the bakery be called?");
    drop(seen);

    assert_eq!(
        session.begin("one more", &mut quota).unwrap_err(),
        SubmitRejected::QuotaExhausted
    );

    let archive = session.export(tmp.path()).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(std::fs::read(archive).unwrap())).unwrap();
    let mut document = String::new();
    zip.by_name("index.html")
        .unwrap()
        .read_to_string(&mut document)
        .unwrap();
    assert!(document.contains("<style>p{color:red}</style>"));
    assert!(document.contains("<script>console.log(1)</script>"));
    assert!(document.contains("<p>hi</p>"));
}

#[test]
fn malformed_reply_matches_no_block_except_for_message() {
    let store = Rc::new(MemoryQuotaStore::default());
    let mut quota = QuotaGate::open(Box::new(store), Box::new(SystemClock), 1);
    let mut session = Session::new(Locale::load(Lang::Ar), "help@example.com");
    let placeholder = session.bundle().clone();
    let service = Scripted::new(&[
        "Here you go\n```json\n{\"html\": \"<p>x</p>\", \"css\": \"\", \"js\": 42}\n```",
    ]);

    let outcome = session.submit("build it", &service, &mut quota).unwrap();

    assert_eq!(outcome, Outcome::Malformed);
    assert_eq!(session.bundle(), &placeholder);
    assert_eq!(quota.current_count(), 0);
    assert_eq!(session.view(), View::Chat);
    assert_eq!(
        session.transcript().last().unwrap().text,
        "قدم الذكاء الاصطناعي بنية كود غير صالحة. سأطلب منه المحاولة مرة أخرى."
    );
}

#[test]
fn yesterdays_quota_does_not_carry_over() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("rate-limit.json");
    std::fs::write(&path, r#"{"date":"2000-01-01","count":1}"#).unwrap();

    let mut quota = QuotaGate::open(
        Box::new(FileQuotaStore::new(&path)),
        Box::new(SystemClock),
        1,
    );

    assert_eq!(quota.current_count(), 0);
    assert!(!quota.is_exhausted());
    let stored: QuotaRecord =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored, QuotaRecord::fresh(today()));
}
