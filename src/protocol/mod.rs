//! Newline-delimited JSON requests from the UI shell.
//!
//! Request: `{"id": .., "cmd": "..", "payload": {..}}`.
//! Response: `{"id", "status": "ok", "payload"}` or
//! `{"id", "status": "error", "message"}`.

use std::io::{self, ErrorKind};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, warn};

use crate::model::entry::Language;
use crate::services::format;
use crate::services::qa;
use crate::services::resolver::TextResolver;
use crate::services::template::Variables;

mod command;
use command::Command;

/// Consecutive stream errors after which [`serve`] gives up.
pub const MAX_READ_FAILURES: u32 = 5;

fn get_cmd(req: &Value) -> &str {
    req.get("cmd").and_then(|v| v.as_str()).unwrap_or("")
}

fn get_id(req: &Value) -> Value {
    req.get("id").cloned().unwrap_or(Value::Null)
}

fn get_payload(req: &Value) -> Value {
    match req.get("payload") {
        Some(Value::Null) | None => json!({}),
        Some(v) => v.clone(),
    }
}

fn ok(id: Value, payload: Value) -> String {
    json!({
        "id": id,
        "status": "ok",
        "payload": payload
    })
    .to_string()
}

fn err(id: Value, message: impl Into<String>) -> String {
    json!({
        "id": id,
        "status": "error",
        "message": message.into()
    })
    .to_string()
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|e| format!("invalid payload: {e}"))
}

fn parse_language(raw: Option<&str>) -> Result<Language, String> {
    match raw {
        None => Ok(Language::default()),
        Some(code) => code
            .parse()
            .map_err(|_| format!("payload.language must be nl or en, got {code}")),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| format!("payload.date is not a date: {raw}"))
}

#[derive(Deserialize)]
struct ResolvePayload {
    key: String,
    #[serde(default)]
    variables: Variables,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
struct ResolveManyPayload {
    keys: Vec<String>,
    #[serde(default)]
    variables: Variables,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
struct CurrencyPayload {
    amount: f64,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Deserialize)]
struct DatePayload {
    date: String,
    #[serde(default)]
    style: Option<String>,
}

/// Dispatches protocol requests against one resolver.
pub struct Session {
    resolver: TextResolver,
}

impl Session {
    pub fn new(resolver: TextResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &TextResolver {
        &self.resolver
    }

    pub async fn handle(&self, input: &str) -> String {
        let req: Value = match serde_json::from_str(input) {
            Ok(v) => v,
            Err(_) => {
                return json!({
                    "status": "error",
                    "message": "invalid json"
                })
                .to_string();
            }
        };

        let id = get_id(&req);
        let payload = get_payload(&req);

        match self.dispatch(Command::from(get_cmd(&req)), payload).await {
            Ok(result) => ok(id, result),
            Err(message) => err(id, message),
        }
    }

    async fn dispatch(&self, cmd: Command, payload: Value) -> Result<Value, String> {
        match cmd {
            Command::Ping => Ok(json!({ "message": "djobba-microcopy alive" })),

            Command::Resolve => {
                let p: ResolvePayload = parse_payload(payload)?;
                if p.key.trim().is_empty() {
                    return Err("payload.key is required".into());
                }
                let language = parse_language(p.language.as_deref())?;

                let resolution = self.resolver.resolve(&p.key, &p.variables, language).await;
                Ok(json!({
                    "found": resolution.is_found(),
                    "text": resolution.into_text(),
                }))
            }

            Command::ResolveMany => {
                let p: ResolveManyPayload = parse_payload(payload)?;
                let language = parse_language(p.language.as_deref())?;

                let resolved = self
                    .resolver
                    .resolve_many(&p.keys, &p.variables, language)
                    .await;
                let missing: Vec<&String> = resolved
                    .iter()
                    .filter(|(_, r)| !r.is_found())
                    .map(|(k, _)| k)
                    .collect();
                let texts: serde_json::Map<String, Value> = resolved
                    .iter()
                    .map(|(k, r)| (k.clone(), Value::String(r.text())))
                    .collect();

                Ok(json!({ "texts": texts, "missing": missing }))
            }

            Command::CacheReset => {
                self.resolver.cache().reset();
                Ok(json!({ "reset": true }))
            }

            Command::CacheInfo => serde_json::to_value(self.resolver.cache().stats())
                .map_err(|e| format!("failed to encode cache stats: {e}")),

            Command::Audit => {
                let entries = self
                    .resolver
                    .cache()
                    .store()
                    .fetch_all()
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(json!({ "issues": qa::run(&entries) }))
            }

            Command::FormatCurrency => {
                let p: CurrencyPayload = parse_payload(payload)?;
                let currency = p.currency.as_deref().unwrap_or(format::DEFAULT_CURRENCY);
                Ok(json!({ "text": format::format_currency(p.amount, currency) }))
            }

            Command::FormatDate => {
                let p: DatePayload = parse_payload(payload)?;
                let date = parse_date(&p.date)?;
                let text = match p.style.as_deref().unwrap_or("long") {
                    "long" => format::format_date(date),
                    "short" => format::format_date_short(date),
                    other => return Err(format!("payload.style must be long or short, got {other}")),
                };
                Ok(json!({ "text": text }))
            }

            Command::Unknown => Err("unknown command".into()),
        }
    }
}

/// Answers one request per input line until the input closes.
///
/// Lines that are not valid UTF-8 are skipped. Any other read error is
/// retried, and returned once it repeats [`MAX_READ_FAILURES`] times in a row.
pub async fn serve<R, W>(session: Arc<Session>, reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut read_failures = 0;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => {
                read_failures = 0;
                line
            }
            Ok(None) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("Skipping unreadable request line: {e}");
                continue;
            }
            Err(e) => {
                read_failures += 1;
                if read_failures >= MAX_READ_FAILURES {
                    return Err(e);
                }
                warn!(read_failures, "Failed to read request line: {e}");
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let s = Arc::clone(&session);
        let response = match tokio::spawn(async move { s.handle(&line).await }).await {
            Ok(resp) => resp,
            Err(e) => {
                error!("Request handler failed: {e}");
                json!({
                    "status": "error",
                    "message": "internal core error"
                })
                .to_string()
            }
        };

        writer.write_all(format!("{response}\n").as_bytes()).await?;
        writer.flush().await?;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::entry::TextEntry;
    use crate::services::cache::MicrocopyCache;
    use crate::services::text_store::{MemoryTextStore, TextStore};

    fn session() -> Session {
        let store = Arc::new(MemoryTextStore::new(vec![
            TextEntry::new("wallet.amount", "Bedrag: {{amount}}")
                .with_en("Amount: {{amount}}")
                .with_variables(["amount"]),
            TextEntry::new("nav.home", "Home").with_variables(["unused"]),
        ]));
        Session::new(TextResolver::new(MicrocopyCache::new(store as Arc<dyn TextStore>)))
    }

    async fn call(session: &Session, line: &str) -> Value {
        serde_json::from_str(&session.handle(line).await).expect("response is json")
    }

    #[tokio::test]
    async fn ping_echoes_id() {
        let v = call(&session(), r#"{"id":7,"cmd":"ping"}"#).await;
        assert_eq!(v["id"], 7);
        assert_eq!(v["status"], "ok");
    }

    #[tokio::test]
    async fn invalid_json_and_unknown_command() {
        let s = session();
        let v = call(&s, "{not json").await;
        assert_eq!(v["message"], "invalid json");

        let v = call(&s, r#"{"id":"a","cmd":"explode"}"#).await;
        assert_eq!(v["status"], "error");
        assert_eq!(v["message"], "unknown command");
    }

    #[tokio::test]
    async fn resolve_with_variables_and_language() {
        let v = call(
            &session(),
            r#"{"id":1,"cmd":"resolve","payload":{"key":"wallet.amount","variables":{"amount":50},"language":"en"}}"#,
        )
        .await;
        assert_eq!(v["payload"]["text"], "Amount: 50");
        assert_eq!(v["payload"]["found"], true);
    }

    #[tokio::test]
    async fn resolve_rejects_unknown_language() {
        let v = call(
            &session(),
            r#"{"id":1,"cmd":"resolve","payload":{"key":"nav.home","language":"fr"}}"#,
        )
        .await;
        assert_eq!(v["status"], "error");
    }

    #[tokio::test]
    async fn resolve_many_reports_missing_keys() {
        let v = call(
            &session(),
            r#"{"id":2,"cmd":"resolve_many","payload":{"keys":["nav.home","gone"]}}"#,
        )
        .await;
        assert_eq!(v["payload"]["texts"]["nav.home"], "Home");
        assert_eq!(v["payload"]["texts"]["gone"], "[gone]");
        assert_eq!(v["payload"]["missing"], json!(["gone"]));
    }

    #[tokio::test]
    async fn cache_info_and_reset() {
        let s = session();
        call(&s, r#"{"cmd":"resolve","payload":{"key":"nav.home"}}"#).await;

        let info = call(&s, r#"{"cmd":"cache.info"}"#).await;
        assert_eq!(info["payload"]["entries"], 2);
        assert_eq!(info["payload"]["fresh"], true);

        call(&s, r#"{"cmd":"cache.reset"}"#).await;
        let info = call(&s, r#"{"cmd":"cache.info"}"#).await;
        assert_eq!(info["payload"]["entries"], 0);
        assert_eq!(info["payload"]["fetched_at"], "1970-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn audit_reads_from_store() {
        let v = call(&session(), r#"{"cmd":"audit"}"#).await;
        let issues = v["payload"]["issues"].as_array().expect("issues array");
        assert!(issues
            .iter()
            .any(|i| i["key"] == "nav.home" && i["code"] == "UNUSED_VARIABLE"));
    }

    struct BrokenInput;

    impl tokio::io::AsyncRead for BrokenInput {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::new(ErrorKind::Other, "bad file descriptor")))
        }
    }

    #[tokio::test]
    async fn serve_answers_each_line_and_skips_blank_ones() {
        let input: &[u8] = b"{\"id\":1,\"cmd\":\"ping\"}\n\n{\"id\":2,\"cmd\":\"resolve\",\"payload\":{\"key\":\"nav.home\"}}\n";
        let mut output = Vec::new();

        serve(Arc::new(session()), input, &mut output)
            .await
            .expect("serve");

        let lines: Vec<Value> = String::from_utf8(output)
            .expect("utf-8 output")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["payload"]["text"], "Home");
    }

    #[tokio::test]
    async fn serve_skips_non_utf8_lines() {
        let input: &[u8] = b"\xff\xfe\n{\"id\":3,\"cmd\":\"ping\"}\n";
        let mut output = Vec::new();

        serve(Arc::new(session()), input, &mut output)
            .await
            .expect("serve");

        let text = String::from_utf8(output).expect("utf-8 output");
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"id\":3"));
    }

    #[tokio::test]
    async fn serve_gives_up_on_persistent_read_errors() {
        let mut output = Vec::new();
        let err = serve(
            Arc::new(session()),
            tokio::io::BufReader::new(BrokenInput),
            &mut output,
        )
        .await
        .expect_err("broken input ends the loop");

        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn formatters() {
        let s = session();
        let v = call(&s, r#"{"cmd":"format.currency","payload":{"amount":1234.5}}"#).await;
        assert_eq!(v["payload"]["text"], "€\u{a0}1.234,50");

        let v = call(
            &s,
            r#"{"cmd":"format.date","payload":{"date":"2026-10-19T08:30:00+02:00"}}"#,
        )
        .await;
        assert_eq!(v["payload"]["text"], "19 oktober 2026");

        let v = call(
            &s,
            r#"{"cmd":"format.date","payload":{"date":"2026-10-19","style":"short"}}"#,
        )
        .await;
        assert_eq!(v["payload"]["text"], "19-10-2026");
    }
}
