//! End-to-end flows through the dispatcher.
//!
//! The provider is the mock gateway and the chat front end is the recording
//! transport, so every upstream call and every message can be asserted on.

use std::sync::Arc;

use deckhand_api::{Method, MockGateway, MockReply, ProviderClient};
use deckhand_chat::{
    ChatId, Dispatcher, IncomingEvent, Markup, MessageId, ParentMessage, RecordingTransport,
    SessionKey, SessionSettings, SessionStore, UserId,
};
use serde_json::json;

const CHAT: ChatId = ChatId(100);
const USER: UserId = UserId(7);

struct Harness {
    gateway: MockGateway,
    transport: RecordingTransport,
    dispatcher: Dispatcher,
}

impl Harness {
    fn new(gateway: MockGateway) -> Self {
        Self::with_settings(gateway, SessionSettings::default())
    }

    fn with_settings(gateway: MockGateway, settings: SessionSettings) -> Self {
        let transport = RecordingTransport::new();
        let dispatcher = Dispatcher::new(
            ProviderClient::new(Arc::new(gateway.clone())),
            Arc::new(transport.clone()),
            Arc::new(SessionStore::new(settings)),
        );
        Self {
            gateway,
            transport,
            dispatcher,
        }
    }

    async fn command(&self, name: &str, args: &[&str]) {
        self.dispatcher
            .handle(IncomingEvent::command(CHAT, USER, name, args))
            .await
            .unwrap();
    }

    async fn select(&self, data: &str, message: MessageId) {
        self.dispatcher
            .handle(IncomingEvent::selection(CHAT, USER, data, message))
            .await
            .unwrap();
    }

    async fn reply_to(&self, parent: MessageId, text: &str) {
        let parent = self.parent(parent);
        self.dispatcher
            .handle(IncomingEvent::reply(CHAT, USER, text, parent).with_message(MessageId(1)))
            .await
            .unwrap();
    }

    /// What the platform reports as the parent of a reply: the sent text.
    fn parent(&self, id: MessageId) -> ParentMessage {
        let text = self
            .transport
            .sent()
            .into_iter()
            .find(|(sent, _)| *sent == id)
            .map(|(_, message)| message.text)
            .unwrap_or_default();
        ParentMessage { id, text }
    }

    /// Log in with `rnd_test` and forget the calls and messages it caused.
    async fn login(&self) {
        self.command("login", &["rnd_test"]).await;
        assert!(self.dispatcher.sessions().is_logged_in(key()));
        self.gateway.clear_calls();
        self.transport.clear();
    }

    fn last_text(&self) -> String {
        self.transport.last_text().unwrap_or_default()
    }

    /// Id of the last message sent.
    fn last_sent_id(&self) -> MessageId {
        self.transport.sent().last().map(|(id, _)| *id).unwrap()
    }
}

fn key() -> SessionKey {
    SessionKey::new(CHAT, USER)
}

fn provider() -> MockGateway {
    MockGateway::new()
        .route(
            Method::Get,
            "users",
            MockReply::json(json!({"name": "Ada", "email": "ada@example.com"})),
        )
        .route(
            Method::Get,
            "services",
            MockReply::json(json!([
                {"cursor": "a", "service": {"id": "srv-abc123", "name": "api"}},
                {"cursor": "b", "service": {"id": "srv-def456", "name": "worker"}}
            ])),
        )
}

#[tokio::test]
async fn test_logged_out_makes_no_calls() {
    let h = Harness::new(provider());

    for (name, args) in [
        ("services", vec![]),
        ("info", vec![]),
        ("info", vec!["srv-abc123"]),
        ("rename", vec![]),
        ("account", vec![]),
        ("scale", vec!["srv-abc123", "2"]),
        ("usage", vec![]),
        ("crons", vec![]),
        ("runcron", vec!["crn-a1"]),
        ("databases", vec![]),
    ] {
        h.command(name, &args).await;
        assert!(h.last_text().contains("not logged in"), "/{name}");
    }
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_login_stores_token_only_on_success() {
    let gateway = provider().accept_only("rnd_good");
    let h = Harness::new(gateway);

    h.dispatcher
        .handle(
            IncomingEvent::command(CHAT, USER, "login", &["rnd_bad"]).with_message(MessageId(5)),
        )
        .await
        .unwrap();
    assert!(!h.dispatcher.sessions().is_logged_in(key()));
    assert!(h.last_text().contains("Login failed"));
    assert_eq!(h.transport.deleted(), vec![MessageId(5)]);
    assert!(h.transport.pinned().is_empty());

    h.transport.clear();
    h.dispatcher
        .handle(
            IncomingEvent::command(CHAT, USER, "login", &["rnd_good"]).with_message(MessageId(6)),
        )
        .await
        .unwrap();
    assert!(h.dispatcher.sessions().is_logged_in(key()));
    assert!(h.last_text().contains("ada@example.com"));
    assert_eq!(h.transport.deleted(), vec![MessageId(6)]);
    assert_eq!(h.transport.pinned(), vec![h.last_sent_id()]);
    assert_eq!(h.gateway.calls_to(Method::Get, "users").len(), 2);
}

#[tokio::test]
async fn test_login_by_reply() {
    let h = Harness::new(provider());

    h.command("login", &[]).await;
    let prompt = h.last_sent_id();
    let (_, message) = h.transport.sent().pop().unwrap();
    assert!(message.demands_reply());
    assert!(message.text.contains("API"));
    assert_eq!(h.gateway.call_count(), 0);

    h.reply_to(prompt, "  rnd_test  ").await;
    assert!(h.dispatcher.sessions().is_logged_in(key()));
    let calls = h.gateway.calls_to(Method::Get, "users");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].token, "rnd_test");
    assert!(h.transport.deleted().contains(&MessageId(1)));
}

#[tokio::test]
async fn test_logout_behaves_logged_out() {
    let h = Harness::new(provider());
    h.login().await;

    h.command("logout", &[]).await;
    assert!(h.last_text().contains("Logged out"));

    h.command("services", &[]).await;
    assert!(h.last_text().contains("not logged in"));
    assert_eq!(h.gateway.call_count(), 0);
}

/// The documented scenario: pick a service, answer the prompt, service renamed.
#[tokio::test]
async fn test_rename_end_to_end() {
    let gateway = provider().route(
        Method::Patch,
        "services/srv-abc123",
        MockReply::json(json!({"id": "srv-abc123", "name": "my-new-name"})),
    );
    let h = Harness::new(gateway);
    h.login().await;

    h.command("rename", &[]).await;
    let picker = h.last_sent_id();
    let (_, message) = h.transport.sent().pop().unwrap();
    let Markup::Buttons(rows) = message.markup else {
        panic!("picker has no buttons");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0].label, "api");
    assert_eq!(rows[0][0].data, "rename:srv-abc123");

    h.select("rename:srv-abc123", picker).await;
    let prompt = h.last_sent_id();
    assert!(h.last_text().contains("srv-abc123"));
    assert!(!h.gateway.was_called(Method::Patch, "services/srv-abc123"));
    assert_eq!(h.dispatcher.sessions().pending_count(key()), 1);

    h.reply_to(prompt, "my-new-name").await;
    let calls = h.gateway.calls_to(Method::Patch, "services/srv-abc123");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body, Some(json!({"name": "my-new-name"})));
    assert!(h.last_text().contains("my-new-name"));
    assert_eq!(h.dispatcher.sessions().pending_count(key()), 0);
}

#[tokio::test]
async fn test_pending_consumed_at_most_once() {
    let gateway = provider().route(
        Method::Patch,
        "services/srv-abc123",
        MockReply::json(json!({"id": "srv-abc123"})),
    );
    let h = Harness::new(gateway);
    h.login().await;

    h.command("rename", &["srv-abc123"]).await;
    let prompt = h.last_sent_id();

    h.reply_to(prompt, "first").await;
    h.reply_to(prompt, "second").await;
    assert_eq!(h.gateway.calls_to(Method::Patch, "services/srv-abc123").len(), 1);
}

#[tokio::test]
async fn test_new_command_invalidates_prompt() {
    let h = Harness::new(provider());
    h.login().await;

    h.command("setenv", &["srv-abc123"]).await;
    let prompt = h.last_sent_id();
    h.command("help", &[]).await;

    h.reply_to(prompt, "FOO=bar").await;
    assert!(!h
        .gateway
        .was_called(Method::Put, "services/srv-abc123/env-vars/FOO"));
}

#[tokio::test]
async fn test_expired_prompt() {
    let settings = SessionSettings {
        pending_ttl_secs: 0,
        token_ttl_secs: None,
    };
    let h = Harness::with_settings(provider(), settings);
    h.login().await;

    h.command("setenv", &["srv-abc123"]).await;
    let prompt = h.last_sent_id();
    h.reply_to(prompt, "FOO=bar").await;

    assert!(h.last_text().contains("expired"));
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_reply_to_unrelated_message_is_ignored() {
    let h = Harness::new(provider());
    h.login().await;

    h.command("help", &[]).await;
    let help = h.last_sent_id();
    h.transport.clear();

    h.reply_to(help, "FOO=bar").await;
    assert!(h.transport.calls().is_empty());
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_setenv_parsing() {
    let gateway = provider().route(
        Method::Put,
        "services/srv-abc123/env-vars/FOO",
        MockReply::json(json!({"key": "FOO", "value": "bar"})),
    );
    let h = Harness::new(gateway);
    h.login().await;

    h.command("setenv", &["srv-abc123"]).await;
    h.reply_to(h.last_sent_id(), "FOO").await;
    assert!(h.last_text().contains("Invalid input"));
    assert_eq!(h.gateway.call_count(), 0);

    h.command("setenv", &["srv-abc123"]).await;
    h.reply_to(h.last_sent_id(), "FOO=bar").await;
    let calls = h.gateway.calls_to(Method::Put, "services/srv-abc123/env-vars/FOO");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body, Some(json!({"value": "bar"})));
}

#[tokio::test]
async fn test_delenv_path_like_key_never_reaches_provider() {
    let gateway = provider()
        .route(Method::Delete, "services/srv-abc123", MockReply::empty())
        .route(Method::Put, "services/srv-abc123/env-vars/FOO", MockReply::empty());
    let h = Harness::new(gateway);
    h.login().await;

    h.command("delenv", &["srv-abc123"]).await;
    h.reply_to(h.last_sent_id(), "..").await;
    assert!(h.last_text().contains("Invalid input"));

    h.command("setenv", &["srv-abc123"]).await;
    h.reply_to(h.last_sent_id(), "FOO#x=1").await;
    assert!(h.last_text().contains("Invalid input"));

    assert!(!h.gateway.was_called(Method::Delete, "services/srv-abc123"));
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_replaceenv_keeps_order() {
    let gateway = provider().route(
        Method::Put,
        "services/srv-abc123/env-vars",
        MockReply::json(json!([])),
    );
    let h = Harness::new(gateway);
    h.login().await;

    h.command("replaceenv", &["srv-abc123"]).await;
    h.reply_to(h.last_sent_id(), "nothing valid").await;
    assert!(h.last_text().contains("Invalid input"));
    assert_eq!(h.gateway.call_count(), 0);

    h.command("replaceenv", &["srv-abc123"]).await;
    h.reply_to(h.last_sent_id(), "A=1\nB=2").await;
    let calls = h.gateway.calls_to(Method::Put, "services/srv-abc123/env-vars");
    assert_eq!(
        calls[0].body,
        Some(json!([{"key": "A", "value": "1"}, {"key": "B", "value": "2"}]))
    );
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let gateway = provider().route(Method::Delete, "services/srv-abc123", MockReply::empty());
    let h = Harness::new(gateway);
    h.login().await;

    for answer in ["yes", "delete it", ""] {
        h.command("delete", &["srv-abc123"]).await;
        h.reply_to(h.last_sent_id(), answer).await;
        assert!(h.last_text().contains("cancelled"), "{answer:?}");
    }
    assert!(!h.gateway.was_called(Method::Delete, "services/srv-abc123"));

    for answer in ["CONFIRM", "confirm", "  Confirm  "] {
        h.command("delete", &["srv-abc123"]).await;
        h.reply_to(h.last_sent_id(), answer).await;
        assert!(h.last_text().contains("deleted"), "{answer:?}");
    }
    assert_eq!(h.gateway.calls_to(Method::Delete, "services/srv-abc123").len(), 3);
}

#[tokio::test]
async fn test_selection_replaces_picker() {
    let gateway = provider().route(
        Method::Get,
        "services/srv-abc123",
        MockReply::json(json!({"id": "srv-abc123", "name": "api"})),
    );
    let h = Harness::new(gateway);
    h.login().await;

    h.command("info", &[]).await;
    let picker = h.last_sent_id();
    h.select("info:srv-abc123", picker).await;

    let edits = h.transport.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].0, picker);
    assert!(edits[0].1.text.contains("<b>api</b>"));
    assert!(matches!(edits[0].1.markup, Markup::Buttons(_)));
}

#[tokio::test]
async fn test_cron_jobs_listing_and_run() {
    let gateway = provider()
        .route(
            Method::Get,
            "crons",
            MockReply::json(json!([
                {"cronJob": {"id": "crn-a1", "name": "nightly", "schedule": "0 3 * * *"}}
            ])),
        )
        .route(Method::Post, "crons/crn-a1/runs", MockReply::empty());
    let h = Harness::new(gateway);
    h.login().await;

    h.command("cron_jobs", &[]).await;
    let (listing, message) = h.transport.sent().last().cloned().unwrap();
    assert!(message.text.contains("<b>nightly</b>"));
    let Markup::Buttons(rows) = &message.markup else {
        panic!("expected run buttons");
    };
    assert_eq!(rows[0][0].data, "runcron:crn-a1");

    h.select("runcron:crn-a1", listing).await;
    let edits = h.transport.edits();
    assert_eq!(edits[0].0, listing);
    assert!(edits[0].1.text.contains("crn-a1</code> triggered"));

    h.command("runcron", &["crn-a1"]).await;
    assert!(h.last_text().contains("triggered"));
    h.command("runcron", &["srv-abc123"]).await;
    assert!(h.last_text().contains("Usage"));
    assert_eq!(h.gateway.calls_to(Method::Post, "crons/crn-a1/runs").len(), 2);
}

#[tokio::test]
async fn test_usage_and_databases() {
    let gateway = provider()
        .route(
            Method::Get,
            "usage",
            MockReply::json(json!([{"type": "bandwidth", "usage": 12, "limit": 100, "unit": "GB"}])),
        )
        .route(Method::Get, "databases", MockReply::json(json!([])));
    let h = Harness::new(gateway);
    h.login().await;

    h.command("usage", &[]).await;
    assert!(h.last_text().contains("<b>bandwidth</b>: 12 GB / 100 GB"));

    h.command("databases", &[]).await;
    assert!(h.last_text().contains("No databases found"));
}

#[tokio::test]
async fn test_cancel_reports_nothing_running() {
    let gateway = provider().route(
        Method::Get,
        "services/srv-abc123/deploys",
        MockReply::json(json!([{"deploy": {"id": "dep-1", "status": "live"}}])),
    );
    let h = Harness::new(gateway);
    h.login().await;

    h.command("cancel", &["srv-abc123"]).await;
    assert!(h.last_text().contains("No deploy"));
    assert_eq!(h.gateway.call_count(), 1);
}

#[tokio::test]
async fn test_upstream_rejection_is_surfaced() {
    let gateway = provider().route(
        Method::Post,
        "services/srv-abc123/suspend",
        MockReply::status(403, "{\"message\":\"forbidden\"}"),
    );
    let h = Harness::new(gateway);
    h.login().await;

    h.command("suspend", &["srv-abc123"]).await;
    assert!(h.last_text().contains("403"));
    assert!(h.last_text().contains("forbidden"));
    assert_eq!(h.gateway.call_count(), 1);
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let gateway = provider().route(
        Method::Post,
        "services/srv-abc123/deploys",
        MockReply::RateLimited(Some(12)),
    );
    let h = Harness::new(gateway);
    h.login().await;

    h.command("deploy", &["srv-abc123"]).await;
    assert!(h.last_text().contains("12"));
    assert_eq!(h.gateway.call_count(), 1);
}

#[tokio::test]
async fn test_unauthorized_user() {
    let transport = RecordingTransport::new();
    let gateway = provider();
    let dispatcher = Dispatcher::new(
        ProviderClient::new(Arc::new(gateway.clone())),
        Arc::new(transport.clone()),
        Arc::new(SessionStore::default()),
    )
    .with_allowed_users([UserId(1)]);

    dispatcher
        .handle(IncomingEvent::command(CHAT, USER, "login", &["rnd_test"]))
        .await
        .unwrap();
    assert!(transport
        .last_text()
        .unwrap()
        .contains("not authorized"));
    assert_eq!(gateway.call_count(), 0);
    assert!(!dispatcher.sessions().is_logged_in(key()));
}

#[tokio::test]
async fn test_invalid_service_argument() {
    let h = Harness::new(provider());
    h.login().await;

    h.command("info", &["crn-123"]).await;
    assert!(h.last_text().contains("not a service id"));
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_empty_service_list() {
    let gateway = MockGateway::new()
        .route(Method::Get, "users", MockReply::json(json!({"name": "Ada"})))
        .route(Method::Get, "services", MockReply::json(json!([])));
    let h = Harness::new(gateway);
    h.login().await;

    h.command("deploy", &[]).await;
    assert!(h.last_text().contains("No services found"));
}

#[tokio::test]
async fn test_transport_failure_is_returned() {
    let transport = RecordingTransport::new().fail_sends("offline");
    let dispatcher = Dispatcher::new(
        ProviderClient::new(Arc::new(provider())),
        Arc::new(transport),
        Arc::new(SessionStore::default()),
    );
    let err = dispatcher
        .handle(IncomingEvent::command(CHAT, USER, "help", &[]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("offline"));
}
