//! Rendering of provider responses into Telegram HTML.
//!
//! Every function is pure. Provider and user strings are escaped; fields the
//! provider omitted render as `N/A`.

use deckhand_api::{
    ApiError, BuildFilter, CancelOutcome, CronJob, Database, DeleteOutcome, Deploy, EnvVar,
    LogPage, Owner, Service, ServiceId, UsageItem, User,
};
use serde_json::Value;

use crate::input::InputError;

/// Hard limit of the messaging platform.
pub const MESSAGE_LIMIT: usize = 4096;

/// Characters kept when a message has to be cut.
pub const TRUNCATE_AT: usize = 4000;

/// Suffix appended to cut messages.
pub const TRUNCATION_NOTICE: &str = "\n… (truncated)";

const NOT_AVAILABLE: &str = "N/A";
const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━";

/// Escape text for HTML parse mode.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn or_na(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => escape(v),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// First `len` characters of a timestamp (`2024-01-01` or `2024-01-01T10:00:00`).
fn stamp(value: Option<&str>, len: usize) -> String {
    match value {
        Some(v) if !v.is_empty() => escape(&v.chars().take(len).collect::<String>()),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "✅ Yes"
    } else {
        "❌ No"
    }
}

/// Cut text longer than [`TRUNCATE_AT`] characters, preferring a line break
/// so no markup is split.
pub fn truncate(text: &str) -> String {
    let Some((byte_end, _)) = text.char_indices().nth(TRUNCATE_AT) else {
        return text.to_string();
    };
    let head = &text[..byte_end];
    let cut = match head.rfind('\n') {
        Some(pos) if pos > 0 => &head[..pos],
        _ => without_open_markup(head),
    };
    format!("{}{}", cut, TRUNCATION_NOTICE)
}

/// Drop a trailing entity or tag the cut left unterminated.
fn without_open_markup(head: &str) -> &str {
    let Some(pos) = head.rfind(['&', '<']) else {
        return head;
    };
    let tail = &head[pos..];
    let close = if tail.starts_with('&') { ';' } else { '>' };
    if tail.contains(close) {
        head
    } else {
        &head[..pos]
    }
}

pub fn help_text() -> String {
    "🚀 <b>Render Management Bot</b>\n\
     \n\
     <b>Account</b>\n\
     • /login <code>API_KEY</code> - Log in (or send /login and reply with the key)\n\
     • /logout - Forget your key\n\
     • /account - Show the account behind the key\n\
     • /usage - Usage this billing period\n\
     \n\
     <b>Services</b>\n\
     • /services - List all services\n\
     • /info - Service details\n\
     • /deploys - Recent deploys\n\
     • /logs - Recent log lines\n\
     • /env - Environment variables\n\
     • /crons - Cron jobs, /runcron <code>crn_id</code> runs one\n\
     • /databases - Managed databases\n\
     \n\
     <b>Actions</b>\n\
     • /deploy - Trigger a deploy\n\
     • /cancel - Cancel the running deploy\n\
     • /suspend, /resume - Pause or resume a service\n\
     • /scale <code>service_id</code> <code>N</code> - Scale to N instances\n\
     \n\
     <b>Edits</b> (reply to the prompt)\n\
     • /setenv - Add or update one variable\n\
     • /delenv - Delete one variable\n\
     • /replaceenv - Replace all variables\n\
     • /rename - Rename a service\n\
     • /buildcmd, /startcmd - Change build or start command\n\
     • /buildfilter - Change build filter paths\n\
     • /delete - Delete a service\n\
     \n\
     Service commands show a picker; add a service id to skip it, e.g. <code>/info srv-abc123</code>."
        .to_string()
}

pub fn not_logged_in() -> String {
    "🔒 You are not logged in. Send <code>/login API_KEY</code>, or /login and reply with your key."
        .to_string()
}

pub fn not_authorized() -> String {
    "❌ You are not authorized to use this bot.".to_string()
}

pub fn logged_in(user: &User) -> String {
    let who = user
        .email
        .as_deref()
        .or(user.name.as_deref())
        .map(escape)
        .unwrap_or_else(|| "your account".to_string());
    format!("✅ Logged in as <b>{}</b>.", who)
}

pub fn login_rejected(err: &ApiError) -> String {
    format!("❌ Login failed. The key was rejected.\n{}", api_error_detail(err))
}

pub fn invalid_key() -> String {
    "❌ That does not look like an API key.".to_string()
}

pub fn logged_out() -> String {
    "👋 Logged out. Your key has been forgotten.".to_string()
}

pub fn unknown_command(name: &str) -> String {
    format!("❓ Unknown command /{}. Send /help for the list.", escape(name))
}

pub fn prompt_expired() -> String {
    "⌛ That prompt has expired. Run the command again.".to_string()
}

pub fn input_rejected(err: &InputError) -> String {
    format!("❌ Invalid input. {}", err.hint())
}

pub fn invalid_service_id(raw: &str) -> String {
    format!(
        "❌ <code>{}</code> is not a service id. Ids look like <code>srv-abc123</code>.",
        escape(raw)
    )
}

pub fn pick_service(command: &str) -> String {
    format!("👇 Select a service for /{}:", escape(command))
}

pub fn no_services() -> String {
    "📭 No services found.".to_string()
}

pub fn scale_usage() -> String {
    "❌ Usage: <code>/scale srv-abc123 2</code>. The instance count must be at least 1.".to_string()
}

fn api_error_detail(err: &ApiError) -> String {
    match err {
        ApiError::Rejected { status, body } if body.trim().is_empty() => {
            format!("Status {}.", status)
        }
        ApiError::Rejected { status, body } => {
            format!("Status {}: <code>{}</code>", status, escape(body.trim()))
        }
        other => escape(&other.to_string()),
    }
}

/// User-facing text for a failed upstream call.
pub fn api_error(err: &ApiError) -> String {
    match err {
        ApiError::Unauthenticated => not_logged_in(),
        ApiError::RateLimited { .. } => format!("⏳ {}. Try again later.", escape(&err.to_string())),
        _ => format!("❌ Error: {}", api_error_detail(err)),
    }
}

pub fn service_details(service: &Service) -> String {
    let details = service.service_details.clone().unwrap_or_default();
    let mut out = format!(
        "📦 <b>{}</b> (<code>{}</code>)\n{}\n",
        or_na(service.name.as_deref()),
        escape(&service.id),
        RULE
    );
    let suspended = service.suspended.as_ref().map(|s| s.is_suspended());
    let rows = [
        ("Type", or_na(service.service_type.as_deref())),
        (
            "Suspended",
            suspended.map_or(NOT_AVAILABLE.to_string(), |s| yes_no(s).to_string()),
        ),
        ("Plan", or_na(details.plan.as_deref())),
        ("Region", or_na(details.region.as_deref())),
        (
            "Instances",
            details
                .num_instances
                .map_or(NOT_AVAILABLE.to_string(), |n| n.to_string()),
        ),
        ("Auto-deploy", or_na(service.auto_deploy.as_deref())),
        ("Repository", or_na(service.repo.as_deref())),
        ("Branch", or_na(service.branch.as_deref())),
        ("URL", or_na(details.url.as_deref())),
        ("Build command", or_na(details.build_command())),
        ("Start command", or_na(details.start_command())),
        ("Owner", or_na(service.owner_id.as_deref())),
        ("Created", stamp(service.created_at.as_deref(), 10)),
        ("Updated", stamp(service.updated_at.as_deref(), 10)),
    ];
    for (label, value) in rows {
        out.push_str(&format!("• {}: {}\n", label, value));
    }
    if let Some(filter) = service.build_filter.as_ref().filter(|f| !f.is_empty()) {
        out.push_str(&format!("• Build filter: {}\n", filter_summary(filter)));
    }
    out.push_str(RULE);
    truncate(&out)
}

pub fn service_list(services: &[Service]) -> String {
    if services.is_empty() {
        return no_services();
    }
    let mut out = format!("📋 <b>Your Services ({})</b>\n{}\n", services.len(), RULE);
    for (i, service) in services.iter().enumerate() {
        let state = if service.is_suspended() {
            "⏸ Suspended"
        } else {
            "▶️ Running"
        };
        out.push_str(&format!(
            "{}. <b>{}</b>\n   ID: <code>{}</code>\n   Type: {} | {}\n",
            i + 1,
            escape(service.display_name()),
            escape(&service.id),
            or_na(service.service_type.as_deref()),
            state
        ));
    }
    truncate(&out)
}

pub fn deploys(service: &ServiceId, deploys: &[Deploy]) -> String {
    if deploys.is_empty() {
        return format!("📭 No deploys found for <code>{}</code>.", service);
    }
    let mut out = format!(
        "🚀 <b>Recent Deploys ({})</b> of <code>{}</code>\n{}\n",
        deploys.len(),
        service,
        RULE
    );
    for (i, deploy) in deploys.iter().enumerate() {
        let commit = deploy.commit.clone().unwrap_or_default();
        let commit_id: Option<String> = commit.id.map(|id| id.chars().take(8).collect());
        let commit_msg: Option<String> = commit
            .message
            .map(|m| m.lines().next().unwrap_or_default().chars().take(50).collect());
        out.push_str(&format!(
            "{}. {} <b>{}</b>\n   ID: <code>{}</code>\n   Commit: {} - {}\n   Created: {}\n",
            i + 1,
            deploy.status.emoji(),
            escape(&deploy.status.as_str().to_uppercase()),
            escape(&deploy.id),
            or_na(commit_id.as_deref()),
            or_na(commit_msg.as_deref()),
            stamp(deploy.created_at.as_deref(), 19)
        ));
    }
    truncate(&out)
}

pub fn env_vars(service: &ServiceId, vars: &[EnvVar]) -> String {
    if vars.is_empty() {
        return format!("📭 No environment variables on <code>{}</code>.", service);
    }
    let mut out = format!(
        "⚙️ <b>Environment ({})</b> of <code>{}</code>\n{}\n",
        vars.len(),
        service,
        RULE
    );
    for var in vars {
        out.push_str(&format!(
            "<code>{}</code> = <code>{}</code>\n",
            escape(&var.key),
            escape(&var.value)
        ));
    }
    truncate(&out)
}

pub fn account(user: &User, owners: &[Owner]) -> String {
    let mut out = format!(
        "👤 <b>Account</b>\n{}\n• Name: {}\n• Email: {}\n",
        RULE,
        or_na(user.name.as_deref()),
        or_na(user.email.as_deref())
    );
    if !owners.is_empty() {
        out.push_str("\n<b>Workspaces</b>\n");
        for owner in owners {
            out.push_str(&format!(
                "• {} (<code>{}</code>) {}\n",
                or_na(owner.name.as_deref()),
                escape(&owner.id),
                or_na(owner.owner_type.as_deref())
            ));
        }
    }
    truncate(&out)
}

pub fn usage(items: &[UsageItem]) -> String {
    if items.is_empty() {
        return "📭 No usage data available.".to_string();
    }
    let mut out = format!("📊 <b>Usage Statistics</b>\n{}\n", RULE);
    for item in items {
        let unit = item
            .unit
            .as_deref()
            .map(|u| format!(" {}", escape(u)))
            .unwrap_or_default();
        out.push_str(&format!(
            "• <b>{}</b>: {}{} / {}{}\n",
            or_na(item.kind.as_deref()),
            amount(item.usage.as_ref()),
            unit,
            amount(item.limit.as_ref()),
            unit
        ));
    }
    truncate(&out)
}

fn amount(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => or_na(Some(s.as_str())),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn cron_jobs(jobs: &[CronJob]) -> String {
    if jobs.is_empty() {
        return "📭 No cron jobs found.".to_string();
    }
    let mut out = format!("⏰ <b>Cron Jobs ({})</b>\n{}\n", jobs.len(), RULE);
    for job in jobs {
        out.push_str(&format!(
            "• <b>{}</b> (<code>{}</code>)\n   Schedule: <code>{}</code>\n   Last run: {} | Next run: {}\n",
            or_na(job.name.as_deref()),
            escape(&job.id),
            or_na(job.schedule.as_deref()),
            stamp(job.last_run_at.as_deref(), 19),
            stamp(job.next_run_at.as_deref(), 19)
        ));
    }
    truncate(&out)
}

pub fn run_cron_usage() -> String {
    "❌ Usage: <code>/runcron crn-abc123</code>. Send /crons for the ids.".to_string()
}

pub fn cron_triggered(id: &str) -> String {
    format!("✅ Cron job <code>{}</code> triggered.", escape(id))
}

pub fn databases(databases: &[Database]) -> String {
    if databases.is_empty() {
        return "📭 No databases found.".to_string();
    }
    let mut out = format!("🗄 <b>Databases ({})</b>\n{}\n", databases.len(), RULE);
    for db in databases {
        out.push_str(&format!(
            "• <b>{}</b> (<code>{}</code>)\n   Type: {} | Plan: {}\n   Status: {} | Region: {}\n",
            or_na(db.name.as_deref()),
            escape(&db.id),
            or_na(db.database_type.as_deref()),
            or_na(db.plan.as_deref()),
            or_na(db.status.as_deref()),
            or_na(db.region.as_deref())
        ));
    }
    truncate(&out)
}

pub fn logs(service: &ServiceId, page: &LogPage) -> String {
    if page.logs.is_empty() {
        return format!("📭 No logs available for <code>{}</code>.", service);
    }
    let header = format!("📜 <b>Recent logs</b> of <code>{}</code>\n", service);
    // Oldest first, the provider pages backwards.
    let body: String = page
        .logs
        .iter()
        .rev()
        .map(|entry| {
            format!(
                "{} {}\n",
                stamp(entry.timestamp.as_deref(), 19),
                escape(entry.message.trim_end())
            )
        })
        .collect();
    let room = TRUNCATE_AT.saturating_sub(header.chars().count() + "<pre></pre>".len());
    let body = if body.chars().count() > room {
        let kept: String = body.chars().take(room).collect();
        let kept = match kept.rfind('\n') {
            Some(pos) if pos > 0 => kept[..pos].to_string(),
            _ => kept,
        };
        format!("{}{}", kept, TRUNCATION_NOTICE)
    } else {
        body
    };
    format!("{}<pre>{}</pre>", header, body)
}

fn filter_summary(filter: &BuildFilter) -> String {
    let paths = if filter.paths.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        escape(&filter.paths.join(", "))
    };
    let ignored = if filter.ignored_paths.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        escape(&filter.ignored_paths.join(", "))
    };
    format!("paths {} | ignored {}", paths, ignored)
}

pub fn deploy_triggered(service: &ServiceId, deploy: Option<&Deploy>) -> String {
    format!(
        "✅ Deploy triggered for <code>{}</code>.\nDeploy ID: <code>{}</code>",
        service,
        or_na(deploy.map(|d| d.id.as_str()))
    )
}

pub fn cancel_outcome(service: &ServiceId, outcome: &CancelOutcome) -> String {
    match outcome {
        CancelOutcome::Canceled(deploy) => format!(
            "🚫 Canceled deploy <code>{}</code> of <code>{}</code>.",
            escape(&deploy.id),
            service
        ),
        CancelOutcome::NothingToCancel => format!(
            "ℹ️ No deploy of <code>{}</code> is in progress.",
            service
        ),
    }
}

pub fn suspended(service: &ServiceId) -> String {
    format!("⏸ Service <code>{}</code> suspended.", service)
}

pub fn resumed(service: &ServiceId) -> String {
    format!("▶️ Service <code>{}</code> resumed.", service)
}

pub fn scaled(service: &ServiceId, instances: u32) -> String {
    format!(
        "📊 Service <code>{}</code> scaled to {} instance(s).",
        service, instances
    )
}

pub fn env_set(service: &ServiceId, key: &str) -> String {
    format!(
        "✅ Set <code>{}</code> on <code>{}</code>.",
        escape(key),
        service
    )
}

pub fn env_deleted(service: &ServiceId, key: &str, outcome: &DeleteOutcome) -> String {
    match outcome {
        DeleteOutcome::Deleted => format!(
            "🗑 Deleted <code>{}</code> from <code>{}</code>.",
            escape(key),
            service
        ),
        DeleteOutcome::AlreadyGone => format!(
            "ℹ️ <code>{}</code> was already deleted from <code>{}</code>.",
            escape(key),
            service
        ),
    }
}

pub fn env_replaced(service: &ServiceId, vars: &[EnvVar]) -> String {
    let keys: Vec<String> = vars.iter().map(|v| escape(&v.key)).collect();
    format!(
        "✅ Replaced the environment of <code>{}</code> with {} variable(s): {}",
        service,
        vars.len(),
        keys.join(", ")
    )
}

pub fn renamed(service: &ServiceId, name: &str) -> String {
    format!(
        "✅ Renamed <code>{}</code> to <b>{}</b>.",
        service,
        escape(name)
    )
}

pub fn build_command_updated(service: &ServiceId, command: &str) -> String {
    format!(
        "✅ Build command of <code>{}</code> is now <code>{}</code>.",
        service,
        escape(command)
    )
}

pub fn start_command_updated(service: &ServiceId, command: &str) -> String {
    format!(
        "✅ Start command of <code>{}</code> is now <code>{}</code>.",
        service,
        escape(command)
    )
}

pub fn build_filter_updated(service: &ServiceId, filter: &BuildFilter) -> String {
    format!(
        "✅ Build filter of <code>{}</code> updated: {}",
        service,
        filter_summary(filter)
    )
}

pub fn service_deleted(service: &ServiceId, outcome: &DeleteOutcome) -> String {
    match outcome {
        DeleteOutcome::Deleted => format!("☠️ Service <code>{}</code> deleted.", service),
        DeleteOutcome::AlreadyGone => {
            format!("ℹ️ Service <code>{}</code> was already deleted.", service)
        }
    }
}

pub fn delete_cancelled(service: &ServiceId) -> String {
    format!(
        "↩️ Deletion of <code>{}</code> cancelled. Nothing was deleted.",
        service
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckhand_api::LogEntry;
    use serde_json::json;

    fn srv() -> ServiceId {
        ServiceId::parse("srv-abc123").unwrap()
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_service_details_placeholders() {
        let service: Service = serde_json::from_value(json!({"id": "srv-abc123"})).unwrap();
        let text = service_details(&service);
        assert!(text.contains("<code>srv-abc123</code>"));
        assert!(text.contains("• Type: N/A"));
        assert!(text.contains("• Repository: N/A"));
        assert!(text.contains("• Suspended: N/A"));
        assert!(!text.contains("Build filter"));
    }

    #[test]
    fn test_service_details_escapes_names() {
        let service: Service = serde_json::from_value(json!({
            "id": "srv-abc123",
            "name": "a<b>",
            "suspended": "suspended",
            "serviceDetails": {"numInstances": 2}
        }))
        .unwrap();
        let text = service_details(&service);
        assert!(text.contains("a&lt;b&gt;"));
        assert!(text.contains("• Suspended: ✅ Yes"));
        assert!(text.contains("• Instances: 2"));
    }

    #[test]
    fn test_truncate() {
        let short = "hello";
        assert_eq!(truncate(short), short);

        let long = "line\n".repeat(1000);
        let cut = truncate(&long);
        assert!(cut.ends_with(TRUNCATION_NOTICE));
        assert!(cut.chars().count() <= TRUNCATE_AT + TRUNCATION_NOTICE.chars().count());
        assert!(cut.chars().count() < MESSAGE_LIMIT);

        let exact = "x".repeat(TRUNCATE_AT);
        assert_eq!(truncate(&exact), exact);
    }

    #[test]
    fn test_truncate_without_line_breaks_keeps_markup_whole() {
        // 666 whole repetitions leave "x&am" at the cut.
        let entities = "x&amp;".repeat(1000);
        let cut = truncate(&entities);
        let body = cut.strip_suffix(TRUNCATION_NOTICE).unwrap();
        assert!(body.ends_with("x&amp;x"));
        assert_eq!(body.chars().count(), TRUNCATE_AT - 3);

        let tag = format!("{}<b>bold</b>", "a".repeat(TRUNCATE_AT - 2));
        let body = truncate(&tag).strip_suffix(TRUNCATION_NOTICE).unwrap().to_string();
        assert_eq!(body, "a".repeat(TRUNCATE_AT - 2));

        let closed = format!("{}&lt;{}", "a".repeat(10), "b".repeat(TRUNCATE_AT));
        assert!(truncate(&closed).contains("&lt;bbb"));
    }

    #[test]
    fn test_cron_and_database_listings() {
        assert!(cron_jobs(&[]).contains("No cron jobs found"));
        assert!(databases(&[]).contains("No databases found"));

        let jobs: Vec<CronJob> = serde_json::from_value(json!([
            {"id": "crn-a1", "name": "<nightly>", "lastRunAt": "2024-05-01T03:00:00.123Z"}
        ]))
        .unwrap();
        let text = cron_jobs(&jobs);
        assert!(text.contains("&lt;nightly&gt;"));
        assert!(text.contains("Last run: 2024-05-01T03:00:00 | Next run: N/A"));

        let dbs: Vec<Database> =
            serde_json::from_value(json!([{"id": "dpg-1", "plan": "free"}])).unwrap();
        assert!(databases(&dbs).contains("Type: N/A | Plan: free"));
    }

    #[test]
    fn test_usage_amounts() {
        let items: Vec<UsageItem> = serde_json::from_value(json!([
            {"type": "bandwidth", "usage": 1.5, "limit": "unlimited", "unit": "GB"},
            {"type": "pipeline"}
        ]))
        .unwrap();
        let text = usage(&items);
        assert!(text.contains("• <b>bandwidth</b>: 1.5 GB / unlimited GB"));
        assert!(text.contains("• <b>pipeline</b>: N/A / N/A"));
        assert!(usage(&[]).contains("No usage data"));
    }

    #[test]
    fn test_service_list_truncated() {
        let services: Vec<Service> = (0..200)
            .map(|i| {
                serde_json::from_value(json!({"id": format!("srv-{i}"), "name": format!("service-{i}")}))
                    .unwrap()
            })
            .collect();
        let text = service_list(&services);
        assert!(text.ends_with(TRUNCATION_NOTICE));
        assert!(text.chars().count() < MESSAGE_LIMIT);
        assert_eq!(service_list(&[]), no_services());
    }

    #[test]
    fn test_deploys_rendering() {
        let deploys: Vec<Deploy> = serde_json::from_value(json!([
            {"id": "dep-1", "status": "live", "commit": {"id": "0123456789abcdef", "message": "fix <bug>\n\nbody"}, "createdAt": "2024-05-01T10:20:30.000Z"},
            {"id": "dep-0"}
        ]))
        .unwrap();
        let text = super::deploys(&srv(), &deploys);
        assert!(text.contains("✅ <b>LIVE</b>"));
        assert!(text.contains("Commit: 01234567 - fix &lt;bug&gt;"));
        assert!(text.contains("Created: 2024-05-01T10:20:30\n"));
        assert!(text.contains("Commit: N/A - N/A"));
    }

    #[test]
    fn test_logs_wrapped_and_bounded() {
        let page = LogPage {
            logs: (0..500)
                .map(|i| LogEntry {
                    timestamp: Some("2024-01-01T00:00:00Z".to_string()),
                    message: format!("request {} <ok>", i),
                })
                .collect(),
            has_more: true,
        };
        let text = logs(&srv(), &page);
        assert!(text.starts_with("📜"));
        assert!(text.ends_with("</pre>"));
        assert!(text.contains(TRUNCATION_NOTICE));
        assert!(text.contains("&lt;ok&gt;"));
        assert!(text.chars().count() < MESSAGE_LIMIT);
    }

    #[test]
    fn test_api_error_messages() {
        let err = ApiError::Rejected {
            status: 400,
            body: "{\"message\":\"bad <input>\"}".to_string(),
        };
        let text = api_error(&err);
        assert!(text.contains("400"));
        assert!(text.contains("bad &lt;input&gt;"));

        assert_eq!(api_error(&ApiError::Unauthenticated), not_logged_in());
        let limited = api_error(&ApiError::RateLimited {
            retry_after: Some(30),
        });
        assert!(limited.starts_with("⏳"));
        assert!(limited.contains("30"));
    }
}
