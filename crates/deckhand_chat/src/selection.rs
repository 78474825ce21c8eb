//! Service pickers and their correlation tokens.
//!
//! A button carries `command:srv-…`, or `runcron:crn-…` for cron run buttons.
//! The token is opaque to the platform and must fit its 64-byte callback limit.

use deckhand_api::{CronJob, Service, ServiceId};

use crate::catalog::{self, CommandShape, ImmediateCommand, ServiceAction};
use crate::error::{ChatError, ChatResult};
use crate::types::Button;

/// Platform limit for button payloads, in bytes.
pub const MAX_TOKEN_BYTES: usize = 64;

/// Characters of a service name shown on a button.
const LABEL_CHARS: usize = 32;

/// Cron jobs that get a run button under a listing.
pub const CRON_BUTTONS: usize = 3;

const RUN_CRON: CommandShape = CommandShape::Immediate(ImmediateCommand::RunCron);

/// A decoded button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionToken {
    pub shape: CommandShape,
    pub service: ServiceId,
}

impl SelectionToken {
    pub fn new(shape: CommandShape, service: ServiceId) -> Self {
        Self { shape, service }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}", catalog::name_of(self.shape), self.service)
    }

    pub fn decode(data: &str) -> ChatResult<Self> {
        let invalid = || ChatError::InvalidSelection(data.to_string());
        if data.len() > MAX_TOKEN_BYTES {
            return Err(invalid());
        }
        let (name, id) = data.split_once(':').ok_or_else(invalid)?;
        let spec = catalog::lookup(name).ok_or_else(invalid)?;
        if !spec.shape.targets_service() {
            return Err(invalid());
        }
        let service = ServiceId::parse(id).map_err(|_| invalid())?;
        Ok(Self::new(spec.shape, service))
    }
}

fn label(name: &str) -> String {
    if name.chars().count() > LABEL_CHARS {
        let cut: String = name.chars().take(LABEL_CHARS - 1).collect();
        format!("{}…", cut)
    } else {
        name.to_string()
    }
}

/// One button per service, one per row. Services whose id does not parse are
/// left out.
pub fn service_buttons(shape: CommandShape, services: &[Service]) -> Vec<Vec<Button>> {
    services
        .iter()
        .filter_map(|service| {
            let id = ServiceId::parse(&service.id).ok()?;
            let token = SelectionToken::new(shape, id);
            Some(vec![Button::new(label(service.display_name()), token.encode())])
        })
        .collect()
}

/// Quick actions shown under a service's details.
pub fn detail_buttons(service: &Service) -> Vec<Vec<Button>> {
    let Ok(id) = ServiceId::parse(&service.id) else {
        return Vec::new();
    };
    let button = |text: &str, action: ServiceAction| {
        Button::new(
            text,
            SelectionToken::new(CommandShape::Selectable(action), id.clone()).encode(),
        )
    };
    let toggle = if service.is_suspended() {
        button("▶️ Resume", ServiceAction::Resume)
    } else {
        button("⏸ Suspend", ServiceAction::Suspend)
    };
    vec![
        vec![button("🔄 Deploy", ServiceAction::Deploy), toggle],
        vec![
            button("📜 Logs", ServiceAction::Logs),
            button("⚙️ Env Vars", ServiceAction::Env),
        ],
        vec![button("🚀 Deploys", ServiceAction::Deploys)],
    ]
}

/// Run buttons for the first [`CRON_BUTTONS`] cron jobs with a well-formed id.
pub fn cron_buttons(jobs: &[CronJob]) -> Vec<Vec<Button>> {
    jobs.iter()
        .filter_map(|job| {
            let data = format!("{}:{}", catalog::name_of(RUN_CRON), job.id);
            cron_run_target(&data)?;
            let name = job.name.as_deref().unwrap_or(&job.id);
            Some(vec![Button::new(format!("▶️ Run {}", label(name)), data)])
        })
        .take(CRON_BUTTONS)
        .collect()
}

/// Cron job id carried by a run button, if `data` is one.
pub fn cron_run_target(data: &str) -> Option<&str> {
    if data.len() > MAX_TOKEN_BYTES {
        return None;
    }
    let (name, id) = data.split_once(':')?;
    let spec = catalog::lookup(name)?;
    (spec.shape == RUN_CRON && CronJob::is_valid_id(id)).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::CollectAction;
    use serde_json::json;

    fn service(id: &str, name: &str) -> Service {
        serde_json::from_value(json!({"id": id, "name": name})).unwrap()
    }

    #[test]
    fn test_token_encoding() {
        let token = SelectionToken::new(
            CommandShape::Collect(CollectAction::Rename),
            ServiceId::parse("srv-abc123").unwrap(),
        );
        assert_eq!(token.encode(), "rename:srv-abc123");
        assert_eq!(SelectionToken::decode("rename:srv-abc123").unwrap(), token);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        for data in [
            "",
            "rename",
            "nope:srv-abc123",
            "services:srv-abc123",
            "info:crn-abc",
            &format!("info:srv-{}", "a".repeat(80)),
        ] {
            assert!(
                matches!(SelectionToken::decode(data), Err(ChatError::InvalidSelection(_))),
                "{data:?}"
            );
        }
    }

    #[test]
    fn test_service_buttons() {
        let services = vec![
            service("srv-abc123", "api"),
            service("not-a-service", "weird"),
            service("srv-def456", &"x".repeat(60)),
        ];
        let rows = service_buttons(CommandShape::Selectable(ServiceAction::Info), &services);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].label, "api");
        assert_eq!(rows[0][0].data, "info:srv-abc123");
        assert!(rows[1][0].label.ends_with('…'));
        for row in &rows {
            assert!(row[0].data.len() <= MAX_TOKEN_BYTES);
        }
    }

    #[test]
    fn test_detail_buttons_toggle() {
        let running = service("srv-abc123", "api");
        let data: Vec<String> = detail_buttons(&running)
            .into_iter()
            .flatten()
            .map(|b| b.data)
            .collect();
        assert!(data.contains(&"suspend:srv-abc123".to_string()));
        assert!(!data.contains(&"resume:srv-abc123".to_string()));

        let paused: Service =
            serde_json::from_value(json!({"id": "srv-abc123", "suspended": "suspended"})).unwrap();
        let data: Vec<String> = detail_buttons(&paused)
            .into_iter()
            .flatten()
            .map(|b| b.data)
            .collect();
        assert!(data.contains(&"resume:srv-abc123".to_string()));
    }

    #[test]
    fn test_cron_buttons() {
        let jobs: Vec<CronJob> = serde_json::from_value(json!([
            {"id": "crn-a1", "name": "nightly"},
            {"id": "bogus"},
            {"id": "crn-b2"},
            {"id": "crn-c3"},
            {"id": "crn-d4"}
        ]))
        .unwrap();
        let rows = cron_buttons(&jobs);
        assert_eq!(rows.len(), CRON_BUTTONS);
        assert_eq!(rows[0][0].label, "▶️ Run nightly");
        assert_eq!(rows[0][0].data, "runcron:crn-a1");
        assert_eq!(rows[1][0].label, "▶️ Run crn-b2");

        assert_eq!(cron_run_target("runcron:crn-a1"), Some("crn-a1"));
        assert_eq!(cron_run_target("run_cron:crn-a1"), Some("crn-a1"));
        for data in ["runcron:srv-abc123", "info:crn-a1", "runcron:crn-a/b", "runcron"] {
            assert!(cron_run_target(data).is_none(), "{data:?}");
        }
        assert!(SelectionToken::decode("runcron:crn-a1").is_err());
    }
}
