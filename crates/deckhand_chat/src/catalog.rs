//! Static command registry.
//!
//! Every command name maps to exactly one shape: it runs immediately, it asks
//! for a service and then runs, or it asks for a service and then waits for a
//! free-text reply.

use self::CommandShape::{Collect, Immediate, Selectable};
use crate::pending::CollectAction;

/// Commands that need no service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImmediateCommand {
    Start,
    Help,
    Login,
    Logout,
    Services,
    Account,
    Usage,
    Scale,
    CronJobs,
    RunCron,
    Databases,
}

/// Actions that run as soon as a service is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    Info,
    Deploys,
    Deploy,
    Cancel,
    Suspend,
    Resume,
    Env,
    Logs,
}

/// Shape of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandShape {
    Immediate(ImmediateCommand),
    Selectable(ServiceAction),
    Collect(CollectAction),
}

impl CommandShape {
    /// Whether the command works on a single service.
    pub fn targets_service(&self) -> bool {
        !matches!(self, Self::Immediate(_))
    }
}

/// One registered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub shape: CommandShape,
    pub description: &'static str,
}

const fn spec(name: &'static str, shape: CommandShape, description: &'static str) -> CommandSpec {
    CommandSpec {
        name,
        shape,
        description,
    }
}

/// All commands, in the order they are advertised.
pub const COMMANDS: &[CommandSpec] = &[
    spec("start", Immediate(ImmediateCommand::Start), "Welcome and usage"),
    spec("help", Immediate(ImmediateCommand::Help), "Usage"),
    spec("login", Immediate(ImmediateCommand::Login), "Log in with a Render API key"),
    spec("logout", Immediate(ImmediateCommand::Logout), "Forget your API key"),
    spec("services", Immediate(ImmediateCommand::Services), "List services"),
    spec("account", Immediate(ImmediateCommand::Account), "Show the account behind the key"),
    spec("usage", Immediate(ImmediateCommand::Usage), "Usage this billing period"),
    spec("info", Selectable(ServiceAction::Info), "Service details"),
    spec("deploys", Selectable(ServiceAction::Deploys), "Recent deploys"),
    spec("deploy", Selectable(ServiceAction::Deploy), "Trigger a deploy"),
    spec("cancel", Selectable(ServiceAction::Cancel), "Cancel the running deploy"),
    spec("suspend", Selectable(ServiceAction::Suspend), "Suspend a service"),
    spec("resume", Selectable(ServiceAction::Resume), "Resume a service"),
    spec("env", Selectable(ServiceAction::Env), "List environment variables"),
    spec("logs", Selectable(ServiceAction::Logs), "Recent logs"),
    spec("scale", Immediate(ImmediateCommand::Scale), "Scale: /scale srv-id N"),
    spec("crons", Immediate(ImmediateCommand::CronJobs), "List cron jobs"),
    spec("runcron", Immediate(ImmediateCommand::RunCron), "Run a cron job: /runcron crn-id"),
    spec("databases", Immediate(ImmediateCommand::Databases), "List databases"),
    spec("setenv", Collect(CollectAction::SetEnvVar), "Add or update a variable"),
    spec("delenv", Collect(CollectAction::DeleteEnvVar), "Delete a variable"),
    spec("replaceenv", Collect(CollectAction::ReplaceEnvVars), "Replace all variables"),
    spec("rename", Collect(CollectAction::Rename), "Rename a service"),
    spec("buildcmd", Collect(CollectAction::BuildCommand), "Change the build command"),
    spec("startcmd", Collect(CollectAction::StartCommand), "Change the start command"),
    spec("buildfilter", Collect(CollectAction::BuildFilter), "Change build filter paths"),
    spec("delete", Collect(CollectAction::DeleteService), "Delete a service"),
];

/// Alternative names accepted for some commands.
pub const ALIASES: &[(&str, &str)] = &[
    ("redeploy", "deploy"),
    ("restart", "deploy"),
    ("deployments", "deploys"),
    ("cron_jobs", "crons"),
    ("run_cron", "runcron"),
];

/// Look a command up by name or alias.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, target)| *target);
    COMMANDS.iter().find(|spec| spec.name == canonical)
}

/// Canonical name of a shape, used in selection tokens.
pub fn name_of(shape: CommandShape) -> &'static str {
    COMMANDS
        .iter()
        .find(|spec| spec.shape == shape)
        .map_or("help", |spec| spec.name)
}
