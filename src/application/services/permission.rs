//! Access checks for a resolved command

use std::fmt;

use crate::domain::entities::{Command, ExecutionContext};

/// Why an invocation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    GroupOnly,
    PrivateOnly,
    OwnerOnly,
    AdminOnly,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::GroupOnly => "group-only",
            DenyReason::PrivateOnly => "private-only",
            DenyReason::OwnerOnly => "owner-only",
            DenyReason::AdminOnly => "admin-only",
        }
    }

    /// Text shown to the user
    pub fn notice(&self) -> &'static str {
        match self {
            DenyReason::GroupOnly => "⚠️ This command can only be used in groups.",
            DenyReason::PrivateOnly => "⚠️ This command can only be used in private chat.",
            DenyReason::OwnerOnly => "⛔ This command is reserved for the bot owner.",
            DenyReason::AdminOnly => "⛔ This command is reserved for group admins.",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allowed,
    Denied(DenyReason),
}

/// Evaluate the command's access flags against the invocation.
/// The first failing rule wins.
pub fn evaluate(command: &Command, ctx: &ExecutionContext) -> PermissionDecision {
    if command.group_only && !ctx.is_group {
        return PermissionDecision::Denied(DenyReason::GroupOnly);
    }
    if command.private_only && ctx.is_group {
        return PermissionDecision::Denied(DenyReason::PrivateOnly);
    }
    if command.is_owner_only() && !ctx.is_owner {
        return PermissionDecision::Denied(DenyReason::OwnerOnly);
    }
    if command.admin_only && ctx.is_group && !ctx.is_admin {
        return PermissionDecision::Denied(DenyReason::AdminOnly);
    }
    PermissionDecision::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ctx(command: Command, is_group: bool, is_owner: bool, is_admin: bool) -> ExecutionContext {
        ExecutionContext {
            is_group,
            is_private: !is_group,
            is_owner,
            is_admin,
            sender: "1@s.whatsapp.net".into(),
            chat_id: "chat".into(),
            invoked_as: command.name.clone(),
            command: Arc::new(command),
            prefix: "!".into(),
        }
    }

    fn check(command: Command, is_group: bool, is_owner: bool, is_admin: bool) -> PermissionDecision {
        let ctx = ctx(command, is_group, is_owner, is_admin);
        evaluate(&ctx.command, &ctx)
    }

    #[test]
    fn group_only_wins_over_owner_only() {
        let cmd = Command::new("kick").group_only().owner_only(true);
        assert_eq!(
            check(cmd, false, false, false),
            PermissionDecision::Denied(DenyReason::GroupOnly)
        );
    }

    #[test]
    fn private_only_rejects_groups() {
        let cmd = Command::new("register").private_only();
        assert_eq!(
            check(cmd, true, true, true),
            PermissionDecision::Denied(DenyReason::PrivateOnly)
        );
    }

    #[test]
    fn owner_category_requires_owner() {
        let cmd = Command::new("eval").with_category("owner");
        assert_eq!(
            check(cmd, false, false, false),
            PermissionDecision::Denied(DenyReason::OwnerOnly)
        );
        let cmd = Command::new("eval").with_category("owner");
        assert_eq!(check(cmd, false, true, false), PermissionDecision::Allowed);
    }

    #[test]
    fn admin_only_applies_inside_groups_only() {
        let cmd = || Command::new("tagall").admin_only();
        assert_eq!(
            check(cmd(), true, false, false),
            PermissionDecision::Denied(DenyReason::AdminOnly)
        );
        assert_eq!(check(cmd(), true, false, true), PermissionDecision::Allowed);
        assert_eq!(check(cmd(), false, false, false), PermissionDecision::Allowed);
    }

    #[test]
    fn reasons_render_as_kebab_case() {
        assert_eq!(DenyReason::GroupOnly.to_string(), "group-only");
        assert_eq!(DenyReason::AdminOnly.as_str(), "admin-only");
    }
}
