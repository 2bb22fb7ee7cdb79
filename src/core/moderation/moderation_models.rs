// Moderation domain models - data structures for the automod and
// punitive-action systems.
//
// These are pure domain types with no Discord dependencies.
// The discord layer converts gateway events into these and back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ACTION VOCABULARY
// ============================================================================

/// Every moderation action we record in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModLogKind {
    Purge,
    Timeout,
    Untimeout,
    Kick,
    Softban,
    Ban,
    Unban,
    VMute,
    VUnmute,
    Deafen,
    Undeafen,
    Disconnect,
    Move,
    Warn,
    /// An automod strike batch (one entry per offending message).
    Strike,
}

impl std::fmt::Display for ModLogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModLogKind::Purge => "PURGE",
            ModLogKind::Timeout => "TIMEOUT",
            ModLogKind::Untimeout => "UNTIMEOUT",
            ModLogKind::Kick => "KICK",
            ModLogKind::Softban => "SOFTBAN",
            ModLogKind::Ban => "BAN",
            ModLogKind::Unban => "UNBAN",
            ModLogKind::VMute => "VMUTE",
            ModLogKind::VUnmute => "VUNMUTE",
            ModLogKind::Deafen => "DEAFEN",
            ModLogKind::Undeafen => "UNDEAFEN",
            ModLogKind::Disconnect => "DISCONNECT",
            ModLogKind::Move => "MOVE",
            ModLogKind::Warn => "WARN",
            ModLogKind::Strike => "STRIKE",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for ModLogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PURGE" => ModLogKind::Purge,
            "TIMEOUT" => ModLogKind::Timeout,
            "UNTIMEOUT" => ModLogKind::Untimeout,
            "KICK" => ModLogKind::Kick,
            "SOFTBAN" => ModLogKind::Softban,
            "BAN" => ModLogKind::Ban,
            "UNBAN" => ModLogKind::Unban,
            "VMUTE" => ModLogKind::VMute,
            "VUNMUTE" => ModLogKind::VUnmute,
            "DEAFEN" => ModLogKind::Deafen,
            "UNDEAFEN" => ModLogKind::Undeafen,
            "DISCONNECT" => ModLogKind::Disconnect,
            "MOVE" => ModLogKind::Move,
            "WARN" => ModLogKind::Warn,
            "STRIKE" => ModLogKind::Strike,
            other => return Err(format!("unknown mod log kind: {other}")),
        })
    }
}

/// Actions a strike or warning ceiling may escalate into.
///
/// This is deliberately a strict subset of the action vocabulary: WARN can
/// never be an escalation target, so the WARN -> escalation recursion is
/// bounded at depth 1 by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationAction {
    Timeout,
    Kick,
    Softban,
    Ban,
}

impl EscalationAction {
    pub fn log_kind(&self) -> ModLogKind {
        match self {
            EscalationAction::Timeout => ModLogKind::Timeout,
            EscalationAction::Kick => ModLogKind::Kick,
            EscalationAction::Softban => ModLogKind::Softban,
            EscalationAction::Ban => ModLogKind::Ban,
        }
    }
}

impl std::fmt::Display for EscalationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.log_kind())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Closed set of outcomes for a refused or failed punitive action.
///
/// Permission and precondition failures are expected business outcomes and
/// are never logged as system errors; `Gateway`/`Storage` cover the
/// unexpected platform failures caught at the action boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("you do not outrank the target")]
    MemberPerm,
    #[error("the bot does not outrank the target")]
    BotPerm,
    #[error("the target is not connected to a voice channel")]
    NoVoice,
    #[error("the target is already voice muted")]
    AlreadyMuted,
    #[error("the target is not voice muted")]
    NotMuted,
    #[error("the target is already deafened")]
    AlreadyDeafened,
    #[error("the target is not deafened")]
    NotDeafened,
    #[error("the target already has an active timeout")]
    AlreadyTimeout,
    #[error("the target has no active timeout")]
    NoTimeout,
    #[error("the target is already in that channel")]
    AlreadyInChannel,
    #[error("the target cannot connect to that channel")]
    TargetPerm,
    #[error("amount must be between 1 and 500")]
    InvalidAmount,
    #[error("no matching messages to delete")]
    NoMessages,
    #[error("discord api call failed: {0}")]
    Gateway(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by the automod pipeline itself. Escalation-action
/// failures are swallowed there, so only storage can fail.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("storage error: {0}")]
    Storage(String),
}

// ============================================================================
// MEMBER STATE SNAPSHOTS
// ============================================================================

/// The rank information the permission hierarchy compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRank {
    pub member_id: u64,
    pub top_role_position: i64,
}

/// Voice state of an action target, captured at invocation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub channel_id: u64,
    pub muted: bool,
    pub deafened: bool,
}

/// Everything the action state machine needs to know about its target.
#[derive(Debug, Clone)]
pub struct TargetState {
    pub rank: MemberRank,
    pub timeout_until: Option<DateTime<Utc>>,
    pub voice: Option<VoiceInfo>,
}

impl TargetState {
    pub fn member(rank: MemberRank) -> Self {
        Self {
            rank,
            timeout_until: None,
            voice: None,
        }
    }
}

/// Snapshot handed to the action engine for a single invocation: who acts,
/// on whom, and the bot's own rank for the self-capability check.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub guild_id: u64,
    pub owner_id: u64,
    pub issuer: MemberRank,
    pub issuer_tag: String,
    pub bot: MemberRank,
    pub target: TargetState,
}

impl ActionContext {
    /// The same context with the bot standing in as issuer. Used when a
    /// ceiling escalation fires on the bot's own authority.
    pub fn with_bot_issuer(&self) -> Self {
        let mut cx = self.clone();
        cx.issuer = cx.bot.clone();
        cx
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Per-guild automod configuration. Defaults are applied centrally here so
/// call sites never sprinkle their own fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomodConfig {
    pub enabled: bool,
    /// Verbose evaluation logging only; never gates moderation.
    pub debug: bool,
    /// Channels exempt from automod.
    pub wh_channels: Vec<u64>,
    pub max_mentions: u32,
    pub max_role_mentions: u32,
    /// Combined user+role mention threshold; 0 disables the check.
    pub anti_massmention: u32,
    /// Maximum newline-separated lines; 0 disables the check.
    pub max_lines: u32,
    pub anti_attachments: bool,
    pub anti_links: bool,
    pub anti_spam: bool,
    pub anti_invites: bool,
    /// Strike ceiling that triggers the escalation action.
    pub strikes: u32,
    pub action: EscalationAction,
}

impl Default for AutomodConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debug: false,
            wh_channels: Vec::new(),
            max_mentions: 5,
            max_role_mentions: 5,
            anti_massmention: 0,
            max_lines: 0,
            anti_attachments: false,
            anti_links: false,
            anti_spam: false,
            anti_invites: false,
            strikes: 10,
            action: EscalationAction::Timeout,
        }
    }
}

/// A single invite-count rank reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRank {
    pub invites: i64,
    pub role_id: u64,
}

/// Guild-wide settings outside the automod block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub logs_channel: Option<u64>,
    pub max_warn_limit: u32,
    pub max_warn_action: EscalationAction,
    pub invite_tracking: bool,
    pub invite_ranks: Vec<InviteRank>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            logs_channel: None,
            max_warn_limit: 5,
            max_warn_action: EscalationAction::Timeout,
            invite_tracking: true,
            invite_ranks: Vec::new(),
        }
    }
}

// ============================================================================
// MEMBER RECORDS
// ============================================================================

/// Invite attribution sub-record for one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteData {
    /// Who invited this member, once attributed.
    pub inviter: Option<u64>,
    pub code: Option<String>,
    pub tracked: u32,
    pub fake: u32,
    pub left: u32,
    pub added: u32,
}

impl InviteData {
    /// tracked + added - fake - left; can go negative.
    pub fn effective(&self) -> i64 {
        self.tracked as i64 + self.added as i64 - self.fake as i64 - self.left as i64
    }
}

/// Per-(guild, member) moderation state. Created lazily on first reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub guild_id: u64,
    pub member_id: u64,
    /// Automod strike counter; reset to zero when the ceiling fires.
    pub strikes: u32,
    /// Manual warning counter; escalates independently of strikes.
    pub warnings: u32,
    pub invites: InviteData,
}

impl MemberRecord {
    pub fn new(guild_id: u64, member_id: u64) -> Self {
        Self {
            guild_id,
            member_id,
            strikes: 0,
            warnings: 0,
            invites: InviteData::default(),
        }
    }
}

// ============================================================================
// AUDIT LOG
// ============================================================================

/// Immutable audit record, one per successful punitive action or automod
/// strike batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModLogEntry {
    pub guild_id: u64,
    pub target_id: u64,
    pub issuer_id: u64,
    pub issuer_tag: String,
    pub reason: String,
    pub kind: ModLogKind,
    pub at: DateTime<Utc>,
    /// Channel an action applied to, where relevant (purge, automod).
    pub channel_id: Option<u64>,
    /// Aggregate count for bulk actions (purge).
    pub deleted_count: Option<u64>,
}

// ============================================================================
// MESSAGE EVALUATION
// ============================================================================

/// The facts about one inbound message that the rule evaluator consumes.
/// Permission flags are resolved by the discord layer so evaluation itself
/// stays deterministic and testable.
#[derive(Debug, Clone)]
pub struct MessageFacts {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub author_id: u64,
    pub content: String,
    /// Guild-member mentions (the "Mentions" check).
    pub member_mentions: u32,
    /// Raw user mentions (mass-mention check combines these with roles).
    pub user_mentions: u32,
    pub role_mentions: u32,
    pub mentions_everyone: bool,
    pub attachments: u32,
    pub deletable: bool,
    pub bot_can_manage_messages: bool,
    /// Author holds kick/ban/manage-guild at guild level.
    pub author_is_guild_mod: bool,
    /// Author holds manage-messages in this channel.
    pub author_is_channel_mod: bool,
}

/// One violated automod rule, kept structured so logs and embeds can render
/// the same "Name: value" fields the audit trail stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Mentions { found: u32, max: u32 },
    RoleMentions { found: u32, max: u32 },
    EveryoneMention,
    MassMentions { found: u32, threshold: u32 },
    MaxLines { found: u32, max: u32 },
    Attachments,
    Links,
    Spam,
    DiscordInvite,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Mentions { found, max } => write!(f, "Mentions: {found}/{max}"),
            Violation::RoleMentions { found, max } => write!(f, "Role Mentions: {found}/{max}"),
            Violation::EveryoneMention => write!(f, "Everyone Mention: ✓"),
            Violation::MassMentions { found, threshold } => {
                write!(f, "User/Role Mentions: {found}/{threshold}")
            }
            Violation::MaxLines { found, max } => write!(f, "New Lines: {found}/{max}"),
            Violation::Attachments => write!(f, "Attachments Found: ✓"),
            Violation::Links => write!(f, "Links Found: ✓"),
            Violation::Spam => write!(f, "AntiSpam Detection: ✓"),
            Violation::DiscordInvite => write!(f, "Discord Invites: ✓"),
        }
    }
}

/// Result of evaluating one message against the guild config.
#[derive(Debug, Clone, Default)]
pub struct RuleOutcome {
    pub violations: Vec<Violation>,
    pub strikes: u32,
    pub delete: bool,
}

impl RuleOutcome {
    pub fn is_clean(&self) -> bool {
        self.strikes == 0 && !self.delete
    }
}

/// Evaluation output plus the config it was produced under, so the strike
/// registration step never re-reads configuration mid-message.
#[derive(Debug, Clone)]
pub struct AutomodVerdict {
    pub outcome: RuleOutcome,
    pub config: AutomodConfig,
}

/// What happened after strikes were persisted for a message.
#[derive(Debug, Clone)]
pub struct StrikeReport {
    pub added: u32,
    /// Accumulated total before any ceiling reset (what the member is told).
    pub total: u32,
    pub ceiling: u32,
    pub escalated: Option<EscalationAction>,
}

// ============================================================================
// PURGE
// ============================================================================

/// Criterion used to select messages for a bulk purge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeFilter {
    All,
    Bot,
    Link,
    Token(String),
    Attachment,
    User(u64),
}

impl std::fmt::Display for PurgeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PurgeFilter::All => "ALL",
            PurgeFilter::Bot => "BOT",
            PurgeFilter::Link => "LINK",
            PurgeFilter::Token(_) => "TOKEN",
            PurgeFilter::Attachment => "ATTACHMENT",
            PurgeFilter::User(_) => "USER",
        };
        write!(f, "{name}")
    }
}

/// Minimal view of a fetched message, enough to apply every purge filter.
#[derive(Debug, Clone)]
pub struct MessageSnapshot {
    pub id: u64,
    pub author_id: u64,
    pub author_is_bot: bool,
    pub content: String,
    pub has_attachment: bool,
    pub created_at: DateTime<Utc>,
    pub deletable: bool,
}

/// A purge invocation over an already-fetched message window.
#[derive(Debug, Clone)]
pub struct PurgeRequest {
    pub guild_id: u64,
    pub channel_id: u64,
    pub issuer_id: u64,
    pub issuer_tag: String,
    pub issuer_can_manage: bool,
    pub bot_can_manage: bool,
    pub filter: PurgeFilter,
    pub amount: usize,
    pub messages: Vec<MessageSnapshot>,
    pub now: DateTime<Utc>,
}

/// Outcome of a WARN, which may have tripped the warning ceiling.
#[derive(Debug, Clone)]
pub struct WarnOutcome {
    pub warnings: u32,
    pub escalated: Option<EscalationAction>,
}
