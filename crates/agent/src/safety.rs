//! Deterministic pre-filter that runs before any model call.
//!
//! A deny-list hit routes the turn straight to the guardrail handler and
//! skips classification entirely. Matching is case-insensitive substring
//! containment over the raw message text: no tokenization, no stemming, no
//! model involvement, zero cost.

/// Trigger terms for prompt-injection, role-override, and abuse attempts.
/// Carried from the upstream deployment, which served a bilingual
/// (en/pt-BR) audience; the Portuguese entries stay because they are data,
/// not copy.
const DENY_LIST: &[&str] = &[
    "ignore",
    "regras",
    "rules",
    "prompt",
    "bypass",
    "override",
    "esqueça",
    "forget",
    "reset",
    "disable",
    "system",
    "roleplay",
    "jailbreak",
    "hack",
    "admin",
    "root",
    "simule",
    "finga",
    "xingue",
    "ofenda",
    "instrucoes",
    "instructions",
    "dan mode",
    "ignorar",
    "desativar",
    "modo desenvolvedor",
];

/// Returns the first matching deny-list term, or `None` when the message is
/// clean.
pub fn screen(text: &str) -> Option<&'static str> {
    let normalized = text.to_lowercase();
    DENY_LIST.iter().find(|term| normalized.contains(*term)).copied()
}
