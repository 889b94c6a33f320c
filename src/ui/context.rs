//! Terminal capability detection
//!
//! Decides whether the CLI draws cliclack steps and spinners, and whether it
//! may stop to ask a question. Both are off in CI, in pipes, on dumb
//! terminals and when `GARDEN_CACHE_PLAIN` is set.

use std::io::IsTerminal;

/// Variables whose presence means "running under CI"
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Forces plain `[OK]`/`[FAIL]` lines even on a terminal
pub const PLAIN_VAR: &str = "GARDEN_CACHE_PLAIN";

/// How the current process may talk to the user
#[derive(Debug, Clone)]
pub struct UiContext {
    fancy: bool,
    prompts: bool,
    auto_yes: bool,
}

impl UiContext {
    /// Inspect the real terminal and environment
    pub fn detect() -> Self {
        Self::from_env(
            std::io::stdout().is_terminal(),
            std::io::stdin().is_terminal(),
            |name| std::env::var(name).ok(),
        )
    }

    /// Plain output, no prompts
    pub fn non_interactive() -> Self {
        Self {
            fancy: false,
            prompts: false,
            auto_yes: false,
        }
    }

    fn from_env(stdout_tty: bool, stdin_tty: bool, var: impl Fn(&str) -> Option<String>) -> Self {
        let under_ci = CI_VARS.iter().any(|name| var(name).is_some());
        let plain = var(PLAIN_VAR).is_some_and(|v| !v.is_empty() && v != "0");
        let dumb = var("TERM").as_deref() == Some("dumb");

        let fancy = stdout_tty && !under_ci && !plain && !dumb;
        Self {
            fancy,
            prompts: fancy && stdin_tty,
            auto_yes: false,
        }
    }

    /// Answer yes to every confirmation (`--yes`)
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    /// Whether a confirmation may block on stdin
    pub fn is_interactive(&self) -> bool {
        self.prompts
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Whether to draw spinners, progress bars and cliclack steps
    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }
}
