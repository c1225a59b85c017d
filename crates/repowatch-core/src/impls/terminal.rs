//! TerminalRenderer - 端末向けの表示

use std::io::{self, Stdout, Write};
use std::sync::{Mutex, PoisonError};

use crate::domain::TaskMode;
use crate::ports::{DisplayPayload, Renderer};

const RULE_WIDTH: usize = 60;

/// Writes framed summary blocks to `W`.
pub struct TerminalRenderer<W> {
    out: Mutex<W>,
}

impl TerminalRenderer<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render(&self, payload: &DisplayPayload) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        match payload {
            DisplayPayload::Summary {
                repo_name,
                repo_url,
                mode,
                text,
                cost,
                show_costs,
                change_count,
            } => {
                let rule = "=".repeat(RULE_WIDTH);
                let title = match mode {
                    TaskMode::News => format!("📊 {repo_name} Summary"),
                    TaskMode::Forks => format!("🍴 {repo_name} Forks Summary"),
                };
                writeln!(out)?;
                writeln!(out, "{rule}")?;
                writeln!(out, "{title} ({change_count} changes)")?;
                writeln!(out, "{repo_url}")?;
                writeln!(out, "{rule}")?;
                writeln!(out, "{}", text.trim_end())?;
                if *show_costs
                    && let Some(cost) = cost.as_ref().filter(|c| !c.is_zero())
                {
                    writeln!(out, "💰 Cost: {cost}")?;
                }
                writeln!(out, "{rule}")?;
                writeln!(out)?;
            }
            DisplayPayload::NoUpdates { repo_name } => {
                writeln!(out, "✓ {repo_name}: No new updates since last check")?;
            }
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CostInfo;

    fn summary(show_costs: bool) -> DisplayPayload {
        DisplayPayload::Summary {
            repo_name: "Tokio".into(),
            repo_url: "https://github.com/tokio-rs/tokio".into(),
            mode: TaskMode::News,
            text: "Two fixes landed.\n".into(),
            cost: Some(CostInfo {
                estimated_cost: 0.0123,
                total_tokens: 4_000,
                ..CostInfo::default()
            }),
            show_costs,
            change_count: 2,
        }
    }

    fn rendered(payload: &DisplayPayload) -> String {
        let renderer = TerminalRenderer::new(Vec::new());
        renderer.render(payload).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn summary_block_is_framed() {
        let out = rendered(&summary(false));
        let rule = "=".repeat(RULE_WIDTH);
        assert_eq!(out.matches(&rule).count(), 3);
        assert!(out.contains("📊 Tokio Summary (2 changes)"));
        assert!(out.contains("https://github.com/tokio-rs/tokio"));
        assert!(out.contains("Two fixes landed."));
        assert!(!out.contains("Cost"));
    }

    #[test]
    fn cost_line_only_when_enabled() {
        let out = rendered(&summary(true));
        assert!(out.contains("💰 Cost: ($0.012, 4000 tokens)"));
    }

    #[test]
    fn no_updates_line() {
        let out = rendered(&DisplayPayload::NoUpdates {
            repo_name: "Serde".into(),
        });
        assert_eq!(out, "✓ Serde: No new updates since last check\n");
    }
}
