//! Terminal implementations of the host capabilities plus the interactive study loop.

use std::{io::Write, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use client_core::{
    study::{StudyView, StudyStep},
    ConfirmPrompt, Face, Navigator, Route, StudyError, StudySession, StudySessionController,
    StudyState,
};
use parking_lot::Mutex;
use tokio::{
    io::{self, AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::Mutex as AsyncMutex,
};
use tracing::info;

/// Line-oriented stdin shared by prompts and the study loop.
pub struct Console {
    lines: AsyncMutex<Lines<BufReader<Stdin>>>,
}

impl Console {
    pub fn stdin() -> Arc<Self> {
        Arc::new(Self {
            lines: AsyncMutex::new(BufReader::new(io::stdin()).lines()),
        })
    }

    /// `None` on end of input.
    pub async fn read_line(&self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        let line = self.lines.lock().await.next_line().await?;
        Ok(line.map(|line| line.trim().to_string()))
    }
}

pub struct TerminalConfirm {
    console: Arc<Console>,
    assume_yes: bool,
}

impl TerminalConfirm {
    pub fn new(console: Arc<Console>, assume_yes: bool) -> Self {
        Self {
            console,
            assume_yes,
        }
    }
}

#[async_trait]
impl ConfirmPrompt for TerminalConfirm {
    async fn confirm(&self, message: &str) -> bool {
        println!("{message}");
        if self.assume_yes {
            println!("[y/N] y (--yes)");
            return true;
        }
        match self.console.read_line("[y/N] ").await {
            Ok(Some(answer)) => is_yes(&answer),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read confirmation; treating as no");
                false
            }
        }
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// The CLI has no screens to switch; it remembers where the app would have gone.
#[derive(Default)]
pub struct TerminalNavigator {
    routes: Mutex<Vec<Route>>,
}

impl TerminalNavigator {
    pub fn last(&self) -> Option<Route> {
        self.routes.lock().last().copied()
    }
}

impl Navigator for TerminalNavigator {
    fn push(&self, route: Route) {
        info!(route = %route, "navigate");
        self.routes.lock().push(route);
    }
}

pub fn render_study(session: &StudySession) -> String {
    let mut out = format!("{}\n", session.heading());
    match session.view() {
        StudyView::NotEnoughCards { message } => out.push_str(&message),
        StudyView::Card {
            progress,
            text,
            face,
        } => {
            let label = match face {
                Face::Front => "Question",
                Face::Back => "Answer",
            };
            out.push_str(&format!("{progress}\n{label}: {text}"));
        }
        StudyView::Complete => out.push_str("Session complete."),
    }
    out
}

fn controls_prompt(session: &StudySession) -> String {
    let controls = session.controls();
    let mut keys = Vec::new();
    if controls.add_cards {
        keys.push("[a]dd cards");
    }
    if controls.flip {
        keys.push("[f]lip");
    }
    if controls.next {
        keys.push("[n]ext");
    }
    keys.push("[q]uit");
    format!("{} > ", keys.join(", "))
}

pub async fn run_study(controller: &mut StudySessionController, console: &Console) -> Result<()> {
    loop {
        let Some(session) = controller.session() else {
            return Ok(());
        };
        println!("\n{}", render_study(session));
        let prompt = controls_prompt(session);
        let not_enough = matches!(session.state(), StudyState::NotEnoughCards { .. });

        let Some(input) = console.read_line(&prompt).await? else {
            controller.exit();
            return Ok(());
        };

        match input.as_str() {
            "a" if not_enough => {
                controller.add_cards()?;
                return Ok(());
            }
            "f" if !not_enough => {
                controller.flip()?;
            }
            "n" if !not_enough => match controller.advance().await {
                Ok(StudyStep::Exited) => return Ok(()),
                Ok(StudyStep::Restarted) => println!("Starting over."),
                Ok(StudyStep::Continue(_)) => {}
                Err(StudyError::AdvanceBeforeFlip) => println!("Flip the card first."),
                Err(err) => return Err(err.into()),
            },
            "q" => {
                controller.exit();
                return Ok(());
            }
            other => println!("Unknown command {other:?}."),
        }
    }
}

#[cfg(test)]
#[path = "tests/terminal_tests.rs"]
mod tests;
