use std::io::{self, Stdout, stdout};
use std::panic;

use color_eyre::{config::HookBuilder, eyre};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use rpal::Frame;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn install_hooks() -> color_eyre::Result<()> {
    let (panic_hook, eyre_hook) = HookBuilder::default().into_hooks();

    // convert from a color_eyre PanicHook to a standard panic hook
    let panic_hook = panic_hook.into_panic_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        panic_hook(panic_info);
    }));

    // convert from a color_eyre EyreHook to a eyre ErrorHook
    let eyre_hook = eyre_hook.into_eyre_hook();
    eyre::set_hook(Box::new(
        move |error: &(dyn std::error::Error + 'static)| {
            let _ = restore();
            eyre_hook(error)
        },
    ))?;

    Ok(())
}

pub fn init() -> io::Result<Tui> {
    execute!(stdout(), EnterAlternateScreen)?;
    enable_raw_mode()?;
    Terminal::new(CrosstermBackend::new(stdout()))
}

pub fn restore() -> io::Result<()> {
    execute!(stdout(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Next symbol to run first.
pub fn control_to_string(frame: &Frame) -> String {
    frame.control.iter().rev().cloned().collect::<Vec<_>>().join("\n")
}

/// Top of the stack first.
pub fn stack_to_string(frame: &Frame) -> String {
    frame.stack.iter().rev().cloned().collect::<Vec<_>>().join("\n")
}

/// Newest environment first, the current one marked with `*`.
pub fn env_to_string(frame: &Frame) -> String {
    let mut result = vec![];
    for env in frame.environments.iter().rev() {
        let mut header = format!("e_{}", env.index);
        if let Some(parent) = env.parent {
            header.push_str(&format!(" <- e_{parent}"));
        }
        if env.index == frame.current_env {
            header.push_str(" *");
        }
        if env.retired {
            header.push_str(" (retired)");
        }
        result.push(header);
        result.extend(
            env.bindings
                .iter()
                .map(|var| format!("  {}: {}", var.name, var.value)),
        );
    }
    result.join("\n")
}
