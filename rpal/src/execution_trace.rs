use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::cse::{Machine, compile::compile, env::Environment};
use crate::error::Result;
use crate::tree::Tree;

pub type Value = String;

/// A snapshot of the machine, taken before the symbol named by `label` runs.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub step: usize,
    pub label: String,
    /// Bottom first; the next symbol to run is the last entry.
    pub control: Vec<Value>,
    /// Bottom first; the top of the stack is the last entry.
    pub stack: Vec<Value>,
    pub environments: Vec<EnvFrame>,
    pub current_env: usize,
    /// Everything `Print` has written so far.
    pub output: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvFrame {
    pub index: usize,
    pub parent: Option<usize>,
    pub retired: bool,
    pub bindings: Vec<EnvVar>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    pub value: Value,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrace {
    pub frames: Vec<Frame>,
    /// Set when the program ran to completion.
    pub answer: Option<Value>,
    pub error: Option<String>,
    /// The frame limit was hit before the program finished.
    pub truncated: bool,
}

impl From<&Environment> for EnvFrame {
    fn from(env: &Environment) -> Self {
        EnvFrame {
            index: env.index,
            parent: env.parent,
            retired: env.retired,
            bindings: env
                .bindings()
                .map(|(name, value)| EnvVar {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }
}

fn snapshot(machine: &Machine<Vec<u8>>) -> Frame {
    let label = match machine.control().last() {
        Some(symbol) => symbol.to_string(),
        None => "Done".into(),
    };
    Frame {
        step: machine.steps(),
        label,
        control: machine.control().iter().map(ToString::to_string).collect(),
        stack: machine.stack().iter().map(ToString::to_string).collect(),
        environments: machine.environments().iter().map(EnvFrame::from).collect(),
        current_env: machine.current_environment(),
        output: String::from_utf8_lossy(machine.output()).into_owned(),
    }
}

/// Runs a standardized tree, recording a frame for every machine state.
///
/// Compilation failures are returned as errors. A failure while running is
/// recorded in the trace, after the frames leading up to it.
pub fn trace_program(tree: &Tree, config: &Config) -> Result<ExecutionTrace> {
    let program = compile(tree)?;
    let mut machine = Machine::with_output(program, config, vec![]);
    let max_frames = config.trace.max_frames.max(1);

    let mut frames = vec![snapshot(&machine)];
    let mut error = None;
    let mut truncated = false;
    while !machine.is_done() {
        if frames.len() >= max_frames {
            warn!(max_frames, "trace truncated");
            truncated = true;
            break;
        }
        if let Err(err) = machine.step() {
            warn!(%err, step = machine.steps(), "machine error");
            error = Some(err.to_string());
            break;
        }
        frames.push(snapshot(&machine));
    }

    let answer = match (&error, truncated) {
        (None, false) => match machine.result() {
            Ok(value) => Some(value.answer()),
            Err(err) => {
                error = Some(err.to_string());
                None
            }
        },
        _ => None,
    };
    info!(frames = frames.len(), "traced program");
    Ok(ExecutionTrace {
        frames,
        answer,
        error,
        truncated,
    })
}
