pub mod builtins;
pub mod compile;
pub mod env;
pub mod ops;
pub mod symbol;

use std::io::{self, Stdout, Write};
use std::rc::Rc;

use num_traits::ToPrimitive;
use tracing::{debug, info, trace, warn};

use builtins::BuiltinFunction;
use env::Environment;
use symbol::{Closure, Delta, Symbol};

use crate::config::{BuiltinPolicy, Config, UnboundPolicy};
use crate::error::{Result, RpalError};

/// The control-stack-environment machine.
///
/// Both sequences keep their top at the end: the next control symbol is
/// `control.last()`, the most recent value is `stack.last()`.
pub struct Machine<W: Write = Stdout> {
    control: Vec<Symbol>,
    stack: Vec<Symbol>,
    environments: Vec<Environment>,
    current: usize,
    steps: usize,
    unbound: UnboundPolicy,
    builtins: BuiltinPolicy,
    out: W,
}

impl Machine<Stdout> {
    pub fn new(program: Rc<Delta>, config: &Config) -> Machine<Stdout> {
        Machine::with_output(program, config, io::stdout())
    }
}

impl<W: Write> Machine<W> {
    /// `Print` writes to `out`.
    pub fn with_output(program: Rc<Delta>, config: &Config, out: W) -> Machine<W> {
        Machine {
            control: vec![Symbol::Env(0), Symbol::Delta(program)],
            stack: vec![Symbol::Env(0)],
            environments: vec![Environment::root()],
            current: 0,
            steps: 0,
            unbound: config.unbound,
            builtins: config.builtins,
            out,
        }
    }

    pub fn control(&self) -> &[Symbol] {
        &self.control
    }

    pub fn stack(&self) -> &[Symbol] {
        &self.stack
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn current_environment(&self) -> usize {
        self.current
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_done(&self) -> bool {
        self.control.is_empty()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs until the control is empty and returns the answer.
    pub fn run(&mut self) -> Result<Symbol> {
        info!("running program");
        while self.step()? {}
        let answer = self.result()?;
        info!(steps = self.steps, environments = self.environments.len(), "program finished");
        Ok(answer)
    }

    /// The value on top of the stack once the machine is done.
    pub fn result(&self) -> Result<Symbol> {
        self.stack
            .last()
            .cloned()
            .ok_or(RpalError::StackUnderflow { operation: "reading the result" })
    }

    /// Executes one control symbol. Returns `false` once there is nothing
    /// left to execute.
    pub fn step(&mut self) -> Result<bool> {
        let Some(symbol) = self.control.pop() else {
            return Ok(false);
        };
        self.steps += 1;
        trace!(step = self.steps, symbol = %symbol, env = self.current, "step");
        match symbol {
            Symbol::Id(name) => {
                let value = self.lookup(&name)?;
                self.stack.push(value);
            }
            Symbol::Lambda(closure) => {
                self.stack.push(Symbol::Lambda(Closure {
                    env: self.current,
                    ..closure
                }));
            }
            Symbol::Gamma => self.apply()?,
            Symbol::Env(index) => self.exit_environment(index)?,
            Symbol::Unary(op) => {
                let rand = self.pop("unary operator")?;
                self.stack.push(ops::apply_unary(op, rand)?);
            }
            Symbol::Binary(op) => {
                let left = self.pop("binary operator")?;
                let right = self.pop("binary operator")?;
                self.stack.push(ops::apply_binary(op, left, right)?);
            }
            Symbol::Beta => self.branch()?,
            Symbol::Tau(arity) => {
                if self.stack.len() < arity {
                    return Err(RpalError::StackUnderflow { operation: "tuple construction" });
                }
                let mut items = self.stack.split_off(self.stack.len() - arity);
                items.reverse();
                self.stack.push(Symbol::tuple(items));
            }
            Symbol::Delta(delta) => self.control.extend(delta.body.iter().cloned()),
            Symbol::BBlock(body) => self.control.extend(body.iter().cloned()),
            value => self.stack.push(value),
        }
        Ok(true)
    }

    fn pop(&mut self, operation: &'static str) -> Result<Symbol> {
        self.stack.pop().ok_or(RpalError::StackUnderflow { operation })
    }

    fn lookup(&self, name: &str) -> Result<Symbol> {
        if let Some(value) = env::lookup(&self.environments, self.current, name) {
            return Ok(value.clone());
        }
        if let Some(function) = BuiltinFunction::from_name(name) {
            return Ok(Symbol::Builtin(function.into()));
        }
        match self.unbound {
            UnboundPolicy::Permissive => {
                warn!(name, env = self.current, "unbound identifier");
                Ok(Symbol::Error(name.to_string()))
            }
            UnboundPolicy::Strict => Err(RpalError::Unbound(name.to_string())),
        }
    }

    fn apply(&mut self) -> Result<()> {
        let function = self.pop("application")?;
        match function {
            Symbol::Lambda(closure) => {
                let argument = self.pop("application")?;
                self.enter_environment(closure, argument)?;
            }
            Symbol::Builtin(evaluation) => {
                let argument = self.pop("application")?;
                let value = evaluation.apply(argument, self.builtins, &mut self.out)?;
                self.stack.push(value);
            }
            Symbol::Tuple(items) => {
                let index = match self.pop("tuple selection")? {
                    Symbol::Int(index) => index,
                    other => {
                        return Err(RpalError::Type {
                            operator: "tuple selection".into(),
                            operands: format!("Tuple, {}", other.kind()),
                        });
                    }
                };
                let item = index
                    .to_usize()
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| items.get(i))
                    .ok_or_else(|| RpalError::IndexOutOfRange {
                        index: index.to_string(),
                        len: items.len(),
                    })?;
                self.stack.push(item.clone());
            }
            Symbol::YStar => match self.pop("fixed point")? {
                Symbol::Lambda(closure) => self.stack.push(Symbol::Eta(closure)),
                other => {
                    return Err(RpalError::Type {
                        operator: "Y*".into(),
                        operands: other.kind().into(),
                    });
                }
            },
            Symbol::Eta(closure) => {
                self.stack.push(Symbol::Eta(closure.clone()));
                self.stack.push(Symbol::Lambda(closure));
                self.control.extend([Symbol::Gamma, Symbol::Gamma]);
            }
            other => return Err(RpalError::NotApplicable(other.kind())),
        }
        Ok(())
    }

    fn enter_environment(&mut self, closure: Closure, argument: Symbol) -> Result<()> {
        let index = self.environments.len();
        let mut env = Environment::new(index, Some(closure.env));
        match closure.params.as_slice() {
            [] => {}
            [name] => env.bind(name.as_str(), argument),
            names => {
                let items = match argument {
                    Symbol::Tuple(items) => items,
                    other => {
                        return Err(RpalError::Type {
                            operator: "tuple pattern".into(),
                            operands: other.kind().into(),
                        });
                    }
                };
                if items.len() != names.len() {
                    return Err(RpalError::PatternArity {
                        expected: names.len(),
                        found: items.len(),
                    });
                }
                for (name, value) in names.iter().zip(items.iter()) {
                    env.bind(name.as_str(), value.clone());
                }
            }
        }
        debug!(env = index, parent = closure.env, lambda = closure.index, "entering environment");
        self.environments.push(env);
        self.current = index;
        self.control.push(Symbol::Env(index));
        self.control.extend(closure.body.body.iter().cloned());
        self.stack.push(Symbol::Env(index));
        Ok(())
    }

    fn exit_environment(&mut self, index: usize) -> Result<()> {
        if self.stack.len() < 2 {
            return Err(RpalError::StackUnderflow { operation: "environment exit" });
        }
        // the marker sits just below the call's result
        match self.stack.remove(self.stack.len() - 2) {
            Symbol::Env(marker) if marker == index => {}
            other => {
                return Err(RpalError::Internal(format!(
                    "expected environment marker e_{index} under the result, found {other}"
                )));
            }
        }
        if index != 0 {
            self.environments[index].retired = true;
        }
        self.current = self
            .environments
            .iter()
            .rposition(|env| !env.retired)
            .unwrap_or(0);
        debug!(env = index, resumed = self.current, "leaving environment");
        Ok(())
    }

    fn branch(&mut self) -> Result<()> {
        let take_then = match self.pop("conditional")? {
            Symbol::Bool(value) => value,
            other => {
                return Err(RpalError::Type {
                    operator: "->".into(),
                    operands: other.kind().into(),
                });
            }
        };
        if self.control.len() < 2 {
            return Err(RpalError::Internal("conditional without both branches".into()));
        }
        if take_then {
            self.control.pop();
        } else {
            self.control.remove(self.control.len() - 2);
        }
        Ok(())
    }
}
