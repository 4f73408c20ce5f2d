use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Where IN reads its values from and OUT sends them to.
pub trait Console {
    /// Raw text for one IN on register `reg`; `None` once input is exhausted.
    fn input(&mut self, reg: u32) -> io::Result<Option<String>>;
    fn output(&mut self, reg: u32, value: i8) -> io::Result<()>;
}

/// Interactive console on stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn input(&mut self, reg: u32) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "Enter value for register {reg}: ")?;
        stdout.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn output(&mut self, reg: u32, value: i8) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "Output from register {reg}: {value}")?;
        stdout.flush()
    }
}

/// Console fed from a queue of prepared inputs; outputs are recorded.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    pub outputs: Vec<(u32, i8)>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

impl Console for ScriptedConsole {
    fn input(&mut self, _reg: u32) -> io::Result<Option<String>> {
        Ok(self.inputs.pop_front())
    }

    fn output(&mut self, reg: u32, value: i8) -> io::Result<()> {
        self.outputs.push((reg, value));
        Ok(())
    }
}
