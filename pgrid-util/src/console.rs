use std::collections::VecDeque;
use std::env;
use std::io::{self, Write};

use anyhow::Context as _;
use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

static PB_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} {elapsed}";
static PB_TICK_MS: u64 = 80;

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ConsoleConfig {
    /// Answers yes to every confirmation without asking.
    pub assume_yes: bool,
}

#[derive(Debug)]
enum Target {
    Stderr(Term),
    Memory {
        written: Vec<u8>,
        answers: VecDeque<String>,
    },
    Discard,
}

/// Destination of every progress and diagnostic line pgrid prints.
///
/// Commands write to the terminal (stderr), tests write to memory and answer
/// prompts from a script, and background work such as image downloads writes
/// nowhere.
#[derive(Debug)]
pub struct Console {
    target: Target,
    conf: ConsoleConfig,
}

impl Console {
    pub fn term(conf: ConsoleConfig) -> Self {
        Self {
            target: Target::Stderr(Term::stderr()),
            conf,
        }
    }

    pub fn buf(conf: ConsoleConfig) -> Self {
        Self::buf_with_input(conf, "")
    }

    /// In-memory console that answers its prompts with the lines of `input`.
    pub fn buf_with_input(conf: ConsoleConfig, input: &str) -> Self {
        let answers = input
            .lines()
            .map(|line| line.trim_end_matches('\r').to_owned())
            .collect();
        Self {
            target: Target::Memory {
                written: Vec::new(),
                answers,
            },
            conf,
        }
    }

    pub fn sink(conf: ConsoleConfig) -> Self {
        Self {
            target: Target::Discard,
            conf,
        }
    }

    pub fn conf(&self) -> &ConsoleConfig {
        &self.conf
    }

    /// Everything written to an in-memory console.
    pub fn take_output(self) -> crate::Result<String> {
        match self.target {
            Target::Memory { written, .. } => {
                String::from_utf8(written).context("Console output is not utf-8")
            }
            _ => Err(anyhow::anyhow!("Console does not keep its output")),
        }
    }

    pub fn warn(&mut self, message: &str) -> io::Result<()> {
        writeln!(self, "WARN: {}", message)
    }

    pub fn confirm(&mut self, message: &str, default: bool) -> io::Result<bool> {
        if self.conf.assume_yes {
            return Ok(true);
        }
        let hint = if default { "Y/n" } else { "y/N" };
        let answer = self.prompt(&format!("{} ({}) ", message, hint), false)?;
        Ok(match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        })
    }

    /// Value of `env_name` if it is set, otherwise the answer to `prompt`.
    ///
    /// A secret is never echoed, neither typed nor read from env.
    pub fn env_or_prompt(&mut self, env_name: &str, prompt: &str, secret: bool) -> io::Result<String> {
        match env::var(env_name) {
            Ok(value) => {
                let shown = if secret { "********" } else { value.as_str() };
                writeln!(self, "{}{} (from env {})", prompt, shown, env_name)?;
                Ok(value)
            }
            Err(_) => self.prompt(prompt, secret),
        }
    }

    pub fn prompt(&mut self, prompt: &str, secret: bool) -> io::Result<String> {
        write!(self, "{}", prompt)?;
        self.flush()?;
        match &mut self.target {
            Target::Stderr(term) if secret => term.read_secure_line(),
            Target::Stderr(term) => term.read_line(),
            Target::Memory { answers, .. } => Ok(answers.pop_front().unwrap_or_default()),
            Target::Discard => Ok(String::new()),
        }
    }

    /// Bar counting finished items, drawn only on a terminal.
    pub fn progress_bar(&self, len: u64) -> ProgressBar {
        let target = match &self.target {
            Target::Stderr(term) => ProgressDrawTarget::to_term(term.clone(), None),
            _ => ProgressDrawTarget::hidden(),
        };
        let pb = ProgressBar::with_draw_target(len, target);
        pb.set_style(ProgressStyle::default_bar().template(PB_TEMPLATE));
        pb.enable_steady_tick(PB_TICK_MS);
        pb
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.target {
            Target::Stderr(term) => term.write(buf),
            Target::Memory { written, .. } => written.write(buf),
            Target::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.target {
            Target::Stderr(term) => term.flush(),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn() -> anyhow::Result<()> {
        let mut cnsl = Console::buf(ConsoleConfig::default());
        cnsl.warn("session expired")?;
        assert_eq!(cnsl.take_output()?, "WARN: session expired\n");
        assert!(Console::sink(ConsoleConfig::default()).take_output().is_err());
        Ok(())
    }

    #[test]
    fn test_confirm() -> anyhow::Result<()> {
        let tests = &[
            (true, "", false, true),
            (false, "y", false, true),
            (false, "Yes\r\n", false, true),
            (false, "n", true, false),
            (false, "NO", true, false),
            (false, "maybe", true, true),
            (false, "maybe", false, false),
            (false, "", true, true),
            (false, "", false, false),
        ];
        for (assume_yes, input, default, expected) in tests {
            let conf = ConsoleConfig {
                assume_yes: *assume_yes,
            };
            let mut cnsl = Console::buf_with_input(conf, input);
            let actual = cnsl.confirm("Submit?", *default)?;
            assert_eq!(actual, *expected, "input {:?}", input);
        }
        Ok(())
    }

    #[test]
    fn test_prompt_answers_in_order() -> anyhow::Result<()> {
        let mut cnsl = Console::buf_with_input(ConsoleConfig::default(), "student\nsecret\n");
        assert_eq!(cnsl.prompt("username: ", false)?, "student");
        assert_eq!(cnsl.prompt("password: ", true)?, "secret");
        assert_eq!(cnsl.prompt("again: ", false)?, "");
        assert_eq!(cnsl.take_output()?, "username: password: again: ");
        Ok(())
    }

    #[test]
    fn test_env_or_prompt() -> anyhow::Result<()> {
        let env_name = if cfg!(windows) { "APPDATA" } else { "HOME" };
        let env_val = env::var(env_name)?;

        let mut cnsl = Console::buf(ConsoleConfig::default());
        assert_eq!(cnsl.env_or_prompt(env_name, "home: ", true)?, env_val);
        assert!(!cnsl.take_output()?.contains(&env_val));

        let mut cnsl = Console::buf_with_input(ConsoleConfig::default(), "student\n");
        let actual = cnsl.env_or_prompt("PGRID_TEST_UNKNOWN_VAR", "username: ", false)?;
        assert_eq!(actual, "student");

        let mut cnsl = Console::sink(ConsoleConfig::default());
        let actual = cnsl.env_or_prompt("PGRID_TEST_UNKNOWN_VAR", "username: ", false)?;
        assert_eq!(actual, "");
        Ok(())
    }
}
