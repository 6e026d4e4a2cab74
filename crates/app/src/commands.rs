use case_core::model::OptionId;

/// One line of learner input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer(OptionId),
    Next,
    Back,
    Goto(usize),
    Retry,
    CloseHint,
    Status,
    Help,
    Quit,
    /// Blank line: counts as activity, nothing else.
    Nothing,
    Unknown(String),
}

impl Input {
    /// Parse a command. Step numbers are 1-based on input.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Self::Nothing;
        };
        let arg = parts.next();
        match (head.to_ascii_lowercase().as_str(), arg) {
            ("a" | "answer", Some(option)) => Self::Answer(OptionId::new(option)),
            ("n" | "next", None) => Self::Next,
            ("b" | "back", None) => Self::Back,
            ("g" | "goto", Some(raw)) => match raw.parse::<usize>() {
                Ok(number) if number > 0 => Self::Goto(number - 1),
                _ => Self::Unknown(line.trim().to_string()),
            },
            ("r" | "retry", None) => Self::Retry,
            ("h" | "hint", None) => Self::CloseHint,
            ("s" | "status", None) => Self::Status,
            ("?" | "help", None) => Self::Help,
            ("q" | "quit", None) => Self::Quit,
            _ => Self::Unknown(line.trim().to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  a <option>   answer with the given option id
  n            next step
  b            previous step
  g <number>   jump to step <number>
  r            retry after an incorrect answer
  h            close the hint
  s            show the current step again
  q            quit";
