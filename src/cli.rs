//! Line commands for the terminal REPL.

use crate::abandonment::LifecycleSignal;
use crate::engagement::ScrollSource;
use crate::funnel::model::{ChoiceField, ToggleField};
use crate::funnel::{HeadlessPresenter, Signal};

pub const HELP: &str = "\
Commands:
  name <text>             type into the first-name field
  pick <field> <value>    check an option (primary_goal, timeline, priority, investment_range)
  check <field> on|off    toggle accepted_conditions or whatsapp_opt_in
  next | prev | submit    navigate
  cta <id>                click a call-to-action
  scroll <ratio>          report scroll progress (0.0-1.0)
  whatsapp                follow the WhatsApp link
  hide | show             page visibility change
  help | quit";

/// One parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Edit the headless inputs.
    Input(InputEdit),
    /// Forward to the funnel.
    Signal(Signal),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEdit {
    Name(String),
    Pick(ChoiceField, String),
    Check(ToggleField, bool),
}

impl InputEdit {
    pub fn apply(self, presenter: &mut HeadlessPresenter) {
        match self {
            Self::Name(name) => presenter.type_name(&name),
            Self::Pick(field, value) => presenter.pick(field, &value),
            Self::Check(field, checked) => presenter.set_checkbox(field, checked),
        }
    }
}

/// Parse one input line. The error is a message for the user.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match head {
        "name" => Command::Input(InputEdit::Name(rest.to_string())),
        "pick" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: pick <field> <value>")?;
            let field = ChoiceField::parse(field).ok_or_else(|| format!("unknown field: {field}"))?;
            Command::Input(InputEdit::Pick(field, value.trim().to_string()))
        }
        "check" => {
            let (field, state) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: check <field> on|off")?;
            let field = ToggleField::parse(field).ok_or_else(|| format!("unknown field: {field}"))?;
            let checked = match state.trim() {
                "on" => true,
                "off" => false,
                other => return Err(format!("expected on or off, got {other}")),
            };
            Command::Input(InputEdit::Check(field, checked))
        }
        "next" => Command::Signal(Signal::Next),
        "prev" => Command::Signal(Signal::Prev),
        "submit" => Command::Signal(Signal::Submit),
        "cta" if !rest.is_empty() => Command::Signal(Signal::CtaClick {
            cta_id: rest.to_string(),
        }),
        "cta" => return Err("usage: cta <id>".to_string()),
        "scroll" => {
            let ratio: f64 = rest
                .parse()
                .map_err(|_| format!("not a ratio: {rest}"))?;
            Command::Signal(Signal::ScrollProgress {
                ratio,
                source: ScrollSource::Native,
            })
        }
        "whatsapp" => Command::Signal(Signal::WhatsappClick),
        "hide" => Command::Signal(Signal::Lifecycle(LifecycleSignal::VisibilityHidden)),
        "show" => Command::Signal(Signal::Lifecycle(LifecycleSignal::VisibilityVisible)),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "/quit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try help)")),
    };
    Ok(command)
}
