//! Line-oriented navigation scripts for the command line driver
//!
//! ```text
//! # comment
//! open inventory [1, "sword"]
//! pop panel
//! notify gold_changed 250
//! ```

use crate::descriptor::Layer;
use crate::instance::ViewArgs;
use crate::manager::ViewManager;
use anyhow::{Context, Result, anyhow, bail};
use log::info;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { name: String, args: ViewArgs },
    Close { name: String },
    Remove { name: String },
    Pop { layer: Option<Layer> },
    PopThenOpen { name: String, args: ViewArgs },
    PopAllThenOpen { name: String, args: ViewArgs },
    CloseAllThenOpen { name: String, args: ViewArgs },
    Notify { event: String, args: ViewArgs },
    Clear,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Open { name, .. } => write!(f, "open {}", name),
            Command::Close { name } => write!(f, "close {}", name),
            Command::Remove { name } => write!(f, "remove {}", name),
            Command::Pop { layer: Some(layer) } => write!(f, "pop {}", layer),
            Command::Pop { layer: None } => write!(f, "pop"),
            Command::PopThenOpen { name, .. } => write!(f, "pop-then-open {}", name),
            Command::PopAllThenOpen { name, .. } => write!(f, "pop-all-then-open {}", name),
            Command::CloseAllThenOpen { name, .. } => write!(f, "close-all-then-open {}", name),
            Command::Notify { event, .. } => write!(f, "notify {}", event),
            Command::Clear => write!(f, "clear"),
        }
    }
}

/// A JSON array becomes the argument list; any other value is a single argument
fn parse_args(raw: Option<&str>) -> Result<ViewArgs> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Vec::new());
    };
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid JSON arguments: {}", raw))?;
    Ok(match value {
        Value::Array(values) => values,
        other => vec![other],
    })
}

fn parse_line(line: &str) -> Result<Command> {
    let mut parts = line.splitn(3, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let target = parts.next().map(str::trim).filter(|t| !t.is_empty());
    let rest = parts.next();

    let name = || {
        target
            .map(str::to_string)
            .ok_or_else(|| anyhow!("'{}' needs a view name", verb))
    };

    let command = match verb {
        "open" => Command::Open { name: name()?, args: parse_args(rest)? },
        "close" => Command::Close { name: name()? },
        "remove" => Command::Remove { name: name()? },
        "pop" => Command::Pop {
            layer: target
                .map(|layer| layer.parse::<Layer>().map_err(|e| anyhow!(e)))
                .transpose()?,
        },
        "pop-then-open" => Command::PopThenOpen { name: name()?, args: parse_args(rest)? },
        "pop-all-then-open" => Command::PopAllThenOpen { name: name()?, args: parse_args(rest)? },
        "close-all-then-open" => {
            Command::CloseAllThenOpen { name: name()?, args: parse_args(rest)? }
        }
        "notify" => Command::Notify {
            event: target
                .map(str::to_string)
                .ok_or_else(|| anyhow!("'notify' needs an event name"))?,
            args: parse_args(rest)?,
        },
        "clear" => Command::Clear,
        other => bail!("Unknown command '{}'", other),
    };
    Ok(command)
}

/// Parse a whole script. Blank lines and `#` comments are skipped.
pub fn parse(source: &str) -> Result<Vec<Command>> {
    source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| parse_line(line).with_context(|| format!("line {}", number)))
        .collect()
}

impl Command {
    /// Run against a manager. Returns whether the command took effect.
    pub async fn apply(&self, manager: &ViewManager) -> bool {
        match self {
            Command::Open { name, args } => manager.open(name, args.clone()).await,
            Command::Close { name } => manager.close(name).await,
            Command::Remove { name } => manager.remove(name).await,
            Command::Pop { layer: Some(layer) } => manager.pop_layer(*layer).await,
            Command::Pop { layer: None } => manager.pop().await,
            Command::PopThenOpen { name, args } => manager.pop_then_open(name, args.clone()).await,
            Command::PopAllThenOpen { name, args } => {
                manager.pop_all_then_open(name, args.clone()).await
            }
            Command::CloseAllThenOpen { name, args } => {
                manager.close_all_then_open(name, args.clone()).await
            }
            Command::Notify { event, args } => manager.notify(event, args) > 0,
            Command::Clear => {
                manager.clear().await;
                true
            }
        }
    }
}

/// Apply every command in order, logging the outcome of each
pub async fn run(manager: &ViewManager, commands: &[Command]) -> Vec<bool> {
    let mut outcomes = Vec::with_capacity(commands.len());
    for command in commands {
        let applied = command.apply(manager).await;
        info!("{} -> {}", command, if applied { "applied" } else { "dropped" });
        outcomes.push(applied);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_script() {
        let commands = parse(
            r#"
            # open the shop with two args
            open shop [1, "sword"]
            notify gold_changed 250
            pop dialog
            pop
            close-all-then-open shop_tab_sell
            clear
            "#,
        )
        .unwrap();

        assert_eq!(
            commands,
            vec![
                Command::Open {
                    name: "shop".to_string(),
                    args: vec![json!(1), json!("sword")],
                },
                Command::Notify {
                    event: "gold_changed".to_string(),
                    args: vec![json!(250)],
                },
                Command::Pop { layer: Some(Layer::Dialog) },
                Command::Pop { layer: None },
                Command::CloseAllThenOpen {
                    name: "shop_tab_sell".to_string(),
                    args: vec![],
                },
                Command::Clear,
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let err = parse("open a\nfly away").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));

        assert!(parse("open").is_err());
        assert!(parse("open a [1,").is_err());
        assert!(parse("pop sideways").is_err());
    }
}
