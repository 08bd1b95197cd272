//! CLI handlers for `stride macros` subcommands.

use anyhow::Result;

use stride_core::macros::{MacroTable, normalize_token};

use crate::MacroCommands;

/// Dispatch a `MacroCommands` variant to the appropriate handler.
pub fn run_macro_command(command: MacroCommands) -> Result<()> {
    let table = MacroTable::builtin();
    match command {
        MacroCommands::List { verbose } => {
            print!("{}", render_list(table, verbose));
            Ok(())
        }
        MacroCommands::Expand { token } => {
            let Some(steps) = table.expand(&token) else {
                anyhow::bail!(
                    "unknown macro {:?}; run `stride macros list` to see available macros",
                    normalize_token(&token)
                );
            };
            for step in steps {
                println!("{step}");
            }
            Ok(())
        }
    }
}

fn render_list(table: &MacroTable, verbose: bool) -> String {
    let name_w = table
        .entries()
        .iter()
        .map(|m| m.name.len() + 1)
        .max()
        .unwrap_or(4)
        .max(4);
    let disc_w = 10;

    let mut out = format!("{:<name_w$}  {:<disc_w$}  DESCRIPTION\n", "NAME", "DISCIPLINE");
    for m in table.entries() {
        out.push_str(&format!(
            "{:<name_w$}  {:<disc_w$}  {}\n",
            format!("@{}", m.name),
            m.discipline,
            m.description,
        ));
        if verbose {
            if !m.aliases.is_empty() {
                out.push_str(&format!("    aliases: {}\n", m.aliases.join(", ")));
            }
            for step in &m.steps {
                out.push_str(&format!("    - {step}\n"));
            }
        }
    }
    out
}
