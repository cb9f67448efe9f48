//! Modules command - list built-in API modules.

use anyhow::Result;
use pagetree_modules::ModuleRegistry;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the modules command.
pub fn run(cli: &Cli) -> Result<()> {
    let descriptors = ModuleRegistry::all();
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            for descriptor in descriptors {
                println!("{}", formatter.format_module(descriptor, cli.verbose));
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_modules(descriptors)?);
        }
    }
    Ok(())
}
