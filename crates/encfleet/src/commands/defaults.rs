//! Baseline settings command handler.

use encfleet_core::default_settings;

use crate::cli::{DefaultsArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &DefaultsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let doc = default_settings(&args.id);
    // A settings tree has no tabular form; table falls back to pretty JSON.
    let out = match global.output() {
        OutputFormat::Table => output::render_json_pretty(&doc)?,
        format => output::render_single(format, &doc, |_| String::new(), |d| {
            d.keys().collect::<Vec<_>>().join("\n")
        })?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
