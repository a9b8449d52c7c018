//! Print every non-empty cell of a workbook as `Sheet!A1<TAB>value`.
//! Handy when mapping a new questionnaire revision.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use credit_intake_lib::excel::load_workbook_from_path;

#[derive(Parser)]
#[command(name = "dump_workbook", about = "List the non-empty cells of a workbook")]
struct Args {
    path: PathBuf,
    /// Only dump this sheet
    #[arg(long)]
    sheet: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let workbook =
        load_workbook_from_path(&args.path).with_context(|| format!("failed to load {}", args.path.display()))?;

    for sheet in workbook.sheets() {
        if let Some(only) = &args.sheet {
            if !sheet.name().eq_ignore_ascii_case(only) {
                continue;
            }
        }
        for (address, value) in sheet.cells() {
            println!("{}\t{}", sheet.location(address), value.as_text().replace('\n', "\\n"));
        }
    }
    Ok(())
}
