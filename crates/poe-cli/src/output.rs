//! Terminal and JSON rendering of batch outcomes

use poe_mutations::{BatchOutcome, MutationContext};

/// Print a batch: one line per change, diffs in dry runs, or JSON
pub fn print_batch(batch: &BatchOutcome, context: &MutationContext, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(batch)?);
        return Ok(());
    }

    if !batch.changed {
        println!("No changes");
        return Ok(());
    }

    for outcome in batch.changes() {
        let verb = if batch.dry_run {
            format!("would {}", outcome.action)
        } else {
            outcome.action.to_string()
        };
        println!("{verb} {}", context.display_path(&outcome.path));
        if batch.dry_run {
            for line in &outcome.diff {
                println!("  {line}");
            }
        }
    }

    if batch.dry_run {
        println!();
        println!("Dry run: no files were written");
    }
    Ok(())
}
