use anyhow::{bail, Result};
use console::Term;
use dialoguer::Confirm;

/// Ask before a destructive change. Without a terminal the answer must come from `--yes`.
pub(crate) fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !Term::stderr().is_term() {
        bail!("Refusing to modify captions without confirmation in a non-interactive session (pass --yes)");
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}
