//! Terminal confirmation

use std::io::{self, IsTerminal, Write};

use async_trait::async_trait;
use edgeprov_runtime::Confirm;
use tracing::warn;

/// Asks on stdin; refuses when stdin or stdout is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, question: &str) -> bool {
        if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
            warn!(
                question,
                "Non-interactive session; answering no (pass --reuse-existing-datacenters to reuse)"
            );
            return false;
        }

        let question = question.to_string();
        let answer = tokio::task::spawn_blocking(move || -> Result<bool, String> {
            print!("{question} (yes/no): ");
            io::stdout().flush().map_err(|e| e.to_string())?;
            let mut line = String::new();
            io::stdin().read_line(&mut line).map_err(|e| e.to_string())?;
            Ok(is_yes(&line))
        })
        .await;

        match answer {
            Ok(Ok(yes)) => yes,
            Ok(Err(e)) => {
                warn!(error = %e, "Confirmation prompt failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Confirmation prompt failed");
                false
            }
        }
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("yes\n"));
        assert!(is_yes(" Y "));
        assert!(!is_yes("no"));
        assert!(!is_yes(""));
        assert!(!is_yes("yess"));
    }
}
