//! Fingerprint command handler.

use animatic::Script;
use std::path::Path;

/// Print the fingerprint digest and normalized form of a script file.
pub async fn fingerprint_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let script = Script::new(tokio::fs::read_to_string(path).await?);
    let fingerprint = script.fingerprint();

    println!("{}  {}", fingerprint.short(), path.display());
    if fingerprint.is_empty() {
        println!("(script has no non-blank lines)");
    } else {
        println!("{}", fingerprint.as_str());
    }
    Ok(())
}
