//! Check the environment and diagnose issues.

use crate::browser::chromium::find_chromium;
use crate::engine::axe::DEFAULT_AXE_SOURCE_URL;
use anyhow::Result;
use std::time::Duration;

/// Report on Chromium availability and rule-engine source reachability.
pub async fn run() -> Result<()> {
    let mut healthy = true;

    match find_chromium() {
        Some(path) => println!("  ok  Chromium found: {}", path.display()),
        None => {
            healthy = false;
            println!("  !!  Chromium not found.");
            println!("      Install Google Chrome/Chromium or set A11Y_AUDIT_CHROMIUM_PATH.");
        }
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    match client.head(DEFAULT_AXE_SOURCE_URL).send().await {
        Ok(resp) if resp.status().is_success() => {
            println!("  ok  axe-core source reachable: {DEFAULT_AXE_SOURCE_URL}");
        }
        Ok(resp) => {
            healthy = false;
            println!("  !!  axe-core source returned HTTP {}", resp.status());
        }
        Err(e) => {
            healthy = false;
            println!("  !!  axe-core source unreachable: {e}");
            println!("      Pass --axe-source to use a mirror.");
        }
    }

    if healthy {
        println!("  All checks passed.");
    } else {
        std::process::exit(1);
    }
    Ok(())
}
