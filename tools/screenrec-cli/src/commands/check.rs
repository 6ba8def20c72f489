//! Check capture capabilities.

use screenrec_capture_engine::probe;
use screenrec_platform_synthetic::SyntheticPlatform;

pub fn run() -> anyhow::Result<()> {
    println!("screenrec System Check");
    println!("{}", "=".repeat(50));

    let synthetic = SyntheticPlatform::default();
    let report = probe(&synthetic.platform());

    for line in report.lines() {
        println!("  {line}");
    }

    println!();
    println!("Preferred format: {}", report.format_label());

    let all_required_ok = report
        .capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    match report.ensure_supported() {
        Ok(()) if all_required_ok => {
            println!("All required capabilities are available. screenrec is ready.")
        }
        Ok(()) => println!("Screen capture works, but recording support is incomplete."),
        Err(e) => println!("{}", e.user_message()),
    }

    Ok(())
}
