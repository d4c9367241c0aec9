pub mod density;
pub mod pdf2d;
pub mod pdf3d;

use calcopp::workflows::RunReport;

pub(crate) fn print_report(report: &RunReport) {
    let layers: Vec<String> = report.layers.iter().map(|l| l.to_string()).collect();
    println!("Layers: {}", layers.join(", "));
    println!(
        "Reference density: {:.6e}{}",
        report.reference.value,
        report
            .reference
            .index
            .map(|i| format!(" (grid point {})", i))
            .unwrap_or_default()
    );
    if report.undefined_points > 0 {
        println!(
            "Undefined potential at {} grid point(s); saturated values were written.",
            report.undefined_points
        );
    }
    for path in &report.outputs {
        println!("✓ Written: {}", path.display());
    }
}
