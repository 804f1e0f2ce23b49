//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - triple-channel quantum message pipeline",
        style("LUXBIN").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  luxbin-ir           Circuit intermediate representation and OpenQASM 3");
    println!("  luxbin-hal          Backend abstraction");
    println!("  luxbin-codec        Light, sound and microwave character encoding");
    println!("  luxbin-pipeline     Echo, relay, consensus and ping-pong stages");
    println!("  luxbin-adapter-sim  Local statevector simulator");
    if cfg!(feature = "ibm") {
        println!("  luxbin-adapter-ibm  IBM Quantum Sampler backend");
    }
    println!("  luxbin-cli          Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style(env!("CARGO_PKG_REPOSITORY")).underlined()
    );
    println!("License:    {}", style(env!("CARGO_PKG_LICENSE")).dim());
}
