//! Backends command implementation.

use anyhow::Result;
use console::style;

use luxbin_hal::Backend;

use super::common::{Session, SessionOptions, sim_nodes};

/// Execute the backends command.
pub async fn execute(options: &SessionOptions) -> Result<()> {
    let session = Session::load(options)?;
    println!("{} Available backends:\n", style("LUXBIN").cyan().bold());

    // Simulator nodes
    for node in sim_nodes(&session.config.simulator)? {
        let backend = node.backend();
        print_backend(backend.as_ref(), "(local)").await;
    }

    // IBM devices
    #[cfg(feature = "ibm")]
    {
        use luxbin_adapter_ibm::IbmBackend;

        for target in &session.config.backends {
            match IbmBackend::connect(target.as_str()).await {
                Ok(ibm) => print_backend(&ibm, "(IBM Quantum)").await,
                Err(e) => {
                    println!(
                        "  {} {} (not configured)",
                        style("○").dim(),
                        style(target).dim()
                    );
                    println!("    {e}");
                    println!("    Set IBM_QUANTUM_TOKEN environment variable to enable");
                    println!();
                }
            }
        }
    }

    #[cfg(not(feature = "ibm"))]
    {
        println!(
            "  {} {} (not compiled)",
            style("○").dim(),
            style(session.config.backends.join(", ")).dim()
        );
        println!("    Rebuild with --features ibm to enable");
        println!();
    }

    Ok(())
}

async fn print_backend(backend: &dyn Backend, kind: &str) {
    let caps = backend.capabilities();
    let availability = backend.availability().await.ok();
    let available = availability.as_ref().is_some_and(|a| a.is_available);

    println!(
        "  {} {} {}",
        if available {
            style("●").green()
        } else {
            style("○").red()
        },
        style(backend.name()).bold(),
        kind
    );
    println!("    Qubits: {}", caps.num_qubits);
    println!("    Max shots: {}", caps.max_shots);
    println!("    Gates: {}", caps.gate_set.native.join(", "));
    if !caps.features.is_empty() {
        println!("    Features: {}", caps.features.join(", "));
    }
    if let Some(depth) = availability.as_ref().and_then(|a| a.queue_depth) {
        println!("    Queue: {depth} pending jobs");
    }
    if let Some(msg) = availability.as_ref().and_then(|a| a.status_message.as_deref()) {
        println!("    Status: {msg}");
    }
    println!();
}
