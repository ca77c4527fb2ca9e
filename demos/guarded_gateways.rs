//! Guarded gateway example demonstrating the call guard lifecycle.
//!
//! This example shows how to:
//! - Build the guard registry once and inject it into services
//! - Trip a guard with a failing gateway
//! - Observe fast-fail rejections while the guard is open
//! - Recover through a trial call once the gateway is healthy again
//!
//! Run with: cargo run --example guarded_gateways

use callguard::mock::MockDependency;
use callguard::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// A service that charges cards through the payment gateway.
struct PaymentService {
    guard: Arc<CallGuard>,
    gateway: MockDependency,
}

impl PaymentService {
    fn new(registry: &GuardRegistry, gateway: MockDependency) -> Option<Self> {
        Some(Self {
            guard: registry.get("payment")?,
            gateway,
        })
    }

    async fn charge(&self) -> GuardResult<String, callguard::mock::MockError> {
        self.guard.execute(|| self.gateway.call()).await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    println!("=== Guarded Gateways Example ===\n");

    let registry = GuardRegistry::builder()
        .register(
            "payment",
            GuardConfig::new(Duration::from_millis(500), 3, Duration::from_secs(2)),
        )
        .dependency(Dependency::Push)
        .dependency(Dependency::Email)
        .build()?;

    for snapshot in registry.snapshots() {
        println!(
            "  {:<8} state={} failures={}",
            snapshot.name, snapshot.state, snapshot.consecutive_failures
        );
    }
    println!();

    let gateway = MockDependency::new_failing()
        .with_name("stripe")
        .with_latency(Duration::from_millis(20));
    let payments = PaymentService::new(&registry, gateway).ok_or("payment guard missing")?;

    println!("Sending charges to a failing gateway...\n");

    for i in 1..=6 {
        match payments.charge().await {
            Ok(receipt) => println!("Charge #{i}: ok ({receipt})"),
            Err(GuardError::Open { name, retry_in }) => {
                println!("Charge #{i}: rejected, {name} is open (retry in {retry_in:?})")
            }
            Err(GuardError::Timeout { timeout, .. }) => {
                println!("Charge #{i}: timed out after {timeout:?}")
            }
            Err(GuardError::Underlying(e)) => println!("Charge #{i}: failed: {e}"),
        }
    }

    println!(
        "\nGateway was called {} times; guard is {}",
        payments.gateway.call_count(),
        payments.guard.state()
    );

    println!("\nGateway recovers; waiting for the reset window...");
    payments.gateway.set_failing(false);
    tokio::time::sleep(Duration::from_millis(2100)).await;

    match payments.charge().await {
        Ok(receipt) => println!("Trial charge: ok ({receipt})"),
        Err(e) => println!("Trial charge: {e}"),
    }

    let snapshot = payments.guard.snapshot();
    println!("\nFinal state: {}", snapshot.state);
    println!("Final snapshot: {}", serde_json::to_string_pretty(&snapshot)?);

    println!("\n=== Example Complete ===");
    Ok(())
}
