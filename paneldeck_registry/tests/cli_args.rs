//! CLI arg tests for the demo registry binary.

use std::process::Command;

#[test]
fn test_port_short_and_long_accepted() {
    // Verify port flags are accepted by ensuring the process starts, then
    // kill it quickly. Unlikely ports to avoid conflicts.
    let exe = env!("CARGO_BIN_EXE_paneldeck_registry");

    let mut child = Command::new(exe)
        .args(["--port", "9557"])
        .spawn()
        .expect("spawn registry");
    std::thread::sleep(std::time::Duration::from_millis(150));
    let _ = child.kill();
    let _ = child.wait();

    let mut child2 = Command::new(exe)
        .args(["-p", "9558"])
        .spawn()
        .expect("spawn registry");
    std::thread::sleep(std::time::Duration::from_millis(150));
    let _ = child2.kill();
    let _ = child2.wait();
}
