//! Metric names emitted by the portal core

use metrics::describe_counter;

/// Register descriptions with whatever recorder the binary installed.
pub fn init_metrics() {
    describe_counter!("auth.sign_in.total", "Sign-in attempts");
    describe_counter!("auth.sign_in.failed", "Sign-in attempts rejected or failed");
    describe_counter!("auth.sign_up.total", "Registration attempts");
    describe_counter!("auth.sign_up.failed", "Registration attempts rejected or failed");
    describe_counter!("auth.sign_out.total", "Sign-out requests");
    describe_counter!("auth.sign_out.failed", "Sign-out requests the provider failed");
    describe_counter!("auth.profile_update.total", "Profile metadata updates");
    describe_counter!("auth.profile_update.failed", "Profile metadata updates that failed");
    describe_counter!("notifications.dispatched", "Registration notifications spawned");
    describe_counter!("notifications.delivered", "Registration notifications acknowledged");
    describe_counter!("notifications.failed", "Registration notifications that failed or timed out");
}
