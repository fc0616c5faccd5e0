/*! Integration tests for Sadhana.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - accounts: Slot capacity, create/switch/remove through the session coordinator
 * - lockout: The three-strike lockout cycle with a manual clock
 * - session: No auto-login, cross-tab logout and login broadcasts
 * - data: Account-scoped data isolation across context switches
 * - device_id: Device id survival across partial storage clears
 * - transfer: QR export and import between slots and devices
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("sadhana=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod accounts;
mod data;
mod helpers;
mod lockout;
mod session;
mod transfer;
