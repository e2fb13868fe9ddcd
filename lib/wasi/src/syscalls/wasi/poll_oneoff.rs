use crate::syscalls::*;

/// ### `poll_oneoff()`
/// Concurrently poll for a set of events
/// Inputs:
/// - `&[u8] subscriptions`
///     The encoded subscriptions to poll for
/// - `&mut [u8] events`
///     Buffer the encoded events would be written to
/// Errors:
/// - `Errno::Notsup`
///     Always; polling is left to the host runtime
#[instrument(level = "trace", skip_all, fields(subscriptions_len = subscriptions.len()), ret, err)]
pub fn poll_oneoff(_vfs: &WasiVfs, subscriptions: &[u8], events: &mut [u8]) -> Result<u32, Errno> {
    trace!(events_len = events.len(), "poll_oneoff is not supported");
    Err(Errno::Notsup)
}
