//! Finds the source IP of an attribute map and merges the provider's answer.

use std::net::IpAddr;

use opentelemetry_proto::tonic::common::v1::KeyValue;
use tokio_util::sync::CancellationToken;

use crate::attributes;
use crate::error::{Error, Result};
use crate::provider::AsProvider;

/// Returns the first usable IP among `keys`, probed in order.
///
/// Keys that are missing, hold a non-string value, fail to parse or hold
/// the unspecified address (including its IPv4-mapped form) are skipped.
pub fn source_ip<S: AsRef<str>>(attrs: &[KeyValue], keys: &[S]) -> Option<IpAddr> {
    keys.iter().find_map(|key| {
        let key = key.as_ref();
        let value = attributes::get_str(attrs, key)?;
        match value.parse::<IpAddr>() {
            Ok(ip) if ip.to_canonical().is_unspecified() => {
                tracing::trace!(key, value, "skipping unspecified address");
                None
            }
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::debug!(key, value, "skipping value that is not an IP address");
                None
            }
        }
    })
}

/// Enriches `attrs` with the autonomous system of its source IP.
///
/// A map without a usable IP, or an IP the provider has no metadata for, is
/// left untouched. Every other provider error is returned.
pub fn resolve<S: AsRef<str>>(
    cancel: &CancellationToken,
    attrs: &mut Vec<KeyValue>,
    keys: &[S],
    provider: &dyn AsProvider,
) -> Result<()> {
    let Some(ip) = source_ip(attrs, keys) else {
        return Ok(());
    };

    match provider.autonomous_system(cancel, ip) {
        Ok(found) => {
            found.merge_into(attrs);
            Ok(())
        }
        Err(Error::NoMetadataFound) => {
            tracing::trace!(%ip, "no asn metadata found");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
