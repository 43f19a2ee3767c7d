//! Lookup adapter over MaxMind format databases.

use std::fmt;
use std::net::IpAddr;

use maxminddb::{geoip2, MaxMindDbError, Reader};

use crate::attributes::AttributeSet;
use crate::convention;
use crate::error::{Error, Result};

/// Declared type of MaxMind's commercial ISP database.
pub const GEOIP2_ISP: &str = "GeoIP2-ISP";
/// Declared type of the free GeoLite2 ASN database.
pub const GEOLITE2_ASN: &str = "GeoLite2-ASN";

/// The autonomous system fields shared by ISP and ASN records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsnRecord {
    pub number: Option<u32>,
    pub organization: Option<String>,
}

/// Read access to an open database.
///
/// Lookups yield `Ok(None)` when the address is not in the database.
pub trait AsnDatabase: fmt::Debug + Send + Sync {
    /// The database type declared in the file metadata.
    fn database_type(&self) -> &str;

    /// Look up `ip` decoding an ASN record.
    fn asn(&self, ip: IpAddr) -> std::result::Result<Option<AsnRecord>, MaxMindDbError>;

    /// Look up `ip` decoding an ISP record.
    fn isp(&self, ip: IpAddr) -> std::result::Result<Option<AsnRecord>, MaxMindDbError>;
}

impl<S> AsnDatabase for Reader<S>
where
    S: AsRef<[u8]> + Send + Sync,
{
    fn database_type(&self) -> &str {
        &self.metadata.database_type
    }

    fn asn(&self, ip: IpAddr) -> std::result::Result<Option<AsnRecord>, MaxMindDbError> {
        let record = self.lookup(ip)?.decode::<geoip2::Asn>()?;
        Ok(record.map(|record| AsnRecord {
            number: record.autonomous_system_number,
            organization: record.autonomous_system_organization.map(str::to_owned),
        }))
    }

    fn isp(&self, ip: IpAddr) -> std::result::Result<Option<AsnRecord>, MaxMindDbError> {
        let record = self.lookup(ip)?.decode::<geoip2::Isp>()?;
        Ok(record.map(|record| AsnRecord {
            number: record.autonomous_system_number,
            organization: record.autonomous_system_organization.map(str::to_owned),
        }))
    }
}

/// Resolves IP addresses to autonomous system attributes, dispatching on
/// the declared database type.
#[derive(Debug)]
pub struct AsnLookup<D> {
    db: D,
}

impl<D: AsnDatabase> AsnLookup<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    pub fn database_type(&self) -> &str {
        self.db.database_type()
    }

    /// Returns the attributes for `ip`.
    ///
    /// The AS number is always present when a record is found, the
    /// organization only when it is non-empty. Addresses missing from the
    /// database yield [`Error::NoMetadataFound`].
    pub fn resolve(&self, ip: IpAddr) -> Result<AttributeSet> {
        let record = match self.db.database_type() {
            GEOIP2_ISP => self.db.isp(ip),
            GEOLITE2_ASN => self.db.asn(ip),
            other => {
                return Err(Error::UnsupportedDatabaseType {
                    database_type: other.to_string(),
                })
            }
        }
        .map_err(|source| Error::LookupFailed { ip, source })?
        .ok_or(Error::NoMetadataFound)?;

        Ok(as_attributes(&record))
    }
}

fn as_attributes(record: &AsnRecord) -> AttributeSet {
    let mut attributes =
        AttributeSet::new().with_int(convention::AS_NUMBER, i64::from(record.number.unwrap_or(0)));

    if let Some(org) = record.organization.as_deref().filter(|org| !org.is_empty()) {
        attributes = attributes.with_string(convention::AS_ORGANIZATION_NAME, org);
    }

    attributes
}
