//! Vendor API call wrappers
//!
//! - papi: property manager (CP codes, properties, hostnames, rules, activations)
//! - gtm: traffic management (domains, datacenters, properties)
//! - edgeworkers: worker ids, versions, activations

pub mod edgeworkers;
pub mod gtm;
pub mod papi;

pub use edgeworkers::EdgeWorkersApi;
pub use gtm::{ExistingDatacenter, GtmApi};
pub use papi::{PapiApi, PapiScope};

/// Last path segment of a resource link, query string dropped.
///
/// `/papi/v1/properties/prp_1/versions/4?contractId=ctr_1` yields `4`.
pub fn link_id(link: &str) -> Option<&str> {
    let path = link.split('?').next()?;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}
