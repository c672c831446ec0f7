//! Origin behavior rewrite for the internal routing property

use tracing::Level;

use crate::locator::find_behavior;
use crate::mutator::TreeMutator;
use crate::rule_tree::{OptionValue, RuleTree};

pub const ORIGIN_BEHAVIOR: &str = "origin";

/// Option keys dropped from the origin behavior.
pub const REMOVED_ORIGIN_KEYS: [&str; 2] = ["customCertificates", "customCertificateAuthorities"];

/// Points an `origin` behavior at a custom origin with a forwarded host header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginRewrite {
    pub hostname: String,
    pub custom_forward_host_header: String,
}

impl OriginRewrite {
    pub fn new(hostname: impl Into<String>, custom_forward_host_header: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            custom_forward_host_header: custom_forward_host_header.into(),
        }
    }

    /// Option values written onto the origin behavior, in write order.
    pub fn options(&self) -> Vec<(&'static str, OptionValue)> {
        vec![
            ("hostname", self.hostname.as_str().into()),
            ("forwardHostHeader", "CUSTOM".into()),
            (
                "customForwardHostHeader",
                self.custom_forward_host_header.as_str().into(),
            ),
            ("cacheKeyHostname", "REQUEST_HOST_HEADER".into()),
            ("compress", true.into()),
            ("enableTrueClientIp", true.into()),
            ("httpPort", 80_u16.into()),
            ("httpsPort", 443_u16.into()),
            ("minTlsVersion", "DYNAMIC".into()),
            ("originCertificate", "".into()),
            ("originSni", true.into()),
            ("originType", "CUSTOMER".into()),
            ("ports", "".into()),
            ("tlsVersionTitle", "".into()),
            ("trueClientIpClientSetting", false.into()),
            ("trueClientIpHeader", "True-Client-IP".into()),
            ("verificationMode", "CUSTOM".into()),
            ("ipVersion", "IPV4".into()),
            (
                "customValidCnValues",
                vec!["{{Origin Hostname}}", "{{Forward Host Header}}"].into(),
            ),
            ("originCertsToHonor", "STANDARD_CERTIFICATE_AUTHORITIES".into()),
            (
                "standardCertificateAuthorities",
                vec!["akamai-permissive", "THIRD_PARTY_AMAZON"].into(),
            ),
        ]
    }

    /// Rewrites the `origin` behavior found directly on `node`.
    ///
    /// Returns `false` and leaves the node untouched when there is none.
    pub fn apply(&self, mutator: &TreeMutator, node: &mut RuleTree) -> bool {
        if find_behavior(node, ORIGIN_BEHAVIOR).is_none() {
            mutator.log(
                Level::WARN,
                &format!("No origin behavior on '{}'; origin left unchanged", node.name),
            );
            return false;
        }

        for (key, value) in self.options() {
            mutator.set_behavior_option(node, ORIGIN_BEHAVIOR, key, value);
        }
        let removed = mutator.remove_behavior_option_keys(node, ORIGIN_BEHAVIOR, &REMOVED_ORIGIN_KEYS);

        mutator.log(
            Level::INFO,
            &format!(
                "Origin now {} (host header {}), {removed} certificate key(s) removed",
                self.hostname, self.custom_forward_host_header
            ),
        );
        true
    }
}
