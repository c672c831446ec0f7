//! Datacenter reuse decision
//!
//! When a GTM datacenter with the requested nickname already exists the run
//! either reuses it, or has to ask. The choice itself is pure; asking is left
//! to whoever drives the run.

/// How existing datacenters are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReusePolicy {
    /// Reuse without asking
    Always,
    /// Ask before reusing
    #[default]
    Confirm,
    /// Never reuse; an existing datacenter stops the run
    Never,
}

/// Outcome for one datacenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatacenterDecision {
    Create,
    Reuse { id: u64 },
    /// An existing datacenter needs confirmation (or refusal) before reuse.
    Conflict { id: u64 },
}

/// Decides what to do with a datacenter whose existing id, if any, is `existing`.
pub fn decide_datacenter(existing: Option<u64>, policy: ReusePolicy) -> DatacenterDecision {
    match (existing, policy) {
        (None, _) => DatacenterDecision::Create,
        (Some(id), ReusePolicy::Always) => DatacenterDecision::Reuse { id },
        (Some(id), ReusePolicy::Confirm | ReusePolicy::Never) => DatacenterDecision::Conflict { id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_datacenter_is_created() {
        for policy in [ReusePolicy::Always, ReusePolicy::Confirm, ReusePolicy::Never] {
            assert_eq!(decide_datacenter(None, policy), DatacenterDecision::Create);
        }
    }

    #[test]
    fn test_existing_datacenter() {
        assert_eq!(
            decide_datacenter(Some(3131), ReusePolicy::Always),
            DatacenterDecision::Reuse { id: 3131 }
        );
        assert_eq!(
            decide_datacenter(Some(3131), ReusePolicy::Confirm),
            DatacenterDecision::Conflict { id: 3131 }
        );
        assert_eq!(
            decide_datacenter(Some(7), ReusePolicy::Never),
            DatacenterDecision::Conflict { id: 7 }
        );
    }
}
