//! Joiner counters.

use serde::{Deserialize, Serialize};

/// Counters kept by one Joiner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStats {
    /// Packets handed to the Joiner.
    pub packets: u64,
    /// Query messages seen.
    pub queries: u64,
    /// Response messages seen.
    pub responses: u64,
    /// Responses joined to a query.
    pub matched: u64,
    /// Responses emitted without a query.
    pub unmatched_responses: u64,
    /// Queries emitted without a response.
    pub expired: u64,
    /// Zone-transfer responses after the first.
    pub transfer_responses_dropped: u64,
    /// ICMP packets passed through.
    pub icmp: u64,
}

impl JoinStats {
    /// Adds another Joiner's counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.packets += other.packets;
        self.queries += other.queries;
        self.responses += other.responses;
        self.matched += other.matched;
        self.unmatched_responses += other.unmatched_responses;
        self.expired += other.expired;
        self.transfer_responses_dropped += other.transfer_responses_dropped;
        self.icmp += other.icmp;
    }

    /// Records emitted so far.
    pub fn records(&self) -> u64 {
        self.matched + self.unmatched_responses + self.expired + self.icmp
    }
}
