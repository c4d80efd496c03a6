//! Known event signatures
//!
//! The scanner asks the node only for logs whose topic0 is one of the
//! events registered here. The set is built once and never changes.

use alloy_primitives::{keccak256, B256};

/// keccak256("Transfer(address,address,uint256)")
const TRANSFER_TOPIC: [u8; 32] = [
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d,
    0xaa, 0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23,
    0xb3, 0xef,
];

/// Event types the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// ERC20 `Transfer(address indexed from, address indexed to, uint256 value)`
    Transfer,
    /// ERC20 `Approval(address indexed owner, address indexed spender, uint256 value)`
    Approval,
}

impl EventKind {
    /// Every registered event, in topic-set order.
    pub const ALL: [EventKind; 2] = [EventKind::Transfer, EventKind::Approval];

    /// Solidity event signature.
    pub fn signature(self) -> &'static str {
        match self {
            EventKind::Transfer => "Transfer(address,address,uint256)",
            EventKind::Approval => "Approval(address,address,uint256)",
        }
    }

    /// topic0 of the event.
    pub fn topic(self) -> B256 {
        match self {
            EventKind::Transfer => B256::from(TRANSFER_TOPIC),
            EventKind::Approval => keccak256(self.signature().as_bytes()),
        }
    }

    /// Look up the event type from a log's topic0.
    pub fn from_topic(topic: &B256) -> Option<EventKind> {
        Self::ALL.into_iter().find(|kind| kind.topic() == *topic)
    }

    /// Short name for logs and summaries.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Transfer => "transfer",
            EventKind::Approval => "approval",
        }
    }
}

/// Ordered list of topic0 values requested from the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet(Vec<B256>);

impl TopicSet {
    /// Topic set covering every registered event type.
    pub fn registered() -> Self {
        Self(EventKind::ALL.iter().map(|kind| kind.topic()).collect())
    }

    pub fn as_slice(&self) -> &[B256] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_topic_matches_signature() {
        assert_eq!(
            EventKind::Transfer.topic(),
            keccak256(EventKind::Transfer.signature().as_bytes())
        );
    }

    #[test]
    fn test_approval_topic() {
        let expected =
            hex::decode("8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925")
                .unwrap();
        assert_eq!(EventKind::Approval.topic().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_registered_set() {
        let set = TopicSet::registered();
        assert_eq!(set.as_slice().len(), 2);
        assert_eq!(set.as_slice()[0], EventKind::Transfer.topic());
        assert_eq!(
            EventKind::from_topic(&set.as_slice()[1]),
            Some(EventKind::Approval)
        );
        assert_eq!(EventKind::from_topic(&B256::ZERO), None);
    }
}
