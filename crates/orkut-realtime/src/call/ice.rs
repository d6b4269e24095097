//! Buffer for remote candidates that arrive before the remote description.

use std::collections::HashMap;

use super::peer::IceCandidate;

/// Early candidates keyed by call id, in arrival order.
#[derive(Debug, Default)]
pub struct IceCandidateBuffer {
    pending: HashMap<String, Vec<IceCandidate>>,
}

impl IceCandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, call_id: &str, candidate: IceCandidate) {
        self.pending
            .entry(call_id.to_string())
            .or_default()
            .push(candidate);
    }

    /// Removes and returns the candidates buffered for `call_id`.
    pub fn take(&mut self, call_id: &str) -> Vec<IceCandidate> {
        self.pending.remove(call_id).unwrap_or_default()
    }

    pub fn len(&self, call_id: &str) -> usize {
        self.pending.get(call_id).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.values().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(n: u16) -> IceCandidate {
        IceCandidate {
            candidate: format!("candidate:{n}"),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        }
    }

    #[test]
    fn test_take_preserves_order_and_empties() {
        let mut buffer = IceCandidateBuffer::new();
        buffer.push("a", candidate(1));
        buffer.push("a", candidate(2));
        buffer.push("b", candidate(3));

        let taken = buffer.take("a");
        assert_eq!(taken, vec![candidate(1), candidate(2)]);
        assert_eq!(buffer.len("a"), 0);
        assert_eq!(buffer.len("b"), 1);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
