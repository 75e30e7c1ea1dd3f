/// Failed DATA sequence numbers collected during one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureTracker {
    failed: Vec<u16>,
    threshold: usize,
}

impl FailureTracker {
    /// Creates an empty tracker that trips once more than `threshold`
    /// failures are recorded.
    pub fn new(threshold: usize) -> Self {
        Self {
            failed: Vec::new(),
            threshold,
        }
    }

    /// Records a failed chunk. Returns `true` if the threshold is now exceeded.
    pub fn record(&mut self, seq: u16) -> bool {
        self.failed.push(seq);
        self.exceeded()
    }

    /// Returns `true` once the failure count is above the threshold.
    pub fn exceeded(&self) -> bool {
        self.failed.len() > self.threshold
    }

    pub fn count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }

    /// Failed sequence numbers in the order they were recorded.
    pub fn failed(&self) -> &[u16] {
        &self.failed
    }

    pub fn into_failed(self) -> Vec<u16> {
        self.failed
    }
}
