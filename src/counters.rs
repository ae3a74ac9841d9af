//! Per-thread parse counters: a plain `Default` struct with a manual
//! `AddAssign` impl so worker threads can each keep a local copy and fold
//! them together at the end.

#[derive(Debug, Default, Clone, Copy)]
pub struct ParserCounters {
    pub parsed_total: u64,
    pub parsed_valid: u64,
}

impl std::ops::AddAssign for ParserCounters {
    fn add_assign(&mut self, other: Self) {
        self.parsed_total += other.parsed_total;
        self.parsed_valid += other.parsed_valid;
    }
}
