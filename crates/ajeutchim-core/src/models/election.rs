use serde::{Deserialize, Serialize};

/// A candidate on an election's ballot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub party: Option<String>,
    pub votes: u32,
    pub avatar_url: Option<String>,
}

/// An election, open or archived, with its running tallies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub id: String,
    pub title: String,
    pub open: bool,
    pub candidates: Vec<Candidate>,
    /// Candidate this device's member voted for, if any
    pub voted_for: Option<String>,
}

impl Election {
    pub fn total_votes(&self) -> u32 {
        self.candidates.iter().map(|c| c.votes).sum()
    }

    /// Share of the vote for one candidate, in percent.
    /// Zero when nobody has voted yet or the candidate is unknown.
    pub fn percentage(&self, candidate_id: &str) -> f64 {
        let total = self.total_votes();
        if total == 0 {
            return 0.0;
        }
        match self.candidates.iter().find(|c| c.id == candidate_id) {
            Some(candidate) => f64::from(candidate.votes) / f64::from(total) * 100.0,
            None => 0.0,
        }
    }

    pub fn has_voted(&self) -> bool {
        self.voted_for.is_some()
    }

    /// Cast this member's vote.
    /// Counts only while the election is open, the member has not voted,
    /// and the candidate is on the ballot.
    pub fn cast_vote(&mut self, candidate_id: &str) -> bool {
        if !self.open || self.has_voted() {
            return false;
        }
        match self.candidates.iter_mut().find(|c| c.id == candidate_id) {
            Some(candidate) => {
                candidate.votes += 1;
                self.voted_for = Some(candidate_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Current leader (highest tally), if any candidates exist
    pub fn leader(&self) -> Option<&Candidate> {
        self.candidates.iter().max_by_key(|c| c.votes)
    }
}
