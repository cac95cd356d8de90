//! Candidate ranking and the auto-commit decision.

use serde::{Deserialize, Serialize};

use crate::config::WorkflowConfig;
use crate::similarity::match_score;

/// An item scored against the keyword of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch<T> {
    pub item: T,
    pub score: f64,
}

/// Thresholds for one kind of search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    /// Candidates must score strictly above this.
    pub floor: f64,
    /// A sole survivor at or above this is acted on without asking.
    pub auto_commit: f64,
    /// Most candidates offered for confirmation; `None` keeps all.
    pub limit: Option<usize>,
}

impl MatchPolicy {
    /// Schedule deletion and update: top five.
    pub fn schedule(config: &WorkflowConfig) -> Self {
        Self {
            floor: config.match_floor,
            auto_commit: config.auto_commit_score,
            limit: Some(config.max_delete_candidates),
        }
    }

    /// Task completion: every surviving candidate.
    pub fn task(config: &WorkflowConfig) -> Self {
        Self {
            floor: config.match_floor,
            auto_commit: config.auto_commit_score,
            limit: None,
        }
    }
}

/// Score every item against `keyword`, drop those at or below `floor`, and
/// sort the rest by descending score.  Ties keep input order.
pub fn rank<T>(
    keyword: &str,
    items: impl IntoIterator<Item = T>,
    floor: f64,
    text_of: impl Fn(&T) -> &str,
) -> Vec<CandidateMatch<T>> {
    let mut ranked: Vec<CandidateMatch<T>> = items
        .into_iter()
        .map(|item| {
            let score = match_score(keyword, text_of(&item));
            CandidateMatch { item, score }
        })
        .filter(|c| c.score > floor)
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// What to do with a ranked candidate list.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<T> {
    /// Exactly one survivor, confidently matched.
    AutoCommit(CandidateMatch<T>),
    /// Ask the user to pick, best first.
    Confirm(Vec<CandidateMatch<T>>),
    NoMatch,
}

/// Apply the auto-commit rule to candidates already filtered by [`rank`].
///
/// Acts alone only when exactly one candidate survived and it reaches the
/// auto-commit score.  A strong candidate next to a weak one still asks.
pub fn decide<T>(mut ranked: Vec<CandidateMatch<T>>, policy: &MatchPolicy) -> Decision<T> {
    match ranked.len() {
        0 => Decision::NoMatch,
        1 if ranked[0].score >= policy.auto_commit => match ranked.pop() {
            Some(only) => Decision::AutoCommit(only),
            None => Decision::NoMatch,
        },
        _ => {
            if let Some(limit) = policy.limit {
                ranked.truncate(limit);
            }
            Decision::Confirm(ranked)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: MatchPolicy = MatchPolicy {
        floor: 0.30,
        auto_commit: 0.80,
        limit: Some(5),
    };

    fn scored(scores: &[f64]) -> Vec<CandidateMatch<usize>> {
        scores
            .iter()
            .enumerate()
            .map(|(item, &score)| CandidateMatch { item, score })
            .collect()
    }

    #[test]
    fn rank_filters_and_sorts() {
        let titles = ["점심 약속", "팀 회의", "오전 회의", "회의"];
        let ranked = rank("회의", titles, 0.30, |t| *t);
        let order: Vec<&str> = ranked.iter().map(|c| c.item).collect();
        assert_eq!(order, ["회의", "팀 회의", "오전 회의"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn sole_confident_candidate_commits() {
        assert!(matches!(
            decide(scored(&[0.95]), &POLICY),
            Decision::AutoCommit(CandidateMatch { item: 0, .. })
        ));
    }

    #[test]
    fn sole_weak_candidate_asks() {
        assert!(matches!(decide(scored(&[0.79]), &POLICY), Decision::Confirm(c) if c.len() == 1));
    }

    #[test]
    fn strong_candidate_with_company_still_asks() {
        assert!(matches!(decide(scored(&[0.99, 0.35]), &POLICY), Decision::Confirm(c) if c.len() == 2));
    }

    #[test]
    fn confirmation_is_capped() {
        let many = scored(&[0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.35]);
        match decide(many, &POLICY) {
            Decision::Confirm(c) => assert_eq!(c.len(), 5),
            other => panic!("unexpected {other:?}"),
        }

        let unlimited = MatchPolicy { limit: None, ..POLICY };
        match decide(scored(&[0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.35]), &unlimited) {
            Decision::Confirm(c) => assert_eq!(c.len(), 7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nothing_left_is_no_match() {
        assert_eq!(decide(Vec::<CandidateMatch<usize>>::new(), &POLICY), Decision::NoMatch);
    }
}
