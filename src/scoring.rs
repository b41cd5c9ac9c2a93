//! Ranking of merged candidates by approval ratio.

use crate::models::SongCandidate;

/// Added to the downvote count so songs without downvotes still rank by
/// their upvotes instead of dividing by zero.
pub const DOWNVOTE_OFFSET: f64 = 0.01;

/// upvotes / (downvotes + 0.01)
pub fn approval_ratio(candidate: &SongCandidate) -> f64 {
    candidate.upvotes as f64 / (candidate.downvotes as f64 + DOWNVOTE_OFFSET)
}

/// Order candidates by approval ratio, best first. Exact ties keep their
/// input order.
pub fn rank(mut candidates: Vec<SongCandidate>) -> Vec<SongCandidate> {
    candidates.sort_by(|a, b| approval_ratio(b).total_cmp(&approval_ratio(a)));
    candidates
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::DateTime;

    pub(crate) fn candidate(title: &str, up: u64, down: u64) -> SongCandidate {
        SongCandidate {
            title: title.to_string(),
            difficulties: vec!["Ex".to_string()],
            upvotes: up,
            downvotes: down,
            mapper: "mapper".to_string(),
            published_at: DateTime::parse_from_rfc3339("2020-01-01T00:00:00+00:00").unwrap(),
            download_link: Some(format!("https://dl/{}.zip", title)),
        }
    }

    fn votes(ranked: &[SongCandidate]) -> Vec<(u64, u64)> {
        ranked.iter().map(|c| (c.upvotes, c.downvotes)).collect()
    }

    #[test]
    fn test_rank_order() {
        let ranked = rank(vec![
            candidate("c", 5, 5),
            candidate("a", 10, 0),
            candidate("b", 5, 1),
        ]);
        assert_eq!(votes(&ranked), vec![(10, 0), (5, 1), (5, 5)]);
    }

    #[test]
    fn test_ratios() {
        assert!((approval_ratio(&candidate("a", 10, 0)) - 1000.0).abs() < 1e-9);
        assert!((approval_ratio(&candidate("b", 5, 1)) - 4.950_495).abs() < 1e-5);
        assert!((approval_ratio(&candidate("c", 5, 5)) - 0.998_004).abs() < 1e-5);
        assert!((approval_ratio(&candidate("d", 42, 3)) - 13.953_488).abs() < 1e-5);
    }

    #[test]
    fn test_any_upvote_beats_none() {
        let ranked = rank(vec![candidate("none", 0, 0), candidate("one", 1, 50)]);
        assert_eq!(ranked[0].title, "one");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = rank(vec![
            candidate("first", 2, 1),
            candidate("top", 9, 0),
            candidate("second", 2, 1),
            candidate("third", 0, 0),
        ]);
        let titles: Vec<&str> = ranked.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::new()).is_empty());
    }
}
