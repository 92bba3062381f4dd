//! Fuzzy matching for installed package names

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher as FuzzyMatcherTrait;
use strsim::{jaro_winkler, normalized_damerau_levenshtein};

/// A scored package-name match
#[derive(Debug, Clone)]
pub struct PackageMatch {
    /// Installed package name
    pub name: String,
    /// Match score in [0, 1]
    pub score: f32,
}

/// Fuzzy matcher over package names reported by the device
pub struct PackageMatcher {
    /// Skim fuzzy matcher
    skim: SkimMatcherV2,
    /// Minimum score threshold
    min_score: f32,
}

impl PackageMatcher {
    /// Create a new matcher
    pub fn new() -> Self {
        Self {
            skim: SkimMatcherV2::default(),
            min_score: 0.5,
        }
    }

    /// Set the minimum score threshold
    pub fn with_min_score(mut self, score: f32) -> Self {
        self.min_score = score;
        self
    }

    /// Rank candidates against a query, best first
    pub fn rank(&self, query: &str, candidates: &[String], limit: usize) -> Vec<PackageMatch> {
        let mut matches: Vec<PackageMatch> = candidates
            .iter()
            .filter_map(|name| {
                let score = self.score(query, name);
                (score >= self.min_score).then(|| PackageMatch {
                    name: name.clone(),
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(limit);
        matches
    }

    /// Score one candidate against the query
    ///
    /// Package names are dotted reverse-domain strings, so the query is
    /// compared both against the full name and against its last segment.
    fn score(&self, query: &str, candidate: &str) -> f32 {
        let query = query.to_lowercase();
        let candidate = candidate.to_lowercase();

        if candidate == query {
            return 1.0;
        }
        if candidate.contains(&query) {
            return 0.95;
        }

        let last_segment = candidate.rsplit('.').next().unwrap_or(&candidate);

        let mut scores = Vec::new();

        if let Some(skim_score) = self.skim.fuzzy_match(&candidate, &query) {
            scores.push((skim_score as f32 / 100.0).min(1.0));
        }

        scores.push(jaro_winkler(&query, last_segment) as f32);
        scores.push(normalized_damerau_levenshtein(&query, &candidate) as f32);

        scores.iter().sum::<f32>() / scores.len() as f32
    }
}

impl Default for PackageMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<String> {
        vec![
            "com.example.bank".to_string(),
            "com.android.chrome".to_string(),
            "org.mozilla.firefox".to_string(),
            "com.example.banking.beta".to_string(),
        ]
    }

    #[test]
    fn test_substring_match_ranks_first() {
        let matcher = PackageMatcher::new();
        let matches = matcher.rank("bank", &candidates(), 10);

        assert!(!matches.is_empty());
        assert!(matches[0].name.contains("bank"));
        assert!(matches[0].score >= 0.95);
    }

    #[test]
    fn test_exact_match_scores_one() {
        let matcher = PackageMatcher::new();
        let matches = matcher.rank("com.android.chrome", &candidates(), 10);

        assert_eq!(matches[0].name, "com.android.chrome");
        assert_eq!(matches[0].score, 1.0);
    }

    #[test]
    fn test_limit_respected() {
        let matcher = PackageMatcher::new().with_min_score(0.0);
        let matches = matcher.rank("com", &candidates(), 2);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_unrelated_query_filtered() {
        let matcher = PackageMatcher::new();
        let matches = matcher.rank("zzzqqq", &candidates(), 10);
        assert!(matches.is_empty());
    }
}
