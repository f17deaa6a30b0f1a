use crate::analyzer::TemplateSimilarity;
use crate::gallery::Gallery;
use crate::types::{MatchResult, Template};

/// Strategy for identifying a probe template against a gallery.
pub trait Matcher {
    fn identify(&self, probe: &Template, gallery: &Gallery, threshold: f32) -> MatchResult;
}

/// Exhaustive nearest-neighbor search, best template per person.
///
/// A person's score is the maximum similarity over all of their
/// templates. The best person is replaced only on a strictly greater
/// score, so the earliest person in gallery order wins ties. The match is
/// accepted only when the best score is strictly above the threshold.
///
/// Cost is O(persons × templates); intended for single-site galleries.
pub struct NearestNeighborMatcher<S> {
    scorer: S,
}

impl<S: TemplateSimilarity> NearestNeighborMatcher<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    fn person_score(&self, probe: &Template, templates: &[Template]) -> f32 {
        templates
            .iter()
            .map(|t| self.scorer.similarity(probe, t))
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

impl<S: TemplateSimilarity> Matcher for NearestNeighborMatcher<S> {
    fn identify(&self, probe: &Template, gallery: &Gallery, threshold: f32) -> MatchResult {
        let mut best: Option<(usize, f32)> = None;

        for (i, person) in gallery.persons().iter().enumerate() {
            let score = self.person_score(probe, &person.templates);
            let is_better = match best {
                None => true,
                Some((_, best_score)) => score > best_score,
            };
            if is_better {
                best = Some((i, score));
            }
        }

        match best {
            Some((idx, score)) if score > threshold => MatchResult {
                person: Some(gallery.persons()[idx].clone()),
                similarity: score,
                accepted: true,
            },
            Some((_, score)) => MatchResult::rejected(score),
            None => MatchResult::rejected(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Person;

    /// Scores a probe by reading the first value of the enrolled template,
    /// so tests can state person scores directly.
    struct FixedScores;

    impl TemplateSimilarity for FixedScores {
        fn similarity(&self, _probe: &Template, enrolled: &Template) -> f32 {
            enrolled.as_slice()[0]
        }
    }

    fn person(name: &str, scores: &[f32]) -> Person {
        Person::new(
            name,
            scores.iter().map(|&s| Template::new(vec![s])).collect(),
        )
    }

    fn probe() -> Template {
        Template::new(vec![0.0])
    }

    #[test]
    fn test_best_of_gallery() {
        let gallery = Gallery::new(vec![
            person("low", &[0.4]),
            person("best", &[0.9]),
            person("mid", &[0.6]),
        ])
        .unwrap();

        let result = NearestNeighborMatcher::new(FixedScores).identify(&probe(), &gallery, 0.5);
        assert!(result.accepted);
        assert_eq!(result.person.unwrap().name, "best");
        assert!((result.similarity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_multi_template_max_policy() {
        let gallery = Gallery::new(vec![person("multi", &[0.3, 0.8])]).unwrap();

        let result = NearestNeighborMatcher::new(FixedScores).identify(&probe(), &gallery, 0.5);
        assert!(result.accepted);
        assert!((result.similarity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_strict() {
        let gallery = Gallery::new(vec![person("edge", &[0.75])]).unwrap();

        let result = NearestNeighborMatcher::new(FixedScores).identify(&probe(), &gallery, 0.75);
        assert!(!result.accepted);
        assert!(result.person.is_none());
        assert!((result.similarity - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_first_person_wins_ties() {
        let gallery = Gallery::new(vec![
            person("first", &[0.9]),
            person("second", &[0.9]),
        ])
        .unwrap();

        let result = NearestNeighborMatcher::new(FixedScores).identify(&probe(), &gallery, 0.5);
        assert_eq!(result.person.unwrap().name, "first");
    }

    #[test]
    fn test_rejection_reports_best_score() {
        let gallery = Gallery::new(vec![person("a", &[0.2]), person("b", &[0.4])]).unwrap();

        let result = NearestNeighborMatcher::new(FixedScores).identify(&probe(), &gallery, 0.5);
        assert!(!result.accepted);
        assert!(result.person.is_none());
        assert!((result.similarity - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_empty_gallery() {
        let result =
            NearestNeighborMatcher::new(FixedScores).identify(&probe(), &Gallery::empty(), 0.5);
        assert!(!result.accepted);
        assert_eq!(result.similarity, 0.0);
    }

    #[test]
    fn test_cosine_scorer_finds_last_entry() {
        use crate::analyzer::CosineSimilarity;

        let gallery = Gallery::new(vec![
            Person::new("decoy1", vec![Template::new(vec![0.0, 1.0, 0.0])]),
            Person::new("decoy2", vec![Template::new(vec![0.0, 0.0, 1.0])]),
            Person::new("match", vec![Template::new(vec![1.0, 0.0, 0.0])]),
        ])
        .unwrap();
        let probe = Template::new(vec![1.0, 0.0, 0.0]);

        let result = NearestNeighborMatcher::new(CosineSimilarity).identify(&probe, &gallery, 0.5);
        assert!(result.accepted);
        assert_eq!(result.person.unwrap().name, "match");
    }
}
