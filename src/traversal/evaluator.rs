//! Path evaluators: decide whether a path is returned and whether it is
//! expanded further

use crate::graph::{Path, RelationshipType};

/// Outcome of evaluating one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Evaluation {
    IncludeAndContinue,
    IncludeAndPrune,
    ExcludeAndContinue,
    ExcludeAndPrune,
}

impl Evaluation {
    pub fn of(include: bool, continues: bool) -> Self {
        match (include, continues) {
            (true, true) => Evaluation::IncludeAndContinue,
            (true, false) => Evaluation::IncludeAndPrune,
            (false, true) => Evaluation::ExcludeAndContinue,
            (false, false) => Evaluation::ExcludeAndPrune,
        }
    }

    pub fn includes(self) -> bool {
        matches!(self, Evaluation::IncludeAndContinue | Evaluation::IncludeAndPrune)
    }

    pub fn continues(self) -> bool {
        matches!(self, Evaluation::IncludeAndContinue | Evaluation::ExcludeAndContinue)
    }

    /// Include only if both include; continue only if both continue
    pub fn combine(self, other: Evaluation) -> Self {
        Evaluation::of(
            self.includes() && other.includes(),
            self.continues() && other.continues(),
        )
    }
}

/// Decides what happens to a path during traversal
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, path: &Path) -> Evaluation;
}

impl<F> Evaluator for F
where
    F: Fn(&Path) -> Evaluation + Send + Sync,
{
    fn evaluate(&self, path: &Path) -> Evaluation {
        self(path)
    }
}

/// Common evaluators
pub struct Evaluators;

impl Evaluators {
    /// Include and continue everything
    pub fn all() -> impl Evaluator {
        |_: &Path| Evaluation::IncludeAndContinue
    }

    /// Paths up to and including `depth` relationships
    pub fn to_depth(depth: usize) -> impl Evaluator {
        move |path: &Path| {
            let len = path.length();
            Evaluation::of(len <= depth, len < depth)
        }
    }

    /// Paths of at least `depth` relationships
    pub fn from_depth(depth: usize) -> impl Evaluator {
        move |path: &Path| Evaluation::of(path.length() >= depth, true)
    }

    /// Paths of exactly `depth` relationships
    pub fn at_depth(depth: usize) -> impl Evaluator {
        move |path: &Path| {
            let len = path.length();
            Evaluation::of(len == depth, len < depth)
        }
    }

    /// Everything except the zero-length start path
    pub fn exclude_start_position() -> impl Evaluator {
        |path: &Path| Evaluation::of(path.length() > 0, true)
    }

    /// Paths whose last relationship has one of `types`
    pub fn last_relationship_type_is<I, T>(types: I) -> impl Evaluator
    where
        I: IntoIterator<Item = T>,
        T: Into<RelationshipType>,
    {
        let types: Vec<RelationshipType> = types.into_iter().map(Into::into).collect();
        move |path: &Path| {
            let matched = path
                .last_relationship()
                .map(|r| types.contains(&r.rel_type))
                .unwrap_or(false);
            Evaluation::of(matched, true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeId, Relationship, RelationshipId};

    fn path_of_length(len: u64) -> Path {
        let mut path = Path::single(Node::new(NodeId::new(0)));
        for i in 1..=len {
            let rel = Relationship::new(RelationshipId::new(i), NodeId::new(i - 1), NodeId::new(i), "NEXT");
            path = path.extend(rel, Node::new(NodeId::new(i)));
        }
        path
    }

    #[test]
    fn test_combine() {
        use Evaluation::*;
        assert_eq!(IncludeAndContinue.combine(ExcludeAndContinue), ExcludeAndContinue);
        assert_eq!(IncludeAndContinue.combine(IncludeAndPrune), IncludeAndPrune);
        assert_eq!(IncludeAndPrune.combine(ExcludeAndContinue), ExcludeAndPrune);
    }

    #[test]
    fn test_depth_evaluators() {
        let to2 = Evaluators::to_depth(2);
        assert_eq!(to2.evaluate(&path_of_length(1)), Evaluation::IncludeAndContinue);
        assert_eq!(to2.evaluate(&path_of_length(2)), Evaluation::IncludeAndPrune);
        assert_eq!(to2.evaluate(&path_of_length(3)), Evaluation::ExcludeAndPrune);

        let at1 = Evaluators::at_depth(1);
        assert_eq!(at1.evaluate(&path_of_length(0)), Evaluation::ExcludeAndContinue);
        assert_eq!(at1.evaluate(&path_of_length(1)), Evaluation::IncludeAndPrune);

        let from2 = Evaluators::from_depth(2);
        assert_eq!(from2.evaluate(&path_of_length(1)), Evaluation::ExcludeAndContinue);
        assert_eq!(from2.evaluate(&path_of_length(4)), Evaluation::IncludeAndContinue);
    }

    #[test]
    fn test_last_relationship_type() {
        let eval = Evaluators::last_relationship_type_is(["NEXT"]);
        assert!(eval.evaluate(&path_of_length(1)).includes());
        assert!(!eval.evaluate(&path_of_length(0)).includes());

        let other = Evaluators::last_relationship_type_is(vec!["KNOWS"]);
        assert!(!other.evaluate(&path_of_length(2)).includes());
    }

    #[test]
    fn test_exclude_start_position() {
        let eval = Evaluators::exclude_start_position();
        assert_eq!(eval.evaluate(&path_of_length(0)), Evaluation::ExcludeAndContinue);
        assert_eq!(eval.evaluate(&path_of_length(1)), Evaluation::IncludeAndContinue);
    }
}
