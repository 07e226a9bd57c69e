use crate::error::GradeError;
use serde::Serialize;
use std::fmt;

/// Lowest percentage a grade scheme must cover.
pub const DOMAIN_MIN: f64 = 0.0;

/// A computed or instructor-entered percentage. Values above 100 are legal
/// (bonus credit); nothing here clamps them.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Percentage {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Percentage {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LetterGrade(String);

impl LetterGrade {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Half-open interval `[lower_bound, upper_bound)` bound to a letter grade.
/// The top range of a scheme has no upper bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRange {
    pub letter: LetterGrade,
    pub lower_bound: Percentage,
    pub upper_bound: Option<Percentage>,
}

impl GradeRange {
    pub fn contains(&self, p: Percentage) -> bool {
        self.lower_bound <= p && self.upper_bound.map(|u| p < u).unwrap_or(true)
    }
}

/// Ordered, contiguous partition of the percentage domain into letter grades.
///
/// Ranges are sorted by ascending lower bound, the first starts at
/// [`DOMAIN_MIN`], and every range's upper bound equals the next range's lower
/// bound. The only way to obtain a scheme is through a constructor that
/// enforces this, so every `GradeScheme` in the process is well-formed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GradeScheme {
    ranges: Vec<GradeRange>,
}

impl GradeScheme {
    /// F below 50, then D, C, B and A in steps of ten.
    pub fn standard() -> Self {
        Self::link(vec![
            (LetterGrade::new("F"), Percentage(0.0)),
            (LetterGrade::new("D"), Percentage(50.0)),
            (LetterGrade::new("C"), Percentage(60.0)),
            (LetterGrade::new("B"), Percentage(70.0)),
            (LetterGrade::new("A"), Percentage(80.0)),
        ])
    }

    /// Builds a scheme from `(letter, lower_bound)` pairs in ascending order.
    pub fn from_cutoffs<I, L>(cutoffs: I) -> Result<Self, GradeError>
    where
        I: IntoIterator<Item = (L, f64)>,
        L: Into<String>,
    {
        let cutoffs: Vec<(LetterGrade, Percentage)> = cutoffs
            .into_iter()
            .map(|(l, p)| (LetterGrade::new(l), Percentage(p)))
            .collect();

        for (i, (letter, lower)) in cutoffs.iter().enumerate() {
            if letter.as_str().is_empty() {
                return Err(GradeError::InvalidScheme(format!(
                    "range {} has an empty letter grade",
                    i
                )));
            }
            if !lower.0.is_finite() {
                return Err(GradeError::InvalidScheme(format!(
                    "'{}' has a non-finite lower bound",
                    letter
                )));
            }
            if cutoffs[..i].iter().any(|(l, _)| l == letter) {
                return Err(GradeError::InvalidScheme(format!(
                    "letter grade '{}' appears more than once",
                    letter
                )));
            }
            if i > 0 && cutoffs[i - 1].1 >= *lower {
                return Err(GradeError::InvalidScheme(format!(
                    "'{}' must start above '{}'",
                    letter,
                    cutoffs[i - 1].0
                )));
            }
        }
        if let Some((letter, lower)) = cutoffs.first() {
            if lower.0 != DOMAIN_MIN {
                return Err(GradeError::InvalidScheme(format!(
                    "lowest grade '{}' must start at {}",
                    letter, DOMAIN_MIN
                )));
            }
        }

        Ok(Self::link(cutoffs))
    }

    // Callers guarantee ascending, unique cutoffs.
    fn link(cutoffs: Vec<(LetterGrade, Percentage)>) -> Self {
        let uppers: Vec<Option<Percentage>> = cutoffs
            .iter()
            .skip(1)
            .map(|(_, p)| Some(*p))
            .chain(std::iter::once(None))
            .collect();
        let ranges = cutoffs
            .into_iter()
            .zip(uppers)
            .map(|((letter, lower_bound), upper_bound)| GradeRange {
                letter,
                lower_bound,
                upper_bound,
            })
            .collect();
        Self { ranges }
    }

    pub fn ranges(&self) -> &[GradeRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn cutoffs(&self) -> impl Iterator<Item = (&LetterGrade, Percentage)> + '_ {
        self.ranges.iter().map(|r| (&r.letter, r.lower_bound))
    }

    /// Returns the unique range containing `p`.
    pub fn range_containing(&self, p: Percentage) -> Result<&GradeRange, GradeError> {
        let idx = self.ranges.partition_point(|r| r.lower_bound <= p);
        idx.checked_sub(1)
            .map(|i| &self.ranges[i])
            .filter(|r| r.contains(p))
            .ok_or(GradeError::RangeLookup { percent: p.0 })
    }

    /// Returns a copy of this scheme where `letter` starts at `new_lower_bound`
    /// and the range below it ends there.
    ///
    /// Rejects moves that would reach or cross a neighbouring boundary, and any
    /// move of the lowest range away from [`DOMAIN_MIN`].
    pub fn with_adjusted_boundary(
        &self,
        letter: &LetterGrade,
        new_lower_bound: Percentage,
    ) -> Result<GradeScheme, GradeError> {
        let Some(idx) = self.ranges.iter().position(|r| &r.letter == letter) else {
            return Err(GradeError::UnknownGrade {
                letter: letter.to_string(),
            });
        };
        let invalid = |reason: String| GradeError::InvalidBoundary {
            letter: letter.to_string(),
            lower_bound: new_lower_bound.0,
            reason,
        };

        if !new_lower_bound.0.is_finite() {
            return Err(invalid("lower bound must be finite".to_string()));
        }
        if let Some(above) = self.ranges.get(idx + 1) {
            if new_lower_bound >= above.lower_bound {
                return Err(invalid(format!(
                    "must stay below '{}' at {}",
                    above.letter, above.lower_bound
                )));
            }
        }
        if idx == 0 {
            if new_lower_bound.0 != DOMAIN_MIN {
                return Err(invalid(format!(
                    "lowest grade must start at {}",
                    DOMAIN_MIN
                )));
            }
        } else {
            let below = &self.ranges[idx - 1];
            if new_lower_bound <= below.lower_bound {
                return Err(invalid(format!(
                    "must stay above '{}' at {}",
                    below.letter, below.lower_bound
                )));
            }
        }

        let mut next = self.clone();
        next.ranges[idx].lower_bound = new_lower_bound;
        if idx > 0 {
            next.ranges[idx - 1].upper_bound = Some(new_lower_bound);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fca() -> GradeScheme {
        GradeScheme::from_cutoffs([("F", 0.0), ("C", 60.0), ("A", 80.0)]).expect("scheme")
    }

    #[test]
    fn cutoffs_link_into_contiguous_ranges() {
        let s = fca();
        let r = s.ranges();
        assert_eq!(r.len(), 3);
        assert_eq!(r[0].upper_bound, Some(Percentage::new(60.0)));
        assert_eq!(r[1].upper_bound, Some(Percentage::new(80.0)));
        assert_eq!(r[2].upper_bound, None);
    }

    #[test]
    fn lookup_is_half_open() {
        let s = fca();
        let at = |p: f64| s.range_containing(Percentage::new(p)).expect("range").letter.clone();
        assert_eq!(at(0.0), LetterGrade::new("F"));
        assert_eq!(at(59.999), LetterGrade::new("F"));
        assert_eq!(at(60.0), LetterGrade::new("C"));
        assert_eq!(at(80.0), LetterGrade::new("A"));
        assert_eq!(at(140.0), LetterGrade::new("A"));
    }

    #[test]
    fn lookup_below_domain_or_empty_fails() {
        assert!(matches!(
            fca().range_containing(Percentage::new(-0.5)),
            Err(GradeError::RangeLookup { .. })
        ));
        assert!(matches!(
            GradeScheme::from_cutoffs(Vec::<(&str, f64)>::new())
                .expect("empty scheme")
                .range_containing(Percentage::new(50.0)),
            Err(GradeError::RangeLookup { .. })
        ));
    }

    #[test]
    fn from_cutoffs_rejects_malformed_input() {
        let cases: Vec<Vec<(&str, f64)>> = vec![
            vec![("F", 10.0), ("A", 80.0)],
            vec![("F", 0.0), ("A", 80.0), ("B", 70.0)],
            vec![("F", 0.0), ("F", 50.0)],
            vec![("F", 0.0), ("", 50.0)],
            vec![("F", 0.0), ("A", f64::NAN)],
        ];
        for c in cases {
            assert!(
                matches!(GradeScheme::from_cutoffs(c.clone()), Err(GradeError::InvalidScheme(_))),
                "accepted {:?}",
                c
            );
        }
    }

    #[test]
    fn adjust_moves_boundary_and_neighbour() {
        let s = fca()
            .with_adjusted_boundary(&LetterGrade::new("C"), Percentage::new(55.0))
            .expect("adjust");
        assert_eq!(s.ranges()[0].upper_bound, Some(Percentage::new(55.0)));
        assert_eq!(s.ranges()[1].lower_bound, Percentage::new(55.0));
        assert_eq!(s.ranges()[1].upper_bound, Some(Percentage::new(80.0)));
    }

    #[test]
    fn adjust_unknown_letter_fails() {
        let err = fca()
            .with_adjusted_boundary(&LetterGrade::new("B"), Percentage::new(70.0))
            .unwrap_err();
        assert!(matches!(err, GradeError::UnknownGrade { .. }));
    }

    #[test]
    fn adjust_rejects_inversion_with_neighbours() {
        let s = fca()
            .with_adjusted_boundary(&LetterGrade::new("C"), Percentage::new(55.0))
            .expect("adjust");
        let err = s
            .with_adjusted_boundary(&LetterGrade::new("F"), Percentage::new(56.0))
            .unwrap_err();
        assert!(matches!(err, GradeError::InvalidBoundary { .. }));

        for bad in [80.0, 85.0, 0.0, -3.0] {
            assert!(matches!(
                s.with_adjusted_boundary(&LetterGrade::new("C"), Percentage::new(bad)),
                Err(GradeError::InvalidBoundary { .. })
            ));
        }
        assert!(matches!(
            s.with_adjusted_boundary(&LetterGrade::new("A"), Percentage::new(55.0)),
            Err(GradeError::InvalidBoundary { .. })
        ));
    }

    #[test]
    fn lowest_range_stays_pinned() {
        let s = fca();
        assert!(s
            .with_adjusted_boundary(&LetterGrade::new("F"), Percentage::new(10.0))
            .is_err());
        assert_eq!(
            s.with_adjusted_boundary(&LetterGrade::new("F"), Percentage::new(0.0))
                .expect("no-op"),
            s
        );
    }

    prop_compose! {
        fn arb_scheme()(steps in prop::collection::vec(1u32..30, 1..8)) -> GradeScheme {
            let mut lower = 0.0;
            let mut cutoffs = Vec::new();
            for (i, step) in steps.iter().enumerate() {
                cutoffs.push((format!("G{}", i), lower));
                lower += *step as f64;
            }
            GradeScheme::from_cutoffs(cutoffs).expect("generated scheme")
        }
    }

    proptest! {
        #[test]
        fn accepted_schemes_are_contiguous(s in arb_scheme()) {
            let r = s.ranges();
            prop_assert_eq!(r[0].lower_bound.value(), DOMAIN_MIN);
            for pair in r.windows(2) {
                prop_assert_eq!(pair[0].upper_bound, Some(pair[1].lower_bound));
            }
            prop_assert_eq!(r[r.len() - 1].upper_bound, None);
        }

        #[test]
        fn every_in_domain_value_has_one_range(s in arb_scheme(), p in 0.0f64..250.0) {
            let p = Percentage::new(p);
            let found = s.range_containing(p).expect("in domain");
            prop_assert!(found.contains(p));
            prop_assert_eq!(s.ranges().iter().filter(|r| r.contains(p)).count(), 1);
        }

        #[test]
        fn accepted_adjustments_keep_contiguity(
            s in arb_scheme(),
            pick in 0usize..8,
            target in -10.0f64..260.0,
        ) {
            let letter = s.ranges()[pick % s.ranges().len()].letter.clone();
            if let Ok(next) = s.with_adjusted_boundary(&letter, Percentage::new(target)) {
                let r = next.ranges();
                prop_assert_eq!(r[0].lower_bound.value(), DOMAIN_MIN);
                for pair in r.windows(2) {
                    prop_assert!(pair[0].lower_bound < pair[1].lower_bound);
                    prop_assert_eq!(pair[0].upper_bound, Some(pair[1].lower_bound));
                }
            }
        }
    }
}
