//! Ranking and dominance rules shared by the judge and the strategies.
//!
//! Trials are ordered feasibility-first: non-vetoed before vetoed, lower
//! penalty before higher, then objectives lexicographically in problem
//! order. `Ordering::Less` always means "ranks ahead".

use std::cmp::Ordering;

use crate::objective::Objective;
use crate::trial::Trial;

/// Compare two trials; `Less` means `a` is better.
///
/// Equal trials are left `Equal`; callers that need a strict order break
/// ties on [`Trial::sequence`].
pub fn rank(objectives: &[Objective], a: &Trial, b: &Trial) -> Ordering {
    match (a.is_vetoed(), b.is_vetoed()) {
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        (true, true) => return Ordering::Equal,
        (false, false) => {}
    }

    let by_penalty = a.penalty().total_cmp(&b.penalty());
    if by_penalty != Ordering::Equal {
        return by_penalty;
    }

    for objective in objectives {
        let ord = compare_objective(objective, a, b);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// `rank` with ties broken by sequence number, first found first.
pub fn rank_strict(objectives: &[Objective], a: &Trial, b: &Trial) -> Ordering {
    rank(objectives, a, b).then_with(|| a.sequence.cmp(&b.sequence))
}

/// Pareto dominance under the feasibility-first rule.
pub fn dominates(objectives: &[Objective], a: &Trial, b: &Trial) -> bool {
    if a.is_vetoed() {
        return false;
    }
    if b.is_vetoed() {
        return true;
    }
    match a.penalty().total_cmp(&b.penalty()) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }

    let mut strictly_better = false;
    for objective in objectives {
        match compare_objective(objective, a, b) {
            Ordering::Greater => return false,
            Ordering::Less => strictly_better = true,
            Ordering::Equal => {}
        }
    }
    strictly_better
}

/// Overall satisfaction of a trial: the weakest objective satisfaction.
///
/// Vetoed or penalized trials score 0. Returns `None` if any objective has
/// no satisfaction curve.
pub fn satisfaction(objectives: &[Objective], trial: &Trial) -> Option<f64> {
    let mut overall: f64 = 1.0;
    for objective in objectives {
        objective.satisfaction.as_ref()?;
        let s = match trial.score(&objective.name) {
            Some(score) => objective.satisfaction(score).unwrap_or(0.0),
            None => 0.0,
        };
        overall = overall.min(s);
    }
    if trial.is_vetoed() || trial.penalty() > 0.0 {
        return Some(0.0);
    }
    Some(overall)
}

fn compare_objective(objective: &Objective, a: &Trial, b: &Trial) -> Ordering {
    match (a.score(&objective.name), b.score(&objective.name)) {
        (Some(x), Some(y)) => objective.compare(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::SatisfactionCurve;
    use crate::trial::Evaluation;
    use crate::trial_point::TrialPoint;

    fn trial(seq: u64, eval: Evaluation) -> Trial {
        let point: TrialPoint = [("x", seq as f64)].into_iter().collect();
        Trial::new(seq, point, eval, "test")
    }

    fn two_objectives() -> Vec<Objective> {
        vec![Objective::minimize("cost"), Objective::maximize("yield")]
    }

    #[test]
    fn vetoed_ranks_last() {
        let objs = two_objectives();
        let good = trial(1, Evaluation::scored("cost", 100.0).with_score("yield", 0.0));
        let vetoed = trial(2, Evaluation::vetoed("bad"));
        assert_eq!(rank(&objs, &good, &vetoed), Ordering::Less);
        assert_eq!(rank(&objs, &vetoed, &good), Ordering::Greater);
    }

    #[test]
    fn penalty_before_objectives() {
        let objs = two_objectives();
        let feasible = trial(1, Evaluation::scored("cost", 5.0).with_score("yield", 1.0));
        let penalized = trial(
            2,
            Evaluation::scored("cost", 1.0)
                .with_score("yield", 9.0)
                .with_penalty(0.1),
        );
        assert_eq!(rank(&objs, &feasible, &penalized), Ordering::Less);
    }

    #[test]
    fn lexicographic_objectives() {
        let objs = two_objectives();
        let a = trial(1, Evaluation::scored("cost", 1.0).with_score("yield", 1.0));
        let b = trial(2, Evaluation::scored("cost", 1.0).with_score("yield", 2.0));
        let c = trial(3, Evaluation::scored("cost", 0.5).with_score("yield", 0.0));
        assert_eq!(rank(&objs, &b, &a), Ordering::Less);
        assert_eq!(rank(&objs, &c, &b), Ordering::Less);
    }

    #[test]
    fn strict_rank_prefers_first_found() {
        let objs = two_objectives();
        let a = trial(1, Evaluation::scored("cost", 1.0).with_score("yield", 1.0));
        let b = trial(2, Evaluation::scored("cost", 1.0).with_score("yield", 1.0));
        assert_eq!(rank(&objs, &a, &b), Ordering::Equal);
        assert_eq!(rank_strict(&objs, &a, &b), Ordering::Less);
    }

    #[test]
    fn missing_score_ranks_behind() {
        let objs = two_objectives();
        let full = trial(1, Evaluation::scored("cost", 9.0).with_score("yield", 0.0));
        let partial = trial(2, Evaluation::scored("yield", 5.0));
        assert_eq!(rank(&objs, &full, &partial), Ordering::Less);
    }

    #[test]
    fn pareto_dominance() {
        let objs = two_objectives();
        let a = trial(1, Evaluation::scored("cost", 1.0).with_score("yield", 5.0));
        let b = trial(2, Evaluation::scored("cost", 2.0).with_score("yield", 5.0));
        let c = trial(3, Evaluation::scored("cost", 0.5).with_score("yield", 1.0));
        assert!(dominates(&objs, &a, &b));
        assert!(!dominates(&objs, &b, &a));
        assert!(!dominates(&objs, &a, &c));
        assert!(!dominates(&objs, &c, &a));
        assert!(!dominates(&objs, &a, &a));
    }

    #[test]
    fn satisfaction_is_weakest_link() {
        let objs = vec![
            Objective::minimize("err")
                .with_satisfaction(SatisfactionCurve::Linear { worst: 1.0, best: 0.0 }),
            Objective::maximize("fit")
                .with_satisfaction(SatisfactionCurve::Linear { worst: 0.0, best: 1.0 }),
        ];
        let t = trial(1, Evaluation::scored("err", 0.25).with_score("fit", 0.5));
        assert_eq!(satisfaction(&objs, &t), Some(0.5));

        let vetoed = trial(2, Evaluation::vetoed("no"));
        assert_eq!(satisfaction(&objs, &vetoed), Some(0.0));

        let no_curve = vec![Objective::minimize("err")];
        assert_eq!(satisfaction(&no_curve, &t), None);
    }
}
