//! MILP Solver
//!
//! Translates a [`Model`] into a `good_lp` problem. Indicator constraints are rewritten
//! as big-M constraints first, using bounds derived from the variable declarations,
//! and objective components sharing a priority level are blended by weight.

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    variable,
};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::{
    model::{
        Constraint, IndicatorConstraint, LinearExpr, Model, Relation, Sense, VariableKind,
    },
    solvers::{SolveOutcome, SolveStatus, Solver, SolverError},
};

/// Solver using Mixed Integer Linear Programming (MILP)
#[derive(Debug)]
pub struct MILPSolver;

impl Solver for MILPSolver {
    fn solve(model: &Model) -> Result<SolveOutcome, SolverError> {
        let objective = blended_objective(model)?;
        let linearized = linearize_indicators(model)?;

        let mut pb = ProblemVariables::new();

        let vars: Vec<Variable> = model
            .variables()
            .iter()
            .map(|declared| {
                let definition = match declared.kind {
                    VariableKind::Binary => variable().binary(),
                    VariableKind::Integer => variable().integer().min(declared.lower),
                    VariableKind::Continuous => variable().min(declared.lower),
                };

                let definition = match declared.upper {
                    Some(upper) if declared.kind != VariableKind::Binary => definition.max(upper),
                    _ => definition,
                };

                pb.add(definition.name(declared.name.clone()))
            })
            .collect();

        let objective = to_expression(&objective, &vars, model.name())?;

        let mut solver_model = match model.sense() {
            Sense::Maximise => pb.maximise(objective),
            Sense::Minimise => pb.minimise(objective),
        }
        .using(default_solver);

        for linear in model.constraints().iter().chain(&linearized) {
            let lhs = to_expression(&linear.lhs, &vars, &linear.name)?;

            solver_model = solver_model.with(match linear.relation {
                Relation::Eq => constraint::eq(lhs, linear.rhs),
                Relation::Leq => constraint::leq(lhs, linear.rhs),
                Relation::Geq => constraint::geq(lhs, linear.rhs),
            });
        }

        debug!(
            variables = vars.len(),
            constraints = model.constraints().len() + linearized.len(),
            "solving model"
        );

        let outcome = match solver_model.solve() {
            Ok(solution) => {
                SolveOutcome::optimal(vars.iter().map(|&var| solution.value(var)).collect())
            }
            Err(ResolutionError::Infeasible) => {
                SolveOutcome::without_solution(SolveStatus::Infeasible)
            }
            Err(ResolutionError::Unbounded) => {
                SolveOutcome::without_solution(SolveStatus::Unbounded)
            }
            Err(error) => SolveOutcome::without_solution(SolveStatus::Aborted(error.to_string())),
        };

        if !outcome.status().is_optimal() {
            warn!(status = ?outcome.status(), model = model.name(), "solve did not reach optimality");
        }

        Ok(outcome)
    }
}

/// Sum of every objective component scaled by its weight.
///
/// # Errors
///
/// Returns [`SolverError::UnsupportedObjectives`] if the components span more than one
/// priority level.
pub fn blended_objective(model: &Model) -> Result<LinearExpr, SolverError> {
    let levels: FxHashSet<i32> = model.objectives().iter().map(|o| o.priority).collect();

    if levels.len() > 1 {
        return Err(SolverError::UnsupportedObjectives {
            levels: levels.len(),
        });
    }

    let mut blended = LinearExpr::new();

    for objective in model.objectives() {
        blended.add_scaled(&objective.expr, objective.weight);
    }

    Ok(blended)
}

/// Rewrite every indicator constraint of the model as one or two linear constraints.
///
/// For `if b == active_when then lhs REL rhs`, the big-M constant is the distance
/// between `rhs` and the relevant bound of `lhs`, so the rewritten constraint is slack
/// exactly when the indicator is inactive. Equalities yield one `<=` and one `>=`
/// constraint.
///
/// # Errors
///
/// Returns a [`SolverError`] if the left-hand side refers to an undeclared variable or
/// has no finite bound in the direction the rewrite needs.
pub fn linearize_indicators(model: &Model) -> Result<Vec<Constraint>, SolverError> {
    let mut linearized = Vec::with_capacity(model.indicators().len());

    for indicator in model.indicators() {
        let (lower, upper) = bounds(model, &indicator.constraint)?;
        let unbounded = || SolverError::UnboundedIndicator {
            constraint: indicator.constraint.name.clone(),
        };

        match indicator.constraint.relation {
            Relation::Leq => {
                linearized.push(big_m(indicator, Relation::Leq, upper.ok_or_else(unbounded)?));
            }
            Relation::Geq => {
                linearized.push(big_m(indicator, Relation::Geq, lower.ok_or_else(unbounded)?));
            }
            Relation::Eq => {
                let upper = upper.ok_or_else(unbounded)?;
                let lower = lower.ok_or_else(unbounded)?;

                linearized.push(big_m(indicator, Relation::Leq, upper));
                linearized.push(big_m(indicator, Relation::Geq, lower));
            }
        }
    }

    Ok(linearized)
}

/// Big-M form of one direction of an indicator constraint, given the bound of its
/// left-hand side in that direction.
fn big_m(indicator: &IndicatorConstraint, relation: Relation, bound: f64) -> Constraint {
    let inner = &indicator.constraint;
    let rhs = inner.rhs;
    let b = indicator.condition;

    let (m, suffix) = match relation {
        Relation::Geq => ((rhs - bound).max(0.0), "geq"),
        _ => ((bound - rhs).max(0.0), "leq"),
    };

    // Inactive means the big-M term relaxes the constraint to the bound of lhs.
    let (coefficient, new_rhs) = match (relation, indicator.active_when) {
        (Relation::Geq, true) => (-m, rhs - m),
        (Relation::Geq, false) => (m, rhs),
        (_, true) => (m, rhs + m),
        (_, false) => (-m, rhs),
    };

    Constraint::new(
        format!("{}_indicator_{suffix}", inner.name),
        inner.lhs.clone().with_term(b, coefficient),
        relation,
        new_rhs,
    )
}

/// Lower and upper bounds of a constraint's left-hand side; `None` where infinite.
fn bounds(model: &Model, linear: &Constraint) -> Result<(Option<f64>, Option<f64>), SolverError> {
    let mut lower = Some(linear.lhs.constant());
    let mut upper = Some(linear.lhs.constant());

    for &(var, coefficient) in linear.lhs.terms() {
        let declared = model
            .variable(var)
            .ok_or_else(|| SolverError::UnknownVariable {
                context: linear.name.clone(),
                index: var.index(),
            })?;

        let low = Some(coefficient * declared.lower);
        let high = declared.upper.map(|upper| coefficient * upper);

        let (term_lower, term_upper) = if coefficient >= 0.0 {
            (low, high)
        } else {
            (high, low)
        };

        lower = lower.zip(term_lower).map(|(a, b)| a + b);
        upper = upper.zip(term_upper).map(|(a, b)| a + b);
    }

    Ok((lower, upper))
}

fn to_expression(
    expr: &LinearExpr,
    vars: &[Variable],
    context: &str,
) -> Result<Expression, SolverError> {
    let mut expression = Expression::default();
    expression += expr.constant();

    for &(var, coefficient) in expr.terms() {
        let solver_var = vars
            .get(var.index())
            .ok_or_else(|| SolverError::UnknownVariable {
                context: context.to_string(),
                index: var.index(),
            })?;

        expression += *solver_var * coefficient;
    }

    Ok(expression)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::model::VarId;

    use super::*;

    fn assert_solved(outcome: &SolveOutcome) {
        assert!(
            outcome.status().is_optimal(),
            "expected an optimal solve, got {:?}",
            outcome.status()
        );
    }

    #[test]
    fn picks_the_better_of_two_exclusive_options() -> TestResult {
        let mut model = Model::new("choice", Sense::Maximise);
        let a = model.add_binary("a");
        let b = model.add_binary("b");

        model.add_constraint(Constraint::new(
            "one_of",
            LinearExpr::sum([a, b]),
            Relation::Leq,
            1.0,
        ));
        model.add_objective("value", LinearExpr::new().with_term(a, 3.0).with_term(b, 2.0), 1.0, 0);

        let outcome = MILPSolver::solve(&model)?;

        assert_solved(&outcome);
        assert!(outcome.is_set(a));
        assert!(!outcome.is_set(b));

        Ok(())
    }

    #[test]
    fn indicators_couple_size_to_assignment() -> TestResult {
        let mut model = Model::new("coupling", Sense::Maximise);
        let placed = model.add_binary("placed");
        let size = model.add_integer("size", 0.0, Some(10.0));

        let size_expr = LinearExpr::sum([size]);
        model.add_indicator(
            placed,
            false,
            Constraint::new("off", size_expr.clone(), Relation::Eq, 0.0),
        );
        model.add_indicator(
            placed,
            true,
            Constraint::new("max", size_expr.clone(), Relation::Leq, 6.0),
        );
        model.add_objective("size", size_expr, 1.0, 0);

        let outcome = MILPSolver::solve(&model)?;

        assert_solved(&outcome);
        assert!(outcome.is_set(placed));
        assert!((outcome.value(size) - 6.0).abs() < 1e-6);

        // Forbidding the placement must also zero the size.
        model.add_constraint(Constraint::new(
            "forbid",
            LinearExpr::sum([placed]),
            Relation::Eq,
            0.0,
        ));

        let outcome = MILPSolver::solve(&model)?;

        assert_solved(&outcome);
        assert!(outcome.value(size).abs() < 1e-6);

        Ok(())
    }

    #[test]
    fn infeasible_models_report_status() -> TestResult {
        let mut model = Model::new("impossible", Sense::Maximise);
        let x = model.add_binary("x");

        model.add_constraint(Constraint::new("too_big", LinearExpr::sum([x]), Relation::Geq, 2.0));
        model.add_objective("x", LinearExpr::sum([x]), 1.0, 0);

        let outcome = MILPSolver::solve(&model)?;

        assert_eq!(outcome.status(), &SolveStatus::Infeasible);
        assert!(outcome.values().is_empty());

        Ok(())
    }

    /// Every integer point satisfies the rewritten constraints exactly when it
    /// satisfies the indicator.
    fn assert_equivalent(model: &Model, condition: VarId, size: VarId) -> TestResult {
        let linearized = linearize_indicators(model)?;

        for condition_value in [0.0, 1.0] {
            for step in 0..=10_u8 {
                let size_value = f64::from(step);
                let value = |var: VarId| {
                    if var == condition {
                        condition_value
                    } else if var == size {
                        size_value
                    } else {
                        0.0
                    }
                };

                let expected = model
                    .indicators()
                    .iter()
                    .all(|indicator| indicator.is_satisfied(value, 1e-9));
                let actual = linearized
                    .iter()
                    .all(|linear| linear.is_satisfied(value, 1e-9));

                assert_eq!(
                    expected, actual,
                    "mismatch at condition = {condition_value}, size = {size_value}"
                );
            }
        }

        Ok(())
    }

    #[test]
    fn linearization_matches_indicator_semantics() -> TestResult {
        for relation in [Relation::Leq, Relation::Geq, Relation::Eq] {
            for active_when in [true, false] {
                let mut model = Model::new("indicator", Sense::Maximise);
                let condition = model.add_binary("b");
                let size = model.add_integer("s", 0.0, Some(10.0));

                model.add_indicator(
                    condition,
                    active_when,
                    Constraint::new("ind", LinearExpr::sum([size]), relation, 4.0),
                );

                assert_equivalent(&model, condition, size)?;
            }
        }

        Ok(())
    }

    #[test]
    fn equality_indicators_split_in_two() -> TestResult {
        let mut model = Model::new("indicator", Sense::Maximise);
        let b = model.add_binary("b");
        let s = model.add_integer("s", 0.0, Some(10.0));

        model.add_indicator(b, false, Constraint::new("off", LinearExpr::sum([s]), Relation::Eq, 0.0));

        let linearized = linearize_indicators(&model)?;

        assert_eq!(linearized.len(), 2);
        assert!(linearized.iter().any(|c| c.relation == Relation::Leq));
        assert!(linearized.iter().any(|c| c.relation == Relation::Geq));

        Ok(())
    }

    #[test]
    fn unbounded_indicators_are_rejected() {
        let mut model = Model::new("indicator", Sense::Maximise);
        let b = model.add_binary("b");
        let n = model.add_integer("n", 0.0, None);

        model.add_indicator(b, true, Constraint::new("cap", LinearExpr::sum([n]), Relation::Leq, 3.0));

        let result = linearize_indicators(&model);

        assert!(
            matches!(result, Err(SolverError::UnboundedIndicator { ref constraint }) if constraint == "cap")
        );
    }

    #[test]
    fn mixed_priorities_are_rejected() {
        let mut model = Model::new("priorities", Sense::Maximise);
        let x = model.add_binary("x");

        model.add_objective("first", LinearExpr::sum([x]), 1.0, 0);
        model.add_objective("second", LinearExpr::sum([x]), 1.0, 1);

        assert!(matches!(
            blended_objective(&model),
            Err(SolverError::UnsupportedObjectives { levels: 2 })
        ));
    }

    #[test]
    fn objectives_blend_by_weight() -> TestResult {
        let mut model = Model::new("blend", Sense::Maximise);
        let x = model.add_binary("x");
        let y = model.add_binary("y");

        model.add_objective("a", LinearExpr::new().with_term(x, 1.0), 0.8, 0);
        model.add_objective("b", LinearExpr::new().with_term(x, 1.0).with_term(y, 1.0), 0.2, 0);

        let blended = blended_objective(&model)?;
        let value = blended.eval(|_| 1.0);

        assert!((value - 1.2).abs() < 1e-12);

        Ok(())
    }
}
