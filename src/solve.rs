use crate::{
    ops::Algebra, print, Equation, Expression, VarId, VariableTable,
};
use std::collections::BTreeSet;
use thiserror::Error;

/// Knobs for tweaking [`recassign_with()`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolveOptions {
    /// How many rounds of flattening an equation may take after a
    /// substitution before we give up.
    pub flatten_limit: usize,
    /// Re-run the dimension check on each freshly solved equation and warn
    /// about anything suspicious.
    pub check_solutions: bool,
}

impl SolveOptions {
    pub fn new() -> Self { SolveOptions::default() }

    pub fn with_flatten_limit(self, flatten_limit: usize) -> Self {
        SolveOptions {
            flatten_limit,
            ..self
        }
    }

    pub fn with_check_solutions(self, check_solutions: bool) -> Self {
        SolveOptions {
            check_solutions,
            ..self
        }
    }
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            flatten_limit: 1000,
            check_solutions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("dimensionally inconsistent: {rendered}")]
    InconsistentDimensions {
        /// The offending subterm, annotated as inconsistent.
        subterm: Expression,
        rendered: String,
    },
    #[error("solving gave \"{rendered}\", which doesn't assign an unknown")]
    MalformedSolution { rendered: String },
    #[error("flattening didn't finish after {limit} rounds")]
    FlattenDidNotTerminate { limit: usize },
}

/// Repeatedly solve every equation with exactly one unknown (appearing
/// linearly), substituting each solution into the remaining equations, until
/// nothing more can be solved.
///
/// Only members of `unknowns` are solved for; any other variable is treated
/// as a constant. Solved equations are appended to `solutions` and their
/// variables removed from `unknowns`. Afterwards `equations` only contains
/// the equations that are still pending, minus any which no longer mention
/// an unknown.
pub fn recassign<A>(
    equations: &mut Vec<Equation>,
    unknowns: &mut BTreeSet<VarId>,
    solutions: &mut Vec<Equation>,
    algebra: &A,
    variables: &VariableTable,
) -> Result<(), SolveError>
where
    A: Algebra,
{
    recassign_with(
        equations,
        unknowns,
        solutions,
        algebra,
        variables,
        &SolveOptions::default(),
    )
}

/// [`recassign()`] with explicit [`SolveOptions`].
///
/// On error the call stops immediately. Equations solved so far have been
/// moved to the front of `equations` and `unknowns` is left untouched.
pub fn recassign_with<A>(
    equations: &mut Vec<Equation>,
    unknowns: &mut BTreeSet<VarId>,
    solutions: &mut Vec<Equation>,
    algebra: &A,
    variables: &VariableTable,
    options: &SolveOptions,
) -> Result<(), SolveError>
where
    A: Algebra,
{
    // equations[..solved] is the solved region
    let mut solved = 0;

    loop {
        let pass_start = solved;
        log::debug!(
            "Starting a pass over {} of {} equations",
            equations.len() - pass_start,
            equations.len()
        );

        for j in pass_start..equations.len() {
            let solved_this = try_to_solve(
                equations, j, solved, unknowns, algebra, variables, options,
            )?;

            if solved_this {
                solutions.push(equations[solved].clone());
                solved += 1;
                substitute_latest(
                    equations, solved, algebra, variables, options,
                )?;
            }
        }

        if solved == pass_start {
            break;
        }
    }

    discard_settled(equations, solved, unknowns, algebra, variables);

    for solution in &equations[..solved] {
        if let Some(variable) = solution.left.as_variable() {
            unknowns.remove(&variable);
        }
    }

    equations.drain(..solved);

    Ok(())
}

/// Check and simplify `equations[j]`, then solve it if it has exactly one
/// unknown which appears linearly.
///
/// A solved equation is swapped into `equations[solved]`.
fn try_to_solve<A>(
    equations: &mut [Equation],
    j: usize,
    solved: usize,
    unknowns: &BTreeSet<VarId>,
    algebra: &A,
    variables: &VariableTable,
    options: &SolveOptions,
) -> Result<bool, SolveError>
where
    A: Algebra,
{
    let equation = &mut equations[j];

    if let Some(subterm) = algebra.check_dimensions(equation) {
        let rendered = render(&subterm, variables);
        return Err(SolveError::InconsistentDimensions { subterm, rendered });
    }

    algebra.simplify(equation);

    let order = algebra.order_in_unknowns(equation, unknowns);
    let mut found = BTreeSet::new();
    let count = algebra.count_unknowns(equation, unknowns, &mut found);

    if order != 1 || count != 1 {
        return Ok(false);
    }

    if !algebra.solve_for_unknown(equation, unknowns) {
        log::warn!(
            "Unable to solve {} for its only unknown",
            render_equation(equation, variables)
        );
        return Ok(false);
    }

    let variable = match equation.solved_variable() {
        Some(variable) if unknowns.contains(&variable) => variable,
        _ => {
            return Err(SolveError::MalformedSolution {
                rendered: render_equation(equation, variables),
            })
        },
    };

    if options.check_solutions {
        if let Some(subterm) = algebra.check_dimensions(equation) {
            log::warn!(
                "The solution {} has inconsistent dimensions in {}",
                render_equation(equation, variables),
                render(&subterm, variables)
            );
        }
    }

    log::debug!(
        "Solved for {}: {}",
        variables.name(variable).unwrap_or("<unknown variable>"),
        render_equation(equation, variables)
    );

    equations.swap(j, solved);

    Ok(true)
}

/// Substitute the most recent solution into every pending equation.
fn substitute_latest<A>(
    equations: &mut [Equation],
    solved: usize,
    algebra: &A,
    variables: &VariableTable,
    options: &SolveOptions,
) -> Result<(), SolveError>
where
    A: Algebra,
{
    let (done, pending) = equations.split_at_mut(solved);
    let solution = &done[solved - 1];

    for equation in pending {
        if algebra.substitute(equation, solution) {
            algebra.simplify(equation);
            flatten_fully(equation, algebra, options.flatten_limit)?;

            log::trace!(
                "Substituted {} giving {}",
                render_equation(solution, variables),
                render_equation(equation, variables)
            );
        }
    }

    Ok(())
}

fn flatten_fully<A>(
    equation: &mut Equation,
    algebra: &A,
    limit: usize,
) -> Result<(), SolveError>
where
    A: Algebra,
{
    let mut rounds = 0;

    while algebra.flatten(equation) {
        rounds += 1;
        if rounds > limit {
            return Err(SolveError::FlattenDidNotTerminate { limit });
        }
    }

    Ok(())
}

/// Simplify the pending equations one last time, dropping those which no
/// longer mention any unknowns.
fn discard_settled<A>(
    equations: &mut Vec<Equation>,
    solved: usize,
    unknowns: &BTreeSet<VarId>,
    algebra: &A,
    variables: &VariableTable,
) where
    A: Algebra,
{
    let mut k = solved;

    while k < equations.len() {
        algebra.simplify(&mut equations[k]);

        let mut found = BTreeSet::new();
        if algebra.count_unknowns(&equations[k], unknowns, &mut found) == 0 {
            let discarded = equations.swap_remove(k);
            log::debug!(
                "Discarding {}, which has no unknowns left",
                render_equation(&discarded, variables)
            );
        } else {
            k += 1;
        }
    }
}

fn render(expr: &Expression, variables: &VariableTable) -> String {
    print::infix(expr, variables).unwrap_or_else(|e| e.to_string())
}

fn render_equation(equation: &Equation, variables: &VariableTable) -> String {
    render(&Expression::from(equation.clone()), variables)
}
