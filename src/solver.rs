use crate::error::Error;
use crate::model::{Assignment, Comparison, LinearExpr, Model};
use log::{debug, info};
use std::convert::TryFrom;
use z3::ast::{Ast, Bool, Int};

#[derive(Debug)]
pub enum SolveOutcome {
    Optimal(Assignment),
    Infeasible,
}

/// A 0/1 integer program solver.
pub trait IlpSolver {
    fn name(&self) -> &'static str;
    fn solve(&mut self, model: &Model) -> Result<SolveOutcome, Error>;
}

/// Solves the model with z3's `Optimize` engine. A fresh context is
/// created for every call and dropped when the call returns.
#[derive(Debug, Default, Clone)]
pub struct Z3Solver {
    pub timeout_ms: Option<u64>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_timeout(timeout_ms: Option<u64>) -> Self {
        Z3Solver { timeout_ms }
    }
}

fn coefficient<'ctx>(ctx: &'ctx z3::Context, value: u64) -> Result<Int<'ctx>, Error> {
    let value = i64::try_from(value)
        .map_err(|_| Error::Solver(format!("coefficient {} out of range", value)))?;
    Ok(Int::from_i64(ctx, value))
}

fn linear<'ctx>(ctx: &'ctx z3::Context, vars: &[Bool<'ctx>], expr: &LinearExpr) -> Int<'ctx> {
    let zero = Int::from_i64(ctx, 0);
    let terms = expr
        .terms()
        .map(|(v, c)| vars[v].ite(&Int::from_i64(ctx, c), &zero))
        .collect::<Vec<_>>();
    if terms.is_empty() {
        zero
    } else {
        Int::add(ctx, &terms.iter().collect::<Vec<_>>())
    }
}

impl IlpSolver for Z3Solver {
    fn name(&self) -> &'static str {
        "z3 optimize"
    }

    fn solve(&mut self, model: &Model) -> Result<SolveOutcome, Error> {
        let mut cfg = z3::Config::new();
        if let Some(ms) = self.timeout_ms {
            cfg.set_timeout_msec(ms);
        }
        let ctx = z3::Context::new(&cfg);
        let opt = z3::Optimize::new(&ctx);

        let vars = (0..model.num_variables())
            .map(|v| Bool::new_const(&ctx, format!("x{}", v)))
            .collect::<Vec<_>>();

        for c in model.constraints() {
            let lhs = linear(&ctx, &vars, &c.expr);
            let rhs = Int::from_i64(&ctx, c.rhs);
            let constraint = match c.comparison {
                Comparison::LessEq => lhs.le(&rhs),
                Comparison::Eq => lhs._eq(&rhs),
                Comparison::GreaterEq => lhs.ge(&rhs),
            };
            opt.assert(&constraint);
        }

        let zero = Int::from_i64(&ctx, 0);
        let mut objective_terms = Vec::new();
        for (v, w) in model.objective() {
            if w > 0 {
                objective_terms.push(vars[v].ite(&coefficient(&ctx, w)?, &zero));
            }
        }
        if !objective_terms.is_empty() {
            let objective = Int::add(&ctx, &objective_terms.iter().collect::<Vec<_>>());
            opt.minimize(&objective);
        }

        debug!(
            "{}: {} variables, {} constraints",
            self.name(),
            vars.len(),
            model.constraints().len()
        );

        match opt.check(&[]) {
            z3::SatResult::Unsat => {
                info!("Model is infeasible");
                Ok(SolveOutcome::Infeasible)
            }
            z3::SatResult::Unknown => Err(Error::Solver("z3 undecided".to_string())),
            z3::SatResult::Sat => {
                let m = opt
                    .get_model()
                    .ok_or_else(|| Error::Solver("z3 returned no model".to_string()))?;
                let values = vars
                    .iter()
                    .map(|x| m.eval(x, true).and_then(|b| b.as_bool()).unwrap_or(false))
                    .collect::<Vec<_>>();
                let assignment = Assignment::new(values);
                info!(
                    "Optimal objective value: {}",
                    model.objective_value(&assignment)
                );
                Ok(SolveOutcome::Optimal(assignment))
            }
        }
    }
}
