//! `good_lp` 求解器後端
//!
//! 預設使用純 Rust 的 microlp；它沒有內建時間上限，因此在獨立執行緒中求解，
//! 到時未回傳即視為逾時。逾時的執行緒無法中斷，會持有求解名額直到自行結束，
//! 同時執行的求解數因此受 [`SolverGate`] 限制。
//! 啟用 `highs` feature 時改用 HiGHS 的內建時間上限。

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
};

use cutplan_core::{CutPlanError, Result};
use parking_lot::{Condvar, Mutex};

use crate::milp::{MilpBackend, MilpModel, MilpSolution, MilpStatus, Relation, VarKind};

/// 接受解時的約束容差（相對於右手邊）
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// 同時執行中的求解名額
#[derive(Debug)]
pub struct SolverGate {
    capacity: usize,
    in_flight: Mutex<usize>,
    released: Condvar,
}

/// 求解名額，釋放時歸還
#[derive(Debug)]
pub struct SolverPermit {
    gate: Arc<SolverGate>,
}

impl SolverGate {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            in_flight: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    /// 行程共用的名額，數量等於可用 CPU 數
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<SolverGate>> = OnceLock::new();
        SHARED
            .get_or_init(|| {
                let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
                SolverGate::new(cpus)
            })
            .clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 目前被佔用的名額數（含逾時後仍在執行的求解）
    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }

    /// 在 `wait` 內取得名額，逾時回傳 `None`
    pub fn acquire(self: &Arc<Self>, wait: Duration) -> Option<SolverPermit> {
        let mut count = self.in_flight.lock();
        let _ = self.released.wait_while_for(&mut count, |count| *count >= self.capacity, wait);
        if *count >= self.capacity {
            return None;
        }
        *count += 1;
        Some(SolverPermit {
            gate: Arc::clone(self),
        })
    }
}

impl Drop for SolverPermit {
    fn drop(&mut self) {
        {
            let mut count = self.gate.in_flight.lock();
            *count = count.saturating_sub(1);
        }
        self.gate.released.notify_one();
    }
}

/// `good_lp` 後端
#[derive(Debug, Clone)]
pub struct GoodLpBackend {
    gate: Arc<SolverGate>,
}

impl Default for GoodLpBackend {
    fn default() -> Self {
        Self {
            gate: SolverGate::shared(),
        }
    }
}

impl GoodLpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用獨立的求解名額上限
    pub fn with_max_in_flight(capacity: usize) -> Self {
        Self {
            gate: SolverGate::new(capacity),
        }
    }

    pub fn gate(&self) -> &Arc<SolverGate> {
        &self.gate
    }
}

impl MilpBackend for GoodLpBackend {
    fn name(&self) -> &str {
        if cfg!(feature = "highs") {
            "good_lp/highs"
        } else {
            "good_lp/microlp"
        }
    }

    fn solve(&self, model: &MilpModel, time_limit: Duration) -> Result<MilpSolution> {
        if model.is_trivially_infeasible() {
            return Ok(MilpSolution::without_incumbent(MilpStatus::Infeasible));
        }

        let started = Instant::now();
        let Some(permit) = self.gate.acquire(time_limit) else {
            tracing::warn!(
                "{} 個求解仍在執行，等待名額超過時限 {:?}",
                self.gate.in_flight(),
                time_limit
            );
            return Ok(MilpSolution::without_incumbent(MilpStatus::TimeLimit));
        };
        let remaining = time_limit.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Ok(MilpSolution::without_incumbent(MilpStatus::TimeLimit));
        }

        tracing::debug!(
            "{} 求解: {} 個變數, {} 條約束, 時限 {:?}",
            self.name(),
            model.variables().len(),
            model.constraints().len(),
            remaining
        );

        let solution = solve_bounded(model, remaining, permit)?;
        Ok(screen_incumbent(model, solution))
    }
}

/// 不滿足約束的解視為時限內沒有可行解
fn screen_incumbent(model: &MilpModel, solution: MilpSolution) -> MilpSolution {
    if solution.has_incumbent() && !model.is_satisfied_by(&solution.values, FEASIBILITY_TOLERANCE) {
        tracing::warn!("求解器回傳的解違反約束，視為沒有可行解");
        return MilpSolution::without_incumbent(MilpStatus::TimeLimit);
    }
    solution
}

/// 轉換後的 good_lp 問題
struct Translated {
    vars: ProblemVariables,
    objective: Expression,
    variables: Vec<good_lp::Variable>,
    constraints: Vec<good_lp::Constraint>,
}

fn translate(model: &MilpModel) -> Translated {
    let mut vars = ProblemVariables::new();

    let variables: Vec<good_lp::Variable> = model
        .variables()
        .iter()
        .map(|v| {
            let mut definition = match v.kind {
                VarKind::Binary => variable().binary(),
                VarKind::Integer => variable().integer().min(v.lower),
                VarKind::Continuous => variable().min(v.lower),
            };
            if let (Some(upper), false) = (v.upper, v.kind == VarKind::Binary) {
                definition = definition.max(upper);
            }
            vars.add(definition.name(v.name.clone()))
        })
        .collect();

    let to_expression = |expr: &crate::milp::LinearExpr| -> Expression {
        expr.terms()
            .iter()
            .fold(Expression::from(expr.constant_value()), |acc, (var, coef)| {
                acc + *coef * variables[var.index()]
            })
    };

    let constraints = model
        .constraints()
        .iter()
        .map(|c| {
            let lhs = to_expression(&c.expr);
            match c.relation {
                Relation::LessEq => constraint!(lhs <= c.rhs),
                Relation::GreaterEq => constraint!(lhs >= c.rhs),
                Relation::Equal => constraint!(lhs == c.rhs),
            }
        })
        .collect();

    let objective = to_expression(model.objective());

    Translated {
        vars,
        objective,
        variables,
        constraints,
    }
}

/// 求解並轉回模型變數順序的結果
fn run<M>(
    problem: M,
    translated_vars: &[good_lp::Variable],
    constraints: Vec<good_lp::Constraint>,
    model: &MilpModel,
    status: MilpStatus,
) -> Result<MilpSolution>
where
    M: SolverModel<Error = ResolutionError>,
{
    let problem = constraints.into_iter().fold(problem, |p, c| p.with(c));

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = translated_vars.iter().map(|&v| solution.value(v)).collect();
            let objective = model.objective().evaluate(&values);
            Ok(MilpSolution::with_values(status, values, objective))
        }
        Err(ResolutionError::Infeasible) => {
            Ok(MilpSolution::without_incumbent(MilpStatus::Infeasible))
        }
        Err(ResolutionError::Unbounded) => {
            Ok(MilpSolution::without_incumbent(MilpStatus::Unbounded))
        }
        Err(e) => Err(CutPlanError::Solver(e.to_string())),
    }
}

#[cfg(not(feature = "highs"))]
fn solve_bounded(
    model: &MilpModel,
    time_limit: Duration,
    permit: SolverPermit,
) -> Result<MilpSolution> {
    use std::sync::mpsc::{self, RecvTimeoutError};

    let owned = model.clone();
    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("cutplan-milp".to_string())
        .spawn(move || {
            let _permit = permit;
            let Translated {
                vars,
                objective,
                variables,
                constraints,
            } = translate(&owned);
            let outcome = run(
                vars.minimise(objective).using(good_lp::default_solver),
                &variables,
                constraints,
                &owned,
                MilpStatus::Optimal,
            );
            // 接收端可能已因逾時而放棄
            let _ = tx.send(outcome);
        })
        .map_err(|e| CutPlanError::Solver(format!("無法啟動求解執行緒: {e}")))?;

    match rx.recv_timeout(time_limit) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            // 執行緒無法中斷，結束前持續佔用名額
            tracing::warn!("求解超過時限 {:?}，沒有可行解", time_limit);
            Ok(MilpSolution::without_incumbent(MilpStatus::TimeLimit))
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(CutPlanError::Solver("求解執行緒異常結束".to_string()))
        }
    }
}

#[cfg(feature = "highs")]
fn solve_bounded(
    model: &MilpModel,
    time_limit: Duration,
    _permit: SolverPermit,
) -> Result<MilpSolution> {
    use good_lp::solvers::highs::highs;
    use good_lp::solvers::WithTimeLimit;

    let Translated {
        vars,
        objective,
        variables,
        constraints,
    } = translate(model);

    let started = Instant::now();
    let problem = vars
        .minimise(objective)
        .using(highs)
        .with_time_limit(time_limit.as_secs_f64());

    let mut solution = run(problem, &variables, constraints, model, MilpStatus::Optimal)?;
    // 用盡時限才回傳的解未經證明為最佳，是否可行由 screen_incumbent 檢查
    if solution.has_incumbent() && started.elapsed() >= time_limit {
        solution.status = MilpStatus::Feasible;
    }
    Ok(solution)
}
