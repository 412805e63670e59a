//! 鬆弛搜尋：依序放寬長度限制，第一個可行解即採用

use cutplan_core::Result;

use crate::outcome::{InfeasibleReason, SolveOutcome};

/// 依遞增順序嘗試每個鬆弛係數，回傳第一個可行結果
///
/// 排料圖不相容與係數無關，遇到時直接結束搜尋。
pub fn first_feasible<F>(factors: &[f64], mut solve: F) -> Result<SolveOutcome>
where
    F: FnMut(f64) -> Result<SolveOutcome>,
{
    let mut timed_out = false;

    for (attempt, &factor) in factors.iter().enumerate() {
        match solve(factor)? {
            SolveOutcome::Feasible(result) => {
                tracing::debug!("第 {} 次嘗試可行，鬆弛係數 {:.2}", attempt + 1, factor);
                return Ok(SolveOutcome::Feasible(result));
            }
            SolveOutcome::Infeasible(InfeasibleReason::NoCompatibleLayouts) => {
                return Ok(SolveOutcome::Infeasible(InfeasibleReason::NoCompatibleLayouts));
            }
            SolveOutcome::Infeasible(reason) => {
                timed_out |= reason == InfeasibleReason::TimeLimit;
            }
        }
    }

    Ok(SolveOutcome::Infeasible(InfeasibleReason::Exhausted {
        attempts: factors.len(),
        timed_out,
    }))
}
