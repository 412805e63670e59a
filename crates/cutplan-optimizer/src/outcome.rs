//! 單次求解的結果

use cutplan_core::OptimizationResult;
use serde::{Deserialize, Serialize};

/// 沒有可行解的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfeasibleReason {
    /// 求解器證明不可行
    Infeasible,
    /// 目標無下界（模型錯誤）
    Unbounded,
    /// 時間上限到達且沒有可行解
    TimeLimit,
    /// 沒有布幅與紙樣都相容的排料圖
    NoCompatibleLayouts,
    /// 所有鬆弛係數都試過仍無解
    Exhausted { attempts: usize, timed_out: bool },
}

impl std::fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfeasibleReason::Infeasible => write!(f, "模型不可行"),
            InfeasibleReason::Unbounded => write!(f, "目標無下界"),
            InfeasibleReason::TimeLimit => write!(f, "時限內沒有可行解"),
            InfeasibleReason::NoCompatibleLayouts => write!(f, "沒有相容的排料圖"),
            InfeasibleReason::Exhausted { attempts, timed_out } => {
                write!(f, "嘗試 {attempts} 個鬆弛係數皆無解")?;
                if *timed_out {
                    write!(f, "（含逾時）")?;
                }
                Ok(())
            }
        }
    }
}

/// 求解結果：不可行屬於正常結果，不是錯誤
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Feasible(OptimizationResult),
    Infeasible(InfeasibleReason),
}

impl SolveOutcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, SolveOutcome::Feasible(_))
    }

    pub fn result(&self) -> Option<&OptimizationResult> {
        match self {
            SolveOutcome::Feasible(result) => Some(result),
            SolveOutcome::Infeasible(_) => None,
        }
    }

    pub fn into_result(self) -> Option<OptimizationResult> {
        match self {
            SolveOutcome::Feasible(result) => Some(result),
            SolveOutcome::Infeasible(_) => None,
        }
    }

    pub fn infeasible_reason(&self) -> Option<InfeasibleReason> {
        match self {
            SolveOutcome::Feasible(_) => None,
            SolveOutcome::Infeasible(reason) => Some(*reason),
        }
    }
}
