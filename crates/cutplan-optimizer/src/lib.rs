//! # Cutplan Optimizer
//!
//! 裁剪方案最佳化模組（整數規劃模型、求解器後端、鬆弛搜尋）

pub mod backend;
pub mod formulation;
pub mod layout;
pub mod milp;
pub mod optimizer;
pub mod outcome;
pub mod relaxation;

// Re-export 主要類型
pub use backend::{GoodLpBackend, SolverGate};
pub use formulation::LengthCap;
pub use layout::LayoutOptimizer;
pub use milp::{
    LinearExpr, MilpBackend, MilpModel, MilpSolution, MilpStatus, Relation, VarId, VarKind,
};
pub use optimizer::CuttingPlanOptimizer;
pub use outcome::{InfeasibleReason, SolveOutcome};
