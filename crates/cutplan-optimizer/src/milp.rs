//! 混合整數線性規劃模型
//!
//! 與求解器無關的模型表示：變數、線性約束與最小化目標。
//! 實際求解由 [`MilpBackend`] 實作負責。

use std::time::Duration;

use cutplan_core::Result;

/// 變數編號（依加入順序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 變數類型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    Integer,
    Binary,
}

/// 變數定義
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    /// `None` 表示無上界
    pub upper: Option<f64>,
}

/// 線性表達式 `Σ coef × var + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常數表達式
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// 建構器模式：加入一項
    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// 加入一項，係數為 0 的項直接略過
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    /// 沒有任何變數項
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// 以給定的變數值計算表達式
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values.get(var.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        let mut expr = Self::new();
        for (var, coef) in iter {
            expr.add_term(var, coef);
        }
        expr
    }
}

/// 約束關係
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    GreaterEq,
    Equal,
}

impl Relation {
    /// 容差隨右手邊大小放大
    fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        let tolerance = tolerance * rhs.abs().max(1.0);
        match self {
            Relation::LessEq => lhs <= rhs + tolerance,
            Relation::GreaterEq => lhs + tolerance >= rhs,
            Relation::Equal => (lhs - rhs).abs() <= tolerance,
        }
    }
}

/// 線性約束 `expr (<=|>=|==) rhs`，表達式不含常數
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

/// 判斷常數約束是否成立的容差
const TRIVIAL_TOLERANCE: f64 = 1e-9;

/// 最小化模型
#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
    trivially_infeasible: bool,
}

impl MilpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增變數；二元變數的界限固定為 [0, 1]
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        lower: f64,
        upper: Option<f64>,
    ) -> VarId {
        let (lower, upper) = match kind {
            VarKind::Binary => (0.0, Some(1.0)),
            _ => (lower, upper),
        };
        self.variables.push(Variable {
            name: name.into(),
            kind,
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    /// 新增約束
    ///
    /// 表達式中的常數移到右側。沒有變數項的約束不送進求解器：
    /// 成立時直接略過，不成立時整個模型標記為不可行。
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        relation: Relation,
        rhs: f64,
    ) {
        let name = name.into();
        let rhs = rhs - expr.constant;

        if expr.is_constant() {
            if !relation.holds(0.0, rhs, TRIVIAL_TOLERANCE) {
                tracing::debug!("約束 {} 無變數且不成立，模型不可行", name);
                self.trivially_infeasible = true;
            }
            return;
        }

        self.constraints.push(Constraint {
            name,
            expr: LinearExpr {
                terms: expr.terms,
                constant: 0.0,
            },
            relation,
            rhs,
        });
    }

    /// 設置最小化目標
    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// 是否已知不可行（存在不成立的常數約束）
    pub fn is_trivially_infeasible(&self) -> bool {
        self.trivially_infeasible
    }

    /// 檢查一組變數值是否滿足所有界限與約束
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        if self.trivially_infeasible || values.len() != self.variables.len() {
            return false;
        }

        let bounds_ok = self.variables.iter().zip(values).all(|(var, &value)| {
            value + tolerance >= var.lower
                && var.upper.map_or(true, |upper| value <= upper + tolerance)
        });

        bounds_ok
            && self
                .constraints
                .iter()
                .all(|c| c.relation.holds(c.expr.evaluate(values), c.rhs, tolerance))
    }
}

/// 求解器回報的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilpStatus {
    Optimal,
    /// 有可行解但未證明最佳
    Feasible,
    Infeasible,
    Unbounded,
    /// 時間上限到達且沒有可行解
    TimeLimit,
}

/// 求解結果
#[derive(Debug, Clone, PartialEq)]
pub struct MilpSolution {
    pub status: MilpStatus,
    /// 依 [`VarId`] 排列的變數值；沒有可行解時為空
    pub values: Vec<f64>,
    pub objective: f64,
}

impl MilpSolution {
    pub fn with_values(status: MilpStatus, values: Vec<f64>, objective: f64) -> Self {
        Self {
            status,
            values,
            objective,
        }
    }

    /// 沒有可行解的結果
    pub fn without_incumbent(status: MilpStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: f64::NAN,
        }
    }

    /// 是否帶有可用的解
    pub fn has_incumbent(&self) -> bool {
        matches!(self.status, MilpStatus::Optimal | MilpStatus::Feasible) && !self.values.is_empty()
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }
}

/// 求解器介面
///
/// 實作必須在 `time_limit` 內回傳；逾時且沒有可行解時回傳 [`MilpStatus::TimeLimit`]。
pub trait MilpBackend: Send + Sync {
    /// 求解器名稱（用於日誌）
    fn name(&self) -> &str;

    fn solve(&self, model: &MilpModel, time_limit: Duration) -> Result<MilpSolution>;
}
